//! # Careflow Engine
//!
//! The attendance call engine: registers walk-in patients, orders the
//! waiting queue, claims the next patient for triage, and announces
//! calls to displays.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              AttendanceEngine               │
//! │                                             │
//! │  register ──▶ ticket issue ──▶ store.put    │
//! │  call_next ─▶ scheduler (claim + retry)     │
//! │  advance ───▶ transitions (CAS)             │
//! │  queries ───▶ QueryFacade (read side)       │
//! │  announce ──▶ announcer (change feed)       │
//! └──────────────────┬──────────────────────────┘
//!                    │
//!             AttendanceStore (trait)
//! ```
//!
//! The engine owns no storage itself; every mutation is an optimistic
//! compare-and-swap through [`AttendanceStore`], so several engine
//! instances can safely share one store.
//!
//! ## Example
//!
//! ```rust
//! use careflow_engine::{AttendanceEngine, EngineConfig};
//! use careflow_core::record::{PatientId, PriorityClass};
//! use careflow_memory::MemoryStore;
//! use careflow_testing::StaticPatientDirectory;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::from_env();
//! let store = Arc::new(MemoryStore::with_change_capacity(config.change_feed_capacity));
//! let directory = Arc::new(
//!     StaticPatientDirectory::new().with_patient(PatientId::new(7), "Ana Souza"),
//! );
//! let engine = AttendanceEngine::new(store, directory, config);
//!
//! let record = engine
//!     .create_attendance(PatientId::new(7), PriorityClass::Normal)
//!     .await?;
//! println!("issued {}", record.ticket_code);
//!
//! if let Some(called) = engine.call_next().await?.into_record() {
//!     println!("calling {} to triage", called.ticket_code);
//! }
//! # Ok(())
//! # }
//! ```

use careflow_core::environment::{Clock, DirectoryError, PatientDirectory, SystemClock};
use careflow_core::record::{
    AttendanceId, AttendanceRecord, AttendanceStatus, PatientId, PriorityClass, Version,
};
use careflow_core::store::{AttendanceStore, ChangeFeed, StoreError};
use careflow_core::ticket::TicketSequence;
use careflow_core::transitions::{InvalidTransition, apply_transition};
use chrono::FixedOffset;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub mod announcer;
pub mod config;
pub mod metrics;
pub mod queries;
pub mod retry;
mod scheduler;

pub use announcer::{Announcement, CallStream, CallTracker, call_stream};
pub use config::EngineConfig;
pub use queries::{DailyCounts, QueryFacade};
pub use retry::ClaimRetry;

use crate::metrics::EngineMetrics;

// ============================================================================
// Errors
// ============================================================================

/// Errors from engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The requested status change does not follow the attendance chain.
    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition {
        /// The record's current status.
        from: AttendanceStatus,
        /// The requested target status.
        to: AttendanceStatus,
    },

    /// `call_next` kept losing claim races and gave up.
    ///
    /// The queue itself is fine; the caller may simply try again.
    #[error("queue under contention: gave up after {attempts} attempts")]
    Contention {
        /// How many claim attempts were made before giving up.
        attempts: u32,
    },

    /// The patient id is not known to the patient directory.
    #[error("unknown patient: {0}")]
    UnknownPatient(PatientId),

    /// The patient directory could not be reached.
    #[error("patient directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvalidTransition> for EngineError {
    fn from(err: InvalidTransition) -> Self {
        Self::InvalidTransition {
            from: err.from,
            to: err.to,
        }
    }
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UnknownPatient(id) => Self::UnknownPatient(id),
            DirectoryError::Unavailable(reason) => Self::DirectoryUnavailable(reason),
        }
    }
}

// ============================================================================
// Call outcome
// ============================================================================

/// Result of asking for the next patient.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum CallOutcome {
    /// A patient was claimed and moved to triage.
    Called(AttendanceRecord),
    /// Nobody is waiting.
    Empty,
}

impl CallOutcome {
    /// Whether the queue was empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The called record, if a patient was claimed.
    #[must_use]
    pub fn into_record(self) -> Option<AttendanceRecord> {
        match self {
            Self::Called(record) => Some(record),
            Self::Empty => None,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The attendance call engine.
///
/// Coordinates registration, queue scheduling, status transitions, and
/// announcements over a shared [`AttendanceStore`]. The engine is cheap
/// to share behind an `Arc`; all methods take `&self`.
pub struct AttendanceEngine {
    store: Arc<dyn AttendanceStore>,
    directory: Arc<dyn PatientDirectory>,
    clock: Arc<dyn Clock>,
    tickets: Mutex<TicketSequence>,
    retry: ClaimRetry,
    queries: QueryFacade,
    offset: FixedOffset,
}

impl AttendanceEngine {
    /// Create an engine using the system clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn PatientDirectory>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(store, directory, config, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit clock.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn PatientDirectory>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let offset = config.clinic_offset();
        let queries = QueryFacade::new(Arc::clone(&store), Arc::clone(&clock), offset);
        Self {
            tickets: Mutex::new(TicketSequence::new(offset)),
            retry: config.claim_retry(),
            queries,
            offset,
            store,
            directory,
            clock,
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a walk-in patient and issue their ticket.
    ///
    /// The patient is looked up in the directory, placed at the back of
    /// their priority class, and stored as `Waiting`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownPatient`] if the directory does not
    /// know the id, [`EngineError::DirectoryUnavailable`] if the lookup
    /// fails, or a store error if the record cannot be written.
    pub async fn create_attendance(
        &self,
        patient_id: PatientId,
        priority: PriorityClass,
    ) -> Result<AttendanceRecord, EngineError> {
        self.register(patient_id, priority, None).await
    }

    /// Register a walk-in patient with clinical notes attached.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_attendance`].
    pub async fn create_attendance_with_notes(
        &self,
        patient_id: PatientId,
        priority: PriorityClass,
        notes: impl Into<String>,
    ) -> Result<AttendanceRecord, EngineError> {
        self.register(patient_id, priority, Some(notes.into())).await
    }

    async fn register(
        &self,
        patient_id: PatientId,
        priority: PriorityClass,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, EngineError> {
        let profile = self.directory.lookup(patient_id).await?;
        let now = self.clock.now();

        let ticket_code = {
            let mut tickets = self.tickets.lock().await;
            tickets.next(now)
        };

        let mut record = AttendanceRecord::new(
            AttendanceId::new(),
            profile.id,
            profile.name,
            ticket_code,
            priority,
            now,
        );
        record.notes = notes;

        let stored = self.store.put(record, Version::INITIAL).await?;
        info!(
            id = %stored.id,
            ticket = %stored.ticket_code,
            priority = %stored.priority,
            "attendance registered"
        );
        EngineMetrics::record_created();
        Ok(stored)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Move a record one step along the attendance chain.
    ///
    /// The write is an optimistic compare-and-swap: it only lands if the
    /// stored record still carries `expected_version`. Moving into
    /// triage through this method stamps the call time exactly like
    /// [`Self::call_next`] does.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTransition`] if `target` is not the
    /// next stage, [`StoreError::VersionConflict`] (wrapped) if the
    /// record changed since it was read, or [`StoreError::NotFound`] for
    /// an unknown id.
    pub async fn advance(
        &self,
        id: AttendanceId,
        target: AttendanceStatus,
        expected_version: Version,
    ) -> Result<AttendanceRecord, EngineError> {
        let record = self.store.get(id).await?;
        let next = apply_transition(&record, target, self.clock.now())?;
        let stored = self.store.put(next, expected_version).await?;

        info!(
            id = %stored.id,
            from = %record.status,
            to = %stored.status,
            version = %stored.version,
            "attendance advanced"
        );
        EngineMetrics::record_transition();
        Ok(stored)
    }

    /// Call the next patient in queue order and move them to triage.
    ///
    /// Ordering is priority class first (urgent, preferential, normal),
    /// FIFO within a class. Losing a claim race to a concurrent caller
    /// retries against the refreshed queue with jittered backoff.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Contention`] after exhausting the retry
    /// budget, or a store error if the queue cannot be read or written.
    pub async fn call_next(&self) -> Result<CallOutcome, EngineError> {
        scheduler::claim_next(self.store.as_ref(), self.clock.as_ref(), &self.retry).await
    }

    // ------------------------------------------------------------------
    // Ticket sequence
    // ------------------------------------------------------------------

    /// Rebuild the ticket sequence from stored records after a restart.
    ///
    /// Scans today's records and resumes numbering past the highest
    /// ticket already issued, so restarts never hand out duplicates.
    /// Returns the last issued sequence number.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn recover_sequence(&self) -> Result<u32, EngineError> {
        let records = self.store.list_all().await?;
        let now = self.clock.now();

        let mut tickets = self.tickets.lock().await;
        *tickets = TicketSequence::recover(&records, self.offset, now);
        let last = tickets.last_issued();

        info!(last_issued = last, "ticket sequence recovered from store");
        Ok(last)
    }

    // ------------------------------------------------------------------
    // Announcements and change feed
    // ------------------------------------------------------------------

    /// Subscribe to call announcements.
    ///
    /// The stream announces each call exactly once and only covers calls
    /// made after subscribing.
    #[must_use]
    pub fn subscribe_calls(&self) -> CallStream {
        announcer::call_stream(self.store.subscribe_changes())
    }

    /// Subscribe to the raw record change feed.
    #[must_use]
    pub fn subscribe_changes(&self) -> ChangeFeed {
        self.store.subscribe_changes()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The read-side query facade.
    #[must_use]
    pub const fn queries(&self) -> &QueryFacade {
        &self.queries
    }

    /// List records in a given status, display-ordered.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_by_status(
        &self,
        status: AttendanceStatus,
    ) -> Result<Vec<AttendanceRecord>, EngineError> {
        Ok(self.queries.by_status(status).await?)
    }

    /// List every record still moving through the clinic.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn pending(&self) -> Result<Vec<AttendanceRecord>, EngineError> {
        Ok(self.queries.pending().await?)
    }

    /// Count today's records per status.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn counts_today(&self) -> Result<DailyCounts, EngineError> {
        Ok(self.queries.counts_today().await?)
    }

    /// The most recently called record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn latest_call(&self) -> Result<Option<AttendanceRecord>, EngineError> {
        Ok(self.queries.latest_call().await?)
    }
}
