//! Storage contract and change-event types for attendance records.
//!
//! # Design
//!
//! The [`AttendanceStore`] trait is deliberately minimal: keyed reads, a
//! compare-and-swap write, and per-status listing. The versioned `put` is the
//! *only* synchronization primitive in the engine — no caller holds a lock
//! across I/O, and every concurrent-mutation hazard resolves to a
//! [`StoreError::VersionConflict`] that the caller re-reads and retries.
//!
//! Every successful `put` also publishes a [`RecordChanged`] event on a
//! broadcast channel. Delivery is best-effort: a slow or absent subscriber
//! never blocks or fails the write path, and late joiners miss history.
//!
//! # Implementations
//!
//! - `MemoryStore` (in `careflow-memory`): embedded in-process storage
//!
//! # Dyn Compatibility
//!
//! The trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` so it can be used as a trait object (`Arc<dyn AttendanceStore>`)
//! and shared across stations.

use crate::record::{AttendanceId, AttendanceRecord, AttendanceStatus, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists under the given id. A caller error, surfaced
    /// immediately and never retried.
    #[error("attendance record not found: {0}")]
    NotFound(AttendanceId),

    /// Optimistic concurrency conflict: the stored version does not match
    /// the version the writer expected.
    ///
    /// This is benign contention — another station mutated the record first.
    /// Callers re-read and retry. An `actual` of [`Version::INITIAL`] means
    /// no record is stored under the id at all.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// The record the write targeted.
        id: AttendanceId,
        /// The version the writer expected.
        expected: Version,
        /// The version actually stored.
        actual: Version,
    },

    /// The backing storage failed. Fatal to the requested operation only,
    /// never to the process.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Change event published after every successful [`AttendanceStore::put`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordChanged {
    /// Status before the write; `None` when the write inserted the record.
    pub old_status: Option<AttendanceStatus>,
    /// The record as stored, including its new status and version.
    pub record: AttendanceRecord,
}

impl RecordChanged {
    /// Status after the write.
    #[must_use]
    pub const fn new_status(&self) -> AttendanceStatus {
        self.record.status
    }

    /// Whether this change summoned the patient: the record arrived at a
    /// stage with a call destination it was not in before.
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.record.status.call_destination().is_some()
            && self.old_status != Some(self.record.status)
    }
}

/// Receiver half of a store's change-event channel.
///
/// Backed by a bounded broadcast buffer: receivers that fall behind observe
/// a lag marker and continue from the oldest retained event.
pub type ChangeFeed = broadcast::Receiver<RecordChanged>;

/// Keyed record storage with per-record optimistic versioning.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store instance is shared by
/// every station in the clinic.
///
/// # Concurrency
///
/// `put` is a compare-and-swap on the record's [`Version`]. Reads never
/// block and never participate in the versioning protocol.
pub trait AttendanceStore: Send + Sync {
    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`]: no record under this id
    /// - [`StoreError::Unavailable`]: backing storage failed
    fn get(
        &self,
        id: AttendanceId,
    ) -> Pin<Box<dyn Future<Output = Result<AttendanceRecord, StoreError>> + Send + '_>>;

    /// Store a record if and only if the stored version matches
    /// `expected_version`.
    ///
    /// A record that is not stored at all counts as being at
    /// [`Version::INITIAL`], so inserts pass `expected_version =
    /// Version::INITIAL` together with a record at version 1. Callers produce
    /// successor records through [`crate::transitions::apply_transition`],
    /// which bumps the version; the store writes the record verbatim.
    ///
    /// On success the stored record is returned and a [`RecordChanged`]
    /// event is published to all current [`ChangeFeed`] subscribers.
    ///
    /// # Errors
    ///
    /// - [`StoreError::VersionConflict`]: stored version differs from
    ///   `expected_version` (concurrent mutation, or insert of an id that
    ///   already exists)
    /// - [`StoreError::Unavailable`]: backing storage failed
    fn put(
        &self,
        record: AttendanceRecord,
        expected_version: Version,
    ) -> Pin<Box<dyn Future<Output = Result<AttendanceRecord, StoreError>> + Send + '_>>;

    /// List all records currently in the given status, in no particular
    /// order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`]: backing storage failed
    fn list_by_status(
        &self,
        status: AttendanceStatus,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send + '_>>;

    /// List every record ever stored, in no particular order.
    ///
    /// Used by daily counters, history boards, and ticket-sequence recovery.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`]: backing storage failed
    fn list_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send + '_>>;

    /// Subscribe to change events published by successful `put`s.
    ///
    /// Subscription starts at the next event; history is not replayed.
    fn subscribe_changes(&self) -> ChangeFeed;
}
