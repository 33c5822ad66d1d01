//! External dependency seams: time and the patient registry.
//!
//! All timestamps in the engine flow from an injected [`Clock`] so tests can
//! pin or advance time deterministically; nothing outside [`SystemClock`]
//! calls `Utc::now()` directly. The patient registry is a collaborator owned
//! elsewhere — the engine only looks names up at registration time through
//! [`PatientDirectory`].

use crate::record::PatientId;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The clinic-local calendar day containing `at`.
///
/// Day bucketing — the ticket-sequence epoch and the "today" of the daily
/// counters — always goes through the clinic's configured fixed UTC offset,
/// never the host time zone.
#[must_use]
pub fn clinic_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// What the registry knows about a patient, as far as this engine cares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Registry identifier.
    pub id: PatientId,
    /// Display name, spoken and shown when the patient is called.
    pub name: String,
}

/// Errors from patient registry lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The registry has no patient under this id.
    #[error("unknown patient: {0}")]
    UnknownPatient(PatientId),

    /// The registry could not be reached.
    #[error("patient directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the external patient registry.
///
/// Looked up exactly once per visit, at registration, to capture the
/// patient's display name; the engine never re-validates the reference
/// afterwards.
pub trait PatientDirectory: Send + Sync {
    /// Fetch the profile for a registry id.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::UnknownPatient`]: no such patient
    /// - [`DirectoryError::Unavailable`]: the registry could not be reached
    fn lookup(
        &self,
        id: PatientId,
    ) -> Pin<Box<dyn Future<Output = Result<PatientProfile, DirectoryError>> + Send + '_>>;
}
