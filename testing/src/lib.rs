//! # Careflow Testing
//!
//! Testing utilities and fixtures for the careflow attendance engine.
//!
//! This crate provides:
//! - Mock implementations of the environment traits (clock, patient registry)
//! - A fluent builder for attendance record fixtures
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```
//! use careflow_core::environment::Clock;
//! use careflow_testing::mocks::test_clock;
//! use chrono::Duration;
//!
//! let clock = test_clock();
//! let start = clock.now();
//! clock.advance(Duration::minutes(5));
//! assert_eq!(clock.now(), start + Duration::minutes(5));
//! ```

pub mod fixtures;

/// Mock implementations of the environment traits.
pub mod mocks {
    use careflow_core::environment::{Clock, DirectoryError, PatientDirectory, PatientProfile};
    use careflow_core::record::PatientId;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Mutex, PoisonError};

    /// Settable clock for deterministic tests.
    ///
    /// Returns the same instant until [`FixedClock::set`] or
    /// [`FixedClock::advance`] moves it, making timestamps and FIFO
    /// tie-breaking reproducible. Share it through an `Arc` to steer time
    /// for a whole engine.
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a fixed clock starting at the given time.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock to an absolute time.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.lock() = time;
        }

        /// Move the clock forward by `delta`.
        pub fn advance(&self, delta: Duration) {
            let mut time = self.lock();
            *time = *time + delta;
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
            self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.lock()
        }
    }

    /// Create a default fixed clock for tests (2025-06-02 08:00:00 UTC,
    /// a Monday morning).
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-06-02T08:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Patient registry stub preloaded with known profiles.
    ///
    /// Lookups of ids that were never added fail with
    /// [`DirectoryError::UnknownPatient`], matching a real registry's
    /// behavior for a typo'd id.
    #[derive(Debug, Default)]
    pub struct StaticPatientDirectory {
        patients: HashMap<PatientId, String>,
    }

    impl StaticPatientDirectory {
        /// Create an empty directory.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a patient, builder-style.
        #[must_use]
        pub fn with_patient(mut self, id: PatientId, name: impl Into<String>) -> Self {
            self.patients.insert(id, name.into());
            self
        }

        /// Add a patient in place.
        pub fn insert(&mut self, id: PatientId, name: impl Into<String>) {
            self.patients.insert(id, name.into());
        }
    }

    impl PatientDirectory for StaticPatientDirectory {
        fn lookup(
            &self,
            id: PatientId,
        ) -> Pin<Box<dyn Future<Output = Result<PatientProfile, DirectoryError>> + Send + '_>>
        {
            Box::pin(async move {
                self.patients
                    .get(&id)
                    .map(|name| PatientProfile {
                        id,
                        name: name.clone(),
                    })
                    .ok_or(DirectoryError::UnknownPatient(id))
            })
        }
    }
}

/// Install a fmt tracing subscriber for the current test binary.
///
/// Safe to call from every test; only the first call installs. Filtering
/// honors `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::RecordBuilder;
pub use mocks::{FixedClock, StaticPatientDirectory, test_clock};
