//! Fluent builders for attendance record fixtures.

use careflow_core::environment::Clock;
use careflow_core::record::{
    AttendanceId, AttendanceRecord, AttendanceStatus, Destination, PatientId, PriorityClass,
    TicketCode, Version,
};
use chrono::{DateTime, Utc};

/// Builder producing [`AttendanceRecord`] fixtures with sensible defaults.
///
/// The default record is a waiting, normal-priority patient registered at
/// the [`test_clock`](crate::mocks::test_clock) time with ticket `A001`
/// and version 1, matching a record freshly inserted through the engine.
///
/// ## Example
///
/// ```
/// use careflow_core::record::AttendanceStatus;
/// use careflow_testing::RecordBuilder;
///
/// let record = RecordBuilder::new()
///     .ticket_sequence(2)
///     .status(AttendanceStatus::InTriage)
///     .build();
/// assert_eq!(record.ticket_code.as_str(), "A002");
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    id: AttendanceId,
    patient_id: PatientId,
    patient_name: String,
    ticket_sequence: u32,
    priority: PriorityClass,
    status: AttendanceStatus,
    created_at: DateTime<Utc>,
    called_at: Option<DateTime<Utc>>,
    called_to: Option<Destination>,
    version: Version,
    notes: Option<String>,
}

impl RecordBuilder {
    /// Create a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: AttendanceId::new(),
            patient_id: PatientId::new(1),
            patient_name: "Test Patient".to_string(),
            ticket_sequence: 1,
            priority: PriorityClass::Normal,
            status: AttendanceStatus::Waiting,
            created_at: crate::mocks::test_clock().now(),
            called_at: None,
            called_to: None,
            version: Version::new(1),
            notes: None,
        }
    }

    /// Set the record id.
    #[must_use]
    pub fn id(mut self, id: AttendanceId) -> Self {
        self.id = id;
        self
    }

    /// Set the patient id.
    #[must_use]
    pub fn patient_id(mut self, id: PatientId) -> Self {
        self.patient_id = id;
        self
    }

    /// Set the patient display name.
    #[must_use]
    pub fn patient_name(mut self, name: impl Into<String>) -> Self {
        self.patient_name = name.into();
        self
    }

    /// Set the ticket code by sequence number (`2` yields `A002`).
    #[must_use]
    pub fn ticket_sequence(mut self, sequence: u32) -> Self {
        self.ticket_sequence = sequence;
        self
    }

    /// Set the priority class.
    #[must_use]
    pub fn priority(mut self, priority: PriorityClass) -> Self {
        self.priority = priority;
        self
    }

    /// Set the attendance status.
    #[must_use]
    pub fn status(mut self, status: AttendanceStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the registration time.
    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Set the call time.
    #[must_use]
    pub fn called_at(mut self, at: DateTime<Utc>) -> Self {
        self.called_at = Some(at);
        self
    }

    /// Set the call destination. When only a call time is given the
    /// destination defaults to triage, matching what the engine stamps.
    #[must_use]
    pub fn called_to(mut self, destination: Destination) -> Self {
        self.called_to = Some(destination);
        self
    }

    /// Set the record version.
    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set the clinical notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Build the record.
    #[must_use]
    pub fn build(self) -> AttendanceRecord {
        let called_to = self
            .called_to
            .or_else(|| self.called_at.map(|_| Destination::Triage));
        AttendanceRecord {
            id: self.id,
            patient_id: self.patient_id,
            patient_name: self.patient_name,
            ticket_code: TicketCode::from_sequence(self.ticket_sequence),
            priority: self.priority,
            status: self.status,
            created_at: self.created_at,
            called_at: self.called_at,
            called_to,
            version: self.version,
            notes: self.notes,
        }
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}
