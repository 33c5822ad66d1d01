//! Attendance record data model.
//!
//! This module defines the value objects and the central entity of the queue
//! engine: identifiers, the optimistic-concurrency [`Version`], human-readable
//! [`TicketCode`]s, the [`PriorityClass`] scheduling tiers, the
//! [`AttendanceStatus`] state-machine states, and the [`AttendanceRecord`]
//! itself (one per patient visit).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an attendance record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttendanceId(Uuid);

impl AttendanceId {
    /// Creates a new random `AttendanceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AttendanceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttendanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttendanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a patient in the external registry.
///
/// The registry owns patient records and hands out numeric identifiers; this
/// engine only carries them as opaque references and never validates them
/// beyond the initial directory lookup at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientId(u64);

impl PatientId {
    /// Create a `PatientId` with the given registry number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the registry number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PatientId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Versioning
// ============================================================================

/// Record version number for optimistic concurrency control.
///
/// Every mutation of an attendance record bumps its version by 1. Writers
/// state the version they expect the stored record to have; a mismatch means
/// another station changed the record concurrently and the write is rejected.
///
/// [`Version::INITIAL`] (0) denotes "not yet stored": a freshly created record
/// carries `Version::INITIAL.next()` (1) and is inserted with an expected
/// version of `INITIAL`.
///
/// # Examples
///
/// ```
/// use careflow_core::record::Version;
///
/// let v1 = Version::INITIAL.next();
/// assert_eq!(v1, Version::new(1));
/// assert_eq!(v1.next().value(), 2);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a record that has never been stored.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    ///
    /// # Overflow Behavior
    ///
    /// Uses plain addition. A record would need `u64::MAX` mutations to
    /// overflow, which is not a realistic concern for a clinic queue.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the unstored-record version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

// ============================================================================
// Ticket codes
// ============================================================================

/// Human-readable queue ticket handed to the patient at registration.
///
/// Codes are the letter `A` followed by the issue sequence number, zero-padded
/// to three digits: `A001`, `A002`, ..., `A999`. Past 999 the code widens
/// (`A1000`) instead of wrapping, so codes stay unique within their issue
/// epoch. See [`crate::ticket::TicketSequence`] for the epoch policy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketCode(String);

impl TicketCode {
    /// Format the ticket code for the given issue sequence number.
    ///
    /// # Examples
    ///
    /// ```
    /// use careflow_core::record::TicketCode;
    ///
    /// assert_eq!(TicketCode::from_sequence(1).as_str(), "A001");
    /// assert_eq!(TicketCode::from_sequence(42).as_str(), "A042");
    /// assert_eq!(TicketCode::from_sequence(1000).as_str(), "A1000");
    /// ```
    #[must_use]
    pub fn from_sequence(sequence: u32) -> Self {
        Self(format!("A{sequence:03}"))
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the issue sequence number back out of the code.
    ///
    /// Returns `None` for codes that were not produced by
    /// [`TicketCode::from_sequence`].
    #[must_use]
    pub fn sequence(&self) -> Option<u32> {
        self.0.strip_prefix('A').and_then(|digits| digits.parse().ok())
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TicketCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Priority and status
// ============================================================================

/// Scheduling tier of an attendance record.
///
/// Set once at registration and immutable thereafter. The declaration order
/// is the dequeue order: `Urgent` beats `Preferential` beats `Normal`, with
/// arrival order breaking ties inside a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    /// Clinical urgency; always served first.
    Urgent,
    /// Legal priority (elderly, pregnant, disabled); served before the
    /// general queue.
    Preferential,
    /// General walk-in queue.
    Normal,
}

impl PriorityClass {
    /// Numeric dequeue rank: `Urgent` is 0, `Preferential` 1, `Normal` 2.
    ///
    /// Lower ranks are called first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::Preferential => 1,
            Self::Normal => 2,
        }
    }

    /// Lowercase name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Preferential => "preferential",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage a summoned patient is directed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The triage desk, where vitals are taken.
    Triage,
    /// A consultation room. Present for displays that render historical
    /// calls; the current state machine never announces it because physicians
    /// pull specific records rather than calling from a queue.
    Consultation,
}

impl Destination {
    /// Lowercase name of the destination.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Consultation => "consultation",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an attendance record.
///
/// Legal transitions walk the stages strictly forward:
///
/// ```text
/// Waiting -> InTriage -> InConsultation -> Closed
/// ```
///
/// No stage may be skipped and no transition moves backward; see
/// [`crate::transitions`] for validation and application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Registered and sitting in the waiting room.
    Waiting,
    /// Called to the triage desk; assessment in progress.
    InTriage,
    /// With the physician.
    InConsultation,
    /// Visit complete. Terminal; records are kept as history, never deleted.
    Closed,
}

impl AttendanceStatus {
    /// The single legal next stage, or `None` from the terminal state.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::InTriage),
            Self::InTriage => Some(Self::InConsultation),
            Self::InConsultation => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Where the patient is summoned to when a transition arrives at this
    /// status, or `None` when arrival is silent.
    ///
    /// Only arrival at triage announces: triage and consultation completions
    /// are driven by staff opening a specific record, not by a public call.
    #[must_use]
    pub const fn call_destination(self) -> Option<Destination> {
        match self {
            Self::InTriage => Some(Destination::Triage),
            _ => None,
        }
    }

    /// Whether arriving at this status summons the patient.
    #[must_use]
    pub const fn requires_call(self) -> bool {
        self.call_destination().is_some()
    }

    /// Lowercase name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InTriage => "in_triage",
            Self::InConsultation => "in_consultation",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Attendance record
// ============================================================================

/// One patient visit, tracked from arrival to closure.
///
/// Records are created by reception in [`AttendanceStatus::Waiting`] at
/// version 1 and mutated only through validated transitions, each bumping
/// [`AttendanceRecord::version`]. They are never deleted; closed records
/// remain as the visit history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Unique, immutable record identifier assigned at creation.
    pub id: AttendanceId,
    /// Reference to the patient in the external registry.
    pub patient_id: PatientId,
    /// Patient display name, captured from the registry at creation and not
    /// re-validated afterwards.
    pub patient_name: String,
    /// Queue ticket handed to the patient; immutable.
    pub ticket_code: TicketCode,
    /// Scheduling tier; immutable after creation.
    pub priority: PriorityClass,
    /// Current lifecycle stage.
    pub status: AttendanceStatus,
    /// Registration timestamp; the FIFO tie-breaker within a priority tier.
    pub created_at: DateTime<Utc>,
    /// When the patient was first summoned. `None` until the record leaves
    /// `Waiting`; once set it is never cleared or overwritten.
    pub called_at: Option<DateTime<Utc>>,
    /// Where that summons directed the patient. Stamped together with
    /// `called_at` from the status the call arrived at, so displays that
    /// read the record after it advanced further still announce the stage
    /// that actually summoned the patient.
    pub called_to: Option<Destination>,
    /// Optimistic concurrency token; bumped on every mutation.
    pub version: Version,
    /// Free-text note captured at registration (allergies, companions, ...).
    /// Opaque to the engine and carried through transitions unchanged.
    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// Create a freshly registered record: `Waiting`, version 1, not yet
    /// called, no notes.
    #[must_use]
    pub fn new(
        id: AttendanceId,
        patient_id: PatientId,
        patient_name: impl Into<String>,
        ticket_code: TicketCode,
        priority: PriorityClass,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            patient_id,
            patient_name: patient_name.into(),
            ticket_code,
            priority,
            status: AttendanceStatus::Waiting,
            created_at,
            called_at: None,
            called_to: None,
            version: Version::INITIAL.next(),
            notes: None,
        }
    }

    /// Attach a registration note.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether the patient has been summoned at least once.
    #[must_use]
    pub const fn is_called(&self) -> bool {
        self.called_at.is_some()
    }
}
