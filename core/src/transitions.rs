//! The attendance state machine: validation and application of status
//! transitions.
//!
//! Transitions are pure functions over [`AttendanceRecord`]: validation
//! checks the edge, application produces the successor record with its
//! version bumped and timestamps applied. Persisting the successor through
//! [`crate::store::AttendanceStore::put`] with the predecessor's version as
//! the expected version is what makes a transition concurrency-safe; a
//! conflict there means another station transitioned the record first.

use crate::record::{AttendanceRecord, AttendanceStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// An illegal status edge was attempted.
///
/// Surfaced to the caller and never retried: unlike a version conflict this
/// is not contention but a collaborator invoking the wrong operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal status transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// The record's status when the transition was attempted.
    pub from: AttendanceStatus,
    /// The requested target status.
    pub to: AttendanceStatus,
}

// ============================================================================
// Validation
// ============================================================================

/// Check that moving `record` to `target` follows a legal edge.
///
/// The only legal edges walk the stages strictly forward:
/// `Waiting -> InTriage -> InConsultation -> Closed`. Anything else —
/// skipping a stage, moving backward, or leaving the terminal state — is
/// rejected and the record is left untouched.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when `target` is not the successor of the
/// record's current status.
pub fn validate_transition(
    record: &AttendanceRecord,
    target: AttendanceStatus,
) -> Result<(), InvalidTransition> {
    if record.status.successor() == Some(target) {
        Ok(())
    } else {
        Err(InvalidTransition {
            from: record.status,
            to: target,
        })
    }
}

// ============================================================================
// Application
// ============================================================================

/// Produce the successor record for a legal transition.
///
/// The successor carries the target status and a bumped version. Arrival at
/// a calling stage stamps `called_at` with `now` and `called_to` with the
/// stage's destination; a summons that is already stamped is never
/// overwritten, so the first call is preserved for the announcement dedup
/// key and for displays reading the record late.
///
/// The input record is not mutated; persisting the successor is the
/// caller's job.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the edge is illegal; no successor is
/// produced.
pub fn apply_transition(
    record: &AttendanceRecord,
    target: AttendanceStatus,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, InvalidTransition> {
    validate_transition(record, target)?;

    let mut next = record.clone();
    next.status = target;
    next.version = record.version.next();
    if next.called_at.is_none() && target.requires_call() {
        next.called_at = Some(now);
        next.called_to = target.call_destination();
    }
    Ok(next)
}
