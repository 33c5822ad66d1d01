//! Queue ordering and claim loop for calling the next patient.
//!
//! The waiting queue is ordered by priority class (urgent, preferential,
//! normal) and FIFO within a class. Claiming the head is a
//! compare-and-swap against the record's version: losing the race means
//! another caller took the same patient, so the claim retries against
//! the refreshed queue with jittered backoff until it succeeds, the
//! queue drains, or the retry budget runs out.

use crate::metrics::EngineMetrics;
use crate::retry::ClaimRetry;
use crate::{CallOutcome, EngineError};
use careflow_core::environment::Clock;
use careflow_core::record::{AttendanceRecord, AttendanceStatus};
use careflow_core::store::{AttendanceStore, StoreError};
use careflow_core::transitions::apply_transition;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Sort key for the waiting queue.
///
/// Lower sorts first: priority rank, then registration time, then ticket
/// sequence as the tiebreaker for identical timestamps.
pub(crate) fn queue_position(record: &AttendanceRecord) -> (u8, DateTime<Utc>, u32) {
    (
        record.priority.rank(),
        record.created_at,
        record.ticket_code.sequence().unwrap_or(u32::MAX),
    )
}

/// Claim the head of the waiting queue and move it to triage.
pub(crate) async fn claim_next(
    store: &dyn AttendanceStore,
    clock: &dyn Clock,
    retry: &ClaimRetry,
) -> Result<CallOutcome, EngineError> {
    let mut attempt: u32 = 0;

    loop {
        let waiting = store.list_by_status(AttendanceStatus::Waiting).await?;
        let Some(head) = waiting.iter().min_by_key(|r| queue_position(r)) else {
            return Ok(CallOutcome::Empty);
        };

        let claimed = apply_transition(head, AttendanceStatus::InTriage, clock.now())?;
        match store.put(claimed, head.version).await {
            Ok(called) => {
                info!(
                    id = %called.id,
                    ticket = %called.ticket_code,
                    priority = %called.priority,
                    attempt,
                    "patient called to triage"
                );
                EngineMetrics::record_call();
                return Ok(CallOutcome::Called(called));
            }
            Err(StoreError::VersionConflict {
                id,
                expected,
                actual,
            }) => {
                attempt += 1;
                EngineMetrics::record_claim_conflict();

                if !retry.should_retry(attempt) {
                    warn!(
                        id = %id,
                        attempts = attempt,
                        "giving up queue claim under contention"
                    );
                    EngineMetrics::record_contention();
                    return Err(EngineError::Contention { attempts: attempt });
                }

                let delay = retry.delay_for_attempt(attempt - 1);
                debug!(
                    id = %id,
                    expected = %expected,
                    actual = %actual,
                    delay_ms = delay.as_millis(),
                    "queue head claimed concurrently, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(other) => return Err(other.into()),
        }
    }
}
