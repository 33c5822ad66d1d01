//! Call announcements for waiting-room displays and public address.
//!
//! A call happens when a record arrives in triage; the announcement
//! identity is the pair `(record id, call time)`. Every subscriber owns
//! a [`CallTracker`], so each call is announced exactly once per
//! subscriber no matter how often the underlying record is redelivered
//! or re-read.
//!
//! Two delivery styles are supported:
//! - push: [`call_stream`] turns a change feed into a stream of
//!   announcements
//! - poll: [`CallTracker::poll`] diffs a record listing against what the
//!   subscriber has already announced

use crate::metrics::EngineMetrics;
use careflow_core::record::{AttendanceId, AttendanceRecord, Destination, TicketCode};
use careflow_core::store::ChangeFeed;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::pin::Pin;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Public-address payload for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Ticket code to display and read out.
    pub ticket_code: TicketCode,
    /// Patient display name.
    pub patient_name: String,
    /// Where the patient should go.
    pub destination: Destination,
}

/// Stream of announcements produced from a change feed.
pub type CallStream = Pin<Box<dyn Stream<Item = Announcement> + Send>>;

/// Per-subscriber record of which calls were already announced.
#[derive(Debug, Default)]
pub struct CallTracker {
    seen: HashSet<(AttendanceId, DateTime<Utc>)>,
}

impl CallTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce the record's call if this tracker has not yet seen it.
    ///
    /// Records that were never called return `None`, as do calls already
    /// observed through this tracker. The destination is the one stamped
    /// on the record with its call time, not the current status: a record
    /// read after it advanced further still announces the stage that
    /// summoned the patient.
    pub fn observe(&mut self, record: &AttendanceRecord) -> Option<Announcement> {
        let called_at = record.called_at?;
        let destination = record.called_to?;
        if !self.seen.insert((record.id, called_at)) {
            return None;
        }

        EngineMetrics::record_announcement();
        Some(Announcement {
            ticket_code: record.ticket_code.clone(),
            patient_name: record.patient_name.clone(),
            destination,
        })
    }

    /// Diff a record listing against this tracker, announcing unseen
    /// calls in call order.
    pub fn poll(&mut self, records: &[AttendanceRecord]) -> Vec<Announcement> {
        let mut called: Vec<&AttendanceRecord> =
            records.iter().filter(|r| r.is_called()).collect();
        called.sort_by_key(|r| r.called_at);
        called.into_iter().filter_map(|r| self.observe(r)).collect()
    }
}

/// Turn a change feed into a stream of announcements.
///
/// Only transitions that arrive in triage produce an announcement, so a
/// subscriber joining mid-day does not replay historical calls. A lagged
/// feed is logged and skipped rather than terminating the stream; the
/// stream ends when the feed closes.
#[must_use]
pub fn call_stream(mut changes: ChangeFeed) -> CallStream {
    Box::pin(async_stream::stream! {
        let mut tracker = CallTracker::new();
        loop {
            match changes.recv().await {
                Ok(event) => {
                    if !event.is_call() {
                        continue;
                    }
                    if let Some(announcement) = tracker.observe(&event.record) {
                        yield announcement;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "call stream lagged behind the change feed");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
