//! Read-side queries for waiting-room displays and dashboards.
//!
//! Queries never mutate records; they re-read the store on every call so
//! displays always reflect the latest writes. "Today" is bounded by the
//! clinic's local day, not the UTC day.

use crate::scheduler::queue_position;
use careflow_core::environment::{Clock, clinic_day};
use careflow_core::record::{AttendanceRecord, AttendanceStatus};
use careflow_core::store::{AttendanceStore, StoreError};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Today's attendance totals bucketed by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounts {
    /// Records still waiting to be called.
    pub waiting: usize,
    /// Records currently in triage.
    pub in_triage: usize,
    /// Records currently in consultation.
    pub in_consultation: usize,
    /// Records closed today.
    pub closed: usize,
    /// All records registered today.
    pub total: usize,
}

/// Read-side facade over the attendance store.
pub struct QueryFacade {
    store: Arc<dyn AttendanceStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl QueryFacade {
    /// Create a facade reading from `store`, with "today" defined by the
    /// clinic's `offset` from UTC.
    #[must_use]
    pub fn new(store: Arc<dyn AttendanceStore>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            offset,
        }
    }

    /// List records in a given status.
    ///
    /// The waiting list comes back in queue order (the order `call_next`
    /// would drain it); other statuses come back most recently called
    /// first, which is what displays show.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn by_status(
        &self,
        status: AttendanceStatus,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records = self.store.list_by_status(status).await?;
        if status == AttendanceStatus::Waiting {
            records.sort_by_key(queue_position);
        } else {
            records.sort_by(|a, b| b.called_at.cmp(&a.called_at));
        }
        Ok(records)
    }

    /// List every record still moving through the clinic, in queue order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn pending(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut records = self.store.list_all().await?;
        records.retain(|r| !r.status.is_terminal());
        records.sort_by_key(queue_position);
        Ok(records)
    }

    /// Count today's records per status.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn counts_today(&self) -> Result<DailyCounts, StoreError> {
        let records = self.store.list_all().await?;
        let today = clinic_day(self.clock.now(), self.offset);

        let mut counts = DailyCounts::default();
        for record in records {
            if clinic_day(record.created_at, self.offset) != today {
                continue;
            }
            counts.total += 1;
            match record.status {
                AttendanceStatus::Waiting => counts.waiting += 1,
                AttendanceStatus::InTriage => counts.in_triage += 1,
                AttendanceStatus::InConsultation => counts.in_consultation += 1,
                AttendanceStatus::Closed => counts.closed += 1,
            }
        }
        Ok(counts)
    }

    /// The most recently called record, if any patient was called yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn latest_call(&self) -> Result<Option<AttendanceRecord>, StoreError> {
        let records = self.store.list_all().await?;
        Ok(records
            .into_iter()
            .filter(AttendanceRecord::is_called)
            .max_by_key(|r| r.called_at))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use careflow_core::record::{PriorityClass, Version};
    use careflow_memory::MemoryStore;
    use careflow_testing::{FixedClock, RecordBuilder, test_clock};
    use chrono::{Duration, Offset, Utc};

    fn facade(store: &MemoryStore, clock: Arc<FixedClock>) -> QueryFacade {
        QueryFacade::new(Arc::new(store.clone()), clock, Utc.fix())
    }

    async fn seed(store: &MemoryStore, record: AttendanceRecord) {
        store.put(record, Version::INITIAL).await.unwrap();
    }

    #[tokio::test]
    async fn waiting_list_comes_back_in_queue_order() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());
        let base = clock.now();

        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(1)
                .priority(PriorityClass::Normal)
                .created_at(base)
                .build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(2)
                .priority(PriorityClass::Urgent)
                .created_at(base + Duration::minutes(10))
                .build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(3)
                .priority(PriorityClass::Preferential)
                .created_at(base + Duration::minutes(5))
                .build(),
        )
        .await;

        let waiting = facade(&store, clock)
            .by_status(AttendanceStatus::Waiting)
            .await
            .unwrap();

        let tickets: Vec<&str> = waiting.iter().map(|r| r.ticket_code.as_str()).collect();
        assert_eq!(tickets, vec!["A002", "A003", "A001"]);
    }

    #[tokio::test]
    async fn called_statuses_come_back_newest_call_first() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());
        let base = clock.now();

        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(1)
                .status(AttendanceStatus::InTriage)
                .called_at(base)
                .version(Version::new(2))
                .build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(2)
                .status(AttendanceStatus::InTriage)
                .called_at(base + Duration::minutes(2))
                .version(Version::new(2))
                .build(),
        )
        .await;

        let in_triage = facade(&store, clock)
            .by_status(AttendanceStatus::InTriage)
            .await
            .unwrap();

        let tickets: Vec<&str> = in_triage.iter().map(|r| r.ticket_code.as_str()).collect();
        assert_eq!(tickets, vec!["A002", "A001"]);
    }

    #[tokio::test]
    async fn pending_excludes_closed_records() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());

        seed(&store, RecordBuilder::new().ticket_sequence(1).build()).await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(2)
                .status(AttendanceStatus::Closed)
                .called_at(clock.now())
                .version(Version::new(4))
                .build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(3)
                .status(AttendanceStatus::InConsultation)
                .called_at(clock.now())
                .version(Version::new(3))
                .build(),
        )
        .await;

        let pending = facade(&store, clock).pending().await.unwrap();

        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|r| !r.status.is_terminal()));
    }

    #[tokio::test]
    async fn counts_bucket_by_status_and_skip_other_days() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());
        let today = clock.now();

        seed(
            &store,
            RecordBuilder::new().ticket_sequence(1).created_at(today).build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(2)
                .status(AttendanceStatus::InTriage)
                .created_at(today)
                .called_at(today)
                .version(Version::new(2))
                .build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(3)
                .status(AttendanceStatus::Closed)
                .created_at(today)
                .called_at(today)
                .version(Version::new(4))
                .build(),
        )
        .await;
        // Yesterday's leftover record must not count.
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(41)
                .status(AttendanceStatus::Closed)
                .created_at(today - Duration::days(1))
                .version(Version::new(4))
                .build(),
        )
        .await;

        let counts = facade(&store, clock).counts_today().await.unwrap();

        assert_eq!(
            counts,
            DailyCounts {
                waiting: 1,
                in_triage: 1,
                in_consultation: 0,
                closed: 1,
                total: 3,
            }
        );
    }

    #[tokio::test]
    async fn empty_store_counts_zero() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());

        let counts = facade(&store, clock).counts_today().await.unwrap();
        assert_eq!(counts, DailyCounts::default());
    }

    #[tokio::test]
    async fn latest_call_tracks_the_newest_call() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());
        let base = clock.now();

        seed(&store, RecordBuilder::new().ticket_sequence(1).build()).await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(2)
                .status(AttendanceStatus::InConsultation)
                .called_at(base)
                .version(Version::new(3))
                .build(),
        )
        .await;
        seed(
            &store,
            RecordBuilder::new()
                .ticket_sequence(3)
                .status(AttendanceStatus::InTriage)
                .called_at(base + Duration::minutes(1))
                .version(Version::new(2))
                .build(),
        )
        .await;

        let latest = facade(&store, clock).latest_call().await.unwrap().unwrap();
        assert_eq!(latest.ticket_code.as_str(), "A003");
    }

    #[tokio::test]
    async fn latest_call_is_none_before_any_call() {
        let store = MemoryStore::new();
        let clock = Arc::new(test_clock());

        seed(&store, RecordBuilder::new().build()).await;

        assert!(facade(&store, clock).latest_call().await.unwrap().is_none());
    }
}
