//! # Careflow Memory
//!
//! Embedded in-memory [`AttendanceStore`] backend: a `HashMap` of records
//! behind an async `RwLock`, with change events fanned out on a broadcast
//! channel.
//!
//! This is the production backend for single-process deployments — the whole
//! clinic runs against one process, and closed records are small enough to
//! retain for the operating day. It is also what every test wires up.
//!
//! ## Locking discipline
//!
//! The write guard is held only for the compare-and-swap itself, never
//! across foreign awaits. Change events are sent after the guard is
//! dropped; a send with no subscribers is a no-op, and a full buffer drops
//! the oldest event rather than blocking the writer.

use careflow_core::record::{AttendanceId, AttendanceRecord, AttendanceStatus, Version};
use careflow_core::store::{AttendanceStore, ChangeFeed, RecordChanged, StoreError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

/// Default capacity of the change-event broadcast buffer.
pub const DEFAULT_CHANGE_CAPACITY: usize = 64;

/// In-memory attendance record store.
///
/// Cloning is cheap and hands out another handle to the same storage, the
/// way every station in the clinic shares one store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<AttendanceId, AttendanceRecord>>>,
    changes: broadcast::Sender<RecordChanged>,
}

impl MemoryStore {
    /// Create an empty store with the default change-feed capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_change_capacity(DEFAULT_CHANGE_CAPACITY)
    }

    /// Create an empty store with a custom change-feed capacity.
    ///
    /// Subscribers that fall more than `capacity` events behind observe a
    /// lag marker and resume from the oldest retained event.
    #[must_use]
    pub fn with_change_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Number of records currently stored, including closed history.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttendanceStore for MemoryStore {
    fn get(
        &self,
        id: AttendanceId,
    ) -> Pin<Box<dyn Future<Output = Result<AttendanceRecord, StoreError>> + Send + '_>> {
        Box::pin(async move {
            self.records
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn put(
        &self,
        record: AttendanceRecord,
        expected_version: Version,
    ) -> Pin<Box<dyn Future<Output = Result<AttendanceRecord, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let old_status = {
                let mut records = self.records.write().await;

                let current = records.get(&record.id);
                let actual = current.map_or(Version::INITIAL, |stored| stored.version);
                if actual != expected_version {
                    return Err(StoreError::VersionConflict {
                        id: record.id,
                        expected: expected_version,
                        actual,
                    });
                }

                let old_status = current.map(|stored| stored.status);
                records.insert(record.id, record.clone());
                old_status
            };

            debug!(
                id = %record.id,
                version = %record.version,
                status = %record.status,
                "record stored"
            );

            // Best-effort fan-out; no subscribers is fine.
            let _ = self.changes.send(RecordChanged {
                old_status,
                record: record.clone(),
            });

            Ok(record)
        })
    }

    fn list_by_status(
        &self,
        status: AttendanceStatus,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let records = self.records.read().await;
            Ok(records
                .values()
                .filter(|record| record.status == status)
                .cloned()
                .collect())
        })
    }

    fn list_all(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AttendanceRecord>, StoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let records = self.records.read().await;
            Ok(records.values().cloned().collect())
        })
    }

    fn subscribe_changes(&self) -> ChangeFeed {
        self.changes.subscribe()
    }
}
