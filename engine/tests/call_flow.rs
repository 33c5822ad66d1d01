//! Integration tests for the full attendance flow.
//!
//! Exercises the engine end to end over the in-memory store: register,
//! call in priority order, walk the status chain, announce, and query.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use careflow_core::environment::Clock;
use careflow_core::record::{AttendanceStatus, Destination, PatientId, PriorityClass, Version};
use careflow_core::store::AttendanceStore;
use careflow_engine::{
    AttendanceEngine, CallTracker, DailyCounts, EngineConfig, EngineError,
};
use careflow_memory::MemoryStore;
use careflow_testing::{FixedClock, RecordBuilder, StaticPatientDirectory, init_tracing, test_clock};
use chrono::Duration;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::broadcast::error::RecvError;

// ============================================================================
// Test Fixtures
// ============================================================================

fn test_engine() -> (Arc<MemoryStore>, Arc<FixedClock>, AttendanceEngine) {
    test_engine_with(EngineConfig::default())
}

fn test_engine_with(config: EngineConfig) -> (Arc<MemoryStore>, Arc<FixedClock>, AttendanceEngine) {
    let store = Arc::new(MemoryStore::with_change_capacity(config.change_feed_capacity));
    let clock = Arc::new(test_clock());
    let directory = StaticPatientDirectory::new()
        .with_patient(PatientId::new(7), "Ana Souza")
        .with_patient(PatientId::new(8), "Bruno Lima")
        .with_patient(PatientId::new(9), "Clara Nunes");
    let engine = AttendanceEngine::with_clock(
        store.clone(),
        Arc::new(directory),
        config,
        clock.clone(),
    );
    (store, clock, engine)
}

// ============================================================================
// Tests
// ============================================================================

/// A morning at the clinic: two walk-ins, urgent first, queue drains.
#[tokio::test]
async fn urgent_walk_in_overtakes_the_queue() {
    init_tracing();
    let (_store, clock, engine) = test_engine();

    let bruno = engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();
    clock.advance(Duration::minutes(5));
    let ana = engine
        .create_attendance(PatientId::new(7), PriorityClass::Urgent)
        .await
        .unwrap();

    assert_eq!(bruno.ticket_code.as_str(), "A001");
    assert_eq!(ana.ticket_code.as_str(), "A002");

    // Ana arrived later but is urgent, so she is called first.
    let first = engine.call_next().await.unwrap().into_record().unwrap();
    assert_eq!(first.id, ana.id);
    assert_eq!(first.patient_name, "Ana Souza");

    let second = engine.call_next().await.unwrap().into_record().unwrap();
    assert_eq!(second.id, bruno.id);

    assert!(engine.call_next().await.unwrap().is_empty());
}

#[tokio::test]
async fn call_next_on_an_empty_clinic_is_empty() {
    let (_store, _clock, engine) = test_engine();
    assert!(engine.call_next().await.unwrap().is_empty());
}

/// Registration through closure, with the call time stamped once.
#[tokio::test]
async fn a_record_walks_the_full_chain() {
    let (_store, clock, engine) = test_engine();

    let record = engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    assert_eq!(record.version, Version::new(1));

    clock.advance(Duration::minutes(10));
    let called = engine.call_next().await.unwrap().into_record().unwrap();
    assert_eq!(called.status, AttendanceStatus::InTriage);
    assert_eq!(called.called_at, Some(clock.now()));
    assert_eq!(called.called_to, Some(Destination::Triage));
    assert_eq!(called.version, Version::new(2));

    clock.advance(Duration::minutes(15));
    let in_consultation = engine
        .advance(called.id, AttendanceStatus::InConsultation, called.version)
        .await
        .unwrap();
    let closed = engine
        .advance(
            in_consultation.id,
            AttendanceStatus::Closed,
            in_consultation.version,
        )
        .await
        .unwrap();

    assert_eq!(closed.status, AttendanceStatus::Closed);
    assert_eq!(closed.version, Version::new(4));
    // The closed record still reflects the original summons.
    assert_eq!(closed.called_at, called.called_at);
    assert_eq!(closed.called_to, called.called_to);
}

#[tokio::test]
async fn fifo_holds_within_a_priority_class() {
    let (_store, clock, engine) = test_engine();

    let first = engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    clock.advance(Duration::minutes(1));
    let second = engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();
    clock.advance(Duration::minutes(1));
    let third = engine
        .create_attendance(PatientId::new(9), PriorityClass::Normal)
        .await
        .unwrap();

    let order: Vec<_> = vec![
        engine.call_next().await.unwrap().into_record().unwrap().id,
        engine.call_next().await.unwrap().into_record().unwrap().id,
        engine.call_next().await.unwrap().into_record().unwrap().id,
    ];
    assert_eq!(order, vec![first.id, second.id, third.id]);
}

/// Subscribers hear each call exactly once, with the PA payload.
#[tokio::test]
async fn announcements_arrive_exactly_once_per_call() {
    init_tracing();
    let (_store, clock, engine) = test_engine();

    let mut calls = engine.subscribe_calls();

    engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    clock.advance(Duration::minutes(2));
    engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();

    assert!(!engine.call_next().await.unwrap().is_empty());
    assert!(!engine.call_next().await.unwrap().is_empty());

    let first = tokio::time::timeout(StdDuration::from_secs(1), calls.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.ticket_code.as_str(), "A001");
    assert_eq!(first.patient_name, "Ana Souza");
    assert_eq!(first.destination.to_string(), "triage");

    let second = tokio::time::timeout(StdDuration::from_secs(1), calls.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.ticket_code.as_str(), "A002");
    assert_eq!(second.patient_name, "Bruno Lima");

    // No third call happened, so the stream stays quiet.
    let quiet = tokio::time::timeout(StdDuration::from_millis(50), calls.next()).await;
    assert!(quiet.is_err());
}

#[tokio::test]
async fn late_subscribers_do_not_replay_history() {
    let (_store, clock, engine) = test_engine();

    engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    assert!(!engine.call_next().await.unwrap().is_empty());

    // Subscribed after the first call: only the next call is heard.
    let mut calls = engine.subscribe_calls();

    clock.advance(Duration::minutes(3));
    engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();
    assert!(!engine.call_next().await.unwrap().is_empty());

    let heard = tokio::time::timeout(StdDuration::from_secs(1), calls.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(heard.patient_name, "Bruno Lima");

    let quiet = tokio::time::timeout(StdDuration::from_millis(50), calls.next()).await;
    assert!(quiet.is_err());
}

/// The configured feed capacity bounds the broadcast buffer: a
/// subscriber that sleeps through more changes than the buffer holds
/// observes a lag marker and resumes from the oldest retained change.
#[tokio::test]
async fn change_feed_capacity_bounds_the_subscriber_buffer() {
    let config = EngineConfig::default().with_change_feed_capacity(1);
    let (store, _clock, engine) = test_engine_with(config);

    let mut changes = store.subscribe_changes();

    for patient in [7u64, 8, 9] {
        engine
            .create_attendance(PatientId::new(patient), PriorityClass::Normal)
            .await
            .unwrap();
    }

    // Three changes went past a buffer of one.
    assert!(matches!(changes.recv().await, Err(RecvError::Lagged(_))));
    let retained = changes.recv().await.unwrap();
    assert_eq!(retained.record.ticket_code.as_str(), "A003");
}

/// Poll-style displays reach the same exactly-once behavior by diffing
/// listings through a tracker.
#[tokio::test]
async fn polling_displays_deduplicate_calls() {
    let (_store, clock, engine) = test_engine();

    engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    clock.advance(Duration::minutes(1));
    engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();

    assert!(!engine.call_next().await.unwrap().is_empty());
    assert!(!engine.call_next().await.unwrap().is_empty());

    let mut display = CallTracker::new();
    let listing = engine
        .list_by_status(AttendanceStatus::InTriage)
        .await
        .unwrap();

    let announcements = display.poll(&listing);
    assert_eq!(announcements.len(), 2);
    assert_eq!(announcements[0].ticket_code.as_str(), "A001");
    assert_eq!(announcements[1].ticket_code.as_str(), "A002");

    // The same listing polled again announces nothing new.
    assert!(display.poll(&listing).is_empty());

    // Another display has its own tracker and still announces both.
    let mut other_display = CallTracker::new();
    assert_eq!(other_display.poll(&listing).len(), 2);
}

#[tokio::test]
async fn counters_cover_only_the_clinic_day() {
    let (store, clock, engine) = test_engine();

    engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();
    engine
        .create_attendance(PatientId::new(9), PriorityClass::Preferential)
        .await
        .unwrap();

    let called = engine.call_next().await.unwrap().into_record().unwrap();
    engine
        .advance(called.id, AttendanceStatus::InConsultation, called.version)
        .await
        .unwrap();

    // A leftover record from yesterday must not show up in today's counts.
    store
        .put(
            RecordBuilder::new()
                .ticket_sequence(41)
                .status(AttendanceStatus::Closed)
                .created_at(clock.now() - Duration::days(1))
                .version(Version::new(4))
                .build(),
            Version::INITIAL,
        )
        .await
        .unwrap();

    let counts = engine.counts_today().await.unwrap();
    assert_eq!(
        counts,
        DailyCounts {
            waiting: 2,
            in_triage: 0,
            in_consultation: 1,
            closed: 0,
            total: 3,
        }
    );
}

#[tokio::test]
async fn latest_call_follows_the_most_recent_summons() {
    let (_store, clock, engine) = test_engine();

    engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    engine
        .create_attendance(PatientId::new(8), PriorityClass::Normal)
        .await
        .unwrap();

    assert!(engine.latest_call().await.unwrap().is_none());

    let first = engine.call_next().await.unwrap().into_record().unwrap();
    clock.advance(Duration::minutes(4));
    let second = engine.call_next().await.unwrap().into_record().unwrap();

    let latest = engine.latest_call().await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
    assert_ne!(latest.id, first.id);
}

/// After a restart the sequence resumes past tickets already issued today.
#[tokio::test]
async fn restart_recovery_never_reissues_todays_tickets() {
    let (store, _clock, engine) = test_engine();

    store
        .put(
            RecordBuilder::new().ticket_sequence(5).build(),
            Version::INITIAL,
        )
        .await
        .unwrap();

    let last = engine.recover_sequence().await.unwrap();
    assert_eq!(last, 5);

    let next = engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    assert_eq!(next.ticket_code.as_str(), "A006");
}

#[tokio::test]
async fn recovery_ignores_yesterdays_tickets() {
    let (store, clock, engine) = test_engine();

    store
        .put(
            RecordBuilder::new()
                .ticket_sequence(41)
                .status(AttendanceStatus::Closed)
                .created_at(clock.now() - Duration::days(1))
                .version(Version::new(4))
                .build(),
            Version::INITIAL,
        )
        .await
        .unwrap();

    let last = engine.recover_sequence().await.unwrap();
    assert_eq!(last, 0);

    let next = engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    assert_eq!(next.ticket_code.as_str(), "A001");
}

#[tokio::test]
async fn unknown_walk_ins_are_rejected_before_ticketing() {
    let (_store, _clock, engine) = test_engine();

    let result = engine
        .create_attendance(PatientId::new(999), PriorityClass::Urgent)
        .await;
    assert_eq!(result, Err(EngineError::UnknownPatient(PatientId::new(999))));

    // The rejected attempt must not burn a ticket number.
    let record = engine
        .create_attendance(PatientId::new(7), PriorityClass::Normal)
        .await
        .unwrap();
    assert_eq!(record.ticket_code.as_str(), "A001");
}
