//! # Careflow Core
//!
//! Domain foundation of the careflow attendance queue and call engine:
//! the data model, the status state machine, ticket issuance, and the
//! storage contract every backend implements.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     careflow-engine                     │
//! │        (scheduler, announcer, queries, facade)          │
//! └─────────────────────────────────────────────────────────┘
//!                      │ depends on
//!                      ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                     careflow-core                       │
//! │                                                         │
//! │  record       ids, versions, tickets, priority, status  │
//! │  transitions  validate/apply for the status machine     │
//! │  ticket       daily-epoch ticket sequence               │
//! │  store        AttendanceStore trait + change events     │
//! │  environment  Clock and PatientDirectory seams          │
//! └─────────────────────────────────────────────────────────┘
//!                      ▲ implemented by
//!                      │
//! ┌─────────────────────────────────────────────────────────┐
//! │              careflow-memory (MemoryStore)              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency model
//!
//! Several independent stations (reception, triage, physician desks, public
//! displays) share one store. The only synchronization primitive is the
//! versioned compare-and-swap in [`AttendanceStore::put`]: writers state the
//! version they read, a mismatch rejects the write, and the writer re-reads
//! and retries. Reads never block. Change events fan out on a broadcast
//! channel that never back-pressures the write path.

pub mod environment;
pub mod record;
pub mod store;
pub mod ticket;
pub mod transitions;

// Re-export chrono's core time types; every timestamp in the engine is UTC.
pub use chrono::{DateTime, Utc};

pub use environment::{
    Clock, DirectoryError, PatientDirectory, PatientProfile, SystemClock, clinic_day,
};
pub use record::{
    AttendanceId, AttendanceRecord, AttendanceStatus, Destination, PatientId, PriorityClass,
    TicketCode, Version,
};
pub use store::{AttendanceStore, ChangeFeed, RecordChanged, StoreError};
pub use ticket::TicketSequence;
pub use transitions::{InvalidTransition, apply_transition, validate_transition};
