//! Goal Tracker Core - browser-resident credential and goal stores
//!
//! The core of a single-user goal tracking application: accounts with an
//! admin-gated mutation rule, and goals organized along two fixed axes
//! (four sections by five timeframes) with derived tag vocabulary and
//! deterministic ordering. State persists as three JSON records in a
//! durable key-value store - the browser's `localStorage` in production,
//! an in-memory map natively and in tests.
//!
//! Compiled to WebAssembly for the browser (the presentation layer calls
//! the [`wasm`] facade) and natively for tests and embedding.
//!
//! ## Components
//!
//! - **Credential Store**: account records, the single active session,
//!   register/login/logout, and the admin predicate
//! - **Goal Store**: the fixed 20-bucket goal grid, create/delete with
//!   admin gating, deadline-ordered listing, and tag filtering
//! - **Diagnostics**: storage health probing and anonymized export
//!
//! Everything is synchronous and single-actor: one interactive user, no
//! locking, each operation runs to completion before the next.

pub mod account;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod goal;
pub mod password;
pub mod storage;
pub mod tracker;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use account::{Account, AccountIdentity, CredentialStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use diagnostics::{DataExport, ExportedAccount, StorageHealth, StorageItem};
pub use error::{LoadReport, LoadStatus, Result, TrackerError};
pub use goal::{Goal, GoalBuckets, GoalStore, Section, Timeframe};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use tracker::{GoalTracker, InitReport};
