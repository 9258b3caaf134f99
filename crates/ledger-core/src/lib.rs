//! Credit ledger engine: append-only ledger store, daily cap tracker,
//! vesting policy, task completion processor, multi-level commission
//! propagator, and balance/eligibility calculator.
//!
//! All cross-request invariants (idempotent crediting, atomic cap
//! reservation, debit-before-payout) are enforced at the storage layer so
//! that any number of service instances can share one database.

pub mod balance;
pub mod clock;
pub mod commission;
pub mod engine;
pub mod error;
pub mod providers;
pub mod store;
pub mod tasks;
pub mod vesting;

pub use clock::{day_key, Clock, ManualClock, SystemClock};
pub use engine::{DailyBonusClaim, RewardsEngine, TaskCompletion, TaskStart, VipPurchase};
pub use error::CoreError;
pub use store::{SqliteLedgerStore, StoreError};
pub use tasks::TaskCatalog;
