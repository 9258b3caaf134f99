//! HTTP surface for the credit ledger engine: task lifecycle, balances,
//! referral stats, withdrawals, and admin reversals over a shared engine.

mod server;

pub use server::{serve, ServerError};
