//! Multi-level referral engine.
//!
//! Registers users into a referrer tree, pays fixed per-level rewards up the
//! referrer chain when a user is onboarded, and answers tree and statistics
//! queries. Persistence is behind the [`domain::repo::RecordStore`] port.

// === PUBLIC CONTRACT ===
pub mod contract;

// Re-export the public contract components
pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::Referrals;

// === INTERNAL MODULES ===
// Exposed for tests and for hosts that bring their own record store.
// Other modules should depend on `contract` only.
pub mod config;
pub mod domain;
pub mod gateways;
pub mod infra;
