//! Pre-trade risk guard.
//!
//! Every candidate trade passes through [`RiskGuard::evaluate`] before
//! any order is placed. The guard prioritizes not trading over trading
//! when in doubt: the checks run in a fixed order and the first failure
//! rejects the trade.

pub mod config;
pub mod guard;

pub use config::RiskConfig;
pub use guard::{RejectReason, RiskGuard};
