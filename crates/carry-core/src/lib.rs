//! Core domain types for the carry funding-rate arbitrage executor.
//!
//! This crate provides the pure parts of the system:
//! - `Price`, `Size`: precision-safe numeric types
//! - `FundingOpportunity`, `Position`: the opportunity/position model
//! - funding arithmetic: edge, sizing, accrual, realized P&L
//! - funding clock: time-to-next-funding-epoch utilities
//!
//! Nothing in here performs I/O.

pub mod decimal;
pub mod error;
pub mod funding_clock;
pub mod model;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use funding_clock::{
    format_duration, next_funding_at, next_funding_now, time_to_funding_at, time_to_funding_now,
    FUNDING_INTERVAL_HOURS,
};
pub use model::{
    edge_bps, is_profitable, project_window_pnl, size_position, FundingOpportunity, Position,
    WindowPnl,
};
