//! Executor phases and per-cycle outcomes.

use std::fmt;

/// Where the state machine currently stands.
///
/// `Idle -> Opening -> Holding -> NearFunding -> Closing -> Idle`, with
/// `ShutDown` terminal. `Opening` and `Closing` are transited within a
/// single cycle while orders are in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorPhase {
    /// No position.
    Idle,
    /// Order placement in flight.
    Opening,
    /// Position open, not near a funding boundary.
    Holding,
    /// Within the pre-funding collect window.
    NearFunding,
    /// Unwind in flight.
    Closing,
    /// Terminal: kill signal or unrecoverable exchange error.
    ShutDown,
}

impl fmt::Display for ExecutorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Opening => write!(f, "opening"),
            Self::Holding => write!(f, "holding"),
            Self::NearFunding => write!(f, "near_funding"),
            Self::Closing => write!(f, "closing"),
            Self::ShutDown => write!(f, "shut_down"),
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A position was opened.
    Opened,
    /// Funding was accrued on the open position.
    Collected,
    /// The position was unwound.
    Closed,
    /// Nothing to do; held current state.
    Held,
    /// Soft failure; cycle skipped without state change.
    Skipped,
    /// The executor escalated to shutdown.
    ShutDown,
}
