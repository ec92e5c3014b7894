//! Error types for the exchange boundary.
//!
//! The executor only distinguishes transient failures (retry, then skip
//! the cycle) from fatal ones (close out and shut down). Everything the
//! exchange can throw maps into one of those two buckets.

use thiserror::Error;

/// Exchange client error types.
#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
    /// Network-level failure (connect, DNS, broken pipe). Transient.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The venue rate-limited us. Transient.
    #[error("Rate limited")]
    RateLimited,

    /// A call exceeded its deadline. Transient.
    #[error("Request timed out")]
    Timeout,

    /// The exchange rejected an order. Transient from the executor's
    /// perspective: the cycle is skipped, no state was mutated.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Credentials revoked or signature refused. Fatal.
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// The instrument no longer exists on the venue. Fatal.
    #[error("Symbol delisted: {0}")]
    Delisted(String),
}

impl ExchangeError {
    /// Whether a retry can reasonably succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Auth(_) | Self::Delisted(_))
    }

    /// Fatal errors force the executor into shutdown.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_transient()
    }
}

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ExchangeError::Transport("reset".into()).is_transient());
        assert!(ExchangeError::RateLimited.is_transient());
        assert!(ExchangeError::Timeout.is_transient());
        assert!(ExchangeError::OrderRejected("px".into()).is_transient());

        assert!(ExchangeError::Auth("revoked".into()).is_fatal());
        assert!(ExchangeError::Delisted("XYZUSDT".into()).is_fatal());
    }
}
