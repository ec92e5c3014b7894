//! Clock abstraction.
//!
//! The loop sleeps between cycles through an injected clock so tests
//! can drive a fixed number of cycles without real time passing.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Time source and scheduler for the execution loop.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the loop for `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Shared trait object alias.
pub type DynClock = Arc<dyn Clock>;

/// Production clock: `Utc::now` and tokio timers.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test clock: time only moves when told to, and `sleep` advances it
/// instantly instead of suspending.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move time forward.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock();
        *now += duration;
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        self.advance(chrono::Duration::from_std(duration).unwrap_or_else(|_| {
            chrono::Duration::seconds(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
        }));
        Box::pin(std::future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        clock.sleep(Duration::from_secs(300)).await;

        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        clock.advance(chrono::Duration::hours(7));
        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap()
        );

        let later = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
