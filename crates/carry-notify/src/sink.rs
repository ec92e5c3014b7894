//! Notification sink trait and implementations.

use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Delivers human-readable status text somewhere a human will see it.
///
/// Returns whether delivery succeeded. Callers must not branch on the
/// result beyond logging; notifications are advisory.
pub trait NotificationSink: Send + Sync {
    fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, bool>;
}

/// Shared trait object alias used throughout the executor.
pub type DynNotificationSink = Arc<dyn NotificationSink>;

/// Sink that writes notifications to the structured log.
///
/// The default when no webhook is configured; also what tests use.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            info!(notification = %text, "notify");
            true
        })
    }
}

/// Sink that POSTs `{"text": ...}` to a webhook URL.
///
/// Failures are swallowed: logged at warn, reported as `false`.
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl NotificationSink for WebhookSink {
    fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let payload = serde_json::json!({ "text": text });
            match self.client.post(&self.url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => true,
                Ok(response) => {
                    warn!(status = %response.status(), "webhook notification rejected");
                    false
                }
                Err(e) => {
                    warn!(error = %e, "webhook notification failed");
                    false
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let sink = LogSink;
        assert!(sink.send("position opened").await);
    }

    #[tokio::test]
    async fn test_webhook_failure_is_swallowed() {
        // Nothing listens here; the sink must report false, not error.
        let sink = WebhookSink::new("http://127.0.0.1:1/hook");
        assert!(!sink.send("position opened").await);
    }
}
