//! Best-effort notification sinks.
//!
//! Every state transition the executor makes (open, close, funding
//! collection, shutdown) emits a human-readable line through a
//! [`NotificationSink`]. Delivery is fire-and-forget: a failed send is
//! logged and ignored, never retried, never fatal, so the core state
//! machine stays testable without any networked dependency.

pub mod sink;

pub use sink::{BoxFuture, DynNotificationSink, LogSink, NotificationSink, WebhookSink};
