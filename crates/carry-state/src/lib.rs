//! Durable state for the carry executor.
//!
//! Two artifacts live on disk:
//! - the [`StateStore`] snapshot: a single JSON object holding the open
//!   position and run mode, rewritten atomically after every
//!   state-changing action and read once at startup
//! - the [`TradeJournal`]: an append-only JSON Lines file of lifecycle
//!   events (open, funding, close, shutdown) for offline analysis
//!
//! No other component reads or writes these files directly.

pub mod error;
pub mod journal;
pub mod store;

pub use error::{StateError, StateResult};
pub use journal::{JournalEvent, JournalRecord, TradeJournal};
pub use store::{RunState, StateStore};
