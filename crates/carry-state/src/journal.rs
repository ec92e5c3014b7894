//! JSON Lines trade journal.
//!
//! Uses JSON Lines format (.jsonl) for robustness:
//! - Each line is a complete JSON object
//! - Partial file corruption only affects individual lines
//! - Can be read even if write was interrupted
//!
//! One record per lifecycle event; files rotate daily.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StateResult;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEvent {
    Opened,
    FundingCollected,
    Closed,
    Shutdown,
}

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub timestamp_ms: i64,
    pub event: JournalEvent,
    pub symbol: String,
    /// Notional at entry, where applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notional: Option<rust_decimal::Decimal>,
    /// Funding collected so far, where applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_collected: Option<rust_decimal::Decimal>,
    /// Realized P&L, on close.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<rust_decimal::Decimal>,
}

/// Active writer state for the daily file.
struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// Buffered JSON Lines writer for journal records.
///
/// Opens files in append mode, so an interrupted run never truncates
/// what an earlier run wrote.
pub struct TradeJournal {
    /// Base directory for journal files.
    base_dir: PathBuf,
    /// Buffer of pending records.
    buffer: Vec<JournalRecord>,
    /// Maximum buffer size before flush.
    max_buffer_size: usize,
    /// Active writer (open until date rotation).
    active_writer: Option<ActiveWriter>,
}

impl TradeJournal {
    /// Create a new journal rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, max_buffer_size: usize) -> Self {
        let base_dir = base_dir.into();
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            warn!(?e, dir = %base_dir.display(), "failed to create journal directory");
        }

        Self {
            base_dir,
            buffer: Vec::with_capacity(max_buffer_size.max(1)),
            max_buffer_size: max_buffer_size.max(1),
            active_writer: None,
        }
    }

    /// Append a record, flushing when the buffer fills.
    pub fn record(&mut self, record: JournalRecord) -> StateResult<()> {
        self.buffer.push(record);

        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Flush buffered records to the daily file.
    pub fn flush(&mut self) -> StateResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let date = Utc::now().format("%Y%m%d").to_string();

        let rotate = match &self.active_writer {
            Some(active) => active.date != date,
            None => true,
        };
        if rotate {
            self.close_active_writer();
            self.open_writer(&date)?;
        }

        let active = self
            .active_writer
            .as_mut()
            .expect("writer opened above for the current date");

        for record in self.buffer.drain(..) {
            serde_json::to_writer(&mut active.writer, &record)?;
            active.writer.write_all(b"\n")?;
            active.records_written += 1;
        }
        active.writer.flush()?;

        Ok(())
    }

    fn open_writer(&mut self, date: &str) -> StateResult<()> {
        let filename = self.base_dir.join(format!("trades_{date}.jsonl"));

        info!(filename = %filename.display(), "opening trade journal (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&filename)?;

        self.active_writer = Some(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });

        Ok(())
    }

    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "failed to flush journal on close");
            }
            info!(
                date = %active.date,
                records = active.records_written,
                "closed trade journal file"
            );
        }
    }
}

impl Drop for TradeJournal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "failed to flush journal on drop");
        }
        self.close_active_writer();
    }
}
