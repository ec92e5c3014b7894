//! Cooperative kill switch.
//!
//! Presence of a marker file instructs the executor to wind down at the
//! next cycle boundary. The check is deliberately polled rather than
//! interrupt-driven: a cycle is never cancelled mid-flight, so an order
//! is never left half-placed.

use std::path::{Path, PathBuf};

use tracing::warn;

/// File-presence kill switch.
#[derive(Debug, Clone)]
pub struct KillSwitch {
    path: PathBuf,
}

impl KillSwitch {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The marker path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn engaged(&self) -> bool {
        self.path.exists()
    }

    /// Remove the marker so the next start is clean. Best effort.
    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(error = %e, path = %self.path.display(), "failed to clear kill switch");
            }
        }
    }
}
