//! Application configuration.

use std::path::Path;

use carry_executor::ExecutorConfig;
use carry_risk::RiskConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "CARRY_CONFIG";

/// Environment variable that must carry [`LIVE_CONFIRM_VALUE`] before
/// live execution is honored. Second gate against accidental real
/// trading: the config file alone is not enough.
pub const LIVE_CONFIRM_ENV: &str = "CARRY_LIVE_CONFIRM";

/// Required value of [`LIVE_CONFIRM_ENV`].
pub const LIVE_CONFIRM_VALUE: &str = "yes-i-know";

/// Run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Simulated fills, no real orders.
    #[default]
    Paper,
    /// Real execution. Requires the environment confirmation too.
    Live,
}

/// Paper backend parameters: the synthetic market a dry run trades
/// against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Reference price the synthetic quotes straddle.
    #[serde(default = "default_reference_price")]
    pub reference_price: Decimal,
    /// Scripted per-period funding rate.
    #[serde(default = "default_paper_funding_rate")]
    pub funding_rate: Decimal,
    /// Half spread around the reference, in basis points.
    #[serde(default = "default_half_spread_bps")]
    pub half_spread_bps: Decimal,
}

fn default_reference_price() -> Decimal {
    Decimal::from(50_000)
}

fn default_paper_funding_rate() -> Decimal {
    // 12 bps per period: 3 bps edge after the default cost model, so a
    // default paper run actually trades.
    Decimal::new(12, 4)
}

fn default_half_spread_bps() -> Decimal {
    Decimal::ONE
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            reference_price: default_reference_price(),
            funding_rate: default_paper_funding_rate(),
            half_spread_bps: default_half_spread_bps(),
        }
    }
}

/// Where durable state lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Run-state snapshot path.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Trade journal directory.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,
    /// Journal records buffered before flush.
    #[serde(default = "default_journal_buffer")]
    pub journal_buffer: usize,
}

fn default_snapshot_path() -> String {
    "data/state.json".to_string()
}

fn default_journal_dir() -> String {
    "data/journal".to_string()
}

fn default_journal_buffer() -> usize {
    16
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            journal_dir: default_journal_dir(),
            journal_buffer: default_journal_buffer(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Run mode.
    #[serde(default)]
    pub mode: RunMode,
    /// Execution loop parameters.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// Risk guard bounds.
    #[serde(default)]
    pub risk: RiskConfig,
    /// Durable state paths.
    #[serde(default)]
    pub state: StateConfig,
    /// Paper backend parameters.
    #[serde(default)]
    pub paper: PaperConfig,
    /// Kill switch marker file.
    #[serde(default = "default_kill_switch_path")]
    pub kill_switch_path: String,
    /// Webhook URL for notifications. Logs only when absent.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_kill_switch_path() -> String {
    "carry.kill".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            executor: ExecutorConfig::default(),
            risk: RiskConfig::default(),
            state: StateConfig::default(),
            paper: PaperConfig::default(),
            kill_switch_path: default_kill_switch_path(),
            webhook_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration: explicit path, else `CARRY_CONFIG`, else
    /// `config/default.toml`, else built-in defaults.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let config_path = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }

    /// Whether this run uses simulated fills.
    ///
    /// Live execution is double-gated: `mode = "live"` in the config
    /// AND `CARRY_LIVE_CONFIRM=yes-i-know` in the environment. Anything
    /// less downgrades to paper with a warning.
    #[must_use]
    pub fn effective_dry_run(&self) -> bool {
        let confirm = std::env::var(LIVE_CONFIRM_ENV).ok();
        let dry_run = !live_confirmed(self.mode, confirm.as_deref());
        if self.mode == RunMode::Live && dry_run {
            tracing::warn!(
                "live mode configured but {LIVE_CONFIRM_ENV} not set to '{LIVE_CONFIRM_VALUE}', downgrading to paper"
            );
        }
        dry_run
    }
}

/// Pure double-gate check.
fn live_confirmed(mode: RunMode, confirm_env: Option<&str>) -> bool {
    mode == RunMode::Live && confirm_env == Some(LIVE_CONFIRM_VALUE)
}
