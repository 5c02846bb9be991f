//! Runtime configuration.
//!
//! Values come from an optional JSON file, then the process environment.
//! Environment variables win over the file. Unparseable numbers, non-finite
//! amounts, a zero dispatch timeout and a zero queue capacity are
//! configuration errors; missing values fall back to defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::dispatcher::DEFAULT_QUEUE_CAPACITY;
use crate::error::{PipelineError, PipelineResult};
use crate::ledger::StockFloor;

/// Default Telegram-compatible bot API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Injected messaging credentials. Absent credentials disable dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotCredentials {
    pub token: String,
    pub chat_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlertConfig {
    /// Post-sale stock at or below this fires a low-stock alert.
    pub low_stock_threshold: i64,
    /// Sale totals strictly above this fire a high-value alert.
    pub high_value_threshold: f64,
    /// Fraction of retail price assumed for wholesale cost estimates.
    pub wholesale_factor: f64,
    pub stock_floor: StockFloor,
    pub credentials: Option<BotCredentials>,
    pub api_base: String,
    pub dispatch_timeout: Duration,
    /// Extra delivery attempts after a failure. Zero means at-most-once.
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_backoff: Duration,
    /// Outbound messages held while the endpoint is slow. Overflow is dropped.
    pub queue_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: 5,
            high_value_threshold: 120.0,
            wholesale_factor: 0.6,
            stock_floor: StockFloor::Unclamped,
            credentials: None,
            api_base: DEFAULT_API_BASE.to_string(),
            dispatch_timeout: Duration::from_secs(5),
            max_retries: 0,
            retry_backoff: Duration::from_millis(500),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    low_stock_threshold: Option<i64>,
    high_value_threshold: Option<f64>,
    wholesale_factor: Option<f64>,
    stock_floor: Option<String>,
    #[serde(alias = "telegram_bot_token")]
    bot_token: Option<String>,
    #[serde(alias = "telegram_chat_id")]
    chat_destination_id: Option<String>,
    #[serde(alias = "stockwatch_api_base")]
    api_base: Option<String>,
    dispatch_timeout_secs: Option<u64>,
    #[serde(alias = "dispatch_max_retries")]
    max_retries: Option<u32>,
    #[serde(alias = "dispatch_queue_capacity")]
    queue_capacity: Option<usize>,
}

impl AlertConfig {
    /// Build from the process environment only.
    pub fn from_env() -> PipelineResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Build from a JSON file, then apply environment overrides.
    pub fn from_file_and_env(path: &Path) -> PipelineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| PipelineError::Config {
            key: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_config_file(file)?.with_overrides(|key| std::env::var(key).ok())
    }

    fn from_config_file(file: ConfigFile) -> PipelineResult<Self> {
        let mut config = Self::default();
        if let Some(v) = file.low_stock_threshold {
            config.low_stock_threshold = v;
        }
        if let Some(v) = file.high_value_threshold {
            config.high_value_threshold = v;
        }
        if let Some(v) = file.wholesale_factor {
            config.wholesale_factor = v;
        }
        if let Some(v) = file.stock_floor {
            config.stock_floor = parse_floor("stock_floor", &v)?;
        }
        if let Some(v) = file.api_base {
            config.api_base = v;
        }
        if let Some(v) = file.dispatch_timeout_secs {
            config.dispatch_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.max_retries {
            config.max_retries = v;
        }
        if let Some(v) = file.queue_capacity {
            config.queue_capacity = v;
        }
        config.credentials = credentials_from(file.bot_token, file.chat_destination_id);
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production,
    /// a map in tests).
    pub fn with_overrides<F>(mut self, lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOW_STOCK_THRESHOLD") {
            self.low_stock_threshold = parse_num("LOW_STOCK_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("HIGH_VALUE_THRESHOLD") {
            self.high_value_threshold = parse_num("HIGH_VALUE_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("WHOLESALE_FACTOR") {
            self.wholesale_factor = parse_num("WHOLESALE_FACTOR", &v)?;
        }
        if let Some(v) = lookup("STOCK_FLOOR") {
            self.stock_floor = parse_floor("STOCK_FLOOR", &v)?;
        }
        if let Some(v) = lookup("STOCKWATCH_API_BASE") {
            self.api_base = v;
        }
        if let Some(v) = lookup("DISPATCH_TIMEOUT_SECS") {
            self.dispatch_timeout =
                Duration::from_secs(parse_num("DISPATCH_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("DISPATCH_MAX_RETRIES") {
            self.max_retries = parse_num("DISPATCH_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("DISPATCH_QUEUE_CAPACITY") {
            self.queue_capacity = parse_num("DISPATCH_QUEUE_CAPACITY", &v)?;
        }

        let token = lookup("TELEGRAM_BOT_TOKEN");
        let chat_id = lookup("TELEGRAM_CHAT_ID");
        if token.is_some() || chat_id.is_some() {
            let current = self.credentials.take();
            let token = token.or_else(|| current.as_ref().map(|c| c.token.clone()));
            let chat_id = chat_id.or_else(|| current.as_ref().map(|c| c.chat_id.clone()));
            self.credentials = credentials_from(token, chat_id);
        }
        self.validate()
    }

    /// Reject values that parse but would silently break alerting.
    fn validate(self) -> PipelineResult<Self> {
        if !self.high_value_threshold.is_finite() {
            return Err(invalid(
                "HIGH_VALUE_THRESHOLD",
                format!("must be a finite amount, got {}", self.high_value_threshold),
            ));
        }
        if !self.wholesale_factor.is_finite() || self.wholesale_factor < 0.0 {
            return Err(invalid(
                "WHOLESALE_FACTOR",
                format!("must be a non-negative number, got {}", self.wholesale_factor),
            ));
        }
        if self.dispatch_timeout.is_zero() {
            return Err(invalid("DISPATCH_TIMEOUT_SECS", "must be at least 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("DISPATCH_QUEUE_CAPACITY", "must be at least 1".to_string()));
        }
        Ok(self)
    }

    pub fn credentials(&self) -> Option<&BotCredentials> {
        self.credentials.as_ref()
    }
}

fn credentials_from(token: Option<String>, chat_id: Option<String>) -> Option<BotCredentials> {
    match (token, chat_id) {
        (Some(token), Some(chat_id)) if !token.trim().is_empty() && !chat_id.trim().is_empty() => {
            Some(BotCredentials { token, chat_id })
        }
        _ => None,
    }
}

fn invalid(key: &str, reason: String) -> PipelineError {
    PipelineError::Config {
        key: key.to_string(),
        reason,
    }
}

fn parse_num<T>(key: &str, value: &str) -> PipelineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| PipelineError::Config {
        key: key.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

fn parse_floor(key: &str, value: &str) -> PipelineResult<StockFloor> {
    match value.trim().to_lowercase().as_str() {
        "unclamped" | "none" | "" => Ok(StockFloor::Unclamped),
        "clamp" | "zero" | "clamp_at_zero" => Ok(StockFloor::ClampAtZero),
        other => Err(PipelineError::Config {
            key: key.to_string(),
            reason: format!("unknown stock floor policy '{}'", other),
        }),
    }
}
