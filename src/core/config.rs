//! Configuration system: TOML file + env var overrides + reference defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SmxError};
use crate::core::paths;
use crate::display::color::Color;
use crate::display::spec::{MetricSpec, Threshold, Thresholds, validate_specs};

/// Full stat_matrix configuration model.
///
/// Built once at startup and only read afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Endpoint polled by the HTTP metrics source.
    pub api_url: String,
    pub size: DisplaySize,
    pub background_color: Color,
    /// Seconds between cycles.
    pub update_interval: f64,
    /// Consecutive misses tolerated before a row falls back.
    pub keep_values_on_fail: u32,
    pub request_timeout_secs: u64,
    pub failure_scope: FailureScope,
    pub logging: LoggingConfig,
    /// Metric rows in display order.
    #[serde(with = "crate::display::spec::metric_table")]
    pub data: Vec<MetricSpec>,
}

/// Physical panel geometry, written `[width, height, bit_depth]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u16, u16, u8)", into = "(u16, u16, u8)")]
pub struct DisplaySize {
    pub width: u16,
    pub height: u16,
    pub bit_depth: u8,
}

impl From<(u16, u16, u8)> for DisplaySize {
    fn from((width, height, bit_depth): (u16, u16, u8)) -> Self {
        Self {
            width,
            height,
            bit_depth,
        }
    }
}

impl From<DisplaySize> for (u16, u16, u8) {
    fn from(value: DisplaySize) -> Self {
        (value.width, value.height, value.bit_depth)
    }
}

impl Default for DisplaySize {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            bit_depth: 3,
        }
    }
}

/// How missed readings are counted against `keep_values_on_fail`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// One counter for the whole panel, bumped at most once per cycle.
    #[default]
    Shared,
    /// One counter per row.
    PerRow,
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shared => "shared",
            Self::PerRow => "per_row",
        })
    }
}

impl FromStr for FailureScope {
    type Err = SmxError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "per_row" | "per-row" => Ok(Self::PerRow),
            other => Err(SmxError::ConfigParse {
                context: "failure_scope",
                details: format!("expected \"shared\" or \"per_row\", got {other:?}"),
            }),
        }
    }
}

/// Structured activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub activity_log: PathBuf,
    /// Used when the primary log cannot be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_log: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activity_log: paths::default_activity_log(),
            fallback_log: None,
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/data".to_string(),
            size: DisplaySize::default(),
            background_color: Color::BLACK,
            update_interval: 1.0,
            keep_values_on_fail: 5,
            request_timeout_secs: 5,
            failure_scope: FailureScope::Shared,
            logging: LoggingConfig::default(),
            data: reference_metrics(),
        }
    }
}

/// CPU, RAM and Temp rows, each with a traffic-light band set.
#[must_use]
pub fn reference_metrics() -> Vec<MetricSpec> {
    let metric = |key: &str, unit: &str, high: i64, med: i64, low: i64| MetricSpec {
        key: key.to_string(),
        color: Color::WHITE,
        unit: unit.to_string(),
        placeholder: Some("0".to_string()),
        max_length: 3,
        thresholds: Thresholds {
            high: Threshold::new(high, Color::RED),
            med: Threshold::new(med, Color::YELLOW),
            low: Threshold::new(low, Color::GREEN),
        },
    };
    vec![
        metric("CPU", "%", 90, 50, 0),
        metric("RAM", "%", 70, 50, 10),
        metric("Temp", "C", 70, 60, 40),
    ]
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        paths::default_config_file()
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SmxError::io(&path_buf, source))?;
            toml::from_str(&raw)?
        } else if path.is_some() {
            return Err(SmxError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a TOML document without consulting the environment.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SmxError::Serialization {
            context: "toml",
            details: e.to_string(),
        })
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Sleep between cycles.
    ///
    /// Fails for zero, negative, non-finite, or out-of-range intervals.
    pub fn update_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.update_interval)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or_else(|| SmxError::InvalidConfig {
                details: format!(
                    "update_interval must be a positive number of seconds, got {}",
                    self.update_interval
                ),
            })
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured metric keys in row order.
    #[must_use]
    pub fn metric_keys(&self) -> Vec<&str> {
        self.data.iter().map(|spec| spec.key.as_str()).collect()
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SMX_API_URL") {
            self.api_url = raw.trim().to_string();
        }
        if let Some(raw) = lookup("SMX_UPDATE_INTERVAL") {
            self.update_interval = parse_env("SMX_UPDATE_INTERVAL", &raw)?;
        }
        if let Some(raw) = lookup("SMX_KEEP_VALUES_ON_FAIL") {
            self.keep_values_on_fail = parse_env("SMX_KEEP_VALUES_ON_FAIL", &raw)?;
        }
        if let Some(raw) = lookup("SMX_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("SMX_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SMX_BACKGROUND_COLOR") {
            self.background_color = parse_env("SMX_BACKGROUND_COLOR", &raw)?;
        }
        if let Some(raw) = lookup("SMX_FAILURE_SCOPE") {
            self.failure_scope = parse_env("SMX_FAILURE_SCOPE", &raw)?;
        }
        if let Some(raw) = lookup("SMX_ACTIVITY_LOG") {
            self.logging.activity_log = PathBuf::from(raw.trim());
        }
        Ok(())
    }

    fn normalize_paths(&mut self) {
        self.logging.activity_log = paths::resolve_absolute_path(&self.logging.activity_log);
        if let Some(fallback) = &self.logging.fallback_log {
            self.logging.fallback_log = Some(paths::resolve_absolute_path(fallback));
        }
    }

    /// Check every invariant a running loop relies on.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SmxError::InvalidConfig {
                details: format!("api_url must be an http:// or https:// URL, got {:?}", self.api_url),
            });
        }

        self.update_interval()?;

        if self.request_timeout_secs == 0 {
            return Err(SmxError::InvalidConfig {
                details: "request_timeout_secs must be > 0".to_string(),
            });
        }

        if self.size.width == 0 || self.size.height == 0 {
            return Err(SmxError::InvalidConfig {
                details: format!(
                    "size must have a non-zero width and height, got {}x{}",
                    self.size.width, self.size.height
                ),
            });
        }
        if !(1..=6).contains(&self.size.bit_depth) {
            return Err(SmxError::InvalidConfig {
                details: format!("size bit_depth must be in [1,6], got {}", self.size.bit_depth),
            });
        }

        if self.logging.enabled && self.logging.activity_log.as_os_str().is_empty() {
            return Err(SmxError::InvalidConfig {
                details: "logging.activity_log must not be empty when logging is enabled"
                    .to_string(),
            });
        }

        validate_specs(self.data.clone())?;
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SmxError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
