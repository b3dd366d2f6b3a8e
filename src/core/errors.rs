//! SMX-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SmxError>;

/// Top-level error type for stat_matrix.
#[derive(Debug, Error)]
pub enum SmxError {
    #[error("[SMX-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SMX-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SMX-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SMX-1101] too many metrics: {count} configured, at most {max} fit the display")]
    TooManyMetrics { count: usize, max: usize },

    #[error("[SMX-1102] metric {key:?} is too wide: {width} characters, row budget is {budget}")]
    RowTooWide {
        key: String,
        width: usize,
        budget: usize,
    },

    #[error("[SMX-1103] metric {key:?} is configured more than once")]
    DuplicateMetric { key: String },

    #[error("[SMX-2001] metrics fetch failed: {details}")]
    Fetch { details: String },

    #[error("[SMX-2002] render failed: {details}")]
    Render { details: String },

    #[error("[SMX-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SMX-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SmxError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SMX-1001",
            Self::MissingConfig { .. } => "SMX-1002",
            Self::ConfigParse { .. } => "SMX-1003",
            Self::TooManyMetrics { .. } => "SMX-1101",
            Self::RowTooWide { .. } => "SMX-1102",
            Self::DuplicateMetric { .. } => "SMX-1103",
            Self::Fetch { .. } => "SMX-2001",
            Self::Render { .. } => "SMX-2002",
            Self::Serialization { .. } => "SMX-2101",
            Self::Io { .. } => "SMX-3002",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Render { .. } | Self::Io { .. })
    }

    /// Whether the error is a startup configuration problem.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::TooManyMetrics { .. }
                | Self::RowTooWide { .. }
                | Self::DuplicateMetric { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for fetch failures.
    #[must_use]
    pub fn fetch(details: impl Into<String>) -> Self {
        Self::Fetch {
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for SmxError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SmxError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for SmxError {
    fn from(value: reqwest::Error) -> Self {
        Self::Fetch {
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SmxError> {
        vec![
            SmxError::InvalidConfig {
                details: String::new(),
            },
            SmxError::MissingConfig {
                path: PathBuf::new(),
            },
            SmxError::ConfigParse {
                context: "",
                details: String::new(),
            },
            SmxError::TooManyMetrics { count: 4, max: 3 },
            SmxError::RowTooWide {
                key: String::new(),
                width: 11,
                budget: 10,
            },
            SmxError::DuplicateMetric { key: String::new() },
            SmxError::Fetch {
                details: String::new(),
            },
            SmxError::Render {
                details: String::new(),
            },
            SmxError::Serialization {
                context: "",
                details: String::new(),
            },
            SmxError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(SmxError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_includes_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain {}: {msg}",
                err.code()
            );
        }
    }

    #[test]
    fn row_too_wide_names_metric_and_width() {
        let err = SmxError::RowTooWide {
            key: "Temperature".to_string(),
            width: 17,
            budget: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("Temperature"), "{msg}");
        assert!(msg.contains("17"), "{msg}");
    }

    #[test]
    fn config_errors_are_not_retryable() {
        for err in all_variants() {
            if err.is_config_error() {
                assert!(!err.is_retryable(), "{} should not be retryable", err.code());
            }
        }
        assert!(SmxError::fetch("timeout").is_retryable());
        assert!(
            SmxError::TooManyMetrics { count: 5, max: 3 }.is_config_error()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = SmxError::io(
            "/tmp/smx.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "SMX-3002");
        assert!(err.to_string().contains("/tmp/smx.jsonl"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SmxError = json_err.into();
        assert_eq!(err.code(), "SMX-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: SmxError = toml_err.into();
        assert_eq!(err.code(), "SMX-1003");
    }
}
