//! Raw metric readings as they arrive from a metrics source.

use std::fmt;
use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A reading for one metric: a JSON number or a string.
///
/// Strings are kept verbatim; whether they are numeric is decided when the
/// value is colorized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(Number),
    Text(String),
}

impl RawValue {
    /// Build a reading from a float; `None` for NaN and infinities.
    #[must_use]
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self::Number)
    }

    /// Interpret the reading as an integer.
    ///
    /// Integers beyond `i64` saturate, floats truncate toward zero, strings
    /// must be an optionally signed base-10 integer after trimming and
    /// saturate the same way when out of range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Number(number) => number
                .as_i64()
                .or_else(|| number.as_u64().map(|_| i64::MAX))
                .or_else(|| number.as_f64().map(|f| f.trunc() as i64)),
            Self::Text(text) => match text.trim().parse::<i64>() {
                Ok(value) => Some(value),
                Err(err) => match err.kind() {
                    IntErrorKind::PosOverflow => Some(i64::MAX),
                    IntErrorKind::NegOverflow => Some(i64::MIN),
                    _ => None,
                },
            },
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
