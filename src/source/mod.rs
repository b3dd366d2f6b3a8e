//! Metrics source seam: where readings come from.
//!
//! A source returns either a snapshot of the configured metrics it knows
//! about or an `SmxError::Fetch`. Every kind of failure (transport, status,
//! payload shape) looks the same to the update loop.

#![allow(missing_docs)]

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::core::errors::{Result, SmxError};
use crate::display::value::RawValue;

#[cfg(feature = "http")]
pub mod http;

/// Readings from one successful fetch, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot {
    values: HashMap<String, RawValue>,
}

impl MetricSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RawValue) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Something the update loop can poll for readings.
pub trait MetricsSource {
    /// Take one snapshot. Called at most once per cycle.
    fn fetch(&mut self) -> Result<MetricSnapshot>;
}

/// Turn a decoded payload into a snapshot of the `wanted` metrics.
///
/// The payload must be a flat object. Keys not in `wanted` are ignored; a
/// wanted key whose value is neither a number nor a string fails the whole
/// payload.
pub fn parse_snapshot<S: AsRef<str>>(payload: &Value, wanted: &[S]) -> Result<MetricSnapshot> {
    let Value::Object(object) = payload else {
        return Err(SmxError::fetch(format!(
            "expected a JSON object, got {}",
            value_kind(payload)
        )));
    };

    let mut snapshot = MetricSnapshot::new();
    for key in wanted {
        let key = key.as_ref();
        match object.get(key) {
            None => {}
            Some(Value::Number(number)) => {
                snapshot.insert(key, RawValue::Number(number.clone()));
            }
            Some(Value::String(text)) => snapshot.insert(key, RawValue::Text(text.clone())),
            Some(other) => {
                return Err(SmxError::fetch(format!(
                    "metric {key:?} has unsupported value type {}",
                    value_kind(other)
                )));
            }
        }
    }
    Ok(snapshot)
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ──────────────────── scripted source ────────────────────

/// Replays a fixed sequence of fetch outcomes, then keeps failing.
///
/// Drives the update loop deterministically in tests and dry runs.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    outcomes: VecDeque<Option<MetricSnapshot>>,
    fetches: usize,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful fetch.
    #[must_use]
    pub fn then_ok(mut self, snapshot: MetricSnapshot) -> Self {
        self.outcomes.push_back(Some(snapshot));
        self
    }

    /// Queue `count` failed fetches.
    #[must_use]
    pub fn then_fail(mut self, count: usize) -> Self {
        self.outcomes.extend(std::iter::repeat_n(None, count));
        self
    }

    pub fn push(&mut self, outcome: Option<MetricSnapshot>) {
        self.outcomes.push_back(outcome);
    }

    /// Number of times `fetch` has been called.
    #[must_use]
    pub const fn fetches(&self) -> usize {
        self.fetches
    }
}

impl MetricsSource for ScriptedSource {
    fn fetch(&mut self) -> Result<MetricSnapshot> {
        self.fetches += 1;
        match self.outcomes.pop_front() {
            Some(Some(snapshot)) => Ok(snapshot),
            Some(None) => Err(SmxError::fetch("scripted failure")),
            None => Err(SmxError::fetch("script exhausted")),
        }
    }
}
