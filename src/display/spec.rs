//! Metric specifications and the startup validator.
//!
//! A display row is ten characters wide: the key, its `": "` separator, the
//! reserved value width and the unit must all fit. At most three rows fit on
//! the panel. Both rules are checked once at startup; the update loop never
//! re-validates.

#![allow(missing_docs)]

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SmxError};
use crate::display::color::Color;

/// Characters available on one display row.
pub const ROW_BUDGET: usize = 10;

/// Maximum number of metric rows on the panel.
pub const MAX_METRICS: usize = 3;

/// Separator rendered between a key and its value.
pub const KEY_SEPARATOR: &str = ": ";

/// One threshold band: values at or above `cutoff` take `color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, Color)", into = "(i64, Color)")]
pub struct Threshold {
    pub cutoff: i64,
    pub color: Color,
}

impl Threshold {
    #[must_use]
    pub const fn new(cutoff: i64, color: Color) -> Self {
        Self { cutoff, color }
    }
}

impl From<(i64, Color)> for Threshold {
    fn from((cutoff, color): (i64, Color)) -> Self {
        Self { cutoff, color }
    }
}

impl From<Threshold> for (i64, Color) {
    fn from(value: Threshold) -> Self {
        (value.cutoff, value.color)
    }
}

/// The three bands of a metric, always evaluated high, then med, then low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    pub high: Threshold,
    pub med: Threshold,
    pub low: Threshold,
}

impl Thresholds {
    /// Bands in evaluation order.
    #[must_use]
    pub const fn in_order(&self) -> [Threshold; 3] {
        [self.high, self.med, self.low]
    }

    /// Whether cutoffs descend `high >= med >= low`.
    ///
    /// Non-monotonic bands are still honored as configured; this only feeds
    /// warnings in `smx check`.
    #[must_use]
    pub const fn is_monotonic(&self) -> bool {
        self.high.cutoff >= self.med.cutoff && self.med.cutoff >= self.low.cutoff
    }
}

/// Display rules for one metric row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSpec {
    /// Display name; carried as the table key in configuration files.
    #[serde(skip)]
    pub key: String,
    /// Default color, used when no band matches or the value is not an integer.
    #[serde(default = "default_metric_color")]
    pub color: Color,
    #[serde(default)]
    pub unit: String,
    /// Text shown once data has been unavailable for too long. `None` blanks
    /// the row instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub max_length: usize,
    pub thresholds: Thresholds,
}

const fn default_metric_color() -> Color {
    Color::WHITE
}

impl MetricSpec {
    /// Characters this metric needs on its row.
    #[must_use]
    pub fn row_width(&self) -> usize {
        self.key.chars().count()
            + KEY_SEPARATOR.len()
            + self.max_length
            + self.unit.chars().count()
    }

    /// Fixed key-cell text, e.g. `"CPU: "`.
    #[must_use]
    pub fn key_text(&self) -> String {
        format!("{}{KEY_SEPARATOR}", self.key)
    }
}

/// Check count, key uniqueness and row width; return the specs in order.
///
/// Fails on the first offending metric.
pub fn validate_specs(specs: Vec<MetricSpec>) -> Result<Vec<MetricSpec>> {
    if specs.len() > MAX_METRICS {
        return Err(SmxError::TooManyMetrics {
            count: specs.len(),
            max: MAX_METRICS,
        });
    }

    let mut seen = HashSet::with_capacity(specs.len());
    for spec in &specs {
        if !seen.insert(spec.key.as_str()) {
            return Err(SmxError::DuplicateMetric {
                key: spec.key.clone(),
            });
        }
        let width = spec.row_width();
        if width > ROW_BUDGET {
            return Err(SmxError::RowTooWide {
                key: spec.key.clone(),
                width,
                budget: ROW_BUDGET,
            });
        }
    }

    Ok(specs)
}

/// Serde adapter storing `Vec<MetricSpec>` as an ordered `key -> spec` table.
///
/// Document order of the table defines row order.
pub mod metric_table {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::MetricSpec;

    pub fn serialize<S: Serializer>(specs: &[MetricSpec], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(specs.len()))?;
        for spec in specs {
            map.serialize_entry(&spec.key, spec)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<MetricSpec>, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }

    struct TableVisitor;

    impl<'de> Visitor<'de> for TableVisitor {
        type Value = Vec<MetricSpec>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of metric name to metric settings")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut specs = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, mut spec)) = access.next_entry::<String, MetricSpec>()? {
                spec.key = key;
                specs.push(spec);
            }
            Ok(specs)
        }
    }
}
