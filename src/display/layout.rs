//! Layout builder: fixed screen positions and initial text for every row.

#![allow(missing_docs)]

use serde::Serialize;

use crate::display::color::Color;
use crate::display::spec::{MetricSpec, ROW_BUDGET};

/// Left edge of every label, in pixels.
pub const ROW_X: u16 = 2;
/// Baseline of the first row, in pixels.
pub const FIRST_ROW_Y: u16 = 5;
/// Vertical distance between rows, in pixels.
pub const ROW_PITCH: u16 = 10;

/// Pixel position of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    /// Position of row `index`; a pure function of the index.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn for_row(index: usize) -> Self {
        Self {
            x: ROW_X,
            y: FIRST_ROW_Y + ROW_PITCH * index as u16,
        }
    }
}

/// One text cell on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    pub color: Color,
}

/// Key and value cells of one metric row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPair {
    pub position: Position,
    pub key: Cell,
    pub value: Cell,
}

impl LabelPair {
    /// Build row `index` from its spec, showing the placeholder.
    ///
    /// Without a placeholder the value cell starts empty, the same as a
    /// blanked row.
    #[must_use]
    pub fn new(index: usize, spec: &MetricSpec) -> Self {
        let initial = spec
            .placeholder
            .as_deref()
            .map_or_else(String::new, |placeholder| format_value(placeholder, &spec.unit));
        Self {
            position: Position::for_row(index),
            key: Cell {
                text: spec.key_text(),
                color: spec.color,
            },
            value: Cell {
                text: initial,
                color: spec.color,
            },
        }
    }

    /// Set the value cell text and color.
    pub fn set_value(&mut self, text: &str, unit: &str, color: Color) {
        self.value.text = format_value(text, unit);
        self.value.color = color;
    }

    /// Clear both cells; colors are left untouched.
    pub fn blank(&mut self) {
        self.key.text.clear();
        self.value.text.clear();
    }

    /// Whether the key cell has been blanked.
    #[must_use]
    pub fn is_key_blank(&self) -> bool {
        self.key.text.is_empty()
    }

    /// Put the key text back after a blanking. Returns `true` if anything changed.
    pub fn restore_key(&mut self, spec: &MetricSpec) -> bool {
        if self.is_key_blank() {
            self.key.text = spec.key_text();
            true
        } else {
            false
        }
    }
}

/// Render `"<value><unit>"` right-justified to the row budget.
///
/// Longer text is kept whole, never truncated.
#[must_use]
pub fn format_value(value: &str, unit: &str) -> String {
    format!("{:>width$}", format!("{value}{unit}"), width = ROW_BUDGET)
}

/// One label pair per validated spec, in spec order.
#[must_use]
pub fn build_layout(specs: &[MetricSpec]) -> Vec<LabelPair> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| LabelPair::new(index, spec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::spec::{Threshold, Thresholds};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn spec(key: &str, unit: &str, placeholder: Option<&str>) -> MetricSpec {
        MetricSpec {
            key: key.to_string(),
            color: Color::WHITE,
            unit: unit.to_string(),
            placeholder: placeholder.map(str::to_string),
            max_length: 3,
            thresholds: Thresholds {
                high: Threshold::new(90, Color::RED),
                med: Threshold::new(50, Color::YELLOW),
                low: Threshold::new(0, Color::GREEN),
            },
        }
    }

    #[test]
    fn rows_are_stacked_ten_pixels_apart() {
        let layout = build_layout(&[
            spec("CPU", "%", Some("0")),
            spec("RAM", "%", Some("0")),
            spec("Temp", "C", Some("0")),
        ]);
        let ys: Vec<u16> = layout.iter().map(|pair| pair.position.y).collect();
        assert_eq!(ys, vec![5, 15, 25]);
        assert!(layout.iter().all(|pair| pair.position.x == 2));
    }

    #[test]
    fn initial_text_uses_placeholder() {
        let layout = build_layout(&[spec("CPU", "%", Some("0"))]);
        assert_eq!(layout[0].key.text, "CPU: ");
        assert_eq!(layout[0].value.text, "        0%");
        assert_eq!(layout[0].value.color, Color::WHITE);
    }

    #[test]
    fn absent_placeholder_starts_with_empty_value() {
        let layout = build_layout(&[spec("Temp", "C", None)]);
        assert_eq!(layout[0].value.text, "");
        assert_eq!(layout[0].key.text, "Temp: ");
    }

    #[test]
    fn format_value_right_justifies_without_truncating() {
        assert_eq!(format_value("95", "%"), "       95%");
        assert_eq!(format_value("123456789", "%%"), "123456789%%");
    }

    #[test]
    fn blank_and_restore() {
        let s = spec("CPU", "%", None);
        let mut pair = LabelPair::new(0, &s);
        pair.blank();
        assert!(pair.is_key_blank());
        assert!(pair.value.text.is_empty());
        assert!(pair.restore_key(&s));
        assert_eq!(pair.key.text, "CPU: ");
        assert!(!pair.restore_key(&s));
    }

    proptest! {
        #[test]
        fn positions_are_unique_and_index_derived(count in 0usize..=3) {
            let specs: Vec<MetricSpec> =
                (0..count).map(|i| spec(&format!("M{i}"), "", Some("0"))).collect();
            let layout = build_layout(&specs);
            let positions: HashSet<Position> = layout.iter().map(|p| p.position).collect();
            prop_assert_eq!(positions.len(), count);
            for (i, pair) in layout.iter().enumerate() {
                prop_assert_eq!(pair.position, Position::for_row(i));
            }
        }
    }
}
