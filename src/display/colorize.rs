//! Threshold colorizer: maps a reading to a color through its bands.

use crate::display::color::Color;
use crate::display::spec::Thresholds;
use crate::display::value::RawValue;

/// Resolve the color for `raw`.
///
/// Bands are tried in fixed high, med, low order and the first whose cutoff is
/// at or below the value wins. Readings that are not integers, or that sit
/// below every cutoff, get `default`. Bands are never re-sorted, so a
/// misordered configuration behaves exactly as written.
#[must_use]
pub fn resolve_color(raw: &RawValue, thresholds: &Thresholds, default: Color) -> Color {
    let Some(value) = raw.as_integer() else {
        return default;
    };
    thresholds
        .in_order()
        .into_iter()
        .find(|band| band.cutoff <= value)
        .map_or(default, |band| band.color)
}
