//! Render surface seam plus the in-process implementations.
//!
//! The update loop hands a complete [`Frame`] to a [`RenderSurface`] once per
//! cycle. A frame always replaces whatever the surface showed before.

#![allow(missing_docs)]

use std::io::Write;

use serde::Serialize;

use crate::core::errors::{Result, SmxError};
use crate::display::color::Color;
use crate::display::layout::{LabelPair, Position, ROW_X};
use crate::display::spec::ROW_BUDGET;

/// Width of one glyph of the panel font, in pixels.
pub const GLYPH_WIDTH: u16 = 6;

/// Visual state of one text cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelState {
    pub x: u16,
    pub y: u16,
    pub text: String,
    pub color: Color,
}

impl LabelState {
    fn new(position: Position, text: &str, color: Color) -> Self {
        Self {
            x: position.x,
            y: position.y,
            text: text.to_string(),
            color,
        }
    }
}

/// Everything the panel shows for one refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub background: Color,
    /// Key then value cell for each row, rows in display order.
    pub labels: Vec<LabelState>,
}

impl Frame {
    /// Snapshot the current state of every row.
    #[must_use]
    pub fn compose(background: Color, rows: &[LabelPair]) -> Self {
        let labels = rows
            .iter()
            .flat_map(|pair| {
                [
                    LabelState::new(pair.position, &pair.key.text, pair.key.color),
                    LabelState::new(pair.position, &pair.value.text, pair.value.color),
                ]
            })
            .collect();
        Self { background, labels }
    }
}

/// Anything that can present a frame: a matrix driver, a terminal, a recorder.
pub trait RenderSurface {
    /// Replace the displayed content with `frame` and refresh.
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

// ──────────────────── compositing ────────────────────

/// One composited text row: glyphs with their colors, `None` where nothing is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeRow {
    pub y: u16,
    pub glyphs: Vec<Option<(char, Color)>>,
}

impl CompositeRow {
    /// Row text with undrawn cells as spaces.
    #[must_use]
    pub fn text(&self) -> String {
        self.glyphs
            .iter()
            .map(|glyph| glyph.map_or(' ', |(ch, _)| ch))
            .collect()
    }
}

/// Overlay the labels of each row the way the panel draws them.
///
/// Labels sharing a baseline are drawn in frame order; a space is transparent,
/// so the right-justified value only covers the key where it has glyphs.
#[must_use]
pub fn composite_rows(frame: &Frame) -> Vec<CompositeRow> {
    let mut rows: Vec<CompositeRow> = Vec::new();
    for label in &frame.labels {
        let row = if let Some(index) = rows.iter().position(|row| row.y == label.y) {
            &mut rows[index]
        } else {
            rows.push(CompositeRow {
                y: label.y,
                glyphs: vec![None; ROW_BUDGET],
            });
            let last = rows.len() - 1;
            &mut rows[last]
        };

        let start = usize::from(label.x.saturating_sub(ROW_X) / GLYPH_WIDTH);
        for (offset, ch) in label.text.chars().enumerate() {
            let column = start + offset;
            if column >= row.glyphs.len() {
                row.glyphs.resize(column + 1, None);
            }
            if ch != ' ' {
                row.glyphs[column] = Some((ch, label.color));
            }
        }
    }
    rows
}

// ──────────────────── recording surface ────────────────────

/// Keeps every presented frame in memory.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    frames: Vec<Frame>,
    failure: Option<String>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface whose `present` always fails with `details`.
    #[must_use]
    pub fn failing(details: impl Into<String>) -> Self {
        Self {
            frames: Vec::new(),
            failure: Some(details.into()),
        }
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl RenderSurface for RecordingSurface {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        if let Some(details) = &self.failure {
            return Err(SmxError::Render {
                details: details.clone(),
            });
        }
        self.frames.push(frame.clone());
        Ok(())
    }
}

// ──────────────────── JSON lines surface ────────────────────

/// Writes each frame as one JSON object per line.
pub struct JsonLinesSurface<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderSurface for JsonLinesSurface<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let render_err = |details: String| SmxError::Render { details };
        serde_json::to_writer(&mut self.out, frame).map_err(|e| render_err(e.to_string()))?;
        self.out
            .write_all(b"\n")
            .and_then(|()| self.out.flush())
            .map_err(|e| render_err(e.to_string()))
    }
}
