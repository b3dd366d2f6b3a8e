//! Terminal preview of the matrix panel.
//!
//! Draws the composited rows with 24-bit colors on a filled background, one
//! terminal line per panel row. Useful on a workstation or over SSH when the
//! panel itself is not attached.

#![allow(missing_docs)]

use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};

use crate::core::errors::{Result, SmxError};
use crate::display::color::Color;
use crate::display::surface::{Frame, RenderSurface, composite_rows};

/// Blank columns drawn on each side of a row.
const MARGIN: usize = 1;

fn term_color(color: Color) -> TermColor {
    let (r, g, b) = color.rgb();
    TermColor::Rgb { r, g, b }
}

/// Render surface drawing into a terminal.
pub struct TerminalSurface<W: Write> {
    out: W,
    prepared: bool,
    use_color: bool,
}

impl TerminalSurface<Stdout> {
    /// Draw on standard output.
    #[must_use]
    pub fn stdout(use_color: bool) -> Self {
        Self::new(io::stdout(), use_color)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, use_color: bool) -> Self {
        Self {
            out,
            prepared: false,
            use_color,
        }
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        if !self.prepared {
            queue!(self.out, Hide, Clear(ClearType::All))?;
            self.prepared = true;
        }

        let rows = composite_rows(frame);
        let width = rows.iter().map(|row| row.glyphs.len()).max().unwrap_or(0) + 2 * MARGIN;
        let background = term_color(frame.background);

        queue!(self.out, MoveTo(0, 0))?;
        for (line, row) in rows.iter().enumerate() {
            let line = u16::try_from(line).unwrap_or(u16::MAX);
            queue!(self.out, MoveTo(0, line), Clear(ClearType::CurrentLine))?;
            if self.use_color {
                queue!(self.out, SetBackgroundColor(background))?;
            }
            queue!(self.out, Print(" ".repeat(MARGIN)))?;
            for glyph in &row.glyphs {
                match glyph {
                    Some((ch, color)) => {
                        if self.use_color {
                            queue!(self.out, SetForegroundColor(term_color(*color)))?;
                        }
                        queue!(self.out, Print(*ch))?;
                    }
                    None => queue!(self.out, Print(' '))?,
                }
            }
            let drawn = row.glyphs.len() + MARGIN;
            queue!(self.out, Print(" ".repeat(width.saturating_sub(drawn))))?;
            if self.use_color {
                queue!(self.out, ResetColor)?;
            }
        }
        let below = u16::try_from(rows.len()).unwrap_or(u16::MAX);
        queue!(self.out, MoveTo(0, below), Clear(ClearType::FromCursorDown))?;
        self.out.flush()
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.draw(frame).map_err(|e| SmxError::Render {
            details: format!("terminal: {e}"),
        })
    }
}

impl<W: Write> Drop for TerminalSurface<W> {
    fn drop(&mut self) {
        if self.prepared {
            let _ = execute!(self.out, ResetColor, Show, Print("\n"));
        }
    }
}
