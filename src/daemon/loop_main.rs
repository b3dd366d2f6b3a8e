//! The display update loop: fetch, resolve each row, render, sleep.
//!
//! One cycle runs to completion on the calling thread. A failed fetch never
//! ends the loop; rows ride out short outages on their last value and fall
//! back to the placeholder (or go blank) once `keep_values_on_fail`
//! consecutive misses have been counted.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use crate::core::config::{Config, FailureScope};
use crate::core::errors::Result;
use crate::daemon::clock::Clock;
use crate::display::color::Color;
use crate::display::colorize::resolve_color;
use crate::display::layout::{LabelPair, build_layout};
use crate::display::spec::{MetricSpec, validate_specs};
use crate::display::surface::{Frame, RenderSurface};
use crate::display::value::RawValue;
use crate::logger::activity::{ActivityEvent, ActivitySink};
use crate::source::{MetricSnapshot, MetricsSource};

// ──────────────────── stop conditions ────────────────────

/// Decides when [`UpdateLoop::run`] returns.
pub trait StopSignal {
    /// Checked before every cycle and before every sleep.
    fn should_stop(&mut self, completed_cycles: u64) -> bool;

    /// Recorded in the `loop_stop` event.
    fn reason(&self) -> &'static str {
        "stop requested"
    }
}

/// Stop after a fixed number of cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBudget(pub u64);

impl StopSignal for CycleBudget {
    fn should_stop(&mut self, completed_cycles: u64) -> bool {
        completed_cycles >= self.0
    }

    fn reason(&self) -> &'static str {
        "cycle budget reached"
    }
}

/// Never stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunForever;

impl StopSignal for RunForever {
    fn should_stop(&mut self, _completed_cycles: u64) -> bool {
        false
    }
}

/// Stops as soon as either side does.
impl<A: StopSignal, B: StopSignal> StopSignal for (A, B) {
    fn should_stop(&mut self, completed_cycles: u64) -> bool {
        self.0.should_stop(completed_cycles) || self.1.should_stop(completed_cycles)
    }

    fn reason(&self) -> &'static str {
        // Only meaningful once `should_stop` has returned true.
        let (a, b) = (self.0.reason(), self.1.reason());
        if a == "stop requested" { b } else { a }
    }
}

// ──────────────────── cycle bookkeeping ────────────────────

/// Counters owned by the loop; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeState {
    /// Shared scope: the panel-wide miss counter. Per-row scope: consecutive
    /// wholly failed fetches.
    pub consecutive_failures: u32,
    /// Completed cycles.
    pub cycles: u64,
}

/// What one row showed after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Fresh value from this cycle's fetch.
    Live,
    /// Missed, still within tolerance; previous text and color kept.
    Kept,
    /// Missed past tolerance; placeholder shown.
    Placeholder,
    /// Missed past tolerance with no placeholder; both cells empty.
    Blanked,
}

/// Result of the cycle's single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Fetch succeeded with this many configured metrics present.
    Ok { metrics: usize },
    Failed { error_code: &'static str, message: String },
}

impl FetchOutcome {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Everything a cycle decided, in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based index of this cycle.
    pub cycle: u64,
    pub fetch: FetchOutcome,
    pub rows: Vec<RowOutcome>,
    /// `RuntimeState::consecutive_failures` after the cycle.
    pub consecutive_failures: u32,
    /// Whether the surface accepted the frame.
    pub rendered: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub reason: &'static str,
    pub uptime: Duration,
}

// ──────────────────── update loop ────────────────────

/// Owns the validated specs, their label pairs and the failure counters.
pub struct UpdateLoop {
    specs: Vec<MetricSpec>,
    rows: Vec<LabelPair>,
    background: Color,
    interval: Duration,
    keep_values_on_fail: u32,
    scope: FailureScope,
    config_hash: String,
    state: RuntimeState,
    /// Per-row miss counters, used by `FailureScope::PerRow`.
    row_failures: Vec<u32>,
    /// Rows currently showing a fallback, for transition events.
    fallen_back: Vec<bool>,
    fetch_failing: bool,
    render_failing: bool,
}

impl UpdateLoop {
    /// Build the loop from a configuration.
    ///
    /// Specs and the interval are checked again here so a hand-built `Config`
    /// can never put an oversized row on the panel or an unusable interval
    /// in the loop.
    pub fn new(config: &Config) -> Result<Self> {
        let specs = validate_specs(config.data.clone())?;
        let interval = config.update_interval()?;
        let rows = build_layout(&specs);
        let count = specs.len();
        Ok(Self {
            specs,
            rows,
            background: config.background_color,
            interval,
            keep_values_on_fail: config.keep_values_on_fail,
            scope: config.failure_scope,
            config_hash: config.stable_hash().unwrap_or_else(|_| "unknown".to_string()),
            state: RuntimeState::default(),
            row_failures: vec![0; count],
            fallen_back: vec![false; count],
            fetch_failing: false,
            render_failing: false,
        })
    }

    #[must_use]
    pub const fn state(&self) -> RuntimeState {
        self.state
    }

    #[must_use]
    pub fn rows(&self) -> &[LabelPair] {
        &self.rows
    }

    /// Current state of every cell, ready for a surface.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::compose(self.background, &self.rows)
    }

    /// Run one cycle: fetch, resolve every row, present the frame.
    pub fn tick(
        &mut self,
        source: &mut dyn MetricsSource,
        surface: &mut dyn RenderSurface,
        sink: &mut dyn ActivitySink,
    ) -> CycleReport {
        let fetched = source.fetch();
        let fetch = match &fetched {
            Ok(snapshot) => FetchOutcome::Ok {
                metrics: self
                    .specs
                    .iter()
                    .filter(|spec| snapshot.get(&spec.key).is_some())
                    .count(),
            },
            Err(err) => FetchOutcome::Failed {
                error_code: err.code(),
                message: err.to_string(),
            },
        };
        let snapshot = fetched.ok();

        let bumped = self.count_fetch(snapshot.is_some());
        self.note_fetch(&fetch, sink);
        let rows = self.resolve_rows(snapshot.as_ref(), bumped, sink);
        let rendered = self.present(surface, sink);

        self.state.cycles += 1;
        CycleReport {
            cycle: self.state.cycles,
            fetch,
            rows,
            consecutive_failures: self.state.consecutive_failures,
            rendered,
        }
    }

    /// Repeat `tick` and sleep until `stop` says otherwise.
    pub fn run(
        &mut self,
        source: &mut dyn MetricsSource,
        surface: &mut dyn RenderSurface,
        clock: &mut dyn Clock,
        sink: &mut dyn ActivitySink,
        stop: &mut dyn StopSignal,
    ) -> RunSummary {
        let started = Instant::now();
        let first_cycle = self.state.cycles;
        sink.record(ActivityEvent::LoopStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: self.config_hash.clone(),
            metrics: self.specs.len(),
        });
        eprintln!(
            "[SMX-LOOP] started: {} metric(s), interval {:?}",
            self.specs.len(),
            self.interval
        );

        while !stop.should_stop(self.state.cycles - first_cycle) {
            self.tick(source, surface, sink);
            if stop.should_stop(self.state.cycles - first_cycle) {
                break;
            }
            clock.sleep(self.interval);
        }

        let summary = RunSummary {
            cycles: self.state.cycles - first_cycle,
            reason: stop.reason(),
            uptime: started.elapsed(),
        };
        sink.record(ActivityEvent::LoopStopped {
            reason: summary.reason.to_string(),
            cycles: summary.cycles,
            uptime_secs: summary.uptime.as_secs_f64(),
        });
        eprintln!(
            "[SMX-LOOP] stopped after {} cycle(s): {}",
            summary.cycles, summary.reason
        );
        summary
    }

    // ──────────────────── fetch bookkeeping ────────────────────

    /// Apply the fetch result to the counters. Returns whether the shared
    /// counter has already been bumped this cycle.
    fn count_fetch(&mut self, fetched: bool) -> bool {
        match (self.scope, fetched) {
            (FailureScope::PerRow, true) => {
                self.state.consecutive_failures = 0;
                false
            }
            (FailureScope::PerRow, false) => {
                self.bump_shared();
                false
            }
            (FailureScope::Shared, false) => {
                self.bump_shared();
                true
            }
            (FailureScope::Shared, true) => false,
        }
    }

    /// Counters stop at `u32::MAX` so a long outage never reads as fresh.
    fn bump_shared(&mut self) {
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
    }

    fn note_fetch(&mut self, fetch: &FetchOutcome, sink: &mut dyn ActivitySink) {
        match fetch {
            FetchOutcome::Ok { .. } => self.fetch_failing = false,
            FetchOutcome::Failed {
                error_code,
                message,
            } => {
                if !self.fetch_failing {
                    self.fetch_failing = true;
                    sink.record(ActivityEvent::FetchFailed {
                        error_code: (*error_code).to_string(),
                        error_message: message.clone(),
                        consecutive_failures: self.state.consecutive_failures,
                    });
                }
            }
        }
    }

    // ──────────────────── row resolution ────────────────────

    fn resolve_rows(
        &mut self,
        snapshot: Option<&MetricSnapshot>,
        mut bumped: bool,
        sink: &mut dyn ActivitySink,
    ) -> Vec<RowOutcome> {
        let mut outcomes = Vec::with_capacity(self.rows.len());
        for index in 0..self.rows.len() {
            let reading = snapshot.and_then(|s| s.get(&self.specs[index].key)).cloned();
            let outcome = match reading {
                Some(raw) => {
                    match self.scope {
                        FailureScope::Shared => self.state.consecutive_failures = 0,
                        FailureScope::PerRow => self.row_failures[index] = 0,
                    }
                    self.show_live(index, &raw, sink)
                }
                None => {
                    let misses = match self.scope {
                        FailureScope::Shared => {
                            if !bumped {
                                self.bump_shared();
                                bumped = true;
                            }
                            self.state.consecutive_failures
                        }
                        FailureScope::PerRow => {
                            let misses = self.row_failures[index].saturating_add(1);
                            self.row_failures[index] = misses;
                            misses
                        }
                    };
                    if misses < self.keep_values_on_fail {
                        RowOutcome::Kept
                    } else {
                        self.show_fallback(index, misses, sink)
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    fn show_live(&mut self, index: usize, raw: &RawValue, sink: &mut dyn ActivitySink) -> RowOutcome {
        let spec = &self.specs[index];
        let row = &mut self.rows[index];
        row.restore_key(spec);
        let color = resolve_color(raw, &spec.thresholds, spec.color);
        row.set_value(&raw.to_string(), &spec.unit, color);

        if std::mem::take(&mut self.fallen_back[index]) {
            sink.record(ActivityEvent::RowRecovered {
                key: spec.key.clone(),
            });
        }
        RowOutcome::Live
    }

    fn show_fallback(&mut self, index: usize, misses: u32, sink: &mut dyn ActivitySink) -> RowOutcome {
        let spec = &self.specs[index];
        let row = &mut self.rows[index];
        let outcome = match &spec.placeholder {
            None => {
                row.blank();
                RowOutcome::Blanked
            }
            Some(placeholder) => {
                row.restore_key(spec);
                let raw = RawValue::Text(placeholder.clone());
                let color = resolve_color(&raw, &spec.thresholds, spec.color);
                row.set_value(placeholder, &spec.unit, color);
                RowOutcome::Placeholder
            }
        };

        if !self.fallen_back[index] {
            self.fallen_back[index] = true;
            sink.record(ActivityEvent::RowFallback {
                key: spec.key.clone(),
                placeholder: spec.placeholder.clone(),
                consecutive_failures: misses,
            });
        }
        outcome
    }

    // ──────────────────── rendering ────────────────────

    fn present(&mut self, surface: &mut dyn RenderSurface, sink: &mut dyn ActivitySink) -> bool {
        match surface.present(&self.frame()) {
            Ok(()) => {
                self.render_failing = false;
                true
            }
            Err(err) => {
                if !self.render_failing {
                    self.render_failing = true;
                    sink.record(ActivityEvent::RenderFailed {
                        error_code: err.code().to_string(),
                        error_message: err.to_string(),
                    });
                }
                false
            }
        }
    }
}

// ──────────────────── tests ────────────────────
