//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use stat_matrix::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, FailureScope};
pub use crate::core::errors::{Result, SmxError};

// Display
pub use crate::display::color::Color;
pub use crate::display::colorize::resolve_color;
pub use crate::display::layout::{LabelPair, Position, build_layout};
pub use crate::display::spec::{MetricSpec, Threshold, Thresholds, validate_specs};
pub use crate::display::surface::{Frame, JsonLinesSurface, RecordingSurface, RenderSurface};
#[cfg(feature = "terminal")]
pub use crate::display::terminal::TerminalSurface;
pub use crate::display::value::RawValue;

// Sources
#[cfg(feature = "http")]
pub use crate::source::http::HttpMetricsSource;
pub use crate::source::{MetricSnapshot, MetricsSource, ScriptedSource};

// Loop
pub use crate::daemon::clock::{Clock, ManualClock, SystemClock};
pub use crate::daemon::loop_main::{
    CycleBudget, CycleReport, RowOutcome, RuntimeState, StopSignal, UpdateLoop,
};
#[cfg(feature = "daemon")]
pub use crate::daemon::signals::SignalHandler;

// Logging
pub use crate::logger::activity::{
    ActivityEvent, ActivitySink, JsonlActivity, MemoryActivity, NullActivity,
};
