#![forbid(unsafe_code)]

//! Stat Matrix (smx): a metric display engine for small RGB matrix panels.
//!
//! Polls an HTTP endpoint for up to three readings and shows each on its own
//! ten-character row, colored by threshold bands:
//! 1. **Validation** rejects configurations that cannot fit the panel, at startup
//! 2. **Layout** gives every row a fixed position and initial text
//! 3. **Update loop** fetches, colorizes and renders once per interval, keeping
//!    stale values through short outages before falling back to a placeholder
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use stat_matrix::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use stat_matrix::core::config::Config;
//! use stat_matrix::daemon::loop_main::UpdateLoop;
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod display;
pub mod logger;
pub mod source;
