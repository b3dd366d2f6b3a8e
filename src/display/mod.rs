//! Metric display engine: specs and validation, layout, colorizing, and the
//! render surfaces frames are pushed to.

pub mod color;
pub mod colorize;
pub mod layout;
pub mod spec;
pub mod surface;
#[cfg(feature = "terminal")]
pub mod terminal;
pub mod value;
