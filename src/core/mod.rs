//! Core types: errors, configuration, shared constants.

pub mod config;
pub mod errors;
pub mod paths;
