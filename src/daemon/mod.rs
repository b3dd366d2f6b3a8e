//! Runtime: the update loop, its clock, and signal-driven shutdown.

pub mod clock;
pub mod loop_main;
#[cfg(feature = "daemon")]
pub mod signals;
