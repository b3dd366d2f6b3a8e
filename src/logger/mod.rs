//! Activity logging: loop events and the append-only JSONL log behind them.

pub mod activity;
pub mod jsonl;
