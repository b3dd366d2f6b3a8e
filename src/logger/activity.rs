//! Activity events emitted by the display loop and the sinks that receive them.
//!
//! The loop only reports transitions: the first failed fetch of a streak, a row
//! falling back, a row recovering. Steady state produces no events.

#![allow(missing_docs)]

use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Something worth recording about the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEvent {
    LoopStarted {
        version: String,
        config_hash: String,
        metrics: usize,
    },
    LoopStopped {
        reason: String,
        cycles: u64,
        uptime_secs: f64,
    },
    /// First failed fetch after a good one (or after startup).
    FetchFailed {
        error_code: String,
        error_message: String,
        consecutive_failures: u32,
    },
    /// A row stopped showing its last value. `placeholder: None` means it blanked.
    RowFallback {
        key: String,
        placeholder: Option<String>,
        consecutive_failures: u32,
    },
    /// A row that had fallen back shows live data again.
    RowRecovered { key: String },
    /// First failed render of a streak.
    RenderFailed {
        error_code: String,
        error_message: String,
    },
}

impl ActivityEvent {
    /// Structured log line for this event.
    #[must_use]
    pub fn to_log_entry(&self) -> LogEntry {
        match self {
            Self::LoopStarted {
                version,
                config_hash,
                metrics,
            } => {
                let mut e = LogEntry::new(EventType::LoopStart, Severity::Info);
                e.details = Some(format!(
                    "version={version} config_hash={config_hash} metrics={metrics}"
                ));
                e
            }
            Self::LoopStopped {
                reason,
                cycles,
                uptime_secs,
            } => {
                let mut e = LogEntry::new(EventType::LoopStop, Severity::Info);
                e.details = Some(format!("reason={reason}"));
                e.cycles = Some(*cycles);
                e.uptime_secs = Some(*uptime_secs);
                e
            }
            Self::FetchFailed {
                error_code,
                error_message,
                consecutive_failures,
            } => {
                let mut e = LogEntry::new(EventType::FetchFailed, Severity::Warning);
                e.error_code = Some(error_code.clone());
                e.error_message = Some(error_message.clone());
                e.consecutive_failures = Some(*consecutive_failures);
                e
            }
            Self::RowFallback {
                key,
                placeholder,
                consecutive_failures,
            } => {
                let mut e = LogEntry::new(EventType::RowFallback, Severity::Warning);
                e.key = Some(key.clone());
                e.placeholder.clone_from(placeholder);
                e.consecutive_failures = Some(*consecutive_failures);
                if placeholder.is_none() {
                    e.details = Some("blanked".to_string());
                }
                e
            }
            Self::RowRecovered { key } => {
                let mut e = LogEntry::new(EventType::RowRecovered, Severity::Info);
                e.key = Some(key.clone());
                e
            }
            Self::RenderFailed {
                error_code,
                error_message,
            } => {
                let mut e = LogEntry::new(EventType::RenderFailed, Severity::Critical);
                e.error_code = Some(error_code.clone());
                e.error_message = Some(error_message.clone());
                e
            }
        }
    }
}

/// Receiver of loop activity. Recording must never fail the caller.
pub trait ActivitySink {
    fn record(&mut self, event: ActivityEvent);
}

/// Appends every event to the JSONL activity log.
pub struct JsonlActivity {
    writer: JsonlWriter,
}

impl JsonlActivity {
    #[must_use]
    pub fn open(config: JsonlConfig) -> Self {
        Self {
            writer: JsonlWriter::open(config),
        }
    }

    /// Degradation state of the underlying writer.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        self.writer.state()
    }
}

impl ActivitySink for JsonlActivity {
    fn record(&mut self, event: ActivityEvent) {
        if self.writer.state() != "normal" {
            self.writer.try_recover();
        }
        self.writer.write_entry(&event.to_log_entry());
    }
}

/// Drops everything; used when logging is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActivity;

impl ActivitySink for NullActivity {
    fn record(&mut self, _event: ActivityEvent) {}
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryActivity {
    events: Vec<ActivityEvent>,
}

impl MemoryActivity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[ActivityEvent] {
        &self.events
    }
}

impl ActivitySink for MemoryActivity {
    fn record(&mut self, event: ActivityEvent) {
        self.events.push(event);
    }
}
