//! Sleep abstraction for the display loop.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep when a shutdown flag is attached.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Where the loop waits between cycles.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// Real wall-clock sleeping.
///
/// With a shutdown flag attached the sleep is cut into short slices and ends
/// early once the flag is set, so a stop request never waits out a long interval.
#[derive(Debug, Default, Clone)]
pub struct SystemClock {
    interrupt: Option<Arc<AtomicBool>>,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn interruptible(flag: Arc<AtomicBool>) -> Self {
        Self {
            interrupt: Some(flag),
        }
    }
}

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        let Some(flag) = &self.interrupt else {
            thread::sleep(duration);
            return;
        };
        let deadline = Instant::now() + duration;
        while !flag.load(Ordering::Relaxed) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    sleeps: Vec<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }

    /// Total time the loop asked to sleep.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_records_without_waiting() {
        let mut clock = ManualClock::new();
        let started = Instant::now();
        clock.sleep(Duration::from_secs(30));
        clock.sleep(Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(clock.sleeps().len(), 2);
        assert_eq!(clock.elapsed(), Duration::from_millis(30_500));
    }

    #[test]
    fn system_clock_sleeps_roughly_the_duration() {
        let mut clock = SystemClock::new();
        let started = Instant::now();
        clock.sleep(Duration::from_millis(20));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn interruptible_clock_returns_once_flag_is_set() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut clock = SystemClock::interruptible(Arc::clone(&flag));
        let started = Instant::now();
        clock.sleep(Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn interruptible_clock_wakes_mid_sleep() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            setter.store(true, Ordering::Relaxed);
        });
        let mut clock = SystemClock::interruptible(flag);
        let started = Instant::now();
        clock.sleep(Duration::from_secs(10));
        handle.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
