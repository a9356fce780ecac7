// Elapsed-time stopwatch driving trajectory progress

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time source, in seconds from an arbitrary origin
pub trait Clock {
    fn now(&self) -> f64;
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally driven clock for replay and tests
///
/// Clones share the same reading, so a caller can keep one handle and
/// hand the other to a `Stopwatch`.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Resettable stopwatch; its reading is the follower's only notion of progress.
pub struct Stopwatch {
    clock: Box<dyn Clock>,
    started_at: Option<f64>,
    accumulated: f64,
}

impl Stopwatch {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self::from_boxed(Box::new(clock))
    }

    pub fn from_boxed(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            started_at: None,
            accumulated: 0.0,
        }
    }

    /// Zero the reading; a running stopwatch keeps running from zero.
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        if self.started_at.is_some() {
            self.started_at = Some(self.clock.now());
        }
    }

    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
    }

    /// Freeze the reading
    pub fn stop(&mut self) {
        self.accumulated = self.elapsed();
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self) -> f64 {
        match self.started_at {
            Some(start) => self.accumulated + (self.clock.now() - start),
            None => self.accumulated,
        }
    }

    pub fn has_elapsed(&self, seconds: f64) -> bool {
        self.elapsed() >= seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_watch_reads_zero() {
        let clock = ManualClock::new();
        let watch = Stopwatch::new(clock.clone());
        clock.set(5.0);
        assert_eq!(watch.elapsed(), 0.0);
        assert!(!watch.is_running());
    }

    #[test]
    fn test_elapsed_follows_clock() {
        let clock = ManualClock::new();
        clock.set(10.0);
        let mut watch = Stopwatch::new(clock.clone());
        watch.start();
        clock.advance(1.5);
        assert_eq!(watch.elapsed(), 1.5);
        assert!(watch.has_elapsed(1.5));
        assert!(!watch.has_elapsed(1.6));
    }

    #[test]
    fn test_stop_freezes_reading() {
        let clock = ManualClock::new();
        let mut watch = Stopwatch::new(clock.clone());
        watch.start();
        clock.set(2.0);
        watch.stop();
        clock.set(7.0);
        assert_eq!(watch.elapsed(), 2.0);
    }

    #[test]
    fn test_reset_restarts_from_zero() {
        let clock = ManualClock::new();
        let mut watch = Stopwatch::new(clock.clone());
        watch.start();
        clock.set(3.0);
        watch.stop();
        watch.reset();
        watch.start();
        assert_eq!(watch.elapsed(), 0.0);
        clock.set(3.25);
        assert_eq!(watch.elapsed(), 0.25);
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
