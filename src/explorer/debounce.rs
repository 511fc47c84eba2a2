//! Time-window debouncing for taps.

use std::time::{Duration, Instant};

/// Accepts at most one event per window, measured from the last accepted
/// event. Swallowed events do not extend the window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    /// Creates a debouncer with the given window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last_accepted: None }
    }

    /// Window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true and records `now` if the event falls outside the window.
    pub fn accept(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    /// Forgets the last accepted event.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();

        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(499)));
        assert!(debouncer.accept(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_swallowed_events_do_not_extend_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(200)));
        assert!(debouncer.accept(t0 + Duration::from_millis(310)));
    }

    #[test]
    fn test_reset() {
        let mut debouncer = Debouncer::new(Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(debouncer.accept(t0));
        debouncer.reset();
        assert!(debouncer.accept(t0));
    }

    #[test]
    fn test_zero_window_accepts_everything() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(debouncer.accept(t0));
        assert!(debouncer.accept(t0));
        assert_eq!(debouncer.window(), Duration::ZERO);
    }
}
