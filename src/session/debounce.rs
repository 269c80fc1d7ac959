use std::time::{Duration, Instant};

/// Restartable quiet-period timer. Every edit pushes the deadline out by the
/// full delay; the timer fires at most once per quiet period.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Restart the timer: cancel any pending deadline and arm a new one.
    pub fn note_edit(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Arm the timer to fire immediately.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now);
    }

    /// True exactly once per armed deadline, once `now` has reached it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(100));

        debounce.note_edit(start);
        assert!(!debounce.fire(start + Duration::from_millis(50)));
        assert!(debounce.fire(start + Duration::from_millis(100)));
        // Fired once; stays quiet until the next edit.
        assert!(!debounce.fire(start + Duration::from_millis(200)));
    }

    #[test]
    fn test_new_edit_restarts_timer() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(100));

        debounce.note_edit(start);
        debounce.note_edit(start + Duration::from_millis(80));
        // The original deadline has passed but the restart moved it.
        assert!(!debounce.fire(start + Duration::from_millis(120)));
        assert!(debounce.fire(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_trigger_fires_immediately() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_secs(3600));
        debounce.trigger(start);
        assert!(debounce.fire(start));
    }

    #[test]
    fn test_unarmed_never_fires() {
        let mut debounce = Debouncer::new(Duration::from_millis(1));
        assert!(!debounce.fire(Instant::now()));
    }
}
