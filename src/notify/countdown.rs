//! Pausable auto-dismiss countdown.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Countdown {
    remaining: Duration,
    running_since: Option<Instant>,
}

impl Countdown {
    pub fn start(duration: Duration, now: Instant) -> Self {
        Self {
            remaining: duration,
            running_since: Some(now),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self
                .remaining
                .saturating_sub(now.saturating_duration_since(since)),
            None => self.remaining,
        }
    }

    /// Freeze the countdown. Returns `false` if it was already paused.
    pub fn pause(&mut self, now: Instant) -> bool {
        if !self.is_running() {
            return false;
        }
        self.remaining = self.remaining(now);
        self.running_since = None;
        true
    }

    /// Restart from the frozen remainder, never below `floor`. Returns the
    /// time left until expiry.
    pub fn resume(&mut self, now: Instant, floor: Duration) -> Duration {
        if self.is_running() {
            return self.remaining(now);
        }
        self.remaining = self.remaining.max(floor);
        self.running_since = Some(now);
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: Duration = Duration::from_secs(1);

    #[test]
    fn pause_preserves_remaining_time() {
        let start = Instant::now();
        let mut countdown = Countdown::start(Duration::from_secs(8), start);

        assert!(countdown.pause(start + Duration::from_secs(3)));
        assert_eq!(
            countdown.remaining(start + Duration::from_secs(60)),
            Duration::from_secs(5)
        );

        let left = countdown.resume(start + Duration::from_secs(60), FLOOR);
        assert_eq!(left, Duration::from_secs(5));
        assert_eq!(
            countdown.remaining(start + Duration::from_secs(62)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn resume_is_floored() {
        let start = Instant::now();
        let mut countdown = Countdown::start(Duration::from_secs(8), start);

        countdown.pause(start + Duration::from_millis(7_800));
        assert_eq!(countdown.resume(start + Duration::from_secs(9), FLOOR), FLOOR);
    }

    #[test]
    fn double_pause_is_a_no_op() {
        let start = Instant::now();
        let mut countdown = Countdown::start(Duration::from_secs(8), start);

        assert!(countdown.pause(start));
        assert!(!countdown.pause(start + Duration::from_secs(1)));
        assert_eq!(countdown.remaining(start), Duration::from_secs(8));
    }
}
