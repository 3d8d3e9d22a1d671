//! Time sources for freshness classification.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;

use crate::util::lock;

const SOURCE: &str = "cache::clock";

/// Wall-clock source injected into the cache.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> OffsetDateTime;
}

/// The system clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock::lock(&self.now, SOURCE, "advance");
        *now += by;
    }

    pub fn rewind(&self, by: Duration) {
        let mut now = lock::lock(&self.now, SOURCE, "rewind");
        *now -= by;
    }

    pub fn set(&self, at: OffsetDateTime) {
        *lock::lock(&self.now, SOURCE, "set") = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *lock::lock(&self.now, SOURCE, "now")
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn clones_observe_the_same_instant() {
        let clock = ManualClock::new(datetime!(2025-01-01 0:00 UTC));
        let shared = clock.clone();

        clock.advance(Duration::from_secs(90));
        assert_eq!(shared.now(), datetime!(2025-01-01 0:01:30 UTC));

        shared.rewind(Duration::from_secs(30));
        assert_eq!(clock.now(), datetime!(2025-01-01 0:01 UTC));
    }
}
