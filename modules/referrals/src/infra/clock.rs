use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::domain::ports::Clock;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Every `now()` call advances it by
/// `step`, so consecutive records get distinct, ordered timestamps.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }

    /// Current reading, without ticking.
    pub fn peek(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock();
        let at = *current;
        *current += self.step;
        at
    }
}
