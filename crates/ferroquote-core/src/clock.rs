//! Wall-clock abstraction so cache freshness and "today" can be controlled in tests.

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

use time::{Date, OffsetDateTime};

use crate::UtcDateTime;

/// Source of the current UTC time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> OffsetDateTime;

    fn now_utc(&self) -> UtcDateTime {
        UtcDateTime::from_any_offset(self.now())
    }

    /// Current calendar day in UTC.
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("manual clock lock is not poisoned");
        *now += by;
    }

    pub fn set(&self, value: OffsetDateTime) {
        *self.now.lock().expect("manual clock lock is not poisoned") = value;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("manual clock lock is not poisoned")
    }
}
