//! Time source injected into the cache and the aggregation engine.
//!
//! Production code uses [`SystemClock`]; tests pin time with [`ManualClock`]
//! so window bounds and cache expiry are deterministic.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

/// Asia/Bangkok has a fixed +07:00 offset and no daylight saving.
pub const BANGKOK_OFFSET_SECS: i32 = 7 * 3600;

pub fn bangkok() -> FixedOffset {
    // ---
    FixedOffset::east_opt(BANGKOK_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    // ---
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|err| err.into_inner())
    }
}
