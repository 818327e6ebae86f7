use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Wall-clock timestamps that never go backwards within one process.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let now = match *last {
            Some(prev) if prev > Utc::now() => prev,
            _ => Utc::now(),
        };
        *last = Some(now);
        now
    }
}
