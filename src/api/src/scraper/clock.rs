//! Time source for cache freshness and the classifier's current year.

use chrono::{DateTime, Datelike, Local, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar year in the host's local time zone
    fn current_year(&self) -> i32 {
        self.now().with_timezone(&Local).year()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
