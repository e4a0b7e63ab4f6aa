//! Time source
//!
//! Token expiry checks and capture timestamps read the time through
//! [`Clock`] so tests can pin or step it.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_does_not_go_backwards() {
        let clock: &dyn Clock = &SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}
