//! Time Abstraction
//!
//! Injectable time source so credential expiry logic can be tested
//! deterministically.

use chrono::{DateTime, Utc};

/// Time source trait.
pub trait Clock: Send + Sync {
    /// Get current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Get current Unix timestamp in seconds.
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

/// System clock implementation using actual system time.
#[derive(Debug, Clone, Default)]
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
    fn test_system_clock() {
        let clock = SystemClock;
        let now = clock.now();
        assert!((clock.unix_timestamp() - now.timestamp()).abs() <= 1);
    }
}
