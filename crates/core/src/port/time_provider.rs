// Time Provider Port (for testability)

use chrono::{DateTime, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub mod mocks {
    use super::*;

    /// Always returns the same instant
    pub struct FixedTimeProvider(pub DateTime<Utc>);

    impl TimeProvider for FixedTimeProvider {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }
}
