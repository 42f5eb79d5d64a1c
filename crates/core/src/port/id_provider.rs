// ID Provider Port (for deterministic testing)

use std::sync::atomic::{AtomicI64, Ordering};

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique task ID
    fn generate_id(&self) -> String;
}

/// Nanosecond-timestamp provider (production)
///
/// IDs are strictly increasing within one process even when the clock
/// returns the same nanosecond twice.
#[derive(Default)]
pub struct TimestampIdProvider {
    last: AtomicI64,
}

impl TimestampIdProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdProvider for TimestampIdProvider {
    fn generate_id(&self) -> String {
        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}

pub mod mocks {
    use super::IdProvider;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Deterministic IDs: `task-1`, `task-2`, ...
    #[derive(Default)]
    pub struct SequentialIdProvider {
        counter: AtomicU64,
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            format!("task-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }
}
