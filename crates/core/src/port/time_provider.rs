// Time Provider Port (for testability)

/// Time provider interface (allows fixed clocks in tests)
pub trait TimeProvider: Send + Sync {
    /// Current time in seconds since epoch
    fn now_secs(&self) -> i64;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that only moves when told to
    pub struct FixedTimeProvider {
        now: AtomicI64,
    }

    impl FixedTimeProvider {
        pub fn new(now_secs: i64) -> Self {
            Self {
                now: AtomicI64::new(now_secs),
            }
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_secs(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
