//! Monotonic millisecond clock
//!
//! Timestamps are 32-bit milliseconds since an arbitrary origin. They wrap
//! after ~49 days, so durations are always taken with wrapping subtraction.

use std::time::Instant;

/// Milliseconds since an arbitrary epoch, wraparound-tolerant
pub type Millis = u32;

/// Duration between two timestamps, tolerant of wraparound
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

/// Monotonic clock anchored at construction
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current time; truncation to 32 bits is the wraparound
    pub fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_wraps() {
        assert_eq!(elapsed(500, 200), 300);
        assert_eq!(elapsed(5, Millis::MAX), 6);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = Clock::new();
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now_ms();
        assert!(elapsed(b, a) >= 5);
    }
}
