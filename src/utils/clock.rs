use std::mem::MaybeUninit;
use std::time::Duration;

/// Monotonic clock backed by `CLOCK_MONOTONIC`.
///
/// Synthetic events (key auto-repeat) are stamped with this clock so their
/// timestamps share the time base of the events delivered by the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock;

impl Clock {
    /// Initialize a new clock.
    pub fn new() -> Clock {
        Clock
    }

    /// Current monotonic time in microseconds.
    pub fn now_us(&self) -> u64 {
        let mut tp = MaybeUninit::<libc::timespec>::zeroed();
        // clock_gettime only fails for invalid clock ids
        let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, tp.as_mut_ptr()) };
        if ret != 0 {
            return 0;
        }
        let tp = unsafe { tp.assume_init() };
        Duration::new(tp.tv_sec as u64, tp.tv_nsec as u32).as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_time_advances() {
        let clock = Clock::new();
        let first = clock.now_us();
        let second = clock.now_us();
        assert!(second >= first);
        assert!(first > 0);
    }
}
