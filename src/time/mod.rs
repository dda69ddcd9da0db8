//! Monotonic clock.
//!
//! Timer expiries are absolute nanosecond timestamps on this clock.
//! `CLOCK_MONOTONIC` is the clock both `epoll_wait` and `kevent` measure
//! their timeouts against, so a wait computed from it never returns before
//! the timer it was computed for is due.

use libc::{CLOCK_MONOTONIC, clock_gettime, timespec};

use std::mem;
use std::time::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Returns the current monotonic time in nanoseconds.
pub fn current_time() -> u64 {
    let mut ts: timespec = unsafe { mem::zeroed() };

    // CLOCK_MONOTONIC with a valid pointer cannot fail.
    unsafe { clock_gettime(CLOCK_MONOTONIC, &mut ts) };

    (ts.tv_sec as u64)
        .saturating_mul(NANOS_PER_SEC)
        .saturating_add(ts.tv_nsec as u64)
}

/// Converts a duration to nanoseconds, saturating at `u64::MAX`.
pub(crate) fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Absolute expiry `duration` from now.
pub fn deadline_after(duration: Duration) -> u64 {
    current_time().saturating_add(as_nanos(duration))
}
