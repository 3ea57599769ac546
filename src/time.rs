//! Millisecond tick arithmetic.
//!
//! The control loop feeds a free-running `u32` millisecond counter that
//! wraps roughly every 49.7 days.  Every comparison against that counter
//! goes through the helpers below so that a wrap between two stamps never
//! turns a short interval into a huge one (or a negative one).

/// Monotonic millisecond tick, wrapping at `u32::MAX`.
pub type Millis = u32;

/// Milliseconds elapsed from `since` to `now`.
#[inline]
pub fn elapsed(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

/// `true` once `now` is at or past `deadline`.
///
/// Valid as long as the two stamps are less than half the counter range
/// apart (~24.8 days).
#[inline]
pub fn reached(now: Millis, deadline: Millis) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

/// The later of two deadlines.
#[inline]
pub fn later_of(a: Millis, b: Millis) -> Millis {
    if reached(a, b) { a } else { b }
}
