// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Deadline-bounded busy waits.
//!
//! The caller spins without yielding until the predicate holds or the deadline passes. Every call
//! terminates: at worst after `timeout_ms` plus one poll of the predicate.

use crate::sync::Clock;

/// The wait ran out of time before its predicate held.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimedOut;

/// A point in time `timeout_ms` after construction.
#[derive(Copy, Clone, Debug)]
pub struct Deadline {
    start: u32,
    timeout_ms: u32,
}

impl Deadline {
    /// Start a deadline now.
    pub fn after<C: Clock + ?Sized>(clock: &C, timeout_ms: u32) -> Self {
        Self {
            start: clock.now_ms(),
            timeout_ms,
        }
    }

    /// Milliseconds since the deadline was started. Robust to counter wrap-around.
    #[inline]
    pub fn elapsed<C: Clock + ?Sized>(&self, clock: &C) -> u32 {
        clock.now_ms().wrapping_sub(self.start)
    }

    #[inline]
    pub fn expired<C: Clock + ?Sized>(&self, clock: &C) -> bool {
        self.elapsed(clock) >= self.timeout_ms
    }
}

/// Busy-poll `ready` until it returns `true` or `timeout_ms` elapses.
///
/// `ready` is evaluated at least once, so an already-satisfied condition succeeds even with a zero
/// timeout.
pub fn wait_until<C, F>(clock: &C, timeout_ms: u32, mut ready: F) -> Result<(), TimedOut>
where
    C: Clock + ?Sized,
    F: FnMut() -> bool,
{
    let deadline = Deadline::after(clock, timeout_ms);

    loop {
        if ready() {
            return Ok(());
        }
        if deadline.expired(clock) {
            return Err(TimedOut);
        }
        core::hint::spin_loop();
    }
}
