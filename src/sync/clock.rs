// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Monotonic millisecond tick source.

/// A free-running millisecond counter.
///
/// The counter is allowed to wrap; consumers must compare ticks with wrapping arithmetic (see
/// [`Deadline`](crate::sync::Deadline)).
pub trait Clock {
    /// Current tick, in milliseconds.
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
