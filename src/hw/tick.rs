// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Millisecond tick from SysTick.
//!
//! The counter is bumped by the SysTick exception, so the application must forward it:
//!
//! ```ignore
//! #[exception]
//! fn SysTick() {
//!     sd_diskio::hw::tick::on_tick();
//! }
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::{syst::SystClkSource, SYST};

use crate::sync::Clock;

static TICKS: AtomicU32 = AtomicU32::new(0);

/// Advance the millisecond counter. Call once per SysTick exception.
#[inline]
pub fn on_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Owns SysTick, configured for a 1 kHz exception.
pub struct SysTickClock {
    syst: SYST,
}

impl SysTickClock {
    /// Start SysTick from the core clock. `sysclk_hz` is the core clock in Hz.
    pub fn start(mut syst: SYST, sysclk_hz: u32) -> Self {
        syst.disable_counter();
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(sysclk_hz / 1_000 - 1);
        syst.clear_current();
        syst.enable_interrupt();
        syst.enable_counter();

        Self { syst }
    }

    /// Stop the tick and release SysTick.
    pub fn free(mut self) -> SYST {
        self.syst.disable_interrupt();
        self.syst.disable_counter();
        self.syst
    }
}

impl Clock for SysTickClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        TICKS.load(Ordering::Relaxed)
    }
}
