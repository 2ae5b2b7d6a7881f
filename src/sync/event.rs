// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Transfer completion latches.
//!
//! Each direction has one latch. It is set by exactly one producer (the DMA/SDMMC interrupt) and
//! cleared by exactly one consumer (the adapter's polling loop), so a single atomic word per
//! direction is enough; no critical section is needed.
//!
//! A `TransferEvents` is usually a `static` so the interrupt handler can reach it:
//!
//! ```no_run
//! use sd_diskio::sync::TransferEvents;
//!
//! static SD_EVENTS: TransferEvents = TransferEvents::new();
//!
//! // In the SDMMC interrupt handler:
//! SD_EVENTS.read.signal();
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

/// Transfer direction, as seen from the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Read,
    Write,
}

/// Interrupt-set, poll-cleared boolean latch.
pub struct CompletionFlag {
    done: AtomicBool,
}

impl CompletionFlag {
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Mark the transfer complete. Safe to call from interrupt context; never blocks.
    #[inline]
    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Arm the latch for a new transfer.
    ///
    /// Must happen before the transfer is started, otherwise an early completion is lost.
    #[inline]
    pub fn clear(&self) {
        self.done.store(false, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Consume a pending completion. Returns `true` if one was pending.
    #[inline]
    pub fn take(&self) -> bool {
        self.done.swap(false, Ordering::AcqRel)
    }
}

impl Default for CompletionFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// The pair of completion latches for one medium instance.
pub struct TransferEvents {
    pub read: CompletionFlag,
    pub write: CompletionFlag,
}

impl TransferEvents {
    pub const fn new() -> Self {
        Self {
            read: CompletionFlag::new(),
            write: CompletionFlag::new(),
        }
    }

    /// Latch for the given direction.
    #[inline]
    pub fn flag(&self, dir: Direction) -> &CompletionFlag {
        match dir {
            Direction::Read => &self.read,
            Direction::Write => &self.write,
        }
    }

    /// Read-complete notification.
    #[inline]
    pub fn on_read_complete(&self) {
        self.read.signal();
    }

    /// Write-complete notification.
    #[inline]
    pub fn on_write_complete(&self) {
        self.write.signal();
    }
}

impl Default for TransferEvents {
    fn default() -> Self {
        Self::new()
    }
}
