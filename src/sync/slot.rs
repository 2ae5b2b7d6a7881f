// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! The one DMA transfer a driver has in flight, shared with its interrupt handler.
//!
//! The foreground [`claim`](TransferSlot::claim)s the slot before arming a transfer and the
//! interrupt [`release`](TransferSlot::release)s it when the transfer ends. A transfer whose caller
//! gave up is still in the slot when the next one is claimed; the claimer tears it down.
//!
//! `claim` also clears the new transfer's completion latch. The adapter cleared it already, but a
//! completion for the abandoned transfer may have landed since; run with the interrupt masked,
//! `claim` closes that window.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::sync::{Direction, TransferEvents};

const BUSY: u8 = 1 << 0;
const WRITE: u8 = 1 << 1;
const MULTI: u8 = 1 << 2;

/// What is in flight.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transfer {
    pub dir: Direction,
    /// Open-ended transfer (CMD18/CMD25) that needs a stop command.
    pub multi_block: bool,
}

impl Transfer {
    pub fn new(dir: Direction, count: u32) -> Self {
        Self {
            dir,
            multi_block: count > 1,
        }
    }

    fn encode(self) -> u8 {
        let mut bits = BUSY;
        if self.dir == Direction::Write {
            bits |= WRITE;
        }
        if self.multi_block {
            bits |= MULTI;
        }
        bits
    }

    fn decode(bits: u8) -> Option<Self> {
        if bits & BUSY == 0 {
            return None;
        }
        Some(Self {
            dir: if bits & WRITE != 0 {
                Direction::Write
            } else {
                Direction::Read
            },
            multi_block: bits & MULTI != 0,
        })
    }
}

pub struct TransferSlot {
    state: AtomicU8,
}

impl TransferSlot {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
        }
    }

    /// Take the slot for `next` and clear its completion latch.
    ///
    /// Returns the abandoned transfer, if one was still in flight. Call with the completion
    /// interrupt masked.
    pub fn claim(&self, events: &TransferEvents, next: Transfer) -> Option<Transfer> {
        let stale = Transfer::decode(self.state.swap(next.encode(), Ordering::AcqRel));
        events.flag(next.dir).clear();
        stale
    }

    /// Empty the slot, returning what was in flight.
    pub fn release(&self) -> Option<Transfer> {
        Transfer::decode(self.state.swap(0, Ordering::AcqRel))
    }

    pub fn current(&self) -> Option<Transfer> {
        Transfer::decode(self.state.load(Ordering::Acquire))
    }
}

impl Default for TransferSlot {
    fn default() -> Self {
        Self::new()
    }
}
