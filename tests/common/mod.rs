// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Simulated SD card and tick source.
//!
//! `SimClock` advances one millisecond per query and delivers scheduled completions when their
//! tick comes up, the way the SDMMC interrupt would preempt the adapter's polling loop.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;

use sd_diskio::medium::{CardInfo, CardState, Medium};
use sd_diskio::sync::{Clock, Direction, TransferEvents};

pub const BLOCK: usize = 512;

pub struct SimClock<'a> {
    now: Cell<u32>,
    events: &'a TransferEvents,
    pending: Cell<Option<(u32, Direction)>>,
}

impl<'a> SimClock<'a> {
    pub fn new(events: &'a TransferEvents) -> Self {
        Self {
            now: Cell::new(0),
            events,
            pending: Cell::new(None),
        }
    }

    /// Current tick without advancing.
    pub fn peek(&self) -> u32 {
        self.now.get()
    }

    /// Deliver a completion for `dir` once `delay_ms` more ticks have passed.
    pub fn schedule(&self, dir: Direction, delay_ms: u32) {
        self.pending.set(Some((self.now.get() + delay_ms, dir)));
    }
}

impl Clock for SimClock<'_> {
    fn now_ms(&self) -> u32 {
        let t = self.now.get() + 1;
        self.now.set(t);

        if let Some((at, dir)) = self.pending.get() {
            if t >= at {
                self.pending.set(None);
                self.events.flag(dir).signal();
            }
        }
        t
    }
}

/// How the simulated card reports the end of a DMA transfer.
#[derive(Copy, Clone, Debug)]
pub enum Completion {
    /// Interrupt fires while the transfer is being started.
    Immediate,
    /// Interrupt fires this many ticks later.
    After(u32),
    /// Interrupt is lost.
    Never,
}

#[derive(Debug)]
pub struct SimError;

pub struct SimCard<'a> {
    blocks: BTreeMap<u32, [u8; BLOCK]>,
    clock: &'a SimClock<'a>,
    events: &'a TransferEvents,

    pub info: CardInfo,
    pub completion: Completion,
    /// Card-state polls answered with `Programming` after each transfer.
    pub busy_polls: u32,
    busy_left: u32,

    pub present: bool,
    /// Answers CMD13. Cleared to model a card that needs re-initialization.
    pub responding: bool,
    /// Refuse to start transfers.
    pub reject: bool,
    /// Longest transfer accepted in one start.
    pub max_blocks: u32,
    pub write_protected: bool,

    /// Transfers started.
    pub starts: u32,
    /// Calls to `init`.
    pub inits: u32,
}

impl<'a> SimCard<'a> {
    pub fn new(clock: &'a SimClock<'a>, events: &'a TransferEvents, block_count: u32) -> Self {
        Self {
            blocks: BTreeMap::new(),
            clock,
            events,
            info: CardInfo {
                block_count,
                block_size: BLOCK as u32,
                erase_block_size: 128,
            },
            completion: Completion::Immediate,
            busy_polls: 0,
            busy_left: 0,
            present: true,
            responding: true,
            reject: false,
            max_blocks: u32::MAX,
            write_protected: false,
            starts: 0,
            inits: 0,
        }
    }

    pub fn block(&self, lba: u32) -> [u8; BLOCK] {
        self.blocks.get(&lba).copied().unwrap_or([0; BLOCK])
    }

    pub fn set_block(&mut self, lba: u32, data: [u8; BLOCK]) {
        self.blocks.insert(lba, data);
    }

    fn begin(&mut self, dir: Direction, start: u32, count: u32) -> Result<(), SimError> {
        if self.reject
            || !self.present
            || count > self.max_blocks
            || start + count > self.info.block_count
        {
            return Err(SimError);
        }
        self.starts += 1;
        self.busy_left = self.busy_polls;

        match self.completion {
            Completion::Immediate => self.events.flag(dir).signal(),
            Completion::After(ms) => self.clock.schedule(dir, ms),
            Completion::Never => {}
        }
        Ok(())
    }
}

impl Medium for SimCard<'_> {
    type Error = SimError;

    fn card_state(&mut self) -> Result<CardState, SimError> {
        if !self.present || !self.responding {
            return Err(SimError);
        }
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return Ok(CardState::Programming);
        }
        Ok(CardState::Transfer)
    }

    fn card_info(&mut self) -> CardInfo {
        self.info
    }

    fn read_blocks_async(
        &mut self,
        buf: &mut [u8],
        start_block: u32,
        count: u32,
    ) -> Result<(), SimError> {
        self.begin(Direction::Read, start_block, count)?;
        for (i, chunk) in buf.chunks_mut(BLOCK).take(count as usize).enumerate() {
            chunk.copy_from_slice(&self.block(start_block + i as u32));
        }
        Ok(())
    }

    fn write_blocks_async(
        &mut self,
        buf: &[u8],
        start_block: u32,
        count: u32,
    ) -> Result<(), SimError> {
        self.begin(Direction::Write, start_block, count)?;
        for (i, chunk) in buf.chunks(BLOCK).take(count as usize).enumerate() {
            let mut block = [0u8; BLOCK];
            block.copy_from_slice(chunk);
            self.blocks.insert(start_block + i as u32, block);
        }
        Ok(())
    }

    fn init(&mut self) -> Result<(), SimError> {
        self.inits += 1;
        if !self.present {
            return Err(SimError);
        }
        self.responding = true;
        Ok(())
    }

    fn max_blocks(&self) -> u32 {
        self.max_blocks
    }

    fn is_detected(&mut self) -> bool {
        self.present
    }

    fn is_write_protected(&mut self) -> bool {
        self.write_protected
    }
}

/// Block filled with a recognizable pattern.
pub fn pattern(seed: u8) -> [u8; BLOCK] {
    let mut block = [0u8; BLOCK];
    for (i, b) in block.iter_mut().enumerate() {
        *b = seed.wrapping_add(i as u8).wrapping_mul(31);
    }
    block
}
