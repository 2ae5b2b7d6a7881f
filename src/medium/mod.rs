// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Storage Medium Seam
//!
//! The block device adapter talks to the card only through [`Medium`]. On hardware this is the
//! SDMMC/DMA driver in `hw::sdmmc`; in tests it is a simulated card.
//!
//! ## Modules
//!
//! - [`csd`] - Card-Specific Data register decoding into [`CardInfo`].
//! - [`protocol`] - SD command indices, OCR/R1/R6/R7 fields, clocking and addressing helpers.

pub mod csd;
pub mod protocol;

/// Logical block size used for all transfers.
pub const BLOCK_SIZE: u32 = 512;

/// SD card state, from the CURRENT_STATE field of an R1 card status.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CardState {
    Idle,
    Ready,
    Ident,
    Standby,
    /// Selected and idle: ready for the next data command.
    Transfer,
    Sending,
    Receiving,
    Programming,
    Disconnect,
    /// Reserved encodings.
    Unknown(u8),
}

impl CardState {
    /// Decode CURRENT_STATE (bits 12:9) of an R1 response.
    pub fn from_r1(r1: u32) -> Self {
        match ((r1 >> 9) & 0xF) as u8 {
            0 => CardState::Idle,
            1 => CardState::Ready,
            2 => CardState::Ident,
            3 => CardState::Standby,
            4 => CardState::Transfer,
            5 => CardState::Sending,
            6 => CardState::Receiving,
            7 => CardState::Programming,
            8 => CardState::Disconnect,
            other => CardState::Unknown(other),
        }
    }

    /// `true` when the card can accept a new data command.
    #[inline]
    pub fn is_transfer(self) -> bool {
        self == CardState::Transfer
    }
}

/// Card geometry, as reported by the medium at query time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CardInfo {
    /// Number of logical blocks.
    pub block_count: u32,
    /// Logical block size in bytes.
    pub block_size: u32,
    /// Erase unit, in logical blocks.
    pub erase_block_size: u32,
}

/// An SD card (or anything shaped like one) whose transfers complete asynchronously.
///
/// `read_blocks_async` / `write_blocks_async` only *start* a transfer. Completion is reported out of
/// band through the read/write latch of a [`TransferEvents`](crate::sync::TransferEvents), usually
/// from an interrupt handler.
pub trait Medium {
    /// Driver-level error. Only used to decide success or failure; never inspected further by the
    /// adapter.
    type Error: core::fmt::Debug;

    /// Query the card's current state.
    fn card_state(&mut self) -> Result<CardState, Self::Error>;

    /// Current card geometry.
    fn card_info(&mut self) -> CardInfo;

    /// Start reading `count` blocks from `start_block` into `buf`.
    ///
    /// `buf` holds at least `count * block_size` bytes. The transfer must not touch `buf` once
    /// a later transfer has been started.
    fn read_blocks_async(
        &mut self,
        buf: &mut [u8],
        start_block: u32,
        count: u32,
    ) -> Result<(), Self::Error>;

    /// Start writing `count` blocks from `buf` at `start_block`.
    fn write_blocks_async(
        &mut self,
        buf: &[u8],
        start_block: u32,
        count: u32,
    ) -> Result<(), Self::Error>;

    /// Bring the card up from scratch, e.g. after it was hot-inserted.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Largest `count` one `*_blocks_async` call accepts. The adapter splits longer requests.
    fn max_blocks(&self) -> u32 {
        u32::MAX
    }

    /// Card-detect line. Media without one are always present.
    fn is_detected(&mut self) -> bool {
        true
    }

    fn is_write_protected(&mut self) -> bool {
        false
    }
}
