// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SD card block device adapter.
//!
//! Turns the medium's "start transfer, get an interrupt later" model into synchronous reads and
//! writes. Each transfer:
//!
//! 1. clears the completion latch for its direction,
//! 2. starts the DMA transfer (failing immediately if the medium refuses),
//! 3. spins until the latch is set, for at most [`SD_TIMEOUT_MS`],
//! 4. spins until the card is back in transfer state, again for at most [`SD_TIMEOUT_MS`].
//!
//! Requests longer than [`Medium::max_blocks`] go through these steps once per run of at most
//! that many blocks, each run with its own deadlines.
//!
//! Typical usage:
//!
//! ```no_run
//! # use sd_diskio::{diskio::{DiskIo, SdDisk}, medium::Medium, sync::{Clock, TransferEvents}};
//! # fn demo<M: Medium, C: Clock>(card: M, clock: C, events: &TransferEvents) {
//! let mut disk = SdDisk::new(card, clock, events);
//!
//! if disk.initialize().is_ready() {
//!     let mut block = [0u8; 512];
//!     let _ = disk.read(&mut block, 0, 1);
//! }
//! # }
//! ```

use crate::diskio::{Command, DiskError, DiskIo, IoctlValue, Status};
use crate::medium::{CardState, Medium};
use crate::sync::{wait_until, Clock, Direction, TransferEvents};

/// Upper bound on each of the two waits of a transfer.
pub const SD_TIMEOUT_MS: u32 = 30 * 1000;

/// Split `count` blocks at `sector` into runs of at most `max` blocks, as
/// `(blocks already done, first sector, run length)`.
fn runs(sector: u32, count: u32, max: u32) -> impl Iterator<Item = (u32, u32, u32)> {
    let max = max.max(1);
    (0..count)
        .step_by(max as usize)
        .map(move |done| (done, sector.wrapping_add(done), max.min(count - done)))
}

/// Block device adapter over one SD card.
///
/// `events` must be the same latches the card's interrupt handler signals.
pub struct SdDisk<'a, M, C> {
    medium: M,
    clock: C,
    events: &'a TransferEvents,
    status: Status,
}

impl<'a, M, C> SdDisk<'a, M, C>
where
    M: Medium,
    C: Clock,
{
    /// Wrap a medium. The drive starts out uninitialized.
    pub fn new(medium: M, clock: C, events: &'a TransferEvents) -> Self {
        Self {
            medium,
            clock,
            events,
            status: Status::NOINIT,
        }
    }

    /// Status as of the last `initialize()`/`status()` call.
    #[inline]
    pub fn last_status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn medium(&self) -> &M {
        &self.medium
    }

    #[inline]
    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[inline]
    pub fn events(&self) -> &'a TransferEvents {
        self.events
    }

    /// Release the medium and clock.
    pub fn free(self) -> (M, C) {
        (self.medium, self.clock)
    }

    /// Run a decoded control command.
    pub fn control(&mut self, cmd: Command) -> Result<IoctlValue, DiskError> {
        if !self.status.is_ready() {
            return Err(DiskError::NotReady);
        }

        // Geometry is fetched per call so a swapped card is never described by stale data.
        let value = match cmd {
            Command::Sync => IoctlValue::None,
            Command::SectorCount => IoctlValue::Dword(self.medium.card_info().block_count),
            Command::SectorSize => IoctlValue::Word(self.medium.card_info().block_size as u16),
            Command::BlockSize => IoctlValue::Dword(self.medium.card_info().erase_block_size),
        };
        Ok(value)
    }

    fn check_status(&mut self) -> Status {
        let mut stat = Status::NOINIT;

        if !self.medium.is_detected() {
            stat |= Status::NODISK;
        } else if matches!(self.medium.card_state(), Ok(state) if state.is_transfer()) {
            stat.remove(Status::NOINIT);
        }

        if self.medium.is_write_protected() {
            stat |= Status::PROTECT;
        }

        self.status = stat;
        stat
    }

    /// Reject a transfer before anything is started on the medium. Returns the block size.
    fn check_transfer(&mut self, buf_len: usize, count: u32) -> Result<usize, DiskError> {
        if !self.status.is_ready() {
            return Err(DiskError::NotReady);
        }
        if count == 0 {
            return Err(DiskError::ParameterError);
        }

        let block_size = self.medium.card_info().block_size as usize;
        match (count as usize).checked_mul(block_size) {
            Some(needed) if needed <= buf_len => Ok(block_size),
            _ => Err(DiskError::ParameterError),
        }
    }

    /// Wait for the completion latch, then for the card to settle back into transfer state.
    ///
    /// Must be entered right after the transfer was started.
    fn finish(&mut self, dir: Direction) -> Result<(), DiskError> {
        let flag = self.events.flag(dir);
        wait_until(&self.clock, SD_TIMEOUT_MS, || flag.take())?;

        let medium = &mut self.medium;
        wait_until(&self.clock, SD_TIMEOUT_MS, || {
            matches!(medium.card_state(), Ok(CardState::Transfer))
        })?;

        Ok(())
    }
}

impl<'a, M, C> DiskIo for SdDisk<'a, M, C>
where
    M: Medium,
    C: Clock,
{
    fn initialize(&mut self) -> Status {
        self.check_status()
    }

    fn status(&mut self) -> Status {
        self.check_status()
    }

    fn read(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<(), DiskError> {
        let block_size = self.check_transfer(buf.len(), count)?;

        for (done, lba, n) in runs(sector, count, self.medium.max_blocks()) {
            let at = done as usize * block_size;
            let chunk = &mut buf[at..at + n as usize * block_size];

            self.events.read.clear();
            self.medium
                .read_blocks_async(chunk, lba, n)
                .map_err(|_| DiskError::InitiationFailed)?;
            self.finish(Direction::Read)?;
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<(), DiskError> {
        let block_size = self.check_transfer(buf.len(), count)?;

        for (done, lba, n) in runs(sector, count, self.medium.max_blocks()) {
            let at = done as usize * block_size;
            let chunk = &buf[at..at + n as usize * block_size];

            self.events.write.clear();
            self.medium
                .write_blocks_async(chunk, lba, n)
                .map_err(|_| DiskError::InitiationFailed)?;
            self.finish(Direction::Write)?;
        }
        Ok(())
    }

    fn ioctl(&mut self, cmd: u8) -> Result<IoctlValue, DiskError> {
        let cmd = Command::from_code(cmd).ok_or(DiskError::ParameterError)?;
        self.control(cmd)
    }
}
