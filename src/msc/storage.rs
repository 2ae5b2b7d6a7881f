// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Mass-storage LUN callbacks backed by the SD card adapter.
//!
//! The class driver polls [`MscStorage::is_ready`] for every TEST UNIT READY. That poll is also
//! where hot insertion is handled: a card that appears after having been absent is brought up
//! again before the host is told the unit is ready.

use crate::diskio::{Command, DiskError, DiskIo, SdDisk};
use crate::medium::Medium;
use crate::sync::Clock;

/// Number of logical units exposed to the host.
pub const LUN_COUNT: u8 = 1;

/// Error type for `MscStorage` operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MscError {
    /// No card in the slot.
    NoMedium,
    /// The block device rejected or failed the request.
    Disk(DiskError),
}

impl From<DiskError> for MscError {
    fn from(e: DiskError) -> Self {
        MscError::Disk(e)
    }
}

/// READ CAPACITY answer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Capacity {
    /// Total number of blocks. The last addressable LBA is `block_count - 1`.
    pub block_count: u32,
    pub block_size: u16,
}

/// Storage callbacks for the single SD card LUN.
pub struct MscStorage<'a, M, C> {
    disk: SdDisk<'a, M, C>,
    /// Card presence seen by the previous readiness poll.
    was_present: bool,
}

impl<'a, M, C> MscStorage<'a, M, C>
where
    M: Medium,
    C: Clock,
{
    pub fn new(disk: SdDisk<'a, M, C>) -> Self {
        Self {
            disk,
            was_present: false,
        }
    }

    #[inline]
    pub fn disk_mut(&mut self) -> &mut SdDisk<'a, M, C> {
        &mut self.disk
    }

    pub fn free(self) -> SdDisk<'a, M, C> {
        self.disk
    }

    #[inline]
    fn present(&mut self) -> bool {
        self.disk.medium_mut().is_detected()
    }

    /// Class init: remember whether a card is inserted and bring it up if so.
    pub fn init(&mut self) {
        self.was_present = self.present();
        if self.was_present {
            self.disk.initialize();
        }
    }

    /// Geometry of the inserted card.
    pub fn capacity(&mut self) -> Result<Capacity, MscError> {
        if !self.present() {
            return Err(MscError::NoMedium);
        }

        let block_count = self
            .disk
            .control(Command::SectorCount)?
            .as_u32()
            .ok_or(MscError::Disk(DiskError::ParameterError))?;
        let block_size = self
            .disk
            .control(Command::SectorSize)?
            .as_u32()
            .ok_or(MscError::Disk(DiskError::ParameterError))?;

        Ok(Capacity {
            block_count,
            block_size: block_size as u16,
        })
    }

    /// TEST UNIT READY.
    ///
    /// Re-initializes the card when it was absent at the previous poll.
    pub fn is_ready(&mut self) -> Result<(), MscError> {
        if !self.present() {
            self.was_present = false;
            return Err(MscError::NoMedium);
        }

        if !self.was_present {
            // Leave `was_present` unset so a failed bring-up is retried on the next poll.
            self.disk
                .medium_mut()
                .init()
                .map_err(|_| MscError::Disk(DiskError::NotReady))?;
        }
        self.was_present = true;

        if self.disk.status().is_ready() {
            Ok(())
        } else {
            Err(MscError::Disk(DiskError::NotReady))
        }
    }

    pub fn is_write_protected(&mut self) -> bool {
        self.disk.medium_mut().is_write_protected()
    }

    /// Read `blk_len` blocks starting at `blk_addr`.
    pub fn read(&mut self, buf: &mut [u8], blk_addr: u32, blk_len: u16) -> Result<(), MscError> {
        if !self.present() {
            return Err(MscError::NoMedium);
        }
        self.disk.read(buf, blk_addr, blk_len as u32)?;
        Ok(())
    }

    /// Write `blk_len` blocks starting at `blk_addr`.
    pub fn write(&mut self, buf: &[u8], blk_addr: u32, blk_len: u16) -> Result<(), MscError> {
        if !self.present() {
            return Err(MscError::NoMedium);
        }
        self.disk.write(buf, blk_addr, blk_len as u32)?;
        Ok(())
    }

    /// Highest LUN index.
    #[inline]
    pub fn max_lun(&self) -> u8 {
        LUN_COUNT - 1
    }
}
