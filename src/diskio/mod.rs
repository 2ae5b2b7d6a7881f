// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Block Device Layer
//!
//! The generic block device contract a FAT filesystem (or the USB mass-storage backend) is written
//! against, and the SD card adapter that implements it.
//!
//! ## Modules
//!
//! - [`sd_disk`] - `SdDisk`, the SD card adapter with DMA completion and bounded waits.
//! - [`status`] - `DSTATUS`-style drive status bits.
//! - [`ioctl`] - Supported control commands.
//! - [`error`] - `DiskError` and `DRESULT` codes.

pub mod error;
pub mod ioctl;
pub mod sd_disk;
pub mod status;

pub use error::{to_dresult, DResult, DiskError};
pub use ioctl::{Command, IoctlValue};
pub use sd_disk::{SdDisk, SD_TIMEOUT_MS};
pub use status::Status;

/// Block device operations, in the shape of a FatFs `Diskio_drvTypeDef`.
///
/// Every call terminates; none retries internally.
pub trait DiskIo {
    /// Check the drive and return its status.
    fn initialize(&mut self) -> Status;

    /// Re-check the drive and return its status. Never served from a cache.
    fn status(&mut self) -> Status;

    /// Read `count` sectors starting at `sector` into `buf`.
    fn read(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<(), DiskError>;

    /// Write `count` sectors from `buf` starting at `sector`.
    fn write(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<(), DiskError>;

    /// Run a control command given by its FatFs code.
    fn ioctl(&mut self, cmd: u8) -> Result<IoctlValue, DiskError>;
}
