// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! I/O control commands understood by the adapter.

// FatFs command codes
pub const CTRL_SYNC: u8 = 0;
pub const GET_SECTOR_COUNT: u8 = 1;
pub const GET_SECTOR_SIZE: u8 = 2;
pub const GET_BLOCK_SIZE: u8 = 3;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Flush pending writes. Nothing is buffered here, so this always succeeds.
    Sync,
    /// Number of sectors on the card.
    SectorCount,
    /// Sector size in bytes.
    SectorSize,
    /// Erase block size in sectors.
    BlockSize,
}

impl Command {
    /// Decode a FatFs command code. Unknown codes yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CTRL_SYNC => Some(Command::Sync),
            GET_SECTOR_COUNT => Some(Command::SectorCount),
            GET_SECTOR_SIZE => Some(Command::SectorSize),
            GET_BLOCK_SIZE => Some(Command::BlockSize),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Command::Sync => CTRL_SYNC,
            Command::SectorCount => GET_SECTOR_COUNT,
            Command::SectorSize => GET_SECTOR_SIZE,
            Command::BlockSize => GET_BLOCK_SIZE,
        }
    }
}

/// Value produced by an ioctl.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IoctlValue {
    /// Command has no output.
    None,
    /// FatFs `DWORD` output.
    Dword(u32),
    /// FatFs `WORD` output.
    Word(u16),
}

impl IoctlValue {
    /// Numeric output, if any.
    pub fn as_u32(self) -> Option<u32> {
        match self {
            IoctlValue::None => None,
            IoctlValue::Dword(v) => Some(v),
            IoctlValue::Word(v) => Some(v as u32),
        }
    }
}
