// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Card-Specific Data (CSD) register.
//!
//! The CSD is read with CMD9 as a 136-bit R2 response; the controller hands back the 128 payload
//! bits in four words, most significant first (RESP1 holds bits 127:96).

use crate::medium::{CardInfo, BLOCK_SIZE};

/// Raw CSD register.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Csd {
    raw: u128,
}

/// CSD layout version.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CsdVersion {
    /// Standard capacity (SDSC).
    V1,
    /// High / extended capacity (SDHC, SDXC).
    V2,
    Reserved(u8),
}

impl Csd {
    /// Build from the four response words, RESP1 first.
    pub fn from_words(words: [u32; 4]) -> Self {
        let raw = (words[0] as u128) << 96
            | (words[1] as u128) << 64
            | (words[2] as u128) << 32
            | words[3] as u128;
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> u128 {
        self.raw
    }

    /// Extract bits `hi..=lo`.
    #[inline]
    fn field(&self, hi: u32, lo: u32) -> u32 {
        let width = hi - lo + 1;
        ((self.raw >> lo) & ((1u128 << width) - 1)) as u32
    }

    /// CSD_STRUCTURE, bits 127:126.
    pub fn version(&self) -> CsdVersion {
        match self.field(127, 126) {
            0 => CsdVersion::V1,
            1 => CsdVersion::V2,
            other => CsdVersion::Reserved(other as u8),
        }
    }

    /// READ_BL_LEN, bits 83:80 (log2 of the max read block length).
    pub fn read_bl_len(&self) -> u32 {
        self.field(83, 80)
    }

    /// WRITE_BL_LEN, bits 25:22.
    pub fn write_bl_len(&self) -> u32 {
        self.field(25, 22)
    }

    /// SECTOR_SIZE, bits 45:39. Erasable sector size minus one, in write blocks.
    pub fn sector_size(&self) -> u32 {
        self.field(45, 39)
    }

    /// Capacity in bytes, or `None` for a reserved CSD layout.
    pub fn capacity_bytes(&self) -> Option<u64> {
        match self.version() {
            CsdVersion::V1 => {
                let c_size = self.field(73, 62) as u64;
                let c_size_mult = self.field(49, 47);
                let block_nr = (c_size + 1) << (c_size_mult + 2);
                Some(block_nr << self.read_bl_len())
            }
            CsdVersion::V2 => {
                // C_SIZE counts 512 KiB units.
                let c_size = self.field(69, 48) as u64;
                Some((c_size + 1) * 512 * 1024)
            }
            CsdVersion::Reserved(_) => None,
        }
    }

    /// Geometry in [`BLOCK_SIZE`] logical blocks, or `None` for a reserved CSD layout.
    pub fn card_info(&self) -> Option<CardInfo> {
        let capacity = self.capacity_bytes()?;
        let block_count = (capacity / BLOCK_SIZE as u64).min(u32::MAX as u64) as u32;

        let write_block = 1u32 << self.write_bl_len();
        let erase_block_size = (self.sector_size() + 1) * write_block / BLOCK_SIZE;

        Some(CardInfo {
            block_count,
            block_size: BLOCK_SIZE,
            erase_block_size: erase_block_size.max(1),
        })
    }
}
