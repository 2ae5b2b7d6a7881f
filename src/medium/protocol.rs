// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SD bus protocol: command indices, response fields and the bring-up arithmetic a card driver
//! needs regardless of the host controller.

/// Command indices. `ACMD`s must be preceded by `APP_CMD`.
pub mod cmd {
    pub const GO_IDLE_STATE: u8 = 0;
    pub const ALL_SEND_CID: u8 = 2;
    pub const SEND_RELATIVE_ADDR: u8 = 3;
    pub const SET_BUS_WIDTH: u8 = 6; // ACMD6
    pub const SELECT_CARD: u8 = 7;
    pub const SEND_IF_COND: u8 = 8;
    pub const SEND_CSD: u8 = 9;
    pub const STOP_TRANSMISSION: u8 = 12;
    pub const SEND_STATUS: u8 = 13;
    pub const SET_BLOCKLEN: u8 = 16;
    pub const READ_SINGLE_BLOCK: u8 = 17;
    pub const READ_MULTIPLE_BLOCK: u8 = 18;
    pub const WRITE_BLOCK: u8 = 24;
    pub const WRITE_MULTIPLE_BLOCK: u8 = 25;
    pub const SD_SEND_OP_COND: u8 = 41; // ACMD41
    pub const APP_CMD: u8 = 55;
}

/// Identification-mode clock ceiling.
pub const IDENT_CLOCK_HZ: u32 = 400_000;
/// Default-speed data clock ceiling.
pub const DATA_CLOCK_HZ: u32 = 25_000_000;

/// CMD8 argument: 2.7-3.6 V, check pattern 0xAA.
pub const IF_COND_CHECK: u32 = 0x1AA;

/// ACMD41 must report power-up done within this long.
pub const OP_COND_TIMEOUT_MS: u32 = 1_000;

/// R1 card status bits that signal an error.
pub const R1_ERRORS: u32 = 0xFDF9_E008;

/// ACMD41 argument and response.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ocr(pub u32);

impl Ocr {
    const BUSY: u32 = 1 << 31;
    const CCS: u32 = 1 << 30;
    const HCS: u32 = 1 << 30;
    /// 3.2-3.3 V
    const VOLTAGE_WINDOW: u32 = 0x0010_0000;

    /// ACMD41 argument. High capacity is only offered to cards that answered CMD8.
    pub fn request(v2_card: bool) -> u32 {
        Self::VOLTAGE_WINDOW | if v2_card { Self::HCS } else { 0 }
    }

    /// Card finished its power-up sequence.
    #[inline]
    pub fn is_ready(self) -> bool {
        self.0 & Self::BUSY != 0
    }

    /// SDHC/SDXC: block addressed. Only valid once `is_ready`.
    #[inline]
    pub fn is_high_capacity(self) -> bool {
        self.0 & Self::CCS != 0
    }
}

/// `true` if the R7 echo to CMD8 matches what was sent.
#[inline]
pub fn if_cond_accepted(r7: u32) -> bool {
    r7 & 0xFFF == IF_COND_CHECK
}

/// RCA from an R6 response.
#[inline]
pub fn rca_from_r6(r6: u32) -> u16 {
    (r6 >> 16) as u16
}

/// Number of ACMD41 polls, `poll_ms` apart, that fit in [`OP_COND_TIMEOUT_MS`].
pub fn op_cond_attempts(poll_ms: u32) -> u32 {
    (OP_COND_TIMEOUT_MS / poll_ms.max(1)).max(1)
}

/// Data command argument: block number on high capacity cards, byte offset on SDSC.
#[inline]
pub fn data_address(block: u32, high_capacity: bool, block_size: u32) -> u32 {
    if high_capacity {
        block
    } else {
        block.wrapping_mul(block_size)
    }
}

/// Controller clock divider for an SD clock of at most `target_hz`, for hosts where
/// `SD_CK = kernel / (div + 2)` (STM32 SDMMC/SDIO). `None` if the kernel clock is too fast for
/// the 8-bit divider field.
pub fn clock_divider(kernel_hz: u32, target_hz: u32) -> Option<u32> {
    let ratio = kernel_hz.div_ceil(target_hz);
    let div = ratio.saturating_sub(2);
    (div <= 0xFF).then_some(div)
}
