// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Drive status bits, FatFs `DSTATUS` compatible.

use bitflags::bitflags;

bitflags! {
    /// Drive status. An empty set means the drive is ready.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct Status: u8 {
        /// Drive has not been initialized, or the card did not answer.
        const NOINIT  = 0x01;
        /// No medium in the drive.
        const NODISK  = 0x02;
        /// Medium is write protected.
        const PROTECT = 0x04;
    }
}

impl Status {
    /// Raw `DSTATUS` byte.
    #[inline]
    pub fn raw(&self) -> u8 {
        self.bits()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.contains(Status::NOINIT)
    }
}
