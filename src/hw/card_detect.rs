// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SD slot card-detect switch.

use stm32f7xx_hal::gpio::{self, Input, PullUp};

/// Something that can tell whether a card is in the slot.
pub trait DetectPin {
    fn is_inserted(&mut self) -> bool;
}

/// For slots without a detect switch: the card is assumed present.
pub struct AlwaysPresent;

impl DetectPin for AlwaysPresent {
    #[inline]
    fn is_inserted(&mut self) -> bool {
        true
    }
}

/// Card-detect line, active-low (the switch pulls the pin to ground when a card is inserted).
pub struct CardDetect<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Input<PullUp>>,
}

impl<const P: char, const N: u8> CardDetect<P, N> {
    /// Configure the pin as a pulled-up input.
    pub fn active_low<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        Self {
            pin: pin.into_pull_up_input(),
        }
    }

    pub fn free(self) -> gpio::Pin<P, N, Input<PullUp>> {
        self.pin
    }
}

impl<const P: char, const N: u8> DetectPin for CardDetect<P, N> {
    #[inline]
    fn is_inserted(&mut self) -> bool {
        self.pin.is_low()
    }
}
