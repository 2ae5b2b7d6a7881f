// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # MCU-Level Wrappers
//!
//! STM32F7 peripherals used by the SD card stack. Only built for bare-metal targets.
//!
//! ## Modules
//!
//! - [`sdmmc`] - SDMMC1 + DMA2 SD card driver implementing [`Medium`](crate::medium::Medium).
//! - [`tick`] - SysTick-driven millisecond [`Clock`](crate::sync::Clock).
//! - [`card_detect`] - Card-detect switch input.
//! - [`usart`] - Debug console.

pub mod card_detect;
pub mod sdmmc;
pub mod tick;
pub mod usart;

pub use card_detect::CardDetect;
pub use sdmmc::SdmmcCard;
pub use tick::SysTickClock;
pub use usart::Console;
