// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # SD DiskIO
//!
//! Block-device glue between a FAT filesystem layer (or a USB mass-storage class) and an SD card
//! whose transfers complete asynchronously over DMA, written in Rust and targeting STM32F7 MCUs.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`sync`] | Completion latches shared with interrupt handlers, monotonic clock, bounded waits |
//! | [`medium`] | The card driver seam (`Medium`), card state and CSD decoding |
//! | [`diskio`] | The block device adapter (`SdDisk`) and its FatFs-style result vocabulary |
//! | [`msc`] | USB mass-storage storage backend built on the adapter |
//! | `hw` | STM32F7 SDMMC/DMA, SysTick and USART wrappers (bare-metal targets only) |
//!
//! ## Getting Started
//!
//! Run the host tests:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the demo board:
//!
//! ```bash
//! cd firmware && cargo run --release
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod diskio;
pub mod medium;
pub mod msc;
pub mod sync;

#[cfg(target_os = "none")]
pub mod hw;
