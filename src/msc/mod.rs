// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # USB Mass-Storage Backend
//!
//! Storage callbacks for a USB MSC (bulk-only transport / SCSI) class driver, exposing the SD card
//! as a single logical unit. The USB stack itself lives elsewhere; this module only answers its
//! storage queries.
//!
//! ## Modules
//!
//! - [`inquiry`] - Standard INQUIRY response data.
//! - [`storage`] - `MscStorage`, the per-LUN callbacks backed by `SdDisk`.

pub mod inquiry;
pub mod storage;

pub use inquiry::INQUIRY_DATA;
pub use storage::{Capacity, MscError, MscStorage, LUN_COUNT};
