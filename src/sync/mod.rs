// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Foreground / Interrupt Coordination
//!
//! The only state shared between an interrupt handler and the polling foreground lives here.
//!
//! ## Modules
//!
//! - [`clock`] - Monotonic millisecond tick source.
//! - [`event`] - Single-producer/single-consumer completion latches, one per transfer direction.
//! - [`slot`] - The in-flight DMA transfer, claimed by the foreground and released by the interrupt.
//! - [`wait`] - Deadline-bounded busy waits used by every transfer path.

pub mod clock;
pub mod event;
pub mod slot;
pub mod wait;

pub use clock::Clock;
pub use event::{CompletionFlag, Direction, TransferEvents};
pub use slot::{Transfer, TransferSlot};
pub use wait::{wait_until, Deadline, TimedOut};
