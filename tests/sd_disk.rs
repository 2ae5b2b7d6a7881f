// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

mod common;

use common::{pattern, Completion, SimCard, SimClock, BLOCK};
use sd_diskio::diskio::{
    ioctl, to_dresult, DResult, DiskError, DiskIo, IoctlValue, SdDisk, Status, SD_TIMEOUT_MS,
};
use sd_diskio::sync::TransferEvents;

const BLOCKS: u32 = 65536;

#[test]
fn fresh_adapter_is_uninitialized() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let mut card = SimCard::new(&clock, &events, BLOCKS);
    card.responding = false;
    let mut disk = SdDisk::new(card, &clock, &events);

    assert!(disk.last_status().contains(Status::NOINIT));
    assert!(disk.status().contains(Status::NOINIT));

    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 0, 1), Err(DiskError::NotReady));
}

#[test]
fn initialize_and_status_track_the_card() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);

    assert_eq!(disk.initialize(), Status::empty());
    assert_eq!(disk.initialize(), Status::empty());

    disk.medium_mut().responding = false;
    assert_eq!(disk.status(), Status::NOINIT);

    disk.medium_mut().responding = true;
    disk.medium_mut().write_protected = true;
    assert_eq!(disk.status(), Status::PROTECT);

    disk.medium_mut().present = false;
    assert_eq!(disk.status(), Status::NOINIT | Status::NODISK | Status::PROTECT);
}

#[test]
fn reads_block_zero_of_a_ready_card() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let mut card = SimCard::new(&clock, &events, BLOCKS);
    card.set_block(0, pattern(0x55));
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 0, 1), Ok(()));
    assert_eq!(buf, pattern(0x55));
}

#[test]
fn write_then_read_returns_the_same_bytes() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    let mut out = vec![0u8; 3 * BLOCK];
    for (i, chunk) in out.chunks_mut(BLOCK).enumerate() {
        chunk.copy_from_slice(&pattern(i as u8 + 1));
    }
    assert_eq!(disk.write(&out, 1000, 3), Ok(()));

    let mut back = vec![0u8; 3 * BLOCK];
    assert_eq!(disk.read(&mut back, 1000, 3), Ok(()));
    assert_eq!(back, out);

    // Neighbors untouched
    assert_eq!(disk.medium().block(999), [0; BLOCK]);
    assert_eq!(disk.medium().block(1003), [0; BLOCK]);
}

#[test]
fn write_to_uninitialized_drive_fails_fast() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);

    let before = clock.peek();
    assert_eq!(disk.write(&[0u8; BLOCK], 0, 1), Err(DiskError::NotReady));
    assert_eq!(clock.peek(), before);
    assert_eq!(disk.medium().starts, 0);
}

#[test]
fn rejected_transfer_fails_without_waiting() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();
    disk.medium_mut().reject = true;

    let before = clock.peek();
    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 0, 1), Err(DiskError::InitiationFailed));
    assert_eq!(disk.write(&buf, 0, 1), Err(DiskError::InitiationFailed));
    assert_eq!(clock.peek(), before);
}

#[test]
fn lost_read_completion_times_out_on_schedule() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();
    disk.medium_mut().completion = Completion::Never;

    let start = clock.peek();
    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 0, 1), Err(DiskError::Timeout));

    let elapsed = clock.peek() - start;
    assert!(elapsed >= SD_TIMEOUT_MS);
    assert!(elapsed <= SD_TIMEOUT_MS + 2);
    assert!(!events.read.is_set());
}

#[test]
fn lost_write_completion_times_out_on_schedule() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();
    disk.medium_mut().completion = Completion::Never;

    let start = clock.peek();
    assert_eq!(disk.write(&[0xAA; BLOCK], 7, 1), Err(DiskError::Timeout));

    let elapsed = clock.peek() - start;
    assert!(elapsed >= SD_TIMEOUT_MS);
    assert!(elapsed <= SD_TIMEOUT_MS + 2);
}

#[test]
fn stale_completion_does_not_satisfy_a_new_transfer() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();
    disk.medium_mut().completion = Completion::Never;

    // Left over from an earlier transfer
    events.on_read_complete();

    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 0, 1), Err(DiskError::Timeout));
}

#[test]
fn completion_arriving_mid_wait_succeeds() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let mut card = SimCard::new(&clock, &events, BLOCKS);
    card.set_block(42, pattern(9));
    card.completion = Completion::After(250);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    let start = clock.peek();
    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 42, 1), Ok(()));
    assert_eq!(buf, pattern(9));

    let elapsed = clock.peek() - start;
    assert!(elapsed >= 250 && elapsed < SD_TIMEOUT_MS);
    // Consumed by the adapter
    assert!(!events.read.is_set());
}

#[test]
fn waits_for_card_to_leave_programming_state() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let mut card = SimCard::new(&clock, &events, BLOCKS);
    card.busy_polls = 20;
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    assert_eq!(disk.write(&pattern(3), 5, 1), Ok(()));
    assert_eq!(disk.medium().block(5), pattern(3));
}

#[test]
fn each_wait_gets_its_own_deadline() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let mut card = SimCard::new(&clock, &events, BLOCKS);
    card.completion = Completion::After(20_000);
    card.busy_polls = 15_000;
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    // Together the two waits run past one timeout, but neither does alone.
    let start = clock.peek();
    assert_eq!(disk.write(&pattern(4), 9, 1), Ok(()));
    assert!(clock.peek() - start > SD_TIMEOUT_MS);
    assert_eq!(disk.medium().block(9), pattern(4));
    assert!(!events.write.is_set());
}

#[test]
fn long_requests_are_split_to_the_medium_limit() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let mut card = SimCard::new(&clock, &events, BLOCKS);
    card.max_blocks = 4;
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    let mut out = vec![0u8; 10 * BLOCK];
    for (i, chunk) in out.chunks_mut(BLOCK).enumerate() {
        chunk.copy_from_slice(&pattern(i as u8));
    }
    assert_eq!(disk.write(&out, 500, 10), Ok(()));
    assert_eq!(disk.medium().starts, 3);
    assert_eq!(disk.medium().block(509), pattern(9));

    let mut back = vec![0u8; 10 * BLOCK];
    assert_eq!(disk.read(&mut back, 500, 10), Ok(()));
    assert_eq!(disk.medium().starts, 6);
    assert_eq!(back, out);
}

#[test]
fn card_stuck_busy_after_completion_times_out() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();
    disk.medium_mut().busy_polls = u32::MAX;

    let start = clock.peek();
    assert_eq!(disk.write(&pattern(3), 5, 1), Err(DiskError::Timeout));

    // Completion was immediate, so only the second wait ran to its deadline.
    let elapsed = clock.peek() - start;
    assert!(elapsed >= SD_TIMEOUT_MS);
    assert!(elapsed <= SD_TIMEOUT_MS + 4);
}

#[test]
fn invalid_transfer_shapes_are_parameter_errors() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    let mut buf = [0u8; BLOCK];
    assert_eq!(disk.read(&mut buf, 0, 0), Err(DiskError::ParameterError));
    assert_eq!(disk.read(&mut buf, 0, 2), Err(DiskError::ParameterError));
    assert_eq!(disk.write(&buf[..100], 0, 1), Err(DiskError::ParameterError));
    assert_eq!(disk.medium().starts, 0);
}

#[test]
fn unknown_ioctl_is_a_parameter_error_in_any_state() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);

    assert_eq!(disk.ioctl(0x7F), Err(DiskError::ParameterError));
    disk.initialize();
    assert_eq!(disk.ioctl(0x7F), Err(DiskError::ParameterError));
    assert_eq!(disk.ioctl(4), Err(DiskError::ParameterError));
}

#[test]
fn ioctl_needs_an_initialized_drive() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);

    assert_eq!(disk.ioctl(ioctl::GET_SECTOR_COUNT), Err(DiskError::NotReady));
    assert_eq!(disk.ioctl(ioctl::CTRL_SYNC), Err(DiskError::NotReady));

    disk.initialize();
    assert_eq!(disk.ioctl(ioctl::CTRL_SYNC), Ok(IoctlValue::None));
}

#[test]
fn ioctl_reports_live_card_geometry() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);
    disk.initialize();

    assert_eq!(disk.ioctl(ioctl::GET_SECTOR_COUNT), Ok(IoctlValue::Dword(65536)));
    assert_eq!(disk.ioctl(ioctl::GET_SECTOR_SIZE), Ok(IoctlValue::Word(512)));
    assert_eq!(disk.ioctl(ioctl::GET_BLOCK_SIZE), Ok(IoctlValue::Dword(128)));

    // Card swapped for a bigger one between calls
    disk.medium_mut().info.block_count = 1 << 24;
    disk.medium_mut().info.erase_block_size = 8;
    assert_eq!(
        disk.ioctl(ioctl::GET_SECTOR_COUNT),
        Ok(IoctlValue::Dword(1 << 24))
    );
    assert_eq!(disk.ioctl(ioctl::GET_BLOCK_SIZE), Ok(IoctlValue::Dword(8)));
}

#[test]
fn results_map_onto_dresult_codes() {
    let events = TransferEvents::new();
    let clock = SimClock::new(&events);
    let card = SimCard::new(&clock, &events, BLOCKS);
    let mut disk = SdDisk::new(card, &clock, &events);

    let mut buf = [0u8; BLOCK];
    assert_eq!(to_dresult(&disk.read(&mut buf, 0, 1)), DResult::NotReady);
    disk.initialize();
    assert_eq!(to_dresult(&disk.read(&mut buf, 0, 1)), DResult::Ok);
    assert_eq!(to_dresult(&disk.ioctl(99)), DResult::ParameterError);
}
