// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SD card bring-up on a NUCLEO-F767ZI with a microSD breakout on SDMMC1.
//!
//! Brings up the card, prints its geometry, dumps the tail of sector 0 and then keeps reporting
//! status changes (card pulled, reinserted) on the ST-LINK virtual COM port.

#![no_main]
#![no_std]

use core::fmt::Write;

use cortex_m::peripheral::NVIC;
use cortex_m_rt::{entry, exception};
use panic_halt as _;

use hal::{
    pac::{self, interrupt},
    prelude::*,
    serial::{Config, Serial},
};
use stm32f7xx_hal as hal;

use sd_diskio::diskio::{ioctl, DiskIo, SdDisk, Status};
use sd_diskio::hw::{
    sdmmc::{self, SdmmcConfig},
    tick, CardDetect, Console, SdmmcCard, SysTickClock,
};
use sd_diskio::medium::{Medium, BLOCK_SIZE};
use sd_diskio::sync::{Clock, TransferEvents};

static SD_EVENTS: TransferEvents = TransferEvents::new();

const POLL_MS: u32 = 1_000;

/// DMA moves whole words.
#[repr(align(4))]
struct Sector([u8; BLOCK_SIZE as usize]);

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let sysclk = clocks.sysclk().raw();

    // GPIO
    let gpioc = dp.GPIOC.split();
    let gpiod = dp.GPIOD.split();

    // USART3 (ST-LINK VCP)
    let tx = gpiod.pd8.into_alternate::<7>();
    let rx = gpiod.pd9.into_alternate::<7>();
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(dp.USART3, (tx, rx), &clocks, usart_cfg);
    let mut console = Console::new(serial);

    // SDMMC1: D0..D3 = PC8..PC11, CK = PC12, CMD = PD2
    let _sd_pins = (
        gpioc.pc8.into_alternate::<12>(),
        gpioc.pc9.into_alternate::<12>(),
        gpioc.pc10.into_alternate::<12>(),
        gpioc.pc11.into_alternate::<12>(),
        gpioc.pc12.into_alternate::<12>(),
        gpiod.pd2.into_alternate::<12>(),
    );
    let detect = CardDetect::active_low(gpioc.pc13);

    let clock = SysTickClock::start(cp.SYST, sysclk);
    let card = SdmmcCard::new(
        dp.SDMMC1,
        dp.DMA2,
        detect,
        &SD_EVENTS,
        SdmmcConfig {
            kernel_clock_hz: sysclk,
            ..Default::default()
        },
    );
    unsafe { NVIC::unmask(pac::Interrupt::SDMMC1) };

    let mut disk = SdDisk::new(card, clock, &SD_EVENTS);

    console.println("");
    console.println("sd-diskio bring-up");

    match disk.medium_mut().init() {
        Ok(()) if disk.medium().is_high_capacity() => console.println("card: SDHC/SDXC"),
        Ok(()) => console.println("card: SDSC"),
        Err(e) => {
            let _ = write!(console, "card init failed: {:?}\r\n", e);
        }
    }

    let status = disk.initialize();
    console.report_status("initialize", status);

    if status.is_ready() {
        console.report_ioctl("sectors", &disk.ioctl(ioctl::GET_SECTOR_COUNT));
        console.report_ioctl("sector size", &disk.ioctl(ioctl::GET_SECTOR_SIZE));
        console.report_ioctl("erase block", &disk.ioctl(ioctl::GET_BLOCK_SIZE));

        let mut sector = Sector([0; BLOCK_SIZE as usize]);
        let res = disk.read(&mut sector.0, 0, 1);
        console.report("read sector 0", &res);
        if res.is_ok() {
            console.hex_dump(0x1F0, &sector.0[0x1F0..]);
            if sector.0[510..] == [0x55, 0xAA] {
                console.println("boot signature present");
            }
        }
    }

    // Watch for removal / insertion
    let mut last = status;
    let mut next_poll = disk.clock().now_ms().wrapping_add(POLL_MS);
    loop {
        let now = disk.clock().now_ms();
        if now.wrapping_sub(next_poll) as i32 >= 0 {
            next_poll = now.wrapping_add(POLL_MS);

            let mut status = disk.status();
            if last.contains(Status::NODISK) && !status.contains(Status::NODISK) {
                // Freshly inserted card needs the full identification sequence.
                if disk.medium_mut().init().is_ok() {
                    status = disk.status();
                }
            }
            if status != last {
                console.report_status("status", status);
                last = status;
            }
        }
        cortex_m::asm::wfi();
    }
}

#[exception]
fn SysTick() {
    tick::on_tick();
}

#[interrupt]
fn SDMMC1() {
    sdmmc::on_interrupt(&SD_EVENTS);
}
