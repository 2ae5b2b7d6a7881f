// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SD card on SDMMC1 with DMA2, by direct PAC register access.
//!
//! - SDMMC1 is clocked from SYSCLK.
//! - Reads use DMA2 stream 3, writes DMA2 stream 6, both on channel 4 with the SDMMC as flow
//!   controller.
//! - Completion is reported from [`on_interrupt`], which must be called from the `SDMMC1` handler
//!   with the same [`TransferEvents`] the card and the adapter were given.
//!
//! Pins (CK, CMD, D0..D3) must already be in alternate function 12. The data cache must be off or
//! the buffers must live in non-cacheable memory.
//!
//! A transfer abandoned by its caller (adapter timeout) is torn down when the next one starts,
//! with the interrupt masked, and any completion it raised in the meantime is dropped.

use core::ptr::addr_of;
use core::sync::atomic::{fence, Ordering};

use cortex_m::interrupt;
use stm32f7xx_hal::pac;

use crate::hw::card_detect::{AlwaysPresent, DetectPin};
use crate::medium::protocol::{self, cmd, Ocr};
use crate::medium::{csd::Csd, CardInfo, CardState, Medium, BLOCK_SIZE};
use crate::sync::{Direction, Transfer, TransferEvents, TransferSlot};

// SDMMC register bits
const POWER_ON: u32 = 0b11;

const CLKCR_CLKEN: u32 = 1 << 8;
const CLKCR_PWRSAV: u32 = 1 << 9;
const CLKCR_WIDBUS_4: u32 = 0b01 << 11;

const CMD_WAITRESP_SHORT: u32 = 0b01 << 6;
const CMD_WAITRESP_LONG: u32 = 0b11 << 6;
const CMD_CPSMEN: u32 = 1 << 10;

const DCTRL_DTEN: u32 = 1 << 0;
const DCTRL_DTDIR_READ: u32 = 1 << 1;
const DCTRL_DMAEN: u32 = 1 << 3;
const DCTRL_DBLOCKSIZE_512: u32 = 9 << 4;

const STA_CCRCFAIL: u32 = 1 << 0;
const STA_DCRCFAIL: u32 = 1 << 1;
const STA_CTIMEOUT: u32 = 1 << 2;
const STA_DTIMEOUT: u32 = 1 << 3;
const STA_TXUNDERR: u32 = 1 << 4;
const STA_RXOVERR: u32 = 1 << 5;
const STA_CMDREND: u32 = 1 << 6;
const STA_CMDSENT: u32 = 1 << 7;
const STA_DATAEND: u32 = 1 << 8;

const STA_CMD_FLAGS: u32 = STA_CCRCFAIL | STA_CTIMEOUT | STA_CMDREND | STA_CMDSENT;
const STA_DATA_ERRORS: u32 = STA_DCRCFAIL | STA_DTIMEOUT | STA_TXUNDERR | STA_RXOVERR;
/// All static flags, for ICR.
const ICR_STATIC: u32 = 0x0000_05FF;

/// Interrupts enabled while a data transfer is in flight.
const MASK_DATA: u32 = STA_DATA_ERRORS | STA_DATAEND;

const DATA_TIMEOUT_CYCLES: u32 = 0xFFFF_FFFF;

// DMA2 stream configuration
const RX_STREAM: usize = 3;
const TX_STREAM: usize = 6;

const DMA_CR_EN: u32 = 1 << 0;
const DMA_CR_PFCTRL: u32 = 1 << 5;
const DMA_CR_DIR_M2P: u32 = 0b01 << 6;
const DMA_CR_MINC: u32 = 1 << 10;
const DMA_CR_PSIZE_WORD: u32 = 0b10 << 11;
const DMA_CR_MSIZE_WORD: u32 = 0b10 << 13;
const DMA_CR_PL_VERY_HIGH: u32 = 0b11 << 16;
const DMA_CR_PBURST_INCR4: u32 = 0b01 << 21;
const DMA_CR_MBURST_INCR4: u32 = 0b01 << 23;
const DMA_CR_CHSEL_4: u32 = 4 << 25;

const DMA_FCR_FTH_FULL: u32 = 0b11;
const DMA_FCR_DMDIS: u32 = 1 << 2;

/// Stream 3 flags in LIFCR.
const DMA_LIFCR_STREAM3: u32 = 0x0F40_0000;
/// Stream 6 flags in HIFCR.
const DMA_HIFCR_STREAM6: u32 = 0x003D_0000;

// Busy-wait limits, in loop iterations
const CMD_SPINS: u32 = 0x0010_0000;
const DMA_SPINS: u32 = 0x0001_0000;
/// Delay between ACMD41 polls.
const OP_COND_POLL_MS: u32 = 1;

/// Largest transfer in one DMA request. NDTR counts 32-bit words.
pub const MAX_BLOCKS: u32 = 0xFFFF * 4 / BLOCK_SIZE;

static SLOT: TransferSlot = TransferSlot::new();

/// Error type for `SdmmcCard` operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Card-detect reports an empty slot.
    NoCard,
    /// `init` has not completed successfully.
    NotInitialized,
    /// No response to a command.
    CommandTimeout,
    /// Response failed its CRC check.
    CommandCrc,
    /// R1 response with error bits set.
    CardStatus(u32),
    /// Card answered the identification sequence with something unsupported.
    UnsupportedCard,
    /// Kernel clock too fast to divide down to the identification clock.
    ClockTooFast,
    /// Buffer not word-aligned or shorter than the requested blocks.
    BadBuffer,
    /// More blocks than one DMA request can move.
    TransferTooLong,
}

/// Data bus width.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusWidth {
    One,
    Four,
}

/// Driver configuration.
#[derive(Copy, Clone, Debug)]
pub struct SdmmcConfig {
    /// SDMMC kernel clock (SYSCLK), in Hz.
    pub kernel_clock_hz: u32,
    pub bus_width: BusWidth,
}

impl Default for SdmmcConfig {
    /// HSI at reset, 4-bit bus.
    fn default() -> Self {
        Self {
            kernel_clock_hz: 16_000_000,
            bus_width: BusWidth::Four,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Response {
    None,
    Short,
    /// R3: the CRC field is all ones, so a CRC failure is expected.
    ShortNoCrc,
    Long,
}

/// Issue a command and wait for its response. Returns RESP1.
fn send_command(
    regs: &pac::sdmmc1::RegisterBlock,
    index: u8,
    arg: u32,
    resp: Response,
) -> Result<u32, Error> {
    regs.icr.write(|w| unsafe { w.bits(STA_CMD_FLAGS) });
    regs.arg.write(|w| unsafe { w.bits(arg) });

    let waitresp = match resp {
        Response::None => 0,
        Response::Short | Response::ShortNoCrc => CMD_WAITRESP_SHORT,
        Response::Long => CMD_WAITRESP_LONG,
    };
    regs.cmd
        .write(|w| unsafe { w.bits((index as u32 & 0x3F) | waitresp | CMD_CPSMEN) });

    for _ in 0..CMD_SPINS {
        let sta = regs.sta.read().bits();

        if resp == Response::None {
            if sta & STA_CMDSENT != 0 {
                regs.icr.write(|w| unsafe { w.bits(STA_CMD_FLAGS) });
                return Ok(0);
            }
            continue;
        }

        if sta & STA_CTIMEOUT != 0 {
            regs.icr.write(|w| unsafe { w.bits(STA_CMD_FLAGS) });
            return Err(Error::CommandTimeout);
        }
        if sta & STA_CCRCFAIL != 0 {
            regs.icr.write(|w| unsafe { w.bits(STA_CMD_FLAGS) });
            return match resp {
                Response::ShortNoCrc => Ok(regs.resp1.read().bits()),
                _ => Err(Error::CommandCrc),
            };
        }
        if sta & STA_CMDREND != 0 {
            regs.icr.write(|w| unsafe { w.bits(STA_CMD_FLAGS) });
            return Ok(regs.resp1.read().bits());
        }
    }

    Err(Error::CommandTimeout)
}

/// Issue a command with an R1 response and check its error bits.
fn send_r1(regs: &pac::sdmmc1::RegisterBlock, index: u8, arg: u32) -> Result<u32, Error> {
    let r1 = send_command(regs, index, arg, Response::Short)?;
    if r1 & protocol::R1_ERRORS != 0 {
        return Err(Error::CardStatus(r1));
    }
    Ok(r1)
}

fn clear_stream_flags(dma: &pac::dma2::RegisterBlock, stream: usize) {
    match stream {
        RX_STREAM => dma.lifcr.write(|w| unsafe { w.bits(DMA_LIFCR_STREAM3) }),
        TX_STREAM => dma.hifcr.write(|w| unsafe { w.bits(DMA_HIFCR_STREAM6) }),
        _ => {}
    }
}

/// Disable a stream and wait (bounded) for it to drain.
fn stop_stream(dma: &pac::dma2::RegisterBlock, stream: usize) {
    let st = &dma.st[stream];
    st.cr.modify(|r, w| unsafe { w.bits(r.bits() & !DMA_CR_EN) });
    for _ in 0..DMA_SPINS {
        if st.cr.read().bits() & DMA_CR_EN == 0 {
            break;
        }
    }
    clear_stream_flags(dma, stream);
}

/// Arm a stream between the SDMMC FIFO and `mem`.
fn start_stream(dma: &pac::dma2::RegisterBlock, stream: usize, dir_bits: u32, mem: u32, bytes: u32) {
    stop_stream(dma, stream);

    let fifo = unsafe { addr_of!((*pac::SDMMC1::ptr()).fifo) } as u32;
    let st = &dma.st[stream];

    st.par.write(|w| unsafe { w.bits(fifo) });
    st.m0ar.write(|w| unsafe { w.bits(mem) });
    // Ignored under peripheral flow control, but kept meaningful for debugging.
    st.ndtr.write(|w| unsafe { w.bits(bytes / 4) });
    st.fcr
        .write(|w| unsafe { w.bits(DMA_FCR_DMDIS | DMA_FCR_FTH_FULL) });
    st.cr.write(|w| unsafe {
        w.bits(
            DMA_CR_CHSEL_4
                | DMA_CR_MBURST_INCR4
                | DMA_CR_PBURST_INCR4
                | DMA_CR_PL_VERY_HIGH
                | DMA_CR_MSIZE_WORD
                | DMA_CR_PSIZE_WORD
                | DMA_CR_MINC
                | DMA_CR_PFCTRL
                | dir_bits,
        )
    });
    st.cr.modify(|r, w| unsafe { w.bits(r.bits() | DMA_CR_EN) });
}

/// Stop the data state machine and mask its interrupts.
fn quiesce(regs: &pac::sdmmc1::RegisterBlock) {
    regs.mask.write(|w| unsafe { w.bits(0) });
    regs.dctrl.write(|w| unsafe { w.bits(0) });
    regs.icr.write(|w| unsafe { w.bits(ICR_STATIC) });
}

/// Tear down `transfer` after it ended, failed or was abandoned.
fn stop_data_path(
    regs: &pac::sdmmc1::RegisterBlock,
    dma: &pac::dma2::RegisterBlock,
    transfer: Transfer,
) {
    quiesce(regs);
    stop_stream(
        dma,
        match transfer.dir {
            Direction::Read => RX_STREAM,
            Direction::Write => TX_STREAM,
        },
    );

    if transfer.multi_block {
        // Open-ended transfers have to be stopped explicitly.
        let _ = send_command(regs, cmd::STOP_TRANSMISSION, 0, Response::Short);
    }
}

/// SDMMC1 interrupt body.
///
/// On DATAEND the transfer is closed and the matching completion latch is set. On a data error
/// the transfer is closed without signalling, so the waiting caller times out.
pub fn on_interrupt(events: &TransferEvents) {
    let regs = unsafe { &*pac::SDMMC1::ptr() };
    let dma = unsafe { &*pac::DMA2::ptr() };
    let sta = regs.sta.read().bits();

    let failed = sta & STA_DATA_ERRORS != 0;
    if !failed && sta & STA_DATAEND == 0 {
        return;
    }

    quiesce(regs);
    let Some(transfer) = SLOT.release() else {
        return;
    };
    stop_data_path(regs, dma, transfer);

    if !failed {
        // DMA writes to the buffer happen-before the latch is observed.
        fence(Ordering::SeqCst);
        events.flag(transfer.dir).signal();
    }
}

/// SD card on SDMMC1.
pub struct SdmmcCard<'a, D = AlwaysPresent> {
    sdmmc: pac::SDMMC1,
    dma: pac::DMA2,
    detect: D,
    /// Latches the `SDMMC1` handler signals.
    events: &'a TransferEvents,
    config: SdmmcConfig,

    rca: u16,
    high_capacity: bool,
    /// Geometry of the card brought up by the last successful `init`.
    info: Option<CardInfo>,
}

impl<'a, D: DetectPin> SdmmcCard<'a, D> {
    /// Take ownership of SDMMC1 and DMA2 and enable their clocks. The card is not touched until
    /// [`Medium::init`].
    pub fn new(
        sdmmc: pac::SDMMC1,
        dma: pac::DMA2,
        detect: D,
        events: &'a TransferEvents,
        config: SdmmcConfig,
    ) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.sdmmc1en().set_bit());
        rcc.ahb1enr.modify(|_, w| w.dma2en().set_bit());

        // SDMMC1SEL = SYSCLK
        rcc.dckcfgr2
            .modify(|r, w| unsafe { w.bits(r.bits() | (1 << 28)) });

        sdmmc.power.write(|w| unsafe { w.bits(0) });

        Self {
            sdmmc,
            dma,
            detect,
            events,
            config,
            rca: 0,
            high_capacity: false,
            info: None,
        }
    }

    /// Power the card down and release the peripherals.
    pub fn free(self) -> (pac::SDMMC1, pac::DMA2, D) {
        self.abandon();
        self.sdmmc.power.write(|w| unsafe { w.bits(0) });
        (self.sdmmc, self.dma, self.detect)
    }

    /// SDHC/SDXC (block addressed) rather than SDSC. Meaningful after a successful `init`.
    #[inline]
    pub fn is_high_capacity(&self) -> bool {
        self.high_capacity
    }

    fn delay_ms(&self, ms: u32) {
        cortex_m::asm::delay(self.config.kernel_clock_hz / 1_000 * ms);
    }

    /// Identification at <= 400 kHz, then switch to the data clock and bus width.
    fn identify(&mut self) -> Result<CardInfo, Error> {
        let regs = &*self.sdmmc;
        let kernel_hz = self.config.kernel_clock_hz;
        let init_div = protocol::clock_divider(kernel_hz, protocol::IDENT_CLOCK_HZ)
            .ok_or(Error::ClockTooFast)?;
        let data_div = protocol::clock_divider(kernel_hz, protocol::DATA_CLOCK_HZ)
            .ok_or(Error::ClockTooFast)?;

        regs.power.write(|w| unsafe { w.bits(0) });
        regs.clkcr
            .write(|w| unsafe { w.bits(init_div | CLKCR_CLKEN) });
        regs.power.write(|w| unsafe { w.bits(POWER_ON) });
        // At least 74 card clocks before the first command
        self.delay_ms(2);

        send_command(regs, cmd::GO_IDLE_STATE, 0, Response::None)?;

        let if_cond = send_command(
            regs,
            cmd::SEND_IF_COND,
            protocol::IF_COND_CHECK,
            Response::Short,
        );
        let v2 = match if_cond {
            Ok(r7) if protocol::if_cond_accepted(r7) => true,
            Ok(_) => return Err(Error::UnsupportedCard),
            // Version 1.x cards do not know CMD8
            Err(Error::CommandTimeout) => false,
            Err(e) => return Err(e),
        };

        let mut ocr = Ocr(0);
        for _ in 0..protocol::op_cond_attempts(OP_COND_POLL_MS) {
            send_command(regs, cmd::APP_CMD, 0, Response::Short)?;
            ocr = Ocr(send_command(
                regs,
                cmd::SD_SEND_OP_COND,
                Ocr::request(v2),
                Response::ShortNoCrc,
            )?);
            if ocr.is_ready() {
                break;
            }
            self.delay_ms(OP_COND_POLL_MS);
        }
        if !ocr.is_ready() {
            return Err(Error::UnsupportedCard);
        }
        self.high_capacity = ocr.is_high_capacity();

        send_command(regs, cmd::ALL_SEND_CID, 0, Response::Long)?;
        let r6 = send_command(regs, cmd::SEND_RELATIVE_ADDR, 0, Response::Short)?;
        self.rca = protocol::rca_from_r6(r6);
        let rca_arg = (self.rca as u32) << 16;

        let resp1 = send_command(regs, cmd::SEND_CSD, rca_arg, Response::Long)?;
        let csd = Csd::from_words([
            resp1,
            regs.resp2.read().bits(),
            regs.resp3.read().bits(),
            regs.resp4.read().bits(),
        ]);
        let info = csd.card_info().ok_or(Error::UnsupportedCard)?;

        send_r1(regs, cmd::SELECT_CARD, rca_arg)?;
        if !self.high_capacity {
            send_r1(regs, cmd::SET_BLOCKLEN, BLOCK_SIZE)?;
        }

        let mut clkcr = data_div | CLKCR_CLKEN | CLKCR_PWRSAV;
        if self.config.bus_width == BusWidth::Four {
            send_r1(regs, cmd::APP_CMD, rca_arg)?;
            send_r1(regs, cmd::SET_BUS_WIDTH, 0b10)?;
            clkcr |= CLKCR_WIDBUS_4;
        }
        regs.clkcr.write(|w| unsafe { w.bits(clkcr) });

        Ok(info)
    }

    /// Tear down whatever is in flight, without arming anything new.
    fn abandon(&self) {
        let (regs, dma) = (&*self.sdmmc, &*self.dma);
        interrupt::free(|_| {
            quiesce(regs);
            if let Some(stale) = SLOT.release() {
                stop_data_path(regs, dma, stale);
            }
        });
    }

    fn start(
        &mut self,
        dir: Direction,
        mem: u32,
        buf_len: usize,
        block: u32,
        count: u32,
    ) -> Result<(), Error> {
        if self.info.is_none() {
            return Err(Error::NotInitialized);
        }
        if count == 0 || count > MAX_BLOCKS {
            return Err(Error::TransferTooLong);
        }
        let bytes = count * BLOCK_SIZE;
        if mem % 4 != 0 || buf_len < bytes as usize {
            return Err(Error::BadBuffer);
        }

        let (regs, dma, events) = (&*self.sdmmc, &*self.dma, self.events);
        let transfer = Transfer::new(dir, count);

        // No completion may land between dropping the old transfer and clearing the new latch.
        interrupt::free(|_| {
            quiesce(regs);
            if let Some(stale) = SLOT.claim(events, transfer) {
                stop_data_path(regs, dma, stale);
            }
        });

        let addr = protocol::data_address(block, self.high_capacity, BLOCK_SIZE);
        // Buffer contents are settled before the DMA engine sees them.
        fence(Ordering::SeqCst);

        let issued = match dir {
            Direction::Read => {
                start_stream(dma, RX_STREAM, 0, mem, bytes);
                regs.dtimer.write(|w| unsafe { w.bits(DATA_TIMEOUT_CYCLES) });
                regs.dlen.write(|w| unsafe { w.bits(bytes) });
                regs.mask.write(|w| unsafe { w.bits(MASK_DATA) });
                regs.dctrl.write(|w| unsafe {
                    w.bits(DCTRL_DBLOCKSIZE_512 | DCTRL_DTDIR_READ | DCTRL_DMAEN | DCTRL_DTEN)
                });

                let index = if transfer.multi_block {
                    cmd::READ_MULTIPLE_BLOCK
                } else {
                    cmd::READ_SINGLE_BLOCK
                };
                send_r1(regs, index, addr)
            }
            Direction::Write => {
                let index = if transfer.multi_block {
                    cmd::WRITE_MULTIPLE_BLOCK
                } else {
                    cmd::WRITE_BLOCK
                };
                send_r1(regs, index, addr).map(|_| {
                    start_stream(dma, TX_STREAM, DMA_CR_DIR_M2P, mem, bytes);
                    regs.dtimer.write(|w| unsafe { w.bits(DATA_TIMEOUT_CYCLES) });
                    regs.dlen.write(|w| unsafe { w.bits(bytes) });
                    regs.mask.write(|w| unsafe { w.bits(MASK_DATA) });
                    regs.dctrl.write(|w| unsafe {
                        w.bits(DCTRL_DBLOCKSIZE_512 | DCTRL_DMAEN | DCTRL_DTEN)
                    });
                })
            }
        };

        if let Err(e) = issued {
            self.abandon();
            return Err(e);
        }
        Ok(())
    }
}

impl<D: DetectPin> Medium for SdmmcCard<'_, D> {
    type Error = Error;

    fn card_state(&mut self) -> Result<CardState, Error> {
        if self.info.is_none() {
            return Err(Error::NotInitialized);
        }
        let r1 = send_command(
            &self.sdmmc,
            cmd::SEND_STATUS,
            (self.rca as u32) << 16,
            Response::Short,
        )?;
        Ok(CardState::from_r1(r1))
    }

    fn card_info(&mut self) -> CardInfo {
        self.info.unwrap_or(CardInfo {
            block_count: 0,
            block_size: BLOCK_SIZE,
            erase_block_size: 1,
        })
    }

    fn read_blocks_async(&mut self, buf: &mut [u8], start_block: u32, count: u32) -> Result<(), Error> {
        let mem = buf.as_mut_ptr() as u32;
        self.start(Direction::Read, mem, buf.len(), start_block, count)
    }

    fn write_blocks_async(&mut self, buf: &[u8], start_block: u32, count: u32) -> Result<(), Error> {
        let mem = buf.as_ptr() as u32;
        self.start(Direction::Write, mem, buf.len(), start_block, count)
    }

    fn init(&mut self) -> Result<(), Error> {
        self.info = None;
        if !self.detect.is_inserted() {
            return Err(Error::NoCard);
        }

        self.abandon();
        let info = self.identify()?;
        self.info = Some(info);
        Ok(())
    }

    fn max_blocks(&self) -> u32 {
        MAX_BLOCKS
    }

    fn is_detected(&mut self) -> bool {
        self.detect.is_inserted()
    }
}
