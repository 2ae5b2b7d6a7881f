// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Debug console on a USART.
//!
//! Transmit-only. Besides plain strings it knows how to report disk results and dump sectors, which
//! is all the firmware needs to show what the card is doing.
//!
//! Lines end in CRLF. On the host, attach with
//! ```text
//! $ screen /dev/tty.usbmodem* 115200
//! ```

use core::fmt::{self, Write};
use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{Instance, Pins, Serial, Tx},
};

use crate::diskio::{DiskError, IoctlValue, Status};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

pub struct Console<U: Instance> {
    tx: Tx<U>,
}

impl<U: Instance> Console<U> {
    /// Keep the transmit half of `serial`; the receiver is dropped.
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, _rx) = serial.split();
        Self { tx }
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        let _ = block!(self.tx.write(b));
    }

    pub fn write_str(&mut self, s: &str) {
        s.bytes().for_each(|b| self.write_byte(b));
    }

    #[inline]
    pub fn println(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    #[inline]
    pub fn flush(&mut self) {
        let _ = block!(self.tx.flush());
    }

    fn hex_u8(&mut self, n: u8) {
        self.write_byte(HEX[(n >> 4) as usize]);
        self.write_byte(HEX[(n & 0xF) as usize]);
    }

    /// `label: OK` or `label: <error>`.
    pub fn report<T>(&mut self, label: &str, res: &Result<T, DiskError>) {
        let _ = match res {
            Ok(_) => write!(self, "{}: OK\r\n", label),
            Err(e) => write!(self, "{}: {:?} (code {})\r\n", label, e, e.code()),
        };
    }

    /// Disk status flags by name.
    pub fn report_status(&mut self, label: &str, status: Status) {
        let _ = write!(self, "{}: 0x{:02X}", label, status.raw());
        if status.is_ready() {
            self.write_str(" ready");
        }
        for (name, _) in status.iter_names() {
            self.write_byte(b' ');
            self.write_str(name);
        }
        self.write_str("\r\n");
    }

    pub fn report_ioctl(&mut self, label: &str, res: &Result<IoctlValue, DiskError>) {
        match res.map(IoctlValue::as_u32) {
            Ok(Some(v)) => {
                let _ = write!(self, "{}: {}\r\n", label, v);
            }
            _ => self.report(label, res),
        }
    }

    /// Classic 16-bytes-per-row hex dump, offsets relative to `base`.
    pub fn hex_dump(&mut self, base: u32, data: &[u8]) {
        for (row, chunk) in data.chunks(16).enumerate() {
            let _ = write!(self, "{:08X}:", base + (row * 16) as u32);
            for &b in chunk {
                self.write_byte(b' ');
                self.hex_u8(b);
            }
            self.write_str("\r\n");
        }
    }
}

impl<U: Instance> fmt::Write for Console<U> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Console::write_str(self, s);
        Ok(())
    }
}
