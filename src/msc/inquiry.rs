// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SCSI standard INQUIRY data for the SD card LUN.

/// Length of the standard INQUIRY response.
pub const STANDARD_INQUIRY_DATA_LEN: usize = 36;

/// Standard INQUIRY response for LUN 0.
pub const INQUIRY_DATA: [u8; STANDARD_INQUIRY_DATA_LEN] = [
    0x00, // direct-access block device
    0x80, // removable medium
    0x02, // SPC-2
    0x02, // response data format
    (STANDARD_INQUIRY_DATA_LEN - 5) as u8,
    0x00,
    0x00,
    0x00,
    // Vendor: 8 bytes
    b'S', b'T', b'M', b' ', b' ', b' ', b' ', b' ',
    // Product: 16 bytes
    b'P', b'r', b'o', b'd', b'u', b'c', b't', b' ',
    b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ',
    // Revision: 4 bytes
    b'0', b'.', b'0', b'1',
];
