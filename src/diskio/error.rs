// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Adapter errors and their FatFs `DRESULT` codes.

use core::fmt;

use crate::sync::TimedOut;

/// FatFs `DRESULT` codes, for handing results to a C filesystem layer unchanged.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DResult {
    Ok = 0,
    Error = 1,
    WriteProtected = 2,
    NotReady = 3,
    ParameterError = 4,
}

impl fmt::Display for DResult {
    /// The numeric code, as a C caller would see it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Error type for block device operations.
///
/// No operation retries internally; the caller decides whether `Timeout` or `InitiationFailed` is
/// worth another attempt, while `NotReady` needs the drive to be initialized first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiskError {
    /// Medium absent or drive not initialized.
    NotReady,
    /// The medium refused to start the transfer. Nothing was waited for.
    InitiationFailed,
    /// Completion or the return to transfer state did not happen in time. Part of the range may
    /// have been transferred.
    Timeout,
    /// Unknown ioctl, zero-length transfer or undersized buffer.
    ParameterError,
}

impl DiskError {
    /// Matching `DRESULT` code.
    pub fn code(self) -> DResult {
        match self {
            DiskError::NotReady => DResult::NotReady,
            DiskError::InitiationFailed | DiskError::Timeout => DResult::Error,
            DiskError::ParameterError => DResult::ParameterError,
        }
    }
}

impl From<TimedOut> for DiskError {
    fn from(_: TimedOut) -> Self {
        DiskError::Timeout
    }
}

/// Collapse an adapter result into a `DRESULT` code.
pub fn to_dresult<T>(res: &Result<T, DiskError>) -> DResult {
    match res {
        Ok(_) => DResult::Ok,
        Err(e) => e.code(),
    }
}
