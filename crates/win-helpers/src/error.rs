use std::string::FromUtf16Error;

use thiserror::Error;
use windows::Win32::Foundation::{E_INVALIDARG, E_POINTER, WIN32_ERROR};
use windows::core::HRESULT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Win32(#[from] windows::core::Error),
    #[error("null pointer: {0}")]
    NullPointer(&'static str),
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
}

impl Error {
    pub fn code(&self) -> i32 {
        match self {
            Error::Win32(err) => err.code().0,
            Error::NullPointer(_) => E_POINTER.0,
            Error::InvalidData(_) => E_INVALIDARG.0,
        }
    }

    /// Builds an error from the calling thread's last-error code.
    pub fn last_error() -> Self {
        Self::Win32(windows::core::Error::from_win32())
    }

    pub fn from_hresult(hresult: HRESULT) -> Self {
        Self::Win32(windows::core::Error::from_hresult(hresult))
    }

    pub fn from_win32(win32_error: WIN32_ERROR) -> Self {
        Self::from_hresult(HRESULT::from_win32(win32_error.0))
    }
}

impl From<HRESULT> for Error {
    fn from(err: HRESULT) -> Self {
        Self::from_hresult(err)
    }
}

impl From<WIN32_ERROR> for Error {
    fn from(err: WIN32_ERROR) -> Self {
        Self::from_win32(err)
    }
}

impl From<FromUtf16Error> for Error {
    fn from(err: FromUtf16Error) -> Self {
        Self::Win32(windows::core::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Win32(windows::core::Error::from(err))
    }
}
