//! Helpers and thin RAII wrappers around the Windows shell, device and registry APIs.
//!
//! Buffer layouts handed over by the OS (multi-strings, `DROPFILES`, storage descriptors, disk
//! extents) are decoded by portable code so it can be exercised on any host. The modules calling
//! into Win32 are only compiled on Windows.

pub mod drop_files;
pub mod environment;
pub mod guid;
pub mod image;
pub mod multi_sz;
pub mod path;
pub mod raw_buffer;
pub mod storage;
pub mod str;
pub mod strings;
pub mod timing;

#[cfg(target_os = "windows")]
#[path = ""]
mod lib_win {
    mod error;

    pub mod clipboard;
    pub mod com;
    pub mod device;
    pub mod menu;
    pub mod registry;
    pub mod resource;
    pub mod sync;

    #[rustfmt::skip]
    pub use windows as raw;
    #[rustfmt::skip]
    pub use error::Error;
}

#[cfg(target_os = "windows")]
#[rustfmt::skip]
pub use lib_win::*;
