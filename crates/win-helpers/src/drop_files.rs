//! Shell drag-and-drop payloads (`CF_HDROP`).
//!
//! A `CF_HDROP` global memory block starts with a `DROPFILES` header followed, at `pFiles`, by a
//! multi-string holding the full path of every dropped item.

use crate::multi_sz::{self, MultiSzError};

/// `size_of::<DROPFILES>()`.
pub const DROPFILES_HEADER_LEN: usize = 20;

const FILES_OFFSET: usize = 0;
const POINT_X_OFFSET: usize = 4;
const POINT_Y_OFFSET: usize = 8;
const NON_CLIENT_OFFSET: usize = 12;
const WIDE_OFFSET: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropFilesError {
    #[error("DROPFILES block is too short: {len} bytes")]
    Truncated { len: usize },
    #[error("file list offset {offset} is outside of the {len}-byte block")]
    OffsetOutOfBounds { offset: usize, len: usize },
    #[error("invalid file list")]
    InvalidList(#[from] MultiSzError),
}

/// Decoded `DROPFILES` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropFiles {
    point: (i32, i32),
    non_client: bool,
    wide: bool,
    items: Vec<String>,
}

impl DropFiles {
    pub fn parse(bytes: &[u8]) -> Result<Self, DropFilesError> {
        let header = bytes
            .get(..DROPFILES_HEADER_LEN)
            .ok_or(DropFilesError::Truncated { len: bytes.len() })?;

        let files_offset = read_u32(header, FILES_OFFSET);
        let files_offset = usize::try_from(files_offset).unwrap_or(usize::MAX);

        if files_offset < DROPFILES_HEADER_LEN || files_offset > bytes.len() {
            return Err(DropFilesError::OffsetOutOfBounds {
                offset: files_offset,
                len: bytes.len(),
            });
        }

        let wide = read_u32(header, WIDE_OFFSET) != 0;
        let list = &bytes[files_offset..];

        let items = if wide {
            // A trailing odd byte cannot be part of a character.
            let units: Vec<u16> = list
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();

            multi_sz::to_strings_wide(&units)?
        } else {
            multi_sz::to_strings_ansi(list)
        };

        Ok(Self {
            point: (read_i32(header, POINT_X_OFFSET), read_i32(header, POINT_Y_OFFSET)),
            non_client: read_u32(header, NON_CLIENT_OFFSET) != 0,
            wide,
            items,
        })
    }

    /// Drop point, in client or screen coordinates depending on [`DropFiles::is_non_client`].
    pub fn point(&self) -> (i32, i32) {
        self.point
    }

    pub fn is_non_client(&self) -> bool {
        self.non_client
    }

    pub fn is_wide(&self) -> bool {
        self.wide
    }

    pub fn is_multi_items(&self) -> bool {
        self.items.len() > 1
    }

    pub fn first_item(&self) -> Option<&str> {
        self.items.first().map(String::as_str)
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }
}

fn read_u32(header: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&header[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

fn read_i32(header: &[u8], offset: usize) -> i32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&header[offset..offset + 4]);
    i32::from_le_bytes(raw)
}

#[cfg(target_os = "windows")]
pub use self::win_ext::*;

#[cfg(target_os = "windows")]
mod win_ext {
    use std::slice;

    use windows::Win32::System::Com::{DVASPECT_CONTENT, FORMATETC, IDataObject, STGMEDIUM, TYMED_HGLOBAL};
    use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};
    use windows::Win32::System::Ole::{CF_HDROP, ReleaseStgMedium};

    use super::DropFiles;
    use crate::Error;

    /// File list of a shell data object, kept alive until unloaded.
    #[derive(Default)]
    pub struct DropFilesList {
        loaded: Option<(STGMEDIUM, DropFiles)>,
    }

    impl DropFilesList {
        pub fn new() -> Self {
            Self::default()
        }

        /// Retrieves the `CF_HDROP` data of `data_object`, releasing any previously loaded list.
        pub fn load(&mut self, data_object: &IDataObject) -> anyhow::Result<()> {
            self.unload();

            #[allow(clippy::cast_sign_loss)]
            let format = FORMATETC {
                cfFormat: CF_HDROP.0,
                ptd: core::ptr::null_mut(),
                dwAspect: DVASPECT_CONTENT.0,
                lindex: -1,
                tymed: TYMED_HGLOBAL.0 as u32,
            };

            // SAFETY: `format` is a valid FORMATETC. On success, the medium is owned by us and released in `unload`.
            let mut medium = unsafe { data_object.GetData(&format) }?;

            match read_medium(&medium) {
                Ok(files) => {
                    self.loaded = Some((medium, files));
                    Ok(())
                }
                Err(error) => {
                    // SAFETY: The medium was returned by `GetData` and is not used past this point.
                    unsafe { ReleaseStgMedium(&mut medium) };
                    Err(error)
                }
            }
        }

        pub fn unload(&mut self) {
            if let Some((mut medium, _)) = self.loaded.take() {
                // SAFETY: The medium was returned by `GetData` and is released only once.
                unsafe { ReleaseStgMedium(&mut medium) };
            }
        }

        pub fn is_loaded(&self) -> bool {
            self.loaded.is_some()
        }

        pub fn files(&self) -> Option<&DropFiles> {
            self.loaded.as_ref().map(|(_, files)| files)
        }

        pub fn is_multi_items(&self) -> bool {
            self.files().is_some_and(DropFiles::is_multi_items)
        }

        pub fn first_item(&self) -> Option<&str> {
            self.files().and_then(DropFiles::first_item)
        }

        pub fn items(&self) -> &[String] {
            self.files().map(DropFiles::items).unwrap_or_default()
        }
    }

    impl Drop for DropFilesList {
        fn drop(&mut self) {
            self.unload();
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn read_medium(medium: &STGMEDIUM) -> anyhow::Result<DropFiles> {
        if medium.tymed != TYMED_HGLOBAL.0 as u32 {
            anyhow::bail!(Error::InvalidData("CF_HDROP medium is not a global memory block"));
        }

        // SAFETY: `tymed` is `TYMED_HGLOBAL`, so `hGlobal` is the active field.
        let hglobal = unsafe { medium.u.hGlobal };

        // SAFETY: `hglobal` is a valid global memory handle owned by the medium.
        let size = unsafe { GlobalSize(hglobal) };

        // SAFETY: Same as above.
        let ptr = unsafe { GlobalLock(hglobal) };

        if ptr.is_null() {
            return Err(Error::last_error().into());
        }

        // SAFETY: The block is locked and `GlobalSize` bytes long.
        let bytes = unsafe { slice::from_raw_parts(ptr.cast::<u8>(), size) };
        let files = DropFiles::parse(bytes);

        // Unlocking the last lock reports a failure with NO_ERROR.
        // SAFETY: `hglobal` was locked above and `bytes` is not used past this point.
        let _ = unsafe { GlobalUnlock(hglobal) };

        Ok(files?)
    }
}
