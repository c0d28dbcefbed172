use tracing::warn;
use windows::Win32::Foundation::{GlobalFree, HANDLE, HGLOBAL, HWND};
use windows::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, GetClipboardData, IsClipboardFormatAvailable, OpenClipboard, SetClipboardData,
};
use windows::Win32::System::Memory::{GMEM_MOVEABLE, GMEM_ZEROINIT, GlobalAlloc, GlobalLock, GlobalSize, GlobalUnlock};
use windows::Win32::System::Ole::CF_UNICODETEXT;

use crate::Error;
use crate::str::nul_slice_wide_str;

/// The clipboard, opened for the lifetime of the value.
struct OpenedClipboard;

impl OpenedClipboard {
    fn open(owner: Option<HWND>) -> anyhow::Result<Self> {
        // SAFETY: FFI call with no outstanding precondition.
        unsafe { OpenClipboard(owner) }?;
        Ok(Self)
    }
}

impl Drop for OpenedClipboard {
    fn drop(&mut self) {
        // SAFETY: The clipboard was opened by this thread in `open`.
        if let Err(error) = unsafe { CloseClipboard() } {
            warn!(%error, "Failed to close the clipboard");
        }
    }
}

/// Movable global memory block, freed on drop unless ownership was handed over.
struct GlobalMemory(HGLOBAL);

impl GlobalMemory {
    /// Copies `data` into a new block.
    ///
    /// A zero-byte movable block is discarded and cannot be locked, so empty data gets a one-byte
    /// zeroed block.
    fn with_data(data: &[u8]) -> anyhow::Result<Self> {
        // SAFETY: FFI call with no outstanding precondition.
        let memory = Self(unsafe { GlobalAlloc(GMEM_MOVEABLE | GMEM_ZEROINIT, data.len().max(1)) }?);

        // SAFETY: `memory.0` is a valid movable block.
        let ptr = unsafe { GlobalLock(memory.0) };

        if ptr.is_null() {
            return Err(Error::last_error().into());
        }

        // SAFETY: The block is locked and at least `data.len()` bytes long. A fresh allocation cannot overlap `data`.
        unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len()) };

        // Unlocking the last lock reports a failure with NO_ERROR.
        // SAFETY: The block was locked above.
        let _ = unsafe { GlobalUnlock(memory.0) };

        Ok(memory)
    }

    /// Gives up ownership of the block, which now belongs to the system.
    fn into_raw(self) -> HGLOBAL {
        let handle = self.0;
        core::mem::forget(self);
        handle
    }
}

impl Drop for GlobalMemory {
    fn drop(&mut self) {
        // SAFETY: The block is owned by us and not used past this point.
        if let Err(error) = unsafe { GlobalFree(Some(self.0)) } {
            warn!(%error, "Failed to free a global memory block");
        }
    }
}

/// Replaces the clipboard content with `data` in the clipboard `format`.
///
/// Empty data is stored as a single zero byte.
///
/// `owner` becomes the clipboard owner. With `None`, the clipboard is associated with the current task.
pub fn copy_to_clipboard(owner: Option<HWND>, data: &[u8], format: u32) -> anyhow::Result<()> {
    let memory = GlobalMemory::with_data(data)?;

    let _clipboard = OpenedClipboard::open(owner)?;

    // SAFETY: The clipboard is open.
    unsafe { EmptyClipboard() }?;

    // SAFETY: The clipboard is open and `memory` holds a valid movable block.
    unsafe { SetClipboardData(format, Some(HANDLE(memory.0.0))) }?;

    // On success the system owns the memory.
    let _ = memory.into_raw();

    Ok(())
}

/// Replaces the clipboard content with `text`, as `CF_UNICODETEXT`.
pub fn copy_text_to_clipboard(owner: Option<HWND>, text: &str) -> anyhow::Result<()> {
    let data: Vec<u8> = text
        .encode_utf16()
        .chain(core::iter::once(0))
        .flat_map(u16::to_ne_bytes)
        .collect();

    copy_to_clipboard(owner, &data, u32::from(CF_UNICODETEXT.0))
}

/// Reads the `CF_UNICODETEXT` content of the clipboard, `None` when the clipboard holds no text.
pub fn get_clipboard_text(owner: Option<HWND>) -> anyhow::Result<Option<String>> {
    let format = u32::from(CF_UNICODETEXT.0);

    // SAFETY: FFI call with no outstanding precondition.
    if unsafe { IsClipboardFormatAvailable(format) }.is_err() {
        return Ok(None);
    }

    let _clipboard = OpenedClipboard::open(owner)?;

    // SAFETY: The clipboard is open. The returned handle is owned by the system.
    let handle = unsafe { GetClipboardData(format) }?;
    let memory = HGLOBAL(handle.0);

    // SAFETY: `memory` is a valid global memory block while the clipboard is open.
    let size = unsafe { GlobalSize(memory) };

    // SAFETY: Same as above.
    let ptr = unsafe { GlobalLock(memory) };

    if ptr.is_null() {
        return Err(Error::last_error().into());
    }

    // SAFETY: The block is locked, `size` bytes long and suitably aligned for `u16`.
    let units = unsafe { core::slice::from_raw_parts(ptr.cast::<u16>(), size / 2) };
    let text = String::from_utf16(nul_slice_wide_str(units));

    // SAFETY: The block was locked above and `units` is not used past this point.
    let _ = unsafe { GlobalUnlock(memory) };

    Ok(Some(text?))
}

/// Serializes tests touching the clipboard, which is shared by the whole session.
#[cfg(test)]
pub(crate) static CLIPBOARD_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
