use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Threading::{OpenMutexW, SYNCHRONIZATION_SYNCHRONIZE};
use windows::core::Owned;

use crate::str::{U16CStrExt as _, to_wide_nul};

/// Returns true when a named mutex called `name` exists and can be opened for synchronization.
///
/// Typically used to detect a running instance of an application holding a well-known mutex.
pub fn mutex_exists(name: &str) -> bool {
    let Ok(name) = to_wide_nul(name) else {
        return false;
    };

    // SAFETY: `name` is a valid NUL-terminated string.
    match unsafe { OpenMutexW(SYNCHRONIZATION_SYNCHRONIZE, false, name.as_pcwstr()) } {
        Ok(handle) => {
            // SAFETY: `OpenMutexW` succeeded, the handle is owned by us and closed right away.
            drop(unsafe { Owned::<HANDLE>::new(handle) });
            true
        }
        Err(_) => false,
    }
}
