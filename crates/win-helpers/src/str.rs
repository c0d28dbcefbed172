//! Wide string helpers.

// Re-export relevant items from the widestring crate.
pub use widestring::{U16CStr, U16CString, U16Str, U16String, u16cstr, u16str};

/// Returns the part of `slice` located before the first NUL unit, or the whole slice if there is none.
pub fn nul_slice_wide_str(slice: &[u16]) -> &[u16] {
    let end = slice.iter().position(|&unit| unit == 0).unwrap_or(slice.len());
    &slice[..end]
}

/// Same as [`nul_slice_wide_str`], for byte strings.
pub fn nul_slice_str(slice: &[u8]) -> &[u8] {
    let end = slice.iter().position(|&unit| unit == 0).unwrap_or(slice.len());
    &slice[..end]
}

/// Encodes `s` as a NUL-terminated UTF-16 buffer.
///
/// Fails if `s` contains an interior NUL, which would silently truncate the string on the OS side.
pub fn to_wide_nul(s: &str) -> Result<U16CString, widestring::error::ContainsNul<u16>> {
    U16CString::from_str(s)
}

#[cfg(target_os = "windows")]
pub use self::win_ext::*;

#[cfg(target_os = "windows")]
mod win_ext {
    use windows::core::{PCWSTR, PWSTR};

    use super::U16CStr;

    pub trait U16CStrExt {
        /// # Safety
        ///
        /// This function is unsafe as there is no guarantee that the given pointer is valid or
        /// has a nul terminator, and the function could scan past the underlying buffer.
        ///
        /// # Panics
        ///
        /// This function panics if `ptr` is null.
        ///
        /// # Caveat
        ///
        /// The lifetime for the returned string is inferred from its usage. Tie it to the owner of
        /// the memory, such as the RAII wrapper freeing it.
        unsafe fn from_pcwstr<'a>(ptr: PCWSTR) -> &'a U16CStr;

        fn as_pcwstr(&self) -> PCWSTR;

        /// Returns a mutable pointer for APIs declaring a `PWSTR` they never write through.
        fn as_pwstr_unchecked(&self) -> PWSTR;
    }

    impl U16CStrExt for U16CStr {
        unsafe fn from_pcwstr<'a>(ptr: PCWSTR) -> &'a U16CStr {
            // SAFETY: Same safety invariants as the function itself.
            unsafe { U16CStr::from_ptr_str(ptr.as_ptr()) }
        }

        fn as_pcwstr(&self) -> PCWSTR {
            PCWSTR(self.as_ptr())
        }

        fn as_pwstr_unchecked(&self) -> PWSTR {
            PWSTR(self.as_ptr().cast_mut())
        }
    }
}
