//! COM GUID parsing.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuidError {
    #[error("GUID must be enclosed in braces: {{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}}")]
    MissingBraces,
    #[error("GUID must hold 36 characters between braces, got {0}")]
    InvalidLength(usize),
    #[error("invalid GUID")]
    Invalid(#[from] uuid::Error),
}

/// Parses a GUID in the registry format, `{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}`.
///
/// This is the only format accepted by `IIDFromString`.
pub fn parse_guid(s: &str) -> Result<Uuid, GuidError> {
    let inner = s
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or(GuidError::MissingBraces)?;

    // `Uuid::try_parse` also accepts the simple (non-hyphenated) form.
    if inner.len() != 36 {
        return Err(GuidError::InvalidLength(inner.len()));
    }

    Ok(Uuid::try_parse(inner)?)
}

/// Parses `s` like [`parse_guid`], returning the nil GUID (`GUID_NULL`) when `s` is invalid.
pub fn guid_or_nil(s: &str) -> Uuid {
    parse_guid(s).unwrap_or_else(|_| Uuid::nil())
}

#[cfg(target_os = "windows")]
pub use self::win_ext::*;

#[cfg(target_os = "windows")]
mod win_ext {
    use anyhow::Context as _;
    use uuid::Uuid;
    use windows::Win32::System::Com::IIDFromString;
    use windows::core::GUID;

    use crate::str::{U16CStrExt as _, to_wide_nul};

    pub fn to_windows_guid(uuid: &Uuid) -> GUID {
        GUID::from_u128(uuid.as_u128())
    }

    pub fn from_windows_guid(guid: &GUID) -> Uuid {
        Uuid::from_u128(guid.to_u128())
    }

    /// Parses `s` with `IIDFromString`.
    pub fn create_guid(s: &str) -> anyhow::Result<GUID> {
        let s = to_wide_nul(s).context("GUID string contains a NUL")?;

        // SAFETY: `s` is a valid NUL-terminated wide string.
        let guid = unsafe { IIDFromString(s.as_pcwstr()) }?;

        Ok(guid)
    }
}
