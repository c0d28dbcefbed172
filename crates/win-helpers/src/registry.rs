use std::string::FromUtf16Error;

use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS, WIN32_ERROR};
use windows::Win32::System::Registry::{
    HKEY, KEY_READ, REG_EXPAND_SZ, REG_MULTI_SZ, REG_ROUTINE_FLAGS, REG_SZ, REG_VALUE_TYPE, RRF_NOEXPAND, RRF_RT_ANY,
    RRF_RT_REG_EXPAND_SZ, RRF_RT_REG_MULTI_SZ, RRF_RT_REG_SZ, RegDeleteTreeW, RegGetValueW, RegOpenKeyExW,
    RegSetKeyValueW,
};
use windows::core::Owned;

use crate::Error;
use crate::multi_sz::{self, MultiSzError};
use crate::str::{U16CStrExt as _, U16CString, nul_slice_wide_str, to_wide_nul};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry name `{0}` contains a NUL character")]
    InvalidName(String),
    #[error("invalid registry value data: {0}")]
    InvalidData(&'static str),
    #[error("failed to read registry value `{value}` from key `{key}`")]
    ReadValue { key: String, value: String, source: Error },
    #[error("failed to write registry value `{value}` to key `{key}`")]
    WriteValue { key: String, value: String, source: Error },
    #[error("failed to delete registry key `{key}`")]
    DeleteKey { key: String, source: Error },
    #[error("invalid multi-string value")]
    InvalidMultiSz(#[from] MultiSzError),
    #[error("registry value is not valid UTF-16")]
    InvalidUtf16(#[from] FromUtf16Error),
}

/// Registry value data supported by [`set_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryValue {
    Sz(String),
    /// String holding unexpanded references to environment variables, such as `%USERPROFILE%`.
    ExpandSz(String),
    MultiSz(Vec<String>),
}

impl RegistryValue {
    fn value_type(&self) -> REG_VALUE_TYPE {
        match self {
            Self::Sz(_) => REG_SZ,
            Self::ExpandSz(_) => REG_EXPAND_SZ,
            Self::MultiSz(_) => REG_MULTI_SZ,
        }
    }

    /// Data as stored in the registry, terminators included.
    fn to_wide(&self) -> Result<Vec<u16>, RegistryError> {
        match self {
            Self::Sz(s) | Self::ExpandSz(s) => Ok(to_wide_nul(s)
                .map_err(|_| RegistryError::InvalidData("string value contains a NUL character"))?
                .into_vec_with_nul()),
            Self::MultiSz(items) => Ok(multi_sz::encode_wide(items)?),
        }
    }
}

fn wide_name(name: &str) -> Result<U16CString, RegistryError> {
    to_wide_nul(name).map_err(|_| RegistryError::InvalidName(name.to_owned()))
}

fn check(status: WIN32_ERROR) -> Result<(), Error> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(Error::from(status))
    }
}

/// Returns true when `root\subkey` exists and can be opened for reading.
pub fn key_exists(root: HKEY, subkey: &str) -> bool {
    let Ok(subkey) = to_wide_nul(subkey) else {
        return false;
    };

    let mut key = HKEY::default();

    // SAFETY: `subkey` is NUL-terminated and `key` is valid for writes.
    let status = unsafe { RegOpenKeyExW(root, subkey.as_pcwstr(), None, KEY_READ, &mut key) };

    if status != ERROR_SUCCESS {
        return false;
    }

    // SAFETY: `RegOpenKeyExW` succeeded, the key is owned by us and closed right away.
    drop(unsafe { Owned::new(key) });

    true
}

/// Returns true when the value `value_name` exists in `root\subkey`, whatever its type.
///
/// An empty `value_name` designates the default value of the key.
pub fn value_exists(root: HKEY, subkey: &str, value_name: &str) -> bool {
    let (Ok(subkey), Ok(value_name)) = (to_wide_nul(subkey), to_wide_nul(value_name)) else {
        return false;
    };

    // SAFETY: Both strings are NUL-terminated. No data is requested.
    let status = unsafe { RegGetValueW(root, subkey.as_pcwstr(), value_name.as_pcwstr(), RRF_RT_ANY, None, None, None) };

    status == ERROR_SUCCESS
}

/// Writes `value` to `root\subkey`, creating the key when missing.
pub fn set_value(root: HKEY, subkey: &str, value_name: &str, value: &RegistryValue) -> Result<(), RegistryError> {
    let write_error = |source| RegistryError::WriteValue {
        key: subkey.to_owned(),
        value: value_name.to_owned(),
        source,
    };

    let data = value.to_wide()?;

    let size = data
        .len()
        .checked_mul(2)
        .and_then(|size| u32::try_from(size).ok())
        .filter(|&size| size != u32::MAX)
        .ok_or_else(|| write_error(Error::InvalidData("registry value is too large")))?;

    let subkey_wide = wide_name(subkey)?;
    let value_name_wide = wide_name(value_name)?;

    // SAFETY: Both strings are NUL-terminated and `data` holds `size` readable bytes.
    let status = unsafe {
        RegSetKeyValueW(
            root,
            subkey_wide.as_pcwstr(),
            value_name_wide.as_pcwstr(),
            value.value_type().0,
            Some(data.as_ptr().cast()),
            size,
        )
    };

    check(status).map_err(write_error)
}

/// Reads a `REG_SZ` or `REG_EXPAND_SZ` value, without expanding environment variables.
///
/// Returns `None` when the key or the value does not exist.
pub fn get_string_value(root: HKEY, subkey: &str, value_name: &str) -> Result<Option<String>, RegistryError> {
    let Some(data) = read_value(root, subkey, value_name, RRF_RT_REG_SZ | RRF_RT_REG_EXPAND_SZ | RRF_NOEXPAND)? else {
        return Ok(None);
    };

    Ok(Some(String::from_utf16(nul_slice_wide_str(&data))?))
}

/// Reads a `REG_MULTI_SZ` value. Returns `None` when the key or the value does not exist.
pub fn get_multi_string_value(
    root: HKEY,
    subkey: &str,
    value_name: &str,
) -> Result<Option<Vec<String>>, RegistryError> {
    let Some(data) = read_value(root, subkey, value_name, RRF_RT_REG_MULTI_SZ)? else {
        return Ok(None);
    };

    Ok(Some(multi_sz::to_strings_wide(&data)?))
}

/// Deletes `root\subkey` with all its values and subkeys. A missing key is not an error.
pub fn delete_tree(root: HKEY, subkey: &str) -> Result<(), RegistryError> {
    let subkey_wide = wide_name(subkey)?;

    // SAFETY: `subkey_wide` is NUL-terminated.
    let status = unsafe { RegDeleteTreeW(root, subkey_wide.as_pcwstr()) };

    if status == ERROR_FILE_NOT_FOUND {
        return Ok(());
    }

    check(status).map_err(|source| RegistryError::DeleteKey {
        key: subkey.to_owned(),
        source,
    })
}

/// Reads the raw data of a string-like value as UTF-16 units.
fn read_value(
    root: HKEY,
    subkey: &str,
    value_name: &str,
    flags: REG_ROUTINE_FLAGS,
) -> Result<Option<Vec<u16>>, RegistryError> {
    let read_error = |source| RegistryError::ReadValue {
        key: subkey.to_owned(),
        value: value_name.to_owned(),
        source,
    };

    let subkey_wide = wide_name(subkey)?;
    let value_name_wide = wide_name(value_name)?;
    let mut size = 0u32;

    // SAFETY: Both strings are NUL-terminated and `size` is valid for writes.
    let status = unsafe {
        RegGetValueW(
            root,
            subkey_wide.as_pcwstr(),
            value_name_wide.as_pcwstr(),
            flags,
            None,
            None,
            Some(&mut size),
        )
    };

    if status == ERROR_FILE_NOT_FOUND {
        return Ok(None);
    }

    check(status).map_err(read_error)?;

    loop {
        let mut data = vec![0u16; usize::try_from(size).unwrap_or_default().div_ceil(2)];

        // SAFETY: `data` holds at least `size` writable bytes.
        let status = unsafe {
            RegGetValueW(
                root,
                subkey_wide.as_pcwstr(),
                value_name_wide.as_pcwstr(),
                flags,
                None,
                Some(data.as_mut_ptr().cast()),
                Some(&mut size),
            )
        };

        match status {
            // The value grew since the size was queried, `size` now holds the new size.
            ERROR_MORE_DATA => continue,
            ERROR_FILE_NOT_FOUND => return Ok(None),
            status => check(status).map_err(read_error)?,
        }

        data.truncate(usize::try_from(size / 2).unwrap_or_default());

        return Ok(Some(data));
    }
}

#[cfg(test)]
mod tests {
    use windows::Win32::System::Registry::HKEY_CURRENT_USER;

    use super::*;

    /// Scratch key under `HKEY_CURRENT_USER\Software`, deleted on drop.
    struct ScratchKey(String);

    impl ScratchKey {
        fn new(name: &str) -> Self {
            let key = format!(r"Software\win-helpers-tests\{name}-{}", std::process::id());
            delete_tree(HKEY_CURRENT_USER, &key).expect("clean scratch key");
            Self(key)
        }
    }

    impl Drop for ScratchKey {
        fn drop(&mut self) {
            let _ = delete_tree(HKEY_CURRENT_USER, &self.0);
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn writes_and_reads_values() {
        let key = ScratchKey::new("values");

        assert!(!key_exists(HKEY_CURRENT_USER, &key.0));

        set_value(HKEY_CURRENT_USER, &key.0, "Name", &RegistryValue::Sz("win-helpers".to_owned())).expect("write REG_SZ");
        set_value(
            HKEY_CURRENT_USER,
            &key.0,
            "Path",
            &RegistryValue::ExpandSz(r"%USERPROFILE%\data".to_owned()),
        )
        .expect("write REG_EXPAND_SZ");
        set_value(
            HKEY_CURRENT_USER,
            &key.0,
            "Files",
            &RegistryValue::MultiSz(vec![r"C:\temp1.txt".to_owned(), r"C:\temp2.txt".to_owned()]),
        )
        .expect("write REG_MULTI_SZ");
        set_value(HKEY_CURRENT_USER, &key.0, "", &RegistryValue::Sz("default".to_owned())).expect("write default value");

        assert!(key_exists(HKEY_CURRENT_USER, &key.0));
        assert!(value_exists(HKEY_CURRENT_USER, &key.0, "Name"));
        assert!(value_exists(HKEY_CURRENT_USER, &key.0, ""));
        assert!(!value_exists(HKEY_CURRENT_USER, &key.0, "Missing"));

        assert_eq!(
            get_string_value(HKEY_CURRENT_USER, &key.0, "Name").expect("read REG_SZ").as_deref(),
            Some("win-helpers")
        );
        assert_eq!(
            get_string_value(HKEY_CURRENT_USER, &key.0, "Path").expect("read REG_EXPAND_SZ").as_deref(),
            Some(r"%USERPROFILE%\data")
        );
        assert_eq!(
            get_multi_string_value(HKEY_CURRENT_USER, &key.0, "Files").expect("read REG_MULTI_SZ"),
            Some(vec![r"C:\temp1.txt".to_owned(), r"C:\temp2.txt".to_owned()])
        );
        assert_eq!(
            get_string_value(HKEY_CURRENT_USER, &key.0, "").expect("read default value").as_deref(),
            Some("default")
        );

        assert_eq!(get_string_value(HKEY_CURRENT_USER, &key.0, "Missing").expect("read"), None);
        assert!(get_string_value(HKEY_CURRENT_USER, &key.0, "Files").is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn empty_multi_string() {
        let key = ScratchKey::new("empty");

        set_value(HKEY_CURRENT_USER, &key.0, "Empty", &RegistryValue::MultiSz(Vec::new())).expect("write");

        assert_eq!(
            get_multi_string_value(HKEY_CURRENT_USER, &key.0, "Empty").expect("read"),
            Some(Vec::new())
        );
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn rejects_items_breaking_the_layout() {
        let key = ScratchKey::new("invalid");

        let result = set_value(
            HKEY_CURRENT_USER,
            &key.0,
            "Invalid",
            &RegistryValue::MultiSz(vec!["a".to_owned(), String::new()]),
        );

        assert!(matches!(
            result,
            Err(RegistryError::InvalidMultiSz(MultiSzError::EmptyItem { index: 1 }))
        ));
        assert!(!key_exists(HKEY_CURRENT_USER, &key.0));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn rejects_string_data_with_nul() {
        let key = ScratchKey::new("nul-data");

        for value in [
            RegistryValue::Sz("a\0b".to_owned()),
            RegistryValue::ExpandSz("%TEMP%\0x".to_owned()),
        ] {
            let result = set_value(HKEY_CURRENT_USER, &key.0, "Value", &value);
            assert!(matches!(result, Err(RegistryError::InvalidData(_))), "{result:?}");
        }

        assert!(matches!(
            set_value(HKEY_CURRENT_USER, &key.0, "Bad\0Name", &RegistryValue::Sz("x".to_owned())),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(!key_exists(HKEY_CURRENT_USER, &key.0));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn deletes_nested_keys() {
        let key = ScratchKey::new("tree");
        let nested = format!(r"{}\a\b", key.0);

        set_value(HKEY_CURRENT_USER, &nested, "Value", &RegistryValue::Sz("x".to_owned())).expect("write");
        assert!(key_exists(HKEY_CURRENT_USER, &nested));

        delete_tree(HKEY_CURRENT_USER, &key.0).expect("delete");
        assert!(!key_exists(HKEY_CURRENT_USER, &key.0));

        delete_tree(HKEY_CURRENT_USER, &key.0).expect("missing key is not an error");
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn missing_key_has_no_values() {
        let subkey = r"Software\win-helpers-tests\does-not-exist";

        assert!(!key_exists(HKEY_CURRENT_USER, subkey));
        assert!(!value_exists(HKEY_CURRENT_USER, subkey, "Value"));
        assert_eq!(get_multi_string_value(HKEY_CURRENT_USER, subkey, "Value").expect("read"), None);
    }
}
