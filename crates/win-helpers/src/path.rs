//! Path string helpers and known folder resolution.

const SEPARATOR: char = '\\';

/// Replaces the last component of `full_path` (everything after the last backslash) with `new_name`.
///
/// Only the string is changed, the item on disk is left untouched.
pub fn rename_path(full_path: &str, new_name: &str) -> String {
    let parent_len = full_path.rfind(SEPARATOR).map_or(0, |idx| idx + 1);

    let mut renamed = String::with_capacity(parent_len + new_name.len());
    renamed.push_str(&full_path[..parent_len]);
    renamed.push_str(new_name);
    renamed
}

/// Builds `base\subdir\file_name`, or `base\file_name` when `subdir` is empty.
///
/// `subdir` must not carry leading or trailing backslashes.
pub fn join_file_path(base: &str, subdir: &str, file_name: &str) -> String {
    let mut path = String::with_capacity(base.len() + subdir.len() + file_name.len() + 2);
    path.push_str(base);

    if !subdir.is_empty() {
        path.push(SEPARATOR);
        path.push_str(subdir);
    }

    path.push(SEPARATOR);
    path.push_str(file_name);
    path
}

#[cfg(target_os = "windows")]
pub use self::win_ext::*;

#[cfg(target_os = "windows")]
mod win_ext {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt as _;
    use std::path::PathBuf;

    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::{KF_FLAG_DEFAULT, SHGetKnownFolderPath};
    use windows::core::{GUID, PWSTR};

    use super::join_file_path;

    /// String allocated by the shell, released with `CoTaskMemFree`.
    struct CoTaskMemString(PWSTR);

    impl Drop for CoTaskMemString {
        fn drop(&mut self) {
            // SAFETY: The string was allocated by the shell with `CoTaskMemAlloc` and is owned by us.
            unsafe { CoTaskMemFree(Some(self.0.as_ptr().cast_const().cast())) };
        }
    }

    /// Returns the path of a known folder such as `FOLDERID_LocalAppData`.
    pub fn known_folder_path(folder_id: &GUID) -> anyhow::Result<PathBuf> {
        // SAFETY: FFI call with no outstanding preconditions. The returned string is freed by the wrapper.
        let raw_path = CoTaskMemString(unsafe { SHGetKnownFolderPath(folder_id, KF_FLAG_DEFAULT, None) }?);

        // SAFETY: On success, the shell returns a valid NUL-terminated string.
        let path = OsString::from_wide(unsafe { raw_path.0.as_wide() });

        Ok(PathBuf::from(path))
    }

    /// Returns `<known folder>\<subdir>\<file_name>`. The file is not required to exist.
    pub fn known_folder_file_path(folder_id: &GUID, subdir: &str, file_name: &str) -> anyhow::Result<PathBuf> {
        let folder = known_folder_path(folder_id)?;

        let folder = folder
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("known folder path is not valid Unicode: {}", folder.display()))?;

        Ok(PathBuf::from(join_file_path(folder, subdir, file_name)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(r"C:\dir\file.txt", "other.txt", r"C:\dir\other.txt")]
    #[case(r"C:\dir\subdir", "renamed", r"C:\dir\renamed")]
    #[case(r"C:\dir\", "name", r"C:\dir\name")]
    #[case("file.txt", "other.txt", "other.txt")]
    #[case("", "name", "name")]
    fn renames_last_component(#[case] full_path: &str, #[case] new_name: &str, #[case] expected: &str) {
        assert_eq!(rename_path(full_path, new_name), expected);
    }

    #[rstest]
    #[case(r"C:\Users\me\AppData\Roaming", "Vendor", "settings.ini", r"C:\Users\me\AppData\Roaming\Vendor\settings.ini")]
    #[case(r"C:\Users\me\AppData\Roaming", "", "settings.ini", r"C:\Users\me\AppData\Roaming\settings.ini")]
    #[case(r"C:\ProgramData", r"Vendor\App", "log.txt", r"C:\ProgramData\Vendor\App\log.txt")]
    fn joins_file_path(#[case] base: &str, #[case] subdir: &str, #[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(join_file_path(base, subdir, file_name), expected);
    }

    #[cfg(target_os = "windows")]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn resolves_known_folder() {
        use windows::Win32::UI::Shell::FOLDERID_Windows;

        let windows_dir = known_folder_path(&FOLDERID_Windows).expect("Windows folder");
        assert!(windows_dir.is_dir());

        let file = known_folder_file_path(&FOLDERID_Windows, "System32", "kernel32.dll").expect("file path");
        assert!(file.is_file());
    }
}
