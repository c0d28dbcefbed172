//! Command line building.

/// Quotes `argument` so that the MSVC runtime parses it back as a single argument.
///
/// Arguments without whitespace or quotes are returned as is. Otherwise the argument is
/// wrapped in double quotes, each embedded quote is escaped, and the backslashes directly
/// preceding a quote (including the closing one) are doubled.
///
/// See <https://learn.microsoft.com/en-us/cpp/cpp/main-function-command-line-args#parsing-c-command-line-arguments>.
pub fn escape_argument(argument: &str) -> String {
    if !argument.is_empty() && !argument.contains([' ', '\t', '"']) {
        return argument.to_owned();
    }

    let mut escaped = String::with_capacity(argument.len() * 2 + 2);
    escaped.push('"');

    let mut backslashes = 0;

    for c in argument.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                push_backslashes(&mut escaped, backslashes * 2 + 1);
                escaped.push('"');
                backslashes = 0;
            }
            c => {
                push_backslashes(&mut escaped, backslashes);
                escaped.push(c);
                backslashes = 0;
            }
        }
    }

    push_backslashes(&mut escaped, backslashes * 2);
    escaped.push('"');

    escaped
}

fn push_backslashes(s: &mut String, count: usize) {
    s.extend(core::iter::repeat_n('\\', count));
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct CommandLine(pub Vec<String>);

impl CommandLine {
    pub fn new(args: Vec<String>) -> Self {
        Self(args)
    }

    /// Encodes the arguments into a single command line string.
    pub fn to_command_line(&self) -> String {
        self.0
            .iter()
            .map(|arg| escape_argument(arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn args(&self) -> &[String] {
        &self.0
    }
}

#[cfg(target_os = "windows")]
mod win_ext {
    use std::slice;

    use anyhow::Context as _;
    use windows::Win32::Foundation::HLOCAL;
    use windows::Win32::UI::Shell::CommandLineToArgvW;
    use windows::core::Owned;

    use super::CommandLine;
    use crate::str::{U16CStrExt as _, to_wide_nul};

    impl CommandLine {
        /// Splits `command_line` the way the shell does.
        pub fn from_command_line(command_line: &str) -> anyhow::Result<Self> {
            let command_line = to_wide_nul(command_line).context("command line contains a NUL")?;
            let mut arg_count = 0;

            // SAFETY: `command_line` is NUL terminated. On success, the returned array is allocated with
            // `LocalAlloc`.
            let raw_args = unsafe { CommandLineToArgvW(command_line.as_pcwstr(), &mut arg_count) };

            if raw_args.is_null() {
                return Err(windows::core::Error::from_win32().into());
            }

            // SAFETY: `raw_args` was allocated by `CommandLineToArgvW`. `Owned` frees it with `LocalFree`
            // after the arguments are copied.
            let _allocation = unsafe { Owned::new(HLOCAL(raw_args.cast())) };

            let arg_count = usize::try_from(arg_count).unwrap_or_default();

            // SAFETY: `CommandLineToArgvW` succeeded, `raw_args` holds `arg_count` pointers.
            let args = unsafe { slice::from_raw_parts(raw_args, arg_count) }
                .iter()
                // SAFETY: Each pointer is a NUL-terminated string living in the same allocation.
                .map(|arg| unsafe { arg.to_string() })
                .collect::<Result<Vec<_>, _>>();

            Ok(Self(args?))
        }
    }
}
