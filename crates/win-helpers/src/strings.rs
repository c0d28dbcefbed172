//! Small string utilities.

/// Doubles every backslash of `s`.
pub fn escape_backslash(s: &str) -> String {
    s.replace('\\', r"\\")
}

/// Joins `strings` using `separator`.
pub fn join_strings<S: AsRef<str>>(strings: &[S], separator: &str) -> String {
    let capacity = strings.iter().map(|s| s.as_ref().len()).sum::<usize>()
        + separator.len() * strings.len().saturating_sub(1);

    let mut joined = String::with_capacity(capacity);

    for (idx, s) in strings.iter().enumerate() {
        if idx != 0 {
            joined.push_str(separator);
        }

        joined.push_str(s.as_ref());
    }

    joined
}

/// Removes every leading and trailing `c`.
pub fn trim(s: &str, c: char) -> &str {
    s.trim_matches(c)
}

/// Removes every trailing `c`.
pub fn trim_back(s: &str, c: char) -> &str {
    s.trim_end_matches(c)
}

/// Removes every leading `c`.
pub fn trim_front(s: &str, c: char) -> &str {
    s.trim_start_matches(c)
}

/// Widens an ANSI string by mapping each byte to the code point of the same value.
///
/// This is how the shell and storage drivers expect their 8-bit strings to be turned into
/// wide strings; no code page conversion is performed.
pub fn widen_ansi(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(r"C:\Windows\System32", r"C:\\Windows\\System32")]
    #[case(r"\\server\share\", r"\\\\server\\share\\")]
    #[case("no backslash", "no backslash")]
    #[case("", "")]
    fn escapes_backslashes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_backslash(input), expected);
    }

    #[rstest]
    #[case(&[], ", ", "")]
    #[case(&["one"], ", ", "one")]
    #[case(&["one", "two", "three"], ", ", "one, two, three")]
    #[case(&["", ""], ";", ";")]
    fn joins(#[case] input: &[&str], #[case] separator: &str, #[case] expected: &str) {
        let joined = join_strings(input, separator);
        assert_eq!(joined, expected);
        assert_eq!(joined.capacity(), expected.len());
    }

    #[rstest]
    #[case("\\\\path\\\\", '\\', "path", "\\\\path", "path\\\\")]
    #[case("xxx", 'x', "", "", "")]
    #[case("  a b  ", ' ', "a b", "  a b", "a b  ")]
    #[case("", '-', "", "", "")]
    fn trims(
        #[case] input: &str,
        #[case] c: char,
        #[case] both: &str,
        #[case] back: &str,
        #[case] front: &str,
    ) {
        assert_eq!(trim(input, c), both);
        assert_eq!(trim_back(input, c), back);
        assert_eq!(trim_front(input, c), front);
    }

    #[test]
    fn widens_each_byte() {
        assert_eq!(widen_ansi(b"ABC"), "ABC");
        assert_eq!(widen_ansi(&[0x47, 0xFC, 0x6E]), "Gün");
    }
}
