//! Multi-string buffers (`REG_MULTI_SZ`, `CF_HDROP` file lists, `SetupAPI` hardware ids, ...).
//!
//! A multi-string is a sequence of NUL-terminated strings, terminated by an additional NUL:
//! `"C:\\temp1.txt\0C:\\temp2.txt\0\0"`. Both ANSI (`u8`) and wide (`u16`) units are supported.
//!
//! All the functions operate on bounded slices. When the final terminator is missing, the end
//! of the slice is treated as the end of the sequence.

use core::iter::FusedIterator;

use crate::strings::widen_ansi;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MultiSzError {
    #[error("multi-string is not terminated by an empty string")]
    Unterminated,
    #[error("multi-string item {index} is empty")]
    EmptyItem { index: usize },
    #[error("multi-string item {index} contains a NUL character")]
    InteriorNul { index: usize },
    #[error("multi-string item {index} is not valid UTF-16")]
    InvalidUtf16 { index: usize },
}

/// A character unit of a multi-string.
pub trait MultiSzUnit: Copy + PartialEq {
    const NUL: Self;
}

impl MultiSzUnit for u8 {
    const NUL: Self = 0;
}

impl MultiSzUnit for u16 {
    const NUL: Self = 0;
}

/// Iterator over the items of a multi-string buffer.
#[derive(Debug, Clone)]
pub struct MultiSzIter<'a, T> {
    remaining: &'a [T],
}

impl<'a, T: MultiSzUnit> Iterator for MultiSzIter<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = core::mem::take(&mut self.remaining);

        // An empty string ends the sequence.
        if remaining.first().map_or(true, |&unit| unit == T::NUL) {
            return None;
        }

        match remaining.iter().position(|&unit| unit == T::NUL) {
            Some(end) => {
                self.remaining = &remaining[end + 1..];
                Some(&remaining[..end])
            }
            None => Some(remaining),
        }
    }
}

impl<T: MultiSzUnit> FusedIterator for MultiSzIter<'_, T> {}

/// Iterates over the items of `buf`, without their terminators.
pub fn items<T: MultiSzUnit>(buf: &[T]) -> MultiSzIter<'_, T> {
    MultiSzIter { remaining: buf }
}

/// Number of items in `buf`.
pub fn count<T: MultiSzUnit>(buf: &[T]) -> usize {
    items(buf).count()
}

/// Returns true when `buf` holds more than one item.
pub fn is_multi_items<T: MultiSzUnit>(buf: &[T]) -> bool {
    items(buf).nth(1).is_some()
}

/// Size in bytes of the sequence, including the final terminator.
///
/// This is the value expected by `RegSetValueExW` for `REG_MULTI_SZ` data.
pub fn size_in_bytes<T: MultiSzUnit>(buf: &[T]) -> Result<usize, MultiSzError> {
    let mut offset = 0;

    loop {
        let rest = buf.get(offset..).ok_or(MultiSzError::Unterminated)?;
        let len = rest
            .iter()
            .position(|&unit| unit == T::NUL)
            .ok_or(MultiSzError::Unterminated)?;

        offset += len + 1;

        if len == 0 {
            return Ok(offset * size_of::<T>());
        }
    }
}

/// Decodes every item of a wide multi-string.
pub fn to_strings_wide(buf: &[u16]) -> Result<Vec<String>, MultiSzError> {
    items(buf)
        .enumerate()
        .map(|(index, item)| String::from_utf16(item).map_err(|_| MultiSzError::InvalidUtf16 { index }))
        .collect()
}

/// Decodes every item of an ANSI multi-string, widening each byte to a code point.
pub fn to_strings_ansi(buf: &[u8]) -> Vec<String> {
    items(buf).map(widen_ansi).collect()
}

/// Builds a wide multi-string from `items`, including the final terminator.
///
/// Empty items and items containing a NUL are rejected: both would end the sequence early.
/// An empty input produces an empty multi-string (`"\0\0"`).
pub fn encode_wide<I, S>(items: I) -> Result<Vec<u16>, MultiSzError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut buf = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let item = item.as_ref();

        if item.is_empty() {
            return Err(MultiSzError::EmptyItem { index });
        }

        if item.contains('\0') {
            return Err(MultiSzError::InteriorNul { index });
        }

        buf.extend(item.encode_utf16());
        buf.push(0);
    }

    if buf.is_empty() {
        buf.push(0);
    }

    buf.push(0);

    Ok(buf)
}
