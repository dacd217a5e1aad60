use std::{ops::Range, path::Path, sync::LazyLock};

use regex::Regex;

pub(crate) trait InvertResult<T, E> {
    /// # Errors
    /// If any of the errors contained within has an error.
    fn invert(self) -> Result<Option<T>, E>;
}

impl<T, E> InvertResult<T, E> for Option<Result<T, E>> {
    fn invert(self) -> Result<Option<T>, E> {
        self.map_or_else(|| Ok(None), |o| o.map(|v| Some(v)))
    }
}
impl<T, E> InvertResult<T, E> for Option<Result<Option<T>, E>> {
    fn invert(self) -> Result<Option<T>, E> {
        self.unwrap_or_else(|| Ok(None))
    }
}

/// Helper function to check extensions in filenames
pub(crate) fn check_extension(filename: impl AsRef<Path>, extension: impl AsRef<Path>) -> bool {
    filename
        .as_ref()
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.as_ref()))
}

/// Get the file name (without any directories) in lowercase, with a trailing `.gz` removed.
pub(crate) fn plain_file_name(filename: impl AsRef<Path>) -> String {
    let name = filename
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.strip_suffix(".gz").map_or(name.clone(), str::to_string)
}

/// Get the scan number from a native spectrum id (`controllerType=0 controllerNumber=1 scan=30069`),
/// a plain number, or an `index=12` id.
pub(crate) fn scan_from_native_id(id: &str) -> Option<u32> {
    static SCAN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:scan|index)=(\d+)").unwrap());
    id.trim().parse::<u32>().ok().or_else(|| {
        SCAN.captures(id)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Split the given range based on the separator.
/// This also takes brackets into account and these take precedence over the separator searched for.
pub(crate) fn split_with_brackets(
    text: &str,
    range: Range<usize>,
    separator: u8,
    open: u8,
    close: u8,
) -> Vec<Range<usize>> {
    let mut state: usize = 0;
    let mut index = range.start;
    let mut last_field = range.start;
    let mut fields = Vec::new();
    while index < range.end {
        if !text.is_char_boundary(index) {
            index += 1;
            continue;
        }
        if index + 1 < text.len() && !text.is_char_boundary(index + 1) {
            index += 1;
            continue;
        }
        let ch = text.as_bytes()[index];
        if ch == open {
            state += 1;
        } else if ch == close {
            state = state.saturating_sub(1);
        } else if ch == separator && state == 0 {
            fields.push(last_field..index);
            last_field = index + 1;
        }
        index += 1;
    }
    fields.push(last_field..index);
    fields
}

/// Parse a signed floating point number at the start of the text, returns the number and the
/// number of bytes consumed.
pub(crate) fn leading_signed_number(text: &str) -> Option<(f64, usize)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    let mut seen_dot = false;
    while let Some(b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    if end == digits_start || (end == digits_start + 1 && seen_dot) {
        return None;
    }
    // A trailing dot belongs to a flanking residue separator, not to the number
    if bytes[end - 1] == b'.' {
        end -= 1;
    }
    text[..end].parse::<f64>().ok().map(|v| (v, end))
}

#[test]
#[allow(clippy::missing_panics_doc)]
fn test_split_with_brackets() {
    assert_eq!(
        split_with_brackets("5M(15.9949), N-term(42.0106)", 0..28, b',', b'(', b')'),
        vec![0..11, 12..28]
    );
    assert_eq!(
        split_with_brackets("0[,,,[,,]],,[,,l;]hj", 0..20, b',', b'[', b']'),
        vec![0..10, 11..11, 12..20]
    );
}

#[test]
#[allow(clippy::missing_panics_doc, clippy::float_cmp)]
fn test_leading_signed_number() {
    assert_eq!(leading_signed_number("+144.1EPT"), Some((144.1, 6)));
    assert_eq!(leading_signed_number("-18.01"), Some((-18.01, 6)));
    assert_eq!(leading_signed_number("+16."), Some((16.0, 3)));
    assert_eq!(leading_signed_number("PEP"), None);
    assert_eq!(leading_signed_number("+"), None);
}

#[test]
#[allow(clippy::missing_panics_doc)]
fn test_scan_from_native_id() {
    assert_eq!(
        scan_from_native_id("controllerType=0 controllerNumber=1 scan=30069"),
        Some(30069)
    );
    assert_eq!(scan_from_native_id(" 1234 "), Some(1234));
    assert_eq!(scan_from_native_id("index=17"), Some(17));
    assert_eq!(scan_from_native_id("spectrum"), None);
}
