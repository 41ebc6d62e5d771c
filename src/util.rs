//! Wire-size constants and UTF-8 safe slicing helpers.

/// Hard cap on one protocol line, terminator included.
pub const MAX_LINE_LEN: usize = 512;

/// Line terminator appended to every outgoing line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Truncates a string to at most `max_bytes` bytes without breaking
/// a multi-byte UTF-8 codepoint at the end.
///
/// ```
/// use slirc_bot::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
/// assert_eq!(truncate_utf8_safe("Hello 👋 World", 8), "Hello ");
/// assert_eq!(truncate_utf8_safe("hi", 10), "hi");
/// ```
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Byte length of the first character of `s` (0 for an empty string).
#[inline]
pub fn first_char_len(s: &str) -> usize {
    s.chars().next().map_or(0, char::len_utf8)
}

/// Trim trailing line terminators.
#[inline]
pub fn trim_line_end(s: &str) -> &str {
    s.trim_end_matches(['\r', '\n'])
}
