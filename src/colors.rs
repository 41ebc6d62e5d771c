//! IRC formatting code handling.
//!
//! Display formatting is in-band: control bytes toggle styles for the rest
//! of the line. This module scans those bytes so the output formatter can
//! carry the active style across forced line splits, and so collaborators can
//! strip formatting from user input.
//!
//! # IRC Format Codes
//! - 0x02 (^B): Bold
//! - 0x03 (^C): Color (followed by optional `FF[,BB]` decimal codes)
//! - 0x0F (^O): Reset all formatting
//! - 0x16 (^V): Reverse
//! - 0x1D (^]): Italic
//! - 0x1F (^_): Underline

use std::borrow::Cow;
use std::fmt::Write;

pub const BOLD: char = '\x02';
pub const COLOR: char = '\x03';
pub const RESET: char = '\x0F';
pub const REVERSE: char = '\x16';
pub const ITALIC: char = '\x1D';
pub const UNDERLINE: char = '\x1F';

const FORMAT_CHARS: &[char] = &[BOLD, COLOR, RESET, REVERSE, ITALIC, UNDERLINE];

/// One lexical unit of a formatted string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    Text(char),
    Bold,
    Reverse,
    Italic,
    Underline,
    Reset,
    /// A color code. `fg: None` is a bare `\x03`, which clears color.
    Color { fg: Option<u8>, bg: Option<u8> },
}

/// Iterator over the [`Token`]s of a string.
pub struct Tokens<'a> {
    rest: &'a str,
}

/// Tokenize a formatted string.
pub fn tokens(s: &str) -> Tokens<'_> {
    Tokens { rest: s }
}

/// Take up to two leading ASCII digits.
fn take_digits(s: &str) -> (Option<u8>, &str) {
    let len = s.bytes().take(2).take_while(u8::is_ascii_digit).count();
    if len == 0 {
        return (None, s);
    }
    (s[..len].parse().ok(), &s[len..])
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();

        let token = match c {
            BOLD => Token::Bold,
            REVERSE => Token::Reverse,
            ITALIC => Token::Italic,
            UNDERLINE => Token::Underline,
            RESET => Token::Reset,
            COLOR => {
                let (fg, after_fg) = take_digits(self.rest);
                let mut bg = None;
                self.rest = after_fg;
                if fg.is_some() {
                    if let Some(after_comma) = after_fg.strip_prefix(',') {
                        let (digits, after_bg) = take_digits(after_comma);
                        if digits.is_some() {
                            bg = digits;
                            self.rest = after_bg;
                        }
                    }
                }
                Token::Color { fg, bg }
            }
            other => Token::Text(other),
        };
        Some(token)
    }
}

/// Longest prefix of `s` within `max_bytes` that does not end inside a
/// control code.
pub fn truncate_at_token(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut toks = tokens(s);
    let mut end = 0;
    while toks.next().is_some() {
        let consumed = s.len() - toks.rest.len();
        if consumed > max_bytes {
            break;
        }
        end = consumed;
    }
    &s[..end]
}

/// Byte length of the first token of `s`.
pub fn first_token_len(s: &str) -> usize {
    let mut toks = tokens(s);
    toks.next();
    s.len() - toks.rest.len()
}

/// An active foreground/background color pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub fg: u8,
    pub bg: Option<u8>,
}

/// Simulated display state at some point in a line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatState {
    pub bold: bool,
    pub reverse: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<Color>,
}

impl FormatState {
    /// The state left active at the end of `line`, starting from plain.
    pub fn after(line: &str) -> Self {
        let mut state = Self::default();
        state.feed(line);
        state
    }

    /// Advance the state over `text`.
    pub fn feed(&mut self, text: &str) {
        for token in tokens(text) {
            match token {
                Token::Text(_) => {}
                Token::Bold => self.bold = !self.bold,
                Token::Reverse => self.reverse = !self.reverse,
                Token::Italic => self.italic = !self.italic,
                Token::Underline => self.underline = !self.underline,
                Token::Reset => *self = Self::default(),
                Token::Color { fg, bg } => self.color = fg.map(|fg| Color { fg, bg }),
            }
        }
    }

    /// True when nothing is active.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Control codes that re-establish this state on a fresh line.
    ///
    /// Color numbers are written with two digits so that text starting with
    /// a digit is not read as part of the code.
    pub fn prefix(&self) -> String {
        let mut out = String::new();
        if self.bold {
            out.push(BOLD);
        }
        if self.reverse {
            out.push(REVERSE);
        }
        if self.italic {
            out.push(ITALIC);
        }
        if self.underline {
            out.push(UNDERLINE);
        }
        if let Some(color) = self.color {
            let _ = write!(out, "{}{:02}", COLOR, color.fg);
            if let Some(bg) = color.bg {
                let _ = write!(out, ",{:02}", bg);
            }
        }
        out
    }
}

/// Extension trait for handling formatted IRC strings.
pub trait FormattedStringExt<'a> {
    /// Check if the string contains any IRC formatting codes.
    fn is_formatted(&self) -> bool;

    /// Strip all IRC formatting codes from the string.
    fn strip_formatting(self) -> Cow<'a, str>;
}

impl<'a> FormattedStringExt<'a> for &'a str {
    fn is_formatted(&self) -> bool {
        self.contains(FORMAT_CHARS)
    }

    fn strip_formatting(self) -> Cow<'a, str> {
        if !self.is_formatted() {
            return Cow::Borrowed(self);
        }

        Cow::Owned(
            tokens(self)
                .filter_map(|t| match t {
                    Token::Text(c) => Some(c),
                    _ => None,
                })
                .collect(),
        )
    }
}
