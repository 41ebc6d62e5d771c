//! IRC case-mapping functions.
//!
//! Nicknames and channel names compare case-insensitively, but what "case"
//! means depends on the server's advertised `CASEMAPPING`. Under `rfc1459`
//! (the historical default) `[]\~` are the uppercase forms of `{}|^`.

/// A case mapping advertised through ISUPPORT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Casemapping {
    /// Only `A-Z` fold.
    Ascii,
    /// `A-Z` plus `[]\~` → `{}|^`.
    #[default]
    Rfc1459,
    /// `A-Z` plus `[]\` → `{}|` (no tilde).
    StrictRfc1459,
}

impl Casemapping {
    /// Parse an ISUPPORT `CASEMAPPING` value. Unknown mappings fall back to
    /// `rfc1459`.
    pub fn from_token(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "ascii" => Self::Ascii,
            "strict-rfc1459" => Self::StrictRfc1459,
            _ => Self::Rfc1459,
        }
    }

    fn fold_char(self, c: char) -> char {
        match (self, c) {
            (_, 'A'..='Z') => c.to_ascii_lowercase(),
            (Self::Rfc1459 | Self::StrictRfc1459, '[') => '{',
            (Self::Rfc1459 | Self::StrictRfc1459, ']') => '}',
            (Self::Rfc1459 | Self::StrictRfc1459, '\\') => '|',
            (Self::Rfc1459, '~') => '^',
            _ => c,
        }
    }

    /// Fold a name into its lookup key.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.fold_char(c)).collect()
    }

    /// Compare two names under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a.chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold_char(ca) == self.fold_char(cb))
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    Casemapping::Rfc1459.fold(s)
}

/// Compare two strings using RFC 1459 case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    Casemapping::Rfc1459.eq(a, b)
}
