//! Message source (`nick!ident@host`) parsing.

use std::fmt;

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{rest, verify},
    sequence::{separated_pair, tuple},
    IResult,
};

/// The origin of a message.
///
/// A full user mask fills all three fields. A bare word (a server name, or a
/// nick-only source) lands entirely in `nick` with empty `ident` and `host`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Prefix {
    pub nick: String,
    pub ident: String,
    pub host: String,
}

/// `nick!ident@host` with every component non-empty.
fn user_mask(input: &str) -> IResult<&str, (&str, (&str, &str))> {
    separated_pair(
        take_while1(|c| c != '!' && c != '@'),
        char('!'),
        tuple((
            take_while1(|c| c != '@'),
            nom::sequence::preceded(char('@'), verify(rest, |s: &str| !s.is_empty())),
        )),
    )(input)
}

impl Prefix {
    /// Create a prefix from its components.
    pub fn new(nick: impl Into<String>, ident: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ident: ident.into(),
            host: host.into(),
        }
    }

    /// Parse a source word. A leading `:` is ignored.
    ///
    /// ```
    /// use slirc_bot::Prefix;
    ///
    /// let p = Prefix::parse(":bob!b@host.example");
    /// assert_eq!((p.nick.as_str(), p.ident.as_str(), p.host.as_str()), ("bob", "b", "host.example"));
    ///
    /// let server = Prefix::parse(":irc.example.net");
    /// assert_eq!(server.nick, "irc.example.net");
    /// assert!(server.ident.is_empty() && server.host.is_empty());
    /// ```
    pub fn parse(word: &str) -> Self {
        let word = word.strip_prefix(':').unwrap_or(word);
        match user_mask(word) {
            Ok((_, (nick, (ident, host)))) => Self::new(nick, ident, host),
            Err(_) => Self::new(word, "", ""),
        }
    }

    /// `ident@host`, or `None` when the source carried no address.
    pub fn address(&self) -> Option<String> {
        if self.ident.is_empty() && self.host.is_empty() {
            None
        } else {
            Some(format!("{}@{}", self.ident, self.host))
        }
    }

    /// True when both ident and host are known.
    pub fn has_address(&self) -> bool {
        !self.ident.is_empty() && !self.host.is_empty()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)?;
        if self.has_address() {
            write!(f, "!{}@{}", self.ident, self.host)?;
        }
        Ok(())
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::parse(s)
    }
}
