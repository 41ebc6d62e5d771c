//! CTCP (Client-to-Client Protocol) framing.
//!
//! CTCP rides inside PRIVMSG (requests) and NOTICE (replies) bodies, wrapped
//! in `\x01` delimiters: `\x01VERB optional body\x01`.

use std::fmt;

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// CTCP verbs the core knows by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CtcpKind {
    /// `/me` actions.
    Action,
    Version,
    Ping,
    Time,
    Clientinfo,
    Source,
    Userinfo,
    Finger,
    Dcc,
    /// Anything else, kept uppercased as received.
    Other(String),
}

impl CtcpKind {
    /// Look up a verb, case-insensitively.
    pub fn parse(verb: &str) -> Self {
        let upper = verb.to_ascii_uppercase();
        match upper.as_str() {
            "ACTION" => Self::Action,
            "VERSION" => Self::Version,
            "PING" => Self::Ping,
            "TIME" => Self::Time,
            "CLIENTINFO" => Self::Clientinfo,
            "SOURCE" => Self::Source,
            "USERINFO" => Self::Userinfo,
            "FINGER" => Self::Finger,
            "DCC" => Self::Dcc,
            _ => Self::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Version => "VERSION",
            Self::Ping => "PING",
            Self::Time => "TIME",
            Self::Clientinfo => "CLIENTINFO",
            Self::Source => "SOURCE",
            Self::Userinfo => "USERINFO",
            Self::Finger => "FINGER",
            Self::Dcc => "DCC",
            Self::Other(verb) => verb,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CTCP frame: verb plus optional body.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CtcpOwned {
    #[cfg_attr(feature = "serde", serde(with = "kind_serde"))]
    pub kind: CtcpKind,
    pub params: Option<String>,
}

impl CtcpOwned {
    /// Parse a message body as a CTCP frame.
    ///
    /// The closing delimiter is optional since some clients drop it. Returns
    /// `None` for bodies that are not CTCP or carry no verb.
    ///
    /// ```
    /// use slirc_bot::ctcp::{CtcpKind, CtcpOwned};
    ///
    /// let ctcp = CtcpOwned::parse("\x01ACTION waves\x01").unwrap();
    /// assert_eq!(ctcp.kind, CtcpKind::Action);
    /// assert_eq!(ctcp.params.as_deref(), Some("waves"));
    /// ```
    pub fn parse(body: &str) -> Option<Self> {
        let inner = body.strip_prefix(CTCP_DELIM)?;
        let inner = inner.strip_suffix(CTCP_DELIM).unwrap_or(inner);

        let (verb, params) = match inner.split_once(' ') {
            Some((verb, params)) => (verb, Some(params)),
            None => (inner, None),
        };
        if verb.is_empty() {
            return None;
        }

        Some(Self {
            kind: CtcpKind::parse(verb),
            params: params.filter(|p| !p.is_empty()).map(str::to_owned),
        })
    }

    /// Whether a body opens a CTCP frame.
    #[inline]
    pub fn is_ctcp(body: &str) -> bool {
        body.starts_with(CTCP_DELIM)
    }

    pub fn new(kind: CtcpKind, params: Option<String>) -> Self {
        Self { kind, params }
    }

    pub fn action(text: impl Into<String>) -> Self {
        Self::new(CtcpKind::Action, Some(text.into()))
    }

    /// The body, or an empty string.
    pub fn body(&self) -> &str {
        self.params.as_deref().unwrap_or("")
    }
}

impl fmt::Display for CtcpOwned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CTCP_DELIM, self.kind)?;
        if let Some(ref params) = self.params {
            write!(f, " {}", params)?;
        }
        write!(f, "{}", CTCP_DELIM)
    }
}

#[cfg(feature = "serde")]
mod kind_serde {
    use super::CtcpKind;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(kind: &CtcpKind, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(kind.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<CtcpKind, D::Error> {
        let verb = String::deserialize(d)?;
        Ok(CtcpKind::parse(&verb))
    }
}
