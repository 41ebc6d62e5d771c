//! Parsed message types.

use std::fmt;
use std::str::FromStr;

use crate::ctcp::CtcpOwned;
use crate::prefix::Prefix;

/// The event type of a parsed line.
///
/// Verbs the core acts on get their own variant; anything else is kept
/// lowercased in [`MessageKind::Other`]. `Ctcp`, `CtcpResponse` and `Raw`
/// are synthetic: CTCP requests carried by PRIVMSG, CTCP replies carried by
/// NOTICE, and three-digit numeric replies.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    Privmsg,
    Notice,
    Ctcp,
    CtcpResponse,
    Join,
    Part,
    Quit,
    Nick,
    Kick,
    Mode,
    Topic,
    Invite,
    Ping,
    Pong,
    Error,
    Raw,
    Other(String),
}

impl MessageKind {
    /// Classify a wire verb.
    pub fn from_verb(verb: &str) -> Self {
        if !verb.is_empty() && verb.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Raw;
        }
        match verb.to_ascii_lowercase().as_str() {
            "privmsg" => Self::Privmsg,
            "notice" => Self::Notice,
            "join" => Self::Join,
            "part" => Self::Part,
            "quit" => Self::Quit,
            "nick" => Self::Nick,
            "kick" => Self::Kick,
            "mode" => Self::Mode,
            "topic" => Self::Topic,
            "invite" => Self::Invite,
            "ping" => Self::Ping,
            "pong" => Self::Pong,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    /// The event name collaborators subscribe to.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Privmsg => "privmsg",
            Self::Notice => "notice",
            Self::Ctcp => "ctcp",
            Self::CtcpResponse => "ctcpResponse",
            Self::Join => "join",
            Self::Part => "part",
            Self::Quit => "quit",
            Self::Nick => "nick",
            Self::Kick => "kick",
            Self::Mode => "mode",
            Self::Topic => "topic",
            Self::Invite => "invite",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Error => "error",
            Self::Raw => "raw",
            Self::Other(verb) => verb,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = std::convert::Infallible;

    /// Accepts event names as well as wire verbs, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "ctcp" => Self::Ctcp,
            "ctcpresponse" => Self::CtcpResponse,
            "raw" => Self::Raw,
            other => Self::from_verb(other),
        })
    }
}

/// One parsed protocol line.
///
/// Built by [`Message::parse`]. Fields are public for reading; after
/// construction only the command pass ([`Message::parse_command`]) and the
/// responded marker ([`Message::mark_responded`]) change it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// The line as received, without terminator.
    pub raw: String,
    /// IRCv3 tags, unparsed and without the leading `@`.
    pub tags: Option<String>,
    pub kind: MessageKind,
    /// The verb exactly as sent (`PRIVMSG`, `353`).
    pub verb: String,
    /// Numeric code when `kind` is [`MessageKind::Raw`].
    pub numeric: Option<u16>,
    pub source: Prefix,
    pub target: String,
    /// Where a reply goes: the channel, or the sender for private messages.
    pub response_target: String,
    pub in_channel: bool,
    pub in_query: bool,
    /// Protocol arguments after the verb, trailing argument kept whole.
    pub args: Vec<String>,
    /// Whitespace-split words of [`param_string`](Self::param_string).
    pub params: Vec<String>,
    /// Text after the target, with the trailing-argument colon removed.
    pub param_string: String,
    /// CTCP verb and body for `Ctcp` / `CtcpResponse` messages.
    pub ctcp: Option<CtcpOwned>,
    pub is_action: bool,
    /// Nickname removed by a KICK.
    pub kicked: Option<String>,
    /// Status prefixes a notice was restricted to (`@#chan` → `['@']`).
    pub status_restriction: Vec<char>,
    pub is_command: bool,
    /// Lowercased command word, set by the command pass.
    pub command: Option<String>,
    pub command_params: Vec<String>,
    pub(crate) responded: Option<String>,
}

impl Message {
    pub(crate) fn empty(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            tags: None,
            kind: MessageKind::Other(String::new()),
            verb: String::new(),
            numeric: None,
            source: Prefix::default(),
            target: String::new(),
            response_target: String::new(),
            in_channel: false,
            in_query: false,
            args: Vec::new(),
            params: Vec::new(),
            param_string: String::new(),
            ctcp: None,
            is_action: false,
            kicked: None,
            status_restriction: Vec::new(),
            is_command: false,
            command: None,
            command_params: Vec::new(),
            responded: None,
        }
    }

    /// Sender nickname (or server name).
    pub fn nick(&self) -> &str {
        &self.source.nick
    }

    /// True for the numeric reply `code`.
    pub fn is_numeric(&self, code: u16) -> bool {
        self.numeric == Some(code)
    }

    /// Protocol argument `n`, if present.
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.args.get(n).map(String::as_str)
    }

    /// Record that `command` handled this message.
    pub fn mark_responded(&mut self, command: impl Into<String>) {
        self.responded = Some(command.into());
    }

    /// The command that handled this message, if any.
    pub fn responded(&self) -> Option<&str> {
        self.responded.as_deref()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_verb() {
        assert_eq!(MessageKind::from_verb("PRIVMSG"), MessageKind::Privmsg);
        assert_eq!(MessageKind::from_verb("353"), MessageKind::Raw);
        assert_eq!(MessageKind::from_verb("WALLOPS"), MessageKind::Other("wallops".into()));
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            MessageKind::Privmsg,
            MessageKind::Ctcp,
            MessageKind::CtcpResponse,
            MessageKind::Raw,
            MessageKind::Kick,
        ] {
            assert_eq!(kind.as_str().parse::<MessageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_mark_responded() {
        let mut msg = Message::empty(":a!b@c PRIVMSG #x :!roll");
        assert_eq!(msg.responded(), None);
        msg.mark_responded("roll");
        assert_eq!(msg.responded(), Some("roll"));
    }
}
