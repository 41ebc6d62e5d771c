//! Raw line → [`Message`].

use nom::{
    bytes::complete::take_till,
    character::complete::{char, space0},
    combinator::opt,
    sequence::{preceded, terminated},
    IResult,
};

use super::types::{Message, MessageKind};
use crate::ctcp::{CtcpKind, CtcpOwned};
use crate::error::MessageParseError;
use crate::isupport::ServerSupport;
use crate::prefix::Prefix;
use crate::util::trim_line_end;

/// Optional `@tags` word and the spaces after it.
fn tags(input: &str) -> IResult<&str, Option<&str>> {
    opt(terminated(
        preceded(char('@'), take_till(|c| c == ' ')),
        space0,
    ))(input)
}

/// Space-delimited words with their byte offsets.
fn words(s: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices() {
        if c == ' ' {
            if let Some(st) = start.take() {
                out.push((st, &s[st..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(st) = start {
        out.push((st, &s[st..]));
    }
    out
}

/// Text from word `n` to the end of the line.
fn rest_from<'a>(body: &'a str, words: &[(usize, &str)], n: usize) -> &'a str {
    words.get(n).map_or("", |&(offset, _)| &body[offset..])
}

/// Protocol arguments: middle words, then everything after ` :` as one.
fn irc_args(mut rest: &str) -> Vec<String> {
    let mut args = Vec::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            args.push(trailing.to_string());
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        args.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    args
}

/// Remove the colon that opens the trailing argument, wherever it starts.
fn strip_trailing_marker(rest: &str) -> String {
    let marker = rest
        .char_indices()
        .find(|&(i, c)| c == ':' && (i == 0 || rest.as_bytes()[i - 1] == b' '))
        .map(|(i, _)| i);
    match marker {
        Some(i) => format!("{}{}", &rest[..i], &rest[i + 1..]),
        None => rest.to_string(),
    }
}

/// Split `@#chan` into its status prefixes and the channel.
///
/// Takes the shortest run of status characters that leaves a channel name,
/// so a channel whose type character is also a status symbol (`&room`)
/// stays a plain channel.
fn split_status_target<'a>(target: &'a str, support: &ServerSupport) -> Option<(Vec<char>, &'a str)> {
    let mut statuses = Vec::new();
    for (idx, c) in target.char_indices() {
        if !support.statusmsg.contains(c) {
            break;
        }
        statuses.push(c);
        let channel = &target[idx + c.len_utf8()..];
        if support.is_channel(channel) {
            return Some((statuses, channel));
        }
    }
    None
}

impl Message {
    /// Parse a line using the default server dialect.
    ///
    /// ```
    /// use slirc_bot::{Message, MessageKind};
    ///
    /// let msg = Message::parse(":bob!b@host.example PRIVMSG #room :hello there").unwrap();
    /// assert_eq!(msg.kind, MessageKind::Privmsg);
    /// assert_eq!(msg.source.nick, "bob");
    /// assert!(msg.in_channel);
    /// assert_eq!(msg.response_target, "#room");
    /// assert_eq!(msg.params, ["hello", "there"]);
    /// ```
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        Self::parse_with(line, &ServerSupport::default())
    }

    /// Parse a line using the channel types and status prefixes the server
    /// advertised.
    ///
    /// Only an empty line is an error. Anything else yields a message, with
    /// fields left empty where the line did not supply them.
    pub fn parse_with(line: &str, support: &ServerSupport) -> Result<Self, MessageParseError> {
        let line = trim_line_end(line).trim_start_matches(' ');
        if line.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut msg = Message::empty(line);
        let (body, tags) = tags(line).unwrap_or((line, None));
        msg.tags = tags.map(str::to_string);

        let words = words(body);
        let Some(&(_, first)) = words.first() else {
            return Ok(msg);
        };

        if first.eq_ignore_ascii_case("PING") || first.eq_ignore_ascii_case("ERROR") {
            msg.verb = first.to_string();
            msg.kind = MessageKind::from_verb(first);
            msg.args = irc_args(&body[first.len()..]);
            msg.set_params(rest_from(body, &words, 1));
            return Ok(msg);
        }

        // servers always send a source; tolerate lines without one
        let verb_at = if first.starts_with(':') {
            msg.source = Prefix::parse(first);
            1
        } else {
            0
        };
        let Some(&(verb_offset, verb)) = words.get(verb_at) else {
            return Ok(msg);
        };
        msg.verb = verb.to_string();
        msg.kind = MessageKind::from_verb(verb);
        msg.args = irc_args(&body[verb_offset + verb.len()..]);

        let mut param_at = verb_at + 1;
        if !matches!(msg.kind, MessageKind::Quit | MessageKind::Nick) {
            if let Some(&(_, target)) = words.get(param_at) {
                msg.target = target.strip_prefix(':').unwrap_or(target).to_string();
                param_at += 1;
            }
        }
        if msg.kind == MessageKind::Kick {
            if let Some(&(_, kicked)) = words.get(param_at) {
                msg.kicked = Some(kicked.strip_prefix(':').unwrap_or(kicked).to_string());
                param_at += 1;
            }
        }
        if msg.kind == MessageKind::Notice {
            if let Some((statuses, channel)) = split_status_target(&msg.target, support) {
                msg.status_restriction = statuses;
                msg.target = channel.to_string();
            }
        }

        msg.in_channel = support.is_channel(&msg.target);
        msg.in_query = !msg.in_channel && matches!(msg.kind, MessageKind::Privmsg | MessageKind::Notice);
        msg.response_target = if msg.in_channel {
            msg.target.clone()
        } else {
            msg.source.nick.clone()
        };
        msg.set_params(rest_from(body, &words, param_at));

        match msg.kind {
            MessageKind::Privmsg => {
                if let Some(ctcp) = CtcpOwned::parse(&msg.param_string) {
                    if ctcp.kind == CtcpKind::Action {
                        msg.is_action = true;
                    } else {
                        msg.kind = MessageKind::Ctcp;
                    }
                    msg.set_text(ctcp.body().to_string());
                    msg.ctcp = Some(ctcp);
                }
            }
            MessageKind::Notice => {
                if let Some(ctcp) = CtcpOwned::parse(&msg.param_string) {
                    msg.kind = MessageKind::CtcpResponse;
                    msg.set_text(ctcp.body().to_string());
                    msg.ctcp = Some(ctcp);
                }
            }
            MessageKind::Raw => msg.numeric = verb.parse().ok(),
            _ => {}
        }

        Ok(msg)
    }

    fn set_params(&mut self, rest: &str) {
        self.set_text(strip_trailing_marker(rest));
    }

    fn set_text(&mut self, text: String) {
        self.params = text
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        self.param_string = text;
    }
}

impl std::str::FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_line_fails() {
        assert_eq!(Message::parse(""), Err(MessageParseError::EmptyMessage));
        assert_eq!(Message::parse("\r\n"), Err(MessageParseError::EmptyMessage));
        assert_eq!(Message::parse("   "), Err(MessageParseError::EmptyMessage));
    }

    #[test]
    fn test_privmsg_channel() {
        let msg = Message::parse(":bob!b@host.example PRIVMSG #room :hello there\r\n").unwrap();
        assert_eq!(msg.kind, MessageKind::Privmsg);
        assert_eq!(msg.source, Prefix::new("bob", "b", "host.example"));
        assert_eq!(msg.target, "#room");
        assert!(msg.in_channel);
        assert!(!msg.in_query);
        assert_eq!(msg.response_target, "#room");
        assert_eq!(msg.params, ["hello", "there"]);
        assert_eq!(msg.param_string, "hello there");
        assert_eq!(msg.args, ["#room", "hello there"]);
    }

    #[test]
    fn test_privmsg_query_replies_to_sender() {
        let msg = Message::parse(":bob!b@h PRIVMSG bot :hi").unwrap();
        assert!(!msg.in_channel);
        assert!(msg.in_query);
        assert_eq!(msg.response_target, "bob");
    }

    #[test]
    fn test_action() {
        let msg = Message::parse(":bob!b@h PRIVMSG #room :\x01ACTION waves\x01").unwrap();
        assert_eq!(msg.kind, MessageKind::Privmsg);
        assert!(msg.is_action);
        assert_eq!(msg.param_string, "waves");
        assert_eq!(msg.params, ["waves"]);
    }

    #[test]
    fn test_ctcp_request() {
        let msg = Message::parse(":bob!b@h PRIVMSG bot :\x01PING 12345\x01").unwrap();
        assert_eq!(msg.kind, MessageKind::Ctcp);
        let ctcp = msg.ctcp.as_ref().unwrap();
        assert_eq!(ctcp.kind, CtcpKind::Ping);
        assert_eq!(msg.param_string, "12345");
        assert!(!msg.is_action);
    }

    #[test]
    fn test_ctcp_response() {
        let msg = Message::parse(":bob!b@h NOTICE bot :\x01VERSION someclient 1.0\x01").unwrap();
        assert_eq!(msg.kind, MessageKind::CtcpResponse);
        assert_eq!(msg.ctcp.as_ref().unwrap().kind, CtcpKind::Version);
        assert_eq!(msg.param_string, "someclient 1.0");
    }

    #[test]
    fn test_status_restricted_notice() {
        let msg = Message::parse(":bob!b@h NOTICE @#room :ops only").unwrap();
        assert_eq!(msg.target, "#room");
        assert_eq!(msg.status_restriction, ['@']);
        assert!(msg.in_channel);
        assert_eq!(msg.response_target, "#room");

        let msg = Message::parse(":bob!b@h NOTICE %+#room :hi").unwrap();
        assert_eq!(msg.target, "#room");
        assert_eq!(msg.status_restriction, ['%', '+']);

        // '&' is both a channel type and a status symbol
        let msg = Message::parse(":bob!b@h NOTICE &room :hi").unwrap();
        assert_eq!(msg.target, "&room");
        assert!(msg.status_restriction.is_empty());
    }

    #[test]
    fn test_quit_and_nick_have_no_target() {
        let msg = Message::parse(":bob!b@h QUIT :Ping timeout").unwrap();
        assert_eq!(msg.kind, MessageKind::Quit);
        assert_eq!(msg.target, "");
        assert_eq!(msg.param_string, "Ping timeout");

        let msg = Message::parse(":bob!b@h NICK :robert").unwrap();
        assert_eq!(msg.kind, MessageKind::Nick);
        assert_eq!(msg.params, ["robert"]);
    }

    #[test]
    fn test_kick_records_victim() {
        let msg = Message::parse(":op!o@h KICK #room carol :behave").unwrap();
        assert_eq!(msg.kind, MessageKind::Kick);
        assert_eq!(msg.target, "#room");
        assert_eq!(msg.kicked.as_deref(), Some("carol"));
        assert_eq!(msg.param_string, "behave");
    }

    #[test]
    fn test_join_trailing_target() {
        let msg = Message::parse(":bob!b@h JOIN :#room").unwrap();
        assert_eq!(msg.target, "#room");
        assert!(msg.in_channel);
    }

    #[test]
    fn test_numeric() {
        let msg = Message::parse(":irc.example.net 353 bot = #room :@alice +bob carol").unwrap();
        assert_eq!(msg.kind, MessageKind::Raw);
        assert_eq!(msg.numeric, Some(353));
        assert!(msg.is_numeric(353));
        assert_eq!(msg.source.nick, "irc.example.net");
        assert_eq!(msg.target, "bot");
        assert_eq!(msg.params, ["=", "#room", "@alice", "+bob", "carol"]);
        assert_eq!(msg.args, ["bot", "=", "#room", "@alice +bob carol"]);
    }

    #[test]
    fn test_ping_and_error() {
        let msg = Message::parse("PING :irc.example.net").unwrap();
        assert_eq!(msg.kind, MessageKind::Ping);
        assert_eq!(msg.param_string, "irc.example.net");

        let msg = Message::parse("ERROR :Closing Link: bot (Quit)").unwrap();
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.param_string, "Closing Link: bot (Quit)");
    }

    #[test]
    fn test_tags_preserved() {
        let msg = Message::parse("@time=2024-01-01T00:00:00Z :bob!b@h PRIVMSG #room :hi").unwrap();
        assert_eq!(msg.tags.as_deref(), Some("time=2024-01-01T00:00:00Z"));
        assert_eq!(msg.source.nick, "bob");
        assert_eq!(msg.param_string, "hi");
    }

    #[test]
    fn test_bare_source() {
        let msg = Message::parse(":irc.example.net NOTICE * :*** Looking up your hostname").unwrap();
        assert_eq!(msg.source.nick, "irc.example.net");
        assert!(msg.source.ident.is_empty());
        assert!(msg.source.host.is_empty());
    }

    #[test]
    fn test_sourceless_line_degrades() {
        let msg = Message::parse("NOTICE AUTH :*** Checking ident").unwrap();
        assert_eq!(msg.kind, MessageKind::Notice);
        assert_eq!(msg.target, "AUTH");
        assert_eq!(msg.param_string, "*** Checking ident");
    }

    #[test]
    fn test_truncated_line_degrades() {
        let msg = Message::parse(":bob!b@h").unwrap();
        assert_eq!(msg.source.nick, "bob");
        assert_eq!(msg.verb, "");

        let msg = Message::parse(":bob!b@h PRIVMSG").unwrap();
        assert_eq!(msg.kind, MessageKind::Privmsg);
        assert_eq!(msg.target, "");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn test_custom_chantypes() {
        let mut support = ServerSupport::default();
        support.chantypes = "!".to_string();
        let msg = Message::parse_with(":bob!b@h PRIVMSG #room :hi", &support).unwrap();
        assert!(!msg.in_channel);
        assert_eq!(msg.response_target, "bob");
    }

    #[test]
    fn test_inner_colons_kept() {
        let msg = Message::parse(":bob!b@h PRIVMSG #room :see :) this").unwrap();
        assert_eq!(msg.param_string, "see :) this");
    }
}
