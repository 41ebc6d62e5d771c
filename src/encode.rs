//! Outgoing text → protocol-legal wire lines.
//!
//! The server relays our lines to other clients prefixed with
//! `:nick!ident@host `, so the room left for text depends on our own
//! nickname and address as well as the verb and target. Text that does not
//! fit is split on word boundaries; each continuation line starts with the
//! control codes needed to restore the formatting active where the previous
//! line stopped.
//!
//! # Example
//!
//! ```
//! use slirc_bot::encode;
//!
//! let lines = encode::format("bot", "bot@example.net", "#room", "hello\nworld", false);
//! assert_eq!(lines, ["PRIVMSG #room :hello", "PRIVMSG #room :world"]);
//! ```

use crate::colors::{first_token_len, truncate_at_token, FormatState};
use crate::ctcp::CTCP_DELIM;
use crate::util::{first_char_len, LINE_TERMINATOR, MAX_LINE_LEN};

/// `\x01ACTION ` plus the closing `\x01`.
const ACTION_OVERHEAD: usize = 9;

/// Longest control-code prefix [`FormatState::prefix`] can produce, plus
/// room for one character.
const MIN_CONTINUATION_ROOM: usize = 14;

/// Bytes available for text in one line relayed as
/// `:nick!address VERB target :text\r\n`.
///
/// Never less than one byte.
pub fn payload_limit(verb: &str, nickname: &str, own_address: &str, target: &str, is_action: bool) -> usize {
    let overhead = 1 // ':'
        + nickname.len()
        + 1 // '!'
        + own_address.len()
        + 1 // ' '
        + verb.len()
        + 1 // ' '
        + target.len()
        + 2 // " :"
        + LINE_TERMINATOR.len()
        + if is_action { ACTION_OVERHEAD } else { 0 };
    MAX_LINE_LEN.saturating_sub(overhead).max(1)
}

/// Format a PRIVMSG (or an action, when `is_action`) into wire lines
/// without terminators.
pub fn format(nickname: &str, own_address: &str, target: &str, text: &str, is_action: bool) -> Vec<String> {
    format_with_verb("PRIVMSG", nickname, own_address, target, text, is_action)
}

/// [`format`] with an explicit verb, e.g. `NOTICE`.
///
/// Each line of `text` is an independent message; empty lines are dropped.
pub fn format_with_verb(
    verb: &str,
    nickname: &str,
    own_address: &str,
    target: &str,
    text: &str,
    is_action: bool,
) -> Vec<String> {
    let max = payload_limit(verb, nickname, own_address, target, is_action);

    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .flat_map(|line| split_payload(line, max))
        .map(|chunk| frame(verb, target, &chunk, is_action))
        .collect()
}

fn frame(verb: &str, target: &str, text: &str, is_action: bool) -> String {
    if is_action {
        format!("{} {} :{}ACTION {}{}", verb, target, CTCP_DELIM, text, CTCP_DELIM)
    } else {
        format!("{} {} :{}", verb, target, text)
    }
}

/// Formatting codes that resume the style active at the end of `previous`.
fn continuation(previous: &str, max: usize) -> String {
    if max < MIN_CONTINUATION_ROOM {
        return String::new();
    }
    FormatState::after(previous).prefix()
}

/// Split one logical line into chunks of at most `max` bytes.
///
/// Text that fits is returned untouched. Otherwise words are packed
/// greedily, single words longer than a line are cut on a character
/// boundary, and every chunk after the first opens with the continuation
/// prefix computed from the chunk before it.
pub fn split_payload(text: &str, max: usize) -> Vec<String> {
    if text.len() <= max {
        return vec![text.to_string()];
    }

    let mut out: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut has_words = false;

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        if has_words {
            if line.len() + 1 + word.len() <= max {
                line.push(' ');
                line.push_str(word);
                continue;
            }
            line = flush(&mut out, line, max);
        }

        let mut word = word;
        while line.len() + word.len() > max {
            let room = max.saturating_sub(line.len());
            let mut head = truncate_at_token(word, room);
            if head.is_empty() {
                if !line.is_empty() {
                    // no room next to the continuation prefix
                    line.clear();
                    continue;
                }
                let token_len = first_token_len(word);
                head = if token_len <= max {
                    &word[..token_len]
                } else {
                    &word[..first_char_len(word)]
                };
            }
            line.push_str(head);
            word = &word[head.len()..];
            line = flush(&mut out, line, max);
        }
        line.push_str(word);
        has_words = !word.is_empty();
    }

    if has_words {
        out.push(line);
    }
    out
}

/// Emit `line` and start the next one.
fn flush(out: &mut Vec<String>, line: String, max: usize) -> String {
    let next = continuation(&line, max);
    out.push(line);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BOLD, COLOR};

    fn framed_len(nick: &str, addr: &str, line: &str) -> usize {
        format!(":{}!{} {}\r\n", nick, addr, line).len()
    }

    #[test]
    fn test_short_message_verbatim() {
        let lines = format("bot", "b@h", "#room", "hi  there", false);
        assert_eq!(lines, ["PRIVMSG #room :hi  there"]);
    }

    #[test]
    fn test_action_envelope() {
        let lines = format("bot", "b@h", "#room", "waves", true);
        assert_eq!(lines, ["PRIVMSG #room :\x01ACTION waves\x01"]);
    }

    #[test]
    fn test_notice_verb() {
        let lines = format_with_verb("NOTICE", "bot", "b@h", "bob", "psst", false);
        assert_eq!(lines, ["NOTICE bob :psst"]);
    }

    #[test]
    fn test_newlines_split_and_empty_dropped() {
        let lines = format("bot", "b@h", "#room", "one\r\n\ntwo\n", false);
        assert_eq!(lines, ["PRIVMSG #room :one", "PRIVMSG #room :two"]);
        assert!(format("bot", "b@h", "#room", "\n\n", false).is_empty());
    }

    #[test]
    fn test_payload_limit() {
        // 512 - (1 + 3 + 1 + 3 + 1 + 7 + 1 + 5 + 2 + 2)
        assert_eq!(payload_limit("PRIVMSG", "bot", "b@h", "#room", false), 486);
        assert_eq!(payload_limit("PRIVMSG", "bot", "b@h", "#room", true), 477);
        let huge = "x".repeat(600);
        assert_eq!(payload_limit("PRIVMSG", &huge, "b@h", "#room", false), 1);
    }

    #[test]
    fn test_long_message_split_within_limit() {
        let text = vec!["word"; 300].join(" ");
        let lines = format("bot", "bot@host.example", "#room", &text, false);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(framed_len("bot", "bot@host.example", line) <= MAX_LINE_LEN);
        }
        let words: Vec<&str> = lines
            .iter()
            .flat_map(|l| l.splitn(3, ' ').nth(2).unwrap_or("")[1..].split(' '))
            .collect();
        assert_eq!(words.len(), 300);
    }

    #[test]
    fn test_bold_carried_to_continuation() {
        let text = format!("{}{}", BOLD, vec!["bold"; 200].join(" "));
        let lines = format("bot", "b@h", "#room", &text, false);
        assert!(lines.len() >= 2);
        assert!(lines[1].starts_with(&format!("PRIVMSG #room :{}", BOLD)));
    }

    #[test]
    fn test_color_carried_zero_padded() {
        let text = format!("{}4,1{}", COLOR, vec!["red"; 200].join(" "));
        let lines = format("bot", "b@h", "#room", &text, false);
        assert!(lines[1].starts_with("PRIVMSG #room :\x0304,01red"));
    }

    #[test]
    fn test_reset_not_carried() {
        let chunks = split_payload(&format!("{}a{} {}", BOLD, '\x0F', "b".repeat(20)), 16);
        assert_eq!(chunks[0], "\x02a\x0f");
        assert!(!chunks[1].starts_with(BOLD));
    }

    #[test]
    fn test_hard_split_long_word() {
        let chunks = split_payload(&"x".repeat(25), 10);
        assert_eq!(chunks, ["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn test_hard_split_respects_utf8() {
        let chunks = split_payload(&"日".repeat(10), 14);
        assert!(chunks.iter().all(|c| c.len() <= 14));
        assert_eq!(chunks.concat(), "日".repeat(10));
    }

    #[test]
    fn test_action_split_keeps_envelope() {
        let text = vec!["dance"; 150].join(" ");
        let lines = format("bot", "b@h", "#room", &text, true);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.starts_with("PRIVMSG #room :\x01ACTION "));
            assert!(line.ends_with('\x01'));
            assert!(framed_len("bot", "b@h", line) <= MAX_LINE_LEN);
        }
    }
}
