//! Output formatting: line limits and formatting carry-over.

use proptest::prelude::*;
use slirc_bot::colors::{FormatState, BOLD, COLOR, RESET};
use slirc_bot::encode::{self, payload_limit, split_payload};
use slirc_bot::util::MAX_LINE_LEN;
use slirc_bot::FormattedStringExt;

fn framed_len(nick: &str, address: &str, line: &str) -> usize {
    format!(":{}!{} {}\r\n", nick, address, line).len()
}

fn payload(line: &str) -> &str {
    line.splitn(3, ' ').nth(2).and_then(|p| p.strip_prefix(':')).unwrap_or("")
}

proptest! {
    #[test]
    fn every_line_fits(
        nick in "[a-z]{1,16}",
        host in "[a-z.]{1,63}",
        target in "#[a-z]{1,40}",
        text in "\\PC{0,2000}",
        is_action in any::<bool>(),
    ) {
        let address = format!("u@{}", host);
        for line in encode::format(&nick, &address, &target, &text, is_action) {
            prop_assert!(framed_len(&nick, &address, &line) <= MAX_LINE_LEN, "{} too long", line.len());
            prop_assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn plain_words_survive_splitting(
        words in prop::collection::vec("[a-zA-Z0-9]{1,20}", 1..300),
    ) {
        let text = words.join(" ");
        let lines = encode::format("bot", "bot@example.net", "#room", &text, false);
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| payload(l).split(' ')).collect();
        prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn chunks_respect_max(text in "[a-z ]{0,400}", max in 14usize..120) {
        for chunk in split_payload(&text, max) {
            prop_assert!(chunk.len() <= max);
        }
    }
}

#[test]
fn test_fitting_text_is_verbatim() {
    let text = format!("{}bold{} and  spaced", BOLD, BOLD);
    let lines = encode::format("bot", "b@h", "#room", &text, false);
    assert_eq!(lines, [format!("PRIVMSG #room :{}", text)]);
}

#[test]
fn test_limit_accounts_for_address() {
    let short = payload_limit("PRIVMSG", "bot", "b@h", "#room", false);
    let long = payload_limit("PRIVMSG", "bot", "bot@a.much.longer.host.example", "#room", false);
    assert_eq!(short - long, "bot@a.much.longer.host.example".len() - "b@h".len());
}

#[test]
fn test_color_and_underline_carried() {
    let text = format!("{}12\x1Fblue {}", COLOR, vec!["sky"; 200].join(" "));
    let lines = encode::format("bot", "b@h", "#room", &text, false);
    assert!(lines.len() > 1);

    let state = FormatState::after(payload(&lines[0]));
    assert!(!state.is_plain());
    for line in &lines[1..] {
        assert!(payload(line).starts_with(&state.prefix()));
    }
}

#[test]
fn test_reset_ends_carry() {
    let text = format!("{}loud{} {}", BOLD, RESET, vec!["quiet"; 150].join(" "));
    let lines = encode::format("bot", "b@h", "#room", &text, false);
    assert!(lines.len() > 1);
    assert!(payload(&lines[1]).starts_with("quiet"));
}

#[test]
fn test_strip_formatting_for_collaborators() {
    let text = format!("{}04,01red{} plain", COLOR, RESET);
    assert_eq!(text.strip_formatting(), "red plain");
}

#[test]
fn test_hard_split_never_cuts_color_code() {
    let word = format!("{}{}04,01{}", "a".repeat(19), COLOR, "b".repeat(40));
    let chunks = split_payload(&word, 20);

    assert_eq!(chunks[0], "a".repeat(19));
    for chunk in &chunks {
        assert!(chunk.len() <= 20);
        assert!(!chunk.ends_with(COLOR));
    }
    for chunk in &chunks[1..] {
        assert!(chunk.starts_with("\x0304,01"), "{:?} lost its color", chunk);
        assert!(!FormatState::after(chunk).is_plain());
    }
    let text: String = chunks.iter().map(|c| c.as_str().strip_formatting()).collect();
    assert_eq!(text, format!("{}{}", "a".repeat(19), "b".repeat(40)));
}
