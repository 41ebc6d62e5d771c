//! Command detection on chat messages.

use super::types::{Message, MessageKind};

impl Message {
    /// Detect a bot command in a chat message.
    ///
    /// Only PRIVMSG text that is not an action is considered. The longest
    /// prefix in `prefixes` that opens the text is stripped; in a private
    /// query a message with no matching prefix is a command as-is. The first
    /// word becomes the lowercased command, the rest its parameters. A prefix
    /// followed by nothing or by whitespace is not a command.
    ///
    /// Returns `is_command`; running it again recomputes the fields.
    ///
    /// ```
    /// use slirc_bot::Message;
    ///
    /// let mut msg = Message::parse(":bob!b@h PRIVMSG #room :!Roll 2d6").unwrap();
    /// assert!(msg.parse_command(&["!"]));
    /// assert_eq!(msg.command.as_deref(), Some("roll"));
    /// assert_eq!(msg.command_params, ["2d6"]);
    /// ```
    pub fn parse_command<S: AsRef<str>>(&mut self, prefixes: &[S]) -> bool {
        self.is_command = false;
        self.command = None;
        self.command_params.clear();

        if self.kind != MessageKind::Privmsg || self.is_action {
            return false;
        }

        let text = self.param_string.trim_start_matches(' ');
        let matched = prefixes
            .iter()
            .map(|p| -> &str { p.as_ref() })
            .filter(|p| !p.is_empty() && text.starts_with(*p))
            .max_by_key(|p| p.len());

        let body = match matched {
            Some(prefix) => {
                let body = &text[prefix.len()..];
                if body.starts_with(char::is_whitespace) {
                    return false;
                }
                body
            }
            None if self.in_query => text,
            None => return false,
        };

        let mut words = body.split_whitespace();
        let Some(name) = words.next() else {
            return false;
        };

        self.command = Some(name.to_lowercase());
        self.command_params = words.map(str::to_string).collect();
        self.is_command = true;
        true
    }
}
