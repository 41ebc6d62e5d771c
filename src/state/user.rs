use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::mode::ModeClasses;
use crate::prefix::Prefix;

/// Stable handle to a user in the [`Registry`](super::Registry).
///
/// Ids are assigned sequentially and never reused, so a stale id simply
/// stops resolving once its user is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserId(pub(crate) u64);

impl UserId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A user the bot can currently see.
#[derive(Clone, Debug)]
pub struct User {
    pub(crate) id: UserId,
    pub(crate) nick: String,
    pub(crate) ident: String,
    pub(crate) host: String,
    pub(crate) last_active: DateTime<Utc>,
    pub(crate) tracked: bool,
    /// Folded channel name → status letters, highest rank first.
    pub(crate) channels: HashMap<String, Vec<char>>,
}

impl User {
    pub(crate) fn new(id: UserId, prefix: &Prefix) -> Self {
        Self {
            id,
            nick: prefix.nick.clone(),
            ident: prefix.ident.clone(),
            host: prefix.host.clone(),
            last_active: Utc::now(),
            tracked: false,
            channels: HashMap::new(),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `ident@host`, when known.
    pub fn address(&self) -> Option<String> {
        self.prefix().address()
    }

    pub fn prefix(&self) -> Prefix {
        Prefix::new(self.nick.as_str(), self.ident.as_str(), self.host.as_str())
    }

    /// When the user last spoke, or when they were first seen.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Tracked users survive leaving all shared channels.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    /// Number of known channels the user is in.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Status letters on a channel, given its folded name.
    pub fn status(&self, channel_key: &str) -> &[char] {
        self.channels.get(channel_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Update the address from `prefix`; true if it changed.
    pub(crate) fn update_address(&mut self, prefix: &Prefix) -> bool {
        if !prefix.has_address() || (self.ident == prefix.ident && self.host == prefix.host) {
            return false;
        }
        self.ident = prefix.ident.clone();
        self.host = prefix.host.clone();
        true
    }

    /// Add a status letter, keeping rank order and no duplicates.
    pub(crate) fn add_status(&mut self, channel_key: &str, letter: char, classes: &ModeClasses) {
        let statuses = self.channels.entry(channel_key.to_string()).or_default();
        if statuses.contains(&letter) {
            return;
        }
        let rank = classes.status_rank(letter).unwrap_or(usize::MAX);
        let at = statuses
            .iter()
            .position(|&s| classes.status_rank(s).unwrap_or(usize::MAX) > rank)
            .unwrap_or(statuses.len());
        statuses.insert(at, letter);
    }

    pub(crate) fn remove_status(&mut self, channel_key: &str, letter: char) {
        if let Some(statuses) = self.channels.get_mut(channel_key) {
            statuses.retain(|&s| s != letter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rank_order_and_dedup() {
        let classes = ModeClasses::default();
        let mut user = User::new(UserId(1), &Prefix::new("alice", "a", "h"));
        user.add_status("#room", 'v', &classes);
        user.add_status("#room", 'o', &classes);
        user.add_status("#room", 'o', &classes);
        assert_eq!(user.status("#room"), ['o', 'v']);

        user.remove_status("#room", 'o');
        assert_eq!(user.status("#room"), ['v']);
        assert!(user.status("#elsewhere").is_empty());
    }

    #[test]
    fn test_update_address() {
        let mut user = User::new(UserId(1), &Prefix::new("alice", "a", "h"));
        assert!(!user.update_address(&Prefix::new("alice", "a", "h")));
        assert!(!user.update_address(&Prefix::new("alice", "", "")));
        assert!(user.update_address(&Prefix::new("alice", "a", "elsewhere")));
        assert_eq!(user.address().as_deref(), Some("a@elsewhere"));
    }
}
