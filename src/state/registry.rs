use std::collections::HashMap;

use chrono::Utc;

use crate::isupport::{Isupport, ServerSupport};
use crate::message::{Message, MessageKind};
use crate::mode::{parse_mode_change, ModeClass, ParsedMode};
use crate::prefix::Prefix;

use super::channel::Channel;
use super::user::{User, UserId};

/// A change to the set of known users, for collaborators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    UserCreated(UserId),
    /// Address or nickname changed.
    UserUpdated(UserId),
    /// The user is gone; the nickname it last had is kept for reference.
    UserRemoved { id: UserId, nick: String },
}

/// Result of [`Registry::apply_mode`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeOutcome {
    pub applied: Vec<ParsedMode>,
    /// Letters that were skipped: unknown to the server dialect, or missing
    /// their parameter.
    pub ignored: Vec<char>,
}

/// Users and channels as seen through protocol events.
///
/// Users live in an arena keyed by [`UserId`]; channels refer to members by
/// id, and users record which channels they are in. Both sides are only
/// changed together, here.
#[derive(Debug, Default)]
pub struct Registry {
    support: ServerSupport,
    own_nick: String,
    own_address: Option<String>,
    users: HashMap<UserId, User>,
    /// Folded nickname → user.
    nicks: HashMap<String, UserId>,
    /// Folded channel name → channel.
    channels: HashMap<String, Channel>,
    next_id: u64,
    events: Vec<RegistryEvent>,
    /// Users seen only as a message source, collected on the next apply.
    transient: Vec<UserId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The server dialect learned so far.
    pub fn support(&self) -> &ServerSupport {
        &self.support
    }

    pub fn own_nick(&self) -> &str {
        &self.own_nick
    }

    /// Record the nickname the server knows us by.
    pub fn set_own_nick(&mut self, nick: &str) {
        self.own_nick = nick.to_string();
        if !nick.is_empty() {
            let id = self.create_if_absent(&Prefix::new(nick, "", ""));
            if let Some(user) = self.users.get_mut(&id) {
                user.tracked = true;
            }
        }
    }

    /// `ident@host` the server shows for us, once seen.
    pub fn own_address(&self) -> Option<&str> {
        self.own_address.as_deref()
    }

    pub fn is_own_nick(&self, nick: &str) -> bool {
        !self.own_nick.is_empty() && self.support.casemapping.eq(nick, &self.own_nick)
    }

    /// Case-fold a nickname or channel name under the active mapping.
    pub fn fold(&self, name: &str) -> String {
        self.support.casemapping.fold(name)
    }

    /// Drain the queued [`RegistryEvent`]s.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    /// Forget everything learned from the current connection.
    ///
    /// Ids keep counting up so that ids from before are never reused.
    pub fn clear(&mut self) {
        self.support = ServerSupport::default();
        self.own_nick.clear();
        self.own_address = None;
        self.users.clear();
        self.nicks.clear();
        self.channels.clear();
        self.events.clear();
        self.transient.clear();
    }

    /// Look a user up by nickname, creating it if unknown.
    ///
    /// A known user whose address differs from `prefix` is updated. Creation
    /// and updates are queued as events.
    pub fn create_if_absent(&mut self, prefix: &Prefix) -> UserId {
        let key = self.fold(&prefix.nick);
        let is_own = self.is_own_nick(&prefix.nick);
        if is_own && prefix.has_address() {
            self.own_address = prefix.address();
        }

        if let Some(&id) = self.nicks.get(&key) {
            if let Some(user) = self.users.get_mut(&id) {
                if user.update_address(prefix) {
                    self.events.push(RegistryEvent::UserUpdated(id));
                }
            }
            return id;
        }

        self.next_id += 1;
        let id = UserId(self.next_id);
        let mut user = User::new(id, prefix);
        user.tracked = is_own;
        self.users.insert(id, user);
        self.nicks.insert(key, id);
        self.events.push(RegistryEvent::UserCreated(id));
        id
    }

    /// Look a channel up by name, creating it if unknown.
    pub fn confirm_channel(&mut self, name: &str) -> &mut Channel {
        let key = self.fold(name);
        self.channels.entry(key).or_insert_with(|| Channel::new(name))
    }

    pub fn find_user(&self, nick: &str) -> Option<&User> {
        self.find_user_id(nick).and_then(|id| self.users.get(&id))
    }

    pub fn find_user_id(&self, nick: &str) -> Option<UserId> {
        self.nicks.get(&self.fold(nick)).copied()
    }

    /// Find a user by `ident@host`, or by host alone.
    pub fn find_user_by_address(&self, address: &str) -> Option<&User> {
        let (ident, host) = match address.split_once('@') {
            Some((ident, host)) => (Some(ident), host),
            None => (None, address),
        };
        self.users.values().find(|u| {
            u.host.eq_ignore_ascii_case(host) && ident.map_or(true, |i| u.ident == i)
        })
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn find_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.fold(name))
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Channels a user is known to be in.
    pub fn user_channels(&self, id: UserId) -> impl Iterator<Item = &Channel> + '_ {
        self.users
            .get(&id)
            .into_iter()
            .flat_map(|u| u.channels.keys())
            .filter_map(|key| self.channels.get(key))
    }

    /// Members of a channel.
    pub fn channel_users(&self, name: &str) -> Vec<&User> {
        self.find_channel(name)
            .map(|c| c.members().filter_map(|id| self.users.get(&id)).collect())
            .unwrap_or_default()
    }

    /// Status letters `nick` holds on `channel`.
    pub fn status(&self, channel: &str, nick: &str) -> &[char] {
        match self.find_user(nick) {
            Some(user) => user.status(&self.fold(channel)),
            None => &[],
        }
    }

    /// Keep a user even when it shares no channel with us. Returns false
    /// if the nickname is unknown.
    pub fn track_user(&mut self, nick: &str) -> bool {
        match self.find_user_id(nick).and_then(|id| self.users.get_mut(&id)) {
            Some(user) => {
                user.tracked = true;
                true
            }
            None => false,
        }
    }

    /// Stop tracking a user, dropping it if it shares no channel with us.
    pub fn untrack_user(&mut self, nick: &str) {
        if self.is_own_nick(nick) {
            return;
        }
        if let Some(id) = self.find_user_id(nick) {
            if let Some(user) = self.users.get_mut(&id) {
                user.tracked = false;
            }
            self.collect(id);
        }
    }

    /// Apply a MODE change (`["+ov", "alice", "bob"]`) to a channel.
    ///
    /// Letters the dialect does not know, and status or list letters without
    /// their parameter, are skipped and reported in [`ModeOutcome::ignored`].
    pub fn apply_mode(&mut self, channel: &str, pieces: &[&str]) -> ModeOutcome {
        let modes = parse_mode_change(&self.support.modes, pieces);
        let key = self.fold(channel);
        self.confirm_channel(channel);

        let mut outcome = ModeOutcome::default();
        for mode in modes {
            let applied = match (mode.class, mode.param.as_deref()) {
                (None, _) => false,
                (Some(ModeClass::Status), None) => false,
                (Some(ModeClass::Status), Some(nick)) => {
                    let folded = self.fold(nick);
                    let member = self
                        .channels
                        .get(&key)
                        .and_then(|c| c.members.get(&folded).copied());
                    if let Some(user) = member.and_then(|id| self.users.get_mut(&id)) {
                        if mode.adding {
                            user.add_status(&key, mode.letter, &self.support.modes);
                        } else {
                            user.remove_status(&key, mode.letter);
                        }
                    }
                    true
                }
                (Some(_), _) => match self.channels.get_mut(&key) {
                    Some(chan) => chan.set_mode(&self.support.modes, &mode).is_ok(),
                    None => false,
                },
            };
            if applied {
                outcome.applied.push(mode);
            } else {
                outcome.ignored.push(mode.letter);
            }
        }
        outcome
    }

    /// Update the model from one parsed message.
    ///
    /// Users known only from the previous message's source are dropped
    /// first, unless they have since joined a shared channel or are tracked.
    pub fn apply(&mut self, msg: &Message) {
        for id in std::mem::take(&mut self.transient) {
            self.collect(id);
        }

        match msg.kind {
            MessageKind::Raw => self.apply_numeric(msg),
            MessageKind::Join => {
                if msg.source.nick.is_empty() || msg.target.is_empty() {
                    return;
                }
                if self.is_own_nick(&msg.source.nick) {
                    self.leave(&msg.target, &msg.source.nick);
                }
                self.join(&msg.target, &msg.source);
            }
            MessageKind::Part => {
                self.create_if_absent(&msg.source);
                self.leave(&msg.target, &msg.source.nick);
            }
            MessageKind::Kick => {
                if let Some(kicked) = &msg.kicked {
                    self.leave(&msg.target, kicked);
                }
            }
            MessageKind::Quit => self.quit(&msg.source.nick),
            MessageKind::Nick => {
                if let Some(new_nick) = msg.arg(0) {
                    self.rename(&msg.source, new_nick);
                }
            }
            MessageKind::Mode => {
                if self.support.is_channel(&msg.target) {
                    let pieces: Vec<&str> = msg.args.iter().skip(1).map(String::as_str).collect();
                    self.apply_mode(&msg.target, &pieces);
                }
            }
            MessageKind::Topic => {
                let topic = msg.arg(1).filter(|t| !t.is_empty()).map(str::to_string);
                self.confirm_channel(&msg.target).topic = topic;
            }
            MessageKind::Privmsg | MessageKind::Notice | MessageKind::Ctcp | MessageKind::CtcpResponse => {
                if msg.source.has_address() {
                    let id = self.create_if_absent(&msg.source);
                    if let Some(user) = self.users.get_mut(&id) {
                        user.last_active = Utc::now();
                    }
                    self.transient.push(id);
                }
            }
            _ => {}
        }
    }

    fn apply_numeric(&mut self, msg: &Message) {
        let args: Vec<&str> = msg.args.iter().map(String::as_str).collect();
        match msg.numeric {
            // RPL_WELCOME
            Some(1) => {
                if let Some(nick) = args.first() {
                    self.set_own_nick(nick);
                }
            }
            // RPL_ISUPPORT
            Some(5) => {
                if let Some(isupport) = Isupport::from_response_args(&args) {
                    let before = self.support.casemapping;
                    self.support.apply(&isupport);
                    if self.support.casemapping != before {
                        self.refold();
                    }
                }
            }
            // RPL_NOTOPIC
            Some(331) => {
                if let Some(channel) = args.get(1) {
                    self.confirm_channel(channel).topic = None;
                }
            }
            // RPL_TOPIC
            Some(332) => {
                if let (Some(channel), Some(topic)) = (args.get(1), args.get(2)) {
                    self.confirm_channel(channel).topic = Some(topic.to_string());
                }
            }
            // RPL_WHOREPLY: me channel ident host server nick flags :hops realname
            Some(352) => {
                if let (Some(channel), Some(ident), Some(host), Some(nick)) =
                    (args.get(1), args.get(2), args.get(3), args.get(5))
                {
                    let prefix = Prefix::new(*nick, *ident, *host);
                    if self.support.is_channel(channel) {
                        let flags = args.get(6).copied().unwrap_or("");
                        self.join(channel, &prefix);
                        self.add_symbols(channel, nick, flags);
                    } else {
                        self.create_if_absent(&prefix);
                    }
                }
            }
            // RPL_NAMREPLY: me symbol channel :names
            Some(353) => {
                if let (Some(channel), Some(names)) = (args.get(2), args.get(3)) {
                    for entry in names.split(' ').filter(|e| !e.is_empty()) {
                        let start = entry
                            .char_indices()
                            .find(|&(_, c)| self.support.modes.status_for_symbol(c).is_none())
                            .map_or(entry.len(), |(i, _)| i);
                        let (symbols, mask) = entry.split_at(start);
                        if mask.is_empty() {
                            continue;
                        }
                        let prefix = Prefix::parse(mask);
                        self.join(channel, &prefix);
                        self.add_symbols(channel, &prefix.nick, symbols);
                    }
                }
            }
            // RPL_BANLIST, RPL_EXCEPTLIST, RPL_INVITELIST
            Some(code @ (367 | 348 | 346)) => {
                let letter = match code {
                    367 => 'b',
                    348 => 'e',
                    _ => 'I',
                };
                if self.support.modes.classify(letter) != Some(ModeClass::List) {
                    return;
                }
                if let (Some(channel), Some(mask)) = (args.get(1), args.get(2)) {
                    self.confirm_channel(channel).add_mask(letter, mask);
                }
            }
            _ => {}
        }
    }

    /// Add `nick` to `channel`, creating either side as needed.
    fn join(&mut self, channel: &str, prefix: &Prefix) {
        let id = self.create_if_absent(prefix);
        let key = self.fold(channel);
        let folded = self.fold(&prefix.nick);
        self.confirm_channel(channel).members.insert(folded, id);
        if let Some(user) = self.users.get_mut(&id) {
            user.channels.entry(key).or_default();
        }
    }

    /// Grant the status letters for each status symbol in `symbols`.
    fn add_symbols(&mut self, channel: &str, nick: &str, symbols: &str) {
        let key = self.fold(channel);
        let Some(id) = self.find_user_id(nick) else {
            return;
        };
        let Some(user) = self.users.get_mut(&id) else {
            return;
        };
        for symbol in symbols.chars() {
            if let Some(letter) = self.support.modes.status_for_symbol(symbol) {
                user.add_status(&key, letter, &self.support.modes);
            }
        }
    }

    /// Remove `nick` from `channel`. When it is us, the channel is dropped.
    fn leave(&mut self, channel: &str, nick: &str) {
        let key = self.fold(channel);

        if self.is_own_nick(nick) {
            let Some(chan) = self.channels.remove(&key) else {
                return;
            };
            for id in chan.members.into_values() {
                if let Some(user) = self.users.get_mut(&id) {
                    user.channels.remove(&key);
                }
                self.collect(id);
            }
            return;
        }

        let folded = self.fold(nick);
        let removed = self
            .channels
            .get_mut(&key)
            .and_then(|chan| chan.members.remove(&folded));
        if let Some(id) = removed.or_else(|| self.find_user_id(nick)) {
            if let Some(user) = self.users.get_mut(&id) {
                user.channels.remove(&key);
            }
            self.collect(id);
        }
    }

    fn quit(&mut self, nick: &str) {
        if self.is_own_nick(nick) {
            return;
        }
        if let Some(id) = self.find_user_id(nick) {
            self.forget(id);
        }
    }

    /// Take a user out of every channel and drop it.
    fn forget(&mut self, id: UserId) {
        let Some(user) = self.users.get(&id) else {
            return;
        };
        let folded = self.fold(&user.nick);
        for key in user.channels.keys() {
            if let Some(chan) = self.channels.get_mut(key) {
                if chan.members.get(&folded) == Some(&id) {
                    chan.members.remove(&folded);
                }
            }
        }
        self.remove_user(id);
    }

    fn rename(&mut self, old: &Prefix, new_nick: &str) {
        if self.is_own_nick(new_nick) && !self.is_own_nick(&old.nick) {
            // our nickname cannot be taken from under us
            return;
        }
        let old_key = self.fold(&old.nick);
        let new_key = self.fold(new_nick);
        if self.is_own_nick(&old.nick) {
            self.own_nick = new_nick.to_string();
        }

        let Some(id) = self.nicks.remove(&old_key) else {
            let id = self.create_if_absent(&Prefix::new(new_nick, old.ident.as_str(), old.host.as_str()));
            self.transient.push(id);
            return;
        };
        // whoever held the new nickname before is gone
        if let Some(stale) = self.nicks.get(&new_key).copied().filter(|s| *s != id) {
            self.forget(stale);
        }
        self.nicks.insert(new_key.clone(), id);

        let Some(user) = self.users.get_mut(&id) else {
            return;
        };
        user.nick = new_nick.to_string();
        user.update_address(old);
        for key in user.channels.keys() {
            if let Some(chan) = self.channels.get_mut(key) {
                if chan.members.remove(&old_key).is_some() {
                    chan.members.insert(new_key.clone(), id);
                }
            }
        }
        self.events.push(RegistryEvent::UserUpdated(id));
    }

    /// Rebuild every lookup key from display names under the active mapping.
    fn refold(&mut self) {
        let mapping = self.support.casemapping;
        let mut rekeyed: HashMap<String, String> = HashMap::new();
        for (old_key, mut chan) in std::mem::take(&mut self.channels) {
            let key = mapping.fold(&chan.name);
            chan.members = chan
                .members
                .into_values()
                .filter_map(|id| self.users.get(&id).map(|u| (mapping.fold(&u.nick), id)))
                .collect();
            rekeyed.insert(old_key, key.clone());
            self.channels.insert(key, chan);
        }
        self.nicks = self.users.values().map(|u| (mapping.fold(&u.nick), u.id)).collect();
        for user in self.users.values_mut() {
            user.channels = std::mem::take(&mut user.channels)
                .into_iter()
                .map(|(key, statuses)| (rekeyed.get(&key).cloned().unwrap_or(key), statuses))
                .collect();
        }
    }

    /// Drop a user that shares no channel with us and is not tracked.
    fn collect(&mut self, id: UserId) {
        let idle = self
            .users
            .get(&id)
            .is_some_and(|u| u.channels.is_empty() && !u.tracked);
        if idle {
            self.remove_user(id);
        }
    }

    fn remove_user(&mut self, id: UserId) {
        if let Some(user) = self.users.remove(&id) {
            let key = self.fold(&user.nick);
            if self.nicks.get(&key) == Some(&id) {
                self.nicks.remove(&key);
            }
            self.events.push(RegistryEvent::UserRemoved { id, nick: user.nick });
        }
    }
}
