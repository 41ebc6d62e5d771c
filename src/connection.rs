//! Connection lifecycle: connect, register, poll, send, reconnect.
//!
//! A [`Connection`] moves through
//! `Disconnected → Connecting → Connected → Disconnected`. Failures never
//! escape a send; they are logged and answered with a reconnect. Reads are
//! bounded by the poll interval so the event loop can service timers.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::ctcp::{CtcpKind, CtcpOwned, CTCP_DELIM};
use crate::encode;
use crate::error::ConnectError;
use crate::rotation::RotationList;
use crate::transport::{ServerAddress, Transport};
use crate::util::truncate_utf8_safe;

/// Longest host name assumed before the server has shown us our own.
const ASSUMED_HOST_LEN: usize = 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Registration details and timing.
#[derive(Clone, Debug)]
pub struct ConnectionSettings {
    pub username: String,
    pub realname: String,
    pub password: Option<String>,
    pub encoding: String,
    pub connect_timeout: Duration,
    /// Fixed wait after a failed connection attempt.
    pub reconnect_delay: Duration,
    /// Longest a single [`Connection::read`] waits for a line.
    pub poll_interval: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            username: "slirc".to_string(),
            realname: "slirc-bot".to_string(),
            password: None,
            encoding: "utf-8".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(15),
            poll_interval: Duration::from_millis(50),
        }
    }
}

pub struct Connection {
    servers: RotationList<ServerAddress>,
    nicknames: RotationList<String>,
    settings: ConnectionSettings,
    transport: Option<Transport>,
    state: ConnectionState,
    server: Option<ServerAddress>,
    nickname: String,
    own_address: Option<String>,
    /// Bumped on every successful connect.
    generation: u64,
    /// Full passes through the nickname list on this connection.
    nick_cycles: u32,
}

impl Connection {
    pub fn new(
        servers: RotationList<ServerAddress>,
        nicknames: RotationList<String>,
        settings: ConnectionSettings,
    ) -> Self {
        let nickname = nicknames.current().clone();
        Self {
            servers,
            nicknames,
            settings,
            transport: None,
            state: ConnectionState::Disconnected,
            server: None,
            nickname,
            own_address: None,
            generation: 0,
            nick_cycles: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while a stream is open and has not reached end of file.
    pub fn connected(&self) -> bool {
        self.transport.is_some() && self.state == ConnectionState::Connected
    }

    /// The server of the current connection.
    pub fn server(&self) -> Option<&ServerAddress> {
        self.server.as_ref()
    }

    pub fn servers(&self) -> &RotationList<ServerAddress> {
        &self.servers
    }

    pub fn nicknames(&self) -> &RotationList<String> {
        &self.nicknames
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// The nickname we registered with or were last renamed to.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Record a nickname the server assigned.
    pub fn set_nickname(&mut self, nick: &str) {
        self.nickname = nick.to_string();
    }

    pub fn own_address(&self) -> Option<&str> {
        self.own_address.as_deref()
    }

    pub fn set_own_address(&mut self, address: Option<&str>) {
        self.own_address = address.map(str::to_string);
    }

    /// Host part of our own address.
    pub fn own_host(&self) -> Option<&str> {
        self.own_address
            .as_deref()
            .and_then(|a| a.split_once('@'))
            .map(|(_, host)| host)
    }

    /// Changes whenever a new connection is established.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Connect to the current server and register.
    ///
    /// On failure the server list advances and the reconnect delay is
    /// waited out before returning, so callers can simply retry.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        self.disconnect();

        let server = self.servers.current().clone();
        self.state = ConnectionState::Connecting;
        info!(%server, "connecting");

        let transport = match Transport::connect(&server, self.settings.connect_timeout, &self.settings.encoding).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(%server, error = %e, "connection failed");
                self.abandon(&server).await;
                return Err(e);
            }
        };

        self.transport = Some(transport);
        self.server = Some(server.clone());
        self.state = ConnectionState::Connected;
        self.generation += 1;
        self.own_address = None;
        self.nicknames.reset();
        self.nick_cycles = 0;
        self.nickname = self.nicknames.current().clone();
        info!(%server, nick = %self.nickname, "connected");

        if let Err(source) = self.register().await {
            warn!(%server, error = %source, "registration failed");
            self.abandon(&server).await;
            return Err(ConnectError::Io {
                server: server.to_string(),
                source,
            });
        }
        Ok(())
    }

    async fn register(&mut self) -> std::io::Result<()> {
        if let Some(password) = self.settings.password.clone() {
            self.write_line(&format!("PASS {}", password)).await?;
        }
        let user = format!("USER {} 0 * :{}", self.settings.username, self.settings.realname);
        self.write_line(&user).await?;
        let nick = format!("NICK {}", self.nickname);
        self.write_line(&nick).await
    }

    /// Give up on `server`: move to the next one and wait out the delay.
    async fn abandon(&mut self, server: &ServerAddress) {
        self.disconnect();
        self.servers.advance();
        debug!(%server, next = %self.servers.current(), "trying next server");
        self.countdown().await;
    }

    async fn countdown(&self) {
        let delay = self.settings.reconnect_delay;
        for remaining in (1..=delay.as_secs()).rev() {
            info!("reconnecting in {}s", remaining);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        tokio::time::sleep(Duration::from_nanos(u64::from(delay.subsec_nanos()))).await;
    }

    /// Drop the stream. Reads return nothing and writes are discarded until
    /// the next successful [`connect`](Self::connect).
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!(server = ?self.server.as_ref().map(ToString::to_string), "disconnected");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Wait up to the poll interval for one line.
    ///
    /// End of stream or a read error disconnects.
    pub async fn read(&mut self) -> Option<String> {
        let transport = self.transport.as_mut()?;
        let result = tokio::time::timeout(self.settings.poll_interval, transport.read_line()).await;
        match result {
            Err(_elapsed) => None,
            Ok(Ok(Some(line))) => {
                trace!("<- {}", line);
                Some(line)
            }
            Ok(Ok(None)) => {
                info!("server closed the connection");
                self.disconnect();
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "read failed");
                self.disconnect();
                None
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        match self.transport.as_mut() {
            Some(transport) => {
                trace!("-> {}", line);
                transport.write_line(line).await
            }
            None => {
                debug!("not connected, dropping: {}", line);
                Ok(())
            }
        }
    }

    /// Send raw protocol text, one line per embedded newline.
    ///
    /// A write failure is logged and answered with one reconnect attempt;
    /// the remaining lines are dropped.
    pub async fn raw_send(&mut self, text: &str) {
        for line in text.split('\n').map(|l| l.trim_end_matches('\r')) {
            if line.is_empty() {
                continue;
            }
            if let Err(e) = self.write_line(line).await {
                warn!(error = %e, "write failed, reconnecting");
                self.disconnect();
                if let Err(e) = self.connect().await {
                    warn!(error = %e, "reconnect failed");
                }
                return;
            }
        }
    }

    fn address_for_limits(&self) -> String {
        match &self.own_address {
            Some(address) => address.clone(),
            None => format!("{}@{}", self.settings.username, "x".repeat(ASSUMED_HOST_LEN)),
        }
    }

    /// Send a chat message, split to fit the line limit.
    pub async fn send_message(&mut self, target: &str, text: &str, is_action: bool) {
        let lines = encode::format(&self.nickname, &self.address_for_limits(), target, text, is_action);
        self.raw_send(&lines.join("\n")).await;
    }

    pub async fn notice(&mut self, target: &str, text: &str) {
        let lines = encode::format_with_verb("NOTICE", &self.nickname, &self.address_for_limits(), target, text, false);
        self.raw_send(&lines.join("\n")).await;
    }

    /// First line of `text`, cut to what fits in a CTCP frame sent with
    /// `verb` after `reserved` bytes of the frame are taken.
    fn ctcp_text<'t>(&self, verb: &str, target: &str, text: &'t str, reserved: usize) -> &'t str {
        let line = text.split(['\r', '\n']).next().unwrap_or_default();
        let limit = encode::payload_limit(verb, &self.nickname, &self.address_for_limits(), target, false);
        // both delimiters
        truncate_utf8_safe(line, limit.saturating_sub(2 + reserved))
    }

    /// Send a CTCP request; `text` is the verb and its arguments.
    pub async fn ctcp(&mut self, target: &str, text: &str) {
        let text = self.ctcp_text("PRIVMSG", target, text, 0);
        self.raw_send(&format!("PRIVMSG {} :{}{}{}", target, CTCP_DELIM, text, CTCP_DELIM))
            .await;
    }

    /// Answer a CTCP request.
    pub async fn ctcp_reply(&mut self, target: &str, kind: &str, body: &str) {
        let kind = CtcpKind::parse(kind);
        // verb and the space after it
        let body = self.ctcp_text("NOTICE", target, body, kind.as_str().len() + 1);
        let params = (!body.is_empty()).then(|| body.to_string());
        let reply = CtcpOwned::new(kind, params);
        self.raw_send(&format!("NOTICE {} :{}", target, reply)).await;
    }

    pub async fn join(&mut self, channel: &str) {
        self.raw_send(&format!("JOIN {}", channel)).await;
    }

    pub async fn part(&mut self, channel: &str, reason: Option<&str>) {
        match reason {
            Some(reason) => self.raw_send(&format!("PART {} :{}", channel, reason)).await,
            None => self.raw_send(&format!("PART {}", channel)).await,
        }
    }

    pub async fn quit(&mut self, reason: Option<&str>) {
        match reason {
            Some(reason) => self.raw_send(&format!("QUIT :{}", reason)).await,
            None => self.raw_send("QUIT").await,
        }
    }

    pub async fn change_nick(&mut self, nick: &str) {
        self.nickname = nick.to_string();
        self.raw_send(&format!("NICK {}", nick)).await;
    }

    /// Try the next configured nickname, e.g. after it was reported in use.
    ///
    /// Once every configured nickname has been refused, each further pass
    /// appends the pass number (`bot1`, `bot_1`, `bot2`, ...).
    pub async fn next_nickname(&mut self) -> String {
        let base = self.nicknames.advance().clone();
        if self.nicknames.at_start() {
            self.nick_cycles += 1;
            warn!(pass = self.nick_cycles, "all nicknames in use, adding a suffix");
        }
        let nick = match self.nick_cycles {
            0 => base,
            n => format!("{}{}", base, n),
        };
        self.change_nick(&nick).await;
        nick
    }

    /// Prefer the current server and nickname on future connects.
    pub fn promote_current(&mut self) {
        if let Some(server) = self.server.clone() {
            if let Err(e) = self.servers.promote(&server) {
                debug!(error = %e, "server not promoted");
            }
        }
        let nick = self.nickname.clone();
        if let Err(e) = self.nicknames.promote(&nick) {
            debug!(error = %e, "nickname not promoted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(nicks: &[&str]) -> Connection {
        let servers = RotationList::new([ServerAddress::new("irc.one.example", 6667), ServerAddress::new("irc.two.example", 6667)])
            .unwrap();
        let nicks = RotationList::new(nicks.iter().map(|n| n.to_string())).unwrap();
        let settings = ConnectionSettings {
            reconnect_delay: Duration::ZERO,
            ..ConnectionSettings::default()
        };
        Connection::new(servers, nicks, settings)
    }

    #[tokio::test]
    async fn test_abandon_moves_to_next_server() {
        let mut conn = connection(&["bot"]);
        let first = conn.servers().current().clone();
        conn.abandon(&first).await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.servers().current().host, "irc.two.example");
    }

    #[tokio::test]
    async fn test_nicknames_get_suffix_after_full_pass() {
        let mut conn = connection(&["bot", "bot_"]);
        let mut tried = Vec::new();
        for _ in 0..5 {
            tried.push(conn.next_nickname().await);
        }
        assert_eq!(tried, ["bot_", "bot1", "bot_1", "bot2", "bot_2"]);
        assert_eq!(conn.nickname(), "bot_2");
    }

    #[test]
    fn test_ctcp_text_single_line_within_limit() {
        let conn = connection(&["bot"]);
        assert_eq!(conn.ctcp_text("NOTICE", "alice", "x\r\nQUIT :gone", 5), "x");

        let long = "y".repeat(600);
        let text = conn.ctcp_text("PRIVMSG", "alice", &long, 0);
        let framed = format!(":bot!{} PRIVMSG alice :\x01{}\x01\r\n", conn.address_for_limits(), text);
        assert_eq!(framed.len(), 512);
    }
}
