//! The event loop tying connection, registry and collaborators together.
//!
//! Each [`Client::tick`] polls the socket once (bounded by the poll
//! interval), handles at most one line and fires due timers. Everything runs
//! on one task; collaborators never see the connection directly.

use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::config::{Config, ConfigError};
use crate::connection::Connection;
use crate::dispatch::{Dispatcher, Event, EventKey, HandlerId, Outbound, Outbox};
use crate::handlers::{AutoJoin, CtcpResponder};
use crate::message::{Message, MessageKind};
use crate::state::Registry;
use crate::timer::TimerQueue;

pub struct Client {
    connection: Connection,
    registry: Registry,
    dispatcher: Dispatcher,
    timers: TimerQueue<(HandlerId, u64)>,
    prefixes: Vec<String>,
    /// RPL_WELCOME seen on the current connection.
    registered: bool,
    /// A connection was up the last time we looked.
    online: bool,
    /// Connection generation the registry was built from.
    session: u64,
    quitting: bool,
}

impl Client {
    pub fn new(connection: Connection, dispatcher: Dispatcher, prefixes: Vec<String>) -> Self {
        Self {
            connection,
            registry: Registry::new(),
            dispatcher,
            timers: TimerQueue::new(),
            prefixes,
            registered: false,
            online: false,
            session: 0,
            quitting: false,
        }
    }

    /// Build a client with the built-in collaborators wired up.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let connection = Connection::new(config.servers()?, config.nicknames()?, config.connection_settings());

        let mut dispatcher = Dispatcher::new();
        let ctcp = dispatcher.register(Box::new(CtcpResponder::new(config.version.clone())));
        dispatcher.subscribe(ctcp, EventKey::Message(MessageKind::Ctcp));
        dispatcher.set_first(ctcp);

        let autojoin = dispatcher.register(Box::new(AutoJoin::new(config.channels.clone())));
        dispatcher.subscribe(autojoin, EventKey::Connect);

        Ok(Self::new(connection, dispatcher, config.commands.prefixes.clone()))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn registered(&self) -> bool {
        self.registered
    }

    /// Run until a quit has been sent and the server closed the connection.
    pub async fn run(&mut self) {
        while !(self.quitting && !self.connection.connected()) {
            self.tick().await;
        }
        info!("client stopped");
    }

    /// One pass of the loop.
    pub async fn tick(&mut self) {
        if !self.connection.connected() {
            self.sync_session().await;
            if self.quitting {
                return;
            }
            if self.connection.connect().await.is_ok() {
                self.sync_session().await;
            }
            return;
        }

        if let Some(line) = self.connection.read().await {
            self.handle_line(&line).await;
        }
        self.fire_timers().await;
        self.sync_session().await;
    }

    /// Send QUIT; [`run`](Self::run) returns once the server hangs up.
    pub async fn quit(&mut self, reason: Option<&str>) {
        self.quitting = true;
        self.connection.quit(reason).await;
    }

    /// Notice lost or replaced connections and reset per-connection state.
    async fn sync_session(&mut self) {
        let connected = self.connection.connected();
        let generation = self.connection.generation();

        if self.online && (!connected || generation != self.session) {
            info!("connection lost, dropping state");
            self.online = false;
            self.registered = false;
            self.registry.clear();
            let mut outbox = Outbox::default();
            self.dispatcher
                .dispatch(Event::Disconnect, &self.registry, self.connection.nickname(), &mut outbox);
            self.flush(outbox).await;
        }

        if connected && !self.online {
            self.online = true;
            self.session = self.connection.generation();
        }
    }

    /// Handle one received line.
    pub async fn handle_line(&mut self, line: &str) {
        let mut msg = match Message::parse_with(line, self.registry.support()) {
            Ok(msg) => msg,
            Err(e) => {
                trace!(error = %e, "skipping line");
                return;
            }
        };

        let mut welcomed = false;
        match msg.kind {
            MessageKind::Ping => {
                self.connection.raw_send(&format!("PONG :{}", msg.param_string)).await;
            }
            MessageKind::Error => {
                warn!(reason = %msg.param_string, "server error");
            }
            MessageKind::Nick if self.registry.is_own_nick(msg.nick()) => {
                if let Some(nick) = msg.arg(0) {
                    info!(nick, "nickname changed");
                    self.connection.set_nickname(nick);
                }
            }
            MessageKind::Raw => match msg.numeric {
                // ERR_NICKNAMEINUSE
                Some(433) if !self.registered => {
                    let nick = self.connection.next_nickname().await;
                    info!(%nick, "nickname in use, trying another");
                }
                // RPL_WELCOME
                Some(1) => {
                    if let Some(nick) = msg.arg(0) {
                        self.connection.set_nickname(nick);
                    }
                    self.connection.promote_current();
                    self.registered = true;
                    welcomed = true;
                    info!(nick = %self.connection.nickname(), "registered");
                }
                _ => {}
            },
            _ => {}
        }

        self.registry.apply(&msg);
        if self.registry.own_address().is_some() {
            self.connection.set_own_address(self.registry.own_address());
        }
        if msg.parse_command(&self.prefixes) {
            debug!(command = ?msg.command, from = %msg.nick(), "command");
        }

        let mut outbox = Outbox::default();
        let nickname = self.connection.nickname();
        for event in self.registry.take_events() {
            self.dispatcher
                .dispatch(Event::Registry(&event), &self.registry, nickname, &mut outbox);
        }
        if welcomed {
            self.dispatcher
                .dispatch(Event::Connect, &self.registry, nickname, &mut outbox);
        }
        self.dispatcher
            .dispatch(Event::Message(&mut msg), &self.registry, nickname, &mut outbox);

        self.flush(outbox).await;
    }

    async fn fire_timers(&mut self) {
        let due = self.timers.pop_due(Instant::now());
        if due.is_empty() {
            return;
        }
        let mut outbox = Outbox::default();
        for (id, token) in due {
            self.dispatcher
                .dispatch_timer(id, token, &self.registry, self.connection.nickname(), &mut outbox);
        }
        self.flush(outbox).await;
    }

    async fn flush(&mut self, outbox: Outbox) {
        let now = Instant::now();
        for (id, delay, token) in outbox.schedules {
            self.timers.schedule(now, delay, (id, token));
        }

        for action in outbox.actions {
            match action {
                Outbound::Raw(text) => self.connection.raw_send(&text).await,
                Outbound::Message {
                    target,
                    text,
                    is_action,
                } => self.connection.send_message(&target, &text, is_action).await,
                Outbound::Notice { target, text } => self.connection.notice(&target, &text).await,
                Outbound::Ctcp { target, text } => self.connection.ctcp(&target, &text).await,
                Outbound::CtcpReply { target, kind, body } => {
                    self.connection.ctcp_reply(&target, &kind, &body).await
                }
                Outbound::Join(channel) => self.connection.join(&channel).await,
                Outbound::Part { channel, reason } => self.connection.part(&channel, reason.as_deref()).await,
                Outbound::Quit(reason) => self.quit(reason.as_deref()).await,
                Outbound::Nick(nick) => self.connection.change_nick(&nick).await,
            }
        }
    }
}
