//! Routing of events to collaborators.
//!
//! Collaborators implement [`Handler`] and subscribe to [`EventKey`]s. They
//! run synchronously on the event loop, read the [`Registry`] through a
//! [`Context`] and queue outbound actions there; the client sends them once
//! every collaborator has seen the event.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error};

use crate::message::{Message, MessageKind};
use crate::state::{Registry, RegistryEvent};

/// What a collaborator can subscribe to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// Registration with the server completed.
    Connect,
    Disconnect,
    UserCreated,
    UserUpdated,
    UserRemoved,
    Message(MessageKind),
}

impl EventKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::UserCreated => "userCreated",
            Self::UserUpdated => "userUpdated",
            Self::UserRemoved => "userRemoved",
            Self::Message(kind) => kind.as_str(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKey {
    type Err = std::convert::Infallible;

    /// Lifecycle names first, anything else is a message kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "usercreated" => Self::UserCreated,
            "userupdated" => Self::UserUpdated,
            "userremoved" => Self::UserRemoved,
            other => Self::Message(other.parse()?),
        })
    }
}

impl From<&RegistryEvent> for EventKey {
    fn from(event: &RegistryEvent) -> Self {
        match event {
            RegistryEvent::UserCreated(_) => Self::UserCreated,
            RegistryEvent::UserUpdated(_) => Self::UserUpdated,
            RegistryEvent::UserRemoved { .. } => Self::UserRemoved,
        }
    }
}

/// Errors a collaborator returns from an event callback.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Stop delivering the current event to the remaining collaborators.
    #[error("dispatch halted")]
    Halt,
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Result type for event callbacks.
pub type HandlerResult = Result<(), HandlerError>;

/// A collaborator. Every callback defaults to doing nothing.
pub trait Handler: Send {
    /// Used in logs.
    fn name(&self) -> &str;

    fn on_connect(&mut self, _ctx: &mut Context<'_>) -> HandlerResult {
        Ok(())
    }

    fn on_disconnect(&mut self, _ctx: &mut Context<'_>) -> HandlerResult {
        Ok(())
    }

    fn on_message(&mut self, _ctx: &mut Context<'_>, _msg: &mut Message) -> HandlerResult {
        Ok(())
    }

    fn on_registry(&mut self, _ctx: &mut Context<'_>, _event: &RegistryEvent) -> HandlerResult {
        Ok(())
    }

    /// A timer queued with [`Context::schedule`] fired.
    fn on_timer(&mut self, _ctx: &mut Context<'_>, _token: u64) -> HandlerResult {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

impl HandlerId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An action queued by a collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    Raw(String),
    Message { target: String, text: String, is_action: bool },
    Notice { target: String, text: String },
    Ctcp { target: String, text: String },
    CtcpReply { target: String, kind: String, body: String },
    Join(String),
    Part { channel: String, reason: Option<String> },
    Quit(Option<String>),
    Nick(String),
}

/// Timer requests and outbound actions collected during dispatch.
#[derive(Debug, Default)]
pub struct Outbox {
    pub actions: Vec<Outbound>,
    pub schedules: Vec<(HandlerId, Duration, u64)>,
}

impl Outbox {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.schedules.is_empty()
    }
}

/// What a collaborator sees while handling one event.
pub struct Context<'a> {
    registry: &'a Registry,
    nickname: &'a str,
    outbox: &'a mut Outbox,
    handler: HandlerId,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, nickname: &'a str, outbox: &'a mut Outbox, handler: HandlerId) -> Self {
        Self {
            registry,
            nickname,
            outbox,
            handler,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// The bot's current nickname.
    pub fn nickname(&self) -> &str {
        self.nickname
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    fn push(&mut self, action: Outbound) {
        self.outbox.actions.push(action);
    }

    pub fn raw_send(&mut self, text: impl Into<String>) {
        self.push(Outbound::Raw(text.into()));
    }

    pub fn send_message(&mut self, target: &str, text: impl Into<String>) {
        self.push(Outbound::Message {
            target: target.to_string(),
            text: text.into(),
            is_action: false,
        });
    }

    /// `/me` style message.
    pub fn action(&mut self, target: &str, text: impl Into<String>) {
        self.push(Outbound::Message {
            target: target.to_string(),
            text: text.into(),
            is_action: true,
        });
    }

    /// Answer where `msg` came from.
    pub fn reply(&mut self, msg: &Message, text: impl Into<String>) {
        self.send_message(&msg.response_target, text);
    }

    pub fn notice(&mut self, target: &str, text: impl Into<String>) {
        self.push(Outbound::Notice {
            target: target.to_string(),
            text: text.into(),
        });
    }

    pub fn ctcp(&mut self, target: &str, text: impl Into<String>) {
        self.push(Outbound::Ctcp {
            target: target.to_string(),
            text: text.into(),
        });
    }

    pub fn ctcp_reply(&mut self, target: &str, kind: &str, body: impl Into<String>) {
        self.push(Outbound::CtcpReply {
            target: target.to_string(),
            kind: kind.to_string(),
            body: body.into(),
        });
    }

    pub fn join(&mut self, channel: &str) {
        self.push(Outbound::Join(channel.to_string()));
    }

    pub fn part(&mut self, channel: &str, reason: Option<&str>) {
        self.push(Outbound::Part {
            channel: channel.to_string(),
            reason: reason.map(str::to_string),
        });
    }

    pub fn quit(&mut self, reason: Option<&str>) {
        self.push(Outbound::Quit(reason.map(str::to_string)));
    }

    pub fn change_nick(&mut self, nick: &str) {
        self.push(Outbound::Nick(nick.to_string()));
    }

    /// Call this collaborator's [`Handler::on_timer`] with `token` after
    /// `delay`.
    pub fn schedule(&mut self, delay: Duration, token: u64) {
        self.outbox.schedules.push((self.handler, delay, token));
    }
}

/// An event being dispatched.
pub enum Event<'m> {
    Connect,
    Disconnect,
    Registry(&'m RegistryEvent),
    Message(&'m mut Message),
}

impl Event<'_> {
    pub fn key(&self) -> EventKey {
        match self {
            Self::Connect => EventKey::Connect,
            Self::Disconnect => EventKey::Disconnect,
            Self::Registry(event) => EventKey::from(*event),
            Self::Message(msg) => EventKey::Message(msg.kind.clone()),
        }
    }
}

/// Collaborators and their subscriptions.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Box<dyn Handler>>,
    subscriptions: HashMap<EventKey, Vec<HandlerId>>,
    first: Option<HandlerId>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn Handler>) -> HandlerId {
        let id = HandlerId(self.handlers.len());
        debug!(handler = handler.name(), "registered handler");
        self.handlers.push(handler);
        id
    }

    pub fn subscribe(&mut self, id: HandlerId, key: EventKey) {
        let subscribers = self.subscriptions.entry(key).or_default();
        if !subscribers.contains(&id) {
            subscribers.push(id);
        }
    }

    /// Run `id` before every other subscriber of an event.
    pub fn set_first(&mut self, id: HandlerId) {
        self.first = Some(id);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn subscribers(&self, key: &EventKey) -> Vec<HandlerId> {
        let mut ids = self.subscriptions.get(key).cloned().unwrap_or_default();
        if let Some(first) = self.first {
            if let Some(pos) = ids.iter().position(|id| *id == first) {
                let id = ids.remove(pos);
                ids.insert(0, id);
            }
        }
        ids
    }

    /// Deliver `event` to its subscribers in order.
    ///
    /// [`HandlerError::Halt`] stops delivery of this event only; any other
    /// error is logged and the next subscriber still runs.
    pub fn dispatch(&mut self, mut event: Event<'_>, registry: &Registry, nickname: &str, outbox: &mut Outbox) {
        let key = event.key();
        for id in self.subscribers(&key) {
            let Some(handler) = self.handlers.get_mut(id.0) else {
                continue;
            };
            let mut ctx = Context::new(registry, nickname, outbox, id);
            let result = match &mut event {
                Event::Connect => handler.on_connect(&mut ctx),
                Event::Disconnect => handler.on_disconnect(&mut ctx),
                Event::Registry(e) => handler.on_registry(&mut ctx, e),
                Event::Message(msg) => handler.on_message(&mut ctx, msg),
            };
            match result {
                Ok(()) => {}
                Err(HandlerError::Halt) => {
                    debug!(handler = handler.name(), event = %key, "dispatch halted");
                    break;
                }
                Err(HandlerError::Failed(e)) => {
                    error!(handler = handler.name(), event = %key, error = %e, "handler failed");
                }
            }
        }
    }

    /// Fire a timer for one collaborator.
    pub fn dispatch_timer(&mut self, id: HandlerId, token: u64, registry: &Registry, nickname: &str, outbox: &mut Outbox) {
        let Some(handler) = self.handlers.get_mut(id.0) else {
            return;
        };
        let mut ctx = Context::new(registry, nickname, outbox, id);
        if let Err(e) = handler.on_timer(&mut ctx, token) {
            if !matches!(e, HandlerError::Halt) {
                error!(handler = handler.name(), token, error = %e, "timer failed");
            }
        }
    }
}
