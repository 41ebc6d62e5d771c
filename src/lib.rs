//! # slirc-bot
//!
//! The stateful core of an IRC bot: it owns the server connection, turns
//! wire lines into structured events, formats outgoing text into
//! protocol-legal lines and keeps a live model of the users and channels it
//! can see.
//!
//! ## Features
//!
//! - Lenient line parsing with CTCP, actions, status-restricted notices and
//!   bot command detection
//! - Line splitting that respects the 512 byte limit and carries formatting
//!   across continuation lines
//! - Presence registry driven by JOIN/PART/KICK/QUIT/NICK/MODE, NAMES and WHO
//! - Mode classes learned from ISUPPORT
//! - Optional Tokio event loop with server/nickname rotation, reconnects,
//!   collaborator dispatch and timers
//!
//! The protocol pieces are sans-IO and build without the `tokio` feature.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing lines
//!
//! ```rust
//! use slirc_bot::{Message, MessageKind};
//!
//! let mut msg = Message::parse(":alice!a@example.net PRIVMSG #rust :!help modes").unwrap();
//! assert_eq!(msg.kind, MessageKind::Privmsg);
//! assert!(msg.in_channel);
//!
//! assert!(msg.parse_command(&["!"]));
//! assert_eq!(msg.command.as_deref(), Some("help"));
//! assert_eq!(msg.command_params, ["modes"]);
//! ```
//!
//! ### Formatting output
//!
//! ```rust
//! let lines = slirc_bot::encode::format("bot", "bot@example.net", "#rust", "hello\nworld", false);
//! assert_eq!(lines, ["PRIVMSG #rust :hello", "PRIVMSG #rust :world"]);
//! ```

pub mod casemap;
pub mod colors;
pub mod ctcp;
pub mod encode;
pub mod error;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod rotation;
pub mod state;
pub mod util;

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod config;
#[cfg(feature = "tokio")]
pub mod connection;
#[cfg(feature = "tokio")]
pub mod dispatch;
#[cfg(feature = "tokio")]
pub mod handlers;
#[cfg(feature = "tokio")]
pub mod line;
#[cfg(feature = "tokio")]
pub mod timer;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::casemap::Casemapping;
pub use self::colors::FormattedStringExt;
pub use self::ctcp::{CtcpKind, CtcpOwned};
pub use self::error::{MessageParseError, ModeError, RotationError};
pub use self::isupport::{ChanModes, Isupport, IsupportEntry, PrefixSpec, ServerSupport};
pub use self::message::{Message, MessageKind};
pub use self::mode::{parse_mode_change, ModeClass, ModeClasses, ModeValue, ParsedMode};
pub use self::prefix::Prefix;
pub use self::rotation::RotationList;
pub use self::state::{Channel, ModeOutcome, Registry, RegistryEvent, User, UserId};

#[cfg(feature = "tokio")]
pub use self::client::Client;
#[cfg(feature = "tokio")]
pub use self::config::{Config, ConfigError};
#[cfg(feature = "tokio")]
pub use self::connection::{Connection, ConnectionSettings, ConnectionState};
#[cfg(feature = "tokio")]
pub use self::dispatch::{Context, Dispatcher, EventKey, Handler, HandlerError, HandlerResult};
#[cfg(feature = "tokio")]
pub use self::error::ConnectError;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
#[cfg(feature = "tokio")]
pub use self::transport::{ServerAddress, Transport};
