//! The presence registry: users and channels built from protocol events.
//!
//! [`Registry`] is the only writer. The parser never touches it; the event
//! loop feeds it each parsed [`Message`](crate::Message) through
//! [`Registry::apply`] before collaborators see the message.
//!
//! # Example
//!
//! ```
//! use slirc_bot::{Message, Registry};
//!
//! let mut registry = Registry::new();
//! for line in [
//!     ":irc.example.net 001 bot :Welcome",
//!     ":bot!b@bot.host JOIN #room",
//!     ":irc.example.net 353 bot = #room :bot @alice",
//! ] {
//!     let msg = Message::parse_with(line, registry.support()).unwrap();
//!     registry.apply(&msg);
//! }
//!
//! assert_eq!(registry.status("#room", "alice"), ['o']);
//! assert_eq!(registry.own_address(), Some("b@bot.host"));
//! ```

mod channel;
mod registry;
mod user;

pub use self::channel::Channel;
pub use self::registry::{ModeOutcome, Registry, RegistryEvent};
pub use self::user::{User, UserId};
