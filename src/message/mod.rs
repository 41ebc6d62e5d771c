mod command;
mod parse;
mod types;

pub use self::types::{Message, MessageKind};
