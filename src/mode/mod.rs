//! Channel mode classification and parsing.

mod parse;
mod types;

pub use self::parse::parse_mode_change;
pub use self::types::{ModeClass, ModeClasses, ModeValue, ParsedMode};
