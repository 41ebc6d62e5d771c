use std::collections::HashMap;

use crate::error::ModeError;
use crate::mode::{ModeClass, ModeClasses, ModeValue, ParsedMode};

use super::user::UserId;

/// A channel the bot has seen.
///
/// Members are held by id; the users themselves live in the registry.
#[derive(Clone, Debug)]
pub struct Channel {
    pub(crate) name: String,
    /// Folded nickname → member.
    pub(crate) members: HashMap<String, UserId>,
    pub(crate) lists: HashMap<char, Vec<String>>,
    pub(crate) modes: HashMap<char, ModeValue>,
    pub(crate) topic: Option<String>,
}

impl Channel {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: HashMap::new(),
            lists: HashMap::new(),
            modes: HashMap::new(),
            topic: None,
        }
    }

    /// Name as first seen.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = UserId> + '_ {
        self.members.values().copied()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.members.values().any(|&m| m == id)
    }

    /// Masks on the list mode `letter` (`b`, `e`, `I`).
    pub fn list(&self, letter: char) -> &[String] {
        self.lists.get(&letter).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mode(&self, letter: char) -> Option<&ModeValue> {
        self.modes.get(&letter)
    }

    pub fn modes(&self) -> impl Iterator<Item = (char, &ModeValue)> {
        self.modes.iter().map(|(&c, v)| (c, v))
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Apply one list, parameter or flag mode.
    ///
    /// Status letters concern members and are applied by the registry; here
    /// they are accepted and leave the channel unchanged. Letters outside
    /// every class are rejected.
    pub fn set_mode(&mut self, classes: &ModeClasses, mode: &ParsedMode) -> Result<(), ModeError> {
        let class = classes
            .classify(mode.letter)
            .ok_or(ModeError::UnknownMode(mode.letter))?;

        match class {
            ModeClass::Status => Ok(()),
            ModeClass::List => {
                let mask = mode
                    .param
                    .as_deref()
                    .ok_or(ModeError::MissingParameter(mode.letter))?;
                if mode.adding {
                    self.add_mask(mode.letter, mask);
                } else {
                    self.remove_mask(mode.letter, mask);
                }
                Ok(())
            }
            ModeClass::ParamAlways | ModeClass::ParamOnSet if mode.adding => {
                let value = mode
                    .param
                    .clone()
                    .ok_or(ModeError::MissingParameter(mode.letter))?;
                self.modes.insert(mode.letter, ModeValue::Param(value));
                Ok(())
            }
            ModeClass::Flag if mode.adding => {
                self.modes.insert(mode.letter, ModeValue::Flag);
                Ok(())
            }
            _ => {
                self.modes.remove(&mode.letter);
                Ok(())
            }
        }
    }

    /// Add a mask to a list; duplicates are ignored.
    pub(crate) fn add_mask(&mut self, letter: char, mask: &str) {
        let list = self.lists.entry(letter).or_default();
        if !list.iter().any(|m| m == mask) {
            list.push(mask.to_string());
        }
    }

    pub(crate) fn remove_mask(&mut self, letter: char, mask: &str) {
        if let Some(list) = self.lists.get_mut(&letter) {
            list.retain(|m| m != mask);
        }
    }
}
