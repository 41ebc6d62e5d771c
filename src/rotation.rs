//! Wrap-around candidate lists for server failover and nickname fallback.

use std::fmt::Debug;

use crate::error::RotationError;

/// An ordered, non-empty list of candidates with a cursor.
///
/// The cursor always points at a valid index. Advancing past the end wraps
/// back to the first element.
///
/// # Example
///
/// ```
/// use slirc_bot::RotationList;
///
/// let mut nicks = RotationList::new(["bot", "bot_", "bot__"]).unwrap();
/// assert_eq!(*nicks.current(), "bot");
/// nicks.advance();
/// assert_eq!(*nicks.current(), "bot_");
///
/// nicks.promote(&"bot__").unwrap();
/// assert_eq!(nicks.iter().copied().collect::<Vec<_>>(), ["bot__", "bot", "bot_"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotationList<T> {
    items: Vec<T>,
    cursor: usize,
}

impl<T> RotationList<T>
where
    T: PartialEq + Debug,
{
    /// Build a list from an ordered collection. Fails if it is empty.
    pub fn new(items: impl IntoIterator<Item = T>) -> Result<Self, RotationError> {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Err(RotationError::Empty);
        }
        Ok(Self { items, cursor: 0 })
    }

    /// The element under the cursor.
    #[must_use]
    pub fn current(&self) -> &T {
        &self.items[self.cursor]
    }

    /// Move the cursor forward, wrapping to the start, and return the new
    /// current element.
    pub fn advance(&mut self) -> &T {
        self.cursor = (self.cursor + 1) % self.items.len();
        self.current()
    }

    /// Return the cursor to the first element.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Move `value` to the front, keeping the relative order of the others.
    /// The cursor is reset.
    pub fn promote(&mut self, value: &T) -> Result<(), RotationError> {
        let pos = self
            .items
            .iter()
            .position(|item| item == value)
            .ok_or_else(|| RotationError::NotFound(format!("{:?}", value)))?;

        let item = self.items.remove(pos);
        self.items.insert(0, item);
        self.cursor = 0;
        Ok(())
    }

    /// Whether the cursor has wrapped back to the first element.
    #[must_use]
    pub fn at_start(&self) -> bool {
        self.cursor == 0
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}
