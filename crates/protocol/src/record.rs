//! crates/protocol/src/record.rs
//! Owned framed record.

use std::borrow::Cow;
use std::fmt;

use crate::command::Command;

/// One framed unit: a command tag and the payload it owns.
///
/// Payloads move between holders by value. Holders that keep a record in an
/// `Option<Record>` capture it with [`Option::take`], which empties the
/// source, so a payload never has two owners.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Record {
    command: Command,
    payload: Vec<u8>,
}

impl Record {
    /// Creates a record owning `payload`.
    pub fn new(command: Command, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// Creates a record whose payload is the UTF-8 bytes of `text`.
    pub fn with_text(command: Command, text: &str) -> Self {
        Self::new(command, text.as_bytes())
    }

    /// Returns the command tag.
    #[inline]
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Returns the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload length.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` when the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns the payload decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Consumes the record, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Consumes the record, returning tag and payload.
    pub fn into_parts(self) -> (Command, Vec<u8>) {
        (self.command, self.payload)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("command", &self.command.as_char())
            .field("payload", &self.text())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_empties_the_holder() {
        let mut slot = Some(Record::with_text(Command::File, "a/b"));
        let captured = slot.take();
        assert!(slot.is_none());
        assert_eq!(captured.map(Record::into_payload), Some(b"a/b".to_vec()));
    }

    #[test]
    fn debug_shows_tag_character_and_text() {
        let record = Record::with_text(Command::Warning, "vanished");
        assert_eq!(
            format!("{record:?}"),
            "Record { command: 'w', payload: \"vanished\" }"
        );
    }
}
