//! Chat transport boundary
//!
//! `ChatMessage` is what the transport delivers per chat line: raw text and
//! the protocol-native emote tag map. `EmoteTable` is the per-channel
//! name-to-emote lookup fetched at bootstrap.

use crate::assets::{EmoteId, EmoteIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::RangeInclusive;

pub mod irc;
pub mod transport;

pub use irc::IrcMessage;
pub use transport::{ChatTransport, TransportSettings};

/// One emote id from the `emotes` tag with the character spans it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmoteTagEntry {
    pub id: EmoteId,
    pub spans: Vec<RangeInclusive<usize>>,
}

/// Protocol-native emote occurrences of one message, in tag order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmoteTags {
    entries: Vec<EmoteTagEntry>,
}

impl EmoteTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the value of an `emotes` tag, e.g. `25:0-4,12-16/1902:6-10`.
    /// Malformed spans are skipped; an id with no usable span is dropped.
    pub fn parse(value: &str) -> Self {
        let mut tags = Self::new();
        for group in value.split('/').filter(|g| !g.is_empty()) {
            let Some((id, spans)) = group.split_once(':') else {
                continue;
            };
            if id.is_empty() {
                continue;
            }
            let spans: Vec<_> = spans.split(',').filter_map(parse_span).collect();
            if !spans.is_empty() {
                tags.push(EmoteId::new(id), spans);
            }
        }
        tags
    }

    /// Add occurrences for `id`, merging into an existing entry for the same id.
    pub fn push(&mut self, id: EmoteId, spans: Vec<RangeInclusive<usize>>) {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.spans.extend(spans),
            None => self.entries.push(EmoteTagEntry { id, spans }),
        }
    }

    pub fn entries(&self) -> &[EmoteTagEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn parse_span(span: &str) -> Option<RangeInclusive<usize>> {
    let (start, end) = span.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    (start <= end).then_some(start..=end)
}

/// A chat line as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub channel: String,
    pub sender: String,
    pub text: String,
    pub emotes: EmoteTags,
}

impl ChatMessage {
    pub fn new(channel: impl Into<String>, sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender: sender.into(),
            text: text.into(),
            emotes: EmoteTags::new(),
        }
    }

    pub fn with_emotes(mut self, emotes: EmoteTags) -> Self {
        self.emotes = emotes;
        self
    }
}

/// Channel emote table: chat word -> emote identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmoteTable {
    names: HashMap<String, EmoteIdentity>,
}

impl EmoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, emote: EmoteIdentity) {
        self.names.insert(name.into(), emote);
    }

    pub fn lookup(&self, word: &str) -> Option<&EmoteIdentity> {
        self.names.get(word)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(String, EmoteIdentity)> for EmoteTable {
    fn from_iter<T: IntoIterator<Item = (String, EmoteIdentity)>>(iter: T) -> Self {
        Self { names: iter.into_iter().collect() }
    }
}
