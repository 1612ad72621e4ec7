//! Chat message to emote-occurrence resolution
//!
//! Two sources per message, both capped: protocol-native emote tags yield
//! up to `tag_occurrence_cap` occurrences per distinct emote, and free-text
//! words matched against the channel table yield at most `text_match_cap`
//! occurrences, first matches in reading order winning.

use crate::assets::{EmoteIdentity, Provider};
use crate::config::ChatSettings;
use crate::networking::{EmoteTable, EmoteTags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceSource {
    Tag,
    Text,
}

/// One emote to show, derived from a chat message. Not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOccurrence {
    pub emote: EmoteIdentity,
    pub source: OccurrenceSource,
}

#[derive(Debug, Default, Clone)]
pub struct ResolverStats {
    pub messages_seen: u64,
    pub messages_ignored: u64,
    pub occurrences: u64,
}

#[derive(Debug)]
pub struct ChatResolver {
    table: EmoteTable,
    focused: bool,
    tag_occurrence_cap: usize,
    text_match_cap: usize,
    stats: ResolverStats,
}

impl ChatResolver {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            table: EmoteTable::new(),
            focused: true,
            tag_occurrence_cap: settings.tag_occurrence_cap,
            text_match_cap: settings.text_match_cap,
            stats: ResolverStats::default(),
        }
    }

    pub fn set_table(&mut self, table: EmoteTable) {
        self.table = table;
    }

    pub fn table(&self) -> &EmoteTable {
        &self.table
    }

    /// Messages arriving while unfocused are ignored entirely.
    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn on_message(&mut self, text: &str, tags: &EmoteTags) -> Vec<ChatOccurrence> {
        self.stats.messages_seen += 1;
        if !self.focused {
            self.stats.messages_ignored += 1;
            return Vec::new();
        }

        let mut occurrences = self.from_tags(tags);
        occurrences.extend(self.from_text(text));
        self.stats.occurrences += occurrences.len() as u64;
        occurrences
    }

    fn from_tags(&self, tags: &EmoteTags) -> Vec<ChatOccurrence> {
        tags.entries()
            .iter()
            .flat_map(|entry| {
                let count = entry.spans.len().min(self.tag_occurrence_cap);
                std::iter::repeat(entry.id.clone()).take(count)
            })
            .map(|id| ChatOccurrence {
                emote: EmoteIdentity { id, provider: Provider::twitch() },
                source: OccurrenceSource::Tag,
            })
            .collect()
    }

    fn from_text(&self, text: &str) -> Vec<ChatOccurrence> {
        text.split_whitespace()
            .filter_map(|word| self.table.lookup(word))
            .take(self.text_match_cap)
            .map(|emote| ChatOccurrence { emote: emote.clone(), source: OccurrenceSource::Text })
            .collect()
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats.clone()
    }
}
