//! IRCv3 line parsing for the chat transport
//!
//! Line shape: `[@tags ][:prefix ]COMMAND [params...] [:trailing]`.

use super::{ChatMessage, EmoteTags};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse one line (without the trailing CRLF). Returns `None` for blank lines
    /// or lines with no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut message = IrcMessage::default();

        if let Some(stripped) = rest.strip_prefix('@') {
            let (tags, tail) = stripped.split_once(' ')?;
            message.tags = parse_tags(tags);
            rest = tail.trim_start();
        }

        if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, tail) = stripped.split_once(' ')?;
            message.prefix = Some(prefix.to_string());
            rest = tail.trim_start();
        }

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, tail)) => (command, tail),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }
        message.command = command.to_ascii_uppercase();

        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                message.params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    if !param.is_empty() {
                        message.params.push(param.to_string());
                    }
                    rest = tail;
                }
                None => {
                    message.params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(message)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Nickname part of the prefix (`nick!user@host`).
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|prefix| prefix.split_once('!').map_or(prefix, |(nick, _)| nick))
    }

    /// Convert a `PRIVMSG` into a chat message; anything else yields `None`.
    pub fn into_chat_message(self) -> Option<ChatMessage> {
        if self.command != "PRIVMSG" || self.params.len() < 2 {
            return None;
        }
        let channel = self.params[0].trim_start_matches('#').to_string();
        let sender = self
            .tag("display-name")
            .filter(|name| !name.is_empty())
            .or_else(|| self.nick())
            .unwrap_or_default()
            .to_string();
        let emotes = self.tag("emotes").map(EmoteTags::parse).unwrap_or_default();
        let text = self.params[1].clone();
        Some(ChatMessage { channel, sender, text, emotes })
    }
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), unescape_tag_value(value)),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
