//! Chat log and command parsing.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::time::Millis;

/// Messages retained in the log (and in its persisted copy).
pub const DEFAULT_CHAT_CAPACITY: usize = 100;

/// Longest accepted chat message, in characters.
pub const MAX_CHAT_TEXT_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub nickname: String,
    pub text: String,
    pub timestamp: Millis,
}

/// How a line of chat input is interpreted.
///
/// Matching is exact and case-sensitive: `/Logout` is ordinary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Logout,
    Clear,
    /// Requested nickname, trimmed; may be empty.
    Rename(&'a str),
    Say(&'a str),
}

impl<'a> ChatCommand<'a> {
    pub fn parse(text: &'a str) -> Self {
        match text {
            "/logout" => ChatCommand::Logout,
            "/clear" => ChatCommand::Clear,
            "/rename" => ChatCommand::Rename(""),
            _ => match text.strip_prefix("/rename ") {
                Some(rest) => ChatCommand::Rename(rest.trim()),
                None => ChatCommand::Say(text),
            },
        }
    }
}

/// Append-only message log, oldest first, evicting beyond `capacity`.
#[derive(Debug, Clone)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        ChatLog::new(DEFAULT_CHAT_CAPACITY)
    }
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        ChatLog {
            messages: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from a persisted history, keeping the newest entries.
    pub fn from_history(history: Vec<ChatMessage>, capacity: usize) -> Self {
        let mut log = ChatLog::new(capacity);
        for message in history {
            log.append(message);
        }
        log
    }

    /// Append, dropping the oldest entry when over capacity.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Re-attribute every message by `old` to `new`; returns the count.
    pub fn rename_author(&mut self, old: &str, new: &str) -> usize {
        let mut changed = 0;
        for message in self.messages.iter_mut().filter(|m| m.nickname == old) {
            message.nickname = new.to_string();
            changed += 1;
        }
        changed
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
