//! Message types used by the arena core.
//!
//! These are **transport-agnostic** logical messages:
//! - [`InputMessage`]: what a connected client asks the arena to do.
//! - [`OutputMessage`]: what the arena tells clients.
//! - [`Routed`] / [`Dispatch`]: who receives each output and which
//!   side effects (persistence, closing the connection) must follow.
//!
//! The serde representation is the logical event name in a `"type"`
//! field; framing lives in the `arena-protocol` crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;
use crate::game_clock::{ClockEvent, TimerUpdate};
use crate::replicator::Snapshot;
use crate::slot::{PlayerTag, SlotIndex};

/// A request from an authenticated connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InputMessage {
    /// Claim a slot. The raw index is validated by the arena so a bad
    /// index is answered with `selectError` instead of a decode failure.
    SelectSlot { index: usize },

    ReleaseSlot,

    GameStarted,
    GameRestarted,
    PauseGame,
    ResumeGame,
    GameOver,

    /// Per-tick state, replicated to spectators.
    PublishSnapshot { snapshot: Snapshot },

    /// State kept for restoring the owner after a reconnect.
    SaveSnapshot { snapshot: Snapshot },

    /// Ask for the saved snapshot of the caller's own slot.
    RequestSnapshot { index: usize },

    /// Chat line; may be a `/command`.
    SendChat { text: String },
}

impl InputMessage {
    /// The clock event carried by this message, if any.
    pub fn clock_event(&self) -> Option<ClockEvent> {
        match self {
            InputMessage::GameStarted => Some(ClockEvent::Started),
            InputMessage::GameRestarted => Some(ClockEvent::Restarted),
            InputMessage::PauseGame => Some(ClockEvent::Paused),
            InputMessage::ResumeGame => Some(ClockEvent::Resumed),
            InputMessage::GameOver => Some(ClockEvent::Over),
            _ => None,
        }
    }
}

/// An event emitted by the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutputMessage {
    /// Owner tag per slot, `None` = free.
    SlotTableChanged { table: Vec<Option<PlayerTag>> },

    /// Owner nickname per slot, for display.
    NicknamesChanged { nicknames: Vec<Option<String>> },

    /// The slot was released; spectators blank its board.
    SlotReset { index: SlotIndex },

    /// Private: your selection succeeded, start the game on `index`.
    GameStartedAck { index: SlotIndex },

    SnapshotBroadcast { index: SlotIndex, snapshot: Snapshot },

    AllSnapshots { snapshots: BTreeMap<SlotIndex, Snapshot> },

    /// Private: restore your own game exactly as saved.
    SavedSnapshotRestore { index: SlotIndex, snapshot: Snapshot },

    TimerUpdate(TimerUpdate),

    ChatAppended { message: ChatMessage },

    ChatHistory { messages: Vec<ChatMessage> },

    /// The log was emptied by the administrator.
    ChatCleared,

    UserRenamed { old_nickname: String, new_nickname: String },

    RenameResult {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Private: the session is gone; discard local credentials.
    LoggedOut,

    /// Private: the public tag of the receiving session.
    #[serde(rename = "playerTag")]
    PlayerTagAssigned { tag: PlayerTag },

    /// Private: a selection was rejected.
    SelectError { message: String },

    /// Private: a notice for the requester only.
    SystemMessage { message: String },
}

/// Who receives a routed output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Only the connection that sent the request.
    Origin,
    /// Every connection except the origin.
    Others,
    /// Every connection.
    Everyone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub audience: Audience,
    pub message: OutputMessage,
}

/// Everything the engine task must do after one request.
///
/// The in-memory mutation is already committed when a `Dispatch` is
/// returned; the flags only describe the follow-up I/O.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    pub outputs: Vec<Routed>,

    /// Slots, identities or clocks changed.
    pub persist_registry: bool,

    /// The chat log changed.
    pub persist_chat: bool,

    /// Close the originating connection after delivering its outputs.
    pub close_origin: bool,
}

impl Dispatch {
    pub fn to_origin(&mut self, message: OutputMessage) {
        self.push(Audience::Origin, message);
    }

    pub fn to_others(&mut self, message: OutputMessage) {
        self.push(Audience::Others, message);
    }

    pub fn to_everyone(&mut self, message: OutputMessage) {
        self.push(Audience::Everyone, message);
    }

    fn push(&mut self, audience: Audience, message: OutputMessage) {
        self.outputs.push(Routed { audience, message });
    }

    /// Outputs addressed to the origin connection, in order.
    pub fn for_origin(&self) -> impl Iterator<Item = &OutputMessage> {
        self.outputs
            .iter()
            .filter(|r| matches!(r.audience, Audience::Origin | Audience::Everyone))
            .map(|r| &r.message)
    }

    /// Outputs delivered to connections other than the origin, in order.
    pub fn for_others(&self) -> impl Iterator<Item = &OutputMessage> {
        self.outputs
            .iter()
            .filter(|r| matches!(r.audience, Audience::Others | Audience::Everyone))
            .map(|r| &r.message)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty() && !self.persist_registry && !self.persist_chat && !self.close_origin
    }
}
