//! Error types for the arena core.
//!
//! Every variant is a local rejection: no state changed and nothing was
//! broadcast. None of them is fatal to the process.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// The requested slot index does not exist.
    #[error("slot {0} does not exist")]
    InvalidSlot(usize),

    /// The slot already has an owner.
    #[error("slot {0} is already taken")]
    SlotTaken(usize),

    /// The session already owns a slot elsewhere.
    #[error("you already own slot {0}")]
    AlreadyOwnsSlot(usize),

    /// Release requested by a session that owns no slot.
    #[error("you do not own a slot")]
    NoSlotOwned,

    #[error("nickname must not be empty")]
    EmptyNickname,

    #[error("nickname must be at most {max} characters")]
    NicknameTooLong { max: usize },

    /// Case-insensitive reservation conflict.
    #[error("nickname {0:?} is already in use")]
    NicknameTaken(String),

    /// Bootstrap attempted for a session that already has a nickname.
    #[error("this session is already named {0:?}; use /rename")]
    SessionAlreadyNamed(String),

    /// The session has no identity record.
    #[error("unknown session")]
    UnknownSession,

    #[error("only the administrator can clear the chat history")]
    NotAdmin,

    #[error("chat message must be at most {max} characters")]
    ChatTooLong { max: usize },
}
