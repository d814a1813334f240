//! arena-core
//!
//! Pure arena logic, no I/O:
//! - slot ownership registry
//! - per-slot game clocks
//! - session identities and nickname reservations
//! - snapshot replication
//! - chat log and commands
//! - the `Arena` orchestrator tying them together

pub mod slot;
pub mod time;
pub mod error;
pub mod slot_registry;
pub mod game_clock;
pub mod identity;
pub mod replicator;
pub mod chat;
pub mod messages;
pub mod persisted;
pub mod arena;

pub use slot::{PlayerTag, SessionId, SlotIndex, SLOT_COUNT};
pub use time::{now_millis, Millis};
pub use error::ArenaError;

pub use slot_registry::{Slot, SlotRegistry};
pub use game_clock::{ClockEvent, ClockPhase, ClockService, GameClock, TimerUpdate};
pub use identity::{Identity, IdentityStore, MAX_NICKNAME_LEN};
pub use replicator::{Snapshot, StateReplicator};
pub use chat::{ChatCommand, ChatLog, ChatMessage, DEFAULT_CHAT_CAPACITY, MAX_CHAT_TEXT_LEN};

pub use messages::{Audience, Dispatch, InputMessage, OutputMessage, Routed};

pub use persisted::{PersistedRegistry, REGISTRY_FORMAT_VERSION};
pub use arena::{Arena, ArenaConfig};
