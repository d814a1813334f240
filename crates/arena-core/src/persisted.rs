//! Durable form of the registry.
//!
//! One record holds everything that must survive a restart except the
//! chat log (stored separately) and snapshots (memory only).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game_clock::GameClock;
use crate::identity::Identity;
use crate::slot::{SessionId, SlotIndex, SLOT_COUNT};
use crate::slot_registry::Slot;

/// Bumped on incompatible layout changes.
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRegistry {
    pub version: u32,

    /// One entry per slot, `None` = free.
    pub slots: Vec<Option<Slot>>,

    pub identities: BTreeMap<SessionId, Identity>,

    /// Lower-cased reserved nicknames.
    #[serde(default)]
    pub reservations: Vec<String>,

    #[serde(default)]
    pub clocks: BTreeMap<SlotIndex, GameClock>,

    #[serde(default)]
    pub next_tag: u64,
}

impl Default for PersistedRegistry {
    fn default() -> Self {
        PersistedRegistry {
            version: REGISTRY_FORMAT_VERSION,
            slots: vec![None; SLOT_COUNT],
            identities: BTreeMap::new(),
            reservations: Vec::new(),
            clocks: BTreeMap::new(),
            next_tag: 0,
        }
    }
}
