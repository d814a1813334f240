//! Per-slot game snapshots.
//!
//! Two snapshots are kept per slot:
//! - **latest**: the last tick published by the owner, replicated to
//!   spectators and handed to new connections;
//! - **saved**: pushed explicitly by the owner (pause, tab hidden,
//!   unload) and handed back only to that owner on reconnect.
//!
//! Publishing overwrites; there is no versioning because one owner's
//! publishes are serialized by the engine task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::slot::{SessionId, SlotIndex};
use crate::slot_registry::SlotRegistry;

/// Opaque game state (board, pieces, score, paused flag...).
///
/// The arena never looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(pub serde_json::Value);

#[derive(Debug, Clone, Default)]
pub struct StateReplicator {
    latest: BTreeMap<SlotIndex, Snapshot>,
    saved: BTreeMap<SlotIndex, Snapshot>,
}

impl StateReplicator {
    pub fn new() -> Self {
        StateReplicator::default()
    }

    /// Store `snapshot` as the latest for the session's slot.
    ///
    /// Returns the slot index to broadcast to, or `None` if the session
    /// owns no slot (nothing is stored).
    pub fn publish(
        &mut self,
        slots: &SlotRegistry,
        session: &SessionId,
        snapshot: Snapshot,
    ) -> Option<SlotIndex> {
        let index = slots.slot_of(session)?;
        self.latest.insert(index, snapshot);
        Some(index)
    }

    /// Store `snapshot` as the owner's saved state for its slot.
    pub fn save(
        &mut self,
        slots: &SlotRegistry,
        session: &SessionId,
        snapshot: Snapshot,
    ) -> Option<SlotIndex> {
        let index = slots.slot_of(session)?;
        self.saved.insert(index, snapshot);
        Some(index)
    }

    /// The saved snapshot of `index`, only if `session` owns it.
    pub fn saved_for(
        &self,
        slots: &SlotRegistry,
        session: &SessionId,
        index: SlotIndex,
    ) -> Option<&Snapshot> {
        if slots.slot_of(session) != Some(index) {
            return None;
        }
        self.saved.get(&index)
    }

    pub fn latest(&self, index: SlotIndex) -> Option<&Snapshot> {
        self.latest.get(&index)
    }

    /// Every latest snapshot, for hydrating a new connection.
    pub fn all_latest(&self) -> BTreeMap<SlotIndex, Snapshot> {
        self.latest.clone()
    }

    /// Forget both snapshots of a released slot.
    pub fn clear(&mut self, index: SlotIndex) {
        self.latest.remove(&index);
        self.saved.remove(&index);
    }
}
