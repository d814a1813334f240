//! Fixed table of exclusive game slots.
//!
//! - `SLOT_COUNT` slots, created free at startup, never destroyed.
//! - A slot has at most one owner.
//! - A session owns at most one slot across the whole table.
//!
//! `select` checks both conditions and commits in the same `&mut self`
//! call; callers that share a registry across tasks must route every
//! mutation through one owner (see the server's engine task).

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;
use crate::slot::{SessionId, SlotIndex, SLOT_COUNT};
use crate::time::Millis;

/// An owned slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub owner: SessionId,

    /// When the owner selected the slot; drives the selection timer.
    pub selected_at: Millis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRegistry {
    /// Always exactly `SLOT_COUNT` entries; `None` = free.
    slots: Vec<Option<Slot>>,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        SlotRegistry::new()
    }
}

impl SlotRegistry {
    /// A registry with every slot free.
    pub fn new() -> Self {
        SlotRegistry {
            slots: vec![None; SLOT_COUNT],
        }
    }

    /// Rebuild from a persisted table.
    ///
    /// The table is padded or truncated to `SLOT_COUNT`, and a session
    /// appearing more than once keeps only its lowest slot, so the
    /// single-owner invariant holds even for a hand-edited file.
    pub fn from_slots(persisted: Vec<Option<Slot>>) -> Self {
        let mut registry = SlotRegistry::new();
        for (i, entry) in persisted.into_iter().take(SLOT_COUNT).enumerate() {
            if let Some(slot) = entry {
                if registry.slot_of(&slot.owner).is_none() {
                    registry.slots[i] = Some(slot);
                }
            }
        }
        registry
    }

    /// Claim `index` for `session`.
    ///
    /// Fails with `SlotTaken` if the slot has an owner (including the
    /// same session) and with `AlreadyOwnsSlot` if the session owns a
    /// different slot. Nothing changes on failure.
    pub fn select(
        &mut self,
        session: &SessionId,
        index: SlotIndex,
        now: Millis,
    ) -> Result<(), ArenaError> {
        if self.slots[index.get()].is_some() {
            return Err(ArenaError::SlotTaken(index.get()));
        }
        if let Some(owned) = self.slot_of(session) {
            return Err(ArenaError::AlreadyOwnsSlot(owned.get()));
        }

        self.slots[index.get()] = Some(Slot {
            owner: session.clone(),
            selected_at: now,
        });
        Ok(())
    }

    /// Free the slot owned by `session`, returning its index.
    pub fn release(&mut self, session: &SessionId) -> Result<SlotIndex, ArenaError> {
        let index = self.slot_of(session).ok_or(ArenaError::NoSlotOwned)?;
        self.slots[index.get()] = None;
        Ok(index)
    }

    pub fn owner_of(&self, index: SlotIndex) -> Option<&SessionId> {
        self.slots[index.get()].as_ref().map(|slot| &slot.owner)
    }

    pub fn slot_of(&self, session: &SessionId) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|entry| matches!(entry, Some(slot) if &slot.owner == session))
            .and_then(|i| SlotIndex::new(i).ok())
    }

    pub fn get(&self, index: SlotIndex) -> Option<&Slot> {
        self.slots[index.get()].as_ref()
    }

    /// Owned slots in index order.
    pub fn owned(&self) -> impl Iterator<Item = (SlotIndex, &Slot)> {
        SlotIndex::all().filter_map(move |index| self.get(index).map(|slot| (index, slot)))
    }

    /// Raw table, one entry per slot.
    pub fn slots(&self) -> &[Option<Slot>] {
        &self.slots
    }

    pub fn is_free(&self, index: SlotIndex) -> bool {
        self.slots[index.get()].is_none()
    }
}
