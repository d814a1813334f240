//! Identifiers shared by every component: slot indices, sessions and
//! the public player tag.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ArenaError;

/// Number of exclusive game slots hosted by one arena.
pub const SLOT_COUNT: usize = 4;

/// Index of a slot, always `< SLOT_COUNT`.
///
/// Serialized as a bare number (a string when used as a JSON map key).
/// Deserialization rejects out-of-range values so a persisted or wire
/// index can never address a missing slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Validate a raw index.
    pub fn new(raw: usize) -> Result<Self, ArenaError> {
        if raw < SLOT_COUNT {
            Ok(SlotIndex(raw as u8))
        } else {
            Err(ArenaError::InvalidSlot(raw))
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// Every slot index in ascending order.
    pub fn all() -> impl Iterator<Item = SlotIndex> {
        (0..SLOT_COUNT as u8).map(SlotIndex)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = ArenaError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        SlotIndex::new(value as usize)
    }
}

impl From<SlotIndex> for u8 {
    fn from(index: SlotIndex) -> u8 {
        index.0
    }
}

impl Serialize for SlotIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

struct SlotIndexVisitor;

impl<'de> Visitor<'de> for SlotIndexVisitor {
    type Value = SlotIndex;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a slot index below {}", SLOT_COUNT)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<SlotIndex, E> {
        SlotIndex::new(usize::try_from(v).unwrap_or(usize::MAX)).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<SlotIndex, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(ArenaError::InvalidSlot(usize::MAX)))?;
        self.visit_u64(v)
    }

    // Map keys arrive as strings.
    fn visit_str<E: de::Error>(self, v: &str) -> Result<SlotIndex, E> {
        let raw: u64 = v
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))?;
        self.visit_u64(raw)
    }
}

impl<'de> Deserialize<'de> for SlotIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SlotIndexVisitor)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque session identifier issued by the external session provider.
///
/// The arena never interprets it; it is only compared and used as a key.
/// It is a credential, so it never appears in broadcast messages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public handle of an identity.
///
/// The slot table is broadcast with tags instead of session ids; each
/// client learns its own tag during hydration and recognises its slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerTag(pub u64);

impl fmt::Display for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
