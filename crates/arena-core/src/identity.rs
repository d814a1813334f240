//! Session → nickname bindings with case-insensitive reservations.
//!
//! Reservations are stored lower-cased; "Bob" and "bob" collide. The
//! reservation set and the record map are kept in step by every method
//! here, so callers never touch one without the other.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ArenaError;
use crate::slot::{PlayerTag, SessionId};

/// Longest accepted nickname, in characters.
pub const MAX_NICKNAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Display nickname with its original casing.
    pub nickname: String,
    pub tag: PlayerTag,
}

/// Trim and validate a requested nickname.
pub fn normalize_nickname(raw: &str) -> Result<String, ArenaError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ArenaError::EmptyNickname);
    }
    if trimmed.chars().count() > MAX_NICKNAME_LEN {
        return Err(ArenaError::NicknameTooLong {
            max: MAX_NICKNAME_LEN,
        });
    }
    Ok(trimmed.to_string())
}

fn reservation_key(nickname: &str) -> String {
    nickname.to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityStore {
    records: BTreeMap<SessionId, Identity>,
    reservations: BTreeSet<String>,
    next_tag: u64,
}

impl IdentityStore {
    pub fn new() -> Self {
        IdentityStore::default()
    }

    /// Rebuild from persisted parts.
    ///
    /// Every bound nickname is re-reserved and the tag counter is moved
    /// past every issued tag, whatever the file says.
    pub fn from_parts(
        records: BTreeMap<SessionId, Identity>,
        reservations: impl IntoIterator<Item = String>,
        next_tag: u64,
    ) -> Self {
        let mut reservations: BTreeSet<String> =
            reservations.into_iter().map(|n| reservation_key(&n)).collect();
        reservations.extend(records.values().map(|r| reservation_key(&r.nickname)));

        let max_tag = records.values().map(|r| r.tag.0 + 1).max().unwrap_or(0);

        IdentityStore {
            records,
            reservations,
            next_tag: next_tag.max(max_tag),
        }
    }

    pub fn is_reserved(&self, nickname: &str) -> bool {
        self.reservations.contains(&reservation_key(nickname))
    }

    /// Claim a nickname without binding it to a session.
    pub fn reserve(&mut self, nickname: &str) -> Result<(), ArenaError> {
        let nickname = normalize_nickname(nickname)?;
        if !self.reservations.insert(reservation_key(&nickname)) {
            return Err(ArenaError::NicknameTaken(nickname));
        }
        Ok(())
    }

    /// Free a reservation. Unknown nicknames are ignored.
    pub fn release(&mut self, nickname: &str) {
        self.reservations.remove(&reservation_key(nickname));
    }

    /// Move a reservation from `old` to `new`.
    ///
    /// A case-only change of the same nickname is always allowed.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), ArenaError> {
        let new = normalize_nickname(new)?;
        let old_key = reservation_key(old);
        let new_key = reservation_key(&new);

        if new_key != old_key && self.reservations.contains(&new_key) {
            return Err(ArenaError::NicknameTaken(new));
        }

        self.reservations.remove(&old_key);
        self.reservations.insert(new_key);
        Ok(())
    }

    /// Bind a fresh nickname to a session that has none.
    ///
    /// Re-binding the session's own current nickname is accepted as a
    /// no-op so a client retrying the bootstrap does not fail.
    pub fn bind(&mut self, session: &SessionId, nickname: &str) -> Result<Identity, ArenaError> {
        let nickname = normalize_nickname(nickname)?;

        if let Some(existing) = self.records.get(session) {
            if reservation_key(&existing.nickname) == reservation_key(&nickname) {
                return Ok(existing.clone());
            }
            return Err(ArenaError::SessionAlreadyNamed(existing.nickname.clone()));
        }

        self.reserve(&nickname)?;

        let record = Identity {
            nickname,
            tag: PlayerTag(self.next_tag),
        };
        self.next_tag += 1;
        self.records.insert(session.clone(), record.clone());
        Ok(record)
    }

    /// Rename the session's identity. Returns the previous nickname.
    pub fn rename_session(
        &mut self,
        session: &SessionId,
        new: &str,
    ) -> Result<String, ArenaError> {
        let old = self
            .records
            .get(session)
            .map(|r| r.nickname.clone())
            .ok_or(ArenaError::UnknownSession)?;

        self.rename(&old, new)?;

        let new = normalize_nickname(new)?;
        if let Some(record) = self.records.get_mut(session) {
            record.nickname = new;
        }
        Ok(old)
    }

    /// Destroy the session's identity record and free its nickname.
    pub fn evict(&mut self, session: &SessionId) -> Option<Identity> {
        let record = self.records.remove(session)?;
        self.release(&record.nickname);
        Some(record)
    }

    pub fn get(&self, session: &SessionId) -> Option<&Identity> {
        self.records.get(session)
    }

    pub fn nickname_of(&self, session: &SessionId) -> Option<&str> {
        self.records.get(session).map(|r| r.nickname.as_str())
    }

    pub fn records(&self) -> &BTreeMap<SessionId, Identity> {
        &self.records
    }

    pub fn reservations(&self) -> impl Iterator<Item = &String> {
        self.reservations.iter()
    }

    pub fn next_tag(&self) -> u64 {
        self.next_tag
    }
}
