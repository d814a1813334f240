//! Arena orchestrator.
//!
//! Owns every component and is the single place where a client request
//! turns into state changes plus routed outputs:
//! - [`SlotRegistry`] for ownership,
//! - [`ClockService`] for timing,
//! - [`IdentityStore`] for nicknames,
//! - [`StateReplicator`] for snapshots,
//! - [`ChatLog`] for the chat relay.
//!
//! `Arena` is not `Sync`-shared; the server gives it to one task and
//! feeds it one request at a time, which is what makes each
//! check-then-commit sequence atomic.

use crate::chat::{ChatCommand, ChatLog, ChatMessage, DEFAULT_CHAT_CAPACITY, MAX_CHAT_TEXT_LEN};
use crate::error::ArenaError;
use crate::game_clock::{ClockEvent, ClockService, TimerUpdate};
use crate::identity::IdentityStore;
use crate::messages::{Dispatch, InputMessage, OutputMessage};
use crate::persisted::{PersistedRegistry, REGISTRY_FORMAT_VERSION};
use crate::replicator::{Snapshot, StateReplicator};
use crate::slot::{PlayerTag, SessionId, SlotIndex};
use crate::slot_registry::{Slot, SlotRegistry};
use crate::time::Millis;

/// Tunables that are not part of the persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Nickname allowed to `/clear`, compared case-insensitively.
    pub admin_nickname: String,

    /// Chat messages retained.
    pub chat_capacity: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            admin_nickname: "admin".to_string(),
            chat_capacity: DEFAULT_CHAT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Arena {
    config: ArenaConfig,
    slots: SlotRegistry,
    clocks: ClockService,
    identities: IdentityStore,
    replicator: StateReplicator,
    chat: ChatLog,
}

impl Arena {
    /// Create an empty arena.
    pub fn new(config: ArenaConfig) -> Self {
        let chat = ChatLog::new(config.chat_capacity);
        Arena {
            config,
            slots: SlotRegistry::new(),
            clocks: ClockService::new(),
            identities: IdentityStore::new(),
            replicator: StateReplicator::new(),
            chat,
        }
    }

    /// Rebuild an arena from its persisted parts.
    ///
    /// Slots whose owner has no identity record are freed, clocks of
    /// free slots are dropped and snapshots start empty.
    pub fn restore(
        config: ArenaConfig,
        registry: PersistedRegistry,
        chat_history: Vec<ChatMessage>,
    ) -> Self {
        let owned: Vec<Option<Slot>> = registry
            .slots
            .into_iter()
            .map(|entry| entry.filter(|slot| registry.identities.contains_key(&slot.owner)))
            .collect();
        let slots = SlotRegistry::from_slots(owned);

        let mut clocks = registry.clocks;
        clocks.retain(|index, _| !slots.is_free(*index));

        let identities =
            IdentityStore::from_parts(registry.identities, registry.reservations, registry.next_tag);

        let chat = ChatLog::from_history(chat_history, config.chat_capacity);

        Arena {
            config,
            slots,
            clocks: ClockService::from_clocks(clocks),
            identities,
            replicator: StateReplicator::new(),
            chat,
        }
    }

    // -------------------------------------------------------------------------
    // Identity bootstrap and connection hydration
    // -------------------------------------------------------------------------

    /// Bind `nickname` to a session (the out-of-band bootstrap call).
    pub fn register_nickname(
        &mut self,
        session: &SessionId,
        nickname: &str,
    ) -> Result<Dispatch, ArenaError> {
        let already_bound = self.identities.get(session).is_some();
        self.identities.bind(session, nickname)?;

        Ok(Dispatch {
            persist_registry: !already_bound,
            ..Dispatch::default()
        })
    }

    /// Initial state for a freshly authenticated connection.
    ///
    /// Sessions without an identity are refused with `UnknownSession`.
    pub fn hydrate(&self, session: &SessionId) -> Result<Vec<OutputMessage>, ArenaError> {
        let identity = self.identities.get(session).ok_or(ArenaError::UnknownSession)?;

        let mut outputs = vec![
            OutputMessage::ChatHistory {
                messages: self.chat.messages(),
            },
            self.slot_table(),
            self.nickname_table(),
            OutputMessage::PlayerTagAssigned { tag: identity.tag },
        ];

        if let Some(index) = self.slots.slot_of(session) {
            if let Some(snapshot) = self.replicator.saved_for(&self.slots, session, index) {
                outputs.push(OutputMessage::SavedSnapshotRestore {
                    index,
                    snapshot: snapshot.clone(),
                });
            }
        }

        outputs.push(OutputMessage::AllSnapshots {
            snapshots: self.replicator.all_latest(),
        });

        Ok(outputs)
    }

    // -------------------------------------------------------------------------
    // Request processing
    // -------------------------------------------------------------------------

    /// Process one request from `session` at time `now`.
    ///
    /// Requests from sessions without an identity (for example a second
    /// connection of a session that just logged out) are ignored.
    pub fn process_message(
        &mut self,
        session: &SessionId,
        msg: InputMessage,
        now: Millis,
    ) -> Dispatch {
        let mut dispatch = Dispatch::default();
        if self.identities.get(session).is_none() {
            return dispatch;
        }

        if let Some(event) = msg.clock_event() {
            self.process_clock_event(session, event, now, &mut dispatch);
            return dispatch;
        }

        match msg {
            InputMessage::SelectSlot { index } => {
                self.process_select(session, index, now, &mut dispatch)
            }
            InputMessage::ReleaseSlot => {
                self.release_owned_slot(session, &mut dispatch);
            }
            InputMessage::PublishSnapshot { snapshot } => {
                self.process_publish(session, snapshot, &mut dispatch)
            }
            InputMessage::SaveSnapshot { snapshot } => {
                let _ = self.replicator.save(&self.slots, session, snapshot);
            }
            InputMessage::RequestSnapshot { index } => {
                self.process_request_snapshot(session, index, &mut dispatch)
            }
            InputMessage::SendChat { text } => self.process_chat(session, &text, now, &mut dispatch),
            InputMessage::GameStarted
            | InputMessage::GameRestarted
            | InputMessage::PauseGame
            | InputMessage::ResumeGame
            | InputMessage::GameOver => {}
        }

        dispatch
    }

    /// Durations for the periodic timer broadcast.
    pub fn timer_update(&self, now: Millis) -> TimerUpdate {
        self.clocks.timer_update(&self.slots, now)
    }

    fn process_select(
        &mut self,
        session: &SessionId,
        raw_index: usize,
        now: Millis,
        dispatch: &mut Dispatch,
    ) {
        let result = SlotIndex::new(raw_index)
            .and_then(|index| self.slots.select(session, index, now).map(|_| index));

        match result {
            Ok(index) => {
                dispatch.persist_registry = true;
                dispatch.to_everyone(self.slot_table());
                dispatch.to_everyone(self.nickname_table());
                dispatch.to_origin(OutputMessage::GameStartedAck { index });
            }
            Err(err) => dispatch.to_origin(OutputMessage::SelectError {
                message: err.to_string(),
            }),
        }
    }

    /// Release the session's slot along with its clock and snapshots.
    ///
    /// A session without a slot is a silent no-op.
    fn release_owned_slot(&mut self, session: &SessionId, dispatch: &mut Dispatch) -> bool {
        let Ok(index) = self.slots.release(session) else {
            return false;
        };

        self.clocks.clear(index);
        self.replicator.clear(index);

        dispatch.persist_registry = true;
        dispatch.to_everyone(self.slot_table());
        dispatch.to_everyone(self.nickname_table());
        dispatch.to_everyone(OutputMessage::SlotReset { index });
        true
    }

    fn process_clock_event(
        &mut self,
        session: &SessionId,
        event: ClockEvent,
        now: Millis,
        dispatch: &mut Dispatch,
    ) {
        let Some(index) = self.slots.slot_of(session) else {
            return;
        };
        if self.clocks.apply(index, event, now) {
            dispatch.persist_registry = true;
        }
    }

    fn process_publish(&mut self, session: &SessionId, snapshot: Snapshot, dispatch: &mut Dispatch) {
        if let Some(index) = self.replicator.publish(&self.slots, session, snapshot.clone()) {
            dispatch.to_others(OutputMessage::SnapshotBroadcast { index, snapshot });
        }
    }

    fn process_request_snapshot(&self, session: &SessionId, raw_index: usize, dispatch: &mut Dispatch) {
        let Ok(index) = SlotIndex::new(raw_index) else {
            return;
        };
        if let Some(snapshot) = self.replicator.saved_for(&self.slots, session, index) {
            dispatch.to_origin(OutputMessage::SavedSnapshotRestore {
                index,
                snapshot: snapshot.clone(),
            });
        }
    }

    // -------------------------------------------------------------------------
    // Chat relay
    // -------------------------------------------------------------------------

    fn process_chat(&mut self, session: &SessionId, text: &str, now: Millis, dispatch: &mut Dispatch) {
        match ChatCommand::parse(text) {
            ChatCommand::Logout => self.process_logout(session, dispatch),
            ChatCommand::Clear => self.process_clear(session, dispatch),
            ChatCommand::Rename(new) => self.process_rename(session, new, dispatch),
            ChatCommand::Say(text) => self.process_say(session, text, now, dispatch),
        }
    }

    fn process_say(&mut self, session: &SessionId, text: &str, now: Millis, dispatch: &mut Dispatch) {
        if text.trim().is_empty() {
            return;
        }
        if text.chars().count() > MAX_CHAT_TEXT_LEN {
            dispatch.to_origin(OutputMessage::SystemMessage {
                message: ArenaError::ChatTooLong {
                    max: MAX_CHAT_TEXT_LEN,
                }
                .to_string(),
            });
            return;
        }
        let Some(nickname) = self.identities.nickname_of(session) else {
            return;
        };

        let message = ChatMessage {
            nickname: nickname.to_string(),
            text: text.to_string(),
            timestamp: now,
        };
        self.chat.append(message.clone());

        dispatch.persist_chat = true;
        dispatch.to_everyone(OutputMessage::ChatAppended { message });
    }

    /// `/logout`: release the slot, destroy the identity, close the
    /// originating connection.
    fn process_logout(&mut self, session: &SessionId, dispatch: &mut Dispatch) {
        self.release_owned_slot(session, dispatch);
        self.identities.evict(session);

        dispatch.persist_registry = true;
        dispatch.close_origin = true;
        dispatch.to_origin(OutputMessage::LoggedOut);
    }

    fn process_clear(&mut self, session: &SessionId, dispatch: &mut Dispatch) {
        if !self.is_admin(session) {
            dispatch.to_origin(OutputMessage::SystemMessage {
                message: ArenaError::NotAdmin.to_string(),
            });
            return;
        }

        self.chat.clear();
        dispatch.persist_chat = true;
        dispatch.to_everyone(OutputMessage::ChatCleared);
    }

    fn process_rename(&mut self, session: &SessionId, new: &str, dispatch: &mut Dispatch) {
        let old = match self.identities.rename_session(session, new) {
            Ok(old) => old,
            Err(err) => {
                dispatch.to_origin(OutputMessage::RenameResult {
                    ok: false,
                    message: Some(err.to_string()),
                });
                return;
            }
        };
        let new = self
            .identities
            .nickname_of(session)
            .unwrap_or_default()
            .to_string();

        if self.chat.rename_author(&old, &new) > 0 {
            dispatch.persist_chat = true;
        }
        dispatch.persist_registry = true;

        if self.slots.slot_of(session).is_some() {
            dispatch.to_everyone(self.nickname_table());
        }
        dispatch.to_everyone(OutputMessage::UserRenamed {
            old_nickname: old,
            new_nickname: new.clone(),
        });
        dispatch.to_origin(OutputMessage::RenameResult {
            ok: true,
            message: Some(new),
        });
    }

    fn is_admin(&self, session: &SessionId) -> bool {
        self.identities
            .nickname_of(session)
            .map(|n| n.to_lowercase() == self.config.admin_nickname.to_lowercase())
            .unwrap_or(false)
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    /// Owner tag per slot.
    pub fn slot_table(&self) -> OutputMessage {
        let table = self
            .slots
            .slots()
            .iter()
            .map(|entry| {
                entry
                    .as_ref()
                    .and_then(|slot| self.identities.get(&slot.owner))
                    .map(|identity| identity.tag)
            })
            .collect();
        OutputMessage::SlotTableChanged { table }
    }

    /// Owner nickname per slot.
    pub fn nickname_table(&self) -> OutputMessage {
        let nicknames = self
            .slots
            .slots()
            .iter()
            .map(|entry| {
                entry
                    .as_ref()
                    .and_then(|slot| self.identities.nickname_of(&slot.owner))
                    .map(str::to_string)
            })
            .collect();
        OutputMessage::NicknamesChanged { nicknames }
    }

    /// Full-state record for the persistence writer.
    pub fn persisted_registry(&self) -> PersistedRegistry {
        PersistedRegistry {
            version: REGISTRY_FORMAT_VERSION,
            slots: self.slots.slots().to_vec(),
            identities: self.identities.records().clone(),
            reservations: self.identities.reservations().cloned().collect(),
            clocks: self.clocks.clocks().clone(),
            next_tag: self.identities.next_tag(),
        }
    }

    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.chat.messages()
    }

    pub fn tag_of(&self, session: &SessionId) -> Option<PlayerTag> {
        self.identities.get(session).map(|identity| identity.tag)
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    pub fn clocks(&self) -> &ClockService {
        &self.clocks
    }

    pub fn identities(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn replicator(&self) -> &StateReplicator {
        &self.replicator
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }
}
