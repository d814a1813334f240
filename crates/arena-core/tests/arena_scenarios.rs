// crates/arena-core/tests/arena_scenarios.rs
use arena_core::{
    Arena, ArenaConfig, Audience, ClockPhase, Dispatch, GameClock, InputMessage, OutputMessage,
    PlayerTag, SessionId, Slot, SlotIndex, Snapshot,
};
use serde_json::json;

fn slot(i: usize) -> SlotIndex {
    SlotIndex::new(i).unwrap()
}

fn snapshot(score: u64) -> Snapshot {
    Snapshot(json!({ "score": score, "board": [[0, 1], [1, 0]] }))
}

/// An arena with the given sessions already named.
fn arena_with(players: &[(&str, &str)]) -> (Arena, Vec<SessionId>) {
    let mut arena = Arena::new(ArenaConfig::default());
    let sessions = players
        .iter()
        .map(|(id, nickname)| {
            let session = SessionId::new(*id);
            arena.register_nickname(&session, nickname).unwrap();
            session
        })
        .collect();
    (arena, sessions)
}

fn select(arena: &mut Arena, session: &SessionId, index: usize) -> Dispatch {
    arena.process_message(session, InputMessage::SelectSlot { index }, 0)
}

fn say(arena: &mut Arena, session: &SessionId, text: &str, now: u64) -> Dispatch {
    arena.process_message(session, InputMessage::SendChat { text: text.into() }, now)
}

fn table(arena: &Arena) -> Vec<Option<PlayerTag>> {
    match arena.slot_table() {
        OutputMessage::SlotTableChanged { table } => table,
        other => panic!("unexpected {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Slot selection
// ---------------------------------------------------------------------------

#[test]
fn select_conflict_release_scenario() {
    let (mut arena, s) = arena_with(&[("sa", "A"), ("sb", "B")]);
    let tag_a = arena.tag_of(&s[0]).unwrap();

    let d = select(&mut arena, &s[0], 1);
    assert!(d.persist_registry);
    assert_eq!(table(&arena), vec![None, Some(tag_a), None, None]);
    assert!(d
        .for_origin()
        .any(|m| *m == OutputMessage::GameStartedAck { index: slot(1) }));
    assert!(d.for_others().any(|m| matches!(m, OutputMessage::SlotTableChanged { .. })));
    assert!(!d.for_others().any(|m| matches!(m, OutputMessage::GameStartedAck { .. })));

    let d = select(&mut arena, &s[1], 1);
    assert!(!d.persist_registry);
    assert_eq!(d.outputs.len(), 1);
    assert_eq!(d.outputs[0].audience, Audience::Origin);
    assert!(matches!(d.outputs[0].message, OutputMessage::SelectError { .. }));
    assert_eq!(table(&arena), vec![None, Some(tag_a), None, None]);

    let d = arena.process_message(&s[0], InputMessage::ReleaseSlot, 0);
    assert_eq!(table(&arena), vec![None, None, None, None]);
    assert!(d.outputs.iter().any(|r| r.audience == Audience::Everyone
        && r.message == OutputMessage::SlotReset { index: slot(1) }));
}

#[test]
fn invalid_index_answers_select_error() {
    let (mut arena, s) = arena_with(&[("sa", "A")]);
    let d = select(&mut arena, &s[0], 9);
    match d.for_origin().next() {
        Some(OutputMessage::SelectError { message }) => assert!(message.contains('9')),
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn second_selection_by_owner_is_rejected() {
    let (mut arena, s) = arena_with(&[("sa", "A")]);
    select(&mut arena, &s[0], 0);
    let d = select(&mut arena, &s[0], 2);
    assert!(matches!(d.outputs[0].message, OutputMessage::SelectError { .. }));
    assert_eq!(arena.slots().slot_of(&s[0]), Some(slot(0)));
}

#[test]
fn release_without_slot_is_silent() {
    let (mut arena, s) = arena_with(&[("sa", "A")]);
    let d = arena.process_message(&s[0], InputMessage::ReleaseSlot, 0);
    assert!(d.is_empty());
}

#[test]
fn unnamed_session_is_ignored() {
    let mut arena = Arena::new(ArenaConfig::default());
    let ghost = SessionId::new("ghost");
    assert!(select(&mut arena, &ghost, 0).is_empty());
    assert!(arena.slots().is_free(slot(0)));
    assert!(arena.hydrate(&ghost).is_err());
}

#[test]
fn nickname_table_follows_ownership() {
    let (mut arena, s) = arena_with(&[("sa", "Ann"), ("sb", "Ben")]);
    select(&mut arena, &s[1], 2);
    assert_eq!(
        arena.nickname_table(),
        OutputMessage::NicknamesChanged {
            nicknames: vec![None, None, Some("Ben".into()), None]
        }
    );
}

// ---------------------------------------------------------------------------
// Clocks and snapshots
// ---------------------------------------------------------------------------

#[test]
fn clock_events_only_apply_to_owned_slot() {
    let (mut arena, s) = arena_with(&[("sa", "A"), ("sb", "B")]);

    let d = arena.process_message(&s[0], InputMessage::GameStarted, 0);
    assert!(!d.persist_registry);

    select(&mut arena, &s[0], 0);
    assert!(arena.process_message(&s[0], InputMessage::GameStarted, 1_000).persist_registry);
    arena.process_message(&s[0], InputMessage::PauseGame, 10_000);
    arena.process_message(&s[0], InputMessage::ResumeGame, 15_000);

    let update = arena.timer_update(16_000);
    assert_eq!(update.game_durations.get(&slot(0)), Some(&10.0));

    arena.process_message(&s[0], InputMessage::GameOver, 20_000);
    assert_eq!(arena.clocks().get(slot(0)).unwrap().phase(), ClockPhase::Over);
}

#[test]
fn publish_goes_to_others_only() {
    let (mut arena, s) = arena_with(&[("sa", "A")]);

    // No slot: dropped.
    let d = arena.process_message(&s[0], InputMessage::PublishSnapshot { snapshot: snapshot(1) }, 0);
    assert!(d.is_empty());

    select(&mut arena, &s[0], 3);
    let d = arena.process_message(&s[0], InputMessage::PublishSnapshot { snapshot: snapshot(2) }, 0);
    assert_eq!(d.outputs.len(), 1);
    assert_eq!(d.outputs[0].audience, Audience::Others);
    assert_eq!(
        d.outputs[0].message,
        OutputMessage::SnapshotBroadcast {
            index: slot(3),
            snapshot: snapshot(2)
        }
    );
    assert_eq!(arena.replicator().latest(slot(3)), Some(&snapshot(2)));
}

#[test]
fn release_clears_clock_and_snapshots() {
    let (mut arena, s) = arena_with(&[("sa", "A"), ("sb", "Spectator")]);
    select(&mut arena, &s[0], 1);
    arena.process_message(&s[0], InputMessage::GameStarted, 0);
    arena.process_message(&s[0], InputMessage::PublishSnapshot { snapshot: snapshot(7) }, 0);
    arena.process_message(&s[0], InputMessage::SaveSnapshot { snapshot: snapshot(7) }, 0);

    arena.process_message(&s[0], InputMessage::ReleaseSlot, 0);
    assert!(arena.clocks().get(slot(1)).is_none());
    assert!(arena.replicator().latest(slot(1)).is_none());

    let hydration = arena.hydrate(&s[1]).unwrap();
    match hydration.last() {
        Some(OutputMessage::AllSnapshots { snapshots }) => assert!(snapshots.is_empty()),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn reconnect_restores_saved_snapshot_to_owner_only() {
    let (mut arena, s) = arena_with(&[("sa", "A"), ("sb", "B")]);
    select(&mut arena, &s[0], 2);
    arena.process_message(&s[0], InputMessage::SaveSnapshot { snapshot: snapshot(42) }, 0);

    // Owner reconnects: same session, slot still held.
    let owner_view = arena.hydrate(&s[0]).unwrap();
    assert!(owner_view.contains(&OutputMessage::SavedSnapshotRestore {
        index: slot(2),
        snapshot: snapshot(42)
    }));
    assert!(owner_view.contains(&OutputMessage::PlayerTagAssigned {
        tag: arena.tag_of(&s[0]).unwrap()
    }));

    let other_view = arena.hydrate(&s[1]).unwrap();
    assert!(!other_view
        .iter()
        .any(|m| matches!(m, OutputMessage::SavedSnapshotRestore { .. })));

    // Explicit requests obey the same rule.
    let d = arena.process_message(&s[1], InputMessage::RequestSnapshot { index: 2 }, 0);
    assert!(d.is_empty());
    let d = arena.process_message(&s[0], InputMessage::RequestSnapshot { index: 2 }, 0);
    assert_eq!(d.for_origin().count(), 1);
}

#[test]
fn hydration_order() {
    let (arena, s) = arena_with(&[("sa", "A")]);
    let kinds: Vec<_> = arena
        .hydrate(&s[0])
        .unwrap()
        .iter()
        .map(|m| serde_json::to_value(m).unwrap()["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        kinds,
        vec!["chatHistory", "slotTableChanged", "nicknamesChanged", "playerTag", "allSnapshots"]
    );
}

#[test]
fn restore_rebuilds_ownership_and_clocks() {
    let (mut arena, s) = arena_with(&[("sa", "A")]);
    select(&mut arena, &s[0], 1);
    arena.process_message(&s[0], InputMessage::GameStarted, 1_000);
    say(&mut arena, &s[0], "hello", 2_000);

    let restored = Arena::restore(
        ArenaConfig::default(),
        arena.persisted_registry(),
        arena.chat_history(),
    );
    assert_eq!(restored.slots().slot_of(&s[0]), Some(slot(1)));
    assert_eq!(restored.tag_of(&s[0]), arena.tag_of(&s[0]));
    assert!(restored.clocks().get(slot(1)).is_some());
    assert_eq!(restored.chat().len(), 1);
    assert!(restored.identities().is_reserved("a"));
}

#[test]
fn restore_frees_slots_of_unknown_owners() {
    let (arena, s) = arena_with(&[("sa", "A")]);
    let mut registry = arena.persisted_registry();
    registry.slots[2] = Some(Slot {
        owner: SessionId::new("gone"),
        selected_at: 0,
    });
    registry.clocks.insert(slot(2), GameClock::started(0));

    let mut restored = Arena::restore(ArenaConfig::default(), registry, Vec::new());
    assert!(restored.slots().is_free(slot(2)));
    assert!(restored.clocks().get(slot(2)).is_none());
    assert_eq!(table(&restored), vec![None; 4]);

    let d = select(&mut restored, &s[0], 2);
    assert!(d
        .outputs
        .iter()
        .all(|r| !matches!(r.message, OutputMessage::SelectError { .. })));
    assert_eq!(restored.slots().slot_of(&s[0]), Some(slot(2)));
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[test]
fn chat_is_attributed_by_the_server() {
    let (mut arena, s) = arena_with(&[("sa", "Ann")]);
    let d = say(&mut arena, &s[0], "hi there", 123);
    assert!(d.persist_chat);
    match &d.outputs[0] {
        r if r.audience == Audience::Everyone => match &r.message {
            OutputMessage::ChatAppended { message } => {
                assert_eq!(message.nickname, "Ann");
                assert_eq!(message.timestamp, 123);
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }

    assert!(say(&mut arena, &s[0], "   ", 124).is_empty());

    let d = say(&mut arena, &s[0], &"x".repeat(5_000), 125);
    assert!(matches!(d.outputs[0].message, OutputMessage::SystemMessage { .. }));
    assert_eq!(arena.chat().len(), 1);
}

#[test]
fn rename_rewrites_history_and_frees_old_name() {
    let (mut arena, s) = arena_with(&[("sa", "old"), ("sb", "other")]);
    select(&mut arena, &s[0], 0);
    say(&mut arena, &s[0], "one", 1);
    say(&mut arena, &s[1], "two", 2);
    say(&mut arena, &s[0], "three", 3);

    let d = say(&mut arena, &s[0], "/rename new", 4);
    assert!(d.persist_chat && d.persist_registry);
    assert!(d.outputs.iter().any(|r| r.message
        == OutputMessage::UserRenamed {
            old_nickname: "old".into(),
            new_nickname: "new".into()
        }));
    assert!(d
        .for_others()
        .any(|m| matches!(m, OutputMessage::NicknamesChanged { .. })));
    assert!(d
        .for_origin()
        .any(|m| matches!(m, OutputMessage::RenameResult { ok: true, .. })));

    let authors: Vec<_> = arena.chat_history().into_iter().map(|m| m.nickname).collect();
    assert_eq!(authors, vec!["new", "other", "new"]);

    let newcomer = SessionId::new("sc");
    arena.register_nickname(&newcomer, "OLD").unwrap();
}

#[test]
fn rename_to_taken_nickname_fails() {
    let (mut arena, s) = arena_with(&[("sa", "one"), ("sb", "two")]);
    let d = say(&mut arena, &s[0], "/rename Two", 0);
    assert_eq!(d.outputs.len(), 1);
    assert!(matches!(
        d.outputs[0].message,
        OutputMessage::RenameResult { ok: false, .. }
    ));
    assert_eq!(arena.identities().nickname_of(&s[0]), Some("one"));

    let d = say(&mut arena, &s[0], "/rename", 0);
    assert!(matches!(
        d.outputs[0].message,
        OutputMessage::RenameResult { ok: false, .. }
    ));
}

#[test]
fn only_admin_can_clear() {
    let (mut arena, s) = arena_with(&[("sa", "Admin"), ("sb", "user")]);
    say(&mut arena, &s[1], "spam", 1);

    let d = say(&mut arena, &s[1], "/clear", 2);
    assert!(matches!(d.outputs[0].message, OutputMessage::SystemMessage { .. }));
    assert_eq!(arena.chat().len(), 1);

    let d = say(&mut arena, &s[0], "/clear", 3);
    assert!(arena.chat().is_empty());
    assert!(d.persist_chat);
    assert!(d.outputs.iter().any(|r| r.audience == Audience::Everyone
        && r.message == OutputMessage::ChatCleared));
}

#[test]
fn logout_releases_everything() {
    let (mut arena, s) = arena_with(&[("sa", "Ann")]);
    select(&mut arena, &s[0], 2);
    arena.process_message(&s[0], InputMessage::GameStarted, 0);

    let d = say(&mut arena, &s[0], "/logout", 10);
    assert!(d.close_origin);
    assert!(d.persist_registry);
    assert!(d.for_origin().any(|m| *m == OutputMessage::LoggedOut));
    assert!(d
        .outputs
        .iter()
        .any(|r| r.message == OutputMessage::SlotReset { index: slot(2) }));

    assert!(arena.slots().is_free(slot(2)));
    assert!(arena.clocks().get(slot(2)).is_none());
    assert!(!arena.identities().is_reserved("ann"));
    assert!(arena.hydrate(&s[0]).is_err());
}

#[test]
fn logout_then_second_connection_is_ignored() {
    let (mut arena, s) = arena_with(&[("sa", "Ann")]);
    say(&mut arena, &s[0], "/logout", 10);
    assert!(say(&mut arena, &s[0], "still here?", 11).is_empty());
    assert!(arena.chat().is_empty());
}

#[test]
fn outputs_serialize_with_type_tags() {
    let value = serde_json::to_value(OutputMessage::UserRenamed {
        old_nickname: "a".into(),
        new_nickname: "b".into(),
    })
    .unwrap();
    assert_eq!(value, json!({ "type": "userRenamed", "oldNickname": "a", "newNickname": "b" }));

    let input: InputMessage = serde_json::from_value(json!({ "type": "selectSlot", "index": 3 })).unwrap();
    assert_eq!(input, InputMessage::SelectSlot { index: 3 });
}
