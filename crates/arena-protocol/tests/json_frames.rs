// crates/arena-protocol/tests/json_frames.rs
use std::collections::BTreeMap;

use arena_core::{InputMessage, OutputMessage, SessionId, SlotIndex, Snapshot, TimerUpdate};
use arena_protocol::{
    decode_client_frame, decode_server_frame, encode_client_frame, encode_server_frame,
    ClientFrame, Control, Handshake, ProtocolError, ServerFrame, MAX_LINE_LEN, PROTOCOL_VERSION,
};
use serde_json::json;

#[test]
fn hello_is_a_handshake() {
    let frame = decode_client_frame(r#"{"type":"hello","session":"abc-123"}"#).unwrap();
    assert_eq!(
        frame,
        ClientFrame::Handshake(Handshake::Hello {
            session: SessionId::new("abc-123")
        })
    );
}

#[test]
fn set_nickname_is_a_handshake() {
    let line = "{\"type\":\"setNickname\",\"session\":\"s\",\"nickname\":\"Ann\"}\r\n";
    match decode_client_frame(line).unwrap() {
        ClientFrame::Handshake(Handshake::SetNickname { session, nickname }) => {
            assert_eq!(session.as_str(), "s");
            assert_eq!(nickname, "Ann");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn events_decode_as_input_messages() {
    let cases = [
        (r#"{"type":"selectSlot","index":2}"#, InputMessage::SelectSlot { index: 2 }),
        (r#"{"type":"releaseSlot"}"#, InputMessage::ReleaseSlot),
        (r#"{"type":"pauseGame"}"#, InputMessage::PauseGame),
        (r#"{"type":"requestSnapshot","index":0}"#, InputMessage::RequestSnapshot { index: 0 }),
        (
            r#"{"type":"sendChat","text":"/rename Bo"}"#,
            InputMessage::SendChat { text: "/rename Bo".into() },
        ),
    ];
    for (line, expected) in cases {
        assert_eq!(decode_client_frame(line).unwrap(), ClientFrame::Event(expected));
    }
}

#[test]
fn snapshot_payload_is_opaque() {
    let line = r#"{"type":"publishSnapshot","snapshot":{"board":[[1,0]],"paused":false,"x":{"y":null}}}"#;
    match decode_client_frame(line).unwrap() {
        ClientFrame::Event(InputMessage::PublishSnapshot { snapshot }) => {
            assert_eq!(snapshot.0["x"], json!({ "y": null }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn malformed_lines_are_rejected() {
    assert!(matches!(decode_client_frame(""), Err(ProtocolError::EmptyLine)));
    assert!(matches!(decode_client_frame("  \n"), Err(ProtocolError::EmptyLine)));
    assert!(matches!(decode_client_frame("{nope"), Err(ProtocolError::Json(_))));
    assert!(matches!(decode_client_frame(r#"{"index":1}"#), Err(ProtocolError::MissingType)));
    assert!(matches!(
        decode_client_frame(r#"{"type":"launchMissiles"}"#),
        Err(ProtocolError::Json(_))
    ));
    assert!(matches!(
        decode_client_frame(r#"{"type":"selectSlot"}"#),
        Err(ProtocolError::Json(_))
    ));
}

#[test]
fn oversized_line_is_rejected_before_parsing() {
    let line = "x".repeat(MAX_LINE_LEN + 1);
    assert!(matches!(
        decode_client_frame(&line),
        Err(ProtocolError::LineTooLong { .. })
    ));
}

#[test]
fn encoded_frames_are_single_lines() {
    let snapshot = Snapshot(json!({ "text": "multi\nline" }));
    let line = encode_server_frame(&ServerFrame::Event(OutputMessage::SnapshotBroadcast {
        index: SlotIndex::new(1).unwrap(),
        snapshot,
    }))
    .unwrap();
    assert!(line.ends_with('\n'));
    assert_eq!(line.matches('\n').count(), 1);
}

#[test]
fn control_frames_use_camel_case() {
    let line = encode_server_frame(&Control::welcome().into()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value, json!({ "type": "welcome", "protocolVersion": PROTOCOL_VERSION }));

    let line = encode_server_frame(
        &Control::NicknameResult {
            success: false,
            message: Some("taken".into()),
        }
        .into(),
    )
    .unwrap();
    assert_eq!(
        decode_server_frame(&line).unwrap(),
        ServerFrame::Control(Control::NicknameResult {
            success: false,
            message: Some("taken".into())
        })
    );
}

#[test]
fn timer_update_keys_survive_the_wire() {
    let mut update = TimerUpdate::default();
    update.game_durations.insert(SlotIndex::new(3).unwrap(), 12.5);
    update.selection_durations.insert(SlotIndex::new(0).unwrap(), 1.0);

    let line = encode_server_frame(&OutputMessage::TimerUpdate(update.clone()).into()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["gameDurations"]["3"], json!(12.5));

    assert_eq!(
        decode_server_frame(&line).unwrap(),
        ServerFrame::Event(OutputMessage::TimerUpdate(update))
    );
}

#[test]
fn all_snapshots_decode() {
    let mut snapshots = BTreeMap::new();
    snapshots.insert(SlotIndex::new(2).unwrap(), Snapshot(json!({ "score": 10 })));
    let msg = OutputMessage::AllSnapshots { snapshots };

    let line = encode_server_frame(&msg.clone().into()).unwrap();
    assert_eq!(decode_server_frame(&line).unwrap(), ServerFrame::Event(msg));
}

#[test]
fn client_frames_encode_back_to_the_same_json() {
    let frame = ClientFrame::Handshake(Handshake::SetNickname {
        session: SessionId::new("tok"),
        nickname: "Neo".into(),
    });
    let line = encode_client_frame(&frame).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value, json!({ "type": "setNickname", "session": "tok", "nickname": "Neo" }));

    // The display form never carries the token.
    let hello = ClientFrame::Handshake(Handshake::Hello {
        session: SessionId::new("secret"),
    });
    assert!(!hello.to_string().contains("secret"));
}

#[test]
fn out_of_range_slot_in_event_is_a_decode_error() {
    assert!(decode_server_frame(r#"{"type":"slotReset","index":7}"#).is_err());
}
