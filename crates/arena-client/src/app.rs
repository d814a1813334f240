// crates/arena-client/src/app.rs

use std::collections::BTreeMap;

use arena_core::{ChatMessage, OutputMessage, PlayerTag, SlotIndex, TimerUpdate};
use arena_protocol::{Control, ServerFrame};
use chrono::{Local, TimeZone};

/// What the client knows about the arena, rebuilt from server events.
#[derive(Debug, Default)]
pub struct App {
    pub my_tag: Option<PlayerTag>,
    pub table: Vec<Option<PlayerTag>>,
    pub nicknames: Vec<Option<String>>,
    pub show_timers: bool,
    pub logged_out: bool,
    pub denied: Option<String>,
    pub message_count: u64,
}

impl App {
    pub fn new() -> Self {
        App::default()
    }

    /// The slot the server shows us owning, if any.
    pub fn my_slot(&self) -> Option<usize> {
        let tag = self.my_tag?;
        self.table.iter().position(|owner| *owner == Some(tag))
    }

    /// Fold one frame into the state and return the lines to print.
    pub fn handle_frame(&mut self, frame: ServerFrame) -> Vec<String> {
        self.message_count += 1;

        match frame {
            ServerFrame::Control(Control::Welcome { protocol_version }) => {
                vec![format!("* connected (protocol v{})", protocol_version)]
            }
            ServerFrame::Control(Control::Denied { reason }) => {
                let line = format!("* refused: {}", reason);
                self.denied = Some(reason);
                vec![line]
            }
            ServerFrame::Control(Control::NicknameResult { success, message }) => {
                let detail = message.unwrap_or_default();
                if success {
                    vec!["* nickname registered".to_string()]
                } else {
                    vec![format!("* nickname rejected: {}", detail)]
                }
            }
            ServerFrame::Event(msg) => self.handle_event(msg),
        }
    }

    fn handle_event(&mut self, msg: OutputMessage) -> Vec<String> {
        match msg {
            OutputMessage::SlotTableChanged { table } => {
                self.table = table;
                vec![self.render_slots()]
            }
            OutputMessage::NicknamesChanged { nicknames } => {
                self.nicknames = nicknames;
                vec![self.render_slots()]
            }
            OutputMessage::SlotReset { index } => vec![format!("* slot {} is free again", index)],
            OutputMessage::GameStartedAck { index } => {
                vec![format!("* slot {} is yours, game on", index)]
            }
            OutputMessage::SnapshotBroadcast { index, snapshot } => {
                vec![format!("[slot {}] {}", index, snapshot.0)]
            }
            OutputMessage::AllSnapshots { snapshots } => snapshots
                .into_iter()
                .map(|(index, snapshot)| format!("[slot {}] {}", index, snapshot.0))
                .collect(),
            OutputMessage::SavedSnapshotRestore { index, snapshot } => {
                vec![format!("* restored slot {}: {}", index, snapshot.0)]
            }
            OutputMessage::TimerUpdate(update) => {
                if self.show_timers {
                    vec![render_timers(&update)]
                } else {
                    Vec::new()
                }
            }
            OutputMessage::ChatAppended { message } => vec![render_chat(&message)],
            OutputMessage::ChatHistory { messages } => messages.iter().map(render_chat).collect(),
            OutputMessage::ChatCleared => vec!["* chat history cleared".to_string()],
            OutputMessage::UserRenamed {
                old_nickname,
                new_nickname,
            } => vec![format!("* {} is now known as {}", old_nickname, new_nickname)],
            OutputMessage::RenameResult { ok, message } => {
                let detail = message.unwrap_or_default();
                if ok {
                    vec![format!("* you are now {}", detail)]
                } else {
                    vec![format!("* rename failed: {}", detail)]
                }
            }
            OutputMessage::LoggedOut => {
                self.logged_out = true;
                vec!["* logged out".to_string()]
            }
            OutputMessage::PlayerTagAssigned { tag } => {
                self.my_tag = Some(tag);
                vec![format!("* you are player {}", tag)]
            }
            OutputMessage::SelectError { message } => vec![format!("* cannot select: {}", message)],
            OutputMessage::SystemMessage { message } => vec![format!("* {}", message)],
        }
    }

    /// `slots: 0:- 1:Ann(you) 2:- 3:Ben`
    pub fn render_slots(&self) -> String {
        let mut line = String::from("slots:");
        for (i, owner) in self.table.iter().enumerate() {
            let name = match (owner, self.nicknames.get(i).cloned().flatten()) {
                (None, _) => "-".to_string(),
                (Some(_), Some(nickname)) => nickname,
                (Some(tag), None) => tag.to_string(),
            };
            let you = if owner.is_some() && *owner == self.my_tag {
                "(you)"
            } else {
                ""
            };
            line.push_str(&format!(" {}:{}{}", i, name, you));
        }
        line
    }
}

pub fn render_chat(message: &ChatMessage) -> String {
    let when = Local
        .timestamp_millis_opt(message.timestamp as i64)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!("{} <{}> {}", when, message.nickname, message.text)
}

fn render_timers(update: &TimerUpdate) -> String {
    let fmt = |durations: &BTreeMap<SlotIndex, f64>| {
        durations
            .iter()
            .map(|(index, secs)| format!("{}={:.1}s", index, secs))
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!(
        "timers: selecting [{}] playing [{}]",
        fmt(&update.selection_durations),
        fmt(&update.game_durations)
    )
}
