// crates/arena-client/src/commands.rs

//! Stdin command parsing.
//!
//! Lines starting with `:` are client commands; anything else is sent as
//! chat, so `/rename`, `/clear` and `/logout` pass straight through.

use arena_core::{InputMessage, Snapshot};

pub const HELP: &str = "\
commands:
  :select <n>        claim slot n
  :release           give up your slot
  :start | :restart | :pause | :resume | :over
  :publish <json>    publish a snapshot of your game
  :save <json>       save a snapshot for reconnect
  :request <n>       ask for your saved snapshot
  :timers            toggle timer output
  :help              this text
  :quit              exit
anything else is chat (/rename <name>, /clear, /logout)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(InputMessage),
    ToggleTimers,
    Help,
    Quit,
}

/// Parse one stdin line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Some(Command::Send(InputMessage::SendChat {
            text: line.to_string(),
        })));
    };

    let (verb, arg) = match rest.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (rest, ""),
    };

    let send = |msg: InputMessage| -> Result<Option<Command>, String> {
        Ok(Some(Command::Send(msg)))
    };

    match verb {
        "select" => send(InputMessage::SelectSlot {
            index: parse_index(arg)?,
        }),
        "release" => send(InputMessage::ReleaseSlot),
        "start" => send(InputMessage::GameStarted),
        "restart" => send(InputMessage::GameRestarted),
        "pause" => send(InputMessage::PauseGame),
        "resume" => send(InputMessage::ResumeGame),
        "over" => send(InputMessage::GameOver),
        "publish" => send(InputMessage::PublishSnapshot {
            snapshot: parse_snapshot(arg)?,
        }),
        "save" => send(InputMessage::SaveSnapshot {
            snapshot: parse_snapshot(arg)?,
        }),
        "request" => send(InputMessage::RequestSnapshot {
            index: parse_index(arg)?,
        }),
        "timers" => Ok(Some(Command::ToggleTimers)),
        "help" => Ok(Some(Command::Help)),
        "quit" | "q" => Ok(Some(Command::Quit)),
        other => Err(format!("unknown command :{} (try :help)", other)),
    }
}

fn parse_index(arg: &str) -> Result<usize, String> {
    arg.parse()
        .map_err(|_| format!("expected a slot number, got {:?}", arg))
}

fn parse_snapshot(arg: &str) -> Result<Snapshot, String> {
    serde_json::from_str(arg)
        .map(Snapshot)
        .map_err(|e| format!("invalid snapshot json: {}", e))
}
