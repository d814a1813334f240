//! Shared types for the arena TCP server.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for open connections
//! - `Outbound`: what the engine task pushes to a connection's writer
//! - `EngineRequest`: messages flowing from connections to the engine
//! - channel aliases between them

use arena_core::{InputMessage, SessionId};
use arena_protocol::ServerFrame;
use tokio::sync::{mpsc, oneshot};

/// Identifier for an open connection.
///
/// Unique over the lifetime of the process. One session may hold
/// several connections at once (e.g. two browser tabs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Item on a connection's outbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Frame(ServerFrame),
    /// Flush what was queued before, then close the connection.
    Close,
}

/// Bounded: a connection whose queue fills up is evicted.
pub type OutboundTx = mpsc::Sender<Outbound>;
pub type OutboundRx = mpsc::Receiver<Outbound>;

/// Fired by the engine when it evicts a connection that stopped reading.
pub type EvictTx = oneshot::Sender<()>;
pub type EvictRx = oneshot::Receiver<()>;

/// Reply to a nickname bootstrap: `Err` carries the user-facing reason.
pub type NicknameReply = Result<(), String>;

/// Message flowing from a connection task into the engine task.
#[derive(Debug)]
pub enum EngineRequest {
    /// An authenticated connection wants to be hydrated and registered.
    Connect {
        connection: ConnectionId,
        session: SessionId,
        outbound: OutboundTx,
        evict: EvictTx,
    },

    /// A real-time event from a registered connection.
    Input {
        connection: ConnectionId,
        msg: InputMessage,
    },

    /// The connection is gone; stop routing to it.
    Disconnect { connection: ConnectionId },

    /// Out-of-band identity bootstrap.
    SetNickname {
        session: SessionId,
        nickname: String,
        reply: oneshot::Sender<NicknameReply>,
    },
}

/// Channel from connections → engine task.
pub type EngineTx = mpsc::UnboundedSender<EngineRequest>;
pub type EngineRx = mpsc::UnboundedReceiver<EngineRequest>;
