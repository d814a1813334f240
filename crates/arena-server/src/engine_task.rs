//! Central engine loop.
//!
//! This task owns the `Arena` and the table of registered connections,
//! and processes every `EngineRequest` one at a time. A timer branch in
//! the same `select!` broadcasts `timerUpdate`, so the tick always reads
//! a state no request is halfway through changing.
//!
//! Routing follows each output's `Audience`:
//! - `Origin`: only the requesting connection.
//! - `Others`: every registered connection except the origin.
//! - `Everyone`: every registered connection.
//!
//! Outbound queues are bounded. A connection whose queue is full has
//! stopped reading; it is unregistered and told to close instead of
//! letting frames pile up.
//!
//! Persistence is requested after the mutation is committed; the writer
//! task does the I/O.

use std::collections::HashMap;
use std::time::Duration;

use arena_core::{now_millis, Arena, Audience, Dispatch, OutputMessage, SessionId};
use arena_protocol::{Control, ServerFrame};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::persistence::{PersistJob, PersistTx};
use crate::types::{
    ConnectionId, EngineRequest, EngineRx, EvictTx, NicknameReply, Outbound, OutboundTx,
};

/// A connection that passed the handshake and was hydrated.
struct Connection {
    session: SessionId,
    outbound: OutboundTx,
    evict: EvictTx,
}

impl Connection {
    /// Queue a frame. `false` only when the queue is full; a closed queue
    /// means the connection is already going away.
    fn push(&self, frame: ServerFrame) -> bool {
        !matches!(
            self.outbound.try_send(Outbound::Frame(frame)),
            Err(TrySendError::Full(_))
        )
    }
}

struct EngineState {
    arena: Arena,
    connections: HashMap<ConnectionId, Connection>,
    persist: PersistTx,
}

/// Run the central engine processing loop.
///
/// - `engine_rx`: receives requests from all connection tasks.
/// - `persist`: queue of the persistence writer.
/// - `tick`: period of the timer broadcast.
///
/// Returns once every `EngineTx` has been dropped.
pub async fn run_engine_loop(arena: Arena, mut engine_rx: EngineRx, persist: PersistTx, tick: Duration) {
    let mut state = EngineState {
        arena,
        connections: HashMap::new(),
        persist,
    };

    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            req = engine_rx.recv() => match req {
                Some(req) => state.handle_request(req),
                None => break,
            },
            _ = ticker.tick() => state.broadcast_timers(),
        }
    }

    info!("engine loop shutting down (engine_rx closed)");
}

impl EngineState {
    fn handle_request(&mut self, req: EngineRequest) {
        match req {
            EngineRequest::Connect {
                connection,
                session,
                outbound,
                evict,
            } => self.connect(connection, session, outbound, evict),

            EngineRequest::Input { connection, msg } => {
                let Some(session) = self.connections.get(&connection).map(|c| c.session.clone())
                else {
                    debug!(connection = connection.0, "input from unregistered connection dropped");
                    return;
                };
                let dispatch = self.arena.process_message(&session, msg, now_millis());
                self.apply(connection, dispatch);
            }

            EngineRequest::Disconnect { connection } => {
                if self.connections.remove(&connection).is_some() {
                    debug!(connection = connection.0, "connection unregistered");
                }
            }

            EngineRequest::SetNickname {
                session,
                nickname,
                reply,
            } => {
                let result: NicknameReply = match self.arena.register_nickname(&session, &nickname) {
                    Ok(dispatch) => {
                        info!(%nickname, "nickname bound");
                        self.persist(&dispatch);
                        Ok(())
                    }
                    Err(e) => {
                        debug!(%nickname, "nickname rejected: {}", e);
                        Err(e.to_string())
                    }
                };
                // The requester may have hung up already.
                let _ = reply.send(result);
            }
        }
    }

    fn connect(
        &mut self,
        connection: ConnectionId,
        session: SessionId,
        outbound: OutboundTx,
        evict: EvictTx,
    ) {
        match self.arena.hydrate(&session) {
            Ok(outputs) => {
                let conn = Connection {
                    session,
                    outbound,
                    evict,
                };
                let queued = std::iter::once(ServerFrame::from(Control::welcome()))
                    .chain(outputs.into_iter().map(ServerFrame::from))
                    .all(|frame| conn.push(frame));
                if !queued {
                    warn!(connection = connection.0, "outbound queue too small for hydration");
                    let _ = conn.evict.send(());
                    return;
                }
                info!(
                    connection = connection.0,
                    tag = ?self.arena.tag_of(&conn.session),
                    "connection hydrated"
                );
                self.connections.insert(connection, conn);
            }
            Err(e) => {
                warn!(connection = connection.0, "connection refused: {}", e);
                let _ = outbound.try_send(Outbound::Frame(ServerFrame::Control(Control::Denied {
                    reason: e.to_string(),
                })));
                let _ = outbound.try_send(Outbound::Close);
            }
        }
    }

    /// Route outputs, queue persistence, close the origin if asked.
    fn apply(&mut self, origin: ConnectionId, dispatch: Dispatch) {
        self.persist(&dispatch);

        for routed in &dispatch.outputs {
            match routed.audience {
                Audience::Origin => self.send_to(origin, &routed.message),
                Audience::Others => self.broadcast(Some(origin), &routed.message),
                Audience::Everyone => self.broadcast(None, &routed.message),
            }
        }

        if dispatch.close_origin {
            if let Some(conn) = self.connections.remove(&origin) {
                // If the queue is full, dropping the sender still ends the writer.
                let _ = conn.outbound.try_send(Outbound::Close);
                info!(connection = origin.0, "connection closed after logout");
            }
        }
    }

    fn persist(&self, dispatch: &Dispatch) {
        if dispatch.persist_registry {
            let _ = self
                .persist
                .send(PersistJob::Registry(self.arena.persisted_registry()));
        }
        if dispatch.persist_chat {
            let _ = self.persist.send(PersistJob::Chat(self.arena.chat_history()));
        }
    }

    fn send_to(&mut self, connection: ConnectionId, msg: &OutputMessage) {
        let full = match self.connections.get(&connection) {
            Some(conn) => !conn.push(msg.clone().into()),
            None => false,
        };
        if full {
            self.evict(connection);
        }
    }

    fn broadcast(&mut self, except: Option<ConnectionId>, msg: &OutputMessage) {
        let lagging: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .filter(|(_, conn)| !conn.push(msg.clone().into()))
            .map(|(id, _)| *id)
            .collect();
        for id in lagging {
            self.evict(id);
        }
    }

    /// Unregister a connection whose queue is full and tell its task to close.
    fn evict(&mut self, connection: ConnectionId) {
        if let Some(conn) = self.connections.remove(&connection) {
            warn!(
                connection = connection.0,
                capacity = conn.outbound.max_capacity(),
                "outbound queue full, dropping connection"
            );
            let _ = conn.evict.send(());
        }
    }

    fn broadcast_timers(&mut self) {
        if self.connections.is_empty() {
            return;
        }
        let update = OutputMessage::TimerUpdate(self.arena.timer_update(now_millis()));
        self.broadcast(None, &update);
    }
}
