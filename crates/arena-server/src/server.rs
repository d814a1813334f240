//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Loads persisted state and builds the `Arena`.
//! - Spawns the persistence writer and the single engine task that owns
//!   the `Arena`.
//! - Accepts TCP connections, assigns each a `ConnectionId` and spawns a
//!   per-connection task (see `client`).
//!
//! Open connections are capped by a semaphore; a connection over the
//! cap is closed immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use arena_core::Arena;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::auth::{OpaqueTokenVerifier, SessionVerifier};
use crate::client::{self, ClientLimits};
use crate::config::Config;
use crate::engine_task;
use crate::persistence;
use crate::types::{ConnectionId, EngineRx, EngineTx};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind the configured address and serve forever.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);

    serve(listener, config, Arc::new(OpaqueTokenVerifier)).await
}

/// Serve on an already bound listener.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    verifier: Arc<dyn SessionVerifier>,
) -> anyhow::Result<()> {
    let loaded = persistence::load_state(&config.data_dir);
    let arena = Arena::restore(config.arena_config(), loaded.registry, loaded.chat);

    let (persist_tx, _writer) = persistence::spawn_writer(config.data_dir.clone());

    // Channel from connections → engine task.
    let (engine_tx, engine_rx): (EngineTx, EngineRx) = mpsc::unbounded_channel();

    tokio::spawn(engine_task::run_engine_loop(
        arena,
        engine_rx,
        persist_tx,
        config.tick,
    ));

    let permits = Arc::new(Semaphore::new(config.max_clients));

    loop {
        let (stream, peer_addr) = listener.accept().await?;

        let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
            warn!(
                "rejecting connection from {}: max_clients ({}) reached",
                peer_addr, config.max_clients
            );
            // Dropping the stream closes it.
            continue;
        };

        let connection = next_connection_id();
        debug!(connection = connection.0, "accepted connection from {}", peer_addr);

        let engine_tx = engine_tx.clone();
        let verifier = Arc::clone(&verifier);
        let limits = ClientLimits {
            handshake_timeout: config.handshake_timeout,
            outbound_queue: config.outbound_queue,
        };

        tokio::spawn(async move {
            if let Err(e) = client::run_client(connection, stream, engine_tx, verifier, limits).await {
                warn!(connection = connection.0, "connection error: {:#}", e);
            }
            drop(permit);
        });
    }
}
