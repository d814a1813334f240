// crates/arena-server/src/client.rs

//! Per-connection I/O.
//!
//! A connection starts with one handshake line:
//! - `setNickname`: forwarded to the engine, answered with
//!   `nicknameResult`, then the connection closes;
//! - `hello`: the token is verified and the connection is registered
//!   with the engine, which hydrates it (or refuses it).
//!
//! After a successful `hello` the reader forwards every decoded event to
//! the engine while a writer task drains the outbound queue. Malformed
//! event lines are logged and skipped; an oversized line closes the
//! connection. If the engine evicts the connection because its queue
//! filled up, the writer is aborted and the socket closed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arena_core::SessionId;
use arena_protocol::{
    decode_client_frame, encode_server_frame, ClientFrame, Control, Handshake, ProtocolError,
    ServerFrame, MAX_LINE_LEN,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::auth::SessionVerifier;
use crate::types::{ConnectionId, EngineRequest, EngineTx, EvictRx, Outbound, OutboundRx};

type LineReader = BufReader<OwnedReadHalf>;

/// Per-connection limits taken from the server config.
#[derive(Debug, Clone, Copy)]
pub struct ClientLimits {
    pub handshake_timeout: Duration,
    pub outbound_queue: usize,
}

/// Run the I/O for a single connection until it closes.
pub async fn run_client(
    connection: ConnectionId,
    stream: TcpStream,
    engine_tx: EngineTx,
    verifier: Arc<dyn SessionVerifier>,
    limits: ClientLimits,
) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let first = match timeout(limits.handshake_timeout, read_line(&mut reader)).await {
        Ok(line) => line?,
        Err(_) => {
            debug!(connection = connection.0, "handshake timed out");
            return Ok(());
        }
    };
    let Some(first) = first else {
        return Ok(());
    };

    match decode_client_frame(&first) {
        Ok(ClientFrame::Handshake(Handshake::SetNickname { session, nickname })) => {
            bootstrap_nickname(&mut write_half, &engine_tx, verifier.as_ref(), &session, nickname)
                .await
        }
        Ok(ClientFrame::Handshake(Handshake::Hello { session })) => {
            let Some(session) = verifier.verify(&session) else {
                deny(&mut write_half, "invalid session").await?;
                return Ok(());
            };
            let (out_tx, out_rx) = mpsc::channel(limits.outbound_queue);
            let (evict_tx, evict_rx) = oneshot::channel();
            engine_tx
                .send(EngineRequest::Connect {
                    connection,
                    session,
                    outbound: out_tx,
                    evict: evict_tx,
                })
                .context("engine channel closed")?;
            run_session(connection, reader, write_half, out_rx, evict_rx, engine_tx).await
        }
        Ok(ClientFrame::Event(_)) => deny(&mut write_half, "expected hello").await,
        Err(e) => deny(&mut write_half, &e.to_string()).await,
    }
}

/// Answer a `setNickname` request and close.
async fn bootstrap_nickname(
    writer: &mut OwnedWriteHalf,
    engine_tx: &EngineTx,
    verifier: &dyn SessionVerifier,
    token: &SessionId,
    nickname: String,
) -> anyhow::Result<()> {
    let result = match verifier.verify(token) {
        None => Err("invalid session".to_string()),
        Some(session) => {
            let (reply_tx, reply_rx) = oneshot::channel();
            engine_tx
                .send(EngineRequest::SetNickname {
                    session,
                    nickname,
                    reply: reply_tx,
                })
                .context("engine channel closed")?;
            reply_rx.await.context("engine dropped nickname request")?
        }
    };

    let (success, message) = match result {
        Ok(()) => (true, None),
        Err(reason) => (false, Some(reason)),
    };
    write_frame(writer, &Control::NicknameResult { success, message }.into()).await?;
    writer.shutdown().await.ok();
    Ok(())
}

/// Pump events for a registered connection until either side closes.
async fn run_session(
    connection: ConnectionId,
    mut reader: LineReader,
    writer: OwnedWriteHalf,
    out_rx: OutboundRx,
    mut evict_rx: EvictRx,
    engine_tx: EngineTx,
) -> anyhow::Result<()> {
    let mut writer_task = tokio::spawn(run_writer(connection, writer, out_rx));
    let mut writer_done = false;
    let mut evict_settled = false;

    loop {
        tokio::select! {
            line = read_line(&mut reader) => match line {
                Ok(Some(line)) => match decode_client_frame(&line) {
                    Ok(ClientFrame::Event(msg)) => {
                        if engine_tx.send(EngineRequest::Input { connection, msg }).is_err() {
                            warn!("engine channel closed");
                            break;
                        }
                    }
                    Ok(ClientFrame::Handshake(_)) => {
                        debug!(connection = connection.0, "repeated handshake ignored");
                    }
                    Err(ProtocolError::EmptyLine) => {}
                    Err(e) => warn!(connection = connection.0, "bad frame: {}", e),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(connection = connection.0, "read failed: {:#}", e);
                    break;
                }
            },
            _ = &mut writer_task => {
                writer_done = true;
                break;
            }
            evicted = &mut evict_rx, if !evict_settled => {
                evict_settled = true;
                // A dropped sender (logout) is not an eviction.
                if evicted.is_ok() {
                    // The writer may be stuck on a peer that stopped reading.
                    writer_task.abort();
                    writer_done = true;
                    break;
                }
            }
        }
    }

    let _ = engine_tx.send(EngineRequest::Disconnect { connection });
    if !writer_done {
        // The engine drops our sender on disconnect, which ends the writer.
        let _ = writer_task.await;
    }
    info!(connection = connection.0, "connection closed");
    Ok(())
}

async fn run_writer(connection: ConnectionId, mut writer: OwnedWriteHalf, mut out_rx: OutboundRx) {
    while let Some(item) = out_rx.recv().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(e) = write_frame(&mut writer, &frame).await {
                    debug!(connection = connection.0, "write failed: {:#}", e);
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}

async fn deny(writer: &mut OwnedWriteHalf, reason: &str) -> anyhow::Result<()> {
    write_frame(
        writer,
        &ServerFrame::Control(Control::Denied {
            reason: reason.to_string(),
        }),
    )
    .await?;
    writer.shutdown().await.ok();
    Ok(())
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &ServerFrame) -> anyhow::Result<()> {
    let line = encode_server_frame(frame)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one `\n`-terminated line of at most `MAX_LINE_LEN` bytes.
///
/// `Ok(None)` on a clean EOF. A final line without terminator is still
/// returned.
async fn read_line(reader: &mut LineReader) -> anyhow::Result<Option<String>> {
    let mut buf = Vec::new();
    let limit = MAX_LINE_LEN as u64 + 1;
    let n = reader.take(limit).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong {
            len: buf.len(),
            max: MAX_LINE_LEN,
        }
        .into());
    }

    let line = String::from_utf8(buf).context("line is not valid UTF-8")?;
    Ok(Some(line))
}
