// crates/arena-client/src/network.rs

use anyhow::{anyhow, bail, Context, Result};
use arena_core::{InputMessage, OutputMessage, SessionId};
use arena_protocol::{
    decode_server_frame, encode_client_frame, ClientFrame, Control, Handshake, ServerFrame,
};
use arena_protocol::MAX_LINE_LEN;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Give up after this many failed reconnects in a row.
const MAX_RECONNECT_ATTEMPTS: u32 = 6;

/// Ask the server to bind `nickname` to `session`.
///
/// Returns the server's rejection reason as an error.
pub async fn set_nickname(server_addr: &str, session: &SessionId, nickname: &str) -> Result<()> {
    let stream = TcpStream::connect(server_addr)
        .await
        .with_context(|| format!("failed to connect to {}", server_addr))?;
    let (read, mut write) = stream.into_split();

    let frame = ClientFrame::Handshake(Handshake::SetNickname {
        session: session.clone(),
        nickname: nickname.to_string(),
    });
    write.write_all(encode_client_frame(&frame)?.as_bytes()).await?;

    let mut line = String::new();
    BufReader::new(read).read_line(&mut line).await?;
    match decode_server_frame(&line)? {
        ServerFrame::Control(Control::NicknameResult { success: true, .. }) => Ok(()),
        ServerFrame::Control(Control::NicknameResult { message, .. }) => {
            bail!("{}", message.unwrap_or_else(|| "nickname rejected".to_string()))
        }
        other => bail!("unexpected reply: {:?}", other),
    }
}

/// A real-time connection that re-sends `hello` after reconnecting.
pub struct ArenaConnection {
    server_addr: String,
    session: SessionId,
    reader: Option<OwnedReadHalf>,
    writer: Option<OwnedWriteHalf>,
    /// Bytes of a line not yet terminated. Survives a cancelled read.
    read_buffer: Vec<u8>,
    tx: UnboundedSender<ServerFrame>,
    reconnect_attempts: u32,
}

impl ArenaConnection {
    pub fn new(server_addr: &str, session: SessionId, tx: UnboundedSender<ServerFrame>) -> Self {
        Self {
            server_addr: server_addr.to_string(),
            session,
            reader: None,
            writer: None,
            read_buffer: Vec::with_capacity(8192),
            tx,
            reconnect_attempts: 0,
        }
    }

    /// Connect and send `hello`.
    pub async fn connect(&mut self) -> Result<()> {
        info!("connecting to {}...", self.server_addr);

        let stream = TcpStream::connect(&self.server_addr).await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        self.reader = Some(read);
        self.writer = Some(write);
        self.read_buffer.clear();

        self.send_frame(&ClientFrame::Handshake(Handshake::Hello {
            session: self.session.clone(),
        }))
        .await?;

        self.reconnect_attempts = 0;
        info!("connected");
        Ok(())
    }

    pub async fn send(&mut self, msg: InputMessage) -> Result<()> {
        debug!("sending {:?}", msg);
        self.send_frame(&ClientFrame::Event(msg)).await
    }

    async fn send_frame(&mut self, frame: &ClientFrame) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| anyhow!("not connected"))?;
        let line = encode_client_frame(frame)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Pump frames both ways until the server ends the session, the
    /// app drops its sender, or reconnecting fails for good.
    pub async fn run(&mut self, mut rx: UnboundedReceiver<InputMessage>) {
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        if let Err(e) = self.send(msg).await {
                            error!("failed to send message: {}", e);
                            if !self.handle_disconnect().await {
                                return;
                            }
                        }
                    }
                    None => return,
                },

                result = self.read_frame() => match result {
                    Ok(Some(frame)) => {
                        let terminal = is_terminal(&frame);
                        if self.tx.send(frame).is_err() {
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                    Ok(None) => {
                        if !self.handle_disconnect().await {
                            return;
                        }
                    }
                    Err(e) => {
                        error!("read error: {}", e);
                        if !self.handle_disconnect().await {
                            return;
                        }
                    }
                },
            }
        }
    }

    async fn read_frame(&mut self) -> Result<Option<ServerFrame>> {
        let reader = self.reader.as_mut().ok_or_else(|| anyhow!("not connected"))?;

        // Only `read` is awaited, so a frame half-received when select!
        // picks another branch stays in `read_buffer` for the next call.
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.read_buffer[scanned..].iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.read_buffer.drain(..=scanned + pos).collect();
                let line = std::str::from_utf8(&line).context("frame is not utf-8")?;
                return Ok(Some(decode_server_frame(line)?));
            }
            if self.read_buffer.len() > MAX_LINE_LEN {
                bail!("server line exceeds {} bytes", MAX_LINE_LEN);
            }
            scanned = self.read_buffer.len();

            let mut buf = [0u8; 4096];
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            self.read_buffer.extend_from_slice(&buf[..n]);
        }
    }

    /// Reconnect with exponential backoff. `false` once we give up.
    async fn handle_disconnect(&mut self) -> bool {
        self.reader = None;
        self.writer = None;

        while self.reconnect_attempts < MAX_RECONNECT_ATTEMPTS {
            self.reconnect_attempts += 1;
            let delay = Duration::from_millis(500 * 2_u64.pow(self.reconnect_attempts.min(5)));
            warn!(
                "connection lost, reconnecting in {:?} (attempt {})",
                delay, self.reconnect_attempts
            );
            tokio::time::sleep(delay).await;

            match self.connect().await {
                Ok(()) => return true,
                Err(e) => error!("reconnection failed: {}", e),
            }
        }
        false
    }
}

/// Frames after which the server closes the connection for good.
fn is_terminal(frame: &ServerFrame) -> bool {
    matches!(
        frame,
        ServerFrame::Control(Control::Denied { .. }) | ServerFrame::Event(OutputMessage::LoggedOut)
    )
}
