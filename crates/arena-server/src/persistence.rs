//! Durable state on disk.
//!
//! Two JSON files live in the data directory:
//! - `registry.json`: slots, identities, reservations, clocks, tag counter
//! - `chat_history.json`: the capped chat log
//!
//! The engine task never touches the filesystem. After a mutation it
//! hands a copy of the new state to the writer task, which replaces the
//! file atomically (write `*.tmp`, then rename). Jobs queued while a write
//! is in flight are coalesced so only the newest state of each file is
//! written. Write failures are logged and the in-memory state stands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use arena_core::{ChatMessage, PersistedRegistry, REGISTRY_FORMAT_VERSION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const REGISTRY_FILE: &str = "registry.json";
pub const CHAT_FILE: &str = "chat_history.json";

/// State recovered at startup.
#[derive(Debug, Default)]
pub struct LoadedState {
    pub registry: PersistedRegistry,
    pub chat: Vec<ChatMessage>,
}

#[derive(Debug, Clone)]
pub enum PersistJob {
    Registry(PersistedRegistry),
    Chat(Vec<ChatMessage>),
}

pub type PersistTx = mpsc::UnboundedSender<PersistJob>;
pub type PersistRx = mpsc::UnboundedReceiver<PersistJob>;

/// Load both files from `dir`.
///
/// A missing file means a fresh start. An unreadable or corrupt file is
/// logged and treated as missing; startup never fails on bad state.
pub fn load_state(dir: &Path) -> LoadedState {
    let mut registry: PersistedRegistry = load_json(&dir.join(REGISTRY_FILE));
    if registry.version > REGISTRY_FORMAT_VERSION {
        warn!(
            version = registry.version,
            supported = REGISTRY_FORMAT_VERSION,
            "registry written by a newer server, starting empty"
        );
        registry = PersistedRegistry::default();
    }

    let chat: Vec<ChatMessage> = load_json(&dir.join(CHAT_FILE));

    info!(
        identities = registry.identities.len(),
        owned_slots = registry.slots.iter().filter(|s| s.is_some()).count(),
        chat_messages = chat.len(),
        "loaded persisted state from {}",
        dir.display()
    );

    LoadedState { registry, chat }
}

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found, starting empty", path.display());
            return T::default();
        }
        Err(e) => {
            error!("failed to read {}: {}", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(value) => value,
        Err(e) => {
            error!("ignoring corrupt {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Serialize `value` and atomically replace `path` with it.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, data)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Spawn the writer task for `dir`.
///
/// The task exits once every `PersistTx` clone is dropped and the queue
/// is drained, so awaiting the handle flushes pending writes.
pub fn spawn_writer(dir: PathBuf) -> (PersistTx, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_writer(dir, rx));
    (tx, handle)
}

async fn run_writer(dir: PathBuf, mut rx: PersistRx) {
    let registry_path = dir.join(REGISTRY_FILE);
    let chat_path = dir.join(CHAT_FILE);

    while let Some(job) = rx.recv().await {
        let mut registry = None;
        let mut chat = None;

        let mut absorb = |job: PersistJob| match job {
            PersistJob::Registry(r) => registry = Some(r),
            PersistJob::Chat(c) => chat = Some(c),
        };
        absorb(job);
        while let Ok(job) = rx.try_recv() {
            absorb(job);
        }

        if let Some(registry) = registry {
            match write_json_atomic(&registry_path, &registry).await {
                Ok(()) => debug!("registry persisted"),
                Err(e) => error!("registry write failed: {:#}", e),
            }
        }
        if let Some(chat) = chat {
            match write_json_atomic(&chat_path, &chat).await {
                Ok(()) => debug!(messages = chat.len(), "chat history persisted"),
                Err(e) => error!("chat history write failed: {:#}", e),
            }
        }
    }

    debug!("persistence writer shutting down");
}
