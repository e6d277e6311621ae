use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::PathBuf,
    sync::Arc,
};

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::SessionKey;

/// One inbound message persisted for session continuity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRecord {
    /// Unix seconds at which the message arrived.
    pub timestamp: i64,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub channel_id: String,
    pub body: String,
}

/// Persistence boundary for session continuity.
///
/// The host platform supplies its own implementation when pontoon runs
/// embedded; [`JsonlSessionStore`] is the standalone default.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Timestamp (unix seconds) of the most recent record in the session,
    /// or `None` for a fresh session. Drives time-gap separators.
    async fn read_continuity_marker(&self, key: &SessionKey) -> Result<Option<i64>>;

    /// Append one inbound record to the session.
    async fn record_inbound(&self, key: &SessionKey, record: InboundRecord) -> Result<()>;
}

/// Persist an inbound record on a detached task so reply generation never
/// waits on storage. Failures are routed to `on_error` and nowhere else —
/// a session-record failure must not cost the user their reply.
pub fn record_inbound_detached<F>(
    store: Arc<dyn SessionStore>,
    key: SessionKey,
    record: InboundRecord,
    on_error: F,
) where
    F: FnOnce(anyhow::Error) + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = store.record_inbound(&key, record).await {
            on_error(e);
        }
    });
}

/// Append-only JSONL session storage with file locking.
pub struct JsonlSessionStore {
    pub base_dir: PathBuf,
}

impl JsonlSessionStore {
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Sanitize a session key for use as a filename.
    fn key_to_filename(key: &SessionKey) -> String {
        key.as_str().replace(':', "_")
    }

    fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.base_dir
            .join(format!("{}.jsonl", Self::key_to_filename(key)))
    }
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn read_continuity_marker(&self, key: &SessionKey) -> Result<Option<i64>> {
        let path = self.path_for(key);

        tokio::task::spawn_blocking(move || -> Result<Option<i64>> {
            let file = match fs::File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let mut last = None;
            for line in BufReader::new(file).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: InboundRecord = serde_json::from_str(&line)?;
                last = Some(record.timestamp);
            }
            Ok(last)
        })
        .await?
    }

    async fn record_inbound(&self, key: &SessionKey, record: InboundRecord) -> Result<()> {
        let path = self.path_for(key);
        let base_dir = self.base_dir.clone();
        let line = serde_json::to_string(&record)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            fs::create_dir_all(&base_dir)?;
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut lock = fd_lock::RwLock::new(file);
            let mut guard = lock.write()?;
            guard.write_all(line.as_bytes())?;
            guard.write_all(b"\n")?;
            Ok(())
        })
        .await?
    }
}
