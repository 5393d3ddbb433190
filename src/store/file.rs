//! File Store Module
//!
//! Durable one-file-per-key storage with optional compression and a
//! periodic sweep that removes files whose TTL has elapsed. Reopening a
//! store against the same directory reconstructs the same logical key set,
//! giving cache persistence across process restarts.

use std::fmt::Display;
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::entry::current_timestamp_ms;
use crate::cache::CacheEntry;
use crate::error::{CacheResult, StoreError};
use crate::store::Store;

/// Zstd magic bytes (little-endian 0xFD2FB528), used to detect compressed
/// payloads on read regardless of the current compression setting.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

// == File Config ==
/// Configuration for a [`FileStore`].
#[derive(Debug, Clone)]
pub struct FileConfig {
    /// Directory holding one file per key
    pub directory: PathBuf,
    /// Extension for entry files, including the leading dot
    pub file_extension: String,
    /// Whether payloads are zstd-compressed on write
    pub compression_enabled: bool,
    /// Zstd compression level (0 uses the zstd default)
    pub compression_level: i32,
    /// Interval between background sweeps of expired files
    pub cleanup_interval: Duration,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("gencache"),
            file_extension: ".cache".to_string(),
            compression_enabled: false,
            compression_level: 3,
            cleanup_interval: Duration::from_secs(3600),
        }
    }
}

// == Deadline Projection ==
/// Minimal view of a persisted entry, enough for the sweep to decide
/// liveness without knowing the value type.
#[derive(Deserialize)]
struct EntryDeadline {
    expires_at: Option<u64>,
}

// == File Store ==
/// Persists each entry as its own file under the configured directory.
///
/// Writes are all-or-nothing per key (write to a `.tmp` sibling, then
/// rename), so a crash mid-write never corrupts other keys. A corrupt file
/// reads as a miss for that key only.
///
/// Two stores pointed at the same directory concurrently is caller error;
/// the layout assumes a single writer.
pub struct FileStore<K, V> {
    config: FileConfig,
    /// Background sweep task, aborted on close
    sweeper: Mutex<Option<JoinHandle<()>>>,
    _marker: PhantomData<fn(K) -> V>,
}

impl<K, V> FileStore<K, V>
where
    K: Display + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    // == Constructor ==
    /// Opens (or creates) a file store under `config.directory` and starts
    /// the background expiry sweep.
    ///
    /// Entries already on disk from a previous run are immediately
    /// retrievable; liveness is re-derived from the persisted deadline.
    pub async fn new(config: FileConfig) -> CacheResult<Self> {
        fs::create_dir_all(&config.directory)
            .await
            .map_err(|e| StoreError::io("create store directory", e))?;

        // A crash between the temp write and its rename leaves a `.tmp`
        // sibling behind; those never match the entry extension, so the
        // only place they get reclaimed is here at open time
        remove_stale_temp_files(&config.directory, &config.file_extension).await;

        let sweeper = spawn_sweep_task(
            config.directory.clone(),
            config.file_extension.clone(),
            config.cleanup_interval,
        );

        Ok(Self {
            config,
            sweeper: Mutex::new(Some(sweeper)),
            _marker: PhantomData,
        })
    }

    // == Path Mapping ==
    /// Maps a key to its file path deterministically.
    ///
    /// The key's display form is hex-encoded so arbitrary keys (path
    /// separators, dots, unicode) produce safe, collision-free file names.
    fn file_path(&self, key: &K) -> PathBuf {
        let display = key.to_string();
        let mut name = String::with_capacity(display.len() * 2);
        for byte in display.as_bytes() {
            let _ = write!(name, "{byte:02x}");
        }
        name.push_str(&self.config.file_extension);
        self.config.directory.join(name)
    }

    /// Encodes an entry to its on-disk payload.
    fn encode(&self, entry: &CacheEntry<V>) -> CacheResult<Vec<u8>> {
        let plain = serde_json::to_vec(entry).map_err(StoreError::Serialize)?;
        if !self.config.compression_enabled {
            return Ok(plain);
        }
        let compressed = zstd::encode_all(plain.as_slice(), self.config.compression_level)
            .map_err(|e| StoreError::io("compress entry", e))?;
        Ok(compressed)
    }
}

#[async_trait]
impl<K, V> Store<K, V> for FileStore<K, V>
where
    K: Display + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn get(&self, key: &K) -> CacheResult<Option<CacheEntry<V>>> {
        let path = self.file_path(key);
        let raw = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("read entry file", e).into()),
        };

        match decode_entry(&raw) {
            Some(entry) => Ok(Some(entry)),
            None => {
                // A corrupt file affects only its own key
                warn!(path = %path.display(), "discarding unreadable entry file");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: K, entry: CacheEntry<V>) -> CacheResult<()> {
        let payload = self.encode(&entry)?;
        let path = self.file_path(&key);

        // Write to a temp sibling first so the final rename is atomic and a
        // crash mid-write leaves the previous entry intact
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &payload)
            .await
            .map_err(|e| StoreError::io("write entry file", e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io("rename entry file", e))?;
        Ok(())
    }

    async fn delete(&self, key: &K) -> CacheResult<bool> {
        let path = self.file_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io("remove entry file", e).into()),
        }
    }

    async fn clear(&self) -> CacheResult<()> {
        let mut dir = fs::read_dir(&self.config.directory)
            .await
            .map_err(|e| StoreError::io("read store directory", e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io("read store directory", e))?
        {
            let path = item.path();
            if has_extension(&path, &self.config.file_extension) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| StoreError::io("remove entry file", e))?;
            }
        }
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        // Per-key writes are already atomic; only the sweep needs stopping
        let handle = self.sweeper.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        let mut dir = fs::read_dir(&self.config.directory)
            .await
            .map_err(|e| StoreError::io("read store directory", e))?;

        let mut count = 0;
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io("read store directory", e))?
        {
            if has_extension(&item.path(), &self.config.file_extension) {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl<K, V> Drop for FileStore<K, V> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.sweeper.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

// == Payload Decoding ==
/// Decodes an on-disk payload, decompressing when the zstd magic is present.
///
/// Returns None for payloads that fail decompression or deserialization.
fn decode_entry<V: DeserializeOwned>(raw: &[u8]) -> Option<CacheEntry<V>> {
    let plain;
    let bytes = if raw.starts_with(&ZSTD_MAGIC) {
        plain = zstd::decode_all(raw).ok()?;
        plain.as_slice()
    } else {
        raw
    };
    serde_json::from_slice(bytes).ok()
}

/// Removes `.tmp` siblings left over from writes interrupted before their
/// rename. Best-effort; failures are logged and do not block opening.
///
/// Safe to run only while no writer is active, which `FileStore::new`
/// guarantees under the single-writer layout rule.
async fn remove_stale_temp_files(directory: &Path, extension: &str) {
    let suffix = format!("{extension}.tmp");
    let mut dir = match fs::read_dir(directory).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "could not scan store directory for stale temp files");
            return;
        }
    };

    while let Ok(Some(item)) = dir.next_entry().await {
        let path = item.path();
        if !has_extension(&path, &suffix) {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => warn!(path = %path.display(), "removed stale temp file from interrupted write"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove stale temp file"),
        }
    }
}

/// Checks a path against the configured entry-file extension.
fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(extension))
}

// == Expiry Sweep ==
/// Spawns the background task that periodically removes expired files.
///
/// The sweep works one file at a time and takes no engine-level lock, so
/// concurrent cache operations are never starved by a long sweep.
fn spawn_sweep_task(
    directory: PathBuf,
    extension: String,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            directory = %directory.display(),
            interval_secs = interval.as_secs(),
            "starting file store expiry sweep"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a freshly reopened
        // store is swept only after a full interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = sweep_directory(&directory, &extension).await;
            if removed > 0 {
                info!(removed, "expiry sweep removed stale entry files");
            } else {
                debug!("expiry sweep found no expired entries");
            }
        }
    })
}

/// Removes every entry file under `directory` whose deadline has passed.
///
/// Returns the number of files removed. I/O failures on individual files
/// are logged and skipped; the sweep retries them next interval.
async fn sweep_directory(directory: &Path, extension: &str) -> usize {
    let mut dir = match fs::read_dir(directory).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "expiry sweep could not read store directory");
            return 0;
        }
    };

    let now = current_timestamp_ms();
    let mut removed = 0;

    loop {
        let item = match dir.next_entry().await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "expiry sweep stopped early");
                break;
            }
        };

        let path = item.path();
        if !has_extension(&path, extension) {
            continue;
        }

        let raw = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => continue, // raced with a concurrent delete
        };

        let expired = match decode_deadline(&raw) {
            Some(deadline) => deadline.expires_at.is_some_and(|at| now >= at),
            None => {
                warn!(path = %path.display(), "expiry sweep skipping unreadable file");
                continue;
            }
        };

        if expired && fs::remove_file(&path).await.is_ok() {
            removed += 1;
        }
    }

    removed
}

/// Parses just the expiration deadline out of a payload.
fn decode_deadline(raw: &[u8]) -> Option<EntryDeadline> {
    let plain;
    let bytes = if raw.starts_with(&ZSTD_MAGIC) {
        plain = zstd::decode_all(raw).ok()?;
        plain.as_slice()
    } else {
        raw
    };
    serde_json::from_slice(bytes).ok()
}
