use async_trait::async_trait;
use chrono::{DateTime, Utc};
use convodeck_core::{KeyValueStore, KvError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

pub mod paths;

const FILE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entries: BTreeMap<String, String>,
}

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    entries: BTreeMap<String, String>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            entries: BTreeMap::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            entries: self.entries.clone(),
        }
    }

    fn from_image(img: FileImage) -> Self {
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            entries: img.entries,
        }
    }
}

/// Device-style persistent key-value store kept in one JSON file.
///
/// Reads are served from memory. Every mutation rewrites the file atomically
/// (temp file + rename) and drops a timestamped copy into `backups_dir`,
/// keeping at most `max_backups` of them.
pub struct JsonKvStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
    // Serializes flushes so the file never goes back to an older snapshot.
    flush: Mutex<()>,
}

impl JsonKvStore {
    pub async fn open_in(root: &Path, max_backups: usize) -> Result<Self, KvError> {
        let (file, backups) = paths::store_files_in(root);
        Self::open_with(file, backups, max_backups).await
    }

    pub async fn open_with(path: PathBuf, backups_dir: PathBuf, max_backups: usize) -> Result<Self, KvError> {
        ensure_parent_dirs(&path)?;
        fs::create_dir_all(&backups_dir)?;
        let max_backups = max_backups.max(1);
        let state = load_or_init(&path, &backups_dir, max_backups).await?;
        info!(path = %path.display(), keys = state.entries.len(), "opened json store");
        Ok(Self {
            path,
            backups_dir,
            max_backups,
            state: RwLock::new(state),
            flush: Mutex::new(()),
        })
    }

    /// Applies `change` to a copy of the current state, writes the copy and
    /// only then makes it visible. A failed write leaves memory untouched.
    async fn commit<F>(&self, change: F) -> Result<(), KvError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _gate = self.flush.lock().await;
        let mut next = self.state.read().clone();
        if !change(&mut next.entries) {
            return Ok(());
        }
        next.updated_at = Utc::now();
        let snapshot = next.to_image();
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &snapshot))
            .await
            .map_err(|e| KvError::Backend(format!("store writer task failed: {e}")))??;
        *self.state.write() = next;
        debug!(path = %self.path.display(), "flushed json store");
        Ok(())
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), KvError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn load_or_init(path: &Path, backups_dir: &Path, keep: usize) -> Result<State, KvError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            Ok::<FileImage, KvError>(serde_json::from_str::<FileImage>(&buf)?)
        })
        .await
        .map_err(|e| KvError::Backend(format!("store reader task failed: {e}")))??;
        if img.version > FILE_VERSION {
            return Err(KvError::Backend(format!(
                "store file version {} is newer than supported version {FILE_VERSION}",
                img.version
            )));
        }
        Ok(State::from_image(img))
    } else {
        let st = State::new_empty();
        write_with_backup(path, backups_dir, keep, &st.to_image())?;
        Ok(st)
    }
}

/// The main file write decides success. Backup copy and rotation are best
/// effort and only logged.
fn write_with_backup(path: &Path, backups_dir: &Path, max_backups: usize, img: &FileImage) -> Result<(), KvError> {
    let json = serde_json::to_vec_pretty(img)?;
    write_atomic(path, &json)?;

    if let Err(e) = write_backup(backups_dir, max_backups, &json) {
        warn!(dir = %backups_dir.display(), error = %e, "json store backup failed");
    }
    Ok(())
}

fn write_atomic(path: &Path, json: &[u8]) -> Result<(), KvError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| KvError::Io(e.error))?;
    Ok(())
}

fn write_backup(backups_dir: &Path, max_backups: usize, json: &[u8]) -> Result<(), KvError> {
    fs::create_dir_all(backups_dir)?;
    let ts = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    let backup_path = backups_dir.join(format!("convodeck-{ts}.json"));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(json)?;
    btmp.flush()?;
    btmp.persist(&backup_path).map_err(|e| KvError::Io(e.error))?;

    rotate_backups(backups_dir, max_backups)?;
    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // Timestamped names sort chronologically.
    entries.sort();
    if entries.len() > keep {
        for p in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(p);
        }
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.state.read().entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.commit(|entries| entries.remove(key).is_some()).await
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, KvError> {
        Ok(self.state.read().entries.keys().cloned().collect())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        let s = self.state.read();
        Ok(keys.iter().map(|k| (k.clone(), s.entries.get(k).cloned())).collect())
    }
}
