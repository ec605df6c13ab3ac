use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{InviteRow, PostRow, UserRow};

/// Full application state, persisted as one document with three arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<UserRow>,
    #[serde(default)]
    pub posts: Vec<PostRow>,
    #[serde(default)]
    pub invite_tokens: Vec<InviteRow>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.posts.is_empty() && self.invite_tokens.is_empty()
    }
}

/// Where the snapshot is mirrored. `save` always receives the whole state.
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` means nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>>;

    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Move an unreadable snapshot out of the way so the next save cannot
    /// overwrite it. Returns where it went, if anywhere.
    fn set_aside(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Pretty-printed JSON file, replaced wholesale on every save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt_path(&self, at_ms: i64) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(format!(".corrupt-{at_ms}"));
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.temp_path();
        let mut file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("writing {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", tmp.display()))?;
        drop(file);
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn set_aside(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let target = self.corrupt_path(chrono::Utc::now().timestamp_millis());
        fs::rename(&self.path, &target)
            .with_context(|| format!("moving {} aside", self.path.display()))?;
        Ok(Some(target))
    }
}

/// Keeps nothing. State lives only as long as the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStore;

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(None)
    }

    fn save(&self, _snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
