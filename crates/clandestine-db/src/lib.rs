pub mod accounts;
pub mod clock;
pub mod error;
pub mod invites;
mod migrations;
pub mod models;
pub mod posts;
pub mod snapshot;
pub mod sqlite;

use std::sync::Mutex;
use tracing::{error, info, warn};

pub use clock::{Clock, SystemClock};
pub use error::StoreError;
pub use snapshot::{JsonFileStore, MemoryStore, Snapshot, SnapshotStore};
pub use sqlite::SqliteStore;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Owns the users, posts and invite tokens.
///
/// Every operation locks the whole snapshot, so calls are serialised in
/// arrival order. Mutations are mirrored to the backing [`SnapshotStore`]
/// before the lock is released.
pub struct Database {
    snapshot: Mutex<Snapshot>,
    store: Box<dyn SnapshotStore>,
}

impl Database {
    /// Loads the snapshot from `store`. Anything that cannot be read starts
    /// an empty store instead of failing.
    pub fn open(store: impl SnapshotStore + 'static) -> Self {
        let snapshot = match store.load() {
            Ok(Some(snapshot)) => {
                info!(
                    "Snapshot loaded from {} ({} users, {} posts, {} invites)",
                    store.describe(),
                    snapshot.users.len(),
                    snapshot.posts.len(),
                    snapshot.invite_tokens.len()
                );
                snapshot
            }
            Ok(None) => {
                info!("No snapshot at {}, starting fresh", store.describe());
                Snapshot::default()
            }
            Err(e) => {
                warn!("Failed to load snapshot from {}: {:#}", store.describe(), e);
                match store.set_aside() {
                    Ok(Some(moved)) => warn!("Unreadable snapshot kept at {}", moved.display()),
                    Ok(None) => {}
                    Err(e) => error!("Could not move unreadable snapshot aside: {:#}", e),
                }
                warn!("Starting fresh");
                Snapshot::default()
            }
        };

        Self {
            snapshot: Mutex::new(snapshot),
            store: Box::new(store),
        }
    }

    /// A database that never touches disk.
    pub fn in_memory() -> Self {
        Self::open(MemoryStore)
    }

    pub fn with_snapshot<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Snapshot) -> Result<T>,
    {
        let snapshot = self.snapshot.lock().map_err(|_| StoreError::Poisoned)?;
        f(&snapshot)
    }

    /// Applies `f` and saves the snapshot if it succeeded. Nothing is saved
    /// when `f` returns an error, so it must not have mutated anything.
    pub fn with_snapshot_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        self.edit(|snapshot| f(snapshot).map(|value| (value, true)))
    }

    /// Like [`Self::with_snapshot_mut`], but `f` reports whether it changed
    /// anything and the save is skipped when it did not.
    pub(crate) fn edit<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<(T, bool)>,
    {
        let mut snapshot = self.snapshot.lock().map_err(|_| StoreError::Poisoned)?;
        let (value, changed) = f(&mut snapshot)?;
        if changed {
            self.persist(&snapshot);
        }
        Ok(value)
    }

    // A failed save leaves memory ahead of disk until the next successful one.
    fn persist(&self, snapshot: &Snapshot) {
        if let Err(e) = self.store.save(snapshot) {
            error!("Failed to save snapshot to {}: {:#}", self.store.describe(), e);
        }
    }
}

/// Next sequential id: one past the largest id in use.
pub(crate) fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().map_or(1, |max| max + 1)
}
