//! One open/serve/close cycle over a record store.
//!
//! `StoreSession::open` loads persisted state. The store is saved exactly
//! once: by `close`, or by `Drop` on any other exit path (early return,
//! error propagation, unwinding). An abrupt process kill skips the save.

use crate::persistence::{JsonFileAdapter, PersistenceAdapter};
use crate::store::RecordStore;
use crate::StoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const LOCK_FILE: &str = "taskbook.lock";

struct SessionLock {
    file: File,
    path: PathBuf,
}

impl SessionLock {
    fn acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| StoreError::io(path, err))?;
        file.try_lock_exclusive().map_err(|err| lock_error(path, err))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

/// Contention means another session holds the store. Anything else, such as
/// a filesystem without lock support, is an I/O error.
fn lock_error(path: &Path, err: std::io::Error) -> StoreError {
    if err.kind() == fs2::lock_contended_error().kind() {
        StoreError::SessionLocked {
            path: path.to_path_buf(),
        }
    } else {
        StoreError::io(path, err)
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub struct StoreSession<A: PersistenceAdapter> {
    store: RecordStore,
    adapter: A,
    warnings: Vec<StoreError>,
    saved: bool,
    lock: Option<SessionLock>,
}

impl<A: PersistenceAdapter> StoreSession<A> {
    pub fn open(adapter: A) -> Result<Self, StoreError> {
        Self::open_inner(adapter, None)
    }

    /// Like `open`, but first takes an exclusive advisory lock on
    /// `lock_path` for the lifetime of the session.
    pub fn open_locked(adapter: A, lock_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let lock = SessionLock::acquire(lock_path.as_ref())?;
        Self::open_inner(adapter, Some(lock))
    }

    fn open_inner(adapter: A, lock: Option<SessionLock>) -> Result<Self, StoreError> {
        let loaded = adapter.load()?;
        let store = RecordStore::restore(loaded.records, loaded.index);
        info!(
            records = store.len(),
            warnings = loaded.warnings.len(),
            locked = lock.is_some(),
            "session opened"
        );
        Ok(Self {
            store,
            adapter,
            warnings: loaded.warnings,
            saved: false,
            lock,
        })
    }

    /// Problems found while loading that did not stop the session.
    pub fn warnings(&self) -> &[StoreError] {
        &self.warnings
    }

    pub fn lock_path(&self) -> Option<&Path> {
        self.lock.as_ref().map(|lock| lock.path.as_path())
    }

    /// Saves and ends the session, reporting a failed save to the caller.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.persist()
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        if self.saved {
            return Ok(());
        }
        self.saved = true;
        self.adapter
            .save(self.store.records(), self.store.index())?;
        info!(records = self.store.len(), "session closed");
        Ok(())
    }
}

impl StoreSession<JsonFileAdapter> {
    /// Opens `data.json` and `index.json` in `dir`, guarded by `taskbook.lock`.
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        Self::open_locked(JsonFileAdapter::in_dir(dir), dir.join(LOCK_FILE))
    }
}

impl<A: PersistenceAdapter> Deref for StoreSession<A> {
    type Target = RecordStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl<A: PersistenceAdapter> DerefMut for StoreSession<A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl<A: PersistenceAdapter> Drop for StoreSession<A> {
    fn drop(&mut self) {
        if let Err(err) = self.persist() {
            error!(error = %err, "failed to save store on session exit");
        }
    }
}
