use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use parking_lot::ReentrantMutex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::warn;

use super::Ledger;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ledger i/o: {0}")]
    Io(#[from] io::Error),
    #[error("ledger encoding: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed ledger of one node.
///
/// Every `load`/`save` runs under one re-entrant lock, so [`LedgerStore::update`]
/// can hold it across a whole load → mutate → save cycle while the inner calls
/// lock again. Saves go through a temp file in the same directory followed by a
/// rename, readers only ever see a complete snapshot.
pub struct LedgerStore {
    path: PathBuf,
    lock: ReentrantMutex<()>,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: ReentrantMutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger file. Missing or unparsable files yield an empty ledger.
    pub fn load(&self) -> Ledger {
        let _guard = self.lock.lock();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ledger::new(),
            Err(err) => {
                warn!(path = %self.path.display(), "ledger unreadable, using empty: {err}");
                return Ledger::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!(path = %self.path.display(), "ledger corrupt, using empty: {err}");
                Ledger::new()
            }
        }
    }

    pub fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        self.commit(|out| {
            let formatter = PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(out, formatter);
            ledger.serialize(&mut ser)?;
            Ok(())
        })
    }

    /// Read-only access under the lock.
    pub fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let _guard = self.lock.lock();
        f(&self.load())
    }

    /// Load, mutate and save as one critical section. Nothing is written when `f` fails.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut Ledger) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let _guard = self.lock.lock();
        let mut ledger = self.load();
        let out = f(&mut ledger)?;
        self.save(&ledger)?;
        Ok(out)
    }

    pub(crate) fn commit<F>(&self, write: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), StoreError>,
    {
        let _guard = self.lock.lock();
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // temp file is unlinked on drop, i.e. on every early return below
        let mut tmp = tempfile::Builder::new()
            .prefix(".ledger-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        write(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| StoreError::Io(err.error))?;
        Ok(())
    }
}
