//! Ledger persistence with file locking.
//!
//! The full ledger is stored as one JSON document named after
//! [`STORAGE_NAME`] inside the data directory. Writes are atomic
//! (temp file + rename) and [`LedgerStore::update`] serializes concurrent
//! processes on a sibling lock file so every mutation is one transaction.

use crate::{Error, Ledger, LedgerSnapshot, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Fixed key under which the ledger document is stored
pub const STORAGE_NAME: &str = "peptide-log-storage";

/// JSON-file store for a [`Ledger`]
#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Store for an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the standard location inside a data directory
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(format!("{}.json", STORAGE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    /// Load the ledger with shared locking
    ///
    /// Returns an empty ledger if the file doesn't exist.
    /// If the file is corrupted, it is moved aside to `*.json.corrupt`
    /// and an empty ledger is returned.
    pub fn load(&self) -> Result<Ledger> {
        if !self.path.exists() {
            tracing::info!("No ledger file at {:?}, starting empty", self.path);
            return Ok(Ledger::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<LedgerSnapshot>(&contents) {
            Ok(snapshot) => {
                tracing::debug!(
                    "Loaded {} vials and {} logs from {:?}",
                    snapshot.vials.len(),
                    snapshot.logs.len(),
                    self.path
                );
                Ok(Ledger::from_snapshot(snapshot))
            }
            Err(e) => {
                let backup = self.corrupt_path();
                tracing::warn!(
                    "Failed to parse ledger file {:?}: {}. Moving it to {:?} and starting empty.",
                    self.path,
                    e,
                    backup
                );
                std::fs::rename(&self.path, &backup)?;
                Ok(Ledger::new())
            }
        }
    }

    /// Save the ledger with exclusive locking
    ///
    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::State(format!("ledger path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        // Unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(&ledger.snapshot())?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved ledger to {:?}", self.path);
        Ok(())
    }

    /// Load the ledger, modify it, and save it back as one transaction
    ///
    /// An exclusive lock on `*.json.lock` is held for the whole
    /// load-modify-save cycle so concurrent processes cannot interleave.
    /// Nothing is written if `f` returns an error.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Ledger) -> Result<T>,
    {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let result = self.load().and_then(|mut ledger| {
            let value = f(&mut ledger)?;
            self.save(&ledger)?;
            Ok(value)
        });

        lock.unlock()?;
        result
    }
}
