use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{PoolError, Result};
use crate::model::Lock;

/// Placeholder that keeps an otherwise empty collection directory in git.
pub const KEEP_FILE: &str = ".gitkeep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Unclaimed,
    Claimed,
}

impl Collection {
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Claimed => "claimed",
        }
    }
}

/// A pool directory inside a working copy, read as two disjoint lock
/// collections. Every mutation is local until the copy is published.
pub struct PoolView {
    name: String,
    dir: PathBuf,
}

impl PoolView {
    pub fn open(root: &Path, pool: &str) -> Self {
        Self {
            name: pool.to_string(),
            dir: root.join(pool),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.dir_name())
    }

    fn lock_path(&self, collection: Collection, lock: &str) -> PathBuf {
        self.collection_dir(collection).join(lock)
    }

    pub fn list_unclaimed(&self) -> Result<BTreeSet<String>> {
        self.list(Collection::Unclaimed)
    }

    pub fn list_claimed(&self) -> Result<BTreeSet<String>> {
        self.list(Collection::Claimed)
    }

    fn list(&self, collection: Collection) -> Result<BTreeSet<String>> {
        let entries = match fs::read_dir(self.collection_dir(collection)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.insert(name);
            }
        }
        Ok(names)
    }

    /// Which collection currently holds `lock`, if any.
    pub fn locate(&self, lock: &str) -> Option<Collection> {
        [Collection::Unclaimed, Collection::Claimed]
            .into_iter()
            .find(|&c| self.lock_path(c, lock).is_file())
    }

    pub fn payload(&self, lock: &str) -> Result<Vec<u8>> {
        let collection = self.locate(lock).ok_or_else(|| self.not_found(lock))?;
        Ok(fs::read(self.lock_path(collection, lock))?)
    }

    pub fn move_to_claimed(&self, lock: &str) -> Result<()> {
        validate_lock_name(lock)?;
        if self.locate(lock) != Some(Collection::Unclaimed) {
            return Err(self.not_found(lock));
        }
        self.relocate(lock, Collection::Unclaimed, Collection::Claimed)
    }

    pub fn move_to_unclaimed(&self, lock: &str) -> Result<()> {
        validate_lock_name(lock)?;
        if self.locate(lock) != Some(Collection::Claimed) {
            return Err(self.not_claimed(lock));
        }
        self.relocate(lock, Collection::Claimed, Collection::Unclaimed)
    }

    pub fn add(&self, lock: &Lock) -> Result<()> {
        self.insert(lock, Collection::Unclaimed)
    }

    pub fn add_claimed(&self, lock: &Lock) -> Result<()> {
        self.insert(lock, Collection::Claimed)
    }

    /// Remove a claimed lock from the pool entirely.
    pub fn delete(&self, lock: &str) -> Result<()> {
        validate_lock_name(lock)?;
        if self.locate(lock) != Some(Collection::Claimed) {
            return Err(self.not_claimed(lock));
        }
        fs::remove_file(self.lock_path(Collection::Claimed, lock))?;
        self.ensure_collection(Collection::Claimed)
    }

    fn insert(&self, lock: &Lock, collection: Collection) -> Result<()> {
        validate_lock_name(&lock.name)?;
        if self.locate(&lock.name).is_some() {
            return Err(PoolError::DuplicateLock {
                pool: self.name.clone(),
                lock: lock.name.clone(),
            });
        }
        self.ensure_collection(collection)?;
        fs::write(self.lock_path(collection, &lock.name), &lock.payload)?;
        Ok(())
    }

    fn relocate(&self, lock: &str, from: Collection, to: Collection) -> Result<()> {
        self.ensure_collection(to)?;
        fs::rename(self.lock_path(from, lock), self.lock_path(to, lock))?;
        self.ensure_collection(from)
    }

    /// Make sure a collection directory exists and survives being emptied.
    fn ensure_collection(&self, collection: Collection) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir)?;
        let keep = dir.join(KEEP_FILE);
        if !keep.exists() {
            fs::write(keep, b"")?;
        }
        Ok(())
    }

    fn not_found(&self, lock: &str) -> PoolError {
        PoolError::LockNotFound {
            pool: self.name.clone(),
            lock: lock.to_string(),
        }
    }

    fn not_claimed(&self, lock: &str) -> PoolError {
        PoolError::LockNotClaimed {
            pool: self.name.clone(),
            lock: lock.to_string(),
        }
    }
}

/// Lock names are single path components that are not hidden files.
pub fn validate_lock_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && name.trim() == name;
    if valid {
        Ok(())
    } else {
        Err(PoolError::InvalidLockName(name.to_string()))
    }
}
