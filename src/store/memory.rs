use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use git2::{ObjectType, Oid};
use log::debug;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::Result;
use crate::model::Revision;
use crate::store::remote::{Publish, Remote, WorkingCopy};

type Files = BTreeMap<PathBuf, Vec<u8>>;

#[derive(Debug, Clone)]
struct Snapshot {
    revision: Revision,
    files: Files,
}

/// In-process remote with the same compare-and-swap publish rule as a git
/// branch: an append-only history guarded by a mutex.
///
/// Clones share the same history, so each thread can hold its own handle.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    history: Arc<Mutex<Vec<Snapshot>>>,
}

impl MemoryRemote {
    pub fn new() -> Result<Self> {
        let root = Snapshot {
            revision: content_revision(None, "root", &Files::new())?,
            files: Files::new(),
        };
        Ok(Self {
            history: Arc::new(Mutex::new(vec![root])),
        })
    }

    fn history(&self) -> MutexGuard<'_, Vec<Snapshot>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tip_snapshot(&self) -> Snapshot {
        let history = self.history();
        history[history.len() - 1].clone()
    }

    pub fn tip(&self) -> Revision {
        self.tip_snapshot().revision
    }

    /// Every published revision, oldest first.
    pub fn revisions(&self) -> Vec<Revision> {
        self.history().iter().map(|s| s.revision.clone()).collect()
    }

    /// Contents of `path` at the current tip.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.tip_snapshot().files.get(path.as_ref()).cloned()
    }
}

impl Remote for MemoryRemote {
    type Copy = MemoryWorkingCopy;

    fn checkout(&self) -> Result<MemoryWorkingCopy> {
        let dir = tempfile::Builder::new().prefix("lockpool-mem-").tempdir()?;
        let tip = self.tip_snapshot();
        materialize(dir.path(), &tip.files)?;
        Ok(MemoryWorkingCopy {
            remote: self.clone(),
            dir,
            revision: tip.revision,
        })
    }
}

pub struct MemoryWorkingCopy {
    remote: MemoryRemote,
    dir: TempDir,
    revision: Revision,
}

impl WorkingCopy for MemoryWorkingCopy {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn revision(&self) -> &Revision {
        &self.revision
    }

    fn resync(&mut self) -> Result<()> {
        for entry in fs::read_dir(self.dir.path())? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        let tip = self.remote.tip_snapshot();
        materialize(self.dir.path(), &tip.files)?;
        self.revision = tip.revision;
        Ok(())
    }

    fn publish(&mut self, message: &str) -> Result<Publish> {
        let files = collect(self.dir.path())?;

        let mut history = self.remote.history();
        let tip = &history[history.len() - 1];
        if tip.revision != self.revision {
            debug!("memory publish rejected: {} moved to {}", self.revision, tip.revision);
            return Ok(Publish::Conflict);
        }

        let revision = content_revision(Some(&self.revision), message, &files)?;
        history.push(Snapshot {
            revision: revision.clone(),
            files,
        });
        self.revision = revision.clone();
        Ok(Publish::Published(revision))
    }
}

fn materialize(root: &Path, files: &Files) -> Result<()> {
    for (path, contents) in files {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, contents)?;
    }
    Ok(())
}

fn collect(root: &Path) -> Result<Files> {
    let mut files = Files::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(std::io::Error::other)?
            .to_path_buf();
        files.insert(relative, fs::read(entry.path())?);
    }
    Ok(files)
}

fn content_revision(parent: Option<&Revision>, message: &str, files: &Files) -> Result<Revision> {
    let mut content = Vec::new();
    if let Some(parent) = parent {
        content.extend_from_slice(parent.as_str().as_bytes());
    }
    content.push(b'\n');
    content.extend_from_slice(message.as_bytes());
    for (path, contents) in files {
        content.extend_from_slice(format!("\n{} {}\n", path.display(), contents.len()).as_bytes());
        content.extend_from_slice(contents);
    }
    Ok(Oid::hash_object(ObjectType::Blob, &content)?.into())
}
