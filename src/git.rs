use chrono::{DateTime, Utc};
use git2::{Commit, Delta, DiffOptions, Oid, Repository, Sort};

use crate::error::{PoolError, Result};
use crate::model::{Lock, Revision};

/// A commit that changed something under a pool directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCommit {
    pub revision: Revision,
    pub summary: String,
    pub committed_at: DateTime<Utc>,
}

impl PoolCommit {
    fn from_commit(commit: &Commit<'_>) -> Self {
        Self {
            revision: commit.id().into(),
            summary: commit.summary().unwrap_or("(no message)").to_string(),
            committed_at: DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
        }
    }
}

/// Commits from HEAD that touch `<pool>/`, oldest first.
///
/// With `since`, returns everything from that revision (inclusive) onwards.
/// Without it, or when `since` is not in the history, returns only the
/// latest pool commit.
pub fn pool_history(
    repo: &Repository,
    pool: &str,
    since: Option<&Revision>,
) -> Result<Vec<PoolCommit>> {
    let since = since.and_then(|r| Oid::from_str(r.as_str()).ok());

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut newest_first = Vec::new();
    let mut reached_since = false;
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        let is_since = Some(commit.id()) == since;
        if is_since || !changed_locks(repo, &commit, pool)?.is_empty() {
            newest_first.push(PoolCommit::from_commit(&commit));
        }
        if is_since {
            reached_since = true;
            break;
        }
        if since.is_none() && !newest_first.is_empty() {
            break;
        }
    }

    if !reached_since {
        newest_first.truncate(1);
    }
    newest_first.reverse();
    Ok(newest_first)
}

/// The lock changed by `revision` in `pool`, with its payload as of that
/// revision (or just before it, when the revision removed the lock).
pub fn lock_at(repo: &Repository, pool: &str, revision: &Revision) -> Result<Lock> {
    let commit = Oid::from_str(revision.as_str())
        .and_then(|oid| repo.find_commit(oid))
        .map_err(|_| PoolError::RevisionNotFound(revision.to_string()))?;

    let mut changes = changed_locks(repo, &commit, pool)?;
    // Prefer the side of a move that still exists at this revision.
    changes.sort_by_key(|change| change.deleted);

    let change = changes
        .into_iter()
        .next()
        .ok_or_else(|| PoolError::NoLockInRevision {
            pool: pool.to_string(),
            revision: revision.to_string(),
        })?;
    let payload = repo.find_blob(change.blob)?.content().to_vec();
    Ok(Lock::new(change.name, payload))
}

struct LockChange {
    name: String,
    blob: Oid,
    deleted: bool,
}

/// Lock files under `<pool>/` that `commit` changed relative to its first
/// parent. Placeholder files are skipped.
fn changed_locks(repo: &Repository, commit: &Commit<'_>, pool: &str) -> Result<Vec<LockChange>> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parents().next() {
        Some(parent) => Some(parent.tree()?),
        None => None,
    };

    let mut options = DiffOptions::new();
    options.pathspec(pool);
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut options))?;

    let prefix = format!("{pool}/");
    let changes = diff
        .deltas()
        .filter_map(|delta| {
            let deleted = delta.status() == Delta::Deleted;
            let file = if deleted {
                delta.old_file()
            } else {
                delta.new_file()
            };
            let path = file.path()?.to_string_lossy().replace('\\', "/");
            let rest = path.strip_prefix(&prefix)?;
            let (_collection, name) = rest.split_once('/')?;
            if name.is_empty() || name.starts_with('.') || name.contains('/') {
                return None;
            }
            Some(LockChange {
                name: name.to_string(),
                blob: file.id(),
                deleted,
            })
        })
        .collect();
    Ok(changes)
}
