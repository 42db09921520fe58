use std::path::Path;

use crate::error::Result;
use crate::model::Revision;

/// Result of an attempt to advance the shared branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publish {
    /// The remote now points at this new revision.
    Published(Revision),
    /// Someone else advanced the remote first; nothing was written.
    Conflict,
}

/// A shared, strictly ordered store of pool states.
pub trait Remote {
    type Copy: WorkingCopy;

    /// Materialize a private working copy at the current tip.
    fn checkout(&self) -> Result<Self::Copy>;
}

/// A private, disposable checkout owned by one in-flight operation.
///
/// Dropping the copy removes it from disk.
pub trait WorkingCopy {
    /// Directory the pool view reads and writes through.
    fn root(&self) -> &Path;

    /// Revision this copy was last synchronized at.
    fn revision(&self) -> &Revision;

    /// Throw away local mutations and move to the remote's current tip.
    fn resync(&mut self) -> Result<()>;

    /// Commit pending changes and advance the remote from `revision()` to
    /// the new commit, only if the remote has not moved in the meantime.
    fn publish(&mut self, message: &str) -> Result<Publish>;
}
