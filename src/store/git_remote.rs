use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions,
    RemoteCallbacks, Repository, ResetType, Signature,
};
use log::{debug, info};
use tempfile::TempDir;

use crate::config::Source;
use crate::error::{PoolError, Result};
use crate::model::Revision;
use crate::store::remote::{Publish, Remote, WorkingCopy};

const COMMITTER_NAME: &str = "Lock Pool";
const COMMITTER_EMAIL: &str = "lockpool@localhost";
const ORIGIN: &str = "origin";
const STAGING_PREFIX: &str = "refs/lockpool/staging";

/// One branch of a git remote holding the pool directories.
#[derive(Debug, Clone)]
pub struct GitRemote {
    uri: String,
    branch: String,
    private_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    depth: Option<u32>,
    local: Option<PathBuf>,
}

impl GitRemote {
    pub fn new(source: &Source) -> Self {
        let local = local_path(&source.uri);
        let depth = source.depth.filter(|&d| d > 0);
        if depth.is_some() && local.is_some() {
            debug!("depth is ignored for local remote {}", source.uri);
        }
        Self {
            uri: source.uri.clone(),
            branch: source.branch.clone(),
            private_key: source.private_key.clone(),
            username: source.username.clone(),
            password: source.password.clone(),
            depth: depth.filter(|_| local.is_none()),
            local,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let mut attempts = 0;
        callbacks.credentials(move |_url, username_from_url, allowed| {
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Callback,
                    "credentials were rejected",
                ));
            }
            if allowed.contains(CredentialType::SSH_KEY)
                && let Some(key) = &self.private_key
            {
                return Cred::ssh_key_from_memory(
                    username_from_url.unwrap_or("git"),
                    None,
                    key,
                    None,
                );
            }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
                && let (Some(user), Some(pass)) = (&self.username, &self.password)
            {
                return Cred::userpass_plaintext(user, pass);
            }
            Cred::default()
        });
        callbacks
    }

    fn fetch_options(&self) -> FetchOptions<'_> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.callbacks());
        if let Some(depth) = self.depth {
            options.depth(depth as i32);
        }
        options
    }

    fn tracking_ref(&self) -> String {
        format!("refs/remotes/{ORIGIN}/{}", self.branch)
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn classify(&self, err: git2::Error) -> PoolError {
        match (err.code(), err.class()) {
            (ErrorCode::Auth, _) | (_, ErrorClass::Ssh) => PoolError::Auth {
                uri: self.uri.clone(),
                message: err.message().to_string(),
            },
            (ErrorCode::NotFound, ErrorClass::Reference) => self.ref_not_found(),
            _ => PoolError::RemoteUnreachable {
                uri: self.uri.clone(),
                message: err.message().to_string(),
            },
        }
    }

    fn ref_not_found(&self) -> PoolError {
        PoolError::RefNotFound {
            uri: self.uri.clone(),
            branch: self.branch.clone(),
        }
    }
}

/// Filesystem path of a remote reached through git's local transport.
///
/// Plain paths and `file://` URLs are local; anything with another scheme or
/// in scp form (`user@host:path`) is not.
fn local_path(uri: &str) -> Option<PathBuf> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if uri.contains("://") {
        return None;
    }
    let is_drive = uri.len() >= 2
        && uri.as_bytes()[0].is_ascii_alphabetic()
        && uri.as_bytes()[1] == b':';
    match uri.split_once(':') {
        Some((host, _)) if !is_drive && !host.contains('/') => None,
        _ => Some(PathBuf::from(uri)),
    }
}

impl Remote for GitRemote {
    type Copy = GitWorkingCopy;

    fn checkout(&self) -> Result<GitWorkingCopy> {
        let dir = tempfile::Builder::new().prefix("lockpool-").tempdir()?;
        debug!("cloning {} ({}) into {}", self.uri, self.branch, dir.path().display());

        let repo = RepoBuilder::new()
            .branch(&self.branch)
            .fetch_options(self.fetch_options())
            .clone(&self.uri, dir.path())
            .map_err(|e| self.classify(e))?;
        let revision = Revision::from(repo.head()?.peel_to_commit()?.id());
        debug!("checked out {} at {revision}", self.branch);

        Ok(GitWorkingCopy {
            repo,
            remote: self.clone(),
            revision,
            dir,
        })
    }
}

/// A temporary clone; the directory is deleted when the copy is dropped.
pub struct GitWorkingCopy {
    // Declared before `dir` so the repository handle closes first.
    repo: Repository,
    remote: GitRemote,
    revision: Revision,
    dir: TempDir,
}

impl GitWorkingCopy {
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Name of the temp directory; unique among live working copies.
    fn copy_id(&self) -> String {
        self.dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Push `refspec`; a non-fast-forward or a rejected ref is a conflict.
    fn push(&self, refspec: &str, commit: Oid) -> Result<Publish> {
        let mut rejection = None;
        {
            let mut callbacks = self.remote.callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejection = Some(format!("{refname}: {message}"));
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);

            let mut origin = self.repo.find_remote(ORIGIN)?;
            match origin.push(&[refspec], Some(&mut options)) {
                Ok(()) => {}
                Err(e) if e.code() == ErrorCode::NotFastForward => {
                    debug!("push of {refspec} is not a fast-forward: {}", e.message());
                    return Ok(Publish::Conflict);
                }
                Err(e) => return Err(self.remote.classify(e)),
            }
        }

        if let Some(reason) = rejection {
            info!("remote rejected update ({reason})");
            return Ok(Publish::Conflict);
        }
        Ok(Publish::Published(commit.into()))
    }

    /// Publish to a repository on this filesystem.
    ///
    /// The local transport overwrites refs without checking their old value,
    /// so the objects go to a private staging ref and the branch itself is
    /// moved with a compare-and-swap against `parent`.
    fn publish_local(&self, target: &Path, parent: Oid, commit: Oid) -> Result<Publish> {
        let staging = format!("{STAGING_PREFIX}/{}", self.copy_id());
        let refspec = format!("+{}:{staging}", self.remote.branch_ref());
        if let Publish::Conflict = self.push(&refspec, commit)? {
            return Ok(Publish::Conflict);
        }

        let shared = Repository::open(target).map_err(|e| self.remote.classify(e))?;
        let moved = shared.reference_matching(
            &self.remote.branch_ref(),
            commit,
            true,
            parent,
            "lockpool: publish",
        );
        match shared.find_reference(&staging) {
            Ok(mut reference) => {
                if let Err(e) = reference.delete() {
                    debug!("could not delete {staging}: {}", e.message());
                }
            }
            Err(e) => debug!("staging ref {staging} already gone: {}", e.message()),
        }

        match moved {
            Ok(_) => Ok(Publish::Published(commit.into())),
            Err(e) if matches!(e.code(), ErrorCode::Modified | ErrorCode::Locked) => {
                debug!("{} moved past {parent}: {}", self.remote.branch, e.message());
                Ok(Publish::Conflict)
            }
            Err(e) => Err(self.remote.classify(e)),
        }
    }
}

impl WorkingCopy for GitWorkingCopy {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn revision(&self) -> &Revision {
        &self.revision
    }

    fn resync(&mut self) -> Result<()> {
        let refspec = format!("+{}:{}", self.remote.branch_ref(), self.remote.tracking_ref());
        let mut origin = self.repo.find_remote(ORIGIN)?;
        origin
            .fetch(
                &[refspec.as_str()],
                Some(&mut self.remote.fetch_options()),
                None,
            )
            .map_err(|e| self.remote.classify(e))?;

        let tip = self
            .repo
            .find_reference(&self.remote.tracking_ref())
            .map_err(|_| self.remote.ref_not_found())?
            .peel_to_commit()?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true).remove_ignored(true);
        self.repo
            .reset(tip.as_object(), ResetType::Hard, Some(&mut checkout))?;

        self.revision = tip.id().into();
        debug!("resynced {} to {}", self.remote.branch, self.revision);
        Ok(())
    }

    fn publish(&mut self, message: &str) -> Result<Publish> {
        // Lock files are data; ignore rules in the pool repository must not
        // drop one side of a move.
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::FORCE, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let parent_id = Oid::from_str(self.revision.as_str())?;
        let parent = self.repo.find_commit(parent_id)?;
        let signature = Signature::now(COMMITTER_NAME, COMMITTER_EMAIL)?;
        // Two copies making the same move in the same second would otherwise
        // produce the same commit, and a push of an existing commit succeeds.
        let message = format!("{message}\n\nLockpool-Copy: {}", self.copy_id());
        let commit = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&parent],
        )?;

        let outcome = match &self.remote.local {
            Some(target) => self.publish_local(target, parent_id, commit),
            None => {
                let refspec = format!("{0}:{0}", self.remote.branch_ref());
                self.push(&refspec, commit)
            }
        };
        // On conflict the local commit is discarded by the next resync.
        if let Ok(Publish::Published(revision)) = &outcome {
            self.revision = revision.clone();
        }
        outcome
    }
}
