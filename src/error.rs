use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid payload ({0})")]
    Validation(String),

    #[error("remote '{uri}' is unreachable: {message}")]
    RemoteUnreachable { uri: String, message: String },

    #[error("branch '{branch}' not found on remote '{uri}'")]
    RefNotFound { uri: String, branch: String },

    #[error("authentication to '{uri}' failed: {message}")]
    Auth { uri: String, message: String },

    #[error("lock '{lock}' not found in pool '{pool}'")]
    LockNotFound { pool: String, lock: String },

    #[error("lock '{lock}' is not claimed in pool '{pool}'")]
    LockNotClaimed { pool: String, lock: String },

    #[error("lock '{lock}' already exists in pool '{pool}'")]
    DuplicateLock { pool: String, lock: String },

    #[error("invalid lock name '{0}'")]
    InvalidLockName(String),

    #[error("cannot read lock from '{path}': {message}")]
    LockSource { path: String, message: String },

    #[error("revision {0} not found")]
    RevisionNotFound(String),

    #[error("revision {revision} does not change any lock in pool '{pool}'")]
    NoLockInRevision { pool: String, revision: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl PoolError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_payload",
            Self::RemoteUnreachable { .. } => "remote_unreachable",
            Self::RefNotFound { .. } => "ref_not_found",
            Self::Auth { .. } => "auth_failed",
            Self::LockNotFound { .. } => "lock_not_found",
            Self::LockNotClaimed { .. } => "lock_not_claimed",
            Self::DuplicateLock { .. } => "duplicate_lock",
            Self::InvalidLockName(_) => "invalid_lock_name",
            Self::LockSource { .. } => "lock_source",
            Self::RevisionNotFound(_) => "revision_not_found",
            Self::NoLockInRevision { .. } => "no_lock_in_revision",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Git(_) => "git_error",
        }
    }

    /// Process exit status: request validation failures are distinguished
    /// from every other failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
