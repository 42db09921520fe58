use std::path::Path;

use log::debug;

use crate::config::{OutParams, OutRequest};
use crate::error::{PoolError, Result};
use crate::lock_pool::{LockPool, Sleep};
use crate::model::{Lock, Receipt, Response};
use crate::output::{self, Format};
use crate::store::git_remote::GitRemote;
use crate::store::remote::Remote;

/// The single transition an `out` request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Acquire,
    Claim(String),
    Release(String),
    Remove(String),
    Add(Lock),
    AddClaimed(Lock),
}

impl Operation {
    /// Resolve params into one operation. Lock sources are directories
    /// relative to `sources`.
    pub fn from_params(params: &OutParams, sources: &Path) -> Result<Self> {
        let read = |dir: &str| Lock::read_from(&sources.join(dir));
        let operation = match (
            params.acquire,
            &params.claim,
            &params.release,
            &params.remove,
            &params.add,
            &params.add_claimed,
        ) {
            (true, None, None, None, None, None) => Self::Acquire,
            (false, Some(name), None, None, None, None) => Self::Claim(name.clone()),
            (false, None, Some(dir), None, None, None) => Self::Release(read(dir.as_str())?.name),
            (false, None, None, Some(dir), None, None) => Self::Remove(read(dir.as_str())?.name),
            (false, None, None, None, Some(dir), None) => Self::Add(read(dir.as_str())?),
            (false, None, None, None, None, Some(dir)) => Self::AddClaimed(read(dir.as_str())?),
            (false, None, None, None, None, None) => {
                return Err(PoolError::Validation(
                    "missing acquire, release, remove, or add".into(),
                ));
            }
            _ => {
                return Err(PoolError::Validation(format!(
                    "only one operation may be set, got {}",
                    params.selected().join(", ")
                )));
            }
        };
        Ok(operation)
    }

    pub fn apply<R: Remote, S: Sleep>(&self, pool: &LockPool<R, S>) -> Result<Receipt> {
        match self {
            Self::Acquire => pool.claim(),
            Self::Claim(name) => pool.claim_named(name),
            Self::Release(name) => pool.release(name),
            Self::Remove(name) => pool.remove(name),
            Self::Add(lock) => pool.add(lock),
            Self::AddClaimed(lock) => pool.add_claimed(lock),
        }
    }
}

pub fn run(request: &OutRequest, sources: &Path, format: Format) -> Result<()> {
    let source = &request.source;
    source.validate()?;
    let operation = Operation::from_params(&request.params, sources)?;
    debug!("out: {operation:?} on {} ({})", source.pool, source.uri);

    let pool = LockPool::new(GitRemote::new(source), &source.pool, source.retry_delay());
    let receipt = operation.apply(&pool)?;
    output::print_response(&Response::from(&receipt), format)
}
