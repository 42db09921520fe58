use std::thread;
use std::time::Duration;

use crate::model::{Receipt, Revision};
use crate::store::pool::PoolView;
use crate::store::remote::{Remote, WorkingCopy};

/// Source of the fixed delay between polls of an exhausted pool.
pub trait Sleep {
    fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, delay: Duration) {
        thread::sleep(delay);
    }
}

/// One named pool on a remote, plus the retry policy used to mutate it.
///
/// The claim loop lives in `commands::claim`, the single-target
/// transitions in `commands::transition`.
pub struct LockPool<R, S = ThreadSleep> {
    pub(crate) remote: R,
    pub(crate) pool: String,
    pub(crate) retry_delay: Duration,
    pub(crate) sleeper: S,
}

impl<R: Remote> LockPool<R> {
    pub fn new(remote: R, pool: impl Into<String>, retry_delay: Duration) -> Self {
        Self {
            remote,
            pool: pool.into(),
            retry_delay,
            sleeper: ThreadSleep,
        }
    }
}

impl<R: Remote, S: Sleep> LockPool<R, S> {
    pub fn with_sleeper<T: Sleep>(self, sleeper: T) -> LockPool<R, T> {
        LockPool {
            remote: self.remote,
            pool: self.pool,
            retry_delay: self.retry_delay,
            sleeper,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn pool_name(&self) -> &str {
        &self.pool
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub(crate) fn view(&self, copy: &R::Copy) -> PoolView {
        PoolView::open(copy.root(), &self.pool)
    }

    pub(crate) fn receipt(&self, lock: &str, revision: Revision) -> Receipt {
        Receipt {
            lock_name: lock.to_string(),
            pool_name: self.pool.clone(),
            revision,
        }
    }

    pub(crate) fn message(&self, verb: &str, lock: &str) -> String {
        format!("{}: {verb} {lock}", self.pool)
    }
}
