use log::{debug, info};

use crate::error::Result;
use crate::lock_pool::{LockPool, Sleep};
use crate::model::{Lock, Receipt};
use crate::store::pool::PoolView;
use crate::store::remote::{Publish, Remote, WorkingCopy};

impl<R: Remote, S: Sleep> LockPool<R, S> {
    /// Move a claimed lock back to `unclaimed`.
    pub fn release(&self, lock: &str) -> Result<Receipt> {
        self.transition(lock, "unclaiming", |pool| pool.move_to_unclaimed(lock))
    }

    /// Delete a claimed lock from the pool.
    pub fn remove(&self, lock: &str) -> Result<Receipt> {
        self.transition(lock, "removing", |pool| pool.delete(lock))
    }

    /// Add a new lock to `unclaimed`.
    pub fn add(&self, lock: &Lock) -> Result<Receipt> {
        self.transition(&lock.name, "adding", |pool| pool.add(lock))
    }

    /// Add a new lock directly to `claimed`.
    pub fn add_claimed(&self, lock: &Lock) -> Result<Receipt> {
        self.transition(&lock.name, "adding claimed", |pool| pool.add_claimed(lock))
    }

    /// Apply `mutate` to a freshly synced copy and publish it, resyncing and
    /// reapplying after every lost race. A mutation error is only ever seen
    /// against the current tip, so it is returned as-is.
    fn transition<F>(&self, lock: &str, verb: &str, mutate: F) -> Result<Receipt>
    where
        F: Fn(&PoolView) -> Result<()>,
    {
        let mut copy = self.remote.checkout()?;
        loop {
            mutate(&self.view(&copy))?;
            match copy.publish(&self.message(verb, lock))? {
                Publish::Published(revision) => {
                    info!("{verb} {lock} in {} at {revision}", self.pool);
                    return Ok(self.receipt(lock, revision));
                }
                Publish::Conflict => {
                    debug!("conflict while {verb} {lock}, resyncing");
                    copy.resync()?;
                }
            }
        }
    }
}
