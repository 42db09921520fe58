use log::{debug, info};

use crate::error::{PoolError, Result};
use crate::lock_pool::{LockPool, Sleep};
use crate::model::Receipt;
use crate::store::pool::{Collection, PoolView, validate_lock_name};
use crate::store::remote::{Publish, Remote, WorkingCopy};

#[derive(Debug)]
enum ClaimState {
    /// Bring the working copy to the remote tip.
    Sync,
    /// Pick a candidate from the unclaimed collection.
    Select,
    /// Move the candidate into `claimed` locally.
    Transition(String),
    /// Try to advance the remote with the local move.
    Publish(String),
    /// Nothing claimable; sleep before the next sync.
    Wait,
}

impl<R: Remote, S: Sleep> LockPool<R, S> {
    /// Claim any unclaimed lock, blocking until one becomes available.
    ///
    /// Candidates are tried in lexicographic order. Losing a publish race
    /// resyncs and re-selects from scratch; an empty pool is polled every
    /// `retry_delay` with no upper bound.
    pub fn claim(&self) -> Result<Receipt> {
        self.claim_with(|pool| Ok(pool.list_unclaimed()?.into_iter().next()))
    }

    /// Claim the lock called `lock`, waiting while someone else holds it.
    pub fn claim_named(&self, lock: &str) -> Result<Receipt> {
        validate_lock_name(lock)?;
        self.claim_with(|pool| match pool.locate(lock) {
            Some(Collection::Unclaimed) => Ok(Some(lock.to_string())),
            Some(Collection::Claimed) => Ok(None),
            None => Err(PoolError::LockNotFound {
                pool: self.pool.clone(),
                lock: lock.to_string(),
            }),
        })
    }

    fn claim_with<F>(&self, select: F) -> Result<Receipt>
    where
        F: Fn(&PoolView) -> Result<Option<String>>,
    {
        let mut copy = self.remote.checkout()?;
        let mut state = ClaimState::Select;

        loop {
            state = match state {
                ClaimState::Sync => {
                    copy.resync()?;
                    ClaimState::Select
                }
                ClaimState::Select => match select(&self.view(&copy))? {
                    Some(candidate) => ClaimState::Transition(candidate),
                    None => ClaimState::Wait,
                },
                ClaimState::Transition(candidate) => {
                    self.view(&copy).move_to_claimed(&candidate)?;
                    ClaimState::Publish(candidate)
                }
                ClaimState::Publish(candidate) => {
                    match copy.publish(&self.message("claiming", &candidate))? {
                        Publish::Published(revision) => {
                            info!("claimed {candidate} in {} at {revision}", self.pool);
                            return Ok(self.receipt(&candidate, revision));
                        }
                        Publish::Conflict => {
                            debug!("lost the race for {candidate}, resyncing");
                            ClaimState::Sync
                        }
                    }
                }
                ClaimState::Wait => {
                    info!(
                        "no locks available in {}, retrying in {:?}",
                        self.pool, self.retry_delay
                    );
                    self.sleeper.sleep(self.retry_delay);
                    ClaimState::Sync
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::lock_pool::testing::{
        RacingRemote, ScriptedSleep, external_claim, external_release, seeded_remote, state,
    };
    use crate::store::memory::MemoryRemote;

    const DELAY: Duration = Duration::from_millis(100);

    fn pool(remote: &MemoryRemote) -> LockPool<MemoryRemote> {
        LockPool::new(remote.clone(), "lock-pool", DELAY)
    }

    fn never_sleeps(_: usize) {
        panic!("claim should not have waited");
    }

    #[test]
    fn claims_lexicographically_smallest_lock() {
        let remote = seeded_remote(&["b", "a", "c"], &[]);
        let pool = pool(&remote).with_sleeper(ScriptedSleep::new(never_sleeps));

        let receipt = pool.claim().unwrap();
        assert_eq!(receipt.lock_name, "a");
        assert_eq!(receipt.pool_name, "lock-pool");
        assert_eq!(receipt.revision, remote.tip());
        assert_eq!(
            state(&remote),
            (vec!["b".into(), "c".into()], vec!["a".into()])
        );
    }

    #[test]
    fn claim_preserves_payload() {
        let remote = seeded_remote(&["a"], &[]);
        pool(&remote).claim().unwrap();
        assert_eq!(
            remote.read_file("lock-pool/claimed/a").unwrap(),
            b"payload-a"
        );
        assert_eq!(remote.read_file("lock-pool/unclaimed/a"), None);
    }

    #[test]
    fn exhausted_pool_waits_for_a_release() {
        let remote = seeded_remote(&[], &["a", "b"]);
        let releaser = remote.clone();
        let sleeper = ScriptedSleep::new(move |call| {
            if call == 3 {
                external_release(&releaser, "b");
            }
        });
        let pool = pool(&remote).with_sleeper(sleeper);

        let receipt = pool.claim().unwrap();
        assert_eq!(receipt.lock_name, "b");
        assert_eq!(pool.sleeper.delays.borrow().as_slice(), &[DELAY; 3]);
        assert_eq!(state(&remote), (vec![], vec!["a".into(), "b".into()]));
    }

    #[test]
    fn lost_race_resyncs_and_picks_another_lock() {
        let remote = seeded_remote(&["a", "b"], &[]);
        let racing = RacingRemote::new(remote.clone(), |r| external_claim(r, "a"));
        let pool = LockPool::new(racing, "lock-pool", DELAY)
            .with_sleeper(ScriptedSleep::new(never_sleeps));

        let receipt = pool.claim().unwrap();
        assert_eq!(receipt.lock_name, "b");
        assert_eq!(receipt.revision, remote.tip());
        assert_eq!(state(&remote), (vec![], vec!["a".into(), "b".into()]));
        // root, seed, rival claim, our claim; the conflicting attempt left no trace
        assert_eq!(remote.revisions().len(), 4);
    }

    #[test]
    fn lost_race_for_last_lock_falls_back_to_waiting() {
        let remote = seeded_remote(&["a"], &[]);
        let racing = RacingRemote::new(remote.clone(), |r| external_claim(r, "a"));
        let releaser = remote.clone();
        let pool = LockPool::new(racing, "lock-pool", DELAY).with_sleeper(ScriptedSleep::new(
            move |_| external_release(&releaser, "a"),
        ));

        let receipt = pool.claim().unwrap();
        assert_eq!(receipt.lock_name, "a");
        assert_eq!(pool.sleeper.delays.borrow().len(), 1);
    }

    #[test]
    fn concurrent_claims_never_share_a_lock() {
        let remote = seeded_remote(&["a", "b", "c", "d"], &[]);
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let remote = remote.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    pool(&remote).claim().unwrap().lock_name
                })
            })
            .collect();

        let mut claimed: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        claimed.sort();
        assert_eq!(claimed, vec!["a", "b", "c", "d"]);
        assert_eq!(state(&remote).0, Vec::<String>::new());
        // seed + four claims, each strictly extending the previous revision
        assert_eq!(remote.revisions().len(), 6);
    }

    #[test]
    fn scenario_two_claims_then_blocked_third() {
        let remote = seeded_remote(&["a", "b"], &[]);

        assert_eq!(pool(&remote).claim().unwrap().lock_name, "a");
        assert_eq!(pool(&remote).claim().unwrap().lock_name, "b");

        let releaser = remote.clone();
        let third = pool(&remote).with_sleeper(ScriptedSleep::new(move |call| {
            if call == 1 {
                external_release(&releaser, "a");
            }
        }));
        let receipt = third.claim().unwrap();
        assert_eq!(receipt.lock_name, "a");
        assert_eq!(third.sleeper.delays.borrow().len(), 1);
    }

    #[test]
    fn claim_named_waits_for_that_lock() {
        let remote = seeded_remote(&["a"], &["b"]);
        let releaser = remote.clone();
        let pool = pool(&remote).with_sleeper(ScriptedSleep::new(move |call| {
            if call == 2 {
                external_release(&releaser, "b");
            }
        }));

        let receipt = pool.claim_named("b").unwrap();
        assert_eq!(receipt.lock_name, "b");
        assert_eq!(state(&remote), (vec!["a".into()], vec!["b".into()]));
    }

    #[test]
    fn claim_named_unknown_lock_is_fatal() {
        let remote = seeded_remote(&["a"], &[]);
        let pool = pool(&remote).with_sleeper(ScriptedSleep::new(never_sleeps));

        let err = pool.claim_named("zzz").unwrap_err();
        assert!(matches!(err, PoolError::LockNotFound { ref lock, .. } if lock == "zzz"));
        assert_eq!(remote.revisions().len(), 2);
    }
}
