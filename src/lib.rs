//! A pool of reusable locks whose claimed/unclaimed state lives in a shared
//! git branch. The branch's fast-forward-only update rule is the only
//! mutual-exclusion mechanism: no lock server, no shared memory.

pub mod build_info;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod lock_pool;
pub mod logging;
pub mod model;
pub mod output;
pub mod store;

pub use error::{PoolError, Result};
pub use lock_pool::{LockPool, Sleep, ThreadSleep};
pub use model::{Lock, Receipt, Revision};
