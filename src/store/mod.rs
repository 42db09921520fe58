pub mod git_remote;
pub mod memory;
pub mod pool;
pub mod remote;

pub use git_remote::{GitRemote, GitWorkingCopy};
pub use memory::MemoryRemote;
pub use pool::PoolView;
pub use remote::{Publish, Remote, WorkingCopy};
