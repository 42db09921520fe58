use std::path::Path;

use log::info;

use crate::config::InRequest;
use crate::error::Result;
use crate::git;
use crate::model::{Receipt, Response};
use crate::output::{self, Format};
use crate::store::git_remote::GitRemote;
use crate::store::remote::Remote;

/// Write the lock changed at the requested revision into `dest` as `name`
/// and `metadata` files.
pub fn run(request: &InRequest, dest: &Path, format: Format) -> Result<()> {
    let version = request.validate()?;
    let source = &request.source;

    let copy = GitRemote::new(source).checkout()?;
    let lock = git::lock_at(copy.repository(), &source.pool, &version.reference)?;
    lock.write_to(dest)?;
    info!("fetched {} from {} at {}", lock.name, source.pool, version.reference);

    let receipt = Receipt {
        lock_name: lock.name,
        pool_name: source.pool.clone(),
        revision: version.reference.clone(),
    };
    output::print_response(&Response::from(&receipt), format)
}
