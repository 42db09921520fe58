use log::debug;

use crate::config::CheckRequest;
use crate::error::Result;
use crate::git;
use crate::output::{self, Format};
use crate::store::git_remote::GitRemote;
use crate::store::remote::Remote;

/// List the revisions that changed the pool, starting at the requested one.
pub fn run(request: &CheckRequest, format: Format) -> Result<()> {
    let source = &request.source;
    source.validate()?;

    let copy = GitRemote::new(source).checkout()?;
    let since = request.version.as_ref().map(|v| &v.reference);
    let commits = git::pool_history(copy.repository(), &source.pool, since)?;
    debug!("check: {} version(s) for {}", commits.len(), source.pool);

    output::print_versions(&commits, format)
}
