use camino::Utf8Path;
use tracing::{debug, error, warn};

use crate::{cmd::Executor, dir, git};

/// Terraform may only run inside the source tree of the build.
pub fn validate_working_directory(
    working_dir: &Utf8Path,
    build_root: &Utf8Path,
) -> anyhow::Result<()> {
    debug!("working directory: {working_dir}, build root: {build_root}");
    anyhow::ensure!(
        dir::is_within(working_dir, build_root),
        "working directory {working_dir} is not inside build workspace directory {build_root}"
    );
    Ok(())
}

/// Whether the repository at `build_root` has uncommitted changes.
///
/// Anything that prevents the check from running is logged and counts as
/// "no changes": the check must never be the reason terraform can't run.
pub fn has_uncommitted_changes(
    executor: &impl Executor,
    working_dir: &Utf8Path,
    build_root: Option<&Utf8Path>,
) -> bool {
    let Some(build_root) = build_root else {
        warn!("build workspace directory is not set, skipping uncommitted changes check");
        return false;
    };
    if let Err(e) = git::git_root(executor, working_dir) {
        error!("error finding the top-level git directory: {e:#}");
        return false;
    }
    match git::status_porcelain(executor, build_root) {
        Ok(status) if status.is_empty() => false,
        Ok(status) => {
            debug!("uncommitted changes:\n{status}");
            true
        }
        Err(e) => {
            error!("git error: {e:#}");
            false
        }
    }
}
