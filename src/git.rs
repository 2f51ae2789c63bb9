use std::collections::BTreeMap;

use anyhow::Context as _;
use camino::{Utf8Path, Utf8PathBuf};
use secrecy::SecretString;

use crate::cmd::{Cmd, CmdOutput, Executor};

/// Top level directory of the repository containing `dir`.
pub fn git_root(executor: &impl Executor, dir: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
    let output = git(executor, dir, ["rev-parse", "--show-toplevel"], BTreeMap::new())?;
    Ok(Utf8PathBuf::from(output.stdout()))
}

/// `git status --porcelain` of the work tree at `root`: empty when clean.
/// Anything on stderr makes the status untrustworthy, so it is an error.
pub fn status_porcelain(executor: &impl Executor, root: &Utf8Path) -> anyhow::Result<String> {
    let env_vars = BTreeMap::from([
        (
            "GIT_DIR".to_string(),
            SecretString::from(root.join(".git").into_string()),
        ),
        (
            "GIT_WORK_TREE".to_string(),
            SecretString::from(root.to_string()),
        ),
    ]);
    let output = git(executor, root, ["status", "--porcelain"], env_vars)?;
    anyhow::ensure!(
        output.stderr().is_empty(),
        "`git status` reported: {}",
        output.stderr()
    );
    Ok(output.stdout().to_string())
}

fn git<const N: usize>(
    executor: &impl Executor,
    dir: &Utf8Path,
    args: [&str; N],
    env_vars: BTreeMap<String, SecretString>,
) -> anyhow::Result<CmdOutput> {
    let mut cmd = Cmd::new("git", args);
    cmd.with_current_dir(dir)
        .with_env_vars(env_vars)
        .hide_stdout();
    let output = executor
        .execute(&cmd)
        .with_context(|| format!("cannot run `git {}`", args.join(" ")))?;
    anyhow::ensure!(
        output.success(),
        "`git {}` failed: {}",
        args.join(" "),
        output.stderr()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cmd::testing::{fail, ok, FakeExecutor};

    #[test]
    fn status_points_git_at_the_root() {
        let executor = FakeExecutor::with_responder(|_| ok(" M main.tf\n"));
        let status = status_porcelain(&executor, Utf8Path::new("/repo")).unwrap();
        assert_eq!(status, "M main.tf");

        let call = &executor.calls()[0];
        assert_eq!(call.argv, ["git", "status", "--porcelain"]);
        assert_eq!(call.current_dir.as_deref(), Some("/repo"));
        assert_eq!(call.env.get("GIT_DIR").map(String::as_str), Some("/repo/.git"));
        assert_eq!(call.env.get("GIT_WORK_TREE").map(String::as_str), Some("/repo"));
        assert!(!call.clear_env);
    }

    #[test]
    fn root_is_read_from_rev_parse() {
        let executor = FakeExecutor::with_responder(|_| ok("/repo\n"));
        let root = git_root(&executor, Utf8Path::new("/repo/infra")).unwrap();
        assert_eq!(root, Utf8PathBuf::from("/repo"));
        assert_eq!(
            executor.args_of("git"),
            [["rev-parse", "--show-toplevel"]]
        );
    }

    #[test]
    fn failures_are_errors() {
        let executor = FakeExecutor::with_responder(|_| fail("fatal: not a git repository"));
        let err = git_root(&executor, Utf8Path::new("/tmp")).unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[test]
    fn stderr_output_of_status_is_an_error() {
        let executor = FakeExecutor::with_responder(|_| {
            CmdOutput::new(Some(0), " M a.tf", "warning: unable to access")
        });
        assert!(status_porcelain(&executor, Utf8Path::new("/repo")).is_err());
    }

    #[test]
    fn rev_parse_warnings_are_tolerated() {
        let executor = FakeExecutor::with_responder(|_| {
            CmdOutput::new(Some(0), "/repo\n", "warning: unable to access '/root/.config/git'")
        });
        let root = git_root(&executor, Utf8Path::new("/repo/infra")).unwrap();
        assert_eq!(root, Utf8PathBuf::from("/repo"));
    }
}
