use tracing::{debug, info, warn};

use crate::{cmd::Executor, cmd_runner::CmdRunner, interrupt};

pub const DEFAULT_WORKSPACE: &str = "default";

/// Selects terraform workspaces through a [`CmdRunner`].
pub struct Workspaces<'r, 'e, E> {
    runner: &'r CmdRunner<'e, E>,
}

impl<'r, 'e, E: Executor> Workspaces<'r, 'e, E> {
    pub fn new(runner: &'r CmdRunner<'e, E>) -> Self {
        Self { runner }
    }

    /// Select `name`, creating it if it doesn't exist yet.
    pub fn switch(&self, name: &str) -> bool {
        debug!("switching to workspace {name}");
        if self.runner.run("workspace", &["select", name]) {
            return true;
        }
        if interrupt::interrupted() {
            warn!("not creating workspace {name}: interrupted");
            return false;
        }
        info!("workspace {name} not found, creating it");
        self.runner.run("workspace", &["new", name])
    }

    /// Leave the working tree on the default workspace.
    pub fn return_to_default(&self) -> bool {
        self.switch(DEFAULT_WORKSPACE)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        cmd::testing::{fail, ok, FakeExecutor},
        cmd_runner::tests::config,
    };

    const TERRAFORM: &str = "/repo/infra/terraform";

    #[test]
    fn existing_workspace_is_only_selected() {
        let executor = FakeExecutor::succeeding();
        let runner = CmdRunner::new(config(), &executor);
        assert!(Workspaces::new(&runner).switch("staging"));
        assert_eq!(
            executor.args_of(TERRAFORM),
            [["workspace", "select", "staging"]]
        );
    }

    #[test]
    fn missing_workspace_is_created() {
        let executor = FakeExecutor::with_responder(|argv| {
            if argv[2] == "select" {
                fail("Workspace \"staging\" doesn't exist.")
            } else {
                ok("")
            }
        });
        let runner = CmdRunner::new(config(), &executor);
        assert!(Workspaces::new(&runner).switch("staging"));
        assert_eq!(
            executor.args_of(TERRAFORM),
            [
                ["workspace", "select", "staging"],
                ["workspace", "new", "staging"]
            ]
        );
    }

    #[test]
    fn switch_fails_when_workspace_cannot_be_created() {
        let executor = FakeExecutor::with_responder(|_| fail("backend unreachable"));
        let runner = CmdRunner::new(config(), &executor);
        assert!(!Workspaces::new(&runner).switch("staging"));
        assert_eq!(executor.calls().len(), 2);
    }

    #[test]
    fn interrupted_select_does_not_create_the_workspace() {
        let executor = FakeExecutor::with_responder(|_| {
            interrupt::simulate();
            fail("interrupted")
        });
        let runner = CmdRunner::new(config(), &executor);
        assert!(!Workspaces::new(&runner).switch("staging"));
        assert_eq!(
            executor.args_of(TERRAFORM),
            [["workspace", "select", "staging"]]
        );
    }

    #[test]
    fn return_to_default_selects_default() {
        let executor = FakeExecutor::succeeding();
        let runner = CmdRunner::new(config(), &executor);
        assert!(Workspaces::new(&runner).return_to_default());
        assert_eq!(
            executor.args_of(TERRAFORM),
            [["workspace", "select", "default"]]
        );
    }
}
