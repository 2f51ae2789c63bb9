use anyhow::Context as _;
use tracing::{debug, error, info};

use crate::{
    args::CliArgs,
    cmd::Executor,
    cmd_runner::CmdRunner,
    config::RunnerConfig,
    environment::{HostEnv, BUILD_WORKSPACE_DIRECTORY, ORGANIZATION_DOMAIN},
    interrupt,
    one_password::OnePassword,
    policy::CommandPolicy,
    preflight,
    workspace::Workspaces,
};

/// Run the terraform subcommand of `args` in its workspace.
///
/// Nothing is launched until the configuration is valid. Once a workspace
/// switch was attempted, the default workspace is restored whatever happens.
/// After Ctrl+C, no further step starts.
pub fn run_terraform<E: Executor>(
    args: &CliArgs,
    host: &HostEnv,
    executor: &E,
) -> anyhow::Result<()> {
    info!("log verbosity: {:?}", args.log_verbosity);
    anyhow::ensure!(!args.aws_region.is_empty(), "AWS region is not set");
    let org_domain = host
        .org_domain
        .as_deref()
        .with_context(|| format!("can't find {ORGANIZATION_DOMAIN} environment variable"))?;
    debug!("organization domain: {org_domain}");
    let config = RunnerConfig::new(args, host)?;
    let build_root = host
        .build_root
        .as_deref()
        .with_context(|| format!("{BUILD_WORKSPACE_DIRECTORY} is not set"))?;
    preflight::validate_working_directory(&config.working_dir, build_root)?;

    let (subcmd, terraform_args) = args.terraform_command();
    debug!("terraform subcommand: {subcmd}, args: {terraform_args:?}");
    let mut runner = CmdRunner::new(config, executor);
    interrupt::ensure_not_interrupted()?;

    if CommandPolicy::of(subcmd).needs_init {
        debug!("command {subcmd} requires terraform init");
        let initialized = runner.init();
        interrupt::ensure_not_interrupted()?;
        anyhow::ensure!(initialized, "terraform init failed");
    } else {
        debug!("command {subcmd} does not require terraform init");
    }

    let workspace = runner.config().workspace.clone();
    let switched = Workspaces::new(&runner).switch(&workspace);
    let outcome = interrupt::ensure_not_interrupted().and_then(|()| {
        anyhow::ensure!(switched, "cannot select terraform workspace {workspace}");
        run_in_workspace(&mut runner, args, host, org_domain, executor)
    });
    if !Workspaces::new(&runner).return_to_default() {
        error!("cannot switch back to the default workspace");
    }
    outcome
}

fn run_in_workspace<E: Executor>(
    runner: &mut CmdRunner<'_, E>,
    args: &CliArgs,
    host: &HostEnv,
    org_domain: &str,
    executor: &E,
) -> anyhow::Result<()> {
    let vars_file = args
        .op_tfvars_file
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    if let Some(vars_file) = vars_file {
        match OnePassword::connect(executor, host.op_cli.as_deref(), org_domain) {
            Some(op) => {
                debug!("using 1Password");
                let secrets = op.env_vars(&runner.config().workspace, vars_file);
                runner.set_secrets(secrets);
            }
            None => debug!("not using 1Password"),
        }
    }
    interrupt::ensure_not_interrupted()?;
    if let Some(vars_file) = &runner.config().runtime_vars_file {
        debug!("runtime vars file: {vars_file}");
    }

    if host.bypass_git {
        debug!("skipping uncommitted changes check");
    } else if preflight::has_uncommitted_changes(
        executor,
        &runner.config().working_dir,
        host.build_root.as_deref(),
    ) {
        anyhow::bail!(
            "there are uncommitted changes in the repository, commit them before running terraform"
        );
    }

    interrupt::ensure_not_interrupted()?;

    let (subcmd, terraform_args) = args.terraform_command();
    let succeeded = runner.run(subcmd, terraform_args);
    interrupt::ensure_not_interrupted()?;
    anyhow::ensure!(succeeded, "terraform {subcmd} failed");
    Ok(())
}
