use std::collections::BTreeMap;

use secrecy::SecretString;
use tracing::{debug, error, info, warn};

use crate::{
    cmd::{Cmd, Executor},
    config::RunnerConfig,
    environment::EnvironmentOverlay,
    interrupt,
    policy::CommandPolicy,
};

/// Runs terraform subcommands with the standard flags and environment.
pub struct CmdRunner<'e, E> {
    config: RunnerConfig,
    executor: &'e E,
    /// Variables fetched from the secrets provider.
    secrets: BTreeMap<String, SecretString>,
}

impl<'e, E: Executor> CmdRunner<'e, E> {
    pub fn new(config: RunnerConfig, executor: &'e E) -> Self {
        debug!(
            "terraform runner: executable {}, working dir {}, profile {:?}, region {}",
            config.terraform, config.working_dir, config.aws_profile, config.aws_region
        );
        Self {
            config,
            executor,
            secrets: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn set_secrets(&mut self, secrets: BTreeMap<String, SecretString>) {
        debug!("injecting {} secrets into terraform", secrets.len());
        self.secrets = secrets;
    }

    /// Arguments of `terraform <subcmd>`: the standard flags the subcommand
    /// accepts, then `extra_args` unchanged.
    pub fn terraform_args<S: AsRef<str>>(&self, subcmd: &str, extra_args: &[S]) -> Vec<String> {
        let policy = CommandPolicy::of(subcmd);
        let mut args = vec![subcmd.to_string()];
        if policy.accepts_region {
            args.push(format!("-var=aws_region={}", self.config.aws_region));
        }
        if policy.accepts_input {
            args.push("-input=false".to_string());
        }
        if let Some(vars_file) = self
            .config
            .runtime_vars_file
            .as_ref()
            .filter(|_| policy.accepts_var_file)
        {
            args.push("-var-file".to_string());
            args.push(vars_file.to_string());
        }
        args.extend(extra_args.iter().map(|a| a.as_ref().to_string()));
        args
    }

    /// The complete environment of terraform. Nothing else is inherited.
    pub fn env_vars(&self) -> BTreeMap<String, SecretString> {
        let mut overlay = EnvironmentOverlay::default();
        overlay
            .extend_plain(&self.config.inherited_env)
            .extend_secret(&self.secrets)
            .set_non_empty("AWS_PROFILE", self.config.aws_profile.as_deref())
            .set_non_empty("KUBECONFIG", self.config.kubeconfig.as_deref())
            .set_non_empty("KUBE_CONFIG_PATH", self.config.kubeconfig.as_deref())
            .set("AWS_REGION", self.config.aws_region.as_str());
        overlay.into_vars()
    }

    /// Run `terraform <subcmd>` and return whether it succeeded.
    /// Terraform can prompt the user: stdin and stdout are the terminal's.
    /// A Ctrl+C while terraform runs makes it a failure, whatever its exit code.
    pub fn run<S: AsRef<str>>(&self, subcmd: &str, extra_args: &[S]) -> bool {
        if self.config.aws_region.is_empty() {
            error!("AWS region is not set");
            return false;
        }
        let args = self.terraform_args(subcmd, extra_args);
        let mut cmd = Cmd::new(self.config.terraform.as_str(), &args);
        cmd.with_current_dir(&self.config.working_dir)
            .with_env_vars(self.env_vars())
            .clear_env()
            .interactive();

        let interrupted_before = interrupt::interrupted();
        let output = match self.executor.execute(&cmd) {
            Ok(output) => output,
            Err(e) => {
                error!("cannot run terraform {subcmd}: {e:#}");
                return false;
            }
        };
        if !interrupted_before && interrupt::interrupted() {
            warn!("terraform {subcmd} was interrupted");
            return false;
        }
        if self.config.debug {
            debug!("terraform stderr: {}", output.stderr());
        }
        if !output.success() {
            error!(
                "terraform command failed: {subcmd} (exit code {:?}), error: [{}]",
                output.code(),
                output.stderr()
            );
            return false;
        }
        true
    }

    /// `terraform init`, against the remote backend when one is configured.
    pub fn init(&self) -> bool {
        info!("initializing terraform");
        match &self.config.backend {
            Some(backend) => {
                debug!("backend config: {backend:?}");
                self.run("init", &backend.init_args())
            }
            None => {
                debug!("initializing terraform without backend config");
                self.run("init", &["-backend=false"])
            }
        }
    }
}
