use std::collections::BTreeMap;

use anyhow::Context as _;
use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::{args::CliArgs, dir, environment::HostEnv};

/// Remote state backend, from `--terraform_backend_config`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendConfig {
    pub bucket: String,
    pub key: String,
    pub dynamodb_table: String,
    pub region: String,
}

impl BackendConfig {
    /// `None` when no backend is configured: the flag is missing, blank or `{}`.
    pub fn parse(raw: Option<&str>) -> anyhow::Result<Option<Self>> {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        let value: serde_json::Value =
            serde_json::from_str(raw).context("terraform backend config is not valid JSON")?;
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(None);
        }
        let config = serde_json::from_value(value)
            .context("terraform backend config needs bucket, key, dynamodb_table and region")?;
        Ok(Some(config))
    }

    pub fn init_args(&self) -> Vec<String> {
        vec![
            "-backend=true".to_string(),
            "-reconfigure".to_string(),
            format!("-backend-config=bucket={}", self.bucket),
            format!("-backend-config=key={}", self.key),
            format!("-backend-config=dynamodb_table={}", self.dynamodb_table),
            format!("-backend-config=region={}", self.region),
        ]
    }
}

/// Settings shared by every terraform invocation of a run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub terraform: Utf8PathBuf,
    pub working_dir: Utf8PathBuf,
    pub aws_profile: Option<String>,
    pub aws_region: String,
    pub kubeconfig: Option<String>,
    pub backend: Option<BackendConfig>,
    /// Log terraform's stderr even on success.
    pub debug: bool,
    pub workspace: String,
    pub runtime_vars_file: Option<Utf8PathBuf>,
    /// Host variables passed through to terraform.
    pub inherited_env: BTreeMap<String, String>,
}

impl RunnerConfig {
    pub fn new(args: &CliArgs, host: &HostEnv) -> anyhow::Result<Self> {
        let working_dir = host.working_dir.clone();
        Ok(Self {
            terraform: dir::resolve(&working_dir, &args.terraform_executable),
            runtime_vars_file: args
                .runtime_vars_file
                .as_deref()
                .map(|file| dir::resolve(&working_dir, file)),
            aws_profile: args.aws_profile.clone(),
            aws_region: args.aws_region.clone(),
            kubeconfig: args.kubeconfig.clone(),
            backend: BackendConfig::parse(args.terraform_backend_config.as_deref())?,
            debug: args.terraform_debug(),
            workspace: args.terraform_workspace.clone(),
            inherited_env: host.inherited.clone(),
            working_dir,
        })
    }
}
