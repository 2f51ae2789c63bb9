use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use secrecy::{ExposeSecret as _, SecretString};

use crate::dir;

/// Root of the source tree the build tool runs from.
pub const BUILD_WORKSPACE_DIRECTORY: &str = "BUILD_WORKSPACE_DIRECTORY";
/// Domain used to pick the 1Password account.
pub const ORGANIZATION_DOMAIN: &str = "KAMAJI_ORGANIZATION_DOMAIN";
/// Set to `true` to skip the uncommitted changes check.
pub const BYPASS_GIT: &str = "BYPASS_GIT";

/// Host variables terraform keeps seeing even though its environment is cleared.
pub const INHERITED_VARS: [&str; 3] = ["PATH", "HOME", "TMPDIR"];

/// Everything the wrapper reads from the process it was started in.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    pub working_dir: Utf8PathBuf,
    pub build_root: Option<Utf8PathBuf>,
    pub org_domain: Option<String>,
    pub bypass_git: bool,
    /// Location of the `op` executable, if installed.
    pub op_cli: Option<Utf8PathBuf>,
    /// Values of [`INHERITED_VARS`] that are set.
    pub inherited: BTreeMap<String, String>,
}

impl HostEnv {
    pub fn from_process() -> anyhow::Result<Self> {
        let inherited = INHERITED_VARS
            .iter()
            .filter_map(|&key| non_empty_var(key).map(|value| (key.to_string(), value)))
            .collect();
        let op_cli = which::which("op")
            .ok()
            .and_then(|path| Utf8PathBuf::from_path_buf(path).ok());
        Ok(Self {
            working_dir: dir::current_dir()?,
            build_root: non_empty_var(BUILD_WORKSPACE_DIRECTORY).map(Utf8PathBuf::from),
            org_domain: non_empty_var(ORGANIZATION_DOMAIN),
            bypass_git: std::env::var(BYPASS_GIT).is_ok_and(|v| v == "true"),
            op_cli,
            inherited,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Environment of a terraform invocation, built up in layers.
/// A later layer overwrites keys set by an earlier one.
#[derive(Default)]
pub struct EnvironmentOverlay {
    vars: BTreeMap<String, SecretString>,
}

impl EnvironmentOverlay {
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.vars
            .insert(key.to_string(), SecretString::from(value.into()));
        self
    }

    /// Set `key` only when `value` is present and non-empty.
    pub fn set_non_empty(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.set(key, value);
        }
        self
    }

    pub fn extend_plain(&mut self, vars: &BTreeMap<String, String>) -> &mut Self {
        for (key, value) in vars {
            self.set(key, value.as_str());
        }
        self
    }

    pub fn extend_secret(&mut self, vars: &BTreeMap<String, SecretString>) -> &mut Self {
        for (key, value) in vars {
            self.set(key, value.expose_secret());
        }
        self
    }

    pub fn into_vars(self) -> BTreeMap<String, SecretString> {
        self.vars
    }
}
