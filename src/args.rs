use camino::Utf8PathBuf;

/// Run terraform with the workspace, backend and secrets of a build target.
///
/// The first positional argument is the terraform subcommand (`plan` if
/// missing). Everything after it is passed to terraform verbatim.
#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct CliArgs {
    /// Path to the terraform binary, relative to the current directory.
    #[arg(long = "terraform_executable")]
    pub terraform_executable: Utf8PathBuf,
    #[arg(
        long = "log_verbosity",
        value_enum,
        ignore_case = true,
        default_value_t = LogVerbosity::Info
    )]
    pub log_verbosity: LogVerbosity,
    /// Exported to terraform as `AWS_PROFILE`.
    #[arg(long = "aws_profile")]
    pub aws_profile: Option<String>,
    /// Required. Exported as `AWS_REGION` and passed as the `aws_region` variable.
    #[arg(long = "aws_region", default_value = "")]
    pub aws_region: String,
    /// Exported to terraform as `KUBECONFIG` and `KUBE_CONFIG_PATH`.
    #[arg(long = "kubeconfig")]
    pub kubeconfig: Option<String>,
    /// Title of the 1Password item holding the secrets of the workspace.
    #[arg(long = "op_tfvars_file")]
    pub op_tfvars_file: Option<String>,
    /// `.tfvars` file passed with `-var-file`, relative to the current directory.
    #[arg(long = "runtime_vars_file")]
    pub runtime_vars_file: Option<Utf8PathBuf>,
    #[arg(long = "terraform_workspace", default_value = "default")]
    pub terraform_workspace: String,
    /// JSON object with the `bucket`, `key`, `dynamodb_table` and `region` of the state backend.
    #[arg(long = "terraform_backend_config")]
    pub terraform_backend_config: Option<String>,
    /// `true` to log terraform's stderr even when it succeeds.
    #[arg(long = "terraform_debug")]
    pub terraform_debug: Option<String>,
    /// Terraform subcommand followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub terraform_args: Vec<String>,
}

impl CliArgs {
    /// Terraform subcommand and the arguments that follow it.
    pub fn terraform_command(&self) -> (&str, &[String]) {
        match self.terraform_args.split_first() {
            Some((subcmd, rest)) => (subcmd.as_str(), rest),
            None => ("plan", &[][..]),
        }
    }

    pub fn terraform_debug(&self) -> bool {
        self.terraform_debug.as_deref() == Some("true")
    }
}

/// Log level names, as build rules spell them.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogVerbosity {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    Critical,
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(
            ["run-terraform", "--terraform_executable", "bin/terraform"]
                .iter()
                .chain(args),
        )
        .unwrap()
    }

    #[test]
    fn subcommand_defaults_to_plan() {
        let args = parse(&["--aws_region=us-east-1"]);
        assert_eq!(args.terraform_command(), ("plan", &[][..]));
    }

    #[test]
    fn passthrough_arguments_are_kept_verbatim() {
        let args = parse(&[
            "--aws_region",
            "us-east-1",
            "apply",
            "-auto-approve",
            "--target=module.x",
            "-lock=false",
        ]);
        let (subcmd, rest) = args.terraform_command();
        assert_eq!(subcmd, "apply");
        assert_eq!(rest, ["-auto-approve", "--target=module.x", "-lock=false"]);
    }

    #[test]
    fn underscored_flags_are_parsed() {
        let args = parse(&[
            "--log_verbosity=DEBUG",
            "--aws_profile=prod",
            "--aws_region=eu-west-1",
            "--kubeconfig=/kube/config",
            "--op_tfvars_file=tfvars",
            "--runtime_vars_file=runtime.tfvars",
            "--terraform_workspace=staging",
            r#"--terraform_backend_config={"bucket":"b"}"#,
            "--terraform_debug=true",
        ]);
        assert_eq!(args.log_verbosity, LogVerbosity::Debug);
        assert_eq!(args.aws_profile.as_deref(), Some("prod"));
        assert_eq!(args.aws_region, "eu-west-1");
        assert_eq!(args.kubeconfig.as_deref(), Some("/kube/config"));
        assert_eq!(args.op_tfvars_file.as_deref(), Some("tfvars"));
        assert_eq!(
            args.runtime_vars_file,
            Some(Utf8PathBuf::from("runtime.tfvars"))
        );
        assert_eq!(args.terraform_workspace, "staging");
        assert_eq!(
            args.terraform_backend_config.as_deref(),
            Some(r#"{"bucket":"b"}"#)
        );
        assert!(args.terraform_debug());
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.aws_region, "");
        assert_eq!(args.terraform_workspace, "default");
        assert_eq!(args.log_verbosity, LogVerbosity::Info);
        assert!(!args.terraform_debug());
    }

    #[test]
    fn only_literal_true_enables_debug() {
        assert!(!parse(&["--terraform_debug=True"]).terraform_debug());
        assert!(!parse(&["--terraform_debug=1"]).terraform_debug());
    }

    #[test]
    fn verbosity_accepts_upper_case_level_names() {
        assert_eq!(
            parse(&["--log_verbosity=WARNING"]).log_verbosity,
            LogVerbosity::Warning
        );
        assert_eq!(
            parse(&["--log_verbosity=warn"]).log_verbosity,
            LogVerbosity::Warning
        );
        assert_eq!(
            parse(&["--log_verbosity=CRITICAL"]).log_verbosity,
            LogVerbosity::Critical
        );
    }

    #[test]
    fn executable_is_required() {
        assert!(CliArgs::try_parse_from(["run-terraform", "plan"]).is_err());
    }
}
