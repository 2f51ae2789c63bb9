use std::collections::BTreeMap;

use anyhow::Context as _;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, error};

use crate::{
    cmd::{Cmd, CmdOutput, Executor},
    secrets::parse_secrets_document,
};

/// Reads terraform secrets from 1Password with the `op` CLI.
///
/// Secrets live in the notes of an item tagged `terraform/<workspace>`, one
/// `KEY=value` per line.
pub struct OnePassword<'e, E> {
    cli: Utf8PathBuf,
    account: String,
    executor: &'e E,
}

impl<'e, E: Executor> OnePassword<'e, E> {
    /// Find the account of `org_domain` among the accounts `op` is signed in to.
    /// `None` if `op` isn't installed or no account matches: terraform then
    /// runs without secrets.
    pub fn connect(executor: &'e E, cli: Option<&Utf8Path>, org_domain: &str) -> Option<Self> {
        let Some(cli) = cli else {
            debug!("could not find 1Password executable, skipping");
            return None;
        };
        debug!("1Password CLI: {cli}");
        let listing = match op(executor, cli, ["account", "list"]) {
            Ok(listing) => listing,
            Err(e) => {
                error!("cannot list 1Password accounts: {e:#}");
                return None;
            }
        };
        let Some(account) = find_account(&listing, org_domain) else {
            error!("can't reach 1Password account associated with {org_domain}");
            return None;
        };
        debug!("1Password account: {account}");
        Some(Self {
            cli: cli.to_path_buf(),
            account,
            executor,
        })
    }

    /// Secrets of `workspace` stored in the item titled `vars_file`.
    /// Problems are logged and result in fewer (or no) secrets.
    pub fn env_vars(&self, workspace: &str, vars_file: &str) -> BTreeMap<String, SecretString> {
        match self.try_env_vars(workspace, vars_file) {
            Ok(env_vars) => env_vars,
            Err(e) => {
                error!("can't find 1Password item with terraform secrets: {e:#}");
                BTreeMap::new()
            }
        }
    }

    fn try_env_vars(
        &self,
        workspace: &str,
        vars_file: &str,
    ) -> anyhow::Result<BTreeMap<String, SecretString>> {
        let tags = format!("--tags=terraform/{workspace}");
        let items = self.op(["item", "list", self.account_arg().as_str(), tags.as_str()])?;
        let item_id = find_item_id(&items, vars_file)
            .with_context(|| format!("no item `{vars_file}` tagged terraform/{workspace}"))?;
        debug!("1Password item id: {item_id}");

        let field = self.op([
            "item",
            "get",
            item_id.as_str(),
            self.account_arg().as_str(),
            "--fields=notesPlain",
            "--format",
            "json",
        ])?;
        let notes = notes_value(&field)?;
        Ok(parse_secrets_document(&notes))
    }

    fn account_arg(&self) -> String {
        format!("--account={}", self.account)
    }

    fn op<const N: usize>(&self, args: [&str; N]) -> anyhow::Result<String> {
        op(self.executor, &self.cli, args)
    }
}

/// Run `op` and return its stdout. Stdout is never echoed: it may hold secrets.
fn op<E: Executor, const N: usize>(
    executor: &E,
    cli: &Utf8Path,
    args: [&str; N],
) -> anyhow::Result<String> {
    let mut cmd = Cmd::new(cli.as_str(), args);
    cmd.hide_stdout();
    let output: CmdOutput = executor.execute(&cmd)?;
    anyhow::ensure!(
        output.success(),
        "`op {}` failed: {}",
        args.join(" "),
        output.stderr()
    );
    Ok(output.stdout().to_string())
}

/// First line where `word` appears as a whole word followed by whitespace.
fn line_with_word<'a>(listing: &'a str, word: &str) -> Option<&'a str> {
    let re = Regex::new(&format!(r"\b{}\b\s", regex::escape(word))).ok()?;
    // Append a newline so that a match in the last column is still followed by whitespace.
    listing
        .lines()
        .find(|line| re.is_match(&format!("{line}\n")))
}

/// `op account list` prints `URL EMAIL USER_ID`: the account is the last column.
fn find_account(listing: &str, org_domain: &str) -> Option<String> {
    line_with_word(listing, org_domain)?
        .split_whitespace()
        .last()
        .map(str::to_string)
}

/// `op item list` prints `ID TITLE VAULT EDITED`: the id is the first column.
fn find_item_id(listing: &str, title: &str) -> Option<String> {
    line_with_word(listing, title)?
        .split_whitespace()
        .next()
        .map(str::to_string)
}

fn notes_value(field_json: &str) -> anyhow::Result<String> {
    #[derive(Deserialize)]
    struct Field {
        #[serde(default)]
        value: Option<String>,
    }

    let field: Field =
        serde_json::from_str(field_json).context("unexpected output of `op item get`")?;
    field
        .value
        .filter(|v| !v.trim().is_empty())
        .context("the item has no notes")
}
