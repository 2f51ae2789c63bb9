use std::{
    collections::BTreeMap,
    io::{BufRead as _, BufReader, Read as _},
    process::{Command, ExitStatus, Stdio},
    sync::mpsc,
    thread,
};

use anyhow::Context as _;
use camino::Utf8PathBuf;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

#[derive(Debug)]
pub struct CmdOutput {
    /// `None` when the process was terminated by a signal.
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CmdOutput {
    pub fn new(code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    fn from_status(status: ExitStatus, stdout: String, stderr: String) -> Self {
        Self::new(status.code(), stdout, stderr)
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn stdout(&self) -> &str {
        self.stdout.trim()
    }

    pub fn stderr(&self) -> &str {
        self.stderr.trim()
    }
}

/// Launches a [`Cmd`]. Everything that shells out goes through this seam.
pub trait Executor {
    fn execute(&self, cmd: &Cmd) -> anyhow::Result<CmdOutput>;
}

/// Runs commands as real child processes.
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, cmd: &Cmd) -> anyhow::Result<CmdOutput> {
        cmd.run()
    }
}

pub struct Cmd {
    name: String,
    env_vars: BTreeMap<String, SecretString>,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
    clear_env: bool,
    interactive: bool,
    hide_stdout: bool,
}

impl Cmd {
    pub fn new<I, S>(cmd_name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_string())
            .collect();
        Self {
            name: cmd_name.to_string(),
            args,
            current_dir: None,
            clear_env: false,
            interactive: false,
            hide_stdout: false,
            env_vars: BTreeMap::new(),
        }
    }

    pub fn with_env_vars(&mut self, env_vars: BTreeMap<String, SecretString>) -> &mut Self {
        self.env_vars = env_vars;
        self
    }

    pub fn with_current_dir(&mut self, dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Don't inherit the parent environment: the child only sees `env_vars`.
    pub fn clear_env(&mut self) -> &mut Self {
        self.clear_env = true;
        self
    }

    /// Connect stdin and stdout to the terminal, so that the child can prompt
    /// the user. Only stderr is captured.
    pub fn interactive(&mut self) -> &mut Self {
        self.interactive = true;
        self
    }

    pub fn hide_stdout(&mut self) -> &mut Self {
        self.hide_stdout = true;
        self
    }

    pub fn run(&self) -> anyhow::Result<CmdOutput> {
        let mut to_print = format!("🚀 {} {}", self.name, self.args.join(" "));
        let mut command = Command::new(&self.name);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
            to_print.push_str(&format!(" 👉 {dir}"));
        }
        if self.clear_env {
            command.env_clear();
        }
        for (key, value) in &self.env_vars {
            command.env(key, value.expose_secret());
        }
        debug!("{to_print}");
        command.args(&self.args);
        if self.interactive {
            self.run_interactive(command)
        } else {
            self.run_captured(command)
        }
    }

    fn run_interactive(&self, mut command: Command) -> anyhow::Result<CmdOutput> {
        let mut child = command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch `{}`", self.name))?;
        let mut stderr = Vec::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_end(&mut stderr)
                .with_context(|| format!("failed to read stderr of `{}`", self.name))?;
        }
        let status = child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.name))?;
        Ok(CmdOutput::from_status(
            status,
            String::new(),
            String::from_utf8_lossy(&stderr).into_owned(),
        ))
    }

    fn run_captured(&self, mut command: Command) -> anyhow::Result<CmdOutput> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch `{}`", self.name))?;
        let stdout = child.stdout.take().context("stdout was not piped")?;
        let stderr = child.stderr.take().context("stderr was not piped")?;

        let (tx, rx) = mpsc::channel();

        // Thread to read stdout
        let tx_clone = tx.clone();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                if tx_clone.send((line, true)).is_err() {
                    break;
                }
            }
        });

        // Thread to read stderr
        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            for line in reader.lines().map_while(Result::ok) {
                if tx.send((line, false)).is_err() {
                    break;
                }
            }
        });

        let mut output_stdout = String::new();
        let mut output_stderr = String::new();

        for (line, is_stdout) in rx {
            if is_stdout {
                if !self.hide_stdout {
                    debug!("{line}");
                }
                output_stdout.push_str(&line);
                output_stdout.push('\n');
            } else {
                debug!("{line}");
                output_stderr.push_str(&line);
                output_stderr.push('\n');
            }
        }
        let status = child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.name))?;

        Ok(CmdOutput::from_status(status, output_stdout, output_stderr))
    }
}
