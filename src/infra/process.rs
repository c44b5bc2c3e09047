//! External process execution
//!
//! Every subprocess the pipeline starts goes through [`CommandRunner`], with
//! an explicit working directory and environment. Nothing here changes the
//! process-wide current directory.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::error::ProcessError;

/// A fully resolved command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    /// Parse a command line
    ///
    /// `$VAR` and `${VAR}` are expanded against `env` first, then the process
    /// environment. The result is split on whitespace; there is no quoting.
    pub fn from_command_line(
        line: &str,
        cwd: impl Into<PathBuf>,
        env: &BTreeMap<String, String>,
    ) -> Result<Self, ProcessError> {
        let expanded = expand_vars(line, |name| {
            env.get(name).cloned().or_else(|| std::env::var(name).ok())
        });
        let mut words = expanded.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(ProcessError::EmptyCommand)?;

        Ok(Self {
            program,
            args: words.collect(),
            cwd: cwd.into(),
            env: env.clone(),
        })
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append whitespace-separated words after variable expansion
    #[must_use]
    pub fn split_args(self, words: &str) -> Self {
        let expanded = expand_vars(words, |name| {
            self.env
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
        });
        let words: Vec<String> = expanded.split_whitespace().map(str::to_string).collect();
        self.args(words)
    }

    /// Set the extra environment
    #[must_use]
    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env.clone_from(env);
        self
    }

    /// Command line as it would be typed
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Runs external commands
pub trait CommandRunner {
    /// Run a command to completion; non-zero exit is an error
    fn run(&self, command: &CommandSpec) -> Result<(), ProcessError>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        (**self).run(command)
    }
}

/// Runs commands on the host
///
/// Stdout is discarded, stderr is captured for the error report.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec) -> Result<(), ProcessError> {
        tracing::debug!("Running '{}' in {}", command, command.cwd.display());

        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ProcessError::Spawn {
                command: command.command_line(),
                error: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ProcessError::NonZeroExit {
                command: command.command_line(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("Invalid variable pattern")
    })
}

/// Expand `$VAR` and `${VAR}` references
///
/// Unknown variables are left untouched.
pub fn expand_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var_pattern()
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Prepend a directory to a search-path style variable
pub fn prepend_path(dir: &Path, existing: Option<&str>) -> String {
    match existing {
        Some(rest) if !rest.is_empty() => format!("{}:{rest}", dir.display()),
        _ => dir.display().to_string(),
    }
}
