// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command execution.
//!
//! Every external process the update engine spawns goes through a
//! [`CommandRunner`]. The runner captures stdout and stderr, checks the exit
//! status, and wraps failure into [`ExecutionError`] with the command line and
//! captured output attached.
//!
//! Commands receive their working directory explicitly through
//! [`Invocation::current_dir`]. The current directory of this process is never
//! changed.

use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use tracing::{debug, info};

/// Description of one external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    current_dir: PathBuf,
    echo: bool,
}

impl Invocation {
    /// Construct new invocation of target program inside target directory.
    pub fn new(program: impl Into<OsString>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
            echo: false,
        }
    }

    /// Construct new invocation of git inside target directory.
    pub fn git(current_dir: impl Into<PathBuf>) -> Self {
        Self::new("git", current_dir)
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a listing of arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Echo command line and captured output through logging when run.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn is_echoed(&self) -> bool {
        self.echo
    }

    fn is_git(&self) -> bool {
        self.program == "git"
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(fmt, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Captured output of successful command.
///
/// Stdout is kept as raw bytes, because it may carry paths that are not valid
/// UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout decoded for display.
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stdout and stderr together, trailing newline chomped.
    pub fn combined(&self) -> String {
        combine(&self.stdout_lossy(), &self.stderr)
    }
}

/// Layer of indirection for running external commands.
pub trait CommandRunner {
    /// Run invocation to completion, blocking the current thread.
    ///
    /// # Errors
    ///
    /// - Return [`ExecutionError::Spawn`] if the program cannot be started.
    /// - Return [`ExecutionError::Failed`] if the program exits non-zero.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// Run commands as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("run {invocation} in {:?}", invocation.current_dir().display());
        let mut command = Command::new(invocation.program());
        command
            .args(invocation.arguments())
            .current_dir(invocation.current_dir());

        // INVARIANT: Git must always operate on the repository's own config.
        if invocation.is_git() {
            command.env_remove("GIT_CONFIG");
        }

        let output = command.output().map_err(|err| ExecutionError::Spawn {
            command: invocation.to_string(),
            source: err,
        })?;
        let captured = CommandOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        };

        if !output.status.success() {
            return Err(ExecutionError::Failed {
                command: invocation.to_string(),
                status: output.status,
                output: captured.combined(),
            });
        }

        if invocation.is_echoed() {
            info!("{invocation}\n{}", captured.combined());
        }

        Ok(captured)
    }
}

fn combine(stdout: &str, stderr: &str) -> String {
    let mut message = String::new();
    message.push_str(stdout);
    if !stdout.is_empty() && !stderr.is_empty() && !stdout.ends_with('\n') {
        message.push('\n');
    }
    message.push_str(stderr);

    // INVARIANT: Chomp trailing newlines.
    message.trim_end_matches(['\r', '\n']).to_string()
}

/// External command failed.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Program could not be started at all.
    #[error("failure while executing: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Program ran, but exited unsuccessfully.
    #[error("failure while executing: {command} ({status})\n{output}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

impl ExecutionError {
    /// Command line that failed.
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { command, .. } | Self::Failed { command, .. } => command,
        }
    }

    /// Captured output of failed command, if it ran at all.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Spawn { .. } => None,
            Self::Failed { output, .. } => Some(output),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = ExecutionError> = std::result::Result<T, E>;
