// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository pulling.
//!
//! Bring a local clone up to date with its upstream branch, and report the
//! revision it was at before and after. The main repository is initialized
//! from its canonical remote on first use. Taps are never initialized here.
//!
//! # Initialization
//!
//! First-time setup of the main repository is all or nothing. Every step runs
//! inside an [`InitTransaction`] that removes the partially created `.git`
//! directory when dropped before being committed. Thus, a failed fetch during
//! setup leaves the repository exactly as uninitialized as it was before, and
//! the next update simply tries again.

use crate::{
    command::{CommandRunner, ExecutionError, Invocation},
    repository::{current_revision, RepositoryError, RepositoryHandle, Revision},
};

use std::{fs::remove_dir_all, path::PathBuf};
use tracing::{debug, info, instrument, warn};

/// Options for pulling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PullOptions {
    /// Rebase local tracking branch onto upstream instead of merging.
    pub rebase: bool,

    /// Echo git output instead of keeping it quiet.
    pub verbose: bool,
}

/// Revisions of clone around a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pull {
    pub before: Option<Revision>,
    pub after: Option<Revision>,
}

impl Pull {
    /// Whether the pull moved the clone to another revision.
    pub fn is_changed(&self) -> bool {
        self.before.is_some() && self.before != self.after
    }
}

/// Pull upstream branch into tracking branch of clone.
///
/// Initializes the main repository first if it lacks control metadata.
///
/// # Errors
///
/// - Return [`PullError::Initialization`] if first-time setup fails.
/// - Return [`PullError::NotARepository`] if a tap lacks control metadata.
/// - Return [`PullError::Command`] if checkout, config, or pull fails.
/// - Return [`PullError::Repository`] if HEAD cannot be read.
#[instrument(skip(runner, repo), fields(repo = %repo), level = "debug")]
pub fn pull(
    runner: &impl CommandRunner,
    repo: &RepositoryHandle,
    options: PullOptions,
) -> Result<Pull> {
    if !repo.has_metadata() {
        match repo.upstream().url.as_deref() {
            Some(url) => initialize(runner, repo, url)?,
            None => {
                return Err(PullError::NotARepository {
                    path: repo.workdir().to_path_buf(),
                })
            }
        }
    }

    let upstream = repo.upstream();
    let git = |args: &[&str]| {
        let invocation = Invocation::git(repo.workdir())
            .args(args.iter().copied())
            .echo(options.verbose);
        runner.run(&invocation).map_err(|source| PullError::Command {
            repo: repo.to_string(),
            source,
        })
    };

    git(&["checkout", "-q", upstream.tracking_branch.as_str()])?;
    let before = current_revision(repo)?;

    // INVARIANT: Never munge line endings on checkout, even on old clones.
    git(&["config", "core.autocrlf", "false"])?;

    let refspec = upstream.refspec();
    let mut args = vec!["pull"];
    if options.rebase {
        args.push("--rebase");
    }
    if !options.verbose {
        args.push("-q");
    }
    args.push(upstream.remote.as_str());
    args.push(refspec.as_str());
    info!("pull {repo} from {} {}", upstream.remote, upstream.branch);
    git(args.as_slice())?;

    let after = current_revision(repo)?;
    debug!("{repo} went from {before:?} to {after:?}");

    Ok(Pull { before, after })
}

#[instrument(skip(runner, repo), fields(repo = %repo), level = "debug")]
fn initialize(
    runner: &impl CommandRunner,
    repo: &RepositoryHandle,
    url: &str,
) -> Result<(), InitializationError> {
    info!("initialize {:?} from {url}", repo.workdir().display());
    let init_error = |source: ExecutionError| InitializationError::Command {
        path: repo.workdir().to_path_buf(),
        source,
    };

    mkdirp::mkdirp(repo.workdir()).map_err(|source| InitializationError::CreateDir {
        path: repo.workdir().to_path_buf(),
        source,
    })?;

    let upstream = repo.upstream();
    let transaction = InitTransaction::begin(repo.git_dir());
    let steps: [Vec<&str>; 6] = [
        vec!["init"],
        vec!["config", "core.autocrlf", "false"],
        vec!["remote", "add", upstream.remote.as_str(), url],
        vec!["fetch", upstream.remote.as_str(), upstream.branch.as_str()],
        vec!["branch", upstream.tracking_branch.as_str(), "FETCH_HEAD"],
        vec!["reset", "--hard", upstream.tracking_branch.as_str()],
    ];

    for step in steps {
        let invocation = Invocation::git(repo.workdir()).args(step);
        runner.run(&invocation).map_err(&init_error)?;
    }

    transaction.commit();

    Ok(())
}

/// Transactional scope of repository initialization.
///
/// Removes the control metadata directory on drop unless committed.
#[derive(Debug)]
pub struct InitTransaction {
    git_dir: PathBuf,
    committed: bool,
}

impl InitTransaction {
    /// Begin initializing control metadata directory at target path.
    pub fn begin(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            committed: false,
        }
    }

    /// Keep control metadata directory.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for InitTransaction {
    fn drop(&mut self) {
        if self.committed || !self.git_dir.exists() {
            return;
        }

        warn!("roll back partial initialization of {:?}", self.git_dir.display());
        if let Err(err) = remove_dir_all(&self.git_dir) {
            warn!("failed to remove {:?}: {err}", self.git_dir.display());
        }
    }
}

/// First-time repository setup failed.
///
/// Partially created control metadata was already removed.
#[derive(Debug, thiserror::Error)]
pub enum InitializationError {
    /// Repository directory cannot be created.
    #[error("failed to create repository directory {:?}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A setup step failed.
    #[error("failed to initialize repository at {:?}", path.display())]
    Command {
        path: PathBuf,
        #[source]
        source: ExecutionError,
    },
}

/// Pulling error types.
#[derive(Debug, thiserror::Error)]
pub enum PullError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// Tap directory without control metadata.
    #[error("{:?} is not a repository, refusing to pull", path.display())]
    NotARepository { path: PathBuf },

    /// Checkout, config, or pull failed.
    #[error("failed to pull {repo}")]
    Command {
        repo: String,
        #[source]
        source: ExecutionError,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Friendly result alias :3
pub type Result<T, E = PullError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{CommandOutput, SystemRunner},
        config::Config,
    };

    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{cell::RefCell, fs::create_dir_all};

    /// Run commands for real, except for the ones matching target subcommand.
    struct FailingRunner {
        fail_on: &'static str,
        calls: RefCell<Vec<String>>,
    }

    impl FailingRunner {
        fn new(fail_on: &'static str) -> Self {
            Self {
                fail_on,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FailingRunner {
        fn run(&self, invocation: &Invocation) -> crate::command::Result<CommandOutput> {
            self.calls.borrow_mut().push(invocation.to_string());
            if invocation.arguments().first().is_some_and(|arg| arg == self.fail_on) {
                return Err(ExecutionError::Failed {
                    command: invocation.to_string(),
                    status: failed_status(),
                    output: "fatal: unable to access remote".into(),
                });
            }

            SystemRunner::new().run(invocation)
        }
    }

    #[cfg(unix)]
    fn failed_status() -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(128 << 8)
    }

    #[sealed_test(env = [("GIT_CONFIG_NOSYSTEM", "1"), ("GIT_CONFIG_GLOBAL", "/dev/null")])]
    fn failed_initialization_removes_git_dir() -> anyhow::Result<()> {
        let root = std::env::current_dir()?.join("brew");
        let repo = RepositoryHandle::main(&Config::new(&root));
        let runner = FailingRunner::new("fetch");

        let error = pull(&runner, &repo, PullOptions::default()).unwrap_err();

        assert!(matches!(error, PullError::Initialization(_)));
        assert!(!repo.git_dir().exists());
        assert_eq!(
            runner.calls.borrow().last().map(String::as_str),
            Some("git fetch origin powerpc")
        );

        Ok(())
    }

    #[sealed_test]
    fn tap_without_metadata_is_not_initialized() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let repo = RepositoryHandle::tap(&Config::new(&root), "user-repo");
        create_dir_all(repo.workdir())?;
        let runner = FailingRunner::new("never");

        let error = pull(&runner, &repo, PullOptions::default()).unwrap_err();

        assert!(matches!(error, PullError::NotARepository { .. }));
        assert!(runner.calls.borrow().is_empty());

        Ok(())
    }

    #[sealed_test]
    fn uncommitted_transaction_rolls_back() -> anyhow::Result<()> {
        let git_dir = std::env::current_dir()?.join(".git");
        create_dir_all(git_dir.join("objects"))?;

        drop(InitTransaction::begin(&git_dir));
        assert!(!git_dir.exists());

        create_dir_all(&git_dir)?;
        InitTransaction::begin(&git_dir).commit();
        assert!(git_dir.exists());

        Ok(())
    }

    #[test]
    fn unknown_before_is_not_a_change() {
        let pull = Pull {
            before: None,
            after: Some(Revision::new("abc")),
        };
        assert!(!pull.is_changed());
    }
}
