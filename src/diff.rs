// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Change classification.
//!
//! Compute the paths that changed in a clone between two revisions, and
//! classify them by status into a [`Report`]. Paths are rebased onto the
//! formula repository root, so a tap's report can be merged with the main
//! repository's report directly.

use crate::{
    command::{CommandRunner, ExecutionError, Invocation},
    config::DiffSettings,
    report::{Report, Status},
    repository::{RepositoryHandle, Revision},
};

use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Compute change report of clone between two revisions.
///
/// Nothing is run when either revision is unknown, or when both revisions are
/// the same. The report is empty in that case.
///
/// # Errors
///
/// - Return [`DiffError::Execution`] if `git diff-tree` fails.
#[instrument(skip(runner, repo, settings), fields(repo = %repo), level = "debug")]
pub fn diff(
    runner: &impl CommandRunner,
    repo: &RepositoryHandle,
    before: Option<&Revision>,
    after: Option<&Revision>,
    settings: &DiffSettings,
) -> Result<Report> {
    let (before, after) = match (before, after) {
        (Some(before), Some(after)) if before != after => (before, after),
        _ => {
            debug!("no revision change");
            return Ok(Report::new());
        }
    };

    let mut invocation =
        Invocation::git(repo.workdir()).args(["diff-tree", "-r", "--name-status", "-z"]);
    if settings.find_renames {
        invocation = invocation.arg("-M");
    }
    let invocation = invocation.args([before.as_str(), after.as_str()]);

    let output = runner.run(&invocation)?;
    let report = parse_name_status(&output.stdout, repo.prefix());
    debug!("{} status groups changed", report.iter().count());

    Ok(report)
}

/// Parse NUL-separated output of `git diff-tree --name-status -z`.
///
/// Each record is a status code followed by one path, or by a source and a
/// destination path for copies and renames. Only the destination is kept.
/// Every kept path is prefixed with target prefix. Paths are taken byte for
/// byte, so file names that are not valid UTF-8 survive intact.
pub fn parse_name_status(output: impl AsRef<[u8]>, prefix: impl AsRef<Path>) -> Report {
    let mut report = Report::new();
    let mut tokens = output
        .as_ref()
        .split(|byte| *byte == b'\0')
        .filter(|token| !token.is_empty());

    while let Some(code) = tokens.next() {
        let code = String::from_utf8_lossy(code);
        let status = Status::from_code(&code);
        if status.has_source_path() {
            // INVARIANT: Skip source path, record destination path.
            let _ = tokens.next();
        }

        match tokens.next() {
            Some(path) => report.push(status, prefix.as_ref().join(bytes_to_path(path))),
            None => warn!("diff status {code:?} has no path, ignoring it"),
        }
    }

    report
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    let path = String::from_utf8_lossy(bytes);
    if matches!(path, std::borrow::Cow::Owned(_)) {
        warn!("diff path {path:?} is not valid UTF-8, it will not match any formula");
    }
    PathBuf::from(path.into_owned())
}

/// Change classification error types.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Running `git diff-tree` fails.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Friendly result alias :3
pub type Result<T, E = DiffError> = std::result::Result<T, E>;
