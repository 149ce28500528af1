// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local clones and their revisions.
//!
//! A [`RepositoryHandle`] names a local working directory that is a git clone,
//! where that clone sits relative to the overall formula repository root, and
//! which remote branch it is synchronized from. The main repository has an
//! empty prefix. Each tap has a prefix of `Library/Taps/<user>-<repo>`.

use crate::{
    config::Config,
    path::{GIT_DIR, TAPS_DIR},
};

use git2::{ErrorCode, Repository};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_dir,
    path::{Path, PathBuf},
};

/// Remote branch a clone is synchronized from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// Name of remote.
    pub remote: String,

    /// URL to register when the clone has to be initialized. Taps have none.
    pub url: Option<String>,

    /// Branch fetched from remote.
    pub branch: String,

    /// Local branch kept in sync with fetched branch.
    pub tracking_branch: String,
}

impl Upstream {
    /// Refspec that maps upstream branch onto remote-tracking ref of the
    /// tracking branch.
    pub fn refspec(&self) -> String {
        format!(
            "refs/heads/{}:refs/remotes/{}/{}",
            self.branch, self.remote, self.tracking_branch
        )
    }
}

/// Handle to local clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    workdir: PathBuf,
    prefix: PathBuf,
    upstream: Upstream,
}

impl RepositoryHandle {
    /// Construct handle to main repository described by configuration.
    pub fn main(config: &Config) -> Self {
        Self {
            workdir: config.repository.clone(),
            prefix: PathBuf::new(),
            upstream: Upstream {
                remote: config.remote.name.clone(),
                url: Some(config.remote.url.clone()),
                branch: config.remote.upstream_branch.clone(),
                tracking_branch: config.remote.tracking_branch.clone(),
            },
        }
    }

    /// Construct handle to tap clone with target directory name.
    pub fn tap(config: &Config, name: impl AsRef<Path>) -> Self {
        let prefix = Path::new(TAPS_DIR).join(name.as_ref());
        Self {
            workdir: config.repository.join(&prefix),
            prefix,
            upstream: Upstream {
                remote: config.taps.remote.clone(),
                url: None,
                branch: config.taps.upstream_branch.clone(),
                tracking_branch: config.taps.tracking_branch.clone(),
            },
        }
    }

    /// Working directory of clone.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Path of clone relative to formula repository root.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Path to control metadata directory of clone.
    pub fn git_dir(&self) -> PathBuf {
        self.workdir.join(GIT_DIR)
    }

    /// Check that control metadata directory exists and is not empty.
    pub fn has_metadata(&self) -> bool {
        read_dir(self.git_dir())
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    /// Whether this handle is the main repository.
    pub fn is_main(&self) -> bool {
        self.prefix.as_os_str().is_empty()
    }
}

impl Display for RepositoryHandle {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        if self.is_main() {
            fmt.write_str("main repository")
        } else {
            fmt.write_str(self.prefix.to_string_lossy().as_ref())
        }
    }
}

/// Commit identifier of a repository state.
///
/// Opaque. Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display, at most eight characters.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl Display for Revision {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.0)
    }
}

/// Read HEAD commit of clone.
///
/// Always reads what is on disk at call time. An unborn HEAD, i.e., a clone
/// without any commit yet, is reported as `None`.
///
/// # Errors
///
/// - Return [`RepositoryError`] if handle does not point at a valid clone, or
///   HEAD cannot be resolved.
pub fn current_revision(repo: &RepositoryHandle) -> Result<Option<Revision>> {
    let error = |source: git2::Error| RepositoryError {
        path: repo.workdir().to_path_buf(),
        source,
    };

    // INVARIANT: Never search parent directories, taps live inside the main
    // repository's work tree.
    let repository = Repository::open(repo.workdir()).map_err(error)?;
    let head = match repository.head() {
        Ok(head) => head,
        Err(err) if err.code() == ErrorCode::UnbornBranch => return Ok(None),
        Err(err) => return Err(error(err)),
    };
    let commit = head.peel_to_commit().map_err(error)?;

    Ok(Some(Revision::new(commit.id().to_string())))
}

/// Handle does not point at a valid repository.
#[derive(Debug, thiserror::Error)]
#[error("{:?} is not a valid repository", path.display())]
pub struct RepositoryError {
    path: PathBuf,
    #[source]
    source: git2::Error,
}

/// Friendly result alias :3
pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::create_dir_all;

    #[test]
    fn revision_short_form() {
        let revision = Revision::new("0123456789abcdef");
        assert_eq!(revision.short(), "01234567");
        assert_eq!(Revision::new("abc").short(), "abc");
    }

    #[test]
    fn tap_handle_is_prefixed() {
        let config = Config::new("/brew");
        let tap = RepositoryHandle::tap(&config, "user-repo");

        assert_eq!(tap.prefix(), Path::new("Library/Taps/user-repo"));
        assert_eq!(tap.workdir(), Path::new("/brew/Library/Taps/user-repo"));
        assert_eq!(tap.upstream().url, None);
        assert_eq!(
            tap.upstream().refspec(),
            "refs/heads/master:refs/remotes/origin/master"
        );
        assert!(!tap.is_main());
    }

    #[test]
    fn main_handle_refspec_maps_upstream_branch() {
        let main = RepositoryHandle::main(&Config::new("/brew"));
        assert_eq!(
            main.upstream().refspec(),
            "refs/heads/powerpc:refs/remotes/origin/master"
        );
        assert!(main.is_main());
    }

    #[sealed_test]
    fn empty_git_dir_is_not_metadata() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let main = RepositoryHandle::main(&Config::new(&root));
        assert!(!main.has_metadata());

        create_dir_all(main.git_dir())?;
        assert!(!main.has_metadata());

        Repository::init(&root)?;
        assert!(main.has_metadata());

        Ok(())
    }

    #[sealed_test]
    fn unborn_head_is_unknown_revision() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        Repository::init(&root)?;
        let main = RepositoryHandle::main(&Config::new(&root));
        assert_eq!(current_revision(&main)?, None);

        Ok(())
    }

    #[sealed_test]
    fn not_a_repository_is_error() -> anyhow::Result<()> {
        let root = std::env::current_dir()?.join("nothing");
        let main = RepositoryHandle::main(&Config::new(&root));
        assert!(current_revision(&main).is_err());

        Ok(())
    }
}
