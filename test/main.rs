// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use git2::{IndexEntry, IndexTime, Repository, RepositoryInitOptions};
use std::path::{Path, PathBuf};

/// Upstream remote that the update engine pulls from.
///
/// Always bare. Commits are built straight from blobs, no work tree needed.
pub(crate) struct UpstreamFixture {
    repo: Repository,
}

impl UpstreamFixture {
    pub(crate) fn new(path: impl AsRef<Path>, branch: &str) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(branch);
        opts.bare(true);
        let repo = Repository::init_opts(path.as_ref(), &opts)?;

        // INVARIANT: Always provide valid name and email.
        //   - Git will complain if this is not set in CI/CD environments.
        let mut config = repo.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(Self { repo })
    }

    /// URL to clone or fetch this upstream from.
    pub(crate) fn url(&self) -> String {
        self.repo.path().to_string_lossy().into_owned()
    }

    /// Commit a set of changes on top of branch HEAD as one commit.
    pub(crate) fn commit(&self, changes: &[Change<'_>]) -> Result<()> {
        // INVARIANT: Always start from tree of latest commit.
        let mut index = self.repo.index()?;
        index.clear()?;
        let parent = self.repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        if let Some(parent) = &parent {
            index.read_tree(&parent.tree()?)?;
        }

        for change in changes {
            match change {
                Change::Write(path, contents) => {
                    let entry = IndexEntry {
                        ctime: IndexTime::new(0, 0),
                        mtime: IndexTime::new(0, 0),
                        dev: 0,
                        ino: 0,
                        mode: 0o100644,
                        uid: 0,
                        gid: 0,
                        file_size: contents.len() as u32,
                        id: self.repo.blob(contents.as_bytes())?,
                        flags: 0,
                        flags_extended: 0,
                        path: path.as_bytes().to_vec(),
                    };
                    index.add_frombuffer(&entry, contents.as_bytes())?;
                }
                Change::Remove(path) => index.remove_path(Path::new(path))?,
            }
        }

        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let signature = self.repo.signature()?;
        let parents = parent.iter().collect::<Vec<_>>();

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            "chore: update formula",
            &tree,
            &parents,
        )?;

        Ok(())
    }

    /// Clone this upstream into target path, as a tap would be.
    pub(crate) fn clone_into(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let clone = Repository::clone(&self.url(), path.as_ref())?;
        let mut config = clone.config()?;
        config.set_str("user.name", "John Doe")?;
        config.set_str("user.email", "john@doe.com")?;

        Ok(path.as_ref().to_path_buf())
    }
}

/// One change to commit upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change<'a> {
    Write(&'a str, &'a str),
    Remove(&'a str),
}
