// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tapped formula reconciliation.
//!
//! Tapped formula become visible to the rest of the package manager through a
//! symlink in `Library/Formula` that points into their tap, e.g.,
//! `Library/Formula/foo.rb -> ../Taps/user-repo/foo.rb`. After an update, the
//! links of tapped formula that were deleted upstream are removed, and links
//! for tapped formula that were added upstream are created.
//!
//! # Ordering
//!
//! The whole unlink pass runs before the link pass. A formula that moved from
//! one tap to another shows up as deleted in the old tap, and added in the new
//! one. Unlinking first guarantees the link ends up pointing at the new tap.
//!
//! Renamed or modified tapped formula are listed in the report, but are not
//! relinked.

pub mod gitignore;

use crate::{
    formula::FormulaRef,
    link::gitignore::IgnoreDrafter,
    path::{formula_dir, taps_dir},
    report::Report,
};

use std::{
    fs::{read_link, remove_file, symlink_metadata},
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

#[cfg(unix)]
use std::os::unix::fs::symlink;
#[cfg(windows)]
use std::os::windows::fs::symlink_file as symlink;

/// Link target prefix from `Library/Formula` into `Library/Taps`.
const TAPS_FROM_FORMULA_DIR: &str = "../Taps";

/// Outcome of reconciling tapped formula links.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub unlinked: usize,
    pub linked: usize,
}

/// Maintain symlinks of tapped formula inside the core formula directory.
#[derive(Debug, Clone)]
pub struct TapLinker {
    formula_dir: PathBuf,
    taps_dir: PathBuf,
    ignore: IgnoreDrafter,
}

impl TapLinker {
    /// Construct new tap linker for formula repository at target root.
    pub fn new(repository: impl AsRef<Path>) -> Self {
        let formula_dir = formula_dir(repository.as_ref());
        Self {
            ignore: IgnoreDrafter::new(&formula_dir),
            taps_dir: taps_dir(repository.as_ref()),
            formula_dir,
        }
    }

    /// Unlink removed tapped formula, then link new tapped formula.
    ///
    /// Only deleted paths feed the unlink pass, and only added paths feed the
    /// link pass.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError`] if either pass fails.
    pub fn reconcile(&self, report: &Report) -> Result<Reconciliation> {
        let unlinked = self.unlink_tapped_formula(&report.removed_tapped_formula())?;
        let linked = self.link_tapped_formula(&report.new_tapped_formula())?;

        Ok(Reconciliation { unlinked, linked })
    }

    /// Remove links of tapped formula.
    ///
    /// A link is only removed if it is a symlink pointing somewhere inside the
    /// formula's own tap. Missing links are already unlinked. Core formula
    /// files are never touched. Returns number of links removed.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Io`] if a link cannot be inspected or removed.
    /// - Return [`LinkError::Ignore`] if ignore file cannot be updated.
    #[instrument(skip(self, formulae), level = "debug")]
    pub fn unlink_tapped_formula(&self, formulae: &[FormulaRef]) -> Result<usize> {
        let mut untapped = Vec::new();

        for formula in formulae {
            let Some(tap) = formula.tap_dir_name() else {
                continue;
            };
            let name = formula.link_name();
            let link = self.link_path(formula);

            let Some(target) = self.read_symlink(&link)? else {
                debug!("{} is not linked", formula.name());
                continue;
            };

            let resolved = normalize(&self.formula_dir.join(target));
            if !resolved.starts_with(normalize(&self.taps_dir.join(&tap))) {
                debug!(
                    "{:?} does not point into {tap}, leaving it alone",
                    link.display()
                );
                continue;
            }

            remove_file(&link).map_err(|source| LinkError::Io {
                path: link.clone(),
                source,
            })?;
            info!("unlink {}", formula.name());
            untapped.push(name);
        }

        if !untapped.is_empty() {
            self.ignore.edit(|editor| editor.remove_entries(&untapped))?;
        }

        Ok(untapped.len())
    }

    /// Link tapped formula into core formula directory.
    ///
    /// Stale symlinks pointing elsewhere are replaced. Regular files, i.e.,
    /// core formula of the same name, are left alone. Returns number of
    /// formula that are linked afterwards.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::Io`] if a link cannot be created or replaced.
    /// - Return [`LinkError::Ignore`] if ignore file cannot be updated.
    #[instrument(skip(self, formulae), level = "debug")]
    pub fn link_tapped_formula(&self, formulae: &[FormulaRef]) -> Result<usize> {
        let mut tapped = Vec::new();

        for formula in formulae {
            let Some(tap_path) = formula.tap_path() else {
                continue;
            };
            let name = formula.link_name();
            let link = self.link_path(formula);
            let target = Path::new(TAPS_FROM_FORMULA_DIR).join(tap_path);

            match self.read_symlink(&link)? {
                Some(current) if current == target => {
                    debug!("{} already linked", formula.name());
                }
                Some(current) => {
                    info!(
                        "relink {} from {:?}",
                        formula.name(),
                        current.display()
                    );
                    remove_file(&link).map_err(|source| LinkError::Io {
                        path: link.clone(),
                        source,
                    })?;
                    self.create_link(&target, &link)?;
                }
                None if link.exists() => {
                    warn!(
                        "{:?} is not a symlink, refusing to link {} over it",
                        link.display(),
                        formula.name()
                    );
                    continue;
                }
                None => {
                    info!("link {}", formula.name());
                    self.create_link(&target, &link)?;
                }
            }

            tapped.push(name);
        }

        if !tapped.is_empty() {
            self.ignore.edit(|editor| editor.insert_entries(tapped.iter().cloned()))?;
        }

        Ok(tapped.len())
    }

    /// Path of link for target formula in core formula directory.
    fn link_path(&self, formula: &FormulaRef) -> PathBuf {
        self.formula_dir.join(formula.link_name())
    }

    /// Read target of symlink, `None` if path is missing or not a symlink.
    fn read_symlink(&self, link: &Path) -> Result<Option<PathBuf>> {
        let io_error = |source: std::io::Error| LinkError::Io {
            path: link.to_path_buf(),
            source,
        };

        match symlink_metadata(link) {
            Ok(meta) if meta.file_type().is_symlink() => {
                read_link(link).map(Some).map_err(io_error)
            }
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(err)),
        }
    }

    fn create_link(&self, target: &Path, link: &Path) -> Result<()> {
        mkdirp::mkdirp(&self.formula_dir).map_err(|source| LinkError::Io {
            path: self.formula_dir.clone(),
            source,
        })?;

        symlink(target, link).map_err(|source| LinkError::Io {
            path: link.to_path_buf(),
            source,
        })
    }
}

/// Lexically resolve `.` and `..` components of a path.
///
/// The target of a link may already be deleted, so the filesystem cannot be
/// asked to canonicalize it.
fn normalize(path: &Path) -> PathBuf {
    let mut normal = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normal.pop();
            }
            other => normal.push(other.as_os_str()),
        }
    }

    normal
}

/// Tapped formula reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Filesystem operation on link fails.
    #[error("failed to (un)link {:?}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ignore file of formula directory cannot be updated.
    #[error(transparent)]
    Ignore(#[from] gitignore::Error),
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;
