// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Formula references.
//!
//! A formula reference is derived on demand from a root-relative path of a
//! change report. Core formula live directly in `Library/Formula`, and are
//! named by their file stem. Tapped formula live anywhere below a
//! `Library/Taps/<user>-<repo>` clone, and are named `<user>/<repo>/<stem>`.

use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

static CORE_FORMULA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Library/Formula/([^/]+)\.rb$").unwrap());

static TAPPED_FORMULA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Library/Taps/((\w+)-(\w+)/(?:.*/)?([^/]+)\.rb)$").unwrap()
});

/// Formula derived from a changed path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormulaRef {
    /// Formula shipped by main repository.
    Core { name: String },

    /// Formula shipped by a tap.
    Tapped {
        user: String,
        repo: String,
        stem: String,
        /// Path relative to `Library/Taps`, starting with the tap directory.
        path: PathBuf,
    },
}

impl FormulaRef {
    /// Derive formula reference from root-relative path.
    ///
    /// Returns `None` for paths that are not formula files.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref().to_str()?;

        if let Some(captures) = CORE_FORMULA.captures(path) {
            return Some(Self::Core {
                name: captures[1].to_string(),
            });
        }

        TAPPED_FORMULA.captures(path).map(|captures| Self::Tapped {
            user: captures[2].to_string(),
            repo: captures[3].to_string(),
            stem: captures[4].to_string(),
            path: PathBuf::from(&captures[1]),
        })
    }

    /// Human-readable name of formula.
    pub fn name(&self) -> String {
        match self {
            Self::Core { name } => name.clone(),
            Self::Tapped {
                user, repo, stem, ..
            } => format!("{user}/{repo}/{stem}"),
        }
    }

    pub fn is_core(&self) -> bool {
        matches!(self, Self::Core { .. })
    }

    pub fn is_tapped(&self) -> bool {
        matches!(self, Self::Tapped { .. })
    }

    /// Name of tap directory that provides this formula, e.g., "user-repo".
    pub fn tap_dir_name(&self) -> Option<String> {
        match self {
            Self::Core { .. } => None,
            Self::Tapped { user, repo, .. } => Some(format!("{user}-{repo}")),
        }
    }

    /// Path of formula file relative to `Library/Taps`.
    pub fn tap_path(&self) -> Option<&Path> {
        match self {
            Self::Core { .. } => None,
            Self::Tapped { path, .. } => Some(path.as_path()),
        }
    }

    /// File name the formula is linked under in `Library/Formula`.
    pub fn link_name(&self) -> String {
        match self {
            Self::Core { name } => format!("{name}.rb"),
            Self::Tapped { stem, .. } => format!("{stem}.rb"),
        }
    }
}
