// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Change reports.
//!
//! A [`Report`] maps each change [`Status`] to the ordered sequence of paths
//! that changed with that status, relative to the formula repository root.
//! Reports of the main repository and of every tap are merged into one by
//! concatenation.

use crate::formula::FormulaRef;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

/// Status code of a changed path.
///
/// Key legend: Added (A), Copied (C), Deleted (D), Modified (M), Renamed (R).
/// Any other code is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    Other(String),
}

impl Status {
    /// Parse status code as emitted by `git diff-tree --name-status`.
    ///
    /// Similarity scores of copies and renames, e.g., "R100", are ignored.
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('A') if code.len() == 1 => Self::Added,
            Some('D') if code.len() == 1 => Self::Deleted,
            Some('M') if code.len() == 1 => Self::Modified,
            Some('C') if is_scored(code) => Self::Copied,
            Some('R') if is_scored(code) => Self::Renamed,
            _ => Self::Other(code.to_string()),
        }
    }

    /// Whether status is followed by both a source, and a destination path.
    pub fn has_source_path(&self) -> bool {
        matches!(self, Self::Copied | Self::Renamed)
    }
}

fn is_scored(code: &str) -> bool {
    code[1..].chars().all(|c| c.is_ascii_digit())
}

impl Display for Status {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Added => fmt.write_str("A"),
            Self::Copied => fmt.write_str("C"),
            Self::Deleted => fmt.write_str("D"),
            Self::Modified => fmt.write_str("M"),
            Self::Renamed => fmt.write_str("R"),
            Self::Other(code) => fmt.write_str(code),
        }
    }
}

/// Change report.
///
/// # Invariant
///
/// - A status key is only present when at least one path was recorded for it.
/// - Paths keep diff order, duplicates included.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    changes: BTreeMap<Status, Vec<PathBuf>>,
}

impl Report {
    /// Construct new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one changed path.
    pub fn push(&mut self, status: Status, path: impl Into<PathBuf>) {
        self.changes.entry(status).or_default().push(path.into());
    }

    /// Paths recorded under target status.
    ///
    /// Absent status yields an empty slice. Never mutates the report.
    pub fn get(&self, status: &Status) -> &[PathBuf] {
        self.changes.get(status).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merge other report into this one.
    ///
    /// Paths of a shared status are appended after the paths already
    /// present, never replacing them.
    pub fn merge(&mut self, other: Report) {
        for (status, mut paths) in other.changes {
            self.changes.entry(status).or_default().append(&mut paths);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterate statuses, and their paths, in status order.
    pub fn iter(&self) -> impl Iterator<Item = (&Status, &[PathBuf])> {
        self.changes
            .iter()
            .map(|(status, paths)| (status, paths.as_slice()))
    }

    /// Tapped formula references recorded under target status.
    pub fn tapped_formula(&self, status: &Status) -> Vec<FormulaRef> {
        self.formula(status)
            .filter(FormulaRef::is_tapped)
            .collect()
    }

    /// Tapped formula that were added, these need to be linked.
    pub fn new_tapped_formula(&self) -> Vec<FormulaRef> {
        self.tapped_formula(&Status::Added)
    }

    /// Tapped formula that were deleted, these need to be unlinked.
    pub fn removed_tapped_formula(&self) -> Vec<FormulaRef> {
        self.tapped_formula(&Status::Deleted)
    }

    /// All formula references recorded under target status, in diff order.
    pub fn formula<'a>(&'a self, status: &Status) -> impl Iterator<Item = FormulaRef> + 'a {
        self.get(status)
            .iter()
            .filter_map(|path| FormulaRef::from_path(path.as_path()))
    }
}

impl FromIterator<(Status, PathBuf)> for Report {
    fn from_iter<I: IntoIterator<Item = (Status, PathBuf)>>(iter: I) -> Self {
        let mut report = Report::new();
        for (status, path) in iter {
            report.push(status, path);
        }
        report
    }
}
