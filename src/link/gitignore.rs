// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Formula directory ignore file handling.
//!
//! Tapped formula are exposed to the core formula namespace through symlinks
//! inside `Library/Formula`. These symlinks are not part of the main
//! repository. So, every linked name is listed in `Library/Formula/.gitignore`
//! to keep them out of the main repository's status.
//!
//! Git interprets ignore rules on a per line basis. Thus, each linked name is
//! placed on its own line. A missing ignore file is treated as empty.

use std::{
    collections::HashSet,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    io::ErrorKind,
    path::PathBuf,
};

/// Manage entries of ignore file.
#[derive(Clone, Debug)]
pub struct IgnoreDrafter {
    ignore_path: PathBuf,
}

impl IgnoreDrafter {
    /// Construct new ignore file drafter for target formula directory.
    pub fn new(formula_dir: impl Into<PathBuf>) -> Self {
        Self {
            ignore_path: formula_dir.into().join(".gitignore"),
        }
    }

    /// Edit ignore entries.
    ///
    /// Read current entries into [`IgnoreEdit`] instance, and directly edit
    /// each entry before writing the results back. Nothing is written if the
    /// editor left the entries unchanged.
    ///
    /// # Errors
    ///
    /// - Return [`Error::ReadIgnoreFile`] if ignore file cannot be read.
    /// - Return [`Error::WriteIgnoreFile`] if entries cannot be written to
    ///   ignore file.
    pub fn edit<E>(&self, editor: E) -> Result<()>
    where
        E: FnOnce(&mut IgnoreEdit),
    {
        let mut entries = IgnoreEdit::from(self.read()?);
        editor(&mut entries);

        if !entries.changed {
            return Ok(());
        }

        write(&self.ignore_path, entries.to_string().as_bytes()).map_err(|err| {
            Error::WriteIgnoreFile {
                source: err,
                ignore_path: self.ignore_path.clone(),
            }
        })?;

        Ok(())
    }

    fn read(&self) -> Result<String> {
        match read_to_string(&self.ignore_path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(Error::ReadIgnoreFile {
                source: err,
                ignore_path: self.ignore_path.clone(),
            }),
        }
    }
}

/// Ignore entry editor.
///
/// # Invariant
///
/// - No duplicate entries.
/// - Empty lines are dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IgnoreEdit {
    entries: HashSet<String>,
    changed: bool,
}

impl IgnoreEdit {
    /// Construct new ignore entry editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a listing of entries.
    pub fn insert_entries(&mut self, entries: impl IntoIterator<Item = impl Into<String>>) {
        for entry in entries {
            if self.entries.insert(entry.into()) {
                self.changed = true;
            }
        }
    }

    /// Remove a listing of entries.
    pub fn remove_entries(&mut self, entries: impl IntoIterator<Item = impl AsRef<str>>) {
        for entry in entries {
            if self.entries.remove(entry.as_ref()) {
                self.changed = true;
            }
        }
    }
}

impl Display for IgnoreEdit {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort();

        for entry in entries {
            writeln!(fmt, "{entry}")?;
        }

        Ok(())
    }
}

impl From<String> for IgnoreEdit {
    fn from(content: String) -> Self {
        Self::from(content.as_str())
    }
}

impl From<&str> for IgnoreEdit {
    fn from(content: &str) -> Self {
        let entries = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect::<HashSet<_>>();

        Self {
            entries,
            changed: false,
        }
    }
}

/// Ignore file management error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Ignore file cannot be read from.
    #[error("failed to read from ignore file at {:?}", ignore_path.display())]
    ReadIgnoreFile {
        #[source]
        source: std::io::Error,
        ignore_path: PathBuf,
    },

    /// Ignore file cannot be written to.
    #[error("failed to write to ignore file at {:?}", ignore_path.display())]
    WriteIgnoreFile {
        #[source]
        source: std::io::Error,
        ignore_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = Error> = std::result::Result<T, E>;
