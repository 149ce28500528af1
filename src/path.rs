// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the formula repository, its
//! layout, and the configuration file that describes it.
//!
//! # Repository Layout
//!
//! ```text
//! <repository>/
//! ├── .git/
//! └── Library/
//!     ├── Formula/           core formula, plus symlinks to tapped formula
//!     │   └── .gitignore     names of linked tapped formula
//!     └── Taps/
//!         └── <user>-<repo>/ one clone per tap
//! ```

use std::path::{Path, PathBuf};

/// Core formula directory relative to repository root.
pub const FORMULA_DIR: &str = "Library/Formula";

/// Tap directory relative to repository root.
pub const TAPS_DIR: &str = "Library/Taps";

/// Name of control metadata directory of a clone.
pub const GIT_DIR: &str = ".git";

/// Name of environment variable overriding repository root.
pub const REPOSITORY_ENV: &str = "FORMULAE_REPOSITORY";

/// Name of environment variable overriding configuration file path.
pub const CONFIG_ENV: &str = "FORMULAE_CONFIG";

/// Determine default absolute path to formula repository.
///
/// Uses `$FORMULAE_REPOSITORY` if set. Otherwise uses XDG Base Directory
/// path `$XDG_DATA_HOME/formulae`. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if data directory path cannot be determined.
pub fn default_repository_dir() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(REPOSITORY_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::data_dir()
        .map(|path| path.join("formulae"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to configuration file.
///
/// Uses `$FORMULAE_CONFIG` if set. Otherwise uses
/// `$XDG_CONFIG_HOME/formulae/config.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|path| path.join("formulae").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Absolute path to core formula directory of repository.
pub fn formula_dir(repository: impl AsRef<Path>) -> PathBuf {
    repository.as_ref().join(FORMULA_DIR)
}

/// Absolute path to tap directory of repository.
pub fn taps_dir(repository: impl AsRef<Path>) -> PathBuf {
    repository.as_ref().join(TAPS_DIR)
}

/// No way to determine user's data or configuration directory.
///
/// # See Also
///
/// - [`dirs::data_dir`](https://docs.rs/dirs/latest/dirs/fn.data_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's data or configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("FORMULAE_REPOSITORY", "/opt/formulae")])]
    fn repository_dir_from_env() -> anyhow::Result<()> {
        assert_eq!(default_repository_dir()?, PathBuf::from("/opt/formulae"));
        Ok(())
    }

    #[sealed_test(env = [("FORMULAE_CONFIG", "/etc/formulae.toml")])]
    fn config_path_from_env() -> anyhow::Result<()> {
        assert_eq!(default_config_path()?, PathBuf::from("/etc/formulae.toml"));
        Ok(())
    }

    #[test]
    fn layout_is_relative_to_repository() {
        assert_eq!(
            formula_dir("/brew"),
            PathBuf::from("/brew/Library/Formula")
        );
        assert_eq!(taps_dir("/brew"), PathBuf::from("/brew/Library/Taps"));
    }
}
