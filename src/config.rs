// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the configuration file that describes where the
//! formula repository lives, and which remotes it is synchronized from. The
//! configuration is constructed once at startup, and handed by reference to
//! every component that needs it.

use crate::path::{default_repository_dir, NoWayHome};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Update engine configuration.
///
/// # General Layout
///
/// The configuration is composed of the repository root, the remote settings
/// of the main repository, the remote settings shared by every tap, and diff
/// settings. Every field is optional in the file itself. A missing repository
/// field resolves to [`default_repository_dir`].
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Config {
    /// Root of the formula repository.
    pub repository: PathBuf,

    /// Remote settings for main repository.
    pub remote: RemoteSettings,

    /// Remote settings for every tap.
    pub taps: TapSettings,

    /// Change classification settings.
    pub diff: DiffSettings,
}

impl Config {
    /// Construct default configuration rooted at target repository.
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            remote: RemoteSettings::default(),
            taps: TapSettings::default(),
            diff: DiffSettings::default(),
        }
    }

    /// Load configuration file at target path.
    ///
    /// A missing file is not an error. Default configuration rooted at
    /// [`default_repository_dir`] is used instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file contents are invalid.
    /// - Return [`ConfigError::ShellExpansion`] if repository path cannot be
    ///   expanded.
    /// - Return [`ConfigError::NoWayHome`] if repository is not configured,
    ///   and its default location cannot be determined.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_with(path.as_ref(), default_repository_dir)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        parse_with(data, default_repository_dir)
    }
}

/// Layout of configuration file as written by the user.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    repository: Option<PathBuf>,
    remote: RemoteSettings,
    taps: TapSettings,
    diff: DiffSettings,
}

fn load_with<F>(path: &Path, default_repository: F) -> Result<Config>
where
    F: FnOnce() -> Result<PathBuf, NoWayHome>,
{
    match read_to_string(path) {
        Ok(data) => {
            debug!("load configuration from {:?}", path.display());
            parse_with(&data, default_repository)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no configuration at {:?}, using defaults", path.display());
            Ok(Config::new(default_repository()?))
        }
        Err(err) => Err(ConfigError::Read {
            source: err,
            path: path.to_path_buf(),
        }),
    }
}

fn parse_with<F>(data: &str, default_repository: F) -> Result<Config>
where
    F: FnOnce() -> Result<PathBuf, NoWayHome>,
{
    let file: ConfigFile = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

    // INVARIANT: Perform shell expansion on repository field.
    let repository = match file.repository {
        Some(path) => PathBuf::from(
            shellexpand::full(path.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        ),
        None => default_repository()?,
    };

    Ok(Config {
        repository,
        remote: file.remote,
        taps: file.taps,
        diff: file.diff,
    })
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Remote settings of main repository.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Name of remote to register and pull from.
    pub name: String,

    /// Canonical URL of remote.
    pub url: String,

    /// Branch on remote to fetch.
    pub upstream_branch: String,

    /// Local branch kept in sync with upstream branch.
    pub tracking_branch: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            name: "origin".into(),
            url: "http://github.com/sceaga/homebrew.git".into(),
            upstream_branch: "powerpc".into(),
            tracking_branch: "master".into(),
        }
    }
}

/// Remote settings shared by all taps.
///
/// Taps are never initialized by the update engine, so no URL is needed.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TapSettings {
    /// Name of remote each tap pulls from.
    pub remote: String,

    /// Branch on remote to fetch.
    pub upstream_branch: String,

    /// Local branch kept in sync with upstream branch.
    pub tracking_branch: String,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            remote: "origin".into(),
            upstream_branch: "master".into(),
            tracking_branch: "master".into(),
        }
    }
}

/// Change classification settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiffSettings {
    /// Ask git to detect renames when diffing revisions.
    pub find_renames: bool,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Repository is not configured, and has no default location.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah")])]
    fn deserialize_config() -> anyhow::Result<()> {
        let result: Config = r#"
            repository = "$BLAH/brew"

            [remote]
            name = "upstream"
            url = "https://blah.org/brew.git"
            upstream_branch = "ppc"
            tracking_branch = "main"

            [taps]
            upstream_branch = "main"

            [diff]
            find_renames = true
        "#
        .parse()?;

        let expect = Config {
            repository: PathBuf::from("/home/blah/brew"),
            remote: RemoteSettings {
                name: "upstream".into(),
                url: "https://blah.org/brew.git".into(),
                upstream_branch: "ppc".into(),
                tracking_branch: "main".into(),
            },
            taps: TapSettings {
                remote: "origin".into(),
                upstream_branch: "main".into(),
                tracking_branch: "master".into(),
            },
            diff: DiffSettings { find_renames: true },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn serialize_config() {
        let result = Config::new("/home/blah/brew").to_string();
        let expect = indoc! {r#"
            repository = "/home/blah/brew"

            [remote]
            name = "origin"
            url = "http://github.com/sceaga/homebrew.git"
            upstream_branch = "powerpc"
            tracking_branch = "master"

            [taps]
            remote = "origin"
            upstream_branch = "master"
            tracking_branch = "master"

            [diff]
            find_renames = false
        "#};

        assert_eq!(result, expect);
    }

    #[sealed_test(env = [("FORMULAE_REPOSITORY", "/opt/formulae")])]
    fn load_missing_config_uses_defaults() -> anyhow::Result<()> {
        let config = Config::load("nowhere.toml")?;
        assert_eq!(config, Config::new("/opt/formulae"));

        Ok(())
    }

    #[sealed_test(env = [("FORMULAE_REPOSITORY", "/opt/formulae")])]
    fn missing_repository_field_uses_default_location() -> anyhow::Result<()> {
        let config: Config = r#"
            [diff]
            find_renames = true
        "#
        .parse()?;

        assert_eq!(config.repository, PathBuf::from("/opt/formulae"));
        assert!(config.diff.find_renames);

        Ok(())
    }

    #[sealed_test]
    fn missing_config_without_home_is_error() {
        let result = load_with(Path::new("nowhere.toml"), || Err(NoWayHome));
        assert!(matches!(result, Err(ConfigError::NoWayHome(_))));
    }

    #[test]
    fn missing_repository_field_without_home_is_error() {
        let result = parse_with("[diff]\nfind_renames = true\n", || Err(NoWayHome));
        assert!(matches!(result, Err(ConfigError::NoWayHome(_))));

        // An explicit repository never needs the default location.
        let config = parse_with("repository = \"/brew\"\n", || Err(NoWayHome));
        assert_eq!(
            config.map(|config| config.repository).ok(),
            Some(PathBuf::from("/brew"))
        );
    }
}
