// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Update driver.
//!
//! Synchronize the main repository, then every tap one at a time in listing
//! order. Each clone contributes a partial report that is merged into one
//! report by concatenation. Tapped formula links are reconciled against the
//! merged report once every clone is up to date.
//!
//! Nothing runs concurrently. The first failure aborts the whole update.
//! Running the update again is the retry mechanism.

use crate::{
    command::{CommandRunner, ExecutionError, Invocation, SystemRunner},
    config::Config,
    diff::{diff, DiffError},
    dump::Formatter,
    link::{LinkError, Reconciliation, TapLinker},
    path::taps_dir,
    pull::{pull, Pull, PullError, PullOptions},
    report::Report,
    repository::{RepositoryHandle, Revision},
};

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    io::{Result as IoResult, Write},
    time::Duration,
};
use tracing::{debug, info, instrument};

/// Result of a full update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Revisions of main repository around its pull.
    pub main: Pull,

    /// Merged change report of main repository and all taps.
    pub report: Report,

    /// Tapped formula links touched.
    pub reconciliation: Reconciliation,
}

impl Outcome {
    /// Write human-readable summary of update.
    ///
    /// # Errors
    ///
    /// - Return [`std::io::Error`] if writer fails.
    pub fn render(&self, formatter: &Formatter, out: &mut impl Write) -> IoResult<()> {
        if self.report.is_empty() {
            return writeln!(out, "Already up-to-date.");
        }

        writeln!(
            out,
            "Updated formulae from {} to {}.",
            short(self.main.before.as_ref()),
            short(self.main.after.as_ref())
        )?;
        formatter.dump(&self.report, out)
    }
}

fn short(revision: Option<&Revision>) -> &str {
    revision.map_or("(none)", Revision::short)
}

/// Drive a full update of formula repository.
#[derive(Debug)]
pub struct Updater<'c, R = SystemRunner>
where
    R: CommandRunner,
{
    config: &'c Config,
    runner: R,
}

impl<'c> Updater<'c, SystemRunner> {
    /// Construct new updater running real git.
    pub fn new(config: &'c Config) -> Self {
        Self::with_runner(config, SystemRunner::new())
    }
}

impl<'c, R> Updater<'c, R>
where
    R: CommandRunner,
{
    /// Construct new updater with target command runner.
    pub fn with_runner(config: &'c Config, runner: R) -> Self {
        Self { config, runner }
    }

    /// Update main repository and every tap, then reconcile tapped formula.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::GitMissing`] if git cannot be executed.
    /// - Return [`UpdateError::Pull`] if any clone fails to pull.
    /// - Return [`UpdateError::Diff`] if any clone fails to diff.
    /// - Return [`UpdateError::Link`] if reconciliation fails.
    /// - Return [`UpdateError::TapListing`] if taps cannot be listed.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&self, options: PullOptions) -> Result<Outcome> {
        self.ensure_git()?;

        let bar = self.progress_bar(options)?;
        let main = RepositoryHandle::main(self.config);
        let (main_pull, mut report) = self.update_one(&main, options, &bar)?;

        for tap in self.discover_taps()? {
            let (_, tap_report) = self.update_one(&tap, options, &bar)?;
            report.merge(tap_report);
        }
        bar.finish_and_clear();

        let linker = TapLinker::new(&self.config.repository);
        let reconciliation = linker.reconcile(&report)?;
        info!(
            "unlinked {} and linked {} tapped formula",
            reconciliation.unlinked, reconciliation.linked
        );

        Ok(Outcome {
            main: main_pull,
            report,
            reconciliation,
        })
    }

    /// List tap clones in directory listing order.
    ///
    /// Only directories count as taps. A missing tap directory means no taps.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::TapListing`] if tap directory cannot be read.
    pub fn discover_taps(&self) -> Result<Vec<RepositoryHandle>> {
        let taps_dir = taps_dir(&self.config.repository);
        let pattern = format!(
            "{}/*",
            glob::Pattern::escape(taps_dir.to_string_lossy().as_ref())
        );

        let mut taps = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry?;
            if !path.is_dir() {
                continue;
            }

            if let Some(name) = path.file_name() {
                taps.push(RepositoryHandle::tap(self.config, name));
            }
        }
        debug!("found {} taps", taps.len());

        Ok(taps)
    }

    fn update_one(
        &self,
        repo: &RepositoryHandle,
        options: PullOptions,
        bar: &ProgressBar,
    ) -> Result<(Pull, Report)> {
        bar.set_message(format!("updating {repo}"));
        let outcome = pull(&self.runner, repo, options)?;
        let report = diff(
            &self.runner,
            repo,
            outcome.before.as_ref(),
            outcome.after.as_ref(),
            &self.config.diff,
        )?;

        Ok((outcome, report))
    }

    fn ensure_git(&self) -> Result<()> {
        let invocation = Invocation::git(".").arg("--version");
        let output = self
            .runner
            .run(&invocation)
            .map_err(UpdateError::GitMissing)?;
        debug!("{}", output.stdout_lossy().trim_end());

        Ok(())
    }

    fn progress_bar(&self, options: PullOptions) -> Result<ProgressBar> {
        if options.verbose {
            return Ok(ProgressBar::hidden());
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        bar.enable_steady_tick(Duration::from_millis(100));

        Ok(bar)
    }
}

/// Update error types.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Git executable cannot be run.
    #[error("please install git first")]
    GitMissing(#[source] ExecutionError),

    #[error(transparent)]
    Pull(#[from] PullError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Link(#[from] LinkError),

    /// Tap directory listing fails.
    #[error("failed to list taps")]
    TapListing(#[from] glob::GlobError),

    /// Tap directory pattern is invalid.
    #[error(transparent)]
    TapPattern(#[from] glob::PatternError),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = UpdateError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Status;

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{fs::create_dir_all, path::PathBuf};

    fn outcome(report: Report) -> Outcome {
        Outcome {
            main: Pull {
                before: Some(Revision::new("0123456789abcdef")),
                after: Some(Revision::new("fedcba9876543210")),
            },
            report,
            reconciliation: Reconciliation::default(),
        }
    }

    fn render(outcome: &Outcome) -> String {
        let mut out = Vec::new();
        outcome
            .render(&Formatter::new(None, false), &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_report_is_up_to_date() {
        assert_eq!(render(&outcome(Report::new())), "Already up-to-date.\n");
    }

    #[test]
    fn non_empty_report_names_revisions() {
        let mut report = Report::new();
        report.push(Status::Added, PathBuf::from("Library/Formula/wget.rb"));

        let expect = indoc! {r#"
            Updated formulae from 01234567 to fedcba98.
            ==> New Formula
            wget
        "#};
        assert_eq!(render(&outcome(report)), expect);
    }

    #[sealed_test]
    fn discover_taps_lists_directories_in_order() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let config = Config::new(&root);
        for tap in ["zed-tools", "adam-formulae"] {
            create_dir_all(root.join("Library/Taps").join(tap))?;
        }
        std::fs::write(root.join("Library/Taps/README"), "not a tap")?;

        let taps = Updater::new(&config)
            .discover_taps()?
            .into_iter()
            .map(|tap| tap.prefix().to_path_buf())
            .collect::<Vec<_>>();

        assert_eq!(
            taps,
            vec![
                PathBuf::from("Library/Taps/adam-formulae"),
                PathBuf::from("Library/Taps/zed-tools"),
            ]
        );

        Ok(())
    }

    #[sealed_test]
    fn no_tap_directory_means_no_taps() -> anyhow::Result<()> {
        let config = Config::new(std::env::current_dir()?);
        assert!(Updater::new(&config).discover_taps()?.is_empty());

        Ok(())
    }
}
