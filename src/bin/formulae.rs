// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use formulae::{path::default_config_path, Config, Formatter, PullOptions, Updater};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{io::stdout, path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "formulae [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = match self.config {
            Some(path) => Config::load(path)?,
            None => Config::load(default_config_path()?)?,
        };

        match self.command {
            Command::Update(opts) => run_update(&config, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Fetch newest formula from upstream, and from every tap.
    #[command(override_usage = "formulae update [options]")]
    Update(UpdateOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UpdateOptions {
    /// Rebase local changes onto upstream instead of merging.
    #[arg(long)]
    pub rebase: bool,

    /// Show git output and debug logging.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(if verbose { "debug" } else { "info" }))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_update(config: &Config, opts: UpdateOptions) -> Result<()> {
    let options = PullOptions {
        rebase: opts.rebase,
        verbose: opts.verbose,
    };

    let outcome = Updater::new(config).run(options)?;
    outcome.render(&Formatter::for_stdout(), &mut stdout().lock())?;

    Ok(())
}
