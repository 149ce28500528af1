// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Formula repository update engine.
//!
//! A source-based package manager keeps its formula in a git clone, the
//! __main repository__, plus any number of __taps__. A tap is an independently
//! versioned clone of additional formula living in `Library/Taps/<user>-<repo>`.
//!
//! Updating means pulling every clone from its upstream branch, computing
//! which paths changed between the revision before and after the pull,
//! merging those changes into one [`Report`], fixing up the symlinks that
//! expose tapped formula in `Library/Formula`, and printing a summary of new,
//! updated, deleted, and renamed formula.
//!
//! # See Also
//!
//! 1. [`Updater`]
//! 2. [`Report`]
//! 3. [`TapLinker`]

pub mod command;
pub mod config;
pub mod diff;
pub mod dump;
pub mod formula;
pub mod link;
pub mod path;
pub mod pull;
pub mod report;
pub mod repository;
pub mod update;

pub use command::{CommandRunner, ExecutionError, Invocation, SystemRunner};
pub use config::Config;
pub use diff::diff;
pub use dump::Formatter;
pub use formula::FormulaRef;
pub use link::{Reconciliation, TapLinker};
pub use pull::{pull, Pull, PullOptions};
pub use report::{Report, Status};
pub use repository::{current_revision, RepositoryHandle, Revision};
pub use update::{Outcome, UpdateError, Updater};
