// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Report rendering.
//!
//! Render a merged [`Report`] as titled sections of formula names. Sections
//! appear in a fixed order, and names inside each section are sorted, so the
//! output never depends on the order git emitted the changes in.

use crate::{
    formula::FormulaRef,
    report::{Report, Status},
};

use console::style;
use std::io::{Result as IoResult, Write};

/// Section of rendered report.
struct Section {
    status: Status,
    title: &'static str,
    core_only: bool,
}

fn sections() -> [Section; 4] {
    [
        Section {
            status: Status::Added,
            title: "New Formula",
            core_only: false,
        },
        Section {
            status: Status::Modified,
            title: "Updated Formula",
            core_only: false,
        },
        // INVARIANT: Tapped deletions are unlinked, never itemized.
        Section {
            status: Status::Deleted,
            title: "Deleted Formula",
            core_only: true,
        },
        Section {
            status: Status::Renamed,
            title: "Renamed Formula",
            core_only: false,
        },
    ]
}

/// Render report sections.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Formatter {
    width: Option<usize>,
    color: bool,
}

impl Formatter {
    /// Construct new formatter.
    ///
    /// Without a width names are listed one per line.
    pub fn new(width: Option<usize>, color: bool) -> Self {
        Self { width, color }
    }

    /// Construct formatter fitted to stdout.
    ///
    /// Uses terminal width and colour only when stdout is a terminal.
    pub fn for_stdout() -> Self {
        let term = console::Term::stdout();
        if !term.is_term() {
            return Self::new(None, false);
        }

        let width = term.size_checked().map(|(_, cols)| usize::from(cols));
        Self::new(width, console::colors_enabled())
    }

    /// Write every non-empty section of report.
    ///
    /// Copied and unrecognized statuses are never rendered.
    ///
    /// # Errors
    ///
    /// - Return [`std::io::Error`] if writer fails.
    pub fn dump(&self, report: &Report, out: &mut impl Write) -> IoResult<()> {
        for section in sections() {
            let names = select_formula(report, &section);
            if names.is_empty() {
                continue;
            }

            self.ohai(section.title, out)?;
            self.puts_columns(&names, out)?;
        }

        Ok(())
    }

    /// Write section header.
    pub fn ohai(&self, title: &str, out: &mut impl Write) -> IoResult<()> {
        let arrow = style("==>").blue().bold().force_styling(self.color);
        let title = style(title).bold().force_styling(self.color);
        writeln!(out, "{arrow} {title}")
    }

    /// Write names in columns, filled top to bottom, then left to right.
    pub fn puts_columns(&self, names: &[String], out: &mut impl Write) -> IoResult<()> {
        for row in columns(names, self.width) {
            writeln!(out, "{row}")?;
        }

        Ok(())
    }
}

fn select_formula(report: &Report, section: &Section) -> Vec<String> {
    let mut names = report
        .formula(&section.status)
        .filter(|formula| !section.core_only || formula.is_core())
        .map(|formula: FormulaRef| formula.name())
        .collect::<Vec<_>>();
    names.sort();
    names
}

/// Lay out names in rows of columns that fit target width.
///
/// Each column is as wide as the longest name plus two spaces of padding.
/// Trailing padding is trimmed from every row.
pub fn columns(names: &[String], width: Option<usize>) -> Vec<String> {
    let Some(width) = width else {
        return names.to_vec();
    };
    if names.is_empty() {
        return Vec::new();
    }

    let column_width = names.iter().map(|name| name.chars().count()).max().unwrap_or(0) + 2;
    let cols = (width / column_width).clamp(1, names.len());
    let rows = names.len().div_ceil(cols);

    (0..rows)
        .map(|row| {
            let mut line = String::new();
            for name in names.iter().skip(row).step_by(rows) {
                line.push_str(&format!("{name:<column_width$}"));
            }
            line.trim_end().to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn render(report: &Report, width: Option<usize>) -> String {
        let mut out = Vec::new();
        Formatter::new(width, false).dump(report, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn columns_fill_top_to_bottom() {
        let result = columns(&names(&["a", "bb", "c", "d", "e"]), Some(8));
        assert_eq!(result, vec!["a   d", "bb  e", "c"]);
    }

    #[test]
    fn columns_degrade_to_one_per_line() {
        let list = names(&["wget", "git"]);
        assert_eq!(columns(&list, None), list);
        assert_eq!(columns(&list, Some(3)), list);
    }

    #[test]
    fn dump_orders_sections_and_sorts_names() {
        let report: Report = [
            (Status::Modified, "Library/Formula/wget.rb"),
            (Status::Added, "Library/Formula/zsh.rb"),
            (Status::Added, "Library/Taps/user-repo/foo.rb"),
            (Status::Added, "Library/Formula/ack.rb"),
            (Status::Deleted, "Library/Formula/old.rb"),
            (Status::Copied, "Library/Formula/copy.rb"),
            (Status::Other("T".into()), "Library/Formula/type.rb"),
            (Status::Renamed, "Library/Formula/new.rb"),
        ]
        .into_iter()
        .map(|(status, path)| (status, PathBuf::from(path)))
        .collect();

        let expect = indoc! {r#"
            ==> New Formula
            ack
            user/repo/foo
            zsh
            ==> Updated Formula
            wget
            ==> Deleted Formula
            old
            ==> Renamed Formula
            new
        "#};
        assert_eq!(render(&report, None), expect);
    }

    #[test]
    fn dump_skips_tapped_deletions() {
        let report: Report = [
            (Status::Added, "Library/Taps/user-repo/foo.rb"),
            (Status::Deleted, "Library/Taps/user-repo/bar.rb"),
        ]
        .into_iter()
        .map(|(status, path)| (status, PathBuf::from(path)))
        .collect();

        let expect = indoc! {r#"
            ==> New Formula
            user/repo/foo
        "#};
        assert_eq!(render(&report, Some(80)), expect);
    }

    #[test]
    fn dump_of_empty_report_is_empty() {
        assert_eq!(render(&Report::new(), Some(80)), "");
    }
}
