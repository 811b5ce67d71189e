//! Terminal prompter: colored change table, unified diffs and y/n questions.
//!
//! Everything interactive goes to stderr so that `--report-json` output on
//! stdout stays machine-readable.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use flowsync_core::Change;
use flowsync_sync::{render_unified, Prompter};

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "change")]
    change: String,
    #[tabled(rename = "path")]
    path: String,
}

fn colored_label(change: &Change) -> String {
    let label = change.label();
    match change {
        Change::Added { .. } => label.green().to_string(),
        Change::Deleted { .. } => label.red().to_string(),
        Change::Edited { .. } => label.yellow().to_string(),
    }
}

fn print_diff(diff: &str) {
    for line in diff.lines() {
        let line = if line.starts_with("+++") || line.starts_with("---") {
            line.bold()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        eprintln!("{line}");
    }
}

impl Prompter for TerminalPrompter {
    fn show_changes(&self, changes: &[Change], show_diffs: bool) {
        let rows: Vec<ChangeRow> = changes
            .iter()
            .map(|change| ChangeRow {
                change: colored_label(change),
                path: change.path().to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        eprintln!("{table}");

        if !show_diffs {
            return;
        }
        for change in changes {
            if let Change::Edited {
                path,
                before,
                after,
            } = change
            {
                print_diff(&render_unified(path, before, after));
            }
        }
    }

    fn show_conflict(&self, path: &str, live: &str, incoming: &str) {
        eprintln!(
            "{} {}",
            "Conflict:".yellow().bold(),
            format!("{path} changed on both sides").bold()
        );
        print_diff(&render_unified(path, live, incoming));
    }

    fn confirm(&self, message: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{message} {hint} ");
        let _ = io::stderr().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => {
                eprintln!();
                default
            }
            Ok(_) => match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => true,
                "n" | "no" => false,
                _ => default,
            },
        }
    }
}
