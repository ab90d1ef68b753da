// src/repo_status.rs
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use crate::duration::format_duration;
use crate::repo_iter::RepoIter;
use crate::schedule::Schedule;
use crate::status::StatusStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub path: PathBuf,
    pub last_updated: Option<i64>,
    pub due: bool,
    /// Seconds until the cooldown expires; zero when due.
    pub remaining_secs: u64,
}

/// Status of every repository under `root` as of `now`, in walk order.
pub fn collect(
    root: &Path,
    suffix: &str,
    max_depth: Option<usize>,
    schedule: &Schedule,
    status: &StatusStore,
    now: i64,
) -> Vec<RepoStatus> {
    RepoIter::new(root, suffix, max_depth)
        .map(|path| {
            let last_updated = status.last_updated(&path);
            RepoStatus {
                due: schedule.is_due(last_updated, now),
                remaining_secs: schedule.remaining(last_updated, now),
                last_updated,
                path,
            }
        })
        .collect()
}

const SYMBOLS_FANCY: [&str; 3] = ["✓", "🕒", "📁"];
const SYMBOLS_PLAIN: [&str; 3] = ["[OK]", "@", "*"];

fn get_symbols() -> &'static [&'static str; 3] {
    // Explicit overrides first
    if std::env::var("MIRROR_PLAIN_TEXT").is_ok() {
        return &SYMBOLS_PLAIN;
    }
    if std::env::var("MIRROR_FANCY").is_ok() {
        return &SYMBOLS_FANCY;
    }

    if !std::io::stdout().is_terminal() || std::env::var("NO_COLOR").is_ok() {
        return &SYMBOLS_PLAIN;
    }

    if let Ok(term) = std::env::var("TERM") {
        let term = term.to_lowercase();
        if term == "dumb" || term == "vt100" || term.contains("linux") {
            return &SYMBOLS_PLAIN;
        }
    }

    &SYMBOLS_FANCY
}

fn format_local(unix: i64) -> String {
    match Local.timestamp_opt(unix, 0).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => unix.to_string(),
    }
}

/// Writes one line per repository plus a summary.
pub fn print_summary<W: Write>(
    root: &Path,
    statuses: &[RepoStatus],
    out: &mut W,
) -> std::io::Result<()> {
    let [ok, due, folder] = get_symbols();

    writeln!(out, "{} {}", folder, root.display())?;
    for status in statuses {
        let relative = status.path.strip_prefix(root).unwrap_or(&status.path);
        let last = status
            .last_updated
            .map(format_local)
            .unwrap_or_else(|| "never".to_string());
        if status.due {
            writeln!(
                out,
                "  {} {}: last updated {}, due now",
                due,
                relative.display(),
                last
            )?;
        } else {
            writeln!(
                out,
                "  {} {}: last updated {}, due in {}",
                ok,
                relative.display(),
                last,
                format_duration(status.remaining_secs)
            )?;
        }
    }

    let due_count = statuses.iter().filter(|s| s.due).count();
    writeln!(out)?;
    writeln!(
        out,
        "{} repositories, {} due for update",
        statuses.len(),
        due_count
    )
}
