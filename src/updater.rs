//! One pass over the mirror tree: update whatever is due, record what worked.

use std::io::Write;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use tracing::{debug, error, info};

use crate::command::{CommandLine, CommandRunner};
use crate::config::Config;
use crate::duration::format_duration;
use crate::error::{Error, Result};
use crate::repo_iter::RepoIter;
use crate::schedule::{Clock, Pacer, Schedule};
use crate::status::{StatusGuard, StatusStore};

/// Tally of a single run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub updated: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub skipped: usize,
    pub elapsed_secs: u64,
}

pub struct Updater<'a> {
    root: PathBuf,
    suffix: String,
    max_depth: Option<usize>,
    schedule: Schedule,
    command: CommandLine,
    runner: &'a dyn CommandRunner,
    clock: &'a dyn Clock,
}

impl<'a> Updater<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        schedule: Schedule,
        command: CommandLine,
        runner: &'a dyn CommandRunner,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            root: root.into(),
            suffix: crate::repo_iter::GIT_SUFFIX.to_string(),
            max_depth: None,
            schedule,
            command,
            runner,
            clock,
        }
    }

    pub fn repo_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Walks the tree and updates each due repository, recording successes in
    /// `status`. Failed updates are reported and skipped.
    pub fn run<W: Write>(&self, status: &mut StatusStore, out: &mut W) -> Result<RunReport> {
        let started = self.clock.now();
        writeln!(out, "===> Started {}", format_timestamp(started)).map_err(Error::Output)?;

        let mut report = RunReport::default();
        let mut pacer = Pacer::new(self.schedule.delay);

        for repo in RepoIter::new(&self.root, &self.suffix, self.max_depth) {
            if !self.schedule.is_due(status.last_updated(&repo), started) {
                report.skipped += 1;
                continue;
            }

            pacer.wait(self.clock);

            let relative = repo.strip_prefix(&self.root).unwrap_or(&repo);
            writeln!(out, "===> {}", relative.display()).map_err(Error::Output)?;
            out.flush().map_err(Error::Output)?;

            match self.runner.run(&self.command.invocation(&repo)) {
                Ok(_) => {
                    status.record(&repo, self.clock.now());
                    report.updated.push(repo);
                }
                Err(e) => {
                    error!("updating {} failed: {e}", repo.display());
                    writeln!(out, "===> Error updating {}", repo.display())
                        .map_err(Error::Output)?;
                    report.failed.push(repo);
                }
            }
        }

        let finished = self.clock.now();
        report.elapsed_secs = u64::try_from(finished.saturating_sub(started)).unwrap_or(0);
        writeln!(out, "===> Finished in {}", format_duration(report.elapsed_secs))
            .map_err(Error::Output)?;

        Ok(report)
    }
}

/// `2024-03-01 12:00:00 +0000`
pub fn format_timestamp(unix: i64) -> String {
    match Utc.timestamp_opt(unix, 0).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        None => unix.to_string(),
    }
}

/// Runs one full update pass as configured, loading the status file first and
/// writing it back afterwards, even when the pass itself fails.
pub fn run_update<W: Write>(
    config: &Config,
    runner: &dyn CommandRunner,
    clock: &dyn Clock,
    out: &mut W,
) -> Result<RunReport> {
    let root = config.resolve_root()?;
    let mut status = StatusGuard::open(config.resolve_status_file(&root))?;
    debug!(
        "loaded {} entries from {}",
        status.len(),
        status.path().display()
    );

    let updater = Updater::new(
        root,
        config.schedule(),
        config.update_command.clone(),
        runner,
        clock,
    )
    .repo_suffix(config.repo_suffix.clone())
    .max_depth(config.max_depth);

    let outcome = updater.run(&mut status, out);
    let persisted = status.persist();

    let report = outcome?;
    persisted?;

    info!(
        updated = report.updated.len(),
        failed = report.failed.len(),
        skipped = report.skipped,
        "run finished in {}s",
        report.elapsed_secs
    );
    Ok(report)
}
