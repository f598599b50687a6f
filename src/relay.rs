//! Staging directory orchestration
//!
//! `SubfolderRunner` delivers one staging directory to every configured
//! destination; `RootRunner` walks the staging directories under a root and
//! keeps going when one of them fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::{parse_destinations, Destination};
use crate::customer::retain_valid_customers;
use crate::eligibility::{CandidateFile, EligibilityFilter, SelectionMode};
use crate::error::RelayError;
use crate::lifecycle;
use crate::outcome::OutcomeReconciler;
use crate::protocols::{Transport, TransportFactory};
use crate::upload::upload;
use crate::{CONFIG_FILE_NAME, DEFAULT_DELAY_SECS, QUARANTINE_DIR};

/// Run-wide switches, built once from the command line
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Treat the root itself as the only staging directory
    pub search_root: bool,
    /// Check the embedded customer against every destination's allowlist
    pub validate_customer: bool,
    /// Archive delivered files into `transferred/`; delete them when unset
    pub backup: bool,
    pub selection: SelectionMode,
    pub delay: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        RelayOptions {
            search_root: false,
            validate_customer: true,
            backup: true,
            selection: SelectionMode::Strict,
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
        }
    }
}

/// One staging directory to process in this run
#[derive(Debug, Clone)]
pub struct SubfolderJob {
    pub dir: PathBuf,
    pub config_path: PathBuf,
}

impl SubfolderJob {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let config_path = dir.join(CONFIG_FILE_NAME);
        SubfolderJob { dir, config_path }
    }
}

/// Why a directory produced no transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoConfig,
    NoCandidates,
}

/// What happened to one staging directory
#[derive(Debug, Default)]
pub struct DirectoryReport {
    pub dir: PathBuf,
    pub skipped: Option<SkipReason>,
    pub candidates: usize,
    pub destinations: usize,
    /// Successful uploads, summed over destinations
    pub forwarded: usize,
    pub quarantined: Vec<PathBuf>,
    /// Files the archive-or-remove step ran for
    pub post_actions: Vec<PathBuf>,
    pub outcomes: OutcomeReconciler,
    pub elapsed: Duration,
}

impl DirectoryReport {
    fn new(dir: &Path) -> Self {
        DirectoryReport {
            dir: dir.to_path_buf(),
            ..DirectoryReport::default()
        }
    }

    fn skipped(dir: &Path, reason: SkipReason) -> Self {
        DirectoryReport {
            skipped: Some(reason),
            ..DirectoryReport::new(dir)
        }
    }
}

/// Delivers one staging directory to all of its destinations
pub struct SubfolderRunner<'a> {
    options: &'a RelayOptions,
    factory: &'a dyn TransportFactory,
}

impl<'a> SubfolderRunner<'a> {
    pub fn new(options: &'a RelayOptions, factory: &'a dyn TransportFactory) -> Self {
        SubfolderRunner { options, factory }
    }

    /// Processes `job`: load config, pick candidates, deliver, reconcile
    ///
    /// # Returns
    /// A report, marked skipped when there is no `.config.ini` or nothing
    /// eligible to send.
    ///
    /// # Errors
    /// Directory-level failures: unreadable configuration or directory,
    /// a destination session that cannot be opened or closed, or a file
    /// that cannot be quarantined. Destinations after the failing one are
    /// not processed. Files that failed anywhere are quarantined once the
    /// destination loop ends, aborted or not, unless the last destination
    /// already archived or removed them.
    pub fn run(&self, job: &SubfolderJob) -> Result<DirectoryReport, RelayError> {
        info!(dir = %job.dir.display(), "Processing forwarding directory");

        if !job.config_path.exists() {
            warn!(dir = %job.dir.display(), "Forward folder doesn't contain a {} as expected", CONFIG_FILE_NAME);
            return Ok(DirectoryReport::skipped(&job.dir, SkipReason::NoConfig));
        }
        let destinations = parse_destinations(&job.config_path)?;

        let candidates = self.select_candidates(job, &destinations)?;
        if candidates.is_empty() {
            info!(dir = %job.dir.display(), "No files need transfer");
            return Ok(DirectoryReport::skipped(&job.dir, SkipReason::NoCandidates));
        }

        let labels: Vec<&str> = destinations.iter().map(|d| d.label.as_str()).collect();
        info!(count = destinations.len(), destinations = ?labels, "Found FTP/SFTP connection info");

        let started = Instant::now();
        let mut report = DirectoryReport::new(&job.dir);
        report.candidates = candidates.len();
        report.destinations = destinations.len();

        let result = self.deliver(job, &destinations, &candidates, &mut report);

        report.elapsed = started.elapsed();
        log_report(&report);
        result.map(|()| report)
    }

    fn select_candidates(
        &self,
        job: &SubfolderJob,
        destinations: &[Destination],
    ) -> Result<Vec<CandidateFile>, RelayError> {
        let filter = EligibilityFilter::new(self.options.selection, self.options.delay);
        let mut candidates = filter.candidates(&job.dir).map_err(|source| RelayError::Scan {
            dir: job.dir.clone(),
            source,
        })?;

        if self.options.validate_customer {
            let allowlists: Vec<(&str, &[String])> = destinations
                .iter()
                .map(|d| (d.label.as_str(), d.customers.as_slice()))
                .collect();
            retain_valid_customers(&mut candidates, &allowlists);
        }
        Ok(candidates)
    }

    fn deliver(
        &self,
        job: &SubfolderJob,
        destinations: &[Destination],
        candidates: &[CandidateFile],
        report: &mut DirectoryReport,
    ) -> Result<(), RelayError> {
        // Failed files stay in place until every destination has had its
        // turn; later destinations still read them from the staging dir.
        let mut failed: Vec<PathBuf> = Vec::new();
        let delivered = self.deliver_all(destinations, candidates, &mut failed, report);
        let settled = settle_failures(&failed, &job.dir, report);
        match (delivered, settled) {
            (Err(e), Err(settle_err)) => {
                error!(dir = %job.dir.display(), error = %settle_err, "Unable to quarantine failed files");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn deliver_all(
        &self,
        destinations: &[Destination],
        candidates: &[CandidateFile],
        failed: &mut Vec<PathBuf>,
        report: &mut DirectoryReport,
    ) -> Result<(), RelayError> {
        for (idx, dest) in destinations.iter().enumerate() {
            // Only the last destination's outcome decides archive/remove.
            let is_last = idx + 1 == destinations.len();
            report.outcomes.track(&dest.label);

            let mut transport = self.factory.create(dest)?;
            transport.open().map_err(|source| RelayError::Transport {
                destination: dest.label.clone(),
                source,
            })?;

            let delivered =
                self.deliver_to(dest, transport.as_mut(), candidates, is_last, failed, report);
            let closed = transport.close().map_err(|source| RelayError::Transport {
                destination: dest.label.clone(),
                source,
            });
            match (delivered, closed) {
                (Err(e), Err(close_err)) => {
                    error!(destination = %dest.label, error = %close_err, "Exception closing connection");
                    return Err(e);
                }
                (Err(e), Ok(())) | (Ok(()), Err(e)) => return Err(e),
                (Ok(()), Ok(())) => {}
            }
        }
        Ok(())
    }

    fn deliver_to(
        &self,
        dest: &Destination,
        transport: &mut dyn Transport,
        candidates: &[CandidateFile],
        is_last: bool,
        failed: &mut Vec<PathBuf>,
        report: &mut DirectoryReport,
    ) -> Result<(), RelayError> {
        for candidate in candidates {
            let file = candidate.path.as_path();
            info!(file = %file.display(), destination = %dest.label, "Forwarding file");
            report.outcomes.record_attempt(&dest.label, file);

            if !upload(file, transport) {
                if !failed.iter().any(|f| f == file) {
                    failed.push(file.to_path_buf());
                }
                continue;
            }

            report.forwarded += 1;
            report.outcomes.record_success(&dest.label, file);
            if is_last {
                self.post_action(file, report)?;
            }
        }
        Ok(())
    }

    fn post_action(&self, file: &Path, report: &mut DirectoryReport) -> Result<(), RelayError> {
        report.post_actions.push(file.to_path_buf());
        if !self.options.backup {
            lifecycle::remove(file);
            return Ok(());
        }
        if let Err(e) = lifecycle::archive(file, &report.dir) {
            error!(file = %file.display(), error = %e, "Unable to move file for backup");
            let dir = report.dir.clone();
            quarantine(file, &dir, report)?;
        }
        Ok(())
    }
}

/// Quarantines files that failed somewhere and were not post-actioned at
/// the last destination
fn settle_failures(failed: &[PathBuf], dir: &Path, report: &mut DirectoryReport) -> Result<(), RelayError> {
    for file in failed {
        if report.post_actions.contains(file) {
            continue;
        }
        quarantine(file, dir, report)?;
    }
    Ok(())
}

fn quarantine(file: &Path, dir: &Path, report: &mut DirectoryReport) -> Result<(), RelayError> {
    let moved = lifecycle::quarantine(file, dir).map_err(|source| RelayError::Lifecycle {
        operation: "quarantine",
        path: file.to_path_buf(),
        source,
    })?;
    if moved.is_some() {
        report.quarantined.push(file.to_path_buf());
    }
    Ok(())
}

fn log_report(report: &DirectoryReport) {
    let quarantined: Vec<String> = report
        .quarantined
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    info!(dir = %report.dir.display(), elapsed = ?report.elapsed, "Processing completed");
    info!(count = quarantined.len(), files = ?quarantined, "Files sent to quarantine");
    report
        .outcomes
        .log_summary(report.candidates, report.destinations);
}

/// Totals over one pass of the root directory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs every staging directory under a root, isolating failures
pub struct RootRunner<'a> {
    options: &'a RelayOptions,
    factory: &'a dyn TransportFactory,
}

impl<'a> RootRunner<'a> {
    pub fn new(options: &'a RelayOptions, factory: &'a dyn TransportFactory) -> Self {
        RootRunner { options, factory }
    }

    /// Processes the staging directories under `root`
    ///
    /// In search-root mode `root` itself is the only staging directory.
    /// Sub-directories whose name ends with the quarantine marker are
    /// skipped. A failing directory is logged and counted; the loop
    /// continues with the next one.
    pub fn run(&self, root: &Path) -> RunSummary {
        let mut summary = RunSummary::default();
        let root = match fs::canonicalize(root) {
            Ok(root) => root,
            Err(e) => {
                error!(root = %root.display(), error = %e, "Root directory does not exist");
                return summary;
            }
        };

        let dirs = match self.staging_dirs(&root) {
            Ok(dirs) => dirs,
            Err(e) => {
                error!(root = %root.display(), error = %e, "Cannot list root directory");
                return summary;
            }
        };

        let runner = SubfolderRunner::new(self.options, self.factory);
        for dir in dirs {
            let job = SubfolderJob::new(dir);
            match runner.run(&job) {
                Ok(report) if report.skipped.is_some() => summary.skipped += 1,
                Ok(_) => summary.processed += 1,
                Err(e) => {
                    error!(dir = %job.dir.display(), error = %e, "Exception processing under folder");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    fn staging_dirs(&self, root: &Path) -> std::io::Result<Vec<PathBuf>> {
        if self.options.search_root {
            return Ok(vec![root.to_path_buf()]);
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(QUARANTINE_DIR) {
                continue;
            }
            dirs.push(entry.path());
        }
        dirs.sort();
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::tests::write_data_file;
    use crate::protocols::mock::{MockFactory, MockRemote};
    use std::fs;
    use tempfile::tempdir;

    fn section(label: &str, customers: &str) -> String {
        format!(
            "[{}]\nmode = FTP\nuser = loader\npasswd = pw\nhost = 127.0.0.1\noutdir = /in\ncustomer = {}\n\n",
            label, customers
        )
    }

    fn staging(dir: &Path, sections: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        let config: String = sections.iter().map(|(l, c)| section(l, c)).collect();
        fs::write(dir.join(CONFIG_FILE_NAME), config).unwrap();
    }

    fn options(backup: bool) -> RelayOptions {
        RelayOptions {
            backup,
            delay: Duration::ZERO,
            ..RelayOptions::default()
        }
    }

    #[test]
    fn test_missing_config_skips_directory() {
        let dir = tempdir().unwrap();
        write_data_file(&dir.path().join("a.dat"), "ACME");
        let opts = options(true);
        let factory = MockFactory::default();

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        assert_eq!(report.skipped, Some(SkipReason::NoConfig));
        assert!(dir.path().join("a.dat").exists());
    }

    #[test]
    fn test_successful_delivery_archives_after_last_destination() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        write_data_file(&dir.path().join("a.dat"), "ACME");
        let a = MockRemote::with_entries(&[]);
        let b = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a.clone()).with("B", b.clone());
        let opts = options(true);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();

        assert_eq!(report.forwarded, 2);
        assert_eq!(report.post_actions, vec![dir.path().join("a.dat")]);
        assert!(dir.path().join("transferred/a.dat").exists());
        assert!(!dir.path().join("a.dat").exists());
        assert!(a.borrow().entries.contains("a.dat"));
        assert!(b.borrow().entries.contains("a.dat"));
        assert_eq!(a.borrow().calls.last().unwrap(), "close");
        assert_eq!(b.borrow().calls.last().unwrap(), "close");
    }

    #[test]
    fn test_remove_mode_deletes_delivered_file() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME")]);
        write_data_file(&dir.path().join("a.dat"), "ACME");
        let factory = MockFactory::default();
        let opts = options(false);

        SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        assert!(!dir.path().join("a.dat").exists());
        assert!(!dir.path().join("transferred").exists());
    }

    #[test]
    fn test_post_action_follows_last_destination_only() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        let file = dir.path().join("a.dat");
        write_data_file(&file, "ACME");

        let a = MockRemote::with_entries(&[]);
        a.borrow_mut().fail_store = true;
        let b = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a).with("B", b.clone());
        let opts = options(true);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();

        // A failed, B (last) still read the file from staging and fired the
        // post-action; A's miss is only reported.
        assert!(b.borrow().entries.contains("a.dat"));
        assert_eq!(b.borrow().stored, vec![(file.clone(), true)]);
        assert_eq!(report.post_actions, vec![file.clone()]);
        assert_eq!(report.outcomes.shortfall("A"), vec![file.clone()]);
        assert!(report.outcomes.shortfall("B").is_empty());
        assert_eq!(report.forwarded, 1);
        assert!(report.quarantined.is_empty());

        // Exactly one terminal location
        assert!(dir.path().join("transferred/a.dat").exists());
        assert!(!dir.path().join("quarantined/a.dat").exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_post_action_removes_after_earlier_failure() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        let file = dir.path().join("a.dat");
        write_data_file(&file, "ACME");

        let a = MockRemote::with_entries(&[]);
        a.borrow_mut().fail_rename = true;
        let factory = MockFactory::default().with("A", a);
        let opts = options(false);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        assert_eq!(report.post_actions, vec![file.clone()]);
        assert!(report.quarantined.is_empty());
        assert!(!file.exists());
        assert!(!dir.path().join("quarantined/a.dat").exists());
    }

    #[test]
    fn test_failed_file_is_quarantined_once_after_all_destinations() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME"), ("C", "ACME")]);
        let file = dir.path().join("a.dat");
        write_data_file(&file, "ACME");

        let a = MockRemote::with_entries(&[]);
        a.borrow_mut().fail_store = true;
        let b = MockRemote::with_entries(&[]);
        let c = MockRemote::with_entries(&[]);
        c.borrow_mut().fail_store = true;
        let factory = MockFactory::default()
            .with("A", a)
            .with("B", b.clone())
            .with("C", c);
        let opts = options(true);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        // B, in the middle, still got the file
        assert!(b.borrow().entries.contains("a.dat"));
        assert!(report.post_actions.is_empty());
        assert_eq!(report.quarantined, vec![file.clone()]);
        assert!(dir.path().join("quarantined/a.dat").exists());
        assert!(!dir.path().join("transferred/a.dat").exists());
    }

    #[test]
    fn test_aborted_directory_still_quarantines_earlier_failures() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        let file = dir.path().join("a.dat");
        write_data_file(&file, "ACME");

        let a = MockRemote::with_entries(&[]);
        a.borrow_mut().fail_store = true;
        let b = MockRemote::with_entries(&[]);
        b.borrow_mut().fail_open = true;
        let factory = MockFactory::default().with("A", a).with("B", b);
        let opts = options(true);

        let result = SubfolderRunner::new(&opts, &factory).run(&SubfolderJob::new(dir.path()));
        assert!(matches!(result, Err(RelayError::Transport { .. })));
        assert!(dir.path().join("quarantined/a.dat").exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_quarantine_counts_only_files_that_moved() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.dat");
        fs::write(&file, b"x").unwrap();
        let mut report = DirectoryReport::new(dir.path());

        quarantine(&file, dir.path(), &mut report).unwrap();
        // Second call finds nothing left to move
        quarantine(&file, dir.path(), &mut report).unwrap();
        assert_eq!(report.quarantined, vec![file]);
    }

    #[test]
    fn test_failure_at_last_destination_skips_post_action() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        let file = dir.path().join("a.dat");
        write_data_file(&file, "ACME");

        let a = MockRemote::with_entries(&[]);
        let b = MockRemote::with_entries(&[]);
        b.borrow_mut().fail_rename = true;
        let factory = MockFactory::default().with("A", a.clone()).with("B", b);
        let opts = options(true);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        assert!(a.borrow().entries.contains("a.dat"));
        assert!(report.post_actions.is_empty());
        assert_eq!(report.outcomes.shortfall("B"), vec![file]);
        assert!(dir.path().join("quarantined/a.dat").exists());
    }

    #[test]
    fn test_customer_mismatch_is_skipped_not_quarantined() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME, GLOBEX"), ("B", "ACME")]);
        write_data_file(&dir.path().join("good.dat"), "ACME");
        write_data_file(&dir.path().join("other.dat"), "GLOBEX");
        fs::write(dir.path().join("junk.dat"), b"not a zip").unwrap();
        let a = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a.clone());
        let opts = options(true);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        assert_eq!(report.candidates, 1);
        assert!(a.borrow().entries.contains("good.dat"));
        assert!(!a.borrow().entries.contains("other.dat"));
        assert!(dir.path().join("other.dat").exists());
        assert!(dir.path().join("junk.dat").exists());
        assert!(report.quarantined.is_empty());
    }

    #[test]
    fn test_no_validate_customer_sends_everything() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME")]);
        fs::write(dir.path().join("junk.dat"), b"not a zip").unwrap();
        let a = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a.clone());
        let opts = RelayOptions {
            validate_customer: false,
            ..options(true)
        };

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        assert_eq!(report.forwarded, 1);
        assert!(a.borrow().entries.contains("junk.dat"));
    }

    #[test]
    fn test_open_failure_aborts_remaining_destinations() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        write_data_file(&dir.path().join("a.dat"), "ACME");
        let a = MockRemote::with_entries(&[]);
        a.borrow_mut().fail_open = true;
        let b = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a).with("B", b.clone());
        let opts = options(true);

        let err = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap_err();
        assert!(matches!(err, RelayError::Transport { ref destination, .. } if destination == "A"));
        assert!(b.borrow().calls.is_empty());
        assert!(dir.path().join("a.dat").exists());
    }

    #[test]
    fn test_close_failure_is_directory_error() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME")]);
        write_data_file(&dir.path().join("a.dat"), "ACME");
        let a = MockRemote::with_entries(&[]);
        a.borrow_mut().fail_close = true;
        let factory = MockFactory::default().with("A", a);
        let opts = options(true);

        let result = SubfolderRunner::new(&opts, &factory).run(&SubfolderJob::new(dir.path()));
        assert!(matches!(result, Err(RelayError::Transport { .. })));
    }

    #[test]
    fn test_bad_config_is_directory_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[A]\nmode = FTP\n").unwrap();
        let factory = MockFactory::default();
        let opts = options(true);

        let result = SubfolderRunner::new(&opts, &factory).run(&SubfolderJob::new(dir.path()));
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_candidate_list_is_shared_across_destinations() {
        let dir = tempdir().unwrap();
        staging(dir.path(), &[("A", "ACME"), ("B", "ACME")]);
        for name in ["a.dat", "b.dat"] {
            write_data_file(&dir.path().join(name), "ACME");
        }
        let a = MockRemote::with_entries(&[]);
        let b = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a).with("B", b);
        let opts = options(true);

        let report = SubfolderRunner::new(&opts, &factory)
            .run(&SubfolderJob::new(dir.path()))
            .unwrap();
        let expected = vec![dir.path().join("a.dat"), dir.path().join("b.dat")];
        assert_eq!(report.outcomes.outcome("A").unwrap().attempted, expected);
        assert_eq!(report.outcomes.outcome("B").unwrap().attempted, expected);
        assert_eq!(report.forwarded, 4);
    }

    #[test]
    fn test_root_runner_isolates_failures_and_skips_quarantine() {
        let root = tempdir().unwrap();
        let bad = root.path().join("a-bad");
        let good = root.path().join("b-good");
        staging(&bad, &[("BAD", "ACME")]);
        staging(&good, &[("GOOD", "ACME")]);
        write_data_file(&bad.join("x.dat"), "ACME");
        write_data_file(&good.join("y.dat"), "ACME");
        staging(&root.path().join("old_quarantined"), &[("GOOD", "ACME")]);
        write_data_file(&root.path().join("old_quarantined/z.dat"), "ACME");
        fs::create_dir(root.path().join("c-empty")).unwrap();

        let failing = MockRemote::with_entries(&[]);
        failing.borrow_mut().fail_open = true;
        let remote = MockRemote::with_entries(&[]);
        let factory = MockFactory::default()
            .with("BAD", failing)
            .with("GOOD", remote.clone());
        let opts = options(true);

        let summary = RootRunner::new(&opts, &factory).run(root.path());
        assert_eq!(
            summary,
            RunSummary {
                processed: 1,
                skipped: 1,
                failed: 1
            }
        );
        let remote = remote.borrow();
        assert!(remote.entries.contains("y.dat"));
        assert!(!remote.entries.contains("z.dat"));
        assert!(root.path().join("old_quarantined/z.dat").exists());
    }

    #[test]
    fn test_search_root_uses_root_itself() {
        let root = tempdir().unwrap();
        staging(root.path(), &[("A", "ACME")]);
        write_data_file(&root.path().join("a.dat"), "ACME");
        staging(&root.path().join("child"), &[("A", "ACME")]);
        write_data_file(&root.path().join("child/b.dat"), "ACME");
        let a = MockRemote::with_entries(&[]);
        let factory = MockFactory::default().with("A", a.clone());
        let opts = RelayOptions {
            search_root: true,
            ..options(true)
        };

        let summary = RootRunner::new(&opts, &factory).run(root.path());
        assert_eq!(summary.processed, 1);
        assert!(a.borrow().entries.contains("a.dat"));
        assert!(!a.borrow().entries.contains("b.dat"));
    }

    #[test]
    fn test_missing_root_is_logged_not_fatal() {
        let root = tempdir().unwrap();
        let opts = options(true);
        let factory = MockFactory::default();
        let summary = RootRunner::new(&opts, &factory).run(&root.path().join("nope"));
        assert_eq!(summary, RunSummary::default());
    }
}
