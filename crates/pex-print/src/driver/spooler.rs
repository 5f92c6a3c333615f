// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-independent parts of the Windows spooler driver: SumatraPDF
// lookup and arguments, matching a submitted file to a queued job, and the
// wait for that job to finish spooling. Kept free of Win32 calls so it
// builds and tests everywhere.

#![cfg_attr(not(windows), allow(dead_code))]

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pex_core::error::{PexError, Result};
use pex_core::{Completion, PrintTicket};
use tracing::{info, warn};

use crate::retry::{PollPolicy, poll_until};

/// `JOB_STATUS_SPOOLING` from winspool.h.
pub const JOB_STATUS_SPOOLING: u32 = 0x0008;

const INSTALLED_HELPERS: [&str; 2] = [
    r"C:\Program Files\SumatraPDF\SumatraPDF.exe",
    r"C:\Program Files (x86)\SumatraPDF\SumatraPDF.exe",
];

/// Portable copy shipped next to the application.
const PORTABLE_HELPER: [&str; 2] = ["tools", "sumatra_pdf.exe"];

/// One entry of the printer's job queue (`JOB_INFO_1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: u32,
    pub document: String,
    pub status: u32,
}

impl QueuedJob {
    pub fn is_spooling(&self) -> bool {
        self.status & JOB_STATUS_SPOOLING != 0
    }
}

/// Candidate helper locations in lookup order: the two standard install
/// directories, then `tools/sumatra_pdf.exe` in every ancestor of `exe_dir`
/// and of `cwd`. Duplicates are dropped, keeping the first occurrence.
pub fn helper_candidates(exe_dir: Option<&Path>, cwd: Option<&Path>) -> Vec<PathBuf> {
    let installed = INSTALLED_HELPERS.iter().map(PathBuf::from);
    let portable = [exe_dir, cwd]
        .into_iter()
        .flatten()
        .flat_map(|start| start.ancestors())
        .map(|dir| dir.join(PORTABLE_HELPER[0]).join(PORTABLE_HELPER[1]));

    let mut seen = BTreeSet::new();
    installed
        .chain(portable)
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// First candidate that is an existing file.
pub fn locate_helper(candidates: &[PathBuf]) -> Result<PathBuf> {
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or(PexError::HelperNotFound)
}

/// SumatraPDF command line for one silent print.
pub fn helper_args(ticket: &PrintTicket, file: &Path) -> Vec<OsString> {
    let mut settings = format!("noscale,{}", ticket.orientation.keyword());
    if !ticket.quantity.is_single() {
        settings.push_str(&format!(",copies={}", ticket.quantity));
    }

    vec![
        "-silent".into(),
        "-exit-on-print".into(),
        "-print-to".into(),
        ticket.printer.as_str().into(),
        "-print-settings".into(),
        settings.into(),
        file.as_os_str().to_owned(),
    ]
}

/// The newly submitted job: the first one not in `baseline` whose document
/// name contains `document` (case-insensitive).
pub fn find_new_job(jobs: &[QueuedJob], baseline: &BTreeSet<u32>, document: &str) -> Option<u32> {
    let needle = document.to_lowercase();
    jobs.iter()
        .filter(|job| !baseline.contains(&job.id))
        .find(|job| needle.is_empty() || job.document.to_lowercase().contains(&needle))
        .map(|job| job.id)
}

/// Whether job `id` still needs its input file: it is queued and spooling.
pub fn still_spooling(jobs: &[QueuedJob], id: u32) -> bool {
    jobs.iter()
        .find(|job| job.id == id)
        .is_some_and(QueuedJob::is_spooling)
}

/// Wait for a submitted document to finish spooling. `jobs` lists the
/// printer's queue and is called once per poll.
///
/// The job is first identified against `baseline`, then watched until it
/// leaves the queue or drops the spooling flag. Both phases share one
/// deadline. A job that never shows up is `Untracked`.
pub fn await_spooled(
    printer: &str,
    baseline: &BTreeSet<u32>,
    document: &str,
    poll: &PollPolicy,
    mut jobs: impl FnMut() -> Vec<QueuedJob>,
) -> Completion {
    let deadline = poll.deadline();

    let found = poll_until(deadline, poll.interval, || {
        find_new_job(&jobs(), baseline, document)
    });
    let Some(job_id) = found else {
        warn!(printer, document, "submitted job not found in queue");
        return Completion::Untracked;
    };
    info!(printer, job_id, "job identified");

    let spooled = poll_until(deadline, poll.interval, || {
        (!still_spooling(&jobs(), job_id)).then_some(())
    });
    match spooled {
        Some(()) => {
            info!(printer, job_id, "job finished spooling");
            Completion::Finished
        }
        None => {
            warn!(printer, job_id, "job still spooling at deadline");
            Completion::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pex_core::{CopyStrategy, Orientation, PaperGeometry, Quantity};
    use std::cell::Cell;
    use std::time::Duration;

    fn fast() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(2),
            timeout: Duration::from_millis(80),
        }
    }

    fn ticket(orientation: Orientation, quantity: i64) -> PrintTicket {
        PrintTicket {
            printer: "Zebra GK420d".into(),
            geometry: PaperGeometry::new(62.0, 29.0).unwrap(),
            orientation,
            quantity: Quantity::new(quantity),
            copies: CopyStrategy::default(),
        }
    }

    fn job(id: u32, document: &str, status: u32) -> QueuedJob {
        QueuedJob {
            id,
            document: document.into(),
            status,
        }
    }

    #[test]
    fn candidates_start_with_install_dirs_then_ancestors() {
        let exe = Path::new("/opt/pex/bin");
        let candidates = helper_candidates(Some(exe), Some(Path::new("/opt/pex")));

        assert_eq!(candidates[0], PathBuf::from(INSTALLED_HELPERS[0]));
        assert_eq!(candidates[1], PathBuf::from(INSTALLED_HELPERS[1]));
        assert_eq!(candidates[2], Path::new("/opt/pex/bin/tools/sumatra_pdf.exe"));
        assert_eq!(candidates[3], Path::new("/opt/pex/tools/sumatra_pdf.exe"));

        // cwd ancestors are already covered by the exe dir's ancestors.
        let portable = candidates.len() - INSTALLED_HELPERS.len();
        assert_eq!(portable, exe.ancestors().count());
    }

    #[test]
    fn locate_picks_first_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let helper = dir.path().join("tools").join("sumatra_pdf.exe");
        std::fs::create_dir_all(helper.parent().unwrap()).unwrap();
        std::fs::write(&helper, b"MZ").unwrap();

        let nested = dir.path().join("a").join("b");
        let candidates = helper_candidates(Some(&nested), None);
        assert_eq!(locate_helper(&candidates).unwrap(), helper);
    }

    #[test]
    fn missing_helper_is_reported() {
        let candidates = vec![PathBuf::from("/definitely/not/here/sumatra_pdf.exe")];
        let err = locate_helper(&candidates).unwrap_err();
        assert!(matches!(err, PexError::HelperNotFound));
        assert!(err.to_string().contains("SumatraPDF"));
    }

    #[test]
    fn single_copy_args() {
        let args = helper_args(&ticket(Orientation::Portrait, 1), Path::new("label.pdf"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-silent",
                "-exit-on-print",
                "-print-to",
                "Zebra GK420d",
                "-print-settings",
                "noscale,portrait",
                "label.pdf"
            ]
        );
    }

    #[test]
    fn multiple_copies_are_in_print_settings() {
        let args = helper_args(&ticket(Orientation::Landscape, 3), Path::new("x.pdf"));
        assert_eq!(args[5], OsString::from("noscale,landscape,copies=3"));
    }

    #[test]
    fn new_job_skips_baseline_and_other_documents() {
        let baseline: BTreeSet<u32> = [7].into_iter().collect();
        let jobs = [
            job(7, "pex-label-a.pdf", JOB_STATUS_SPOOLING),
            job(8, "Quarterly report.docx", JOB_STATUS_SPOOLING),
            job(9, "PEX-LABEL-A.PDF", JOB_STATUS_SPOOLING),
        ];
        assert_eq!(find_new_job(&jobs, &baseline, "pex-label-a.pdf"), Some(9));
        assert_eq!(find_new_job(&jobs, &baseline, "other.pdf"), None);
    }

    #[test]
    fn spooling_ends_when_flag_clears_or_job_leaves() {
        let jobs = [job(3, "a.pdf", JOB_STATUS_SPOOLING), job(4, "b.pdf", 0x0010)];
        assert!(still_spooling(&jobs, 3));
        assert!(!still_spooling(&jobs, 4));
        assert!(!still_spooling(&jobs, 5));
    }

    #[test]
    fn job_found_after_a_few_polls_then_finishes() {
        let baseline: BTreeSet<u32> = [1].into_iter().collect();
        let polls = Cell::new(0u32);

        let completion = await_spooled("Zebra", &baseline, "pex-label-a.pdf", &fast(), || {
            polls.set(polls.get() + 1);
            let mut queue = vec![job(1, "old.pdf", JOB_STATUS_SPOOLING)];
            match polls.get() {
                0..=2 => {}
                3..=5 => queue.push(job(2, "pex-label-a.pdf", JOB_STATUS_SPOOLING)),
                _ => queue.push(job(2, "pex-label-a.pdf", 0x0010)),
            }
            queue
        });

        assert_eq!(completion, Completion::Finished);
        assert!(polls.get() >= 6);
    }

    #[test]
    fn job_that_never_appears_is_untracked() {
        let baseline: BTreeSet<u32> = [1].into_iter().collect();
        let completion = await_spooled("Zebra", &baseline, "pex-label-a.pdf", &fast(), || {
            vec![
                job(1, "pex-label-a.pdf", JOB_STATUS_SPOOLING),
                job(3, "someone-else.docx", JOB_STATUS_SPOOLING),
            ]
        });
        assert_eq!(completion, Completion::Untracked);
    }

    #[test]
    fn job_spooling_past_the_deadline_times_out() {
        let baseline = BTreeSet::new();
        let completion = await_spooled("Zebra", &baseline, "pex-label-a.pdf", &fast(), || {
            vec![job(5, "PEX-LABEL-A.PDF", JOB_STATUS_SPOOLING)]
        });
        assert_eq!(completion, Completion::TimedOut);
    }
}
