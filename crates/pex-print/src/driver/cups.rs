// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CUPS driver.
//
// Jobs are submitted with `lp`, whose stdout carries the request ID
// (`request id is Zebra-42 (1 file(s))`). The IDs are then polled with
// `lpstat -W not-completed -o <printer>` until they leave the queue. Paper
// size and orientation are left to the PPD defaults; CUPS has no device-mode
// equivalent to configure up front.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use pex_core::error::{PexError, Result};
use pex_core::{Completion, CopyStrategy, JobHandle, PrintTicket};
use tracing::{debug, info, instrument, warn};

use super::{PrintDriver, sort_printers};
use crate::retry::{PollPolicy, poll_until};

const REQUEST_ID_MARKER: &str = "request id is ";

/// Delay used when `lp` printed no request ID to track.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

pub struct CupsDriver {
    poll: PollPolicy,
    settle: Duration,
    lp: PathBuf,
    lpstat: PathBuf,
}

impl CupsDriver {
    pub fn new() -> Self {
        Self {
            poll: PollPolicy::default(),
            settle: SETTLE_DELAY,
            lp: PathBuf::from("lp"),
            lpstat: PathBuf::from("lpstat"),
        }
    }

    /// Use different `lp` / `lpstat` executables.
    pub fn with_programs(mut self, lp: impl Into<PathBuf>, lpstat: impl Into<PathBuf>) -> Self {
        self.lp = lp.into();
        self.lpstat = lpstat.into();
        self
    }

    pub fn with_timing(mut self, poll: PollPolicy, settle: Duration) -> Self {
        self.poll = poll;
        self.settle = settle;
        self
    }

    fn run_lp(&self, args: &[OsString]) -> Result<Output> {
        let output = Command::new(&self.lp).args(args).output().map_err(|e| {
            PexError::SubmissionFailed(format!("failed to run {}: {e}", self.lp.display()))
        })?;

        if !output.status.success() {
            return Err(PexError::SubmissionFailed(failure_message(&output)));
        }
        Ok(output)
    }

    /// Whether any of `ids` is still listed as not completed.
    fn any_pending(&self, printer: &str, ids: &[String]) -> bool {
        match Command::new(&self.lpstat)
            .args(["-W", "not-completed", "-o", printer])
            .output()
        {
            Ok(output) => lists_any(&String::from_utf8_lossy(&output.stdout), ids),
            Err(e) => {
                debug!(error = %e, "lpstat failed while polling");
                false
            }
        }
    }
}

impl Default for CupsDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintDriver for CupsDriver {
    fn platform_name(&self) -> &str {
        "CUPS"
    }

    fn list_printers(&self) -> Vec<String> {
        match Command::new(&self.lpstat).arg("-e").output() {
            Ok(output) if output.status.success() => {
                sort_printers(parse_printer_list(&String::from_utf8_lossy(&output.stdout)))
            }
            Ok(output) => {
                warn!(status = %output.status, "lpstat -e failed");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "could not run lpstat");
                Vec::new()
            }
        }
    }

    fn configure(&self, ticket: &PrintTicket) -> Result<()> {
        debug!(printer = %ticket.printer, "CUPS takes job options per submission");
        Ok(())
    }

    #[instrument(skip(self, ticket), fields(printer = %ticket.printer, copies = ticket.quantity.get()))]
    fn submit(&self, ticket: &PrintTicket, file: &Path) -> Result<JobHandle> {
        let mut request_ids = Vec::new();

        for args in build_lp_commands(ticket.copies, &ticket.printer, ticket.quantity.get(), file) {
            let output = self.run_lp(&args)?;
            match parse_request_id(&String::from_utf8_lossy(&output.stdout)) {
                Some(id) => request_ids.push(id),
                None => debug!("lp printed no request id"),
            }
        }

        info!(ids = ?request_ids, "submitted to CUPS");
        if request_ids.is_empty() {
            Ok(JobHandle::Untracked)
        } else {
            Ok(JobHandle::Cups { request_ids })
        }
    }

    fn await_completion(&self, ticket: &PrintTicket, handle: &JobHandle) -> Completion {
        let ids = match handle {
            JobHandle::Cups { request_ids } if !request_ids.is_empty() => request_ids,
            _ => {
                debug!(settle_ms = self.settle.as_millis() as u64, "no request id, settling");
                thread::sleep(self.settle);
                return Completion::Untracked;
            }
        };

        let done = poll_until(self.poll.deadline(), self.poll.interval, || {
            (!self.any_pending(&ticket.printer, ids)).then_some(())
        });

        match done {
            Some(()) => {
                info!(printer = %ticket.printer, "job left the CUPS queue");
                Completion::Finished
            }
            None => {
                warn!(printer = %ticket.printer, ids = ?ids, "job still queued at deadline");
                Completion::TimedOut
            }
        }
    }
}

/// `lp` argument lists for one submission. Quantity 1 always uses the plain
/// form; otherwise the copy strategy decides between `-n`, `-o copies=` and
/// one invocation per copy.
pub fn build_lp_commands(
    strategy: CopyStrategy,
    printer: &str,
    quantity: u32,
    file: &Path,
) -> Vec<Vec<OsString>> {
    let plain = || -> Vec<OsString> {
        vec!["-d".into(), printer.into(), file.as_os_str().to_owned()]
    };

    if quantity <= 1 {
        return vec![plain()];
    }

    match strategy {
        CopyStrategy::CountFlag => vec![vec![
            "-d".into(),
            printer.into(),
            "-n".into(),
            quantity.to_string().into(),
            file.as_os_str().to_owned(),
        ]],
        CopyStrategy::CopiesOption => vec![vec![
            "-d".into(),
            printer.into(),
            "-o".into(),
            format!("copies={quantity}").into(),
            "-o".into(),
            "Collate=true".into(),
            file.as_os_str().to_owned(),
        ]],
        CopyStrategy::Loop => (0..quantity).map(|_| plain()).collect(),
    }
}

/// Extract `<queue>-<number>` from `lp` output.
pub fn parse_request_id(stdout: &str) -> Option<String> {
    let start = stdout.find(REQUEST_ID_MARKER)? + REQUEST_ID_MARKER.len();
    let token = stdout[start..].split_whitespace().next()?;

    // The queue name may itself contain dashes; the job number follows the
    // last dash that is followed by digits.
    token.char_indices().rev().find_map(|(idx, c)| {
        if c != '-' || idx == 0 {
            return None;
        }
        let digits = token[idx + 1..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        (digits > 0).then(|| token[..idx + 1 + digits].to_string())
    })
}

/// Whether `lpstat -o` output lists one of `ids`. The request ID is the
/// first column; `Zebra-4` must not match a queued `Zebra-42`.
pub fn lists_any(stdout: &str, ids: &[String]) -> bool {
    stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .any(|queued| ids.iter().any(|id| id == queued))
}

/// One printer per non-empty line of `lpstat -e`.
pub fn parse_printer_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// stderr, else stdout, else a generic message.
fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("The lp command failed.")
        .to_string()
}
