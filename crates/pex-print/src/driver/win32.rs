// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows spooler driver.
//
// Paper size, orientation and copies are written into the printer's level-2
// device mode, the file is printed silently through SumatraPDF, and the new
// job is found by diffing the queue against a snapshot taken just before
// submission. Job identification is best-effort: a job that cannot be found
// within the deadline is reported as untracked, not as an error.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use pex_core::error::{PexError, Result};
use pex_core::{Completion, JobHandle, PrintTicket};
use tracing::{debug, info, instrument, warn};
use windows::Win32::Graphics::Gdi::{
    DM_COPIES, DM_ORIENTATION, DM_PAPERLENGTH, DM_PAPERSIZE, DM_PAPERWIDTH, DMPAPER_USER,
};
use windows::Win32::Graphics::Printing::{
    ClosePrinter, EnumJobsW, EnumPrintersW, GetPrinterW, JOB_INFO_1W, OpenPrinterW,
    PRINTER_ACCESS_RIGHTS, PRINTER_ALL_ACCESS, PRINTER_DEFAULTSW, PRINTER_ENUM_CONNECTIONS,
    PRINTER_ENUM_LOCAL, PRINTER_HANDLE, PRINTER_INFO_2W, PRINTER_INFO_4W, SetPrinterW,
};
use windows::Win32::Security::PSECURITY_DESCRIPTOR;
use windows::core::{PCWSTR, PWSTR};

use super::spooler::{QueuedJob, await_spooled, helper_args, helper_candidates, locate_helper};
use super::{PrintDriver, sort_printers};
use crate::retry::PollPolicy;

pub struct WindowsDriver {
    poll: PollPolicy,
}

impl WindowsDriver {
    pub fn new() -> Self {
        Self {
            poll: PollPolicy::default(),
        }
    }

    /// Current queue, or empty when the queue cannot be read.
    fn jobs(&self, printer: &str) -> Vec<QueuedJob> {
        list_jobs(printer).unwrap_or_else(|e| {
            debug!(printer, error = %e, "EnumJobsW failed");
            Vec::new()
        })
    }

    fn locate_helper(&self) -> Result<PathBuf> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let cwd = std::env::current_dir().ok();
        locate_helper(&helper_candidates(exe_dir.as_deref(), cwd.as_deref()))
    }
}

impl Default for WindowsDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintDriver for WindowsDriver {
    fn platform_name(&self) -> &str {
        "Windows spooler"
    }

    fn list_printers(&self) -> Vec<String> {
        match enum_printers() {
            Ok(printers) => sort_printers(printers),
            Err(e) => {
                warn!(error = %e, "EnumPrintersW failed");
                Vec::new()
            }
        }
    }

    fn preflight(&self, _ticket: &PrintTicket) -> Result<()> {
        let helper = self.locate_helper()?;
        debug!(helper = %helper.display(), "SumatraPDF found");
        Ok(())
    }

    #[instrument(skip(self, ticket), fields(printer = %ticket.printer, geometry = %ticket.geometry))]
    fn configure(&self, ticket: &PrintTicket) -> Result<()> {
        write_device_mode(ticket).map_err(|detail| PexError::PrinterConfigError {
            printer: ticket.printer.clone(),
            detail,
        })?;
        info!(
            orientation = %ticket.orientation,
            copies = ticket.quantity.get(),
            "device mode updated"
        );
        Ok(())
    }

    #[instrument(skip(self, ticket), fields(printer = %ticket.printer))]
    fn submit(&self, ticket: &PrintTicket, file: &Path) -> Result<JobHandle> {
        let baseline: BTreeSet<u32> = self.jobs(&ticket.printer).iter().map(|j| j.id).collect();
        let helper = self.locate_helper()?;
        debug!(helper = %helper.display(), queued = baseline.len(), "running SumatraPDF");

        let output = Command::new(&helper)
            .args(helper_args(ticket, file))
            .output()
            .map_err(|e| {
                PexError::SubmissionFailed(format!("failed to run {}: {e}", helper.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = [stderr.trim(), stdout.trim()]
                .into_iter()
                .find(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("SumatraPDF exited with {}", output.status));
            return Err(PexError::SubmissionFailed(message));
        }

        let document = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(document = %document, "submitted to spooler");
        Ok(JobHandle::Windows { baseline, document })
    }

    fn await_completion(&self, ticket: &PrintTicket, handle: &JobHandle) -> Completion {
        let JobHandle::Windows { baseline, document } = handle else {
            return Completion::Untracked;
        };
        let printer = ticket.printer.as_str();
        await_spooled(printer, baseline, document, &self.poll, || self.jobs(printer))
    }
}

// -- Win32 plumbing -----------------------------------------------------------

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Closes the printer handle on drop.
struct PrinterGuard(PRINTER_HANDLE);

impl Drop for PrinterGuard {
    fn drop(&mut self) {
        unsafe {
            let _ = ClosePrinter(self.0);
        }
    }
}

/// 8-byte aligned scratch buffer for the variable-length structures the
/// spooler APIs fill in.
struct SpoolBuffer {
    words: Vec<u64>,
    len: usize,
}

impl SpoolBuffer {
    fn new(len: u32) -> Self {
        let len = len as usize;
        Self {
            words: vec![0; len.div_ceil(8)],
            len,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), self.len) }
    }

    fn as_mut_ptr<T>(&mut self) -> *mut T {
        self.words.as_mut_ptr().cast()
    }

    fn as_ptr<T>(&self) -> *const T {
        self.words.as_ptr().cast()
    }
}

fn open_printer(
    name: &str,
    access: Option<PRINTER_ACCESS_RIGHTS>,
) -> windows::core::Result<PrinterGuard> {
    let name_w = to_wide(name);
    let defaults = access.map(|desired| PRINTER_DEFAULTSW {
        pDatatype: PWSTR::null(),
        pDevMode: std::ptr::null_mut(),
        DesiredAccess: desired,
    });
    let mut handle = PRINTER_HANDLE::default();
    unsafe {
        OpenPrinterW(
            PCWSTR::from_raw(name_w.as_ptr()),
            &mut handle,
            defaults.as_ref().map(|d| d as *const PRINTER_DEFAULTSW),
        )?;
    }
    Ok(PrinterGuard(handle))
}

fn pwstr_to_string(value: PWSTR) -> String {
    if value.is_null() {
        return String::new();
    }
    unsafe { value.to_string().unwrap_or_default() }
}

fn enum_printers() -> windows::core::Result<Vec<String>> {
    let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
    let mut needed: u32 = 0;
    let mut returned: u32 = 0;

    unsafe {
        let _ = EnumPrintersW(flags, None, 4, None, &mut needed, &mut returned);
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut buf = SpoolBuffer::new(needed);
        EnumPrintersW(
            flags,
            None,
            4,
            Some(buf.bytes_mut()),
            &mut needed,
            &mut returned,
        )?;

        let infos =
            std::slice::from_raw_parts(buf.as_ptr::<PRINTER_INFO_4W>(), returned as usize);
        Ok(infos
            .iter()
            .map(|info| pwstr_to_string(info.pPrinterName))
            .filter(|name| !name.is_empty())
            .collect())
    }
}

fn list_jobs(printer: &str) -> windows::core::Result<Vec<QueuedJob>> {
    let guard = open_printer(printer, None)?;
    let mut needed: u32 = 0;
    let mut returned: u32 = 0;

    unsafe {
        let _ = EnumJobsW(guard.0, 0, u32::MAX, 1, None, &mut needed, &mut returned);
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut buf = SpoolBuffer::new(needed);
        EnumJobsW(
            guard.0,
            0,
            u32::MAX,
            1,
            Some(buf.bytes_mut()),
            &mut needed,
            &mut returned,
        )?;

        let infos = std::slice::from_raw_parts(buf.as_ptr::<JOB_INFO_1W>(), returned as usize);
        Ok(infos
            .iter()
            .map(|info| QueuedJob {
                id: info.JobId,
                document: pwstr_to_string(info.pDocument),
                status: info.Status,
            })
            .collect())
    }
}

/// Read the level-2 printer info, patch its device mode and write it back.
fn write_device_mode(ticket: &PrintTicket) -> std::result::Result<(), String> {
    let guard = open_printer(&ticket.printer, Some(PRINTER_ALL_ACCESS))
        .map_err(|e| format!("OpenPrinterW failed: {e}"))?;

    let (width, length) = ticket.geometry.tenths_mm();
    let clamp = |v: i64| i16::try_from(v).unwrap_or(i16::MAX);

    unsafe {
        let mut needed: u32 = 0;
        let _ = GetPrinterW(guard.0, 2, None, &mut needed);
        if needed == 0 {
            return Err("GetPrinterW returned no data".into());
        }

        let mut buf = SpoolBuffer::new(needed);
        GetPrinterW(guard.0, 2, Some(buf.bytes_mut()), &mut needed)
            .map_err(|e| format!("GetPrinterW failed: {e}"))?;

        let info = buf.as_mut_ptr::<PRINTER_INFO_2W>();
        let devmode = (*info).pDevMode;
        if devmode.is_null() {
            return Err("printer has no device mode".into());
        }

        let fields = &mut (*devmode).Anonymous1.Anonymous1;
        fields.dmPaperSize = DMPAPER_USER as i16;
        fields.dmPaperWidth = clamp(i64::from(width));
        fields.dmPaperLength = clamp(i64::from(length));
        fields.dmOrientation = ticket.orientation.devmode_value();
        fields.dmCopies = clamp(i64::from(ticket.quantity.get()));
        (*devmode).dmFields |=
            DM_PAPERSIZE | DM_PAPERWIDTH | DM_PAPERLENGTH | DM_ORIENTATION | DM_COPIES;

        // Leave the security descriptor untouched.
        (*info).pSecurityDescriptor = PSECURITY_DESCRIPTOR::default();

        SetPrinterW(guard.0, 2, Some(buf.as_ptr::<u8>()), 0)
            .map_err(|e| format!("SetPrinterW failed: {e}"))?;
    }
    Ok(())
}
