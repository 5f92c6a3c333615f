// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform print drivers.
//
// The Windows spooler and CUPS expose very different job models; both are
// hidden behind `PrintDriver` so the dispatcher sees one configure -> submit
// -> wait sequence. `platform_driver()` picks the implementation at compile
// time.

pub mod cups;
pub mod spooler;

#[cfg(windows)]
pub mod win32;

use std::path::Path;

use pex_core::error::Result;
use pex_core::{Completion, JobHandle, PrintTicket};

/// One OS printing backend.
pub trait PrintDriver: Send + Sync {
    /// Short backend name, e.g. "CUPS" or "Windows spooler".
    fn platform_name(&self) -> &str;

    /// Installed printers, sorted case-insensitively. Enumeration failures
    /// are logged and yield an empty list.
    fn list_printers(&self) -> Vec<String>;

    /// Check that everything `submit` needs is available, before `configure`
    /// touches any printer state.
    fn preflight(&self, _ticket: &PrintTicket) -> Result<()> {
        Ok(())
    }

    /// Apply paper size, orientation and copy count to the printer before
    /// submission. A no-op where the spooler takes these per job.
    fn configure(&self, ticket: &PrintTicket) -> Result<()>;

    /// Hand `file` to the spooler. Blocks until the submitting process exits.
    fn submit(&self, ticket: &PrintTicket, file: &Path) -> Result<JobHandle>;

    /// Wait, bounded, until the job no longer needs `file`. Never fails.
    fn await_completion(&self, ticket: &PrintTicket, handle: &JobHandle) -> Completion;
}

/// The driver for the current platform.
pub fn platform_driver() -> Box<dyn PrintDriver> {
    #[cfg(windows)]
    {
        Box::new(win32::WindowsDriver::new())
    }
    #[cfg(not(windows))]
    {
        Box::new(cups::CupsDriver::new())
    }
}

/// Case-insensitive sort used by every driver's enumeration.
pub(crate) fn sort_printers(mut printers: Vec<String>) -> Vec<String> {
    printers.sort_by_key(|name| name.to_lowercase());
    printers
}
