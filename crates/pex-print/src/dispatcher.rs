// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatcher: validates a request, renders labels, drives the platform
// driver through configure -> submit -> wait, and removes temporary files.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use pex_core::error::{PexError, Result};
use pex_core::{
    Completion, Config, LabelFont, LabelStyle, Orientation, PrintReport, PrintRequest,
    PrintSource, PrintTicket, Quantity, Warning,
};
use pex_document::LabelRenderer;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::artifact::TemporaryArtifact;
use crate::driver::{PrintDriver, platform_driver};
use crate::resolve::{FormatResolver, PrinterResolver};
use crate::retry::RetryConfig;

/// Printer, format, orientation and copies as given by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    /// Alias or OS printer name; `None` uses `printer_default`.
    pub printer: Option<String>,
    /// Format name (`"A6"`) or explicit pair (`"62x29"`).
    pub format: String,
    pub orientation: String,
    /// Values below 1 are treated as 1.
    pub quantity: i64,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            printer: None,
            format: "A4".into(),
            orientation: "portrait".into(),
            quantity: 1,
        }
    }
}

/// Optional typography overrides for `print_lines`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelOptions {
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub line_height: Option<f32>,
}

/// Snapshot returned by [`Dispatcher::status`].
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: &'static str,
    pub version: &'static str,
    pub platform: String,
    pub printer_default: Option<String>,
    pub printers: BTreeMap<String, String>,
    pub formats: BTreeMap<String, Value>,
    /// Printers currently installed on the host.
    pub available_printers: Vec<String>,
}

pub struct Dispatcher {
    config: Config,
    driver: Box<dyn PrintDriver>,
    cleanup: RetryConfig,
    /// One lock per OS printer name, held across configure/submit/wait.
    printer_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    /// Dispatcher using the platform driver.
    pub fn new(config: Config) -> Result<Self> {
        config.settings()?;
        let driver = platform_driver();
        info!(platform = driver.platform_name(), "dispatcher ready");
        Ok(Self::with_driver(config, driver))
    }

    pub fn with_driver(config: Config, driver: Box<dyn PrintDriver>) -> Self {
        Self {
            config,
            driver,
            cleanup: RetryConfig::default(),
            printer_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cleanup(mut self, cleanup: RetryConfig) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Print an existing file. The file belongs to the caller and is never
    /// deleted.
    #[instrument(skip(self, path, job), fields(path = %path.display()))]
    pub fn print_file(&self, path: &Path, job: &JobOptions) -> Result<PrintReport> {
        if !path.exists() {
            return Err(PexError::FileNotFound(path.display().to_string()));
        }
        let settings = self.config.settings()?;
        let request = PrintRequest {
            source: PrintSource::File(path.to_path_buf()),
            printer: job.printer.clone(),
            format: FormatResolver::new(&settings.formats).parse(&job.format)?,
            orientation: Orientation::parse(&job.orientation)?,
            quantity: Quantity::new(job.quantity),
            style: LabelStyle::default(),
        };
        self.dispatch(request)
    }

    /// Render `lines` into a label and print it. The rendered file is removed
    /// afterwards, also when submission fails.
    #[instrument(skip(self, lines, job, label), fields(line_count = lines.len()))]
    pub fn print_lines(
        &self,
        lines: &[String],
        job: &JobOptions,
        label: &LabelOptions,
    ) -> Result<PrintReport> {
        let orientation = Orientation::parse(&job.orientation)?;
        let settings = self.config.settings()?;
        let mut style = settings.label_style()?;
        if let Some(font) = &label.font {
            style.font = LabelFont::parse(font)?;
        }
        if let Some(size) = label.font_size {
            style.font_size = size;
        }
        if let Some(height) = label.line_height {
            style.line_height = height;
        }

        let request = PrintRequest {
            source: PrintSource::Lines(lines.to_vec()),
            printer: job.printer.clone(),
            format: FormatResolver::new(&settings.formats).parse(&job.format)?,
            orientation,
            quantity: Quantity::new(job.quantity),
            style,
        };
        self.dispatch(request)
    }

    /// Run a fully typed request.
    pub fn dispatch(&self, request: PrintRequest) -> Result<PrintReport> {
        let settings = self.config.settings()?;

        if let PrintSource::File(path) = &request.source {
            if !path.exists() {
                return Err(PexError::FileNotFound(path.display().to_string()));
            }
        }

        let printer =
            PrinterResolver::new(&settings).validate(request.printer.as_deref(), &*self.driver)?;
        let geometry = FormatResolver::new(&settings.formats).resolve(&request.format)?;

        let ticket = PrintTicket {
            printer,
            geometry,
            orientation: request.orientation,
            quantity: request.quantity,
            copies: settings.linux_command,
        };
        debug!(?ticket, "request validated");

        match request.source {
            PrintSource::File(path) => {
                let completion = self.run_job(&ticket, &path)?;
                Ok(report(ticket, completion, Vec::new(), None))
            }
            PrintSource::Lines(lines) => {
                let renderer = LabelRenderer::from_settings(&settings);
                let rendered =
                    renderer.render(lines.as_slice(), &ticket.geometry, &request.style)?;
                let artifact = TemporaryArtifact::new(rendered);
                let path = artifact.path().to_path_buf();

                let outcome = self.run_job(&ticket, &path);
                let cleanup_warning = artifact.cleanup(&self.cleanup);
                if let Some(w) = &cleanup_warning {
                    warn!(warning = %w, "temporary label not removed");
                }

                let completion = outcome?;
                Ok(report(
                    ticket,
                    completion,
                    cleanup_warning.into_iter().collect(),
                    Some(path),
                ))
            }
        }
    }

    /// Installed printers, straight from the driver.
    pub fn list_printers(&self) -> Vec<String> {
        self.driver.list_printers()
    }

    pub fn status(&self) -> Result<ServiceStatus> {
        let settings = self.config.settings()?;
        Ok(ServiceStatus {
            name: "PEX",
            version: env!("CARGO_PKG_VERSION"),
            platform: self.driver.platform_name().to_string(),
            printer_default: settings.printer_default,
            printers: settings.printers,
            formats: settings.formats,
            available_printers: self.driver.list_printers(),
        })
    }

    fn printer_lock(&self, printer: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .printer_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(printer.to_string()).or_default())
    }

    /// preflight -> configure -> submit -> wait under the printer's lock.
    fn run_job(&self, ticket: &PrintTicket, file: &Path) -> Result<Completion> {
        let lock = self.printer_lock(&ticket.printer);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.driver.preflight(ticket)?;
        self.driver.configure(ticket)?;
        let handle = self.driver.submit(ticket, file)?;
        let completion = self.driver.await_completion(ticket, &handle);
        info!(printer = %ticket.printer, ?completion, "print job done");
        Ok(completion)
    }
}

fn report(
    ticket: PrintTicket,
    completion: Completion,
    mut warnings: Vec<Warning>,
    artifact: Option<PathBuf>,
) -> PrintReport {
    if completion == Completion::TimedOut {
        warnings.push(Warning::CompletionTimedOut {
            printer: ticket.printer.clone(),
        });
    }
    PrintReport {
        printer: ticket.printer,
        geometry: ticket.geometry,
        orientation: ticket.orientation,
        quantity: ticket.quantity,
        completion,
        warnings,
        artifact,
    }
}
