// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async facade over the blocking dispatcher.
//
// Every dispatcher call shells out and sleeps while polling the spooler, so
// it runs on tokio's blocking pool instead of an executor thread.

use std::path::PathBuf;
use std::sync::Arc;

use pex_core::error::{PexError, Result};
use pex_core::PrintReport;
use tokio::task::JoinError;
use tracing::error;

use crate::dispatcher::{Dispatcher, JobOptions, LabelOptions, ServiceStatus};

/// Cloneable handle for async request handlers.
#[derive(Clone)]
pub struct AsyncDispatcher {
    inner: Arc<Dispatcher>,
}

impl AsyncDispatcher {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(dispatcher),
        }
    }

    pub async fn print_file(&self, path: PathBuf, job: JobOptions) -> Result<PrintReport> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.print_file(&path, &job))
            .await
            .map_err(join_error)?
    }

    pub async fn print_lines(
        &self,
        lines: Vec<String>,
        job: JobOptions,
        label: LabelOptions,
    ) -> Result<PrintReport> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.print_lines(&lines, &job, &label))
            .await
            .map_err(join_error)?
    }

    pub async fn list_printers(&self) -> Result<Vec<String>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.list_printers())
            .await
            .map_err(join_error)
    }

    pub async fn status(&self) -> Result<ServiceStatus> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.status())
            .await
            .map_err(join_error)?
    }
}

fn join_error(e: JoinError) -> PexError {
    error!(error = %e, "print task did not complete");
    PexError::Io(std::io::Error::other(format!("print task failed: {e}")))
}
