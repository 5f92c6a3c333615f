// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temporary files owned by a single print request.

use std::path::{Path, PathBuf};

use pex_core::Warning;
use tracing::warn;

use crate::retry::{RetryConfig, remove_with_retry};

/// A file the dispatcher created and must delete once the spooler is done
/// with it. Call [`TemporaryArtifact::cleanup`]; dropping without cleanup
/// makes one last, unretried removal attempt.
#[derive(Debug)]
pub struct TemporaryArtifact {
    path: PathBuf,
    removed: bool,
}

impl TemporaryArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file with bounded retries. A failure is returned as a
    /// warning for the print report rather than an error.
    pub fn cleanup(mut self, retry: &RetryConfig) -> Option<Warning> {
        let result = remove_with_retry(&self.path, retry);
        self.removed = true;
        result.err().map(|e| Warning::Cleanup {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "temporary file left behind");
            }
        }
    }
}
