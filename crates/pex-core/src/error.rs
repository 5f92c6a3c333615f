// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for PEX.

use thiserror::Error;

/// Top-level error type for all PEX operations.
#[derive(Debug, Error)]
pub enum PexError {
    // -- Request validation --
    #[error("Unknown paper format '{0}'.")]
    UnknownFormat(String),

    #[error("Invalid paper format: {0}")]
    InvalidFormat(String),

    #[error("Unknown orientation '{0}' (use 'portrait', 'P' or 'landscape', 'L').")]
    InvalidOrientation(String),

    #[error("Unknown font '{0}' (use 'Helvetica' or 'Helvetica-Bold').")]
    UnknownFont(String),

    #[error("The printer '{0}' does not exist on this system.")]
    PrinterNotFound(String),

    #[error("No printer given and no default printer configured.")]
    NoPrinterSelected,

    #[error("The filepath: '{0}' does not exist.")]
    FileNotFound(String),

    // -- Platform printing --
    #[error("failed to configure printer '{printer}': {detail}")]
    PrinterConfigError { printer: String, detail: String },

    /// Carries the spooler's stderr/stdout verbatim.
    #[error("{0}")]
    SubmissionFailed(String),

    #[error(
        "No SumatraPDF executable found, please install SumatraPDF on the host computer."
    )]
    HelperNotFound,

    // -- Rendering --
    #[error("label rendering failed: {0}")]
    Render(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PexError {
    /// Whether this error was raised while validating a request, i.e. before
    /// any external process was started or any file was written.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownFormat(_)
                | Self::InvalidFormat(_)
                | Self::InvalidOrientation(_)
                | Self::UnknownFont(_)
                | Self::PrinterNotFound(_)
                | Self::NoPrinterSelected
                | Self::FileNotFound(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PexError>;
