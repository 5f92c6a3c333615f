// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the PEX print service.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::CopyStrategy;
use crate::error::{PexError, Result};

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Normalise a user-supplied token. Accepts `portrait`, `p`, `landscape`
    /// and `l` in any casing.
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "portrait" | "p" => Ok(Self::Portrait),
            "landscape" | "l" => Ok(Self::Landscape),
            _ => Err(PexError::InvalidOrientation(token.to_string())),
        }
    }

    /// Canonical lowercase keyword, as used in SumatraPDF print settings.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }

    /// Win32 `DEVMODE.dmOrientation` value (`DMORIENT_PORTRAIT` = 1,
    /// `DMORIENT_LANDSCAPE` = 2).
    pub fn devmode_value(&self) -> i16 {
        match self {
            Self::Portrait => 1,
            Self::Landscape => 2,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Number of copies. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    /// Any value `<= 1` (including zero and negatives) becomes 1.
    pub fn new(requested: i64) -> Self {
        if requested <= 1 {
            Self::ONE
        } else {
            Self(u32::try_from(requested).unwrap_or(u32::MAX))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_single(&self) -> bool {
        self.0 == 1
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical page size in millimetres. Both sides strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperGeometry {
    width_mm: f64,
    height_mm: f64,
}

impl PaperGeometry {
    pub fn new(width_mm: f64, height_mm: f64) -> Result<Self> {
        if !(width_mm.is_finite() && height_mm.is_finite()) || width_mm <= 0.0 || height_mm <= 0.0
        {
            return Err(PexError::InvalidFormat(format!(
                "width and height must be positive numbers, got ({width_mm}, {height_mm})"
            )));
        }
        Ok(Self {
            width_mm,
            height_mm,
        })
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    /// Dimensions in tenths of a millimetre, the unit of `DEVMODE.dmPaperWidth`
    /// and `dmPaperLength`.
    pub fn tenths_mm(&self) -> (i32, i32) {
        (
            (self.width_mm * 10.0).round() as i32,
            (self.height_mm * 10.0).round() as i32,
        )
    }
}

impl fmt::Display for PaperGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}mm", self.width_mm, self.height_mm)
    }
}

/// A paper format as requested by a caller, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaperFormat {
    /// Looked up in the configured `formats` table.
    Named(String),
    /// Explicit width and height in millimetres, validated on resolution.
    Explicit { width_mm: f64, height_mm: f64 },
}

impl PaperFormat {
    /// Parse a request token. `"A6"` is a name; `"105x148"` and `"105,148"`
    /// are explicit pairs.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        let looks_numeric = token
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));

        let pair = if token.contains(',') {
            token.split_once(',')
        } else if looks_numeric {
            token.split_once(|c| c == 'x' || c == 'X')
        } else {
            None
        };

        match pair {
            Some((w, h)) => {
                let parse = |s: &str| {
                    s.trim().parse::<f64>().map_err(|_| {
                        PexError::InvalidFormat(format!(
                            "paper format '{token}' must contain two numeric values"
                        ))
                    })
                };
                Ok(Self::Explicit {
                    width_mm: parse(w)?,
                    height_mm: parse(h)?,
                })
            }
            None if token.is_empty() => Err(PexError::InvalidFormat(
                "paper format must not be empty".into(),
            )),
            None => Ok(Self::Named(token.to_string())),
        }
    }

    /// Accept a JSON string (name or pair token) or a two-element numeric array.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Array(items) if items.len() == 2 => {
                match (items[0].as_f64(), items[1].as_f64()) {
                    (Some(width_mm), Some(height_mm)) => Ok(Self::Explicit {
                        width_mm,
                        height_mm,
                    }),
                    _ => Err(PexError::InvalidFormat(
                        "paper format pair must contain two numeric values".into(),
                    )),
                }
            }
            other => Err(PexError::InvalidFormat(format!(
                "paper format must be a string or a pair of two numbers, got {other}"
            ))),
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Explicit {
                width_mm,
                height_mm,
            } => write!(f, "{width_mm}x{height_mm}"),
        }
    }
}

/// Built-in PDF base fonts the label renderer can measure and draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LabelFont {
    Helvetica,
    #[default]
    HelveticaBold,
}

impl LabelFont {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helvetica" => Ok(Self::Helvetica),
            "helvetica-bold" | "helvetica bold" | "helveticabold" => Ok(Self::HelveticaBold),
            _ => Err(PexError::UnknownFont(name.to_string())),
        }
    }

    /// PostScript name of the face.
    pub fn postscript_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }
}

/// Typography for rendered labels. Sizes are in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelStyle {
    pub font: LabelFont,
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font: LabelFont::HelveticaBold,
            font_size: 10.0,
            line_height: 12.0,
        }
    }
}

/// What is being printed.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintSource {
    /// Caller-owned file; never deleted by PEX.
    File(PathBuf),
    /// Text lines rendered into a temporary label PDF.
    Lines(Vec<String>),
}

/// A print request as received from a front-end.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintRequest {
    pub source: PrintSource,
    /// Alias or OS printer name. `None` uses `printer_default`.
    pub printer: Option<String>,
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub quantity: Quantity,
    pub style: LabelStyle,
}

/// Fully resolved parameters handed to a platform driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintTicket {
    /// Validated OS-level printer name.
    pub printer: String,
    pub geometry: PaperGeometry,
    pub orientation: Orientation,
    pub quantity: Quantity,
    /// How copies are requested where the spooler takes them per submission.
    pub copies: CopyStrategy,
}

/// Tracking information for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    /// Windows spooler: the job ID is not known at submission time and is
    /// discovered by diffing the queue against `baseline` and matching the
    /// document name against `document`.
    Windows {
        baseline: BTreeSet<u32>,
        document: String,
    },
    /// CUPS request IDs (`<queue>-<number>`), one per `lp` invocation.
    Cups { request_ids: Vec<String> },
    /// The spooler gave nothing to track.
    Untracked,
}

/// How the wait-for-spool step ended. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The job left the active queue (or finished spooling).
    Finished,
    /// The deadline elapsed while the job was still queued.
    TimedOut,
    /// The job could not be identified; a settle delay was used instead.
    Untracked,
}

/// Non-fatal conditions reported alongside a successful print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The temporary artifact could not be deleted.
    Cleanup { path: PathBuf, detail: String },
    /// The job was still spooling when the deadline elapsed.
    CompletionTimedOut { printer: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleanup { path, detail } => {
                write!(f, "could not delete temporary file {}: {detail}", path.display())
            }
            Self::CompletionTimedOut { printer } => {
                write!(f, "job on '{printer}' was still spooling at the deadline")
            }
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintReport {
    pub printer: String,
    pub geometry: PaperGeometry,
    pub orientation: Orientation,
    pub quantity: Quantity,
    pub completion: Completion,
    pub warnings: Vec<Warning>,
    /// The rendered label file, if one was created (already deleted unless a
    /// cleanup warning is present).
    pub artifact: Option<PathBuf>,
}

/// The uniform `(success, message)` contract every operation produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOutcome {
    pub success: bool,
    pub message: String,
}

impl PrintOutcome {
    /// Build the outcome of a file or label print.
    pub fn from_result(result: &Result<PrintReport>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                message: success_message.to_string(),
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
            },
        }
    }

    pub fn into_tuple(self) -> (bool, String) {
        (self.success, self.message)
    }
}

/// JSON envelope returned to HTTP clients:
/// `{"status": "success", "result": ...}` or
/// `{"status": "error", "message": ..., "details": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiEnvelope {
    Success { result: Value },
    Error { message: String, details: Value },
}

impl ApiEnvelope {
    pub fn success(result: impl Serialize) -> Self {
        Self::Success {
            result: serde_json::to_value(result).unwrap_or(Value::Null),
        }
    }

    pub fn error(message: impl Into<String>, details: Option<Value>) -> Self {
        Self::Error {
            message: message.into(),
            details: details.unwrap_or_else(|| Value::Object(Default::default())),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
