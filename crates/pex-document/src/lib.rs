// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pex-document: Label rendering for the PEX print service.
//
// Lays out text lines centred on a fixed-size page using the metrics of the
// PDF built-in Helvetica faces, and serialises the result as a one-page PDF.

pub mod label;

// Re-export the primary items so callers can use `pex_document::LabelRenderer` etc.
pub use label::layout::{LabelLayout, PlacedLine, layout_label, wrap_line};
pub use label::writer::LabelRenderer;
