// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label module: font metrics, layout, and PDF output.

pub mod layout;
pub mod metrics;
pub mod writer;

pub use layout::LabelLayout;
pub use writer::LabelRenderer;
