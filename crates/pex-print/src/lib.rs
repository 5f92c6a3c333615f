// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pex-print: printer and format resolution, platform spooler drivers, and the
// job dispatcher that ties them to the label renderer.

pub mod artifact;
pub mod background;
pub mod dispatcher;
pub mod driver;
pub mod resolve;
pub mod retry;

pub use artifact::TemporaryArtifact;
pub use background::AsyncDispatcher;
pub use dispatcher::{Dispatcher, JobOptions, LabelOptions, ServiceStatus};
pub use driver::{PrintDriver, platform_driver};
pub use resolve::{FormatResolver, PrinterResolver};
