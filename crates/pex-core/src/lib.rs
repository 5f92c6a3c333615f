// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PEX: Core types, error definitions and configuration shared across all crates.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{Config, CopyStrategy, Settings};
pub use store::{ConfigStore, JsonFileStore, MemoryStore};
pub use error::PexError;
pub use types::*;
