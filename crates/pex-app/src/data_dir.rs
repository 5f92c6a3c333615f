// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware location of the configuration file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pex";
const CONFIG_FILE: &str = "config.json";

/// Flat file written by older releases, migrated on first load.
const LEGACY_CONFIG_FILE: &str = "pexconfig.json";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir(|key| std::env::var_os(key)).join(APP_DIR);
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Default configuration file inside [`data_dir`].
pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// The legacy file is looked for next to whichever config file is in use.
pub fn legacy_path_for(config: &Path) -> PathBuf {
    config.with_file_name(LEGACY_CONFIG_FILE)
}

fn base_dir(var: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    let non_empty = |key: &str| var(key).filter(|value| !value.is_empty());

    if cfg!(windows) {
        if let Some(appdata) = non_empty("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Some(home) = non_empty("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}
