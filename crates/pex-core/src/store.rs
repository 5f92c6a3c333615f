// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration storage ports.
//
// `JsonFileStore` persists the document as pretty-printed JSON and migrates
// the legacy flat `pexconfig.json` on first load. `MemoryStore` keeps it in
// memory for tests and embedders.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::default_document;
use crate::error::{PexError, Result};

/// Read/write port for the configuration document.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Value>;
    fn save(&self, document: &Value) -> Result<()>;
}

/// In-memory store.
pub struct MemoryStore {
    document: Mutex<Value>,
}

impl MemoryStore {
    pub fn new(document: Value) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Value> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .map_err(|_| PexError::Config("config lock poisoned".into()))
    }

    fn save(&self, document: &Value) -> Result<()> {
        let mut guard = self
            .document
            .lock()
            .map_err(|_| PexError::Config("config lock poisoned".into()))?;
        *guard = document.clone();
        Ok(())
    }
}

/// File-backed store. Writes the default document when the file is missing.
pub struct JsonFileStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
        }
    }

    /// Also look for a legacy `pexconfig.json` to migrate on load.
    pub fn with_legacy(mut self, legacy_path: impl Into<PathBuf>) -> Self {
        self.legacy_path = Some(legacy_path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert a legacy `{file_printer, label_printer, linux_command}` file
    /// into the current layout, then remove it. Failures are logged and the
    /// legacy file is left in place.
    fn migrate_legacy(&self, legacy: &Path) {
        match self.try_migrate(legacy) {
            Ok(()) => info!(path = %legacy.display(), "migrated legacy configuration"),
            Err(e) => warn!(error = %e, path = %legacy.display(), "config migration failed"),
        }
    }

    fn try_migrate(&self, legacy: &Path) -> Result<()> {
        let content: Value = serde_json::from_str(&std::fs::read_to_string(legacy)?)?;
        let mut document = default_document();

        let printer = |key: &str| {
            content
                .get(key)
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty() && *name != "null")
                .map(str::to_string)
        };
        let file_printer = printer("file_printer");
        let label_printer = printer("label_printer");

        if let Some(name) = &file_printer {
            document["printers"]["file"] = json!(name);
        }
        if let Some(name) = &label_printer {
            document["printers"]["label"] = json!(name);
        }
        if file_printer.is_some() {
            document["printer_default"] = json!("file");
        } else if label_printer.is_some() {
            document["printer_default"] = json!("label");
        }
        if let Some(mode) = content.get("linux_command").and_then(Value::as_str) {
            document["linux_command"] = json!(mode);
        }

        self.save(&document)?;
        std::fs::remove_file(legacy)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Value> {
        if let Some(legacy) = self.legacy_path.as_deref() {
            if legacy.exists() {
                self.migrate_legacy(legacy);
            }
        }

        if !self.path.exists() {
            let document = default_document();
            self.save(&document)?;
            return Ok(document);
        }

        let data = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&data).map_err(|e| {
            PexError::Config(format!("{} is not valid JSON: {e}", self.path.display()))
        })
    }

    fn save(&self, document: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = JsonFileStore::new(&path);

        let doc = store.load().unwrap();
        assert_eq!(doc, default_document());
        assert!(path.exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("config.json"));
        store.save(&json!({"printers": {"a": "b"}})).unwrap();
        assert_eq!(store.load().unwrap()["printers"]["a"], "b");
    }

    #[test]
    fn invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(PexError::Config(_))));
    }

    #[test]
    fn legacy_file_is_migrated_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("pexconfig.json");
        std::fs::write(
            &legacy,
            r#"{"file_printer": "null", "label_printer": "Zebra GK420d", "linux_command": "-o"}"#,
        )
        .unwrap();

        let store = JsonFileStore::new(dir.path().join("config.json")).with_legacy(&legacy);
        let doc = store.load().unwrap();

        assert_eq!(doc["printers"]["label"], "Zebra GK420d");
        assert!(doc["printers"].get("file").is_none());
        assert_eq!(doc["printer_default"], "label");
        assert_eq!(doc["linux_command"], "-o");
        assert!(!legacy.exists());
    }

    #[test]
    fn broken_legacy_file_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("pexconfig.json");
        std::fs::write(&legacy, "garbage").unwrap();

        let store = JsonFileStore::new(dir.path().join("config.json")).with_legacy(&legacy);
        assert_eq!(store.load().unwrap(), default_document());
        assert!(legacy.exists());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new(json!({}));
        store.save(&json!({"k": 1})).unwrap();
        assert_eq!(store.load().unwrap(), json!({"k": 1}));
    }
}
