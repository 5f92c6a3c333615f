// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// The configuration is a JSON document held by a `ConfigStore`. Typed
// `Settings` are derived from it on every read so edits made through
// `set_option` (or by hand) take effect without a restart.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{PexError, Result};
use crate::store::{ConfigStore, MemoryStore};
use crate::types::{LabelFont, LabelStyle};

/// How multiple copies are requested from CUPS (`linux_command` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CopyStrategy {
    /// `lp -n <N>`.
    #[default]
    CountFlag,
    /// `lp -o copies=<N> -o Collate=true`.
    CopiesOption,
    /// One `lp` invocation per copy, for drivers that ignore both flags.
    Loop,
}

impl From<String> for CopyStrategy {
    fn from(value: String) -> Self {
        match value.trim() {
            "-n" => Self::CountFlag,
            "-o" => Self::CopiesOption,
            _ => Self::Loop,
        }
    }
}

impl From<CopyStrategy> for String {
    fn from(value: CopyStrategy) -> Self {
        match value {
            CopyStrategy::CountFlag => "-n".into(),
            CopyStrategy::CopiesOption => "-o".into(),
            CopyStrategy::Loop => "loop".into(),
        }
    }
}

/// Label typography defaults, used when a request does not specify them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelDefaults {
    pub font: String,
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for LabelDefaults {
    fn default() -> Self {
        let style = LabelStyle::default();
        Self {
            font: style.font.postscript_name().to_string(),
            font_size: style.font_size,
            line_height: style.line_height,
        }
    }
}

/// Typed view of the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Alias -> OS printer name.
    pub printers: BTreeMap<String, String>,
    /// Format name -> `[width_mm, height_mm, ...]`. Kept as raw JSON so a
    /// malformed entry only fails the request that uses it.
    pub formats: BTreeMap<String, Value>,
    /// Alias used when a request names no printer.
    pub printer_default: Option<String>,
    /// CUPS copy-count strategy.
    pub linux_command: CopyStrategy,
    pub label: LabelDefaults,
    /// Directory for rendered labels. Defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for Settings {
    // Built by hand: `#[serde(default)]` calls this while deserializing.
    fn default() -> Self {
        let formats = match default_document().get_mut("formats").map(Value::take) {
            Some(Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self {
            printers: BTreeMap::new(),
            formats,
            printer_default: None,
            linux_command: CopyStrategy::default(),
            label: LabelDefaults::default(),
            temp_dir: None,
        }
    }
}

impl Settings {
    /// Resolve the configured label defaults into a `LabelStyle`.
    pub fn label_style(&self) -> Result<LabelStyle> {
        Ok(LabelStyle {
            font: LabelFont::parse(&self.label.font)?,
            font_size: self.label.font_size,
            line_height: self.label.line_height,
        })
    }
}

/// Configuration document written on first start.
pub fn default_document() -> Value {
    json!({
        "printers": {},
        "printer_default": null,
        "formats": {
            "A4": [210, 297],
            "A5": [148, 210],
            "A6": [105, 148],
            "label": [62, 29]
        },
        "linux_command": "-n",
        "label": {
            "font": "Helvetica-Bold",
            "font_size": 10,
            "line_height": 12
        },
        "server": {
            "host": "127.0.0.1",
            "port": 4123,
            "cors": false
        }
    })
}

/// Configuration object handed to the dispatcher and the CLI.
pub struct Config {
    store: Box<dyn ConfigStore>,
}

impl Config {
    pub fn new(store: impl ConfigStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Config backed by an in-memory document (tests, embedding).
    pub fn in_memory(document: Value) -> Self {
        Self::new(MemoryStore::new(document))
    }

    /// The raw JSON document.
    pub fn document(&self) -> Result<Value> {
        self.store.load()
    }

    /// Typed settings, re-read from the store on each call.
    pub fn settings(&self) -> Result<Settings> {
        let document = self.store.load()?;
        serde_json::from_value(document)
            .map_err(|e| PexError::Config(format!("invalid settings: {e}")))
    }

    /// Read a value by dot-path (`server.port`, `formats.A6.0`).
    pub fn get_option(&self, path: &str) -> Result<Option<Value>> {
        let document = self.store.load()?;
        Ok(deep_get(&document, path).cloned())
    }

    /// Write a value by dot-path, creating intermediate objects/arrays.
    pub fn set_option(&self, path: &str, value: Value) -> Result<()> {
        let mut document = self.store.load()?;
        deep_set(&mut document, path, value)?;
        debug!(path, "config option set");
        self.store.save(&document)
    }

    /// Remove a value by dot-path. Returns whether anything was removed.
    pub fn delete_option(&self, path: &str) -> Result<bool> {
        let mut document = self.store.load()?;
        let removed = deep_delete(&mut document, path);
        if removed {
            debug!(path, "config option deleted");
            self.store.save(&document)?;
        }
        Ok(removed)
    }
}

// -- Dot-path access ---------------------------------------------------------

fn index_of(segment: &str) -> Option<usize> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        segment.parse().ok()
    } else {
        None
    }
}

fn deep_get<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| match current {
        Value::Array(items) => index_of(segment).and_then(|i| items.get(i)),
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

fn deep_set(document: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PexError::Config(format!("invalid option path '{path}'")));
    }
    set_at(document, &segments, value);
    Ok(())
}

/// Intermediate scalars are replaced; a missing container becomes an array
/// when the next segment is numeric, an object otherwise.
fn set_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    match (node, index_of(head)) {
        (Value::Array(items), Some(idx)) => {
            if idx >= items.len() {
                items.resize(idx + 1, Value::Null);
            }
            set_at(&mut items[idx], rest, value);
        }
        (Value::Object(map), _) => {
            let child = map.entry((*head).to_string()).or_insert(Value::Null);
            set_at(child, rest, value);
        }
        (slot, idx) => {
            let mut child = Value::Null;
            set_at(&mut child, rest, value);
            *slot = match idx {
                Some(idx) if slot.is_null() => {
                    let mut items = vec![Value::Null; idx + 1];
                    items[idx] = child;
                    Value::Array(items)
                }
                _ => {
                    let mut map = Map::new();
                    map.insert((*head).to_string(), child);
                    Value::Object(map)
                }
            };
        }
    }
}

fn deep_delete(document: &mut Value, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    delete_at(document, &segments)
}

fn delete_at(node: &mut Value, segments: &[&str]) -> bool {
    match segments {
        [] => false,
        [last] => match node {
            Value::Array(items) => match index_of(last) {
                Some(i) if i < items.len() => {
                    items.remove(i);
                    true
                }
                _ => false,
            },
            Value::Object(map) => map.remove(*last).is_some(),
            _ => false,
        },
        [head, rest @ ..] => match node {
            Value::Array(items) => index_of(head)
                .and_then(|i| items.get_mut(i))
                .is_some_and(|child| delete_at(child, rest)),
            Value::Object(map) => map
                .get_mut(*head)
                .is_some_and(|child| delete_at(child, rest)),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_into_settings() {
        let settings = Settings::default();
        assert_eq!(settings.linux_command, CopyStrategy::CountFlag);
        assert_eq!(settings.formats["A6"], json!([105, 148]));
        assert!(settings.printers.is_empty());
        assert_eq!(settings.label_style().unwrap(), LabelStyle::default());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config = Config::in_memory(json!({"printers": {"label": "Zebra"}}));
        let settings = config.settings().unwrap();
        assert_eq!(settings.printers["label"], "Zebra");
        assert_eq!(settings.formats["label"], json!([62, 29]));
        assert_eq!(settings.label.font, "Helvetica-Bold");
    }

    #[test]
    fn copy_strategy_from_config_string() {
        assert_eq!(CopyStrategy::from("-n".to_string()), CopyStrategy::CountFlag);
        assert_eq!(CopyStrategy::from("-o".to_string()), CopyStrategy::CopiesOption);
        assert_eq!(CopyStrategy::from("for".to_string()), CopyStrategy::Loop);
    }

    #[test]
    fn malformed_settings_is_config_error() {
        let config = Config::in_memory(json!({"printers": {"label": 12}}));
        assert!(matches!(config.settings(), Err(PexError::Config(_))));
    }

    #[test]
    fn get_set_delete_by_path() {
        let config = Config::in_memory(default_document());

        assert_eq!(config.get_option("server.port").unwrap(), Some(json!(4123)));
        config.set_option("server.port", json!(4423)).unwrap();
        assert_eq!(config.get_option("server.port").unwrap(), Some(json!(4423)));

        config
            .set_option("formats.A11", json!([18, 26, "Tiny format"]))
            .unwrap();
        assert_eq!(config.get_option("formats.A11.1").unwrap(), Some(json!(26)));

        assert!(config.delete_option("formats.A4").unwrap());
        assert!(!config.delete_option("formats.A4").unwrap());
        assert_eq!(config.get_option("formats.A4").unwrap(), None);
    }

    #[test]
    fn set_creates_intermediate_containers() {
        let mut doc = json!({});
        deep_set(&mut doc, "a.b.2", json!("x")).unwrap();
        assert_eq!(doc, json!({"a": {"b": [null, null, "x"]}}));

        deep_set(&mut doc, "a.b.0.name", json!(1)).unwrap();
        assert_eq!(doc["a"]["b"][0], json!({"name": 1}));
    }

    #[test]
    fn set_replaces_scalars_on_the_path() {
        let mut doc = json!({"server": 5});
        deep_set(&mut doc, "server.port", json!(1)).unwrap();
        assert_eq!(doc, json!({"server": {"port": 1}}));
    }

    #[test]
    fn empty_segments_are_rejected() {
        let mut doc = json!({});
        assert!(deep_set(&mut doc, "a..b", json!(1)).is_err());
    }

    #[test]
    fn delete_from_array() {
        let mut doc = json!({"list": [1, 2, 3]});
        assert!(deep_delete(&mut doc, "list.1"));
        assert_eq!(doc, json!({"list": [1, 3]}));
        assert!(!deep_delete(&mut doc, "list.9"));
        assert!(!deep_delete(&mut doc, "missing.key"));
    }
}
