// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper format and printer alias resolution.
//
// Both resolvers work on already loaded `Settings`; the only external call is
// the printer enumeration done by `PrinterResolver::exists`, which is never
// cached so printers added or removed at runtime are seen immediately.

use std::collections::BTreeMap;

use pex_core::error::{PexError, Result};
use pex_core::{PaperFormat, PaperGeometry, Settings};
use serde_json::Value;
use tracing::debug;

use crate::driver::PrintDriver;

/// Turns a `PaperFormat` into validated millimetre dimensions.
pub struct FormatResolver<'a> {
    formats: &'a BTreeMap<String, Value>,
}

impl<'a> FormatResolver<'a> {
    pub fn new(formats: &'a BTreeMap<String, Value>) -> Self {
        Self { formats }
    }

    /// Classify a request token. A configured name always wins, so a format
    /// called `4x6` is looked up rather than read as a 4 by 6 mm pair.
    pub fn parse(&self, token: &str) -> Result<PaperFormat> {
        let trimmed = token.trim();
        if self.formats.contains_key(trimmed) {
            return Ok(PaperFormat::Named(trimmed.to_string()));
        }
        PaperFormat::parse(trimmed)
    }

    pub fn resolve(&self, format: &PaperFormat) -> Result<PaperGeometry> {
        match format {
            PaperFormat::Named(name) => {
                let entry = self
                    .formats
                    .get(name)
                    .ok_or_else(|| PexError::UnknownFormat(name.clone()))?;
                geometry_from_entry(name, entry)
            }
            PaperFormat::Explicit {
                width_mm,
                height_mm,
            } => PaperGeometry::new(*width_mm, *height_mm),
        }
    }
}

/// A configured entry is `[width, height, ...]`; anything after the first two
/// numbers (usually a description) is ignored.
fn geometry_from_entry(name: &str, entry: &Value) -> Result<PaperGeometry> {
    let dims = entry
        .as_array()
        .filter(|items| items.len() >= 2)
        .and_then(|items| Some((items[0].as_f64()?, items[1].as_f64()?)));

    match dims {
        Some((width, height)) => PaperGeometry::new(width, height).map_err(|_| {
            PexError::InvalidFormat(format!(
                "format '{name}' must have positive dimensions, got {entry}"
            ))
        }),
        None => Err(PexError::InvalidFormat(format!(
            "invalid format entry for '{name}' in config: {entry}"
        ))),
    }
}

/// Maps user-facing printer aliases to OS printer names.
pub struct PrinterResolver<'a> {
    aliases: &'a BTreeMap<String, String>,
    default: Option<&'a str>,
}

impl<'a> PrinterResolver<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            aliases: &settings.printers,
            default: settings.printer_default.as_deref(),
        }
    }

    /// Alias lookup; unknown names pass through unchanged.
    pub fn resolve(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Whether `os_name` is currently installed.
    pub fn exists(&self, driver: &dyn PrintDriver, os_name: &str) -> bool {
        driver.list_printers().iter().any(|p| p == os_name)
    }

    /// Resolve `requested` (or the configured default) and confirm the
    /// printer is installed. Returns the OS printer name.
    pub fn validate(&self, requested: Option<&str>, driver: &dyn PrintDriver) -> Result<String> {
        let name = requested
            .filter(|n| !n.trim().is_empty())
            .or(self.default)
            .ok_or(PexError::NoPrinterSelected)?;

        let os_name = self.resolve(name);
        debug!(alias = name, printer = %os_name, "printer resolved");

        if self.exists(driver, &os_name) {
            Ok(os_name)
        } else {
            Err(PexError::PrinterNotFound(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::FakeDriver;
    use serde_json::json;

    fn formats() -> BTreeMap<String, Value> {
        serde_json::from_value(json!({
            "A4": [210, 297],
            "A6": [105, 148],
            "A11": [18, 26, "Tiny format"],
            "broken": [0, 10],
            "short": [10],
            "words": ["ten", "twenty"],
            "scalar": 62
        }))
        .unwrap()
    }

    #[test]
    fn named_formats_resolve() {
        let formats = formats();
        let resolver = FormatResolver::new(&formats);
        let a6 = resolver.resolve(&PaperFormat::Named("A6".into())).unwrap();
        assert_eq!((a6.width_mm(), a6.height_mm()), (105.0, 148.0));

        let a11 = resolver.resolve(&PaperFormat::Named("A11".into())).unwrap();
        assert_eq!((a11.width_mm(), a11.height_mm()), (18.0, 26.0));
    }

    #[test]
    fn unknown_name_is_unknown_format() {
        let formats = formats();
        let err = FormatResolver::new(&formats)
            .resolve(&PaperFormat::Named("B5".into()))
            .unwrap_err();
        assert!(matches!(err, PexError::UnknownFormat(ref n) if n == "B5"));
    }

    #[test]
    fn malformed_entries_are_invalid_format() {
        let formats = formats();
        let resolver = FormatResolver::new(&formats);
        for name in ["broken", "short", "words", "scalar"] {
            let err = resolver
                .resolve(&PaperFormat::Named(name.into()))
                .unwrap_err();
            assert!(matches!(err, PexError::InvalidFormat(_)), "{name}: {err}");
        }
    }

    #[test]
    fn configured_names_win_over_pair_syntax() {
        let mut formats = formats();
        formats.insert("4x6".into(), json!([102, 152, "Shipping label"]));
        let resolver = FormatResolver::new(&formats);

        let format = resolver.parse(" 4x6 ").unwrap();
        assert_eq!(format, PaperFormat::Named("4x6".into()));
        let geometry = resolver.resolve(&format).unwrap();
        assert_eq!((geometry.width_mm(), geometry.height_mm()), (102.0, 152.0));

        assert_eq!(
            resolver.parse("5x8").unwrap(),
            PaperFormat::Explicit {
                width_mm: 5.0,
                height_mm: 8.0
            }
        );
        assert_eq!(resolver.parse("A6").unwrap(), PaperFormat::Named("A6".into()));
    }

    #[test]
    fn explicit_pairs_are_validated() {
        let formats = BTreeMap::new();
        let resolver = FormatResolver::new(&formats);
        let ok = resolver
            .resolve(&PaperFormat::Explicit {
                width_mm: 62.0,
                height_mm: 29.0,
            })
            .unwrap();
        assert_eq!(ok.tenths_mm(), (620, 290));

        for (w, h) in [(0.0, 10.0), (10.0, -1.0)] {
            let err = resolver
                .resolve(&PaperFormat::Explicit {
                    width_mm: w,
                    height_mm: h,
                })
                .unwrap_err();
            assert!(matches!(err, PexError::InvalidFormat(_)));
        }
    }

    fn settings() -> Settings {
        Settings {
            printers: [
                ("front-desk".to_string(), "HP LaserJet".to_string()),
                ("label".to_string(), "Zebra GK420d".to_string()),
            ]
            .into_iter()
            .collect(),
            printer_default: Some("label".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn aliases_map_and_unknown_names_pass_through() {
        let settings = settings();
        let resolver = PrinterResolver::new(&settings);
        assert_eq!(resolver.resolve("front-desk"), "HP LaserJet");
        assert_eq!(resolver.resolve("Brother QL"), "Brother QL");
    }

    #[test]
    fn validate_checks_live_enumeration() {
        let settings = settings();
        let resolver = PrinterResolver::new(&settings);
        let driver = FakeDriver::with_printers(&["Zebra GK420d"]);

        assert_eq!(
            resolver.validate(Some("label"), &driver).unwrap(),
            "Zebra GK420d"
        );

        let err = resolver.validate(Some("front-desk"), &driver).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn missing_name_uses_default_or_fails() {
        let driver = FakeDriver::with_printers(&["Zebra GK420d"]);

        let settings = settings();
        let resolver = PrinterResolver::new(&settings);
        assert_eq!(resolver.validate(None, &driver).unwrap(), "Zebra GK420d");

        let bare = Settings::default();
        let resolver = PrinterResolver::new(&bare);
        assert!(matches!(
            resolver.validate(None, &driver),
            Err(PexError::NoPrinterSelected)
        ));
    }
}
