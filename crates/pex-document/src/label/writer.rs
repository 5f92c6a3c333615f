// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label writer: serialise a `LabelLayout` into a one-page PDF with `printpdf` 0.8
// and drop it into the configured temporary directory.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use pex_core::error::Result;
use pex_core::{LabelFont, LabelStyle, PaperGeometry, Settings};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::layout::{LabelLayout, layout_label};

/// Renders text lines into single-page label PDFs.
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    /// Where rendered files are created.
    temp_dir: PathBuf,
}

impl LabelRenderer {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Renderer writing to the OS temporary directory.
    pub fn system_temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Renderer honouring the `temp_dir` setting.
    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.temp_dir {
            Some(dir) => Self::new(dir),
            None => Self::system_temp(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Lay out `lines` and write the PDF to a fresh, uniquely named file.
    ///
    /// The caller owns the returned path and is responsible for removing it.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub fn render<S: AsRef<str>>(
        &self,
        lines: &[S],
        geometry: &PaperGeometry,
        style: &LabelStyle,
    ) -> Result<PathBuf> {
        let layout = layout_label(lines, geometry, style)?;
        if layout.lines.is_empty() {
            warn!("label has no printable text; rendering a blank page");
        }
        let bytes = self.render_bytes(&layout);

        std::fs::create_dir_all(&self.temp_dir)?;
        let path = self.temp_dir.join(unique_file_name());
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(&bytes)?;
        file.flush()?;

        info!(path = %path.display(), bytes = bytes.len(), "label PDF written");
        Ok(path)
    }

    /// Serialise an already computed layout.
    pub fn render_bytes(&self, layout: &LabelLayout) -> Vec<u8> {
        let font = builtin_font(layout.style.font);
        let mut ops: Vec<Op> = Vec::with_capacity(layout.lines.len() * 5);

        for line in &layout.lines {
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(line.x),
                    y: Pt(line.y),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(layout.style.font_size),
                font,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line.text.clone())],
                font,
            });
            ops.push(Op::EndTextSection);
        }

        let page = PdfPage::new(
            Mm(layout.geometry.width_mm() as f32),
            Mm(layout.geometry.height_mm() as f32),
            ops,
        );

        let mut doc = PdfDocument::new("PEX label");
        doc.with_pages(vec![page]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(
            bytes = output.len(),
            warnings = warnings.len(),
            "label serialised"
        );
        output
    }
}

fn builtin_font(font: LabelFont) -> BuiltinFont {
    match font {
        LabelFont::Helvetica => BuiltinFont::Helvetica,
        LabelFont::HelveticaBold => BuiltinFont::HelveticaBold,
    }
}

/// `pex-label-<local timestamp>-<uuid>.pdf`; the uuid keeps concurrent
/// renders within the same second apart.
fn unique_file_name() -> String {
    format!(
        "pex-label-{}-{}.pdf",
        Local::now().format("%Y_%m_%d_%H_%M_%S"),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    fn label_geometry() -> PaperGeometry {
        PaperGeometry::new(62.0, 29.0).unwrap()
    }

    fn media_box(doc: &Document) -> Vec<f32> {
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect()
    }

    #[test]
    fn renders_a_single_page_of_the_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = LabelRenderer::new(dir.path());

        let path = renderer
            .render(&["MODEL-X", "#TAG1"], &label_geometry(), &LabelStyle::default())
            .unwrap();

        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("pex-label-") && name.ends_with(".pdf"));

        let doc = Document::load_mem(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let mb = media_box(&doc);
        assert!((mb[2] - mb[0] - 62.0 * 72.0 / 25.4).abs() < 0.5);
        assert!((mb[3] - mb[1] - 29.0 * 72.0 / 25.4).abs() < 0.5);
    }

    #[test]
    fn consecutive_renders_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = LabelRenderer::new(dir.path());
        let style = LabelStyle::default();

        let first = renderer.render(&["A"], &label_geometry(), &style).unwrap();
        let second = renderer.render(&["A"], &label_geometry(), &style).unwrap();

        assert_ne!(first, second);
        assert!(first.exists() && second.exists());
    }

    #[test]
    fn blank_input_still_produces_a_page() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = LabelRenderer::new(dir.path());
        let path = renderer
            .render(&[""], &label_geometry(), &LabelStyle::default())
            .unwrap();
        let doc = Document::load_mem(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn missing_temp_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("labels").join("out");
        let renderer = LabelRenderer::new(&nested);
        let path = renderer
            .render(&["x"], &label_geometry(), &LabelStyle::default())
            .unwrap();
        assert!(path.starts_with(&nested));
    }

    #[test]
    fn settings_temp_dir_is_used() {
        let settings = Settings {
            temp_dir: Some(PathBuf::from("/var/tmp/pex")),
            ..Settings::default()
        };
        let renderer = LabelRenderer::from_settings(&settings);
        assert_eq!(renderer.temp_dir(), Path::new("/var/tmp/pex"));
    }
}
