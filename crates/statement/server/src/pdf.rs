//! Statement document assembly.
//!
//! Produces the downloadable A4 statement certifying a report's analysis
//! outcome: branding header, report metadata, the tiered confidence score,
//! the reporter's description, an embedded QR code pointing at the public
//! verification page, the human-readable code and a fixed statement block.
//! Rendering is synchronous and single-attempt; any failure propagates as
//! [`StatementError`].

use chrono::Utc;
use printpdf::{
    BuiltinFont,
    Color,
    Image,
    ImageTransform,
    IndirectFontRef,
    Line,
    Mm,
    PdfDocument,
    PdfDocumentReference,
    PdfLayerReference,
    Point,
    Rgb,
    image_crate::{
        DynamicImage,
        GrayImage,
    },
};
use statement_core::{
    ConfidenceTier,
    Report,
    VerificationCode,
};
use url::Url;

use crate::qr;

/// Product name printed on every statement.
pub const BRAND: &str = "DeepCheck";

const PAGE_W_MM: f32 = 210.0;
const PAGE_H_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
/// Content must stop above the footer line.
const BOTTOM_MM: f32 = 18.0;
const BODY_SIZE: f32 = 10.5;
const LINE_MM: f32 = 5.0;
/// Column where metadata values start, right of their labels.
const VALUE_COL_MM: f32 = 72.0;
/// Rough wrap width for Helvetica at body size across the content area.
const WRAP_COLS: usize = 94;
/// Edge length of the QR image on paper.
const QR_SIDE_MM: f32 = 45.0;

const DISCLAIMER: &str = "This document certifies that the report identified above was \
processed by the DeepCheck automated manipulation-analysis pipeline and records the \
outcome at the time of generation. The confidence score is a statistical estimate \
produced by the analysis models; it is not a legal determination of authenticity. \
Third parties can confirm the provenance of this statement at any time by scanning \
the QR code or entering the verification code on the DeepCheck verification page. \
This statement was generated automatically and is valid without a signature.";

#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("QR encoding failed: {0}")]
    Qr(#[from] qr::QrError),
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn gray() -> Color {
    Color::Rgb(Rgb::new(0.45, 0.45, 0.45, None))
}

/// Render the statement for `report`, embedding `code` and a QR image of
/// `verify_url`, and serialize the document to bytes.
pub fn render_statement(
    report: &Report,
    code: &VerificationCode,
    verify_url: &Url,
) -> Result<Vec<u8>, StatementError> {
    let mut w = DocWriter::new(&format!("{BRAND} Verification Statement"))?;

    // Branding header
    w.text_at_size(BRAND, 20.0, true, None);
    w.advance(8.5);
    w.text_at_size("AI Analysis Verification Statement", 13.0, false, Some(gray()));
    w.advance(7.0);
    w.rule();

    // Report metadata
    w.heading("Report details");
    w.labeled("Report ID", &report.id);
    w.labeled("Title", &report.title);
    w.labeled("Status", report.status.label());
    w.labeled("Content type", report.content_type.label());
    w.labeled(
        "Submitted",
        &report.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    );
    w.advance(4.0);

    // Analysis outcome with the tier in its display color
    w.heading("Analysis outcome");
    w.labeled(
        "Manipulation confidence",
        &format!("{:.0}%", report.confidence_score),
    );
    let tier = ConfidenceTier::from_score(report.confidence_score);
    let (r, g, b) = tier.rgb();
    w.text_at_size(
        &format!("Assessment: {} likelihood of manipulation", tier.label()),
        BODY_SIZE,
        true,
        Some(Color::Rgb(Rgb::new(r, g, b, None))),
    );
    w.advance(LINE_MM + 4.0);

    // Reporter description
    if !report.description.trim().is_empty() {
        w.heading("Reporter description");
        for line in wrap_text(&report.description, WRAP_COLS) {
            w.body_line(&line);
        }
        w.advance(4.0);
    }

    // QR block with the human-readable code
    let raster = qr::rasterize(verify_url.as_str())?;
    w.qr_block(&raster, code)?;

    // Fixed statement block
    w.heading("Statement");
    for line in wrap_text(DISCLAIMER, WRAP_COLS) {
        w.small_line(&line);
    }

    w.finish()
}

struct DocWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline cursor, measured from the bottom of the page.
    y: f32,
    generated_at: String,
}

impl DocWriter {
    fn new(title: &str) -> Result<Self, StatementError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W_MM), Mm(PAGE_H_MM), "content");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| StatementError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| StatementError::Render(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        let writer = Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_H_MM - MARGIN_MM,
            generated_at: Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        };
        writer.footer();
        Ok(writer)
    }

    fn footer(&self) {
        self.layer.set_fill_color(gray());
        self.layer.use_text(
            format!("Generated {} by {BRAND}", self.generated_at),
            8.0,
            Mm(MARGIN_MM),
            Mm(10.0),
            &self.regular,
        );
        self.layer.set_fill_color(black());
    }

    fn break_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H_MM - MARGIN_MM;
        self.footer();
    }

    fn ensure_space(&mut self, needed_mm: f32) {
        if self.y - needed_mm < BOTTOM_MM {
            self.break_page();
        }
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    /// Write one line at the left margin in the given size, optionally
    /// colored; the cursor does not advance, callers decide the leading.
    fn text_at_size(&mut self, text: &str, size: f32, bold: bool, color: Option<Color>) {
        self.ensure_space(size * 0.5);
        let colored = color.is_some();
        if let Some(color) = color {
            self.layer.set_fill_color(color);
        }
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
        if colored {
            self.layer.set_fill_color(black());
        }
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(12.0);
        self.text_at_size(text, 12.0, true, None);
        self.advance(7.0);
    }

    fn labeled(&mut self, label: &str, value: &str) {
        self.ensure_space(LINE_MM);
        self.layer
            .use_text(label, BODY_SIZE, Mm(MARGIN_MM), Mm(self.y), &self.bold);
        self.layer
            .use_text(value, BODY_SIZE, Mm(VALUE_COL_MM), Mm(self.y), &self.regular);
        self.advance(LINE_MM + 1.0);
    }

    fn body_line(&mut self, text: &str) {
        self.ensure_space(LINE_MM);
        self.text_at_size(text, BODY_SIZE, false, None);
        self.advance(LINE_MM);
    }

    fn small_line(&mut self, text: &str) {
        self.ensure_space(4.2);
        self.text_at_size(text, 8.5, false, Some(gray()));
        self.advance(4.2);
    }

    fn rule(&mut self) {
        self.ensure_space(4.0);
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(self.y)), false),
                (Point::new(Mm(PAGE_W_MM - MARGIN_MM), Mm(self.y)), false),
            ],
            is_closed: false,
        };
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.6, 0.6, 0.6, None)));
        self.layer.set_outline_thickness(0.6);
        self.layer.add_line(line);
        self.advance(8.0);
    }

    fn qr_block(
        &mut self,
        raster: &qr::QrRaster,
        code: &VerificationCode,
    ) -> Result<(), StatementError> {
        self.ensure_space(QR_SIDE_MM + 12.0);

        let buffer = GrayImage::from_raw(raster.size_px, raster.size_px, raster.pixels.clone())
            .ok_or_else(|| StatementError::Render("QR buffer dimensions mismatch".to_string()))?;
        let image = Image::from_dynamic_image(&DynamicImage::ImageLuma8(buffer));

        // Pick the dpi that maps the raster onto QR_SIDE_MM of paper
        let dpi = raster.size_px as f32 * 25.4 / QR_SIDE_MM;
        let image_bottom = self.y - QR_SIDE_MM;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(image_bottom)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        // Human-readable code to the right of the symbol
        let text_x = MARGIN_MM + QR_SIDE_MM + 10.0;
        self.layer.use_text(
            "Verification code",
            9.0,
            Mm(text_x),
            Mm(self.y - 10.0),
            &self.bold,
        );
        self.layer.use_text(
            code.as_str(),
            14.0,
            Mm(text_x),
            Mm(self.y - 18.0),
            &self.regular,
        );
        self.layer.set_fill_color(gray());
        self.layer.use_text(
            "Scan the QR code or enter this code on the verification page.",
            8.5,
            Mm(text_x),
            Mm(self.y - 25.0),
            &self.regular,
        );
        self.layer.set_fill_color(black());

        self.y = image_bottom - 8.0;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, StatementError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| StatementError::Render(e.to_string()))
    }
}

/// Greedy word wrap preserving paragraph breaks; words longer than the
/// wrap width are hard-split.
fn wrap_text(text: &str, max_cols: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            while word.chars().count() > max_cols {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split_at = word
                    .char_indices()
                    .nth(max_cols)
                    .map_or(word.len(), |(i, _)| i);
                lines.push(word[..split_at].to_string());
                word = &word[split_at..];
            }
            if current.is_empty() {
                current.push_str(word);
            } else if current.chars().count() + 1 + word.chars().count() <= max_cols {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        lines.push(current);
    }
    // Trim a trailing blank produced by a trailing newline
    while lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}
