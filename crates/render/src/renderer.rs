//! PDF composition of a certificate of analysis.
//!
//! One synchronous pass over the composed content: header chrome and title,
//! summary block, the three-column test table with per-page border segments,
//! then the variant-dependent footer content and the conclusion line. Output
//! is deterministic: document dates are pinned and text metrics come from
//! the fixed estimates in [`crate::layout`].

use crate::assets::RenderAssets;
use crate::brand::{BrandProfile, TemplateVariant};
use crate::compose::{compose, footnote_display_lines, ComposedCertificate};
use crate::error::{RenderError, RenderResult};
use crate::layout::{
    self, chars_per_line, measure_row, paginate_rows, text_width_mm, wrap_text, COL_RESULT,
    COL_SPEC, COL_TEST, CONTENT_BOTTOM, CONTENT_TOP, CONTENT_WIDTH, FOOTNOTE_FONT_SIZE,
    LINE_HEIGHT, MARGIN_LEFT, PAGE_HEIGHT, PAGE_WIDTH, SUMMARY_FONT_SIZE, TABLE_FONT_SIZE,
    TABLE_HEADER_FONT_SIZE, TABLE_HEADER_HEIGHT, TABLE_WIDTH,
};
use printpdf::*;
use regex::Regex;
use std::sync::LazyLock;

const DEPARTMENT_LINE: &str = "DEPARTAMENTO DE CONTROL DE CALIDAD";
const LAYER_NAME: &str = "Contenido";
/// Label column width in the summary block.
const SUMMARY_LABEL_WIDTH: f32 = 60.0;
/// Cell text inset from the column edge.
const CELL_PAD: f32 = 1.5;

/// Parenthesised citation numerals rendered superscript in observations.
static CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+\)").expect("invalid citation pattern"));

/// Renders one certificate to PDF bytes.
///
/// Pure with respect to its inputs: identical `(record, variant, assets)`
/// yield byte-identical output, and nothing is retained between calls. On
/// error no partial document is returned.
pub fn render(
    record: &coa_core::CertificateRecord,
    variant: TemplateVariant,
    assets: &RenderAssets,
) -> RenderResult<Vec<u8>> {
    let brand = variant.profile();
    let composed = compose(record, brand);

    let (doc, first_page, first_layer) = PdfDocument::new(
        composed.title.clone(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        LAYER_NAME,
    );
    // Pinned metadata keeps repeated renders byte-identical; the record's own
    // date fields are the only dates the document carries visibly.
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance::default()))
        .with_creation_date(time::OffsetDateTime::UNIX_EPOCH)
        .with_mod_date(time::OffsetDateTime::UNIX_EPOCH);

    let fonts = FontSet::register(&doc, assets)?;
    let layer = doc.get_page(first_page).get_layer(first_layer);

    let mut composer = Composer {
        doc,
        layer,
        fonts,
        brand,
        assets,
        y: CONTENT_TOP,
    };
    composer.draw_chrome();
    composer.draw_certificate(&composed);

    composer.doc.save_to_bytes().map_err(RenderError::from)
}

/// The three font styles one document needs.
struct FontSet {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl FontSet {
    /// Registers the DejaVu family, falling back per style to the built-in
    /// Helvetica equivalents. Only the total absence of a usable font fails.
    fn register(doc: &PdfDocumentReference, assets: &RenderAssets) -> RenderResult<Self> {
        Ok(Self {
            regular: add_font(doc, assets.font_regular.as_deref(), BuiltinFont::Helvetica)?,
            bold: add_font(doc, assets.font_bold.as_deref(), BuiltinFont::HelveticaBold)?,
            italic: add_font(
                doc,
                assets.font_italic.as_deref(),
                BuiltinFont::HelveticaOblique,
            )?,
        })
    }
}

fn add_font(
    doc: &PdfDocumentReference,
    external: Option<&[u8]>,
    fallback: BuiltinFont,
) -> RenderResult<IndirectFontRef> {
    if let Some(bytes) = external {
        match doc.add_external_font(std::io::Cursor::new(bytes.to_vec())) {
            Ok(font) => return Ok(font),
            Err(err) => tracing::warn!("external font rejected, using {fallback:?}: {err}"),
        }
    }
    doc.add_builtin_font(fallback)
        .map_err(|err| RenderError::MissingResource(format!("no usable font: {err}")))
}

/// Drawing state for one document: current layer and vertical cursor.
struct Composer<'a> {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: FontSet,
    brand: &'static BrandProfile,
    assets: &'a RenderAssets,
    /// Baseline cursor in millimetres from the page bottom.
    y: f32,
}

impl Composer<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = CONTENT_TOP;
        self.draw_chrome();
    }

    /// Breaks to a new page unless `needed` millimetres remain.
    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < CONTENT_BOTTOM {
            self.new_page();
        }
    }

    // ── page chrome ─────────────────────────────────────────────────────

    /// Brand header and footer drawn on every page.
    fn draw_chrome(&mut self) {
        self.draw_logo();

        // Double rule closing the header band.
        let rule_y = PAGE_HEIGHT - 30.0;
        self.rule(MARGIN_LEFT, rule_y, PAGE_WIDTH - MARGIN_RIGHT_EDGE, rule_y);
        self.rule(
            MARGIN_LEFT,
            rule_y - 0.5,
            PAGE_WIDTH - MARGIN_RIGHT_EDGE,
            rule_y - 0.5,
        );

        // Footer: grey rule and right-aligned address block.
        self.set_grey(true);
        self.rule(MARGIN_LEFT, 20.0, PAGE_WIDTH - MARGIN_RIGHT_EDGE, 20.0);
        let right_edge = PAGE_WIDTH - MARGIN_RIGHT_EDGE;
        self.text_right(self.brand.address_lines[0], 8.0, right_edge, 15.0, Style::Italic);
        self.text_right(self.brand.address_lines[1], 8.0, right_edge, 10.5, Style::Italic);
        self.set_grey(false);
    }

    fn draw_logo(&mut self) {
        if let Some(bytes) = self.assets.logo(self.brand.logo_file) {
            match decode_logo(bytes) {
                Ok(image) => {
                    let width_px = image.image.width.0.max(1) as f32;
                    let native_width_mm = width_px * 25.4 / LOGO_DPI;
                    let scale = self.brand.logo_width_mm / native_width_mm;
                    image.add_to_layer(
                        self.layer.clone(),
                        ImageTransform {
                            translate_x: Some(Mm(LOGO_X)),
                            translate_y: Some(Mm(LOGO_Y)),
                            scale_x: Some(scale),
                            scale_y: Some(scale),
                            dpi: Some(LOGO_DPI),
                            ..Default::default()
                        },
                    );
                    return;
                }
                Err(err) => {
                    tracing::warn!("brand logo unusable, using textual fallback: {err}");
                }
            }
        }
        if let Some(fallback) = self.brand.logo_fallback {
            self.text_right(
                fallback,
                14.0,
                PAGE_WIDTH - MARGIN_RIGHT_EDGE,
                PAGE_HEIGHT - 16.0,
                Style::Bold,
            );
        }
    }

    // ── primitives ──────────────────────────────────────────────────────

    fn font(&self, style: Style) -> &IndirectFontRef {
        match style {
            Style::Regular => &self.fonts.regular,
            Style::Bold => &self.fonts.bold,
            Style::Italic => &self.fonts.italic,
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, y: f32, style: Style) {
        self.layer.use_text(text, size, Mm(x), Mm(y), self.font(style));
    }

    fn text(&self, text: &str, size: f32, x: f32, style: Style) {
        self.text_at(text, size, x, self.y, style);
    }

    fn text_right(&self, text: &str, size: f32, right_edge: f32, y: f32, style: Style) {
        let x = right_edge - text_width_mm(text, size);
        self.text_at(text, size, x, y, style);
    }

    fn text_centered(&self, text: &str, size: f32, y: f32, style: Style) {
        let x = (PAGE_WIDTH - text_width_mm(text, size)) / 2.0;
        self.text_at(text, size, x, y, style);
    }

    fn rule(&self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.layer.set_outline_thickness(0.2);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x1), Mm(y1)), false),
                (Point::new(Mm(x2), Mm(y2)), false),
            ],
            is_closed: false,
        });
    }

    fn rect_outline(&self, x: f32, top: f32, width: f32, height: f32) {
        self.layer.set_outline_thickness(0.2);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(x), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top - height)), false),
                (Point::new(Mm(x), Mm(top - height)), false),
            ],
            is_closed: true,
        });
    }

    fn set_grey(&self, on: bool) {
        let level = if on { 0.5 } else { 0.0 };
        let colour = Color::Rgb(Rgb::new(level, level, level, None));
        self.layer.set_fill_color(colour.clone());
        self.layer.set_outline_color(colour);
    }

    // ── document sections ───────────────────────────────────────────────

    fn draw_certificate(&mut self, composed: &ComposedCertificate) {
        self.draw_title(composed);
        self.draw_summary(composed);
        self.draw_table(composed);
        self.draw_footer_content(composed);
        self.draw_conclusion(composed);
    }

    fn draw_title(&mut self, composed: &ComposedCertificate) {
        self.text_centered(DEPARTMENT_LINE, SUMMARY_FONT_SIZE, self.y, Style::Regular);
        self.y -= 6.0;
        self.text_centered(&composed.title, 10.0, self.y, Style::Bold);
        self.y -= 8.0;
        self.y -= 3.0;
    }

    fn draw_summary(&mut self, composed: &ComposedCertificate) {
        for (label, value) in &composed.summary {
            self.ensure_space(LINE_HEIGHT);
            self.text(label, SUMMARY_FONT_SIZE, MARGIN_LEFT, Style::Bold);
            self.text(
                &format!(": {value}"),
                SUMMARY_FONT_SIZE,
                MARGIN_LEFT + SUMMARY_LABEL_WIDTH,
                Style::Regular,
            );
            self.y -= LINE_HEIGHT;
        }
        self.y -= 4.0;
    }

    fn draw_table(&mut self, composed: &ComposedCertificate) {
        // Keep the header attached to at least one data line.
        self.ensure_space(TABLE_HEADER_HEIGHT + LINE_HEIGHT);
        self.draw_table_header();

        let measured: Vec<_> = composed
            .rows
            .iter()
            .map(|row| measure_row(&row.test, &row.spec, &row.result))
            .collect();
        let heights: Vec<f32> = measured.iter().map(|row| row.height).collect();
        let segments = paginate_rows(
            &heights,
            self.y - CONTENT_BOTTOM,
            CONTENT_TOP - CONTENT_BOTTOM,
        );

        for (segment_index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                continue;
            }
            if segment_index > 0 {
                self.new_page();
            }
            let segment_top = self.y;
            for &row_index in segment {
                self.draw_table_row(&measured[row_index]);
            }
            self.draw_table_border(segment_top, segment_top - self.y);
        }
        self.y -= LINE_HEIGHT;
    }

    fn draw_table_header(&mut self) {
        let top = self.y;
        let baseline = top - TABLE_HEADER_HEIGHT + 1.5;
        let columns = [
            ("ENSAYOS", MARGIN_LEFT, COL_TEST),
            ("ESPECIFICACIONES", MARGIN_LEFT + COL_TEST, COL_SPEC),
            (
                "RESULTADOS",
                MARGIN_LEFT + COL_TEST + COL_SPEC,
                COL_RESULT,
            ),
        ];
        for (label, x, width) in columns {
            let centered = x + (width - text_width_mm(label, TABLE_HEADER_FONT_SIZE)) / 2.0;
            self.text_at(label, TABLE_HEADER_FONT_SIZE, centered, baseline, Style::Bold);
        }
        self.draw_table_border(top, TABLE_HEADER_HEIGHT);
        self.y = top - TABLE_HEADER_HEIGHT;
    }

    /// One measured row at the current cursor; advances the cursor by the
    /// row height. Page fit was decided by pagination, never here.
    fn draw_table_row(&mut self, row: &layout::MeasuredRow) {
        let top = self.y;
        let cells = [
            (&row.test_lines, MARGIN_LEFT + CELL_PAD, CellAlign::Left, COL_TEST),
            (
                &row.spec_lines,
                MARGIN_LEFT + COL_TEST + CELL_PAD,
                CellAlign::Left,
                COL_SPEC,
            ),
            (
                &row.result_lines,
                MARGIN_LEFT + COL_TEST + COL_SPEC,
                CellAlign::Centre,
                COL_RESULT,
            ),
        ];
        for (lines, x, align, width) in cells {
            for (line_index, line) in lines.iter().enumerate() {
                let baseline = top - LINE_HEIGHT * (line_index as f32 + 1.0) + 1.2;
                let x = match align {
                    CellAlign::Left => x,
                    CellAlign::Centre => {
                        x + (width - text_width_mm(line, TABLE_FONT_SIZE)) / 2.0
                    }
                };
                self.text_at(line, TABLE_FONT_SIZE, x, baseline, Style::Regular);
            }
        }
        self.y = top - row.height;
    }

    /// Border for one page segment of the table: the outer rectangle and the
    /// two interior column separators. No rules between data rows.
    fn draw_table_border(&self, top: f32, height: f32) {
        self.rect_outline(MARGIN_LEFT, top, TABLE_WIDTH, height);
        for x in [MARGIN_LEFT + COL_TEST, MARGIN_LEFT + COL_TEST + COL_SPEC] {
            self.rule(x, top, x, top - height);
        }
    }

    fn draw_footer_content(&mut self, composed: &ComposedCertificate) {
        if let Some(sentence) = composed.cross_reference {
            let budget = chars_per_line(CONTENT_WIDTH, 10.0);
            for line in wrap_text(sentence, budget) {
                self.ensure_space(6.0);
                self.text(&line, 10.0, MARGIN_LEFT, Style::Regular);
                self.y -= 6.0;
            }
            self.y -= 3.0;
            return;
        }

        if let Some(observations) = &composed.observations {
            let text = format!("OBSERVACIONES: {observations}");
            let budget = chars_per_line(CONTENT_WIDTH, SUMMARY_FONT_SIZE);
            for line in wrap_text(&text, budget) {
                self.ensure_space(LINE_HEIGHT);
                self.draw_citation_line(&line, SUMMARY_FONT_SIZE);
                self.y -= LINE_HEIGHT;
            }
            self.y -= 3.0;
        }

        let reference_lines = footnote_display_lines(composed);
        if !reference_lines.is_empty() {
            let budget = chars_per_line(CONTENT_WIDTH, FOOTNOTE_FONT_SIZE);
            for entry in reference_lines {
                for line in wrap_text(&entry, budget) {
                    self.ensure_space(4.0);
                    self.text(&line, FOOTNOTE_FONT_SIZE, MARGIN_LEFT, Style::Italic);
                    self.y -= 4.0;
                }
            }
            self.y -= 3.0;
        }
    }

    /// Draws a line of prose with parenthesised citation numerals raised and
    /// reduced. A pure style transform: numerals are not looked up anywhere.
    fn draw_citation_line(&mut self, line: &str, size: f32) {
        let small = size * 0.7;
        let mut x = MARGIN_LEFT;
        let mut consumed = 0;

        for citation in CITATION.find_iter(line) {
            let before = &line[consumed..citation.start()];
            if !before.is_empty() {
                self.text(before, size, x, Style::Regular);
                x += text_width_mm(before, size);
            }
            self.text_at(citation.as_str(), small, x, self.y + 1.5, Style::Regular);
            x += text_width_mm(citation.as_str(), small);
            consumed = citation.end();
        }

        let rest = &line[consumed..];
        if !rest.is_empty() {
            self.text(rest, size, x, Style::Regular);
        }
    }

    fn draw_conclusion(&mut self, composed: &ComposedCertificate) {
        self.ensure_space(LINE_HEIGHT + 3.0);
        self.y -= 3.0;
        self.text("CONCLUSIÓN:", SUMMARY_FONT_SIZE, MARGIN_LEFT, Style::Bold);
        self.text(
            &composed.conclusion,
            SUMMARY_FONT_SIZE,
            MARGIN_LEFT + 30.0,
            Style::Regular,
        );
        self.y -= LINE_HEIGHT;
    }
}

#[derive(Clone, Copy)]
enum Style {
    Regular,
    Bold,
    Italic,
}

#[derive(Clone, Copy)]
enum CellAlign {
    Left,
    Centre,
}

const MARGIN_RIGHT_EDGE: f32 = layout::MARGIN_RIGHT;
const LOGO_X: f32 = 155.0;
const LOGO_Y: f32 = PAGE_HEIGHT - 22.0;
const LOGO_DPI: f32 = 300.0;

fn decode_logo(bytes: &[u8]) -> Result<Image, image_crate::ImageError> {
    let decoder = image_crate::codecs::png::PngDecoder::new(std::io::Cursor::new(bytes))?;
    Ok(Image::try_from(decoder)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coa_core::CertificateRecord;

    fn sample_record() -> CertificateRecord {
        CertificateRecord::from_fields([
            ("CODIGO", "0012-2025"),
            ("PRODUCTO", "Amoxicilina 500 mg"),
            ("LOTE", "L-774"),
            ("FECHA_PRODUCCION", "01-04-2025"),
            ("FECHA_VENCIMIENTO", "30-11-2027"),
            ("ENSAYO1", "pH"),
            ("ESPECIFICACION1", "6.0-7.0"),
            ("RESULTADO1", "6.5"),
            ("NOTA1", "Medido a 25°C"),
            ("OBSERVACIONES", "Cumple especificación vigente (1)"),
            ("CONCLUSION", "APROBADO"),
        ])
    }

    #[test]
    fn test_render_produces_a_pdf() {
        let bytes = render(
            &sample_record(),
            TemplateVariant::Standard,
            &RenderAssets::empty(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let record = sample_record();
        let assets = RenderAssets::empty();
        let first = render(&record, TemplateVariant::Standard, &assets).unwrap();
        let second = render(&record, TemplateVariant::Standard, &assets).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_empty_record_does_not_fail() {
        let bytes = render(
            &CertificateRecord::new(),
            TemplateVariant::PartnerBrand,
            &RenderAssets::empty(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_many_long_rows_grows_output() {
        let mut record = sample_record();
        let filler = "resultado conforme a la monografía vigente, ver protocolo analítico ".repeat(4);
        for i in 2..=20 {
            record.set(format!("ENSAYO{i}"), format!("Ensayo {i}"));
            record.set(format!("ESPECIFICACION{i}"), filler.clone());
            record.set(format!("RESULTADO{i}"), "Cumple");
        }
        let short = render(&sample_record(), TemplateVariant::Standard, &RenderAssets::empty())
            .unwrap();
        let long = render(&record, TemplateVariant::Standard, &RenderAssets::empty()).unwrap();
        assert!(long.len() > short.len());
    }

    #[test]
    fn test_bad_logo_bytes_fall_back_to_text() {
        let assets = RenderAssets::empty().with_logo("agrovet_logo.png", b"not a png".to_vec());
        let bytes = render(&sample_record(), TemplateVariant::PartnerBrand, &assets).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_variants_differ_in_output() {
        let record = sample_record();
        let assets = RenderAssets::empty();
        let standard = render(&record, TemplateVariant::Standard, &assets).unwrap();
        let partner = render(&record, TemplateVariant::PartnerBrand, &assets).unwrap();
        assert_ne!(standard, partner);
    }
}
