//! Record → document-content composition.
//!
//! Everything about what the certificate *says* is decided here, before any
//! drawing: summary pairs, retained table rows, footnote citations, and the
//! variant-dependent footer content. The draw step only places this content
//! on pages, which keeps the behavioural rules testable without parsing PDF
//! output.

use crate::brand::BrandProfile;
use crate::footnotes::{extract_footnotes, strip_footnotes, FootnoteCatalog};
use chrono::NaiveDate;
use coa_core::CertificateRecord;

const MONTHS_ES: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// One retained table row, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComposedRow {
    pub test: String,
    pub spec: String,
    pub result: String,
}

/// The certificate's content, independent of page geometry.
#[derive(Debug, Clone)]
pub(crate) struct ComposedCertificate {
    pub title: String,
    pub summary: Vec<(String, String)>,
    pub rows: Vec<ComposedRow>,
    /// Present only when non-empty and the variant shows observations.
    pub observations: Option<String>,
    /// Catalog entries in citation order; empty when suppressed.
    pub footnotes: Vec<String>,
    /// Fixed sentence replacing observations/footnotes, when the variant asks.
    pub cross_reference: Option<&'static str>,
    pub conclusion: String,
}

/// Reformats a `DD-MM-YYYY` date to the `Mon-YY` short form.
///
/// Anything unparsable is passed through verbatim; blank stays blank.
pub(crate) fn month_year_short(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match NaiveDate::parse_from_str(trimmed, "%d-%m-%Y") {
        Ok(date) => {
            use chrono::Datelike;
            format!(
                "{}-{:02}",
                MONTHS_ES[date.month0() as usize],
                date.year().rem_euclid(100)
            )
        }
        Err(_) => trimmed.to_owned(),
    }
}

fn resolve(value: &str, brand: &BrandProfile, catalog: &mut FootnoteCatalog) -> String {
    if brand.suppress_footnotes {
        strip_footnotes(value)
    } else {
        extract_footnotes(value, catalog)
    }
}

/// Composes the document content for one record under one brand preset.
///
/// Footnote citation indices are assigned in first-occurrence order across
/// the summary fields first, then table rows 1..20; suppressed and hidden
/// rows register nothing.
pub(crate) fn compose(record: &CertificateRecord, brand: &BrandProfile) -> ComposedCertificate {
    let mut catalog = FootnoteCatalog::new();

    let mut summary: Vec<(String, String)> = vec![
        ("PRODUCTO", record.get("PRODUCTO").to_owned()),
        ("PRESENTACIÓN", record.get("PRESENTACION").to_owned()),
        ("LOTE", record.get("LOTE").to_owned()),
        (
            "FORMA FARMACÉUTICA",
            record.get("FORMA_FARMACEUTICA").to_owned(),
        ),
        ("CANTIDAD LOTE", record.get("CANTIDAD").to_owned()),
        (
            "FECHA DE FABRICACIÓN",
            month_year_short(record.get("FECHA_PRODUCCION")),
        ),
        (
            "FECHA DE EXPIRACIÓN",
            month_year_short(record.get("FECHA_VENCIMIENTO")),
        ),
        ("FECHA DE ANÁLISIS", record.get("FECHA_ANALISIS").to_owned()),
        ("FECHA DE EMISIÓN", record.get("FECHA_EMISION").to_owned()),
    ]
    .into_iter()
    .map(|(label, value)| (label.to_owned(), value))
    .collect();

    if !brand.suppress_reference_fields {
        summary.push(("LINEA".to_owned(), record.get("LABORATORIO").to_owned()));
        summary.push(("REFERENCIA".to_owned(), record.get("REFERENCIA").to_owned()));
    }

    for (_, value) in &mut summary {
        *value = resolve(value, brand, &mut catalog);
    }

    let mut rows = Vec::new();
    for row in record.test_rows() {
        if row.is_hidden() || row.is_blank() {
            continue;
        }
        let test = resolve(row.test, brand, &mut catalog);
        let spec = resolve(row.spec, brand, &mut catalog);
        let mut result = resolve(row.result, brand, &mut catalog);

        let note = row.note.trim();
        if !brand.suppress_footnotes && !note.is_empty() {
            let index = catalog.register(note);
            if result.is_empty() {
                result = format!("({index})");
            } else {
                result = format!("{result} ({index})");
            }
        }

        rows.push(ComposedRow { test, spec, result });
    }

    let observations = if brand.cross_reference.is_some() {
        None
    } else {
        let text = record.get("OBSERVACIONES").trim();
        (!text.is_empty()).then(|| text.to_owned())
    };

    let footnotes = if brand.suppress_footnotes {
        Vec::new()
    } else {
        catalog.entries().to_vec()
    };

    ComposedCertificate {
        title: format!("CERTIFICADO DE ANÁLISIS N° {}", record.code()),
        summary,
        rows,
        observations,
        footnotes,
        cross_reference: brand.cross_reference,
        conclusion: record.conclusion().to_owned(),
    }
}

/// The footnote reference list as printed: `(index) TEXT`, uppercased.
pub(crate) fn footnote_display_lines(composed: &ComposedCertificate) -> Vec<String> {
    composed
        .footnotes
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("({}) {}", i + 1, entry.to_uppercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::TemplateVariant;

    fn standard() -> &'static BrandProfile {
        TemplateVariant::Standard.profile()
    }

    fn partner() -> &'static BrandProfile {
        TemplateVariant::PartnerBrand.profile()
    }

    fn ph_record() -> CertificateRecord {
        CertificateRecord::from_fields([
            ("CODIGO", "0001-2025"),
            ("ENSAYO1", "pH"),
            ("ESPECIFICACION1", "6.0-7.0"),
            ("RESULTADO1", "6.5"),
            ("NOTA1", "Medido a 25°C"),
        ])
    }

    #[test]
    fn test_note_becomes_citation_and_footnote() {
        let composed = compose(&ph_record(), standard());
        assert_eq!(
            composed.rows,
            vec![ComposedRow {
                test: "pH".into(),
                spec: "6.0-7.0".into(),
                result: "6.5 (1)".into(),
            }]
        );
        assert_eq!(
            footnote_display_lines(&composed),
            vec!["(1) MEDIDO A 25°C".to_owned()]
        );
    }

    #[test]
    fn test_partner_variant_suppresses_all_footnotes() {
        let mut record = ph_record();
        record.set("PRESENTACION", "Frasco x 100 mL [1: Envase primario]");
        let composed = compose(&record, partner());

        assert_eq!(composed.rows[0].result, "6.5");
        assert!(composed.footnotes.is_empty());
        assert_eq!(
            composed.cross_reference,
            Some("Referencia Certificado de Análisis Pharmadix")
        );
        assert!(composed.observations.is_none());
        // The inline marker is stripped payload and all.
        let presentacion = composed
            .summary
            .iter()
            .find(|(label, _)| label == "PRESENTACIÓN")
            .map(|(_, value)| value.as_str());
        assert_eq!(presentacion, Some("Frasco x 100 mL"));
    }

    #[test]
    fn test_hidden_row_never_appears_nor_registers_its_note() {
        let mut record = ph_record();
        record.set("ENSAYO2", "[OCULTO]Densidad");
        record.set("ESPECIFICACION2", "0.9-1.1");
        record.set("RESULTADO2", "1.0");
        record.set("NOTA2", "No reportar");
        let composed = compose(&record, standard());

        assert_eq!(composed.rows.len(), 1);
        assert_eq!(composed.footnotes, vec!["Medido a 25°C".to_owned()]);
    }

    #[test]
    fn test_blank_row_omitted_partial_row_retained() {
        let mut record = ph_record();
        record.set("ENSAYO2", "   ");
        record.set("ESPECIFICACION2", "");
        record.set("RESULTADO2", " ");
        record.set("ESPECIFICACION3", "Incoloro");
        let composed = compose(&record, standard());

        assert_eq!(composed.rows.len(), 2);
        assert_eq!(composed.rows[1].test, "");
        assert_eq!(composed.rows[1].spec, "Incoloro");
    }

    #[test]
    fn test_citation_order_is_summary_then_rows() {
        let mut record = ph_record();
        record.set("PRODUCTO", "Amoxicilina [1: Materia prima importada]");
        let composed = compose(&record, standard());

        // Summary registered first, so the row's note takes index 2.
        assert_eq!(
            composed.footnotes,
            vec![
                "Materia prima importada".to_owned(),
                "Medido a 25°C".to_owned()
            ]
        );
        assert_eq!(composed.rows[0].result, "6.5 (2)");
        let producto = composed
            .summary
            .iter()
            .find(|(label, _)| label == "PRODUCTO")
            .map(|(_, value)| value.as_str());
        assert_eq!(producto, Some("Amoxicilina (1)"));
    }

    #[test]
    fn test_equal_footnote_text_reuses_index() {
        let mut record = ph_record();
        record.set("ENSAYO2", "Acidez");
        record.set("RESULTADO2", "Cumple");
        record.set("NOTA2", "Medido a 25°C");
        let composed = compose(&record, standard());

        assert_eq!(composed.rows[0].result, "6.5 (1)");
        assert_eq!(composed.rows[1].result, "Cumple (1)");
        assert_eq!(composed.footnotes.len(), 1);
    }

    #[test]
    fn test_reference_fields_follow_variant() {
        let mut record = ph_record();
        record.set("LABORATORIO", "Línea Betalactámicos");
        record.set("REFERENCIA", "OC-2025-114");

        let composed = compose(&record, standard());
        assert_eq!(composed.summary.len(), 11);
        assert_eq!(composed.summary[9].0, "LINEA");

        let partner_composed = compose(&record, partner());
        assert_eq!(partner_composed.summary.len(), 9);
        assert!(partner_composed
            .summary
            .iter()
            .all(|(label, _)| label != "LINEA" && label != "REFERENCIA"));
    }

    #[test]
    fn test_dates_reformat_to_short_month() {
        let mut record = ph_record();
        record.set("FECHA_PRODUCCION", "01-04-2025");
        record.set("FECHA_VENCIMIENTO", "30-11-2027");
        record.set("FECHA_ANALISIS", "15-05-2025");
        let composed = compose(&record, standard());

        let get = |label: &str| {
            composed
                .summary
                .iter()
                .find(|(l, _)| l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("FECHA DE FABRICACIÓN"), "Abr-25");
        assert_eq!(get("FECHA DE EXPIRACIÓN"), "Nov-27");
        // Analysis date is printed verbatim.
        assert_eq!(get("FECHA DE ANÁLISIS"), "15-05-2025");
    }

    #[test]
    fn test_month_year_short_passthrough() {
        assert_eq!(month_year_short(""), "");
        assert_eq!(month_year_short("sin fecha"), "sin fecha");
        assert_eq!(month_year_short("31-12-2024"), "Dic-24");
    }

    #[test]
    fn test_empty_record_composes_blank_document() {
        let composed = compose(&CertificateRecord::new(), standard());
        assert_eq!(composed.title, "CERTIFICADO DE ANÁLISIS N° ");
        assert!(composed.rows.is_empty());
        assert!(composed.observations.is_none());
        assert_eq!(composed.conclusion, "PENDIENTE");
    }

    #[test]
    fn test_observations_kept_verbatim_for_standard() {
        let mut record = ph_record();
        record.set("OBSERVACIONES", "Ver nota (1) del catálogo");
        let composed = compose(&record, standard());
        assert_eq!(
            composed.observations.as_deref(),
            Some("Ver nota (1) del catálogo")
        );
    }
}
