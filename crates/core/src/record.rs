//! Certificate record model.
//!
//! A record is a flat mapping of fixed field names to text values, exactly as
//! it lives in the backing sheet: one row per analysed batch, with up to 20
//! test-row column families. Unknown keys are ignored; missing keys read as
//! the empty string, so downstream consumers never fail on absent optional
//! fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of test-row column families (`ENSAYO1..ENSAYO20`).
pub const TEST_ROW_COUNT: usize = 20;

/// Reserved prefix marking a test row as hidden from rendered output.
pub const HIDDEN_PREFIX: &str = "[OCULTO]";

/// Conclusion value used when the field is absent.
pub const DEFAULT_CONCLUSION: &str = "PENDIENTE";

/// One row of the analysis table, borrowed from its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRow<'a> {
    pub test: &'a str,
    pub spec: &'a str,
    pub result: &'a str,
    pub note: &'a str,
}

impl TestRow<'_> {
    /// Whether the row is hidden by the reserved test-name prefix.
    pub fn is_hidden(&self) -> bool {
        self.test.starts_with(HIDDEN_PREFIX)
    }

    /// Whether all of test/spec/result are empty after trimming.
    ///
    /// The structured note does not count: a note on an otherwise blank row
    /// has nothing to attach to.
    pub fn is_blank(&self) -> bool {
        self.test.trim().is_empty() && self.spec.trim().is_empty() && self.result.trim().is_empty()
    }
}

/// A certificate-of-analysis record: field name → text value.
///
/// The map is ordered so that serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateRecord {
    fields: BTreeMap<String, String>,
}

impl CertificateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from `(name, value)` pairs. Later duplicates win.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value for a field, or `""` when absent.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Sets a field value, replacing any previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// The record's `CODIGO` identity field.
    pub fn code(&self) -> &str {
        self.get("CODIGO")
    }

    /// The conclusion value, defaulting to `PENDIENTE` when absent or blank.
    pub fn conclusion(&self) -> &str {
        let value = self.get("CONCLUSION").trim();
        if value.is_empty() {
            DEFAULT_CONCLUSION
        } else {
            value
        }
    }

    /// The `i`-th test-row family, for `i` in `1..=20`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside `1..=TEST_ROW_COUNT`; callers iterate the
    /// fixed range.
    pub fn test_row(&self, index: usize) -> TestRow<'_> {
        assert!(
            (1..=TEST_ROW_COUNT).contains(&index),
            "test row index out of range: {index}"
        );
        TestRow {
            test: self.get(&format!("ENSAYO{index}")),
            spec: self.get(&format!("ESPECIFICACION{index}")),
            result: self.get(&format!("RESULTADO{index}")),
            note: self.get(&format!("NOTA{index}")),
        }
    }

    /// Iterates the test rows in fixed index order `1..=20`.
    pub fn test_rows(&self) -> impl Iterator<Item = TestRow<'_>> {
        (1..=TEST_ROW_COUNT).map(|i| self.test_row(i))
    }

    /// True when any field value contains `needle` case-insensitively.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.fields
            .values()
            .any(|v| v.to_lowercase().contains(&needle))
    }
}

/// The fixed column order of the backing sheet.
///
/// Head columns first, then the four-column family for each of the 20 test
/// rows. New records are written with exactly this key set.
pub fn column_order() -> Vec<String> {
    let mut cols: Vec<String> = [
        "CODIGO",
        "PRODUCTO",
        "PRESENTACION",
        "LOTE",
        "VERSION_ESPECIFICACION",
        "FORMA_FARMACEUTICA",
        "CANTIDAD",
        "FECHA_PRODUCCION",
        "FECHA_VENCIMIENTO",
        "FECHA_ANALISIS",
        "FECHA_EMISION",
        "LABORATORIO",
        "REFERENCIA",
        "FECHA_DE_REGISTRO",
        "CONCLUSION",
        "OBSERVACIONES",
        "CREADO_POR",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    for i in 1..=TEST_ROW_COUNT {
        cols.push(format!("ENSAYO{i}"));
        cols.push(format!("ESPECIFICACION{i}"));
        cols.push(format!("RESULTADO{i}"));
        cols.push(format!("NOTA{i}"));
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_read_as_empty() {
        let record = CertificateRecord::new();
        assert_eq!(record.get("PRODUCTO"), "");
        assert_eq!(record.code(), "");
    }

    #[test]
    fn test_conclusion_defaults_to_pendiente() {
        let mut record = CertificateRecord::new();
        assert_eq!(record.conclusion(), "PENDIENTE");
        record.set("CONCLUSION", "  ");
        assert_eq!(record.conclusion(), "PENDIENTE");
        record.set("CONCLUSION", "APROBADO");
        assert_eq!(record.conclusion(), "APROBADO");
    }

    #[test]
    fn test_test_row_accessor() {
        let record = CertificateRecord::from_fields([
            ("ENSAYO1", "pH"),
            ("ESPECIFICACION1", "6.0-7.0"),
            ("RESULTADO1", "6.5"),
            ("NOTA1", "Medido a 25°C"),
        ]);
        let row = record.test_row(1);
        assert_eq!(row.test, "pH");
        assert_eq!(row.spec, "6.0-7.0");
        assert_eq!(row.result, "6.5");
        assert_eq!(row.note, "Medido a 25°C");
        assert!(!row.is_hidden());
        assert!(!row.is_blank());
        assert!(record.test_row(2).is_blank());
    }

    #[test]
    fn test_hidden_prefix_detection() {
        let record = CertificateRecord::from_fields([("ENSAYO3", "[OCULTO]Densidad")]);
        assert!(record.test_row(3).is_hidden());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let record = CertificateRecord::from_fields([("PRODUCTO", "Amoxicilina 500")]);
        assert!(record.matches_search("amoxi"));
        assert!(record.matches_search("500"));
        assert!(!record.matches_search("ibuprofeno"));
    }

    #[test]
    fn test_column_order_has_full_families() {
        let cols = column_order();
        assert_eq!(cols.len(), 17 + TEST_ROW_COUNT * 4);
        assert_eq!(cols[0], "CODIGO");
        assert!(cols.contains(&"NOTA20".to_string()));
    }
}
