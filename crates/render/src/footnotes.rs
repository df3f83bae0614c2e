//! Footnote catalog and inline-marker extraction.
//!
//! Field values may embed annotations with the marker syntax `[N: text]`.
//! During one render the payloads accumulate into a catalog whose position
//! assigns the citation index; equal texts collapse to one entry. The catalog
//! lives for exactly one document and is owned by the render call.

use regex::Regex;
use std::sync::LazyLock;

/// Inline annotation marker: `[N: payload]`, `N` one or more digits.
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*\d+\s*:\s*([^\]]*?)\s*\]").expect("invalid footnote marker pattern")
});

/// Ordered, deduplicated footnote texts for one rendered document.
///
/// A footnote's 1-based position is its citation index; first occurrence
/// order decides assignment, and equal texts reuse the existing index.
#[derive(Debug, Default)]
pub struct FootnoteCatalog {
    entries: Vec<String>,
}

impl FootnoteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a footnote text and returns its 1-based citation index.
    pub fn register(&mut self, text: &str) -> usize {
        if let Some(position) = self.entries.iter().position(|entry| entry == text) {
            return position + 1;
        }
        self.entries.push(text.to_owned());
        self.entries.len()
    }

    /// Entries in citation order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replaces each inline marker with its parenthesised citation index,
/// registering payloads in the catalog.
///
/// The digits inside the marker do not participate in identity; the emitted
/// index always comes from the catalog. Markers with an empty payload are
/// stripped without registering anything.
pub fn extract_footnotes(value: &str, catalog: &mut FootnoteCatalog) -> String {
    let replaced = MARKER.replace_all(value, |caps: &regex::Captures<'_>| {
        let payload = caps[1].trim();
        if payload.is_empty() {
            String::new()
        } else {
            format!("({})", catalog.register(payload))
        }
    });
    replaced.trim().to_owned()
}

/// Strips inline markers and their payloads entirely, emitting no citation.
/// Used by variants that suppress footnotes.
pub fn strip_footnotes(value: &str) -> String {
    MARKER.replace_all(value, "").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_dedups_by_exact_text() {
        let mut catalog = FootnoteCatalog::new();
        assert_eq!(catalog.register("Medido a 25°C"), 1);
        assert_eq!(catalog.register("Según USP 43"), 2);
        assert_eq!(catalog.register("Medido a 25°C"), 1);
        assert_eq!(catalog.entries().len(), 2);
    }

    #[test]
    fn test_extract_replaces_marker_with_citation() {
        let mut catalog = FootnoteCatalog::new();
        let out = extract_footnotes("6.5 [1: Medido a 25°C]", &mut catalog);
        assert_eq!(out, "6.5 (1)");
        assert_eq!(catalog.entries(), ["Medido a 25°C"]);
    }

    #[test]
    fn test_extract_marker_digits_do_not_choose_index() {
        let mut catalog = FootnoteCatalog::new();
        let out = extract_footnotes("Cumple [7: Según USP 43]", &mut catalog);
        assert_eq!(out, "Cumple (1)");
    }

    #[test]
    fn test_extract_reuses_index_for_equal_payload() {
        let mut catalog = FootnoteCatalog::new();
        extract_footnotes("A [1: misma nota]", &mut catalog);
        let out = extract_footnotes("B [2: misma nota]", &mut catalog);
        assert_eq!(out, "B (1)");
        assert_eq!(catalog.entries().len(), 1);
    }

    #[test]
    fn test_extract_multiple_markers_in_one_value() {
        let mut catalog = FootnoteCatalog::new();
        let out = extract_footnotes("X [1: nota a] y [2: nota b]", &mut catalog);
        assert_eq!(out, "X (1) y (2)");
    }

    #[test]
    fn test_extract_empty_payload_strips_marker() {
        let mut catalog = FootnoteCatalog::new();
        let out = extract_footnotes("6.5 [1:  ]", &mut catalog);
        assert_eq!(out, "6.5");
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_strip_removes_marker_and_payload() {
        assert_eq!(strip_footnotes("6.5 [1: Medido a 25°C]"), "6.5");
        assert_eq!(strip_footnotes("sin marcadores"), "sin marcadores");
    }

    #[test]
    fn test_plain_brackets_are_not_markers() {
        let mut catalog = FootnoteCatalog::new();
        let out = extract_footnotes("[OCULTO]Densidad [lote B]", &mut catalog);
        assert_eq!(out, "[OCULTO]Densidad [lote B]");
        assert!(catalog.is_empty());
    }
}
