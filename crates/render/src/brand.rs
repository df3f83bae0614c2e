//! Template variants and their branding presets.
//!
//! Brand behaviour is a configuration value dispatched through the single
//! rendering routine: logo asset, footer address block, and the two
//! suppression flags that change what the document contains.

use crate::error::RenderError;

/// Branding/behaviour preset selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVariant {
    /// In-house certificate: full summary, observations, footnote catalog.
    Standard,
    /// Partner-brand certificate: partner header/footer, no reference fields,
    /// footnotes suppressed in favour of a fixed cross-reference line.
    PartnerBrand,
}

impl TemplateVariant {
    /// Parses a caller-supplied discriminator.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::InvalidVariant` for anything outside the two
    /// known presets; unknown variants are rejected before rendering starts.
    pub fn parse(input: &str) -> Result<Self, RenderError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(TemplateVariant::Standard),
            "partner" | "partner_brand" | "partner-brand" => Ok(TemplateVariant::PartnerBrand),
            _ => Err(RenderError::InvalidVariant(input.to_owned())),
        }
    }

    /// The branding preset for this variant.
    pub fn profile(self) -> &'static BrandProfile {
        match self {
            TemplateVariant::Standard => &STANDARD_BRAND,
            TemplateVariant::PartnerBrand => &PARTNER_BRAND,
        }
    }
}

impl std::fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateVariant::Standard => write!(f, "standard"),
            TemplateVariant::PartnerBrand => write!(f, "partner"),
        }
    }
}

/// Branding configuration consumed by the renderer.
#[derive(Debug)]
pub struct BrandProfile {
    /// Logo file name looked up under the configured logo directory.
    pub logo_file: &'static str,
    /// Text drawn in the logo position when the image is unavailable.
    pub logo_fallback: Option<&'static str>,
    /// Logo target width in millimetres.
    pub logo_width_mm: f32,
    /// Right-aligned address block in the page footer.
    pub address_lines: [&'static str; 2],
    /// Strip inline footnote markers and print no catalog.
    pub suppress_footnotes: bool,
    /// Omit the LINEA/REFERENCIA summary rows.
    pub suppress_reference_fields: bool,
    /// Fixed sentence replacing observations and footnotes, when present.
    pub cross_reference: Option<&'static str>,
}

static STANDARD_BRAND: BrandProfile = BrandProfile {
    logo_file: "logoheader.png",
    logo_fallback: None,
    logo_width_mm: 40.0,
    address_lines: [
        "Av. Santa Lucía Nº 218 Urb. Ind. La Aurora, Ate",
        "51 1 326 09 10 - www.pharmadix.com - ventas@pharmadix.com",
    ],
    suppress_footnotes: false,
    suppress_reference_fields: false,
    cross_reference: None,
};

static PARTNER_BRAND: BrandProfile = BrandProfile {
    logo_file: "agrovet_logo.png",
    logo_fallback: Some("AGROVET MARKET"),
    logo_width_mm: 30.0,
    address_lines: ["Av. Canadá 3792, San Luis, Lima - Perú", "T: +51 1 2 300 300"],
    suppress_footnotes: true,
    suppress_reference_fields: true,
    cross_reference: Some("Referencia Certificado de Análisis Pharmadix"),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_variants() {
        assert_eq!(
            TemplateVariant::parse("standard").unwrap(),
            TemplateVariant::Standard
        );
        assert_eq!(
            TemplateVariant::parse("Partner").unwrap(),
            TemplateVariant::PartnerBrand
        );
        assert_eq!(
            TemplateVariant::parse("partner-brand").unwrap(),
            TemplateVariant::PartnerBrand
        );
    }

    #[test]
    fn test_parse_rejects_unknown_variant() {
        assert!(matches!(
            TemplateVariant::parse("generic"),
            Err(RenderError::InvalidVariant(_))
        ));
    }

    #[test]
    fn test_partner_profile_suppresses_extras() {
        let profile = TemplateVariant::PartnerBrand.profile();
        assert!(profile.suppress_footnotes);
        assert!(profile.suppress_reference_fields);
        assert!(profile.cross_reference.is_some());

        let standard = TemplateVariant::Standard.profile();
        assert!(!standard.suppress_footnotes);
        assert!(!standard.suppress_reference_fields);
    }
}
