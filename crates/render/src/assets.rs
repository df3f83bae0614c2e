//! Static render resources: fonts and brand logos.
//!
//! Resources are read once and may be cached process-wide by the caller; the
//! renderer only sees byte buffers. Every resource is optional: a missing
//! TTF degrades to the built-in Helvetica family and a missing logo degrades
//! to the brand's textual fallback. Absence is logged, never fatal here.

use std::path::Path;

/// DejaVu condensed family used by the certificates, one file per style.
const FONT_REGULAR: &str = "DejaVuSansCondensed.ttf";
const FONT_BOLD: &str = "DejaVuSansCondensed-Bold.ttf";
const FONT_ITALIC: &str = "DejaVuSansCondensed-Oblique.ttf";

/// Byte buffers for the resources one render call may embed.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    pub font_regular: Option<Vec<u8>>,
    pub font_bold: Option<Vec<u8>>,
    pub font_italic: Option<Vec<u8>>,
    /// Logo PNG per brand, keyed by the profile's `logo_file` name.
    logos: Vec<(String, Vec<u8>)>,
}

impl RenderAssets {
    /// No external resources: built-in fonts and textual logo fallbacks.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads fonts from `font_dir` and every brand logo found in `logo_dir`.
    ///
    /// Missing files are logged and skipped; this function never fails.
    pub fn load(font_dir: &Path, logo_dir: &Path) -> Self {
        let mut assets = Self {
            font_regular: read_optional(&font_dir.join(FONT_REGULAR)),
            font_bold: read_optional(&font_dir.join(FONT_BOLD)),
            font_italic: read_optional(&font_dir.join(FONT_ITALIC)),
            logos: Vec::new(),
        };

        for profile in [
            crate::brand::TemplateVariant::Standard.profile(),
            crate::brand::TemplateVariant::PartnerBrand.profile(),
        ] {
            if let Some(bytes) = read_optional(&logo_dir.join(profile.logo_file)) {
                assets.logos.push((profile.logo_file.to_owned(), bytes));
            }
        }

        assets
    }

    /// The logo bytes registered under `name`, if any.
    pub fn logo(&self, name: &str) -> Option<&[u8]> {
        self.logos
            .iter()
            .find(|(logo_name, _)| logo_name == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Registers logo bytes under a brand's file name. Used by tests and by
    /// callers embedding resources at build time.
    pub fn with_logo(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.logos.push((name.into(), bytes));
        self
    }
}

fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            tracing::warn!("render resource unavailable, using fallback: {}: {err}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_everything_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let assets = RenderAssets::load(&dir.path().join("fonts"), &dir.path().join("logos"));
        assert!(assets.font_regular.is_none());
        assert!(assets.logo("logoheader.png").is_none());
    }

    #[test]
    fn test_load_picks_up_present_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
        std::fs::write(dir.path().join("fonts").join(FONT_REGULAR), b"not a real font").unwrap();
        std::fs::create_dir_all(dir.path().join("logos")).unwrap();
        std::fs::write(dir.path().join("logos").join("agrovet_logo.png"), b"png bytes").unwrap();

        let assets = RenderAssets::load(&dir.path().join("fonts"), &dir.path().join("logos"));
        assert!(assets.font_regular.is_some());
        assert!(assets.logo("agrovet_logo.png").is_some());
        assert!(assets.logo("logoheader.png").is_none());
    }
}
