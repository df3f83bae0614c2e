/// Errors surfaced by certificate rendering.
///
/// Resource fallbacks (missing logo, missing TTF) are absorbed internally and
/// logged; only faults that prevent producing a complete document reach the
/// caller. Rendering is all-or-nothing: on error no partial output exists.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A required resource was unavailable in both primary and fallback form.
    #[error("missing render resource: {0}")]
    MissingResource(String),
    /// The PDF backend failed while composing the document.
    #[error("layout failure: {0}")]
    LayoutFailure(#[from] printpdf::Error),
    /// The caller supplied an unrecognized template variant discriminator.
    #[error("unknown template variant: {0:?}")]
    InvalidVariant(String),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
