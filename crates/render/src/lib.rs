//! # COA Render
//!
//! Certificate-of-analysis PDF composition.
//!
//! Consumes one flat certificate record plus a branding variant and produces
//! the printable A4 document as bytes:
//! - Variant/branding presets dispatched through a single rendering routine
//! - Per-document footnote catalog with inline `[N: text]` marker extraction
//! - Deterministic table layout: estimated text metrics, dynamic row heights,
//!   page breaks always before an overflowing row
//!
//! Rendering is pure and synchronous; concurrent calls share nothing but the
//! read-only [`RenderAssets`] the caller may cache process-wide.

mod assets;
mod brand;
mod compose;
mod error;
mod footnotes;
mod layout;
mod renderer;

pub use assets::RenderAssets;
pub use brand::{BrandProfile, TemplateVariant};
pub use error::{RenderError, RenderResult};
pub use footnotes::{extract_footnotes, strip_footnotes, FootnoteCatalog};
pub use renderer::render;
