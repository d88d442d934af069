pub mod browser;
pub mod chain;
pub mod model;
pub mod normalize;
pub mod rendered;
pub mod selectors;
pub mod static_html;

pub use browser::ChromeRenderer;
pub use chain::{Candidate, FieldValue, first_non_empty};
pub use model::ExtractedFields;
pub use rendered::{
    RenderError, RenderErrorKind, RenderSession, RenderedExtractor, RenderedSnapshot, Renderer,
    SessionOptions,
};
pub use static_html::extract_static;

#[cfg(test)]
pub use rendered::MockRenderer;
