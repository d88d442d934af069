//! Product metadata extraction from arbitrary product-page URLs.
//!
//! [`pipeline::Pipeline`] resolves redirects and deep links, classifies the
//! landing page, and extracts title, price, description and image either from
//! static HTML or from a headless-rendered DOM.

pub mod api;
pub mod app_state;
pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod pipeline;
pub mod resolver;
pub mod site;

pub use pipeline::{ExtractionOutcome, Pipeline, PipelineError};
pub use site::{SiteStrategy, classify};
