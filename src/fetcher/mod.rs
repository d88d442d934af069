pub mod client;
pub mod decode;
pub mod errors;
pub mod types;

pub use client::{HttpFetcher, PageFetcher, USER_AGENT};
pub use errors::FetchError;
pub use types::{Charset, FetchOptions, PageResponse};

#[cfg(test)]
pub use client::MockPageFetcher;
