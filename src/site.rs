//! Maps a page URL to the extraction strategy used for it.

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// Language preference sent to storefronts that localise their product pages.
pub const FRENCH_LOCALE: &str = "fr-FR,fr;q=0.9";

/// Storefront family, independent of how a page is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Generic,
    Amazon,
    Cdiscount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SiteStrategy {
    #[serde(rename = "Generic")]
    StaticGeneric,
    #[serde(rename = "AmazonStatic")]
    StaticVendorAmazon,
    #[serde(rename = "Amazon")]
    RenderedVendorAmazon,
    #[serde(rename = "Cdiscount")]
    RenderedVendorCdiscount,
    Invalid,
}

impl SiteStrategy {
    pub fn vendor(self) -> Vendor {
        match self {
            Self::StaticVendorAmazon | Self::RenderedVendorAmazon => Vendor::Amazon,
            Self::RenderedVendorCdiscount => Vendor::Cdiscount,
            Self::StaticGeneric | Self::Invalid => Vendor::Generic,
        }
    }

    /// Whether critical fields only exist after client-side execution.
    pub fn requires_rendering(self) -> bool {
        matches!(
            self,
            Self::RenderedVendorAmazon | Self::RenderedVendorCdiscount
        )
    }

    /// The static counterpart used when headless rendering is unavailable.
    pub fn without_rendering(self) -> Self {
        match self {
            Self::RenderedVendorAmazon => Self::StaticVendorAmazon,
            Self::RenderedVendorCdiscount => Self::StaticGeneric,
            other => other,
        }
    }

    pub fn accept_language(self) -> Option<&'static str> {
        match self.vendor() {
            Vendor::Cdiscount => Some(FRENCH_LOCALE),
            Vendor::Amazon | Vendor::Generic => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StaticGeneric => "Generic",
            Self::StaticVendorAmazon => "AmazonStatic",
            Self::RenderedVendorAmazon => "Amazon",
            Self::RenderedVendorCdiscount => "Cdiscount",
            Self::Invalid => "Invalid",
        }
    }
}

impl std::fmt::Display for SiteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a raw URL string. Never fails: anything that is not an
/// absolute http(s) URL with a host is `Invalid`.
pub fn classify(url: &str) -> SiteStrategy {
    match Url::parse(url.trim()) {
        Ok(parsed) => classify_url(&parsed),
        Err(_) => SiteStrategy::Invalid,
    }
}

pub fn classify_url(url: &Url) -> SiteStrategy {
    if !matches!(url.scheme(), "http" | "https") {
        return SiteStrategy::Invalid;
    }
    let Some(host) = url.host_str() else {
        return SiteStrategy::Invalid;
    };
    let host = host.to_ascii_lowercase();

    // Ordered: first matching rule wins.
    if host.contains("amazon") {
        SiteStrategy::RenderedVendorAmazon
    } else if host == "cdiscount.com" || host.ends_with(".cdiscount.com") {
        SiteStrategy::RenderedVendorCdiscount
    } else {
        SiteStrategy::StaticGeneric
    }
}
