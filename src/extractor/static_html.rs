//! Extraction from downloaded HTML.
//!
//! Each field runs its own fallback chain: vendor markup first, then generic
//! meta tags, with raw-text pattern matching for image data that some
//! storefronts only embed in inline scripts.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::extractor::{
    chain::{Candidate, first_non_empty},
    model::ExtractedFields,
    normalize::{clean_price, collapse_whitespace, format_bullets},
    selectors::{self, Source, VendorSelectors},
};
use crate::site::{SiteStrategy, Vendor};

// Gallery data embedded as JSON in an inline script, e.g. `"hiRes":"https://..."`.
static EMBEDDED_HI_RES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""hiRes"\s*:\s*"(https?://[^"\s]+)""#).unwrap());

struct StaticPage<'a> {
    document: Html,
    raw: &'a str,
    vendor: Vendor,
    selectors: &'static VendorSelectors,
}

fn title_chain<'a>() -> [Candidate<StaticPage<'a>>; 3] {
    [
        Candidate::new("vendor_title", vendor_title),
        Candidate::new("og_title", og_title),
        Candidate::new("document_title", document_title),
    ]
}

fn description_chain<'a>() -> [Candidate<StaticPage<'a>>; 3] {
    [
        Candidate::new("vendor_bullets", vendor_bullets),
        Candidate::new("og_description", og_description),
        Candidate::new("meta_description", meta_description),
    ]
}

fn image_chain<'a>() -> [Candidate<StaticPage<'a>>; 3] {
    [
        Candidate::new("embedded_hi_res", embedded_hi_res),
        Candidate::new("og_image", og_image),
        Candidate::new("vendor_image", vendor_image),
    ]
}

fn price_chain<'a>() -> [Candidate<StaticPage<'a>>; 1] {
    [Candidate::new("vendor_price", vendor_price)]
}

/// Extracts product fields from static HTML. Never fails; fields that no
/// chain step can supply are `None`.
pub fn extract_static(html: &str, strategy: SiteStrategy) -> ExtractedFields {
    let vendor = strategy.vendor();
    let page = StaticPage {
        document: Html::parse_document(html),
        raw: html,
        vendor,
        selectors: selectors::for_vendor(vendor),
    };

    ExtractedFields {
        title: first_non_empty(&page, &title_chain()),
        description: first_non_empty(&page, &description_chain()),
        image: first_non_empty(&page, &image_chain()),
        price: first_non_empty(&page, &price_chain()),
    }
}

fn vendor_title(page: &StaticPage) -> Option<String> {
    first_source(&page.document, page.selectors.title).map(|t| collapse_whitespace(&t))
}

fn og_title(page: &StaticPage) -> Option<String> {
    meta_content(&page.document, "meta[property='og:title']")
}

fn document_title(page: &StaticPage) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    page.document
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .find(|title| !title.is_empty())
}

fn vendor_bullets(page: &StaticPage) -> Option<String> {
    page.selectors.bullets.iter().find_map(|selector| {
        let selector = Selector::parse(selector).ok()?;
        format_bullets(
            page.document
                .select(&selector)
                .map(|element| element.text().collect::<String>()),
        )
    })
}

fn og_description(page: &StaticPage) -> Option<String> {
    meta_content(&page.document, "meta[property='og:description']")
}

fn meta_description(page: &StaticPage) -> Option<String> {
    meta_content(&page.document, "meta[name='description']")
}

fn embedded_hi_res(page: &StaticPage) -> Option<String> {
    if page.vendor == Vendor::Generic {
        return None;
    }
    EMBEDDED_HI_RES
        .captures(page.raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn og_image(page: &StaticPage) -> Option<String> {
    meta_content(&page.document, "meta[property='og:image']")
}

fn vendor_image(page: &StaticPage) -> Option<String> {
    // lazy-loaded galleries put a data: placeholder in `src`
    page.selectors.image.iter().find_map(|source| {
        read_source(&page.document, source)
            .filter(|src| !src.trim().is_empty() && !src.trim_start().starts_with("data:"))
    })
}

fn vendor_price(page: &StaticPage) -> Option<String> {
    page.selectors
        .price
        .iter()
        .find_map(|source| read_source(&page.document, source).and_then(|p| clean_price(&p)))
}

/// First non-blank value among `sources`, in order.
fn first_source(document: &Html, sources: &[Source]) -> Option<String> {
    sources.iter().find_map(|source| {
        read_source(document, source).filter(|value| !value.trim().is_empty())
    })
}

fn read_source(document: &Html, source: &Source) -> Option<String> {
    let selector = Selector::parse(source.selector).ok()?;
    let element = document.select(&selector).next()?;
    match source.attr {
        Some(attr) => element.value().attr(attr).map(str::to_string),
        None => Some(element.text().collect()),
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const AMAZON_PAGE: &str = r#"
        <html><head>
          <title>Amazon.fr : Bouilloire électrique</title>
          <meta property="og:title" content="Promo kettle of the week">
          <meta property="og:description" content="Buy now!">
          <meta property="og:image" content="https://images.example/og-small.jpg">
          <script>
            var data = {"colorImages": {"initial": [{"hiRes":"https://m.media-amazon.com/images/I/71-hires.jpg","thumb":"x"}]}};
          </script>
        </head><body>
          <span id="productTitle">
              Electric Kettle   1.7L
          </span>
          <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">29,99 €</span></span></div>
          <div id="feature-bullets"><ul>
            <li><span class="a-list-item">  Stainless steel body with
                a 1.7 litre capacity </span></li>
            <li><span class="a-list-item">Short</span></li>
            <li><span class="a-list-item">See more product details on this item</span></li>
            <li><span class="a-list-item">Boils a full jug in under three minutes</span></li>
          </ul></div>
          <img id="landingImage" src="https://m.media-amazon.com/images/I/71-small.jpg">
        </body></html>
    "#;

    #[test]
    fn test_generic_page() {
        let html = r#"<html><head><title>Widget</title>
            <meta property="og:description" content="A great widget"></head>
            <body><h1>Widget</h1></body></html>"#;
        let fields = extract_static(html, SiteStrategy::StaticGeneric);

        assert_eq!(fields.title(), Some("Widget"));
        assert_eq!(fields.title.as_ref().unwrap().source, "document_title");
        assert_eq!(fields.description(), Some("A great widget"));
        assert_eq!(fields.image(), None);
        assert_eq!(fields.price(), None);
    }

    #[test]
    fn test_vendor_title_beats_og_title() {
        let fields = extract_static(AMAZON_PAGE, SiteStrategy::StaticVendorAmazon);
        assert_eq!(fields.title(), Some("Electric Kettle 1.7L"));
        assert_eq!(fields.title.as_ref().unwrap().source, "vendor_title");
    }

    #[test]
    fn test_og_title_beats_document_title() {
        let html = r#"<html><head><title>Page title</title>
            <meta property="og:title" content=" Open Graph title "></head></html>"#;
        let fields = extract_static(html, SiteStrategy::StaticGeneric);
        assert_eq!(fields.title(), Some("Open Graph title"));
    }

    #[test]
    fn test_vendor_bullets_description() {
        let fields = extract_static(AMAZON_PAGE, SiteStrategy::StaticVendorAmazon);
        assert_eq!(
            fields.description(),
            Some(
                "• Stainless steel body with a 1.7 litre capacity\n• Boils a full jug in under three minutes"
            )
        );
    }

    #[test]
    fn test_description_falls_back_to_meta() {
        let html = r#"<html><head><meta name="description" content="Plain description"></head>
            <body><div id="feature-bullets"><ul><li><span class="a-list-item">tiny</span></li></ul></div></body></html>"#;
        let fields = extract_static(html, SiteStrategy::StaticVendorAmazon);
        assert_eq!(fields.description(), Some("Plain description"));
        assert_eq!(fields.description.as_ref().unwrap().source, "meta_description");
    }

    #[test]
    fn test_embedded_hi_res_image_wins() {
        let fields = extract_static(AMAZON_PAGE, SiteStrategy::StaticVendorAmazon);
        assert_eq!(
            fields.image(),
            Some("https://m.media-amazon.com/images/I/71-hires.jpg")
        );
    }

    #[test]
    fn test_embedded_pattern_ignored_for_generic_sites() {
        let fields = extract_static(AMAZON_PAGE, SiteStrategy::StaticGeneric);
        assert_eq!(fields.image(), Some("https://images.example/og-small.jpg"));
        assert_eq!(fields.title(), Some("Promo kettle of the week"));
        assert_eq!(fields.price(), None);
    }

    #[test]
    fn test_vendor_image_shapes() {
        let gallery = r#"<img id="landingImage" data-old-hires="" src="https://img.example/gallery.jpg">"#;
        let fields = extract_static(gallery, SiteStrategy::StaticVendorAmazon);
        assert_eq!(fields.image(), Some("https://img.example/gallery.jpg"));
        assert_eq!(fields.image.as_ref().unwrap().source, "vendor_image");

        let placeholder = r#"<img id="landingImage" src="data:image/gif;base64,R0lGOD">
            <img id="imgBlkFront" src="https://img.example/cover.jpg">"#;
        let fields = extract_static(placeholder, SiteStrategy::StaticVendorAmazon);
        assert_eq!(fields.image(), Some("https://img.example/cover.jpg"));

        let book = r#"<div id="img-canvas"><img id="imgBlkFront" src="https://img.example/cover.jpg"></div>"#;
        let fields = extract_static(book, SiteStrategy::StaticVendorAmazon);
        assert_eq!(fields.image(), Some("https://img.example/cover.jpg"));
    }

    #[test]
    fn test_vendor_price() {
        let fields = extract_static(AMAZON_PAGE, SiteStrategy::StaticVendorAmazon);
        assert_eq!(fields.price(), Some("29,99 €"));

        let cdiscount = r#"<h1 itemprop="name">Lave-linge 8kg</h1>
            <span itemprop="price" content="349.99"></span>"#;
        let fields = extract_static(cdiscount, SiteStrategy::RenderedVendorCdiscount);
        assert_eq!(fields.price(), Some("349.99"));
        assert_eq!(fields.title(), Some("Lave-linge 8kg"));
    }

    #[test]
    fn test_empty_document() {
        let fields = extract_static("", SiteStrategy::StaticGeneric);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_idempotent() {
        let first = extract_static(AMAZON_PAGE, SiteStrategy::StaticVendorAmazon);
        let second = extract_static(AMAZON_PAGE, SiteStrategy::StaticVendorAmazon);
        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn prop_deterministic_on_arbitrary_markup(body in ".{0,400}", title in "[a-zA-Z0-9 ]{0,40}") {
            let html = format!("<html><head><title>{title}</title></head><body>{body}</body></html>");
            let first = extract_static(&html, SiteStrategy::StaticVendorAmazon);
            let second = extract_static(&html, SiteStrategy::StaticVendorAmazon);
            prop_assert_eq!(&first, &second);
            if let Some(title) = first.title() {
                prop_assert_eq!(title.trim(), title);
                prop_assert!(!title.is_empty());
            }
        }
    }
}
