//! CSS selectors for vendor product pages.
//!
//! Shared by the static extractor and the in-page rendering routine so both
//! substrates read the same elements in the same order. Update these tables
//! when a storefront changes its markup.

use serde::Serialize;

use crate::site::Vendor;

/// Where a field value is read from: the text of the first element matching
/// `selector`, or its `attr` attribute when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Source {
    pub selector: &'static str,
    pub attr: Option<&'static str>,
}

const fn text(selector: &'static str) -> Source {
    Source {
        selector,
        attr: None,
    }
}

const fn attr(selector: &'static str, attr: &'static str) -> Source {
    Source {
        selector,
        attr: Some(attr),
    }
}

/// Ordered candidate sources per field for one vendor.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VendorSelectors {
    pub title: &'static [Source],
    pub price: &'static [Source],
    /// Each entry selects all items of one bullet list.
    pub bullets: &'static [&'static str],
    pub image: &'static [Source],
}

pub const GENERIC: VendorSelectors = VendorSelectors {
    title: &[],
    price: &[],
    bullets: &[],
    image: &[],
};

pub const AMAZON: VendorSelectors = VendorSelectors {
    title: &[text("#productTitle"), text("#title")],
    price: &[
        text("#corePrice_feature_div .a-price .a-offscreen"),
        text("#corePriceDisplay_desktop_feature_div .a-price .a-offscreen"),
        text("#priceblock_ourprice"),
        text("#priceblock_dealprice"),
        text("#apex_desktop .a-price .a-offscreen"),
    ],
    bullets: &[
        "#feature-bullets ul li span.a-list-item",
        "#productFactsDesktopExpander ul li span.a-list-item",
    ],
    // Regular product gallery, then the book cover layout.
    image: &[
        attr("#landingImage", "data-old-hires"),
        attr("#landingImage", "src"),
        attr("#imgBlkFront", "src"),
        attr("#ebooksImgBlkFront", "src"),
    ],
};

pub const CDISCOUNT: VendorSelectors = VendorSelectors {
    title: &[text("h1[itemprop='name']"), text("h1.fpDesCol"), text("h1")],
    price: &[
        attr("[itemprop='price']", "content"),
        text(".fpPrice"),
        text(".c-product__price"),
    ],
    bullets: &[
        ".fpDescTxt li",
        "#fpBlocDescription li",
        "[itemprop='description'] li",
    ],
    image: &[
        attr("img#picture0", "src"),
        attr("img[itemprop='image']", "src"),
        attr(".fpMainImg img", "src"),
    ],
};

pub fn for_vendor(vendor: Vendor) -> &'static VendorSelectors {
    match vendor {
        Vendor::Generic => &GENERIC,
        Vendor::Amazon => &AMAZON,
        Vendor::Cdiscount => &CDISCOUNT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_all_selectors_parse() {
        for table in [&GENERIC, &AMAZON, &CDISCOUNT] {
            let sources = table.title.iter().chain(table.price).chain(table.image);
            for source in sources {
                assert!(Selector::parse(source.selector).is_ok(), "{}", source.selector);
            }
            for selector in table.bullets {
                assert!(Selector::parse(selector).is_ok(), "{selector}");
            }
        }
    }
}
