#![no_main]

use libfuzzer_sys::fuzz_target;

use pricetag::SiteStrategy;
use pricetag::extractor::extract_static;

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);

    // Static extraction must never panic, whatever the markup
    for strategy in [
        SiteStrategy::StaticGeneric,
        SiteStrategy::StaticVendorAmazon,
        SiteStrategy::RenderedVendorCdiscount,
    ] {
        let _ = extract_static(&html, strategy);
    }
});
