//! Redirect and deep-link resolution.
//!
//! Transport redirects are followed by the fetcher. On top of that, one
//! application-level hop is taken when the landing page carries a `dl`
//! query parameter holding the real destination, as affiliate and link
//! shortener pages do. Nested deep links are not unwrapped.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::{info, instrument};
use url::Url;

use crate::fetcher::{FetchError, FetchOptions, PageFetcher, PageResponse};
use crate::site::classify_url;

pub const DEEP_LINK_PARAM: &str = "dl";

/// Result of resolving an input URL to the page actually intended.
///
/// `redirect_chain` always starts with `input_url` and ends with `final_url`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRequest {
    input_url: Url,
    redirect_chain: Vec<Url>,
    #[serde(skip)]
    html: String,
}

impl ResolvedRequest {
    fn new(input_url: Url, hops: Vec<PageResponse>) -> Self {
        let mut redirect_chain = Vec::with_capacity(hops.len() + 1);
        redirect_chain.push(input_url.clone());
        redirect_chain.extend(hops.iter().map(|hop| hop.url_final.clone()));
        let html = hops.into_iter().last().map(|hop| hop.body).unwrap_or_default();

        Self {
            input_url,
            redirect_chain,
            html,
        }
    }

    pub fn input_url(&self) -> &Url {
        &self.input_url
    }

    pub fn redirect_chain(&self) -> &[Url] {
        &self.redirect_chain
    }

    pub fn final_url(&self) -> &Url {
        // never empty: the input URL is always the first entry
        self.redirect_chain.last().unwrap_or(&self.input_url)
    }

    /// Body of the last page fetched.
    pub fn html(&self) -> &str {
        &self.html
    }
}

pub struct Resolver {
    fetcher: Arc<dyn PageFetcher>,
}

impl Resolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    #[instrument(skip_all, fields(url = %input))]
    pub async fn resolve(&self, input: &Url) -> Result<ResolvedRequest, FetchError> {
        let first = self.fetcher.fetch(input, &options_for(input)).await?;
        info!(hop = %first.url_final, "resolved first hop");

        let mut hops = Vec::with_capacity(2);
        let target = deep_link_target(&first.url_final).transpose()?;
        hops.push(first);

        if let Some(target) = target {
            info!(target = %target, "following deep link");
            let second = self.fetcher.fetch(&target, &options_for(&target)).await?;
            hops.push(second);
        }

        Ok(ResolvedRequest::new(input.clone(), hops))
    }
}

fn options_for(url: &Url) -> FetchOptions {
    match classify_url(url).accept_language() {
        Some(language) => FetchOptions::with_language(language),
        None => FetchOptions::default(),
    }
}

/// Decoded destination of the deep-link parameter, if `url` carries one.
pub fn deep_link_target(url: &Url) -> Option<Result<Url, FetchError>> {
    let raw = url.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == DEEP_LINK_PARAM).then_some(value)
    })?;

    Some(parse_deep_link(raw))
}

fn parse_deep_link(raw: &str) -> Result<Url, FetchError> {
    let malformed = |reason: String| FetchError::MalformedDeepLink {
        value: raw.to_string(),
        reason,
    };

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|e| malformed(e.to_string()))?;
    if decoded.trim().is_empty() {
        return Err(malformed("empty value".to_string()));
    }

    let target = Url::parse(decoded.trim()).map_err(|e| malformed(e.to_string()))?;
    if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
        return Err(malformed(format!("not an http(s) url: {target}")));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{Charset, MockPageFetcher};
    use mockall::Sequence;
    use reqwest::StatusCode;

    fn page(url: &str, body: &str) -> PageResponse {
        PageResponse {
            url_final: Url::parse(url).unwrap(),
            status: StatusCode::OK,
            body: body.to_string(),
            charset: Charset::Utf8,
        }
    }

    #[test]
    fn test_deep_link_decoding() {
        let hop = Url::parse("https://x/page?dl=https%3A%2F%2Fshop.example%2Fitem").unwrap();
        let target = deep_link_target(&hop).unwrap().unwrap();
        assert_eq!(target.as_str(), "https://shop.example/item");

        let hop = Url::parse("https://x/page?ref=abc&dl=https%3A%2F%2Fshop.example%2Fa%3Fb%3D1").unwrap();
        let target = deep_link_target(&hop).unwrap().unwrap();
        assert_eq!(target.as_str(), "https://shop.example/a?b=1");

        let hop = Url::parse("https://x/page?download=1").unwrap();
        assert!(deep_link_target(&hop).is_none());
    }

    #[test]
    fn test_malformed_deep_links() {
        for raw in ["https://x/?dl=", "https://x/?dl=not%20a%20url", "https://x/?dl=javascript%3Aalert(1)"] {
            let hop = Url::parse(raw).unwrap();
            assert!(
                matches!(
                    deep_link_target(&hop),
                    Some(Err(FetchError::MalformedDeepLink { .. }))
                ),
                "{raw}"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_without_deep_link() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(page("https://shop.example/item", "<title>Item</title>")));

        let resolver = Resolver::new(Arc::new(fetcher));
        let input = Url::parse("https://sho.rt/abc").unwrap();
        let resolved = resolver.resolve(&input).await.unwrap();

        assert_eq!(resolved.redirect_chain().len(), 2);
        assert_eq!(resolved.redirect_chain()[0], input);
        assert_eq!(resolved.final_url().as_str(), "https://shop.example/item");
        assert_eq!(resolved.html(), "<title>Item</title>");
    }

    #[tokio::test]
    async fn test_resolve_follows_one_deep_link() {
        let mut seq = Sequence::new();
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url, _| url.as_str() == "https://sho.rt/abc")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(page(
                    "https://x/page?dl=https%3A%2F%2Fshop.example%2Fitem",
                    "<title>Redirecting</title>",
                ))
            });
        fetcher
            .expect_fetch()
            .withf(|url, _| url.as_str() == "https://shop.example/item")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                // another deep link on the target is not followed
                Ok(page(
                    "https://shop.example/item?dl=https%3A%2F%2Felsewhere.example%2F",
                    "<title>Real</title>",
                ))
            });

        let resolver = Resolver::new(Arc::new(fetcher));
        let input = Url::parse("https://sho.rt/abc").unwrap();
        let resolved = resolver.resolve(&input).await.unwrap();

        let chain: Vec<&str> = resolved.redirect_chain().iter().map(Url::as_str).collect();
        assert_eq!(
            chain,
            vec![
                "https://sho.rt/abc",
                "https://x/page?dl=https%3A%2F%2Fshop.example%2Fitem",
                "https://shop.example/item?dl=https%3A%2F%2Felsewhere.example%2F",
            ]
        );
        assert_eq!(resolved.final_url(), resolved.redirect_chain().last().unwrap());
        assert_eq!(resolved.html(), "<title>Real</title>");
    }

    #[tokio::test]
    async fn test_malformed_deep_link_fails_without_second_fetch() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Ok(page("https://x/page?dl=%%%", "<title>Hop</title>")));

        let resolver = Resolver::new(Arc::new(fetcher));
        let input = Url::parse("https://sho.rt/abc").unwrap();
        let err = resolver.resolve(&input).await.unwrap_err();
        assert!(matches!(err, FetchError::MalformedDeepLink { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_deep_link_does_not_fall_back() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url, _| url.host_str() == Some("sho.rt"))
            .returning(|_, _| {
                Ok(page(
                    "https://x/page?dl=https%3A%2F%2Fshop.example%2Fgone",
                    "<title>Hop</title>",
                ))
            });
        fetcher
            .expect_fetch()
            .withf(|url, _| url.host_str() == Some("shop.example"))
            .returning(|_, _| {
                Err(FetchError::Http {
                    status: StatusCode::NOT_FOUND,
                })
            });

        let resolver = Resolver::new(Arc::new(fetcher));
        let input = Url::parse("https://sho.rt/abc").unwrap();
        let err = resolver.resolve(&input).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_locale_header_for_cdiscount() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|_, options| options.accept_language.as_deref() == Some(crate::site::FRENCH_LOCALE))
            .times(1)
            .returning(|url, _| Ok(page(url.as_str(), "")));

        let resolver = Resolver::new(Arc::new(fetcher));
        let input = Url::parse("https://www.cdiscount.com/f-1-abc.html").unwrap();
        resolver.resolve(&input).await.unwrap();
    }
}
