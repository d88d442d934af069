use regex::Regex;
use std::sync::LazyLock;

/// Bullets shorter than this are navigation crumbs or labels, not features.
pub const MIN_BULLET_CHARS: usize = 20;
pub const BULLET_MARKER: &str = "• ";

static BOILERPLATE_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bproducts?\b|make sure this fits|see more product details").unwrap()
});

/// Trims and collapses every run of whitespace (newlines included) to one space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_boilerplate_bullet(bullet: &str) -> bool {
    bullet.chars().count() < MIN_BULLET_CHARS || BOILERPLATE_BULLET.is_match(bullet)
}

/// Normalizes raw bullet texts into a newline-separated, marker-prefixed list.
/// Returns `None` when every bullet was filtered out.
pub fn format_bullets<I, S>(items: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let bullets: Vec<String> = items
        .into_iter()
        .map(|item| collapse_whitespace(item.as_ref()))
        .filter(|bullet| !is_boilerplate_bullet(bullet))
        .map(|bullet| format!("{BULLET_MARKER}{bullet}"))
        .collect();

    if bullets.is_empty() {
        None
    } else {
        Some(bullets.join("\n"))
    }
}

/// Collapses a scraped price label, dropping it when it carries no digit.
pub fn clean_price(raw: &str) -> Option<String> {
    let price = collapse_whitespace(raw);
    price.chars().any(|c| c.is_ascii_digit()).then_some(price)
}
