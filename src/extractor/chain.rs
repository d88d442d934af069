//! Ordered fallback chains: the first candidate yielding a non-blank value wins.

use serde::Serialize;

/// A field value together with the chain step that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub value: String,
    pub source: &'static str,
}

impl FieldValue {
    pub fn new(value: impl Into<String>, source: &'static str) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// One named step in a field's fallback chain over some input `I`.
pub struct Candidate<I: ?Sized> {
    pub source: &'static str,
    pub extract: fn(&I) -> Option<String>,
}

impl<I: ?Sized> Candidate<I> {
    pub const fn new(source: &'static str, extract: fn(&I) -> Option<String>) -> Self {
        Self { source, extract }
    }
}

/// Runs `chain` in order against `input` and returns the first non-blank
/// value, trimmed.
pub fn first_non_empty<I: ?Sized>(input: &I, chain: &[Candidate<I>]) -> Option<FieldValue> {
    chain.iter().find_map(|candidate| {
        non_blank((candidate.extract)(input)).map(|value| FieldValue::new(value, candidate.source))
    })
}

/// Trims `value`, discarding it when nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
