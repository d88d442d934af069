use serde::Serialize;

use crate::extractor::chain::FieldValue;

/// Product fields produced by either extractor. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedFields {
    pub title: Option<FieldValue>,
    pub description: Option<FieldValue>,
    pub image: Option<FieldValue>,
    pub price: Option<FieldValue>,
}

impl ExtractedFields {
    pub fn title(&self) -> Option<&str> {
        self.title.as_ref().map(|f| f.value.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_ref().map(|f| f.value.as_str())
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_ref().map(|f| f.value.as_str())
    }

    pub fn price(&self) -> Option<&str> {
        self.price.as_ref().map(|f| f.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.price.is_none()
    }
}
