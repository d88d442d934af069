use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

/// Character set a page body was decoded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Charset {
    Utf8,
    Windows1252,
    ShiftJis,
    Gbk,
    Big5,
    Other(String),
}

impl Charset {
    pub fn from_encoding(encoding: &'static encoding_rs::Encoding) -> Self {
        if encoding == encoding_rs::UTF_8 {
            Self::Utf8
        } else if encoding == encoding_rs::WINDOWS_1252 {
            Self::Windows1252
        } else if encoding == encoding_rs::SHIFT_JIS {
            Self::ShiftJis
        } else if encoding == encoding_rs::GBK || encoding == encoding_rs::GB18030 {
            Self::Gbk
        } else if encoding == encoding_rs::BIG5 {
            Self::Big5
        } else {
            Self::Other(encoding.name().to_string())
        }
    }
}

/// Optional per-request header overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub accept_language: Option<String>,
}

impl FetchOptions {
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            accept_language: Some(language.into()),
        }
    }
}

/// A downloaded page after transport redirects, decoded to UTF-8.
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// URL of the last response in the transport-level redirect chain.
    pub url_final: Url,
    pub status: StatusCode,
    pub body: String,
    pub charset: Charset,
}
