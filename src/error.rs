use std::{fmt, io};

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[cfg(feature = "wasm")]
use serde_wasm_bindgen::Error as WasmError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SiteError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("DOM access error: {0}")]
    Dom(String),
    #[error("Invalid section ID: {0:?}")]
    InvalidSection(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Section not found: {0}")]
    SectionNotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Local storage unavailable: {0}")]
    Storage(String),
    #[error("Service error: {0}")]
    Service(String),
}

impl SiteError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SiteError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SiteError::Dom(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SiteError::InvalidSection(_) => StatusCode::BAD_REQUEST,
            SiteError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SiteError::NotFound(_) => StatusCode::NOT_FOUND,
            SiteError::SectionNotFound(_) => StatusCode::NOT_FOUND,
            SiteError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SiteError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            SiteError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<toml::de::Error> for SiteError {
    fn from(src: toml::de::Error) -> SiteError {
        SiteError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for SiteError {
    fn from(src: JsonError) -> SiteError {
        SiteError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for SiteError {
    fn from(src: UrlParseError) -> SiteError {
        SiteError::InvalidSection(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for SiteError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => SiteError::NotFound(format!("{x}")),
            _ => SiteError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for SiteError {
    fn from(x: fmt::Error) -> Self {
        SiteError::Serialization(format!("{x}"))
    }
}

#[cfg(feature = "wasm")]
impl From<WasmError> for SiteError {
    fn from(wasm_error: WasmError) -> Self {
        SiteError::Serialization(format!("Serde-wasm-bindgen error: {wasm_error}"))
    }
}

#[cfg(feature = "wasm")]
impl From<wasm_bindgen::JsValue> for SiteError {
    fn from(value: wasm_bindgen::JsValue) -> Self {
        SiteError::Dom(format!("{value:?}"))
    }
}
