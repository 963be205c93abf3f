//! Error types shared by the transport, adapters, solver and pipeline.
//!
//! None of these ever reach a pipeline caller: [`crate::pipeline::Pipeline`]
//! turns every variant into [`crate::pipeline::Resolution::NotFound`] and logs
//! the cause.

use thiserror::Error;

/// Library error taxonomy
#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("captcha solver error: {0}")]
    Solver(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid content id: {0}")]
    InvalidId(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ScoutError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Map a scraper selector parse failure.
    pub(crate) fn selector(selector: &str) -> Self {
        Self::Parse(format!("invalid selector `{selector}`"))
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
