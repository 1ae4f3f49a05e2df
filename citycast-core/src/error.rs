use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {request}")]
    Transport {
        request: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request for {request} failed with status {status}: {body}")]
    Status {
        request: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to read response body for {request}")]
    Body {
        request: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Response is not valid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("API returned error {code:?}: {message}")]
    Api { code: Option<i64>, message: String },

    #[error("Response has no '{0}' object")]
    MissingGroup(&'static str),

    #[error("Field group '{group}' could not be decoded: {source}")]
    InvalidGroup {
        group: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create output file '{0}'")]
    Create(PathBuf, #[source] std::io::Error),

    #[error("Failed to write to output file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),
}
