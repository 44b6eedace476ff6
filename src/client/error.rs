//! Client error definitions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("control plane returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported URL scheme '{0}'")]
    Scheme(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
