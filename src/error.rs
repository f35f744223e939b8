// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("upstream error: {0}")]
    Upstream(String),
}

// reqwest puts the full request URL in its messages, query string (and API key) included.
impl From<reqwest::Error> for ExplorerError {
    fn from(e: reqwest::Error) -> Self {
        ExplorerError::Network(e.without_url())
    }
}

impl ExplorerError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExplorerError::Network(e) => !e.is_builder(),
            ExplorerError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            // Etherscan reports throttling as a 200 with a NOTOK body
            ExplorerError::Upstream(msg) => msg.to_ascii_lowercase().contains("rate limit"),
            ExplorerError::MalformedResponse(_) | ExplorerError::MissingCredential(_) => false,
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ExplorerError::MalformedResponse(msg.into())
    }
}
