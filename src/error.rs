// Error type shared by the configuration resolver and the API client.
// The binary wraps these in `anyhow` for reporting; library code keeps the
// variants distinct so callers (and tests) can tell a local precondition
// failure apart from something the service said. Wrapped causes are exposed
// through `source()` only, so `{:#}` prints each message once.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by a [`crate::api::Transport`] implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// A required setting is missing. Raised before any request is built.
    #[error("{0}")]
    Configuration(String),

    /// A locally checked constraint was violated.
    #[error("{0}")]
    Validation(String),

    #[error("sending request")]
    Transport(#[source] TransportError),

    /// The service answered with a non-success status.
    #[error("request failed: {status}: {body}")]
    Remote { status: StatusCode, body: String },

    /// The service answered 2xx but the body did not match the expected shape.
    #[error("parsing response")]
    Decode(#[from] serde_json::Error),

    #[error("{}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn missing_api_key() -> Self {
        ClientError::Configuration(
            "API key required. Set it with: 0x45 config set api_key <your-key>".into(),
        )
    }

    pub fn private_upload_requires_key() -> Self {
        ClientError::Configuration(format!(
            "private uploads require an API key: {}",
            Self::missing_api_key()
        ))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
