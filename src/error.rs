use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}

impl Error {
    /// Whether the request failed on the wire (connect, timeout, body read)
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
