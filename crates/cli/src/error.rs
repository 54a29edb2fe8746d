use client::ClientError;
use engine::{EngineError, ItemizationError, RemoteError, receipt::ReceiptError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid client setup: {0}")]
    Setup(String),
    #[error("{0}")]
    Invalid(#[from] EngineError),
    #[error("request failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("{0}")]
    Itemization(#[from] ItemizationError),
    #[error("{0}")]
    Receipt(#[from] ReceiptError),
    #[error("session is locked, run `persfin unlock` first")]
    Locked,
    #[error("{0}")]
    Usage(String),
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Url(message) => Self::Setup(message),
            other => Self::Remote(other.into()),
        }
    }
}

impl AppError {
    /// Text printed to the user when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(err) => err.user_message("Request failed"),
            Self::Itemization(ItemizationError::Cancelled) => "Cancelled".to_string(),
            other => other.to_string(),
        }
    }
}
