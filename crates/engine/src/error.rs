//! Errors surfaced by the engine.
//!
//! - [`EngineError`] covers local validation, raised before any network call.
//! - [`RemoteError`] is how a failed remote call looks to the domain, whatever
//!   transport produced it.
use thiserror::Error;

/// Fixed message shown for HTTP 403 instead of the raw server text.
pub const PERMISSION_DENIED_MESSAGE: &str =
    "You don't have permission to modify transactions in this wallet.";

/// Local (pre-network) validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
    #[error("Items are not balanced: {remaining} remaining")]
    Unbalanced { remaining: String },
    #[error("Sum of items ({sum}) does not match Total Amount ({total})")]
    TotalMismatch { sum: String, total: String },
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("Store error: {0}")]
    Store(String),
}

/// A failed remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("{status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Best human-readable text carried by the error, if any.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            Self::Conflict(message) | Self::Validation(message) => message.as_str(),
            Self::Server { message, .. } => message.as_str(),
            Self::Transport(message) => message.as_str(),
            Self::Unauthorized | Self::Forbidden | Self::NotFound => return None,
        };
        let trimmed = message.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Message to show to the user: permission failures get a fixed text,
    /// everything else the server's own message or `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if matches!(self, Self::Forbidden) {
            return PERMISSION_DENIED_MESSAGE.to_string();
        }
        self.message().unwrap_or(fallback).to_string()
    }
}
