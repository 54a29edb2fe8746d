use engine::RemoteError;
use serde_json::Value;
use thiserror::Error;

/// Fields probed, in order, for a human-readable message in a JSON error
/// body.
const MESSAGE_FIELDS: [&str; 4] = ["message", "detail", "error", "title"];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(String),
}

impl ClientError {
    /// Maps a non-success status and its raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = error_message(body).unwrap_or_default();
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict(message),
            422 => Self::Validation(message),
            _ => Self::Server { status, message },
        }
    }
}

/// Best human-readable message in an error body.
///
/// A JSON string body is the message itself; a JSON object yields the first
/// non-blank string among [`MESSAGE_FIELDS`]. Bodies that are not JSON are
/// used as-is unless they look like markup.
pub fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(_) if body.starts_with('<') => return None,
        Err(_) => return Some(body.to_string()),
    };
    match value {
        Value::String(message) => non_blank(&message),
        Value::Object(fields) => MESSAGE_FIELDS
            .iter()
            .find_map(|field| fields.get(*field).and_then(Value::as_str).and_then(non_blank)),
        _ => None,
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => Self::Unauthorized,
            ClientError::Forbidden => Self::Forbidden,
            ClientError::NotFound => Self::NotFound,
            ClientError::Conflict(message) => Self::Conflict(message),
            ClientError::Validation(message) => Self::Validation(message),
            ClientError::Server { status, message } => Self::Server { status, message },
            ClientError::Transport(err) => Self::Transport(err.to_string()),
            ClientError::Url(message) => Self::Transport(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_fields_in_order() {
        assert_eq!(
            error_message(r#"{"error":"Bad Request","detail":"amount must be positive"}"#)
                .as_deref(),
            Some("amount must be positive")
        );
        assert_eq!(
            error_message(r#"{"message":"  ","title":"Conflict"}"#).as_deref(),
            Some("Conflict")
        );
        assert_eq!(error_message(r#"{"status":500}"#), None);
    }

    #[test]
    fn string_and_plain_bodies() {
        assert_eq!(error_message(r#""wallet archived""#).as_deref(), Some("wallet archived"));
        assert_eq!(error_message("wallet archived").as_deref(), Some("wallet archived"));
        assert_eq!(error_message("<html>502</html>"), None);
        assert_eq!(error_message(""), None);
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(ClientError::from_status(401, ""), ClientError::Unauthorized));
        assert!(matches!(ClientError::from_status(403, "{}"), ClientError::Forbidden));
        assert!(matches!(
            ClientError::from_status(422, r#"{"message":"bad"}"#),
            ClientError::Validation(message) if message == "bad"
        ));
        assert!(matches!(
            ClientError::from_status(400, r#"{"message":"bad"}"#),
            ClientError::Server { status: 400, .. }
        ));
    }

    #[test]
    fn forbidden_becomes_fixed_user_message() {
        let remote = RemoteError::from(ClientError::from_status(403, r#"{"message":"nope"}"#));
        assert_eq!(remote.user_message("x"), engine::PERMISSION_DENIED_MESSAGE);
    }
}
