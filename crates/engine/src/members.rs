//! Adding wallet members when the server's field name is unknown.
//!
//! The member endpoint expects a single-field JSON object carrying the
//! member's email, but deployments disagree on the field's name. The first
//! attempt uses `email`; if the server rejects it with an "unrecognized
//! field" parse error that names the expected property, the request is sent
//! exactly once more with that property.

use std::{collections::BTreeMap, future::Future};

use regex::Regex;
use serde::Serialize;

use crate::{EngineError, RemoteError};

/// Field name used on the first attempt.
pub const DEFAULT_MEMBER_FIELD: &str = "email";

/// Body of an add-member request: one field, the member's email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MemberPayload(BTreeMap<String, String>);

impl MemberPayload {
    pub fn new(field: &str, email: &str) -> Self {
        Self(BTreeMap::from([(field.to_string(), email.to_string())]))
    }

    pub fn field(&self) -> Option<&str> {
        self.0.keys().next().map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.values().next().map(String::as_str)
    }
}

/// Trims and sanity-checks an email before it is sent anywhere.
pub fn validate_member_email(email: &str) -> Result<&str, EngineError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(EngineError::MissingField("email".to_string()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(EngineError::InvalidTransaction(format!(
            "'{email}' is not a valid email"
        ))),
    }
}

fn capture(pattern: &str, haystack: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(haystack)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Extracts the property name the server expected from a parse-error message.
///
/// Recognized shapes, in order:
/// - `... one known property: "userEmail"` (single property)
/// - `... known properties: ["userEmail","userId"]` (first of the list)
/// - `... known property: "userEmail"`
pub fn infer_expected_field(message: &str) -> Option<String> {
    if let Some(field) = capture(r#"(?i)one known property:\s*"([^"]+)""#, message) {
        return Some(field);
    }
    if let Some(list) = capture(r"(?i)known properties:\s*\[([^\]]+)\]", message) {
        return capture(r#""([^"]+)""#, &list);
    }
    capture(r#"(?i)known property:\s*"([^"]+)""#, message)
}

/// Runs `send` with `{email: <email>}` and, on an unrecognized-field error
/// naming another property, once more with that property.
///
/// Any other failure, and any failure of the second attempt, is returned
/// unchanged.
pub async fn add_member_with_field_retry<T, F, Fut>(
    email: &str,
    mut send: F,
) -> Result<T, RemoteError>
where
    F: FnMut(MemberPayload) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let email = email.trim();
    let err = match send(MemberPayload::new(DEFAULT_MEMBER_FIELD, email)).await {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let Some(field) = err.message().and_then(infer_expected_field) else {
        return Err(err);
    };
    if field == DEFAULT_MEMBER_FIELD {
        return Err(err);
    }

    tracing::warn!("member field 'email' rejected, retrying with '{field}'");
    send(MemberPayload::new(&field, email)).await
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;

    const JACKSON_ONE: &str = r#"JSON parse error: Unrecognized field "email" (class com.persfin.AddWalletMemberRequest), not marked as ignorable (one known property: "userEmail"])"#;

    #[test]
    fn infers_single_known_property() {
        assert_eq!(infer_expected_field(JACKSON_ONE).as_deref(), Some("userEmail"));
    }

    #[test]
    fn infers_first_of_known_properties() {
        let message = r#"Unrecognized field "email" (class X), not marked as ignorable (2 known properties: ["memberEmail", "role"])"#;
        assert_eq!(infer_expected_field(message).as_deref(), Some("memberEmail"));
    }

    #[test]
    fn infers_known_property_phrase() {
        let message = r#"Unrecognized field "email": KNOWN PROPERTY: "login""#;
        assert_eq!(infer_expected_field(message).as_deref(), Some("login"));
    }

    #[test]
    fn unrelated_messages_infer_nothing() {
        assert_eq!(infer_expected_field("Wallet not found"), None);
        assert_eq!(infer_expected_field("known properties: []"), None);
    }

    #[test]
    fn payload_serializes_as_single_field_object() {
        let payload = MemberPayload::new("userEmail", "bob@example.com");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"userEmail": "bob@example.com"})
        );
        assert_eq!(payload.field(), Some("userEmail"));
        assert_eq!(payload.email(), Some("bob@example.com"));
    }

    #[test]
    fn validates_email() {
        assert_eq!(validate_member_email(" bob@example.com ").unwrap(), "bob@example.com");
        assert!(validate_member_email("").is_err());
        assert!(validate_member_email("bob").is_err());
        assert!(validate_member_email("@example.com").is_err());
    }

    #[tokio::test]
    async fn retries_once_with_inferred_field() {
        let calls = RefCell::new(Vec::new());
        let result = add_member_with_field_retry(" bob@example.com", |payload| {
            calls.borrow_mut().push(payload.clone());
            let attempt = calls.borrow().len();
            async move {
                if attempt == 1 {
                    Err(RemoteError::Server {
                        status: 400,
                        message: JACKSON_ONE.to_string(),
                    })
                } else {
                    Ok("added")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("added"));
        let calls = calls.into_inner();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], MemberPayload::new("email", "bob@example.com"));
        assert_eq!(
            serde_json::to_value(&calls[1]).unwrap(),
            json!({"userEmail": "bob@example.com"})
        );
    }

    #[tokio::test]
    async fn unrecognized_error_propagates_without_retry() {
        let calls = RefCell::new(0);
        let result: Result<(), _> = add_member_with_field_retry("bob@example.com", |_| {
            *calls.borrow_mut() += 1;
            async { Err(RemoteError::Forbidden) }
        })
        .await;

        assert_eq!(result, Err(RemoteError::Forbidden));
        assert_eq!(calls.into_inner(), 1);
    }

    #[tokio::test]
    async fn second_failure_is_returned_and_not_retried() {
        let calls = RefCell::new(0);
        let result: Result<(), _> = add_member_with_field_retry("bob@example.com", |_| {
            *calls.borrow_mut() += 1;
            async {
                Err(RemoteError::Validation(JACKSON_ONE.to_string()))
            }
        })
        .await;

        assert_eq!(result, Err(RemoteError::Validation(JACKSON_ONE.to_string())));
        assert_eq!(calls.into_inner(), 2);
    }

    #[tokio::test]
    async fn inferred_email_field_is_not_retried() {
        let calls = RefCell::new(0);
        let message = r#"Unrecognized field "mail" (one known property: "email")"#;
        let result: Result<(), _> = add_member_with_field_retry("bob@example.com", |_| {
            *calls.borrow_mut() += 1;
            async move { Err(RemoteError::Validation(message.to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.into_inner(), 1);
    }
}
