//! Access tokens for the API.

use std::future::Future;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;

/// Source of bearer tokens and the identity's roles.
pub trait AuthProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    fn roles(&self) -> Vec<String>;

    fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|candidate| candidate == role)
    }

    /// Tries to obtain a fresh token after the server rejected the current
    /// one. Returns `true` if a new token is available.
    fn refresh(&self) -> impl Future<Output = bool> + Send;
}

/// A fixed, pre-issued token. It cannot be refreshed.
#[derive(Clone, Debug, Default)]
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        let token = token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Self { token }
    }
}

impl AuthProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn roles(&self) -> Vec<String> {
        self.token.as_deref().map(realm_roles).unwrap_or_default()
    }

    async fn refresh(&self) -> bool {
        false
    }
}

/// Reads `realm_access.roles` from a JWT payload. The signature is not
/// checked; the server does that.
pub fn realm_roles(token: &str) -> Vec<String> {
    let Some(payload) = token.split('.').nth(1) else {
        return Vec::new();
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) else {
        return Vec::new();
    };
    let Ok(claims) = serde_json::from_slice::<Value>(&bytes) else {
        return Vec::new();
    };
    claims
        .pointer("/realm_access/roles")
        .and_then(Value::as_array)
        .map(|roles| {
            roles
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
