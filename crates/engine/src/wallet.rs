//! Canonical wallet records built from whatever shape the server returns.
//!
//! The wallet endpoints are not consistent with field naming: balances may be
//! camelCase, snake_case or a legacy `balance`, and numbers may arrive as
//! strings. [`normalize_wallet`] folds all of that into one [`Wallet`] and
//! never fails.

use api_types::{amount, user::UserProfile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Currency;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WalletStatus {
    Active,
    Archived,
}

impl WalletStatus {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Role of a member on a wallet.
///
/// - `Owner`: full access, manages members.
/// - `Writer`: can add and delete transactions.
/// - `Reader`: read-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    Owner,
    Writer,
    Reader,
}

impl MemberRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Some(Self::Owner),
            "WRITER" => Some(Self::Writer),
            "READER" => Some(Self::Reader),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Writer => "WRITER",
            Self::Reader => "READER",
        }
    }
}

/// A wallet in canonical form.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WalletStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Member records exactly as the server sent them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Value>>,
}

/// Returns the first of `keys` whose value is present and not `null`.
///
/// Later keys are only consulted when earlier ones are absent: a present but
/// unparseable value still wins.
fn first_present<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Builds a [`Wallet`] from an arbitrary server payload.
pub fn normalize_wallet(raw: &Value) -> Wallet {
    let text = |keys: &[&str]| first_present(raw, keys).and_then(as_text);
    let balance = |keys: &[&str]| first_present(raw, keys).and_then(amount::coerce);

    Wallet {
        id: text(&["id"]).unwrap_or_default(),
        name: text(&["name"]).unwrap_or_default(),
        currency: text(&["currency"]).and_then(|code| Currency::try_from(code.as_str()).ok()),
        status: text(&["status"]).and_then(|status| WalletStatus::parse(&status)),
        initial_balance: balance(&["initialBalance", "initial_balance"]),
        current_balance: balance(&["currentBalance", "current_balance", "balance"]),
        created_at: first_present(raw, &["createdAt", "created_at"])
            .and_then(Value::as_str)
            .map(str::to_string),
        updated_at: first_present(raw, &["updatedAt", "updated_at"])
            .and_then(Value::as_str)
            .map(str::to_string),
        members: raw.get("members").and_then(Value::as_array).cloned(),
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn field<'a>(member: &'a Value, key: &str) -> Option<&'a str> {
    trimmed(member.get(key).and_then(Value::as_str))
}

/// Returns `true` if `member` refers to `user`.
///
/// Tried in order: `userId` (exact), `email`, `preferredUsername` and
/// `username` (case-insensitive). The last two are both matched against the
/// profile's preferred username.
pub fn member_matches(member: &Value, user: &UserProfile) -> bool {
    if !member.is_object() {
        return false;
    }

    if let (Some(expected), Some(actual)) = (trimmed(user.id.as_deref()), field(member, "userId"))
        && expected == actual
    {
        return true;
    }

    if let (Some(expected), Some(actual)) = (trimmed(user.email.as_deref()), field(member, "email"))
        && expected.eq_ignore_ascii_case(actual)
    {
        return true;
    }

    if let Some(expected) = trimmed(user.preferred_username.as_deref()) {
        return ["preferredUsername", "username"]
            .iter()
            .filter_map(|key| field(member, key))
            .any(|actual| expected.eq_ignore_ascii_case(actual));
    }

    false
}

impl Wallet {
    pub fn is_archived(&self) -> bool {
        self.status == Some(WalletStatus::Archived)
    }

    /// Role of `user` on this wallet, if the member list says so.
    pub fn role_for(&self, user: &UserProfile) -> Option<MemberRole> {
        self.members
            .as_ref()?
            .iter()
            .find(|member| member_matches(member, user))?
            .get("role")
            .and_then(Value::as_str)
            .and_then(MemberRole::parse)
    }

    pub fn is_owner(&self, user: &UserProfile) -> bool {
        self.role_for(user) == Some(MemberRole::Owner)
    }

    /// UI hint only: when no role can be determined the server decides, so
    /// this returns `true`.
    pub fn can_write(&self, user: Option<&UserProfile>) -> bool {
        let Some(user) = user else {
            return true;
        };
        self.role_for(user) != Some(MemberRole::Reader)
    }
}

/// Keeps either the archived wallets or the others.
pub fn filter_archived(wallets: &[Wallet], archived: bool) -> Vec<&Wallet> {
    wallets
        .iter()
        .filter(|wallet| wallet.is_archived() == archived)
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn alice() -> UserProfile {
        UserProfile {
            id: Some("u-1".to_string()),
            email: Some("Alice@Example.com".to_string()),
            preferred_username: Some("alice".to_string()),
            ..UserProfile::default()
        }
    }

    #[test]
    fn camel_case_wins_over_snake_case() {
        let wallet = normalize_wallet(&json!({
            "id": "w1",
            "name": "Cash",
            "currency": "EUR",
            "initialBalance": 10,
            "initial_balance": 99,
            "current_balance": "12.34",
            "balance": 1
        }));
        assert_eq!(wallet.initial_balance, Some(dec!(10)));
        assert_eq!(wallet.current_balance, Some(dec!(12.34)));
        assert_eq!(wallet.currency, Some(Currency::Eur));
    }

    #[test]
    fn legacy_balance_is_last_resort() {
        let wallet = normalize_wallet(&json!({"id": "w1", "name": "Cash", "balance": "5.5"}));
        assert_eq!(wallet.current_balance, Some(dec!(5.5)));
        assert_eq!(wallet.initial_balance, None);
    }

    #[test]
    fn missing_balances_stay_unset() {
        let wallet = normalize_wallet(&json!({"id": "w1", "name": "Cash", "currency": "USD"}));
        assert_eq!(wallet.current_balance, None);
        assert_eq!(wallet.initial_balance, None);
    }

    #[test]
    fn garbage_never_fails() {
        let wallet = normalize_wallet(&json!({
            "id": 7,
            "currency": "XXX",
            "initialBalance": "",
            "currentBalance": "not a number",
            "current_balance": 3,
            "members": "nope"
        }));
        assert_eq!(wallet.id, "7");
        assert_eq!(wallet.name, "");
        assert_eq!(wallet.currency, None);
        assert_eq!(wallet.initial_balance, None);
        assert_eq!(wallet.current_balance, None);
        assert_eq!(wallet.members, None);

        assert_eq!(normalize_wallet(&json!(null)), Wallet::default());
        assert_eq!(normalize_wallet(&json!([1, 2])), Wallet::default());
    }

    #[test]
    fn timestamps_fall_back_to_snake_case() {
        let wallet = normalize_wallet(&json!({
            "id": "w1",
            "created_at": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-02-01T00:00:00Z",
            "updated_at": "ignored"
        }));
        assert_eq!(wallet.created_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(wallet.updated_at.as_deref(), Some("2026-02-01T00:00:00Z"));
    }

    #[test]
    fn normalizing_twice_is_identity() {
        let once = normalize_wallet(&json!({
            "id": "w1",
            "name": "Bank",
            "currency": "pln",
            "status": "archived",
            "initial_balance": "100.50",
            "balance": 42,
            "created_at": "2026-01-01T00:00:00Z",
            "members": [{"userId": "u-1", "role": "OWNER"}]
        }));
        let twice = normalize_wallet(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
        assert!(twice.is_archived());
    }

    #[test]
    fn role_matches_by_id_email_or_username() {
        let wallet = normalize_wallet(&json!({
            "id": "w1",
            "members": [
                {"userId": "someone-else", "role": "OWNER"},
                {"email": "alice@example.com ", "role": "reader"}
            ]
        }));
        assert_eq!(wallet.role_for(&alice()), Some(MemberRole::Reader));
        assert!(!wallet.can_write(Some(&alice())));
        assert!(!wallet.is_owner(&alice()));

        let wallet = normalize_wallet(&json!({
            "id": "w2",
            "members": [{"username": "ALICE", "role": "writer"}]
        }));
        assert_eq!(wallet.role_for(&alice()), Some(MemberRole::Writer));

        let wallet = normalize_wallet(&json!({
            "id": "w3",
            "members": [{"userId": "u-1", "role": "OWNER"}]
        }));
        assert!(wallet.is_owner(&alice()));
    }

    #[test]
    fn unknown_role_allows_writes() {
        let wallet = normalize_wallet(&json!({
            "id": "w1",
            "members": [{"userId": "u-1", "role": "ADMIN"}, "junk"]
        }));
        assert_eq!(wallet.role_for(&alice()), None);
        assert!(wallet.can_write(Some(&alice())));
        assert!(wallet.can_write(None));
    }

    #[test]
    fn filters_archived() {
        let wallets = vec![
            normalize_wallet(&json!({"id": "a", "status": "ARCHIVED"})),
            normalize_wallet(&json!({"id": "b", "status": "ACTIVE"})),
            normalize_wallet(&json!({"id": "c"})),
        ];
        let archived: Vec<_> = filter_archived(&wallets, true).into_iter().map(|w| w.id.as_str()).collect();
        let active: Vec<_> = filter_archived(&wallets, false).into_iter().map(|w| w.id.as_str()).collect();
        assert_eq!(archived, vec!["a"]);
        assert_eq!(active, vec!["b", "c"]);
    }
}
