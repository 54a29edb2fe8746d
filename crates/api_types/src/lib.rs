//! JSON wire types of the Persfin HTTP API.
//!
//! Field names follow the server's camelCase convention. Monetary values are
//! JSON numbers on the wire and [`Decimal`] in Rust; see [`amount`] for the
//! coercion rules applied to inbound values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod amount {
    //! Lenient amount coercion.
    //!
    //! The server is not consistent about amounts: some endpoints return JSON
    //! numbers, others numeric strings. Everything inbound goes through
    //! [`coerce`], which never fails: anything that is not a finite number
    //! becomes `None`.
    //!
    //! Outbound amounts are JSON numbers, which the server reads as `f64`.
    //! Only [`MAX_WIRE_DIGITS`] significant digits survive that exactly, so
    //! longer amounts fail to serialize instead of being rounded.

    use std::str::FromStr;

    use rust_decimal::{Decimal, prelude::ToPrimitive};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use serde_json::Value;

    /// Coerces a JSON value into an amount.
    ///
    /// Numbers and numeric strings (surrounding whitespace ignored) are
    /// accepted; `null`, empty strings, booleans, arrays, objects and
    /// unparseable strings are `None`.
    #[must_use]
    pub fn coerce(value: &Value) -> Option<Decimal> {
        match value {
            Value::Number(number) => parse(&number.to_string()),
            Value::String(raw) => parse(raw.trim()),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Decimal> {
        if raw.is_empty() {
            return None;
        }
        Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .ok()
    }

    /// Significant digits an `f64` carries without loss.
    pub const MAX_WIRE_DIGITS: u32 = 15;

    fn to_f64<E: serde::ser::Error>(value: &Decimal) -> Result<f64, E> {
        let digits = value.normalize().mantissa().unsigned_abs();
        if digits >= 10u128.pow(MAX_WIRE_DIGITS) {
            return Err(E::custom(format!(
                "amount {value} has more than {MAX_WIRE_DIGITS} significant digits"
            )));
        }
        value
            .to_f64()
            .ok_or_else(|| E::custom(format!("amount {value} is not representable")))
    }

    /// Required amount: serialized as a JSON number, deserialized leniently but
    /// rejected when missing or unparseable.
    pub mod number {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_f64(to_f64::<S::Error>(value)?)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
            let value = Value::deserialize(deserializer)?;
            coerce(&value).ok_or_else(|| D::Error::custom(format!("invalid amount: {value}")))
        }
    }

    /// Optional amount: unparseable inbound values become `None`.
    ///
    /// Fields using this module need `#[serde(default)]` so that a missing key
    /// is accepted too.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<Decimal>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_some(&to_f64::<S::Error>(value)?),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Decimal>, D::Error> {
            let value = Option::<Value>::deserialize(deserializer)?;
            Ok(value.as_ref().and_then(coerce))
        }
    }
}

pub mod user {
    use super::*;

    /// Profile of the authenticated user (`GET /api/me`).
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserProfile {
        pub id: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub email: Option<String>,
        pub photo_url: Option<String>,
        pub role: Option<String>,
        pub active: Option<bool>,
        pub preferred_username: Option<String>,
    }
}

pub mod wallet {
    use super::*;

    /// Request body for `POST /api/wallets`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateWalletRequest {
        pub name: String,
        /// ISO code, one of the currencies the server accepts.
        pub currency: String,
        #[serde(with = "crate::amount::number")]
        pub initial_balance: Decimal,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionType {
        Expense,
        Income,
        Transfer,
    }

    impl TransactionType {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Expense => "EXPENSE",
                Self::Income => "INCOME",
                Self::Transfer => "TRANSFER",
            }
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum TransactionStatus {
        Posted,
        Deleted,
    }

    impl TransactionStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Posted => "POSTED",
                Self::Deleted => "DELETED",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateTransactionRequest {
        #[serde(rename = "type")]
        pub kind: TransactionType,
        #[serde(with = "crate::amount::number")]
        pub amount: Decimal,
        pub transaction_date: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub category: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub wallet_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub from_wallet_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub to_wallet_id: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionResponse {
        pub id: String,
        #[serde(rename = "type")]
        pub kind: TransactionType,
        pub status: TransactionStatus,
        #[serde(with = "crate::amount::number")]
        pub amount: Decimal,
        pub currency: String,
        /// ISO-8601 instant as sent by the server.
        pub transaction_date: String,
        #[serde(default)]
        pub category: Option<String>,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub wallet_id: Option<String>,
        #[serde(default)]
        pub from_wallet_id: Option<String>,
        #[serde(default)]
        pub to_wallet_id: Option<String>,
        #[serde(default)]
        pub created_by_user_id: Option<String>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Totals {
        #[serde(with = "crate::amount::number")]
        pub total_income: Decimal,
        #[serde(with = "crate::amount::number")]
        pub total_expense: Decimal,
        #[serde(with = "crate::amount::number")]
        pub net: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ListTransactionsResponse {
        pub items: Vec<TransactionResponse>,
        #[serde(default)]
        pub totals: Totals,
    }

    /// Query filters for `GET /api/transactions`.
    #[derive(Clone, Debug, Default)]
    pub struct ListTransactionsFilters {
        pub wallet_id: Option<String>,
        pub from: Option<String>,
        pub to: Option<String>,
        pub kind: Option<TransactionType>,
        pub q: Option<String>,
        pub status: Option<TransactionStatus>,
    }

    impl ListTransactionsFilters {
        /// Query pairs with blank values dropped and the rest trimmed.
        pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
            let candidates = [
                ("walletId", self.wallet_id.clone()),
                ("from", self.from.clone()),
                ("to", self.to.clone()),
                ("type", self.kind.map(|kind| kind.as_str().to_string())),
                ("q", self.q.clone()),
                ("status", self.status.map(|status| status.as_str().to_string())),
            ];
            candidates
                .into_iter()
                .filter_map(|(key, value)| {
                    let value = value?;
                    let trimmed = value.trim();
                    (!trimmed.is_empty()).then(|| (key, trimmed.to_string()))
                })
                .collect()
        }
    }

    /// A line item of an itemized transaction.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionItem {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub category: String,
        #[serde(with = "crate::amount::number")]
        pub amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub note: Option<String>,
    }

    /// Response of `GET /api/transactions/{id}/items`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionDetailResponse {
        pub transaction: TransactionResponse,
        #[serde(default)]
        pub items: Vec<TransactionItem>,
        #[serde(default, with = "crate::amount::option")]
        pub allocated_total: Option<Decimal>,
        #[serde(default)]
        pub balanced: Option<bool>,
    }

    /// Request body for `PUT /api/transactions/{id}/items`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReplaceItemsRequest {
        pub items: Vec<TransactionItem>,
    }
}

pub mod receipt {
    use super::*;

    /// A line item recognized by OCR. Every field may be missing.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct ReceiptItemDraft {
        #[serde(default)]
        pub name: Option<String>,
        #[serde(default, with = "crate::amount::option")]
        pub amount: Option<Decimal>,
        #[serde(default)]
        pub category: Option<String>,
    }

    /// Response of `POST /api/receipts/ocr`.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReceiptOcrResponse {
        #[serde(default)]
        pub ocr_text: String,
        #[serde(default)]
        pub merchant: Option<String>,
        #[serde(default, with = "crate::amount::option")]
        pub total_amount: Option<Decimal>,
        #[serde(default)]
        pub currency: Option<String>,
        #[serde(default)]
        pub items: Vec<ReceiptItemDraft>,
        #[serde(default)]
        pub warnings: Vec<String>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ReceiptItemConfirm {
        pub name: String,
        #[serde(with = "crate::amount::number")]
        pub amount: Decimal,
        pub category: String,
    }

    /// Request body for `POST /api/receipts/confirm`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReceiptConfirmRequest {
        pub wallet_id: String,
        pub transaction_date: DateTime<Utc>,
        pub merchant: Option<String>,
        pub description: Option<String>,
        #[serde(with = "crate::amount::number")]
        pub total_amount: Decimal,
        pub currency: String,
        pub items: Vec<ReceiptItemConfirm>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ConfirmReceiptResponse {
        pub transaction_id: String,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::{amount::coerce, receipt::ReceiptOcrResponse, transaction::*};

    #[test]
    fn coerce_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce(&json!(12.5)), Some(dec!(12.5)));
        assert_eq!(coerce(&json!(100)), Some(dec!(100)));
        assert_eq!(coerce(&json!(" 7.25 ")), Some(dec!(7.25)));
        assert_eq!(coerce(&json!("1e2")), Some(dec!(100)));
    }

    #[test]
    fn coerce_rejects_everything_else() {
        assert_eq!(coerce(&json!(null)), None);
        assert_eq!(coerce(&json!("")), None);
        assert_eq!(coerce(&json!("   ")), None);
        assert_eq!(coerce(&json!("abc")), None);
        assert_eq!(coerce(&json!(true)), None);
        assert_eq!(coerce(&json!([1])), None);
    }

    #[test]
    fn ocr_response_tolerates_missing_and_invalid_amounts() {
        let raw = json!({
            "ocrText": "...",
            "merchant": "Lidl",
            "totalAmount": null,
            "items": [
                {"name": "Milk", "amount": "1.20"},
                {"amount": "n/a", "category": null},
                {}
            ]
        });
        let parsed: ReceiptOcrResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.total_amount, None);
        assert_eq!(parsed.currency, None);
        assert_eq!(parsed.items.len(), 3);
        assert_eq!(parsed.items[0].amount, Some(dec!(1.20)));
        assert_eq!(parsed.items[1].amount, None);
        assert_eq!(parsed.items[2].name, None);
    }

    #[test]
    fn item_amount_is_a_json_number_on_the_wire() {
        let item = TransactionItem {
            name: "Bread".to_string(),
            category: "groceries".to_string(),
            amount: dec!(2.50),
            note: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({"name": "Bread", "category": "groceries", "amount": 2.5})
        );
    }

    #[test]
    fn long_amounts_are_refused_rather_than_rounded() {
        let item = |amount| TransactionItem {
            name: "Car".to_string(),
            category: "transport".to_string(),
            amount,
            note: None,
        };

        let value = serde_json::to_value(item(dec!(12345678901234.5))).unwrap();
        assert_eq!(value["amount"], json!(12345678901234.5));

        let err = serde_json::to_value(item(dec!(1234567890123456.78))).unwrap_err();
        assert!(err.to_string().contains("significant digits"));
    }

    #[test]
    fn list_filters_drop_blank_values() {
        let filters = ListTransactionsFilters {
            wallet_id: Some("  w1 ".to_string()),
            from: Some("   ".to_string()),
            kind: Some(TransactionType::Expense),
            status: Some(TransactionStatus::Posted),
            ..ListTransactionsFilters::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("walletId", "w1".to_string()),
                ("type", "EXPENSE".to_string()),
                ("status", "POSTED".to_string()),
            ]
        );
    }
}
