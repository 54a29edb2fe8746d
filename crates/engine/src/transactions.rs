//! Creating and presenting transactions.

use api_types::transaction::{CreateTransactionRequest, TransactionResponse, TransactionType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{EngineError, category};

/// Parses `expense`, `income` or `transfer` (any case).
pub fn parse_kind(value: &str) -> Result<TransactionType, EngineError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "EXPENSE" => Ok(TransactionType::Expense),
        "INCOME" => Ok(TransactionType::Income),
        "TRANSFER" => Ok(TransactionType::Transfer),
        other => Err(EngineError::InvalidTransaction(format!(
            "invalid transaction type: {other}"
        ))),
    }
}

/// A transaction as entered by the user, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
    pub kind: TransactionType,
    pub amount: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub wallet_id: Option<String>,
    pub from_wallet_id: Option<String>,
    pub to_wallet_id: Option<String>,
}

impl NewTransaction {
    pub fn new(kind: TransactionType, amount: Decimal, transaction_date: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount,
            transaction_date,
            category: None,
            description: None,
            wallet_id: None,
            from_wallet_id: None,
            to_wallet_id: None,
        }
    }

    /// Validates and builds the request body.
    ///
    /// Transfers need two different wallets and never carry `walletId`;
    /// every other type needs `walletId` and never carries the transfer ids.
    pub fn into_request(self) -> Result<CreateTransactionRequest, EngineError> {
        if self.amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }

        let (wallet_id, from_wallet_id, to_wallet_id) = match self.kind {
            TransactionType::Transfer => {
                let from = clean(self.from_wallet_id)
                    .ok_or_else(|| EngineError::MissingField("fromWalletId".to_string()))?;
                let to = clean(self.to_wallet_id)
                    .ok_or_else(|| EngineError::MissingField("toWalletId".to_string()))?;
                if from == to {
                    return Err(EngineError::InvalidTransaction(
                        "cannot transfer to the same wallet".to_string(),
                    ));
                }
                (None, Some(from), Some(to))
            }
            TransactionType::Expense | TransactionType::Income => {
                let wallet = clean(self.wallet_id)
                    .ok_or_else(|| EngineError::MissingField("walletId".to_string()))?;
                (Some(wallet), None, None)
            }
        };

        Ok(CreateTransactionRequest {
            kind: self.kind,
            amount: self.amount,
            transaction_date: self.transaction_date,
            category: clean(self.category),
            description: clean(self.description),
            wallet_id,
            from_wallet_id,
            to_wallet_id,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Display glyph for a listed transaction.
pub fn glyph(transaction: &TransactionResponse) -> &'static str {
    category::glyph_for(
        transaction.category.as_deref(),
        transaction.description.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap()
    }

    #[test]
    fn expense_requires_wallet() {
        let tx = NewTransaction::new(TransactionType::Expense, dec!(12.5), date());
        assert_eq!(
            tx.into_request(),
            Err(EngineError::MissingField("walletId".to_string()))
        );
    }

    #[test]
    fn amount_must_be_positive() {
        let mut tx = NewTransaction::new(TransactionType::Income, dec!(0), date());
        tx.wallet_id = Some("w1".to_string());
        assert!(matches!(tx.into_request(), Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn transfer_needs_distinct_wallets() {
        let mut tx = NewTransaction::new(TransactionType::Transfer, dec!(5), date());
        tx.from_wallet_id = Some("w1".to_string());
        tx.to_wallet_id = Some(" w1 ".to_string());
        assert!(matches!(
            tx.clone().into_request(),
            Err(EngineError::InvalidTransaction(_))
        ));

        tx.to_wallet_id = Some("w2".to_string());
        tx.wallet_id = Some("ignored".to_string());
        let request = tx.into_request().unwrap();
        assert_eq!(request.wallet_id, None);
        assert_eq!(request.from_wallet_id.as_deref(), Some("w1"));
        assert_eq!(request.to_wallet_id.as_deref(), Some("w2"));
    }

    #[test]
    fn blank_optionals_are_dropped() {
        let mut tx = NewTransaction::new(TransactionType::Expense, dec!(3), date());
        tx.wallet_id = Some("w1".to_string());
        tx.category = Some("  ".to_string());
        tx.description = Some(" Coffee ".to_string());
        let request = tx.into_request().unwrap();
        assert_eq!(request.category, None);
        assert_eq!(request.description.as_deref(), Some("Coffee"));
    }

    #[test]
    fn parses_kinds() {
        assert_eq!(parse_kind("transfer"), Ok(TransactionType::Transfer));
        assert!(parse_kind("refund").is_err());
    }
}
