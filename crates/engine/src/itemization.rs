//! Splitting one transaction into categorized line items.
//!
//! [`Itemization`] holds the working set of item rows for a single
//! transaction while the user edits it. Nothing is sent to the server until
//! [`Itemization::submit`], and submission is refused locally unless every
//! row is complete and the rows add up to the transaction amount.
//!
//! Loads are ticketed: [`Itemization::begin_load`] hands out a
//! [`LoadTicket`] and only the result carrying the newest ticket is applied,
//! so a slow response for a previously opened transaction can never
//! overwrite the one currently on screen.

use std::{future::Future, sync::Arc};

use api_types::transaction::{TransactionDetailResponse, TransactionItem, TransactionResponse};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{EngineError, RemoteError, category::UNCATEGORIZED, money, notify::NotificationSink};

pub const LOAD_FAILED: &str = "Failed to load transaction details.";
pub const SAVE_FAILED: &str = "Failed to save items.";
pub const CLEAR_FAILED: &str = "Failed to clear items.";
pub const SAVED: &str = "Transaction itemized successfully";
pub const RESTORED: &str = "Transaction restored to single item";
pub const RESET_CONFIRMATION: &str =
    "Are you sure? This will remove all split items and restore the original transaction.";

/// Remote operations the reconciler needs.
pub trait ItemizationBackend {
    fn transaction_detail(
        &self,
        transaction_id: &str,
    ) -> impl Future<Output = Result<TransactionDetailResponse, RemoteError>> + Send;

    /// Replaces the whole item list of a transaction.
    fn replace_items(
        &self,
        transaction_id: &str,
        items: &[TransactionItem],
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Removes every item, leaving the transaction unitemized.
    fn clear_items(&self, transaction_id: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemizationError {
    #[error("No transaction is open")]
    NoTransaction,
    #[error("A request is already in progress")]
    Busy,
    #[error("Cancelled")]
    Cancelled,
    #[error(transparent)]
    Invalid(#[from] EngineError),
    #[error("{0}")]
    Remote(String),
}

/// One editable line item. `amount` is `None` while the user's input is not
/// a number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemRow {
    pub name: String,
    pub category: String,
    pub amount: Option<Decimal>,
    pub note: String,
}

impl ItemRow {
    pub fn new(name: &str, category: &str, amount: Decimal) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            amount: Some(amount),
            note: String::new(),
        }
    }

    fn to_item(&self, index: usize) -> Result<TransactionItem, EngineError> {
        let invalid = |reason: &str| EngineError::InvalidItem {
            index,
            reason: reason.to_string(),
        };
        let name = self.name.trim();
        if name.is_empty() {
            return Err(invalid("name is required"));
        }
        let category = self.category.trim();
        if category.is_empty() {
            return Err(invalid("category is required"));
        }
        let amount = match self.amount {
            Some(amount) if amount > Decimal::ZERO => amount,
            _ => return Err(invalid("amount must be positive")),
        };
        let note = self.note.trim();
        Ok(TransactionItem {
            name: name.to_string(),
            category: category.to_string(),
            amount,
            note: (!note.is_empty()).then(|| note.to_string()),
        })
    }
}

impl From<&TransactionItem> for ItemRow {
    fn from(item: &TransactionItem) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category.clone(),
            amount: Some(item.amount),
            note: item.note.clone().unwrap_or_default(),
        }
    }
}

/// Proof that a load was started; see [`Itemization::apply_loaded`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    transaction_id: String,
}

impl LoadTicket {
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

pub struct Itemization {
    notifier: Arc<dyn NotificationSink>,
    transaction: Option<TransactionResponse>,
    rows: Vec<ItemRow>,
    /// `None` once the row amounts no longer add up within [`Decimal`].
    allocated: Option<Decimal>,
    generation: u64,
    loading: bool,
    saving: bool,
    error: Option<String>,
}

impl Itemization {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            notifier,
            transaction: None,
            rows: Vec::new(),
            allocated: Some(Decimal::ZERO),
            generation: 0,
            loading: false,
            saving: false,
            error: None,
        }
    }

    pub fn transaction(&self) -> Option<&TransactionResponse> {
        self.transaction.as_ref()
    }

    pub fn rows(&self) -> &[ItemRow] {
        &self.rows
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Last failure, kept until the next load or save attempt.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The amount the items must add up to.
    pub fn total(&self) -> Decimal {
        self.transaction
            .as_ref()
            .map_or(Decimal::ZERO, |tx| tx.amount)
    }

    /// Sum of the row amounts, `None` if it is out of range.
    pub fn allocated_total(&self) -> Option<Decimal> {
        self.allocated
    }

    pub fn remaining(&self) -> Option<Decimal> {
        self.allocated
            .and_then(|allocated| money::difference(self.total(), allocated).ok())
    }

    pub fn is_balanced(&self) -> bool {
        self.allocated
            .is_some_and(|allocated| money::is_balanced(self.total(), allocated))
    }

    /// Opens `transaction` with an empty working set and returns the ticket
    /// its detail response must present.
    pub fn begin_load(&mut self, transaction: TransactionResponse) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            transaction_id: transaction.id.clone(),
        };
        self.transaction = Some(transaction);
        self.rows.clear();
        self.recalculate();
        self.loading = true;
        self.error = None;
        ticket
    }

    /// Applies a detail response. Returns `false` if the ticket is stale and
    /// the result was dropped.
    pub fn apply_loaded(
        &mut self,
        ticket: LoadTicket,
        result: Result<TransactionDetailResponse, RemoteError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                "dropping stale detail for transaction {}",
                ticket.transaction_id
            );
            return false;
        }
        self.loading = false;

        match result {
            Ok(detail) => {
                self.rows = if detail.items.is_empty() {
                    vec![seed_row(&detail.transaction)]
                } else {
                    detail.items.iter().map(ItemRow::from).collect()
                };
                self.transaction = Some(detail.transaction);
            }
            Err(err) => {
                tracing::warn!("loading transaction {} failed: {err}", ticket.transaction_id);
                self.error = Some(err.user_message(LOAD_FAILED));
            }
        }
        self.recalculate();
        true
    }

    /// Loads the current items of `transaction` from `backend`.
    pub async fn load<B: ItemizationBackend>(
        &mut self,
        backend: &B,
        transaction: TransactionResponse,
    ) -> bool {
        let ticket = self.begin_load(transaction);
        let result = backend.transaction_detail(ticket.transaction_id()).await;
        self.apply_loaded(ticket, result)
    }

    /// Appends a row, blank unless `initial` is given.
    pub fn add_item(&mut self, initial: Option<ItemRow>) {
        self.rows.push(initial.unwrap_or_default());
        self.recalculate();
    }

    /// Removes the row at `index`; out-of-range indices are ignored.
    pub fn remove_item(&mut self, index: usize) -> Option<ItemRow> {
        if index >= self.rows.len() {
            return None;
        }
        let removed = self.rows.remove(index);
        self.recalculate();
        Some(removed)
    }

    pub fn set_name(&mut self, index: usize, name: &str) -> bool {
        self.edit(index, |row| row.name = name.to_string())
    }

    pub fn set_category(&mut self, index: usize, category: &str) -> bool {
        self.edit(index, |row| row.category = category.to_string())
    }

    pub fn set_amount(&mut self, index: usize, amount: Option<Decimal>) -> bool {
        self.edit(index, |row| row.amount = amount)
    }

    pub fn set_note(&mut self, index: usize, note: &str) -> bool {
        self.edit(index, |row| row.note = note.to_string())
    }

    fn edit(&mut self, index: usize, apply: impl FnOnce(&mut ItemRow)) -> bool {
        let Some(row) = self.rows.get_mut(index) else {
            return false;
        };
        apply(row);
        self.recalculate();
        true
    }

    /// Recomputes the allocated total; rows without a numeric amount count
    /// as zero. A sum out of range is kept as the current error.
    pub fn recalculate(&mut self) {
        match money::sum(self.rows.iter().map(|row| row.amount)) {
            Ok(allocated) => {
                if self.allocated.is_none() {
                    self.error = None;
                }
                self.allocated = Some(allocated);
            }
            Err(err) => {
                tracing::warn!("item amounts cannot be added up: {err}");
                self.allocated = None;
                self.error = Some(err.to_string());
            }
        }
    }

    /// Converts the working set into request items, or explains why it
    /// cannot be submitted yet.
    pub fn validated_items(&self) -> Result<Vec<TransactionItem>, EngineError> {
        if self.rows.is_empty() {
            return Err(EngineError::InvalidTransaction(
                "at least one item is required".to_string(),
            ));
        }
        let items = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| row.to_item(index))
            .collect::<Result<Vec<_>, _>>()?;
        let allocated = self
            .allocated
            .ok_or_else(|| EngineError::InvalidAmount(money::OUT_OF_RANGE.to_string()))?;
        if !money::is_balanced(self.total(), allocated) {
            return Err(EngineError::Unbalanced {
                remaining: money::difference(self.total(), allocated)?.to_string(),
            });
        }
        Ok(items)
    }

    /// Sends the item list. Nothing leaves the process unless every row is
    /// valid and the split is balanced.
    pub async fn submit<B: ItemizationBackend>(&mut self, backend: &B) -> Result<(), ItemizationError> {
        if self.saving {
            return Err(ItemizationError::Busy);
        }
        let Some(transaction_id) = self.transaction.as_ref().map(|tx| tx.id.clone()) else {
            return Err(ItemizationError::NoTransaction);
        };
        let items = match self.validated_items() {
            Ok(items) => items,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };

        self.saving = true;
        self.error = None;
        let result = backend.replace_items(&transaction_id, &items).await;
        self.saving = false;

        match result {
            Ok(()) => {
                tracing::info!("itemized transaction {transaction_id} into {} items", items.len());
                self.notifier.success(SAVED);
                self.discard();
                Ok(())
            }
            Err(err) => Err(self.fail(err, SAVE_FAILED)),
        }
    }

    /// Drops every item on the server after `confirm` accepts
    /// [`RESET_CONFIRMATION`].
    pub async fn reset_to_single<B, C>(&mut self, backend: &B, confirm: C) -> Result<(), ItemizationError>
    where
        B: ItemizationBackend,
        C: FnOnce(&str) -> bool,
    {
        if self.saving {
            return Err(ItemizationError::Busy);
        }
        let Some(transaction_id) = self.transaction.as_ref().map(|tx| tx.id.clone()) else {
            return Err(ItemizationError::NoTransaction);
        };
        if !confirm(RESET_CONFIRMATION) {
            return Err(ItemizationError::Cancelled);
        }

        self.saving = true;
        self.error = None;
        let result = backend.clear_items(&transaction_id).await;
        self.saving = false;

        match result {
            Ok(()) => {
                tracing::info!("cleared items of transaction {transaction_id}");
                self.notifier.success(RESTORED);
                self.discard();
                Ok(())
            }
            Err(err) => Err(self.fail(err, CLEAR_FAILED)),
        }
    }

    /// Closes the transaction and forgets the working set. Loads still in
    /// flight are ignored when they complete.
    pub fn discard(&mut self) {
        self.generation += 1;
        self.transaction = None;
        self.rows.clear();
        self.allocated = Some(Decimal::ZERO);
        self.loading = false;
        self.error = None;
    }

    fn fail(&mut self, err: RemoteError, fallback: &str) -> ItemizationError {
        tracing::warn!("itemization request failed: {err}");
        let message = err.user_message(fallback);
        self.error = Some(message.clone());
        ItemizationError::Remote(message)
    }
}

/// A transaction without items is shown as one row covering its full
/// amount.
fn seed_row(transaction: &TransactionResponse) -> ItemRow {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    ItemRow {
        name: non_blank(&transaction.description).unwrap_or_else(|| "Item 1".to_string()),
        category: non_blank(&transaction.category).unwrap_or_else(|| UNCATEGORIZED.to_string()),
        amount: Some(transaction.amount),
        note: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use api_types::transaction::{TransactionStatus, TransactionType};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::notify::NullSink;

    fn tx(id: &str, amount: Decimal) -> TransactionResponse {
        TransactionResponse {
            id: id.to_string(),
            kind: TransactionType::Expense,
            status: TransactionStatus::Posted,
            amount,
            currency: "EUR".to_string(),
            transaction_date: "2026-01-01T00:00:00Z".to_string(),
            category: None,
            description: None,
            wallet_id: Some("w1".to_string()),
            from_wallet_id: None,
            to_wallet_id: None,
            created_by_user_id: None,
        }
    }

    fn detail(tx: TransactionResponse, items: Vec<TransactionItem>) -> TransactionDetailResponse {
        TransactionDetailResponse {
            transaction: tx,
            items,
            allocated_total: None,
            balanced: None,
        }
    }

    fn itemization() -> Itemization {
        Itemization::new(Arc::new(NullSink))
    }

    #[test]
    fn empty_detail_seeds_full_amount_row() {
        let mut split = itemization();
        let ticket = split.begin_load(tx("t1", dec!(100.00)));
        assert!(split.apply_loaded(ticket, Ok(detail(tx("t1", dec!(100.00)), vec![]))));

        assert_eq!(split.rows().len(), 1);
        assert_eq!(split.rows()[0].amount, Some(dec!(100.00)));
        assert_eq!(split.rows()[0].category, UNCATEGORIZED);
        assert!(split.is_balanced());
    }

    #[test]
    fn field_edits_recalculate() {
        let mut split = itemization();
        let ticket = split.begin_load(tx("t1", dec!(50)));
        split.apply_loaded(ticket, Ok(detail(tx("t1", dec!(50)), vec![])));

        split.set_amount(0, Some(dec!(20)));
        assert_eq!(split.remaining(), Some(dec!(30)));
        split.add_item(Some(ItemRow::new("Tip", "Food", dec!(29.995))));
        assert!(split.is_balanced());
        split.set_amount(1, None);
        assert_eq!(split.allocated_total(), Some(dec!(20)));
        assert!(!split.set_amount(7, Some(dec!(1))));
    }

    #[test]
    fn overflowing_rows_are_reported_not_panicked_on() {
        let mut split = itemization();
        let ticket = split.begin_load(tx("t1", dec!(10)));
        split.apply_loaded(ticket, Ok(detail(tx("t1", dec!(10)), vec![])));

        split.set_amount(0, Some(Decimal::MAX));
        split.add_item(Some(ItemRow::new("Huge", "Misc", Decimal::MAX)));
        assert_eq!(split.allocated_total(), None);
        assert_eq!(split.remaining(), None);
        assert!(!split.is_balanced());
        assert_eq!(split.error(), Some("Invalid amount: amount is out of range"));
        assert_eq!(
            split.validated_items(),
            Err(EngineError::InvalidAmount(money::OUT_OF_RANGE.to_string()))
        );

        assert!(split.remove_item(1).is_some());
        split.set_amount(0, Some(dec!(10)));
        assert_eq!(split.error(), None);
        assert!(split.is_balanced());
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let mut split = itemization();
        split.add_item(None);
        assert_eq!(split.remove_item(3), None);
        assert_eq!(split.rows().len(), 1);
        assert!(split.remove_item(0).is_some());
        assert!(split.rows().is_empty());
    }

    #[test]
    fn stale_result_is_dropped() {
        let mut split = itemization();
        let first = split.begin_load(tx("a", dec!(10)));
        let second = split.begin_load(tx("b", dec!(20)));

        let late = detail(tx("a", dec!(10)), vec![TransactionItem {
            name: "Old".to_string(),
            category: "Misc".to_string(),
            amount: dec!(10),
            note: None,
        }]);
        assert!(!split.apply_loaded(first, Ok(late)));
        assert!(split.rows().is_empty());
        assert!(split.is_loading());

        assert!(split.apply_loaded(second, Ok(detail(tx("b", dec!(20)), vec![]))));
        assert_eq!(split.transaction().map(|tx| tx.id.as_str()), Some("b"));
        assert_eq!(split.total(), dec!(20));
    }

    #[test]
    fn load_failure_is_retained() {
        let mut split = itemization();
        let ticket = split.begin_load(tx("t1", dec!(10)));
        split.apply_loaded(ticket, Err(RemoteError::NotFound));
        assert_eq!(split.error(), Some(LOAD_FAILED));
        assert!(!split.is_loading());
    }

    #[test]
    fn validation_reports_first_bad_row() {
        let mut split = itemization();
        split.begin_load(tx("t1", dec!(10)));
        split.add_item(Some(ItemRow::new("Bread", "Food", dec!(4))));
        split.add_item(Some(ItemRow::new("", "Food", dec!(6))));
        assert_eq!(
            split.validated_items(),
            Err(EngineError::InvalidItem {
                index: 1,
                reason: "name is required".to_string()
            })
        );

        split.set_name(1, "Milk");
        split.set_amount(1, Some(dec!(0)));
        assert!(matches!(
            split.validated_items(),
            Err(EngineError::InvalidItem { index: 1, .. })
        ));
    }
}
