//! Turning a scanned receipt into a saved transaction.
//!
//! The OCR response becomes a [`ReceiptDraft`], the draft becomes an editable
//! [`ReceiptForm`], and the form becomes a [`ReceiptConfirmRequest`] once it
//! validates. [`ReceiptFlow`] drives the steps against a [`ReceiptBackend`].

use std::future::Future;

use api_types::receipt::{
    ConfirmReceiptResponse, ReceiptConfirmRequest, ReceiptItemConfirm, ReceiptOcrResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Currency, EngineError, RemoteError, money};

pub const UNKNOWN_ITEM: &str = "Unknown Item";
pub const DEFAULT_DESCRIPTION: &str = "Receipt upload";
pub const SCAN_FAILED: &str = "Failed to scan receipt. Please try again.";
pub const CONFIRM_FAILED: &str = "Failed to save transaction";

pub trait ReceiptBackend {
    /// Uploads a receipt image and returns what OCR recognized.
    fn upload_receipt(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<ReceiptOcrResponse, RemoteError>> + Send;

    /// Persists a reviewed receipt as an itemized transaction.
    fn confirm_receipt(
        &self,
        request: &ReceiptConfirmRequest,
    ) -> impl Future<Output = Result<ConfirmReceiptResponse, RemoteError>> + Send;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiptRow {
    pub name: String,
    pub amount: Option<Decimal>,
    pub category: String,
}

/// OCR output with defaults filled in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptDraft {
    pub merchant: Option<String>,
    pub total_amount: Decimal,
    pub currency: String,
    pub items: Vec<ReceiptRow>,
}

impl ReceiptDraft {
    /// Builds a draft from an OCR response.
    ///
    /// Missing names become [`UNKNOWN_ITEM`], missing amounts zero, and a
    /// missing currency `default_currency`. When OCR found no total (or a
    /// zero one) the total is the sum of the recognized items.
    pub fn from_ocr(ocr: &ReceiptOcrResponse, default_currency: Currency) -> Self {
        let items: Vec<ReceiptRow> = ocr
            .items
            .iter()
            .map(|item| ReceiptRow {
                name: non_blank(item.name.as_deref()).unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
                amount: Some(item.amount.unwrap_or(Decimal::ZERO)),
                category: non_blank(item.category.as_deref()).unwrap_or_default(),
            })
            .collect();

        let total_amount = match ocr.total_amount {
            Some(total) if !total.is_zero() => total,
            _ => money::sum(items.iter().map(|row| row.amount)).unwrap_or_else(|err| {
                tracing::warn!("receipt items cannot be totalled: {err}");
                Decimal::ZERO
            }),
        };

        Self {
            merchant: non_blank(ocr.merchant.as_deref()),
            total_amount,
            currency: non_blank(ocr.currency.as_deref())
                .map(|code| code.to_uppercase())
                .unwrap_or_else(|| default_currency.code().to_string()),
            items,
        }
    }
}

/// The review form a user edits before confirming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptForm {
    pub wallet_id: String,
    pub merchant: String,
    pub description: String,
    pub transaction_date: DateTime<Utc>,
    pub total_amount: Option<Decimal>,
    pub currency: String,
    pub items: Vec<ReceiptRow>,
}

impl ReceiptForm {
    pub fn from_draft(draft: ReceiptDraft, transaction_date: DateTime<Utc>) -> Self {
        let description = match &draft.merchant {
            Some(merchant) => format!("Receipt from {merchant}"),
            None => DEFAULT_DESCRIPTION.to_string(),
        };
        Self {
            wallet_id: String::new(),
            merchant: draft.merchant.unwrap_or_default(),
            description,
            transaction_date,
            total_amount: Some(draft.total_amount),
            currency: draft.currency,
            items: draft.items,
        }
    }

    pub fn add_item(&mut self) {
        self.items.push(ReceiptRow::default());
    }

    /// Out-of-range indices are ignored.
    pub fn remove_item(&mut self, index: usize) -> Option<ReceiptRow> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn items_sum(&self) -> Result<Decimal, EngineError> {
        money::sum(self.items.iter().map(|row| row.amount))
    }

    pub fn is_total_mismatch(&self) -> bool {
        let total = self.total_amount.unwrap_or(Decimal::ZERO);
        !self
            .items_sum()
            .is_ok_and(|sum| money::is_balanced(sum, total))
    }

    /// Validates the form and builds the confirm request.
    pub fn to_request(&self) -> Result<ReceiptConfirmRequest, EngineError> {
        let wallet_id = self.wallet_id.trim();
        if wallet_id.is_empty() {
            return Err(EngineError::MissingField("walletId".to_string()));
        }
        let total_amount = match self.total_amount {
            Some(total) if total >= money::BALANCE_TOLERANCE => total,
            _ => {
                return Err(EngineError::InvalidAmount(
                    "total amount must be at least 0.01".to_string(),
                ));
            }
        };

        let mut items = Vec::with_capacity(self.items.len());
        for (index, row) in self.items.iter().enumerate() {
            let invalid = |reason: &str| EngineError::InvalidItem {
                index,
                reason: reason.to_string(),
            };
            let name = row.name.trim();
            if name.is_empty() {
                return Err(invalid("name is required"));
            }
            let category = row.category.trim();
            if category.is_empty() {
                return Err(invalid("category is required"));
            }
            let amount = match row.amount {
                Some(amount) if !amount.is_sign_negative() => amount,
                _ => return Err(invalid("amount must not be negative")),
            };
            items.push(ReceiptItemConfirm {
                name: name.to_string(),
                amount,
                category: category.to_string(),
            });
        }

        let sum = self.items_sum()?;
        if !money::is_balanced(sum, total_amount) {
            return Err(EngineError::TotalMismatch {
                sum: format!("{sum:.2}"),
                total: format!("{total_amount:.2}"),
            });
        }

        Ok(ReceiptConfirmRequest {
            wallet_id: wallet_id.to_string(),
            transaction_date: self.transaction_date,
            merchant: non_blank(Some(self.merchant.as_str())),
            description: non_blank(Some(self.description.as_str())),
            total_amount,
            currency: self.currency.trim().to_uppercase(),
            items,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiptStep {
    Upload,
    Review,
    Saved { transaction_id: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("A request is already in progress")]
    Busy,
    #[error("Not available in this step")]
    WrongStep,
    #[error(transparent)]
    Invalid(#[from] EngineError),
    #[error("{0}")]
    Remote(String),
}

/// Upload, review, confirm.
#[derive(Debug)]
pub struct ReceiptFlow {
    default_currency: Currency,
    step: ReceiptStep,
    processing: bool,
    error: Option<String>,
    ocr: Option<ReceiptOcrResponse>,
    form: Option<ReceiptForm>,
}

impl ReceiptFlow {
    pub fn new(default_currency: Currency) -> Self {
        Self {
            default_currency,
            step: ReceiptStep::Upload,
            processing: false,
            error: None,
            ocr: None,
            form: None,
        }
    }

    pub fn step(&self) -> &ReceiptStep {
        &self.step
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Raw OCR result of the current review, kept for reference.
    pub fn ocr(&self) -> Option<&ReceiptOcrResponse> {
        self.ocr.as_ref()
    }

    pub fn form(&self) -> Option<&ReceiptForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ReceiptForm> {
        self.form.as_mut()
    }

    /// Sends the image to OCR and moves to review. On failure the flow stays
    /// in the upload step.
    pub async fn upload<B: ReceiptBackend>(
        &mut self,
        backend: &B,
        file_name: &str,
        bytes: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<(), ReceiptError> {
        if self.processing {
            return Err(ReceiptError::Busy);
        }
        if self.step != ReceiptStep::Upload {
            return Err(ReceiptError::WrongStep);
        }

        self.processing = true;
        self.error = None;
        let result = backend.upload_receipt(file_name, bytes).await;
        self.processing = false;

        match result {
            Ok(ocr) => {
                if !ocr.warnings.is_empty() {
                    tracing::debug!("ocr warnings: {:?}", ocr.warnings);
                }
                let draft = ReceiptDraft::from_ocr(&ocr, self.default_currency);
                self.form = Some(ReceiptForm::from_draft(draft, now));
                self.ocr = Some(ocr);
                self.step = ReceiptStep::Review;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("receipt OCR failed: {err}");
                self.error = Some(SCAN_FAILED.to_string());
                Err(ReceiptError::Remote(SCAN_FAILED.to_string()))
            }
        }
    }

    /// Confirms the reviewed form. Returns the id of the created transaction.
    pub async fn confirm<B: ReceiptBackend>(&mut self, backend: &B) -> Result<String, ReceiptError> {
        if self.processing {
            return Err(ReceiptError::Busy);
        }
        let request = match (&self.step, &self.form) {
            (ReceiptStep::Review, Some(form)) => form.to_request(),
            _ => return Err(ReceiptError::WrongStep),
        };
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };

        self.processing = true;
        self.error = None;
        let result = backend.confirm_receipt(&request).await;
        self.processing = false;

        match result {
            Ok(response) => {
                tracing::info!("receipt saved as transaction {}", response.transaction_id);
                self.form = None;
                self.ocr = None;
                self.step = ReceiptStep::Saved {
                    transaction_id: response.transaction_id.clone(),
                };
                Ok(response.transaction_id)
            }
            Err(err) => {
                tracing::warn!("receipt confirm failed: {err}");
                let message = err.user_message(CONFIRM_FAILED);
                self.error = Some(message.clone());
                Err(ReceiptError::Remote(message))
            }
        }
    }

    /// Back to the upload step, dropping any draft.
    pub fn cancel(&mut self) {
        self.step = ReceiptStep::Upload;
        self.processing = false;
        self.error = None;
        self.ocr = None;
        self.form = None;
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
