//! HTTP client for the persfin API.
//!
//! Every request carries the bearer token of the configured
//! [`AuthProvider`]. A 401 triggers one token refresh and, if that worked,
//! one re-send of the same request.

pub mod auth;
pub mod error;

use api_types::{
    receipt::{ConfirmReceiptResponse, ReceiptConfirmRequest, ReceiptOcrResponse},
    transaction::{
        CreateTransactionRequest, ListTransactionsFilters, ListTransactionsResponse,
        ReplaceItemsRequest, TransactionDetailResponse, TransactionItem, TransactionResponse,
    },
    user::UserProfile,
    wallet::CreateWalletRequest,
};
use engine::{
    ItemizationBackend, ReceiptBackend, RemoteError, Wallet, members::add_member_with_field_retry,
    wallet::normalize_wallet,
};
use reqwest::{
    RequestBuilder, Response, StatusCode, Url,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use auth::{AuthProvider, StaticToken};
pub use error::ClientError;

type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct Client<A = StaticToken> {
    base_url: Url,
    http: reqwest::Client,
    auth: A,
}

impl<A: AuthProvider> Client<A> {
    pub fn new(base_url: &str, auth: A) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|err| ClientError::Url(format!("{base_url}: {err}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
            auth,
        })
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Url(format!("{path}: {err}")))
    }

    async fn send_once<F>(&self, build: &F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut builder = build(&self.http);
        if let Some(token) = self.auth.access_token() {
            builder = builder.bearer_auth(token);
        }
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        let response = self.http.execute(request).await?;
        tracing::debug!("{method} {url} -> {}", response.status());
        Ok(response)
    }

    /// Sends a request, refreshing the token once on 401, and turns any
    /// non-success status into a [`ClientError`].
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let mut response = self.send_once(&build).await?;
        if response.status() == StatusCode::UNAUTHORIZED && self.auth.refresh().await {
            tracing::warn!("access token rejected, retrying with a refreshed one");
            response = self.send_once(&build).await?;
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status.as_u16(), &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self.send(|http| http.get(url.clone())).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.get_json("api/me").await
    }

    pub async fn list_transactions(
        &self,
        filters: &ListTransactionsFilters,
    ) -> Result<ListTransactionsResponse> {
        let url = self.endpoint("api/transactions")?;
        let query = filters.query_pairs();
        let response = self.send(|http| http.get(url.clone()).query(&query)).await?;
        Ok(response.json().await?)
    }

    pub async fn create_transaction(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<TransactionResponse> {
        let url = self.endpoint("api/transactions")?;
        let response = self.send(|http| http.post(url.clone()).json(request)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("api/transactions/{id}"))?;
        self.send(|http| http.delete(url.clone())).await?;
        Ok(())
    }

    pub async fn get_transaction_detail(&self, id: &str) -> Result<TransactionDetailResponse> {
        self.get_json(&format!("api/transactions/{id}/items")).await
    }

    pub async fn replace_transaction_items(
        &self,
        id: &str,
        items: &[TransactionItem],
    ) -> Result<()> {
        let url = self.endpoint(&format!("api/transactions/{id}/items"))?;
        let body = ReplaceItemsRequest {
            items: items.to_vec(),
        };
        self.send(|http| http.put(url.clone()).json(&body)).await?;
        Ok(())
    }

    pub async fn clear_transaction_items(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("api/transactions/{id}/items"))?;
        self.send(|http| http.delete(url.clone())).await?;
        Ok(())
    }

    /// All wallets visible to the user, normalized.
    pub async fn wallets(&self) -> Result<Vec<Wallet>> {
        let value = self.get_json::<Value>("api/wallets").await?;
        Ok(value
            .as_array()
            .map(|wallets| wallets.iter().map(normalize_wallet).collect())
            .unwrap_or_default())
    }

    pub async fn wallet(&self, id: &str) -> Result<Wallet> {
        let value = self.get_json::<Value>(&format!("api/wallets/{id}")).await?;
        Ok(normalize_wallet(&value))
    }

    pub async fn create_wallet(&self, request: &CreateWalletRequest) -> Result<Wallet> {
        let url = self.endpoint("api/wallets")?;
        let response = self.send(|http| http.post(url.clone()).json(request)).await?;
        let value = response.json::<Value>().await?;
        Ok(normalize_wallet(&value))
    }

    pub async fn archive_wallet(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("api/wallets/{id}/archive"))?;
        self.send(|http| http.put(url.clone())).await?;
        Ok(())
    }

    pub async fn unarchive_wallet(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("api/wallets/{id}/unarchive"))?;
        self.send(|http| http.put(url.clone())).await?;
        Ok(())
    }

    pub async fn delete_wallet(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("api/wallets/{id}"))?;
        self.send(|http| http.delete(url.clone())).await?;
        Ok(())
    }

    /// Adds a member by email, retrying once with the field name the server
    /// asks for if it rejects `email`.
    pub async fn add_wallet_member(
        &self,
        wallet_id: &str,
        email: &str,
    ) -> std::result::Result<(), RemoteError> {
        let url = self
            .endpoint(&format!("api/wallets/{wallet_id}/members"))
            .map_err(RemoteError::from)?;
        add_member_with_field_retry(email, |payload| {
            let url = url.clone();
            async move {
                self.send(|http| http.post(url.clone()).json(&payload))
                    .await
                    .map(|_| ())
                    .map_err(RemoteError::from)
            }
        })
        .await
    }

    /// Uploads a receipt image as multipart field `file`.
    pub async fn upload_receipt_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ReceiptOcrResponse> {
        let url = self.endpoint("api/receipts/ocr")?;
        let response = self
            .send(|http| {
                let part = Part::bytes(bytes.clone()).file_name(file_name.to_string());
                http.post(url.clone()).multipart(Form::new().part("file", part))
            })
            .await?;
        Ok(response.json().await?)
    }

    pub async fn submit_receipt(
        &self,
        request: &ReceiptConfirmRequest,
    ) -> Result<ConfirmReceiptResponse> {
        let url = self.endpoint("api/receipts/confirm")?;
        let response = self.send(|http| http.post(url.clone()).json(request)).await?;
        Ok(response.json().await?)
    }
}

impl<A: AuthProvider> ItemizationBackend for Client<A> {
    async fn transaction_detail(
        &self,
        transaction_id: &str,
    ) -> std::result::Result<TransactionDetailResponse, RemoteError> {
        Ok(self.get_transaction_detail(transaction_id).await?)
    }

    async fn replace_items(
        &self,
        transaction_id: &str,
        items: &[TransactionItem],
    ) -> std::result::Result<(), RemoteError> {
        Ok(self.replace_transaction_items(transaction_id, items).await?)
    }

    async fn clear_items(&self, transaction_id: &str) -> std::result::Result<(), RemoteError> {
        Ok(self.clear_transaction_items(transaction_id).await?)
    }
}

impl<A: AuthProvider> ReceiptBackend for Client<A> {
    async fn upload_receipt(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> std::result::Result<ReceiptOcrResponse, RemoteError> {
        Ok(self.upload_receipt_image(file_name, bytes).await?)
    }

    async fn confirm_receipt(
        &self,
        request: &ReceiptConfirmRequest,
    ) -> std::result::Result<ConfirmReceiptResponse, RemoteError> {
        Ok(self.submit_receipt(request).await?)
    }
}
