//! HTTP ledger client
//!
//! Transfers go to the transfer service (`POST /transfers/reward`,
//! `POST /transfers/asset-return`), which answers `{"signature": ...}`.
//! Confirmation lookups use Solana JSON-RPC `getTransaction`.

use crate::{LedgerClient, LedgerError, TransactionStatus, TransferOutcome};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stakeline_core::LedgerConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct RewardTransferRequest<'a> {
    wallet: &'a str,
    amount: f64,
}

#[derive(Debug, Serialize)]
struct AssetReturnRequest<'a> {
    mints: &'a [String],
    wallet: &'a str,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    signature: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// [`LedgerClient`] talking to the transfer service and a JSON-RPC node
#[derive(Debug)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    rpc_url: String,
    transfer_service_url: String,
    commitment: String,
    request_id: AtomicU64,
}

impl HttpLedgerClient {
    /// Build a ledger client from configuration
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            transfer_service_url: config.transfer_service_url.trim_end_matches('/').to_string(),
            commitment: config.commitment.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    fn transfer_url(&self, path: &str) -> String {
        format!("{}/transfers/{}", self.transfer_service_url, path)
    }

    async fn post_transfer<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TransferOutcome, LedgerError> {
        let response = self
            .http
            .post(self.transfer_url(path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), "Transfer service rejected request");
            return Err(LedgerError::Rpc {
                code: i64::from(status.as_u16()),
                message,
            });
        }

        let body: TransferResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()))?;

        Ok(TransferOutcome::from_signature(body.signature))
    }

    fn status_request(&self, signature: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": "getTransaction",
            "params": [
                signature,
                {
                    "commitment": self.commitment,
                    "encoding": "json",
                    "maxSupportedTransactionVersion": 0
                }
            ]
        })
    }
}

/// Interpret a `getTransaction` response
fn decode_status(response: RpcResponse) -> Result<Option<TransactionStatus>, LedgerError> {
    if let Some(error) = response.error {
        return Err(LedgerError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let transaction = match response.result {
        None | Some(Value::Null) => return Ok(None),
        Some(transaction) => transaction,
    };

    // only an explicit `err: null` counts as success
    let confirmed = transaction
        .get("meta")
        .and_then(Value::as_object)
        .and_then(|meta| meta.get("err"))
        .is_some_and(Value::is_null);
    Ok(Some(TransactionStatus { confirmed }))
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn submit_reward_transfer(
        &self,
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError> {
        let outcome = self
            .post_transfer("reward", &RewardTransferRequest { wallet, amount })
            .await?;
        debug!(wallet, amount, signature = outcome.log_value(), "Reward transfer submitted");
        Ok(outcome)
    }

    async fn submit_asset_return(
        &self,
        mints: &[String],
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError> {
        let outcome = self
            .post_transfer(
                "asset-return",
                &AssetReturnRequest {
                    mints,
                    wallet,
                    amount,
                },
            )
            .await?;
        debug!(
            wallet,
            amount,
            mints = mints.len(),
            signature = outcome.log_value(),
            "Asset return submitted"
        );
        Ok(outcome)
    }

    async fn transaction_status(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionStatus>, LedgerError> {
        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&self.status_request(signature))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()))?;

        decode_status(response)
    }
}
