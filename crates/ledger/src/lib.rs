//! Ledger transfer client for Stakeline
//!
//! Transfers are built, signed and sent by an external service; the
//! reconciler only submits requests and later asks the ledger whether the
//! returned signature landed. The [`LedgerClient`] trait is implemented by:
//! - [`HttpLedgerClient`]: transfer service over HTTP plus Solana JSON-RPC
//! - [`ScriptedLedger`]: in-memory ledger with scripted outcomes for tests

#![warn(missing_docs)]

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stakeline_core::INVALID_SIGNATURE;
use thiserror::Error;

pub use http::HttpLedgerClient;
pub use scripted::{ScriptedLedger, SubmittedTransfer, TransferKind};

/// Ledger client errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Request could not be delivered or timed out
    #[error("Ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// RPC node or transfer service answered with an error
    #[error("Ledger RPC error {code}: {message}")]
    Rpc {
        /// Error code reported by the remote side
        code: i64,
        /// Error message reported by the remote side
        message: String,
    },

    /// Response did not have the expected shape
    #[error("Malformed ledger response: {0}")]
    Decode(String),

    /// Ledger is not reachable
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result of submitting a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Transfer was sent and the ledger assigned this signature
    Submitted(String),
    /// Transfer never reached the ledger
    Invalid,
}

impl TransferOutcome {
    /// Interpret a raw signature, mapping the sentinel and empty values to [`TransferOutcome::Invalid`]
    pub fn from_signature(signature: impl Into<String>) -> Self {
        let signature = signature.into();
        if signature.is_empty() || signature == INVALID_SIGNATURE {
            TransferOutcome::Invalid
        } else {
            TransferOutcome::Submitted(signature)
        }
    }

    /// Signature as written into a mission's transaction log
    pub fn log_value(&self) -> &str {
        match self {
            TransferOutcome::Submitted(signature) => signature,
            TransferOutcome::Invalid => INVALID_SIGNATURE,
        }
    }

    /// True when the ledger accepted the transfer
    pub fn is_submitted(&self) -> bool {
        matches!(self, TransferOutcome::Submitted(_))
    }
}

/// Ledger view of a transaction that was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    /// Transaction executed without error at the configured commitment
    pub confirmed: bool,
}

impl TransactionStatus {
    /// Status of a successfully executed transaction
    pub fn confirmed() -> Self {
        Self { confirmed: true }
    }

    /// Status of a transaction that landed but failed
    pub fn failed() -> Self {
        Self { confirmed: false }
    }
}

/// Transfer submission and lookup interface
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Pay `amount` of the reward token to `wallet`
    async fn submit_reward_transfer(
        &self,
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError>;

    /// Return `mints` to `wallet` together with `amount` of the reward token
    async fn submit_asset_return(
        &self,
        mints: &[String],
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError>;

    /// Look up a transaction; `None` when the ledger does not know it
    async fn transaction_status(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionStatus>, LedgerError>;
}
