//! Scripted in-memory ledger
//!
//! Submissions succeed with generated signatures unless a wallet has a
//! script queued; each scripted submission is used once. Lookups return
//! `None` for unknown signatures unless they were confirmed or scripted. A
//! scripted lookup queue is consumed front to back and its last entry sticks.

use crate::{LedgerClient, LedgerError, TransactionStatus, TransferOutcome};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Kind of transfer recorded by [`ScriptedLedger`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransferKind {
    /// Reward-only payout
    Reward,
    /// Asset return with reward
    AssetReturn {
        /// Mints returned to the wallet
        mints: Vec<String>,
    },
}

/// Transfer seen by [`ScriptedLedger`]
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTransfer {
    /// What was requested
    pub kind: TransferKind,
    /// Destination wallet
    pub wallet: String,
    /// Reward amount
    pub amount: f64,
    /// What the ledger answered, `None` when the call errored
    pub outcome: Option<TransferOutcome>,
}

#[derive(Debug, Clone)]
enum Submission {
    Outcome(TransferOutcome),
    Error(String),
}

#[derive(Debug, Clone)]
enum Lookup {
    Found(TransactionStatus),
    NotFound,
    Error(String),
}

#[derive(Debug, Default)]
struct LedgerState {
    next_signature: u64,
    submissions: HashMap<String, VecDeque<Submission>>,
    lookups: HashMap<String, VecDeque<Lookup>>,
    lookup_counts: HashMap<String, u32>,
    transfers: Vec<SubmittedTransfer>,
}

impl LedgerState {
    fn next_submission(&mut self, wallet: &str) -> Submission {
        if let Some(next) = self
            .submissions
            .get_mut(wallet)
            .and_then(|queue| queue.pop_front())
        {
            return next;
        }

        self.next_signature += 1;
        Submission::Outcome(TransferOutcome::Submitted(format!(
            "sig-{:06}",
            self.next_signature
        )))
    }

    fn next_lookup(&mut self, signature: &str) -> Lookup {
        *self.lookup_counts.entry(signature.to_string()).or_insert(0) += 1;

        match self.lookups.get_mut(signature) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Lookup::NotFound),
            Some(queue) => queue.front().cloned().unwrap_or(Lookup::NotFound),
            None => Lookup::NotFound,
        }
    }

    fn record(
        &mut self,
        kind: TransferKind,
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError> {
        let submission = self.next_submission(wallet);
        let outcome = match &submission {
            Submission::Outcome(outcome) => Some(outcome.clone()),
            Submission::Error(_) => None,
        };

        self.transfers.push(SubmittedTransfer {
            kind,
            wallet: wallet.to_string(),
            amount,
            outcome,
        });

        match submission {
            Submission::Outcome(outcome) => Ok(outcome),
            Submission::Error(message) => Err(LedgerError::Unavailable(message)),
        }
    }
}

/// [`LedgerClient`] with scripted outcomes
///
/// Clones share the same script and history.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl ScriptedLedger {
    /// Create a ledger with no scripts
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the signature returned by the next submission for `wallet`
    pub fn script_signature(&self, wallet: &str, signature: &str) {
        self.push_submission(
            wallet,
            Submission::Outcome(TransferOutcome::from_signature(signature)),
        );
    }

    /// Queue an invalid result for the next submission for `wallet`
    pub fn script_invalid(&self, wallet: &str) {
        self.push_submission(wallet, Submission::Outcome(TransferOutcome::Invalid));
    }

    /// Queue an error for the next submission for `wallet`
    pub fn script_submission_error(&self, wallet: &str, message: &str) {
        self.push_submission(wallet, Submission::Error(message.to_string()));
    }

    fn push_submission(&self, wallet: &str, submission: Submission) {
        self.state()
            .submissions
            .entry(wallet.to_string())
            .or_default()
            .push_back(submission);
    }

    /// Make `signature` look confirmed from now on
    pub fn confirm(&self, signature: &str) {
        self.set_lookup(signature, Lookup::Found(TransactionStatus::confirmed()));
    }

    /// Make `signature` look landed-but-failed from now on
    pub fn fail(&self, signature: &str) {
        self.set_lookup(signature, Lookup::Found(TransactionStatus::failed()));
    }

    /// Make `signature` unknown to the ledger from now on
    pub fn forget(&self, signature: &str) {
        self.set_lookup(signature, Lookup::NotFound);
    }

    /// Make lookups for `signature` fail with a transport-level error
    pub fn script_lookup_error(&self, signature: &str, message: &str) {
        self.set_lookup(signature, Lookup::Error(message.to_string()));
    }

    /// Queue successive lookup answers for `signature`; `None` means not found
    pub fn script_lookups(
        &self,
        signature: &str,
        answers: impl IntoIterator<Item = Option<TransactionStatus>>,
    ) {
        let queue = answers
            .into_iter()
            .map(|answer| match answer {
                Some(status) => Lookup::Found(status),
                None => Lookup::NotFound,
            })
            .collect();
        self.state().lookups.insert(signature.to_string(), queue);
    }

    fn set_lookup(&self, signature: &str, lookup: Lookup) {
        self.state()
            .lookups
            .insert(signature.to_string(), VecDeque::from([lookup]));
    }

    /// Every transfer submitted so far, in order
    pub fn transfers(&self) -> Vec<SubmittedTransfer> {
        self.state().transfers.clone()
    }

    /// Transfers submitted for one wallet
    pub fn transfers_for(&self, wallet: &str) -> Vec<SubmittedTransfer> {
        self.state()
            .transfers
            .iter()
            .filter(|transfer| transfer.wallet == wallet)
            .cloned()
            .collect()
    }

    /// How many times `signature` was looked up
    pub fn lookup_count(&self, signature: &str) -> u32 {
        self.state()
            .lookup_counts
            .get(signature)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn submit_reward_transfer(
        &self,
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError> {
        let result = self.state().record(TransferKind::Reward, wallet, amount);
        debug!(wallet, amount, ?result, "Scripted reward transfer");
        result
    }

    async fn submit_asset_return(
        &self,
        mints: &[String],
        wallet: &str,
        amount: f64,
    ) -> Result<TransferOutcome, LedgerError> {
        let kind = TransferKind::AssetReturn {
            mints: mints.to_vec(),
        };
        let result = self.state().record(kind, wallet, amount);
        debug!(wallet, amount, mints = mints.len(), ?result, "Scripted asset return");
        result
    }

    async fn transaction_status(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionStatus>, LedgerError> {
        match self.state().next_lookup(signature) {
            Lookup::Found(status) => Ok(Some(status)),
            Lookup::NotFound => Ok(None),
            Lookup::Error(message) => Err(LedgerError::Unavailable(message)),
        }
    }
}
