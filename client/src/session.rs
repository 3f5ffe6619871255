//! # Dashboard Session
//!
//! The state a dashboard user sees: which wallet is connected, the last
//! known balance, and the one-line status or error message the page shows.
//! Both transfer flows run through a single submit path; deposit and
//! withdraw differ only in the [`Operation`] tag.
//!
//! The message strings here are the user-facing contract. Handlers log the
//! underlying error with full detail; the session keeps the page's wording.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use thiserror::Error;

use crate::address::VaultAddresses;
use crate::client::{ClientError, VaultClient};

// ---------------------------------------------------------------------------
// User-Facing Lines
// ---------------------------------------------------------------------------

/// Shown when address derivation fails during connect.
pub const ERR_DERIVE: &str = "Failed to derive public keys.";
/// Shown when the interface manifest cannot be loaded or used.
pub const ERR_FETCH_PROGRAM: &str = "Failed to fetch program. Please try again later.";
/// Shown when a balance fetch fails.
pub const ERR_FETCH_BALANCE: &str =
    "Failed to fetch balance. Please ensure your wallet is connected and try again.";
/// Shown when a deposit fails for any reason.
pub const ERR_DEPOSIT: &str = "Deposit failed. Please check your inputs and try again.";
/// Shown when a withdrawal fails for any reason.
pub const ERR_WITHDRAW: &str = "Withdrawal failed. Please check your inputs and try again.";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// The two transfer operations a session can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Withdraw,
}

impl Operation {
    /// Lowercase name for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
        }
    }

    /// The line shown while the submission is in flight.
    pub fn processing_line(&self) -> &'static str {
        match self {
            Operation::Deposit => "Processing deposit...",
            Operation::Withdraw => "Processing withdrawal...",
        }
    }

    /// The line shown once the transfer confirms.
    pub fn success_line(&self) -> &'static str {
        match self {
            Operation::Deposit => "Deposit successful!",
            Operation::Withdraw => "Withdrawal successful!",
        }
    }

    /// The line shown when the transfer fails.
    pub fn failure_line(&self) -> &'static str {
        match self {
            Operation::Deposit => ERR_DEPOSIT,
            Operation::Withdraw => ERR_WITHDRAW,
        }
    }
}

/// Session-level failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation needs a connected wallet and there is none.
    #[error("no wallet connected")]
    NotConnected,

    /// The underlying client operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Picks the connect-time error line for a client error.
///
/// Connecting only loads the manifest and derives addresses, so those two
/// failure classes get their own lines; anything else reads as a program
/// fetch problem.
pub fn connect_error_line(error: &ClientError) -> &'static str {
    match error {
        ClientError::Address(_) => ERR_DERIVE,
        _ => ERR_FETCH_PROGRAM,
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user's dashboard session.
#[derive(Default)]
pub struct VaultSession {
    client: Option<VaultClient>,
    balance: Option<u64>,
    status: Option<String>,
    error: Option<String>,
}

impl VaultSession {
    /// Creates an empty session with no wallet connected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly connected client, replacing any previous one.
    /// Balance and messages from the old wallet do not carry over.
    pub fn connect(&mut self, client: VaultClient) {
        tracing::info!(wallet = %client.wallet_address(), "wallet connected");
        self.client = Some(client);
        self.balance = None;
        self.status = None;
        self.error = None;
    }

    /// Records why a connect attempt failed, in the page's wording.
    pub fn note_connect_failure(&mut self, error: &ClientError) {
        tracing::warn!(error = %error, "wallet connect failed");
        self.status = None;
        self.error = Some(connect_error_line(error).to_string());
    }

    /// Drops the connected wallet and all state derived from it.
    pub fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::info!(wallet = %client.wallet_address(), "wallet disconnected");
        }
        self.balance = None;
        self.status = None;
        self.error = None;
    }

    /// Re-fetches the balance from the chain and stores it.
    pub async fn refresh_balance(&mut self) -> Result<u64, SessionError> {
        let client = self.client.as_ref().ok_or(SessionError::NotConnected)?;
        match client.fetch_balance().await {
            Ok(balance) => {
                self.balance = Some(balance);
                self.error = None;
                Ok(balance)
            }
            Err(e) => {
                tracing::warn!(error = %e, "balance fetch failed");
                self.error = Some(ERR_FETCH_BALANCE.to_string());
                Err(e.into())
            }
        }
    }

    /// Deposits `amount` and refreshes the balance on success.
    pub async fn deposit(&mut self, amount: u64) -> Result<Signature, SessionError> {
        self.submit(Operation::Deposit, amount).await
    }

    /// Withdraws `amount` and refreshes the balance on success.
    pub async fn withdraw(&mut self, amount: u64) -> Result<Signature, SessionError> {
        self.submit(Operation::Withdraw, amount).await
    }

    /// Runs one transfer end to end: submit, confirm, re-fetch balance,
    /// record the outcome line.
    async fn submit(
        &mut self,
        operation: Operation,
        amount: u64,
    ) -> Result<Signature, SessionError> {
        let client = self.client.as_ref().ok_or(SessionError::NotConnected)?;
        self.status = Some(operation.processing_line().to_string());
        self.error = None;

        let result = match operation {
            Operation::Deposit => client.deposit(amount).await,
            Operation::Withdraw => client.withdraw(amount).await,
        };

        match result {
            Ok(signature) => {
                self.status = Some(operation.success_line().to_string());
                match client.fetch_balance().await {
                    Ok(balance) => self.balance = Some(balance),
                    Err(e) => {
                        tracing::warn!(error = %e, "post-transfer balance fetch failed");
                        self.error = Some(ERR_FETCH_BALANCE.to_string());
                    }
                }
                Ok(signature)
            }
            Err(e) => {
                tracing::warn!(operation = operation.as_str(), error = %e, "transfer failed");
                self.status = None;
                self.error = Some(operation.failure_line().to_string());
                Err(e.into())
            }
        }
    }

    /// Whether a wallet is currently connected.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// The connected wallet's address, if any.
    pub fn wallet(&self) -> Option<Pubkey> {
        self.client.as_ref().map(|c| c.wallet_address())
    }

    /// The resolved vault address pair, if connected.
    pub fn addresses(&self) -> Option<VaultAddresses> {
        self.client.as_ref().map(|c| c.addresses())
    }

    /// The last fetched balance, if any.
    pub fn balance(&self) -> Option<u64> {
        self.balance
    }

    /// The current status line, if any.
    pub fn status_line(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The current error line, if any.
    pub fn error_line(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The balance line as the page renders it.
    pub fn balance_line(&self) -> Option<String> {
        self.balance.map(|b| format!("Your Balance: {}", b))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
