//! # Program Gateway
//!
//! The transport seam between the operation layer and the chain. A gateway
//! does exactly two things: fetch raw account data and submit a signed
//! instruction, waiting until it lands. The JSON-RPC implementation lives
//! in [`crate::rpc`]; tests substitute in-memory fakes.
//!
//! Everything above this seam (address derivation, decoding, instruction
//! building, session state) is pure and synchronous. These two methods are
//! the entire async surface of the crate.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by gateway implementations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The endpoint string could not be parsed.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// The node could not be reached or the connection failed mid-request.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The requested account does not exist at the queried commitment.
    #[error("no account found at {0}")]
    AccountNotFound(Pubkey),

    /// The node rejected the transaction, either in preflight or on-chain.
    #[error("transaction rejected: {message}")]
    Rejected {
        message: String,
        /// Custom program error code, when the rejection carries one.
        custom_code: Option<u32>,
    },

    /// The transaction was submitted but never reached the target
    /// commitment within the configured window.
    #[error("transaction {signature} unconfirmed after {waited_ms}ms")]
    ConfirmationTimeout {
        signature: Signature,
        waited_ms: u64,
    },

    /// The node's response did not have the expected shape.
    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Chain access as the vault client sees it.
#[async_trait]
pub trait ProgramGateway: Send + Sync {
    /// Fetches the raw data of an account, discriminator included.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>, GatewayError>;

    /// Signs the instruction with `payer` as fee payer, submits it, and
    /// waits for it to reach the target commitment.
    async fn submit(
        &self,
        instruction: Instruction,
        payer: &Keypair,
    ) -> Result<Signature, GatewayError>;
}
