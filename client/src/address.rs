//! # Program Address Derivation
//!
//! The vault program stores per-user state at deterministic addresses
//! derived from fixed seeds and the user's public key:
//!
//! - vault:      `["vault", user]`
//! - user-vault: `["uservault", user, vault]`
//!
//! The second derivation consumes the first, so order matters. Both are
//! recomputed from scratch every time a wallet connects — derived addresses
//! are cheap and caching them across identity changes is how stale-address
//! bugs happen.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::config;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised during address derivation.
#[derive(Debug, Error)]
pub enum AddressError {
    /// No bump seed produced a valid off-curve address. Astronomically
    /// unlikely for real inputs, but the search is bounded, so it can fail.
    #[error("no viable program address for seed {seed:?} and user {user}")]
    NoViableBump {
        /// The seed label that failed to derive.
        seed: &'static str,
        /// The user identity the derivation ran for.
        user: Pubkey,
    },
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// A derived address together with the bump seed that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// Derives the vault address for a user: `["vault", user]`.
pub fn vault_address(program_id: &Pubkey, user: &Pubkey) -> Result<DerivedAddress, AddressError> {
    let (address, bump) =
        Pubkey::try_find_program_address(&[config::VAULT_SEED, user.as_ref()], program_id)
            .ok_or(AddressError::NoViableBump {
                seed: "vault",
                user: *user,
            })?;
    Ok(DerivedAddress { address, bump })
}

/// Derives the user-vault address: `["uservault", user, vault]`.
///
/// Takes the already-derived vault address as input — callers derive the
/// vault first and thread it through.
pub fn user_vault_address(
    program_id: &Pubkey,
    user: &Pubkey,
    vault: &Pubkey,
) -> Result<DerivedAddress, AddressError> {
    let (address, bump) = Pubkey::try_find_program_address(
        &[config::USER_VAULT_SEED, user.as_ref(), vault.as_ref()],
        program_id,
    )
    .ok_or(AddressError::NoViableBump {
        seed: "uservault",
        user: *user,
    })?;
    Ok(DerivedAddress { address, bump })
}

// ---------------------------------------------------------------------------
// Address Source
// ---------------------------------------------------------------------------

/// The pair of addresses every vault operation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultAddresses {
    /// The vault account, holder of owner/mint/fee state.
    pub vault: Pubkey,
    /// The per-user sub-account tracking this user's balance.
    pub user_vault: Pubkey,
}

/// Where the vault addresses come from.
///
/// `Derived` runs the seed derivation against the connected wallet.
/// `Fixed` uses operator-supplied constants and skips derivation entirely —
/// useful against deployments whose accounts were created out of band.
/// Both feed the identical downstream flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    /// Derive both addresses from the program seeds and the user key.
    Derived,
    /// Use these exact addresses, no derivation.
    Fixed {
        vault: Pubkey,
        user_vault: Pubkey,
    },
}

impl AddressSource {
    /// Resolves the address pair for a user under the given program.
    pub fn resolve(
        &self,
        program_id: &Pubkey,
        user: &Pubkey,
    ) -> Result<VaultAddresses, AddressError> {
        match self {
            AddressSource::Derived => {
                let vault = vault_address(program_id, user)?;
                let user_vault = user_vault_address(program_id, user, &vault.address)?;
                Ok(VaultAddresses {
                    vault: vault.address,
                    user_vault: user_vault.address,
                })
            }
            AddressSource::Fixed { vault, user_vault } => Ok(VaultAddresses {
                vault: *vault,
                user_vault: *user_vault,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
