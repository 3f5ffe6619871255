//! # Vault Client
//!
//! High-level facade over the vault program: one connected wallet, its
//! resolved address pair, and the three operations the program exposes to
//! users. Everything below this layer is mechanism; this is the API the
//! dashboard and the one-shot CLI commands actually call.
//!
//! The transport is injected as a boxed [`ProgramGateway`], so tests drive
//! the full build-submit-decode path against an in-memory ledger double.

use std::collections::HashMap;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use thiserror::Error;

use crate::accounts::{AccountError, UserVault};
use crate::address::{AddressError, AddressSource, VaultAddresses};
use crate::gateway::{GatewayError, ProgramGateway};
use crate::instruction::{BuildError, InstructionBuilder};
use crate::manifest::{Manifest, ManifestError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Anything a vault operation can fail with.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The interface manifest could not be loaded or is unusable.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Address derivation failed for this wallet.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Instruction construction failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Fetched account data did not decode as the expected layout.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// The program turned the operation down with one of its declared errors.
    #[error("program error {name} (code {code}): {message}")]
    Program {
        code: u32,
        name: String,
        message: String,
    },

    /// Transport or node-side failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// The token accounts a transfer moves funds between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccounts {
    /// The user's token account, debited on deposit and credited on withdraw.
    pub user: Pubkey,
    /// The vault's pooled token account.
    pub vault: Pubkey,
}

/// A connected wallet's view of one vault.
pub struct VaultClient {
    gateway: Box<dyn ProgramGateway>,
    manifest: Manifest,
    program_id: Pubkey,
    wallet: Keypair,
    addresses: VaultAddresses,
    token_accounts: TokenAccounts,
}

impl VaultClient {
    /// Connects a wallet: loads the manifest, recomputes the program id it
    /// declares, and resolves the vault address pair for this wallet.
    pub fn new(
        gateway: Box<dyn ProgramGateway>,
        wallet: Keypair,
        source: AddressSource,
        token_accounts: TokenAccounts,
    ) -> Result<Self, ClientError> {
        let manifest = Manifest::load()?;
        let program_id = manifest.program_id()?;
        let addresses = source.resolve(&program_id, &wallet.pubkey())?;
        tracing::info!(
            wallet = %wallet.pubkey(),
            vault = %addresses.vault,
            user_vault = %addresses.user_vault,
            "vault client ready"
        );
        Ok(Self {
            gateway,
            manifest,
            program_id,
            wallet,
            addresses,
            token_accounts,
        })
    }

    /// The connected wallet's public key.
    pub fn wallet_address(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    /// The program this client targets.
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// The resolved vault address pair.
    pub fn addresses(&self) -> VaultAddresses {
        self.addresses
    }

    /// The token accounts transfers run between.
    pub fn token_accounts(&self) -> TokenAccounts {
        self.token_accounts
    }

    /// Fetches the user's current vault balance.
    ///
    /// Fails with [`GatewayError::AccountNotFound`] when the user has no
    /// sub-account yet, i.e. has never deposited.
    pub async fn fetch_balance(&self) -> Result<u64, ClientError> {
        let data = self
            .gateway
            .fetch_account(&self.addresses.user_vault)
            .await
            .map_err(|e| self.refine(e))?;
        let user_vault = UserVault::try_deserialize(&data)?;
        tracing::debug!(balance = user_vault.balance, "balance fetched");
        Ok(user_vault.balance)
    }

    /// Deposits `amount` into the vault and waits for confirmation.
    pub async fn deposit(&self, amount: u64) -> Result<Signature, ClientError> {
        let instruction = self.transfer_instruction("deposit", "user", amount)?;
        let signature = self
            .gateway
            .submit(instruction, &self.wallet)
            .await
            .map_err(|e| self.refine(e))?;
        tracing::info!(amount, signature = %signature, "deposit confirmed");
        Ok(signature)
    }

    /// Withdraws `amount` from the vault and waits for confirmation.
    pub async fn withdraw(&self, amount: u64) -> Result<Signature, ClientError> {
        let instruction = self.transfer_instruction("withdraw", "owner", amount)?;
        let signature = self
            .gateway
            .submit(instruction, &self.wallet)
            .await
            .map_err(|e| self.refine(e))?;
        tracing::info!(amount, signature = %signature, "withdrawal confirmed");
        Ok(signature)
    }

    /// Builds a deposit or withdraw instruction.
    ///
    /// The two differ only in the role name the manifest gives the signing
    /// wallet: `user` for deposits, `owner` for withdrawals.
    fn transfer_instruction(
        &self,
        name: &str,
        wallet_role: &str,
        amount: u64,
    ) -> Result<Instruction, ClientError> {
        let mut provided: HashMap<&str, Pubkey> = HashMap::new();
        provided.insert("vault", self.addresses.vault);
        provided.insert("userVault", self.addresses.user_vault);
        provided.insert(wallet_role, self.wallet.pubkey());
        provided.insert("userTokenAccount", self.token_accounts.user);
        provided.insert("vaultTokenAccount", self.token_accounts.vault);

        let builder = InstructionBuilder::new(&self.manifest)?;
        Ok(builder.build(name, &[amount], &provided)?)
    }

    /// Upgrades gateway rejections that carry a declared error code into
    /// [`ClientError::Program`], attaching the name the manifest declares.
    fn refine(&self, error: GatewayError) -> ClientError {
        if let GatewayError::Rejected {
            custom_code: Some(code),
            ref message,
        } = error
        {
            if let Some(declared) = self.manifest.error_for_code(code) {
                return ClientError::Program {
                    code,
                    name: declared.name.clone(),
                    message: message.clone(),
                };
            }
        }
        ClientError::Gateway(error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
