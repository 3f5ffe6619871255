//! # Program Interface Manifest
//!
//! The vault program publishes its interface as a JSON document (an Anchor
//! IDL): instruction names with their 8-byte discriminators and ordered
//! account lists, account layouts with their own discriminators, and the
//! program's declared error table. That document is embedded in this crate
//! and parsed into the types below.
//!
//! Everything downstream — address derivation, instruction construction,
//! account decoding, error naming — resolves against this manifest rather
//! than hardcoded copies, so a program upgrade is a one-file change.
//!
//! ## Manifest Index
//!
//! | Section        | Carries                                           |
//! |----------------|---------------------------------------------------|
//! | `address`      | The program id                                    |
//! | `instructions` | `deposit`, `initialize`, `withdraw`               |
//! | `accounts`     | `userVault`, `vault` account discriminators       |
//! | `errors`       | Declared program error codes (6000..6002)         |
//! | `types`        | Field layouts backing the account structs         |

use serde::Deserialize;
use solana_sdk::pubkey::{ParsePubkeyError, Pubkey};
use std::str::FromStr;
use thiserror::Error;

/// The interface description shipped with this build of the client.
const EMBEDDED: &str = include_str!("../idl/vault.json");

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or resolving the manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The embedded JSON did not match the expected schema.
    #[error("manifest parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// An address field in the manifest is not valid base58.
    #[error("manifest address {value:?} is not a valid public key")]
    BadAddress {
        /// The offending address string.
        value: String,
        #[source]
        source: ParsePubkeyError,
    },
}

// ---------------------------------------------------------------------------
// Manifest Model
// ---------------------------------------------------------------------------

/// A parsed program interface manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Base58 program id the interface belongs to.
    pub address: String,
    /// Program name and version metadata.
    pub metadata: Metadata,
    /// Callable instructions, in declaration order.
    pub instructions: Vec<InstructionDef>,
    /// Account types owned by the program, with their discriminators.
    pub accounts: Vec<AccountDef>,
    /// Declared program errors. Custom error codes map into this table.
    #[serde(default)]
    pub errors: Vec<ErrorDef>,
    /// Struct layouts referenced by the account section.
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

/// Program metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub spec: String,
    #[serde(default)]
    pub description: String,
}

/// A single callable instruction.
#[derive(Debug, Clone, Deserialize)]
pub struct InstructionDef {
    pub name: String,
    /// 8-byte dispatch tag prefixed to the instruction data.
    pub discriminator: [u8; 8],
    /// Accounts the instruction expects, in wire order.
    pub accounts: Vec<AccountRole>,
    /// Typed arguments serialized after the discriminator.
    #[serde(default)]
    pub args: Vec<ArgDef>,
}

/// One slot in an instruction's account list.
///
/// A role either names an account the caller supplies (`address` absent) or
/// pins a well-known address the manifest fills in itself (`address` set,
/// e.g. the token program).
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRole {
    pub name: String,
    #[serde(default)]
    pub writable: bool,
    #[serde(default)]
    pub signer: bool,
    #[serde(default)]
    pub address: Option<String>,
}

/// A typed instruction argument.
#[derive(Debug, Clone, Deserialize)]
pub struct ArgDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// An account type with its discriminator tag.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountDef {
    pub name: String,
    pub discriminator: [u8; 8],
}

/// A declared program error.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDef {
    /// Custom error code as it appears in transaction failures.
    pub code: u32,
    /// Declared name, e.g. `insufficientBalance`.
    pub name: String,
}

/// A named struct layout from the `types` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: StructDef,
}

/// The body of a struct type definition.
#[derive(Debug, Clone, Deserialize)]
pub struct StructDef {
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// A single struct field.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl Manifest {
    /// Parses the embedded interface manifest.
    pub fn load() -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(EMBEDDED)?;
        Ok(manifest)
    }

    /// Returns the program id as a parsed public key.
    pub fn program_id(&self) -> Result<Pubkey, ManifestError> {
        Pubkey::from_str(&self.address).map_err(|source| ManifestError::BadAddress {
            value: self.address.clone(),
            source,
        })
    }

    /// Looks up an instruction by name.
    pub fn instruction(&self, name: &str) -> Option<&InstructionDef> {
        self.instructions.iter().find(|i| i.name == name)
    }

    /// Looks up an account definition by name.
    pub fn account(&self, name: &str) -> Option<&AccountDef> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Resolves a custom error code against the declared error table.
    pub fn error_for_code(&self, code: u32) -> Option<&ErrorDef> {
        self.errors.iter().find(|e| e.code == code)
    }
}

// ---------------------------------------------------------------------------
// Transaction Error Introspection
// ---------------------------------------------------------------------------

/// Extracts a custom program error code from a transaction error value.
///
/// Failed transactions report errors as JSON shaped like
/// `{"InstructionError": [0, {"Custom": 6000}]}`. Non-custom failures
/// (string variants, other instruction error kinds) return `None`.
pub fn custom_error_code(err: &serde_json::Value) -> Option<u32> {
    let parts = err.get("InstructionError")?.as_array()?;
    let code = parts.get(1)?.get("Custom")?.as_u64()?;
    u32::try_from(code).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
