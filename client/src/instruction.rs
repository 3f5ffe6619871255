//! # Manifest-Driven Instruction Construction
//!
//! Builds wire instructions from the interface manifest: discriminator,
//! borsh-encoded arguments, and the account list in manifest order with the
//! manifest's writable/signer flags. Callers supply a role-to-address map
//! for the accounts the manifest doesn't pin; pinned roles (the token
//! program, sysvars) are filled from the manifest itself and cannot be
//! overridden.
//!
//! The builder is instruction-agnostic — `deposit`, `withdraw`, and
//! `initialize` all go through the same path, driven entirely by what the
//! manifest declares.

use std::collections::HashMap;
use std::str::FromStr;

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::manifest::{Manifest, ManifestError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while assembling an instruction.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The manifest itself failed to resolve (bad program id).
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The requested instruction is not in the manifest.
    #[error("manifest declares no instruction named {0:?}")]
    UnknownInstruction(String),

    /// A required account role was not supplied by the caller.
    #[error("instruction {instruction:?} is missing an address for role {role:?}")]
    MissingAccount {
        instruction: String,
        role: String,
    },

    /// The caller supplied the wrong number of arguments.
    #[error("instruction {instruction:?} takes {expected} argument(s), {given} given")]
    ArgCount {
        instruction: String,
        expected: usize,
        given: usize,
    },

    /// The manifest declares an argument type this builder cannot encode.
    #[error("instruction {instruction:?} argument {arg:?} has unsupported type {ty:?}")]
    UnsupportedArgType {
        instruction: String,
        arg: String,
        ty: String,
    },

    /// A pinned address in the manifest is not valid base58.
    #[error("pinned address for role {role:?} is invalid: {value:?}")]
    BadPinnedAddress { role: String, value: String },
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles instructions for one program from its manifest.
pub struct InstructionBuilder<'a> {
    manifest: &'a Manifest,
    program_id: Pubkey,
}

impl<'a> InstructionBuilder<'a> {
    /// Creates a builder bound to the manifest's program id.
    pub fn new(manifest: &'a Manifest) -> Result<Self, BuildError> {
        let program_id = manifest.program_id()?;
        Ok(Self {
            manifest,
            program_id,
        })
    }

    /// The program all built instructions target.
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Builds the named instruction.
    ///
    /// `args` supplies the declared arguments in order (all numeric in this
    /// interface). `provided` maps role names to addresses for every account
    /// the manifest does not pin.
    pub fn build(
        &self,
        name: &str,
        args: &[u64],
        provided: &HashMap<&str, Pubkey>,
    ) -> Result<Instruction, BuildError> {
        let def = self
            .manifest
            .instruction(name)
            .ok_or_else(|| BuildError::UnknownInstruction(name.to_string()))?;

        if args.len() != def.args.len() {
            return Err(BuildError::ArgCount {
                instruction: name.to_string(),
                expected: def.args.len(),
                given: args.len(),
            });
        }

        // Discriminator, then each argument in declaration order.
        let mut data = def.discriminator.to_vec();
        for (arg_def, value) in def.args.iter().zip(args) {
            if arg_def.ty != "u64" {
                return Err(BuildError::UnsupportedArgType {
                    instruction: name.to_string(),
                    arg: arg_def.name.clone(),
                    ty: arg_def.ty.clone(),
                });
            }
            data.extend(value.to_le_bytes());
        }

        let mut accounts = Vec::with_capacity(def.accounts.len());
        for role in &def.accounts {
            // Pinned addresses come from the manifest; the caller cannot
            // substitute them.
            let pubkey = match &role.address {
                Some(pinned) => {
                    Pubkey::from_str(pinned).map_err(|_| BuildError::BadPinnedAddress {
                        role: role.name.clone(),
                        value: pinned.clone(),
                    })?
                }
                None => *provided.get(role.name.as_str()).ok_or_else(|| {
                    BuildError::MissingAccount {
                        instruction: name.to_string(),
                        role: role.name.clone(),
                    }
                })?,
            };

            accounts.push(if role.writable {
                AccountMeta::new(pubkey, role.signer)
            } else {
                AccountMeta::new_readonly(pubkey, role.signer)
            });
        }

        Ok(Instruction::new_with_bytes(self.program_id, &data, accounts))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
