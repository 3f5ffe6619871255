// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vaultboard Client — Core Library
//!
//! Everything needed to talk to the on-chain vault program from off-chain
//! Rust: derive its program addresses, decode its accounts, build its
//! instructions from the embedded interface manifest, and push the result
//! through a JSON-RPC node.
//!
//! The vault program itself lives on-chain and is opaque to this crate. We
//! never recompute balances, fees, or overflow checks locally — we read what
//! the program wrote and submit what the manifest describes. If the numbers
//! look wrong, the answer is on-chain, not here.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the lifecycle of a vault
//! interaction:
//!
//! - **config** — Seeds, endpoints, and timing constants.
//! - **manifest** — The program's JSON interface description, embedded and typed.
//! - **address** — Program-derived address computation for vault + user-vault.
//! - **accounts** — On-chain account layouts and discriminator-checked decoding.
//! - **instruction** — Manifest-driven instruction construction.
//! - **gateway** — The transport seam: fetch an account, submit a transaction.
//! - **rpc** — JSON-RPC gateway implementation over raw HTTP.
//! - **client** — The operation layer: fetch balance, deposit, withdraw.
//! - **session** — UI-facing state: balance, status line, error line.
//!
//! ## Design Philosophy
//!
//! 1. The manifest is the single source of truth for the program interface.
//! 2. Failures become readable strings at the session boundary, not panics.
//! 3. Anything that touches the wire has a trait in front of it.

pub mod accounts;
pub mod address;
pub mod client;
pub mod config;
pub mod gateway;
pub mod instruction;
pub mod manifest;
pub mod rpc;
pub mod session;
