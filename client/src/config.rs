//! # Client Configuration & Constants
//!
//! Every magic value the client needs lives here: the seed strings the vault
//! program derives its addresses from, the default RPC endpoint, and the
//! timing knobs for transaction confirmation. If you find yourself hardcoding
//! one of these somewhere else, move it here first.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Address Derivation Seeds
// ---------------------------------------------------------------------------

/// Seed for the per-user vault account: `["vault", user]`.
/// Must match the seed the on-chain program uses, byte for byte.
pub const VAULT_SEED: &[u8] = b"vault";

/// Seed for the per-user sub-account inside a vault:
/// `["uservault", user, vault]`. Note the vault address is itself part of
/// the seed, so the two derivations are ordered — vault first.
pub const USER_VAULT_SEED: &[u8] = b"uservault";

// ---------------------------------------------------------------------------
// RPC Endpoint & Commitment
// ---------------------------------------------------------------------------

/// Default JSON-RPC endpoint. Points at a local test validator; override
/// with `--rpc-url` or `VAULTBOARD_RPC_URL` for anything else.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";

/// Commitment level used for reads, preflight, and confirmation. "confirmed"
/// is the sweet spot: fast enough for an interactive dashboard, strong
/// enough that a confirmed deposit doesn't vanish on the next slot.
pub const COMMITMENT: &str = "confirmed";

/// Account data and transaction payloads travel base58-encoded. The accounts
/// this client reads are tiny (under 100 bytes), so the encoding's size
/// limits never bite.
pub const RPC_ENCODING: &str = "base58";

// ---------------------------------------------------------------------------
// Confirmation Timing
// ---------------------------------------------------------------------------

/// How often to poll signature status after submission. Roughly one slot.
pub const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Give up waiting for confirmation after this long. A transaction that
/// hasn't confirmed in 30 seconds has almost certainly expired its
/// blockhash and needs to be resubmitted.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Token Accounts
// ---------------------------------------------------------------------------

/// Default token account debited on deposit and credited on withdrawal.
/// Operators point this at their own account with `--user-token-account`.
pub const DEFAULT_USER_TOKEN_ACCOUNT: &str = "DbT1dhnjUbVbybDMP1dryFF1LEJSm7F3s5XuLSv799rD";

/// Default token account on the vault side of the transfer.
pub const DEFAULT_VAULT_TOKEN_ACCOUNT: &str = "Ee9f4ZsLH92gVrUrynGu1CA7fjbhkMh15ixubtTNQEma";

// ---------------------------------------------------------------------------
// Account Layout
// ---------------------------------------------------------------------------

/// Length of the discriminator tag prefixed to every program account.
pub const ACCOUNT_DISCRIMINATOR_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Client library version, reported by the dashboard alongside its own.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
