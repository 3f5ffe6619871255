//! # CLI Interface
//!
//! Defines the command-line argument structure for `vaultboard` using
//! `clap` derive. Supports six subcommands: `serve`, `init`, `balance`,
//! `deposit`, `withdraw`, and `version`.

use clap::{Args, Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;

use vaultboard_client::address::AddressSource;
use vaultboard_client::client::TokenAccounts;
use vaultboard_client::config;

/// Solana vault dashboard.
///
/// Serves a browser dashboard for a vault program: connect a wallet,
/// watch the vault balance, and submit deposits and withdrawals. The
/// same operations exist as one-shot subcommands for scripting.
#[derive(Parser, Debug)]
#[command(
    name = "vaultboard",
    about = "Solana vault dashboard",
    version,
    propagate_version = true
)]
pub struct VaultboardCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the vaultboard binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard server.
    Serve(ServeArgs),
    /// Initialize the data directory and generate a dashboard wallet.
    Init(InitArgs),
    /// Print the wallet's current vault balance.
    Balance(ConnectionArgs),
    /// Deposit an amount into the vault.
    Deposit(TransferArgs),
    /// Withdraw an amount from the vault.
    Withdraw(TransferArgs),
    /// Print version information and exit.
    Version,
}

/// Connection arguments shared by every command that talks to the chain.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// JSON-RPC endpoint of the chain node.
    #[arg(long, env = "VAULTBOARD_RPC_URL", default_value = config::DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Path to the data directory holding the dashboard wallet.
    #[arg(
        long,
        short = 'd',
        env = "VAULTBOARD_DATA_DIR",
        default_value = "~/.vaultboard"
    )]
    pub data_dir: PathBuf,

    /// Fixed vault address, skipping seed derivation.
    ///
    /// Must be given together with --user-vault. Useful against
    /// deployments whose accounts were created out of band.
    #[arg(long, env = "VAULTBOARD_VAULT", requires = "user_vault")]
    pub vault: Option<Pubkey>,

    /// Fixed user vault address, skipping seed derivation.
    #[arg(long, env = "VAULTBOARD_USER_VAULT", requires = "vault")]
    pub user_vault: Option<Pubkey>,

    /// The user's token account, debited on deposit.
    #[arg(
        long,
        env = "VAULTBOARD_USER_TOKEN_ACCOUNT",
        default_value = config::DEFAULT_USER_TOKEN_ACCOUNT
    )]
    pub user_token_account: Pubkey,

    /// The vault's pooled token account.
    #[arg(
        long,
        env = "VAULTBOARD_VAULT_TOKEN_ACCOUNT",
        default_value = config::DEFAULT_VAULT_TOKEN_ACCOUNT
    )]
    pub vault_token_account: Pubkey,
}

impl ConnectionArgs {
    /// Where vault addresses come from for this invocation.
    pub fn address_source(&self) -> AddressSource {
        match (self.vault, self.user_vault) {
            (Some(vault), Some(user_vault)) => AddressSource::Fixed { vault, user_vault },
            _ => AddressSource::Derived,
        }
    }

    /// The token account pair transfers run between.
    pub fn token_accounts(&self) -> TokenAccounts {
        TokenAccounts {
            user: self.user_token_account,
            vault: self.vault_token_account,
        }
    }
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Port for the dashboard page and JSON API.
    #[arg(long, env = "VAULTBOARD_HTTP_PORT", default_value_t = 8780)]
    pub http_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VAULTBOARD_METRICS_PORT", default_value_t = 8781)]
    pub metrics_port: u16,

    /// Log output format: pretty or json.
    #[arg(long, env = "VAULTBOARD_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(
        long,
        short = 'd',
        env = "VAULTBOARD_DATA_DIR",
        default_value = "~/.vaultboard"
    )]
    pub data_dir: PathBuf,

    /// Overwrite an existing wallet file.
    ///
    /// The old wallet is gone for good, along with anything it holds.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the one-shot `deposit` and `withdraw` subcommands.
#[derive(Parser, Debug)]
pub struct TransferArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Amount to transfer, in the token's base units.
    pub amount: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        VaultboardCli::command().debug_assert();
    }

    #[test]
    fn transfer_takes_a_positional_amount() {
        let cli = VaultboardCli::try_parse_from(["vaultboard", "deposit", "25"]).unwrap();
        match cli.command {
            Commands::Deposit(args) => assert_eq!(args.amount, 25),
            other => panic!("expected deposit, got {:?}", other),
        }
    }

    #[test]
    fn address_source_defaults_to_derived() {
        let cli = VaultboardCli::try_parse_from(["vaultboard", "balance"]).unwrap();
        match cli.command {
            Commands::Balance(args) => {
                assert_eq!(args.address_source(), AddressSource::Derived)
            }
            other => panic!("expected balance, got {:?}", other),
        }
    }

    #[test]
    fn fixed_addresses_require_each_other() {
        let vault = Pubkey::new_unique().to_string();
        let result =
            VaultboardCli::try_parse_from(["vaultboard", "balance", "--vault", &vault]);
        assert!(result.is_err());
    }

    #[test]
    fn fixed_addresses_feed_the_fixed_source() {
        let vault = Pubkey::new_unique();
        let user_vault = Pubkey::new_unique();
        let cli = VaultboardCli::try_parse_from([
            "vaultboard",
            "balance",
            "--vault",
            &vault.to_string(),
            "--user-vault",
            &user_vault.to_string(),
        ])
        .unwrap();
        match cli.command {
            Commands::Balance(args) => {
                assert_eq!(
                    args.address_source(),
                    AddressSource::Fixed { vault, user_vault }
                );
            }
            other => panic!("expected balance, got {:?}", other),
        }
    }

    #[test]
    fn token_accounts_default_to_the_known_pair() {
        let cli = VaultboardCli::try_parse_from(["vaultboard", "balance"]).unwrap();
        match cli.command {
            Commands::Balance(args) => {
                let accounts = args.token_accounts();
                assert_eq!(
                    accounts.user.to_string(),
                    config::DEFAULT_USER_TOKEN_ACCOUNT
                );
                assert_eq!(
                    accounts.vault.to_string(),
                    config::DEFAULT_VAULT_TOKEN_ACCOUNT
                );
            }
            other => panic!("expected balance, got {:?}", other),
        }
    }
}
