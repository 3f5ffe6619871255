// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vaultboard Dashboard
//!
//! Entry point for the `vaultboard` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the dashboard page with its
//! JSON API and Prometheus endpoint.
//!
//! The binary supports six subcommands:
//!
//! - `serve`    — start the dashboard server
//! - `init`     — initialize the data directory and generate a wallet
//! - `balance`  — print the wallet's vault balance
//! - `deposit`  — deposit into the vault
//! - `withdraw` — withdraw from the vault
//! - `version`  — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;

use solana_sdk::signature::{write_keypair_file, Keypair, Signer};

use vaultboard_client::client::VaultClient;
use vaultboard_client::config;
use vaultboard_client::gateway::ProgramGateway;
use vaultboard_client::rpc::RpcGateway;
use vaultboard_client::session::{Operation, VaultSession};

use cli::{Commands, ConnectionArgs, VaultboardCli};
use logging::LogFormat;
use metrics::DashboardMetrics;

/// File inside the data directory holding the dashboard wallet keypair.
const WALLET_FILE_NAME: &str = "wallet.json";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VaultboardCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Init(args) => init(args),
        Commands::Balance(args) => print_balance(args).await,
        Commands::Deposit(args) => transfer(args, Operation::Deposit).await,
        Commands::Withdraw(args) => transfer(args, Operation::Withdraw).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the dashboard server: page, JSON API, and metrics endpoint.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    logging::init_logging(
        "vaultboard=info,vaultboard_client=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let data_dir = expand_tilde(&args.connection.data_dir);
    tracing::info!(
        http_port = args.http_port,
        metrics_port = args.metrics_port,
        rpc_url = %args.connection.rpc_url,
        data_dir = %data_dir.display(),
        "starting vaultboard"
    );

    // --- Metrics ---
    let dashboard_metrics = Arc::new(DashboardMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (client {})",
            env!("CARGO_PKG_VERSION"),
            config::CLIENT_VERSION,
        ),
        rpc_url: args.connection.rpc_url.clone(),
        wallet_path: wallet_path(&data_dir),
        address_source: args.connection.address_source(),
        token_accounts: args.connection.token_accounts(),
        gateway_factory: Arc::new(|url: &str| {
            RpcGateway::new(url).map(|gateway| Box::new(gateway) as Box<dyn ProgramGateway>)
        }),
        session: Arc::new(Mutex::new(VaultSession::new())),
        metrics: Arc::clone(&dashboard_metrics),
    };

    // --- Wallet auto-connect ---
    if app_state.wallet_path.exists() {
        connect_existing_wallet(&app_state).await;
    } else {
        tracing::info!(
            path = %app_state.wallet_path.display(),
            "no wallet yet; run `vaultboard init`, then connect from the page"
        );
    }

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.http_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", api_addr))?;
    tracing::info!("dashboard listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&dashboard_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("vaultboard stopped");
    Ok(())
}

/// Connects the on-disk wallet at startup so a restarted server comes back
/// with the session it had. Failures are logged, not fatal: the page can
/// retry once the node is reachable.
async fn connect_existing_wallet(state: &api::AppState) {
    let wallet = match api::load_wallet(&state.wallet_path) {
        Ok(wallet) => wallet,
        Err(e) => {
            tracing::warn!(error = %e, "wallet file present but unreadable");
            return;
        }
    };

    let gateway = match (state.gateway_factory)(&state.rpc_url) {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::warn!(error = %e, "gateway unavailable, connect from the page later");
            return;
        }
    };

    match VaultClient::new(gateway, wallet, state.address_source, state.token_accounts) {
        Ok(client) => {
            state.metrics.wallet_connects_total.inc();
            state.metrics.wallet_connected.set(1);
            state.session.lock().await.connect(client);
        }
        Err(e) => {
            tracing::warn!(error = %e, "auto-connect failed, connect from the page later");
            state.session.lock().await.note_connect_failure(&e);
        }
    }
}

/// Initializes the data directory and generates a dashboard wallet.
fn init(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("vaultboard=info", LogFormat::Pretty);

    let data_dir = expand_tilde(&args.data_dir);
    tracing::info!(data_dir = %data_dir.display(), "initializing dashboard");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let wallet_file = wallet_path(&data_dir);
    if wallet_file.exists() && !args.force {
        anyhow::bail!(
            "wallet already exists at {}; pass --force to overwrite it",
            wallet_file.display()
        );
    }

    // Generate the dashboard wallet.
    let wallet = Keypair::new();
    write_keypair_file(&wallet, &wallet_file).map_err(|e| {
        anyhow::anyhow!("failed to write wallet to {}: {}", wallet_file.display(), e)
    })?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&wallet_file, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(
        wallet = %wallet.pubkey(),
        path = %wallet_file.display(),
        "dashboard wallet generated"
    );

    println!("Dashboard initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Wallet file    : {}", wallet_file.display());
    println!("  Wallet address : {}", wallet.pubkey());

    Ok(())
}

/// Builds a connected client for the one-shot subcommands.
fn connect_client(connection: &ConnectionArgs) -> Result<VaultClient> {
    let wallet_file = wallet_path(&expand_tilde(&connection.data_dir));
    let wallet = api::load_wallet(&wallet_file)?;
    let gateway = RpcGateway::new(&connection.rpc_url)?;
    let client = VaultClient::new(
        Box::new(gateway),
        wallet,
        connection.address_source(),
        connection.token_accounts(),
    )?;
    Ok(client)
}

/// Prints the wallet's current vault balance and exits.
async fn print_balance(args: ConnectionArgs) -> Result<()> {
    logging::init_logging("vaultboard=warn", LogFormat::Pretty);

    let client = connect_client(&args)?;
    let balance = client.fetch_balance().await?;
    println!("Your Balance: {}", balance);
    Ok(())
}

/// Runs a one-shot deposit or withdrawal and waits for confirmation.
async fn transfer(args: cli::TransferArgs, operation: Operation) -> Result<()> {
    logging::init_logging("vaultboard=warn", LogFormat::Pretty);

    let client = connect_client(&args.connection)?;
    let signature = match operation {
        Operation::Deposit => client.deposit(args.amount).await?,
        Operation::Withdraw => client.withdraw(args.amount).await?,
    };

    println!("{}", operation.success_line());
    println!("  Amount    : {}", args.amount);
    println!("  Signature : {}", signature);
    if let Ok(balance) = client.fetch_balance().await {
        println!("  Balance   : {}", balance);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("vaultboard {}", env!("CARGO_PKG_VERSION"));
    println!("client     {}", config::CLIENT_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths that do not start with `~` pass through unchanged, as does
/// everything when `HOME` is unset.
fn expand_tilde(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(std::path::Component::Normal(first)) if first == "~" => {
            match std::env::var_os("HOME") {
                Some(home) => PathBuf::from(home).join(components.as_path()),
                None => path.to_path_buf(),
            }
        }
        _ => path.to_path_buf(),
    }
}

/// The wallet file inside a data directory.
fn wallet_path(data_dir: &Path) -> PathBuf {
    data_dir.join(WALLET_FILE_NAME)
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
