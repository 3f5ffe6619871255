//! End-to-end scenario tests for the vault client.
//!
//! These tests exercise the full user flow against an in-memory ledger
//! double: connect a wallet, derive the address pair, fetch the balance,
//! submit deposits and withdrawals, and read back the status and error
//! lines the dashboard shows. The double applies submitted instructions
//! to per-account balances the way the on-chain program would, including
//! rejecting overdrafts with the program's declared error code.
//!
//! Each test builds its own ledger and session. No shared state, no test
//! ordering dependencies.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use borsh::BorshSerialize;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};

use vaultboard_client::accounts::UserVault;
use vaultboard_client::address::AddressSource;
use vaultboard_client::client::{ClientError, TokenAccounts, VaultClient};
use vaultboard_client::config;
use vaultboard_client::gateway::{GatewayError, ProgramGateway};
use vaultboard_client::manifest::Manifest;
use vaultboard_client::session::{
    SessionError, VaultSession, ERR_DEPOSIT, ERR_FETCH_BALANCE, ERR_WITHDRAW,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// What the ledger double tracks between calls.
#[derive(Default)]
struct LedgerState {
    /// Sub-account balances keyed by user vault address.
    balances: HashMap<Pubkey, u64>,
    /// Every instruction ever submitted, applied or not.
    submitted: Vec<Instruction>,
    /// When set, the next submission is rejected with this custom code.
    reject_next: Option<u32>,
    /// When set, account fetches fail at the transport level.
    fail_fetch: bool,
}

/// In-memory stand-in for the chain node. Serves account data for seeded
/// balances and applies deposit/withdraw instructions by their manifest
/// discriminators, rejecting overdrafts the way the program does.
#[derive(Clone, Default)]
struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    fn seed(&self, user_vault: Pubkey, balance: u64) {
        self.state.lock().unwrap().balances.insert(user_vault, balance);
    }

    fn reject_next(&self, code: u32) {
        self.state.lock().unwrap().reject_next = Some(code);
    }

    fn fail_fetches(&self) {
        self.state.lock().unwrap().fail_fetch = true;
    }

    fn balance_of(&self, user_vault: &Pubkey) -> Option<u64> {
        self.state.lock().unwrap().balances.get(user_vault).copied()
    }

    fn submitted(&self) -> Vec<Instruction> {
        self.state.lock().unwrap().submitted.clone()
    }
}

#[async_trait]
impl ProgramGateway for MockLedger {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.fail_fetch {
            return Err(GatewayError::Transport("ledger unreachable".into()));
        }
        let balance = *state
            .balances
            .get(address)
            .ok_or(GatewayError::AccountNotFound(*address))?;
        let mut data = UserVault::DISCRIMINATOR.to_vec();
        UserVault { balance }
            .serialize(&mut data)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(data)
    }

    async fn submit(
        &self,
        instruction: Instruction,
        _payer: &Keypair,
    ) -> Result<Signature, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(instruction.clone());

        if let Some(code) = state.reject_next.take() {
            return Err(GatewayError::Rejected {
                message: "Transaction simulation failed".into(),
                custom_code: Some(code),
            });
        }

        let manifest = Manifest::load().expect("embedded manifest");
        let deposit = manifest.instruction("deposit").expect("deposit declared");
        let withdraw = manifest.instruction("withdraw").expect("withdraw declared");

        // Instruction data is discriminator then one little-endian u64.
        let (disc, arg) = instruction.data.split_at(8);
        let amount = u64::from_le_bytes(arg[..8].try_into().expect("u64 argument"));
        // The manifest places the user vault second in both account lists.
        let user_vault = instruction.accounts[1].pubkey;

        if disc == deposit.discriminator {
            *state.balances.entry(user_vault).or_insert(0) += amount;
        } else if disc == withdraw.discriminator {
            let entry = state.balances.entry(user_vault).or_insert(0);
            if *entry < amount {
                let declared = manifest
                    .error_for_code(6000)
                    .expect("insufficient balance declared");
                return Err(GatewayError::Rejected {
                    message: format!("{} would overdraw", declared.name),
                    custom_code: Some(declared.code),
                });
            }
            *entry -= amount;
        } else {
            return Err(GatewayError::Rejected {
                message: "unknown instruction".into(),
                custom_code: None,
            });
        }
        Ok(Signature::default())
    }
}

fn token_accounts() -> TokenAccounts {
    TokenAccounts {
        user: Pubkey::from_str(config::DEFAULT_USER_TOKEN_ACCOUNT).unwrap(),
        vault: Pubkey::from_str(config::DEFAULT_VAULT_TOKEN_ACCOUNT).unwrap(),
    }
}

/// Connects a fresh wallet to the given ledger with derived addresses.
fn connect(ledger: &MockLedger) -> (VaultSession, Pubkey) {
    let client = VaultClient::new(
        Box::new(ledger.clone()),
        Keypair::new(),
        AddressSource::Derived,
        token_accounts(),
    )
    .expect("connect");
    let user_vault = client.addresses().user_vault;
    let mut session = VaultSession::new();
    session.connect(client);
    (session, user_vault)
}

// ---------------------------------------------------------------------------
// 1. Full Deposit Flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_deposit_flow() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    ledger.seed(user_vault, 100);

    // Connect shows the wallet and the derived pair, no balance yet.
    assert!(session.is_connected());
    assert_eq!(session.balance(), None);

    // First fetch renders the seeded balance.
    assert_eq!(session.refresh_balance().await.unwrap(), 100);
    assert_eq!(session.balance_line().as_deref(), Some("Your Balance: 100"));

    // Deposit 25 and confirm the page state afterwards.
    session.deposit(25).await.unwrap();
    assert_eq!(session.status_line(), Some("Deposit successful!"));
    assert_eq!(session.error_line(), None);
    assert_eq!(session.balance(), Some(125));
    assert_eq!(ledger.balance_of(&user_vault), Some(125));
}

// ---------------------------------------------------------------------------
// 2. Full Withdrawal Flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_withdrawal_flow() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    ledger.seed(user_vault, 100);

    session.refresh_balance().await.unwrap();
    session.withdraw(40).await.unwrap();

    assert_eq!(session.status_line(), Some("Withdrawal successful!"));
    assert_eq!(session.balance(), Some(60));
    assert_eq!(ledger.balance_of(&user_vault), Some(60));
}

// ---------------------------------------------------------------------------
// 3. Deposit Then Withdraw
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deposit_then_withdraw_round_trip() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    ledger.seed(user_vault, 1_000);

    session.deposit(500).await.unwrap();
    assert_eq!(session.balance(), Some(1_500));

    session.withdraw(1_200).await.unwrap();
    assert_eq!(session.balance(), Some(300));
    assert_eq!(ledger.balance_of(&user_vault), Some(300));
}

// ---------------------------------------------------------------------------
// 4. First Deposit Creates the Sub-Account
// ---------------------------------------------------------------------------

#[tokio::test]
async fn first_deposit_creates_the_sub_account() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);

    // No sub-account yet, so the fetch fails with the page's error line.
    assert!(session.refresh_balance().await.is_err());
    assert_eq!(session.error_line(), Some(ERR_FETCH_BALANCE));

    // The first deposit brings the account into existence.
    session.deposit(10).await.unwrap();
    assert_eq!(session.balance(), Some(10));
    assert_eq!(ledger.balance_of(&user_vault), Some(10));
}

// ---------------------------------------------------------------------------
// 5. Overdraft Is Rejected With the Declared Error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overdraft_is_rejected_and_balance_preserved() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    ledger.seed(user_vault, 10);
    session.refresh_balance().await.unwrap();

    let result = session.withdraw(50).await;

    assert!(result.is_err());
    assert_eq!(session.error_line(), Some(ERR_WITHDRAW));
    assert_eq!(session.status_line(), None);
    // Nothing moved, on either side.
    assert_eq!(session.balance(), Some(10));
    assert_eq!(ledger.balance_of(&user_vault), Some(10));
}

#[tokio::test]
async fn overdraft_surfaces_the_declared_error_name() {
    let ledger = MockLedger::default();
    let client = VaultClient::new(
        Box::new(ledger.clone()),
        Keypair::new(),
        AddressSource::Derived,
        token_accounts(),
    )
    .unwrap();
    ledger.seed(client.addresses().user_vault, 10);

    match client.withdraw(50).await {
        Err(ClientError::Program { code, name, .. }) => {
            assert_eq!(code, 6000);
            assert_eq!(name, "insufficientBalance");
        }
        other => panic!("expected declared program error, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// 6. Submission Failures Leave State Alone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_deposit_reports_and_preserves_state() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    ledger.seed(user_vault, 100);
    session.refresh_balance().await.unwrap();

    ledger.reject_next(6001);
    assert!(session.deposit(25).await.is_err());

    assert_eq!(session.error_line(), Some(ERR_DEPOSIT));
    assert_eq!(session.balance(), Some(100));
    assert_eq!(ledger.balance_of(&user_vault), Some(100));
}

#[tokio::test]
async fn fetch_outage_reports_the_balance_error() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    ledger.seed(user_vault, 100);
    ledger.fail_fetches();

    assert!(session.refresh_balance().await.is_err());
    assert_eq!(session.error_line(), Some(ERR_FETCH_BALANCE));
    assert_eq!(session.balance(), None);
}

// ---------------------------------------------------------------------------
// 7. Submitted Instruction Shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deposit_submits_the_declared_account_list() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    let wallet = session.wallet().unwrap();
    ledger.seed(user_vault, 0);

    session.deposit(25).await.unwrap();

    let manifest = Manifest::load().unwrap();
    let submitted = ledger.submitted();
    assert_eq!(submitted.len(), 1);
    let instruction = &submitted[0];

    assert_eq!(instruction.program_id, manifest.program_id().unwrap());
    assert_eq!(&instruction.data[..8], &manifest.instruction("deposit").unwrap().discriminator);
    assert_eq!(&instruction.data[8..], &25u64.to_le_bytes());

    // vault, userVault, user, userTokenAccount, vaultTokenAccount, tokenProgram.
    assert_eq!(instruction.accounts.len(), 6);
    assert_eq!(instruction.accounts[1].pubkey, user_vault);
    assert_eq!(instruction.accounts[2].pubkey, wallet);
    assert!(instruction.accounts[2].is_signer);
    assert_eq!(instruction.accounts[3].pubkey, token_accounts().user);
    assert_eq!(instruction.accounts[4].pubkey, token_accounts().vault);
    assert!(!instruction.accounts[5].is_writable);
}

#[tokio::test]
async fn withdraw_signs_as_the_owner_role() {
    let ledger = MockLedger::default();
    let (mut session, user_vault) = connect(&ledger);
    let wallet = session.wallet().unwrap();
    ledger.seed(user_vault, 50);

    session.withdraw(20).await.unwrap();

    let manifest = Manifest::load().unwrap();
    let instruction = &ledger.submitted()[0];
    assert_eq!(
        &instruction.data[..8],
        &manifest.instruction("withdraw").unwrap().discriminator
    );
    // Same wallet key fills the `owner` slot the manifest declares.
    assert_eq!(instruction.accounts[2].pubkey, wallet);
    assert!(instruction.accounts[2].is_signer);
}

// ---------------------------------------------------------------------------
// 8. Nothing Flows Without a Wallet
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnected_session_never_reaches_the_ledger() {
    let ledger = MockLedger::default();
    let mut session = VaultSession::new();

    assert!(matches!(
        session.deposit(5).await,
        Err(SessionError::NotConnected)
    ));
    assert!(matches!(
        session.refresh_balance().await,
        Err(SessionError::NotConnected)
    ));
    assert!(ledger.submitted().is_empty());
}

// ---------------------------------------------------------------------------
// 9. Reconnecting Switches Wallets Cleanly
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_switches_to_the_new_wallet() {
    let ledger = MockLedger::default();

    let (mut session, first_vault) = connect(&ledger);
    ledger.seed(first_vault, 100);
    assert_eq!(session.refresh_balance().await.unwrap(), 100);

    // A different wallet connects through the same dashboard.
    let second = VaultClient::new(
        Box::new(ledger.clone()),
        Keypair::new(),
        AddressSource::Derived,
        token_accounts(),
    )
    .unwrap();
    let second_vault = second.addresses().user_vault;
    assert_ne!(first_vault, second_vault);
    ledger.seed(second_vault, 40);

    session.connect(second);
    assert_eq!(session.balance(), None);
    assert_eq!(session.refresh_balance().await.unwrap(), 40);
}

// ---------------------------------------------------------------------------
// 10. Fixed Addresses Run the Same Flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fixed_addresses_run_the_same_flow() {
    let ledger = MockLedger::default();
    let vault = Pubkey::new_unique();
    let user_vault = Pubkey::new_unique();

    let client = VaultClient::new(
        Box::new(ledger.clone()),
        Keypair::new(),
        AddressSource::Fixed { vault, user_vault },
        token_accounts(),
    )
    .unwrap();
    assert_eq!(client.addresses().vault, vault);

    let mut session = VaultSession::new();
    session.connect(client);
    ledger.seed(user_vault, 7);

    assert_eq!(session.refresh_balance().await.unwrap(), 7);
    session.deposit(3).await.unwrap();
    assert_eq!(session.balance(), Some(10));
    assert_eq!(ledger.balance_of(&user_vault), Some(10));
}
