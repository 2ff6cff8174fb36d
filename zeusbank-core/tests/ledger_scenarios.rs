//! Ledger scenarios against both storage backends
//!
//! Every scenario runs once over the JSON documents and once over DuckDB,
//! through a full `ZeusContext`.
//!
//! Run with: cargo test --test ledger_scenarios -- --nocapture

use rust_decimal::Decimal;
use tempfile::TempDir;

use zeusbank_core::config::{Config, PropagationMode, StorageBackend};
use zeusbank_core::services::{TransactionEdit, TransactionFilter, TransferRequest};
use zeusbank_core::{
    AccountStatus, NewAccount, SettingsPatch, TransactionStatus, TransactionType, ZeusContext,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn open(temp_dir: &TempDir, storage: StorageBackend, propagation: PropagationMode) -> ZeusContext {
    let mut config = Config::default();
    config.storage = storage;
    config.propagation = propagation;
    ZeusContext::with_config(temp_dir.path(), config).expect("Failed to open context")
}

/// Run `scenario` on a fresh ledger for each backend
fn on_each_backend(scenario: impl Fn(&ZeusContext)) {
    for storage in [StorageBackend::Json, StorageBackend::Duckdb] {
        let temp_dir = TempDir::new().unwrap();
        let ctx = open(&temp_dir, storage, PropagationMode::Raw);
        println!("backend: {}", ctx.repository.backend());
        scenario(&ctx);
    }
}

fn dec(units: i64) -> Decimal {
    Decimal::new(units, 0)
}

/// Register a customer and fund it; returns the account number
fn customer(ctx: &ZeusContext, username: &str, opening: i64) -> String {
    let profile = ctx
        .account_service
        .register(NewAccount {
            full_name: format!("{} Tester", username),
            email: format!("{}@example.com", username),
            phone: None,
            username: username.to_string(),
            password: "pw".to_string(),
        })
        .unwrap();
    if opening > 0 {
        ctx.ledger_service
            .fund_account(&profile.account_number, dec(opening), Some("opening balance"))
            .unwrap();
    }
    profile.account_number
}

fn balance(ctx: &ZeusContext, number: &str) -> Decimal {
    ctx.account_service.get_by_number(number).unwrap().balance
}

fn transfer(ctx: &ZeusContext, from: &str, to: &str, amount: Decimal) -> zeusbank_core::Transaction {
    ctx.ledger_service
        .transfer(TransferRequest {
            from_account: from.to_string(),
            to_account: to.to_string(),
            amount,
            memo: "scenario".to_string(),
            tx_type: None,
        })
        .unwrap()
        .transaction
}

fn set_status(ctx: &ZeusContext, id: &str, status: TransactionStatus) {
    ctx.ledger_service
        .edit_transaction(
            id,
            TransactionEdit {
                status: Some(status),
                ..Default::default()
            },
        )
        .unwrap();
}

fn make_transfers_pending(ctx: &ZeusContext) {
    ctx.settings_service
        .update(SettingsPatch {
            interbank_transfer_status: Some(TransactionStatus::Pending),
            ..Default::default()
        })
        .unwrap();
}

fn log_of(ctx: &ZeusContext, number: &str) -> Vec<zeusbank_core::Transaction> {
    ctx.ledger_service
        .list_transactions(&TransactionFilter {
            account_number: Some(number.to_string()),
            ..Default::default()
        })
        .unwrap()
}

// ============================================================================
// Transfers
// ============================================================================

#[test]
fn test_successful_transfer_moves_money_once() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 0);

        let tx = transfer(ctx, &x, &y, dec(40));
        assert_eq!(tx.status, TransactionStatus::Successful);
        assert_eq!(balance(ctx, &x), dec(60));
        assert_eq!(balance(ctx, &y), dec(40));

        let sender_view = log_of(ctx, &x);
        assert!(sender_view
            .iter()
            .any(|t| t.id == tx.id && t.tx_type == TransactionType::Transfer));
        let recipient_view = log_of(ctx, &y);
        assert_eq!(recipient_view.len(), 1);
        assert_eq!(recipient_view[0].id, tx.id);
        assert_eq!(recipient_view[0].tx_type, TransactionType::Deposit);
        assert_eq!(recipient_view[0].amount, dec(40));
    });
}

#[test]
fn test_pending_transfer_then_approval() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 0);
        make_transfers_pending(ctx);

        let tx = transfer(ctx, &x, &y, dec(40));
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(balance(ctx, &x), dec(100));
        assert_eq!(balance(ctx, &y), Decimal::ZERO);
        // Pending transfers are not visible to the recipient
        assert!(log_of(ctx, &y).is_empty());

        set_status(ctx, &tx.id, TransactionStatus::Successful);
        assert_eq!(balance(ctx, &x), dec(60));
        assert_eq!(balance(ctx, &y), dec(40));
        assert_eq!(log_of(ctx, &y)[0].tx_type, TransactionType::Deposit);
    });
}

#[test]
fn test_approve_then_revert_restores_balances() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 10);
        make_transfers_pending(ctx);

        let tx = transfer(ctx, &x, &y, Decimal::new(2550, 2));
        set_status(ctx, &tx.id, TransactionStatus::Successful);
        assert_eq!(balance(ctx, &x), Decimal::new(7450, 2));
        set_status(ctx, &tx.id, TransactionStatus::Pending);
        assert_eq!(balance(ctx, &x), dec(100));
        assert_eq!(balance(ctx, &y), dec(10));
    });
}

#[test]
fn test_amount_edit_on_successful_transfer_moves_difference() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 0);
        let tx = transfer(ctx, &x, &y, dec(40));

        ctx.ledger_service
            .edit_transaction(
                &tx.id,
                TransactionEdit {
                    amount: Some(dec(25)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(balance(ctx, &x), dec(75));
        assert_eq!(balance(ctx, &y), dec(25));
        assert_eq!(balance(ctx, &x) + balance(ctx, &y), dec(100));
    });
}

#[test]
fn test_withdrawal_waits_for_approval() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let tx = transfer(ctx, &x, "EXTERNAL", dec(30));
        assert_eq!(tx.tx_type, TransactionType::Withdrawal);
        assert_eq!(balance(ctx, &x), dec(100));

        set_status(ctx, &tx.id, TransactionStatus::Successful);
        assert_eq!(balance(ctx, &x), dec(70));
    });
}

// ============================================================================
// Admin funding and corrections
// ============================================================================

#[test]
fn test_fund_account_records_history() {
    on_each_backend(|ctx| {
        let z = customer(ctx, "z", 0);
        let tx = ctx.ledger_service.fund_account(&z, dec(500), None).unwrap();
        assert_eq!(tx.from_account, "ADMIN");
        assert_eq!(balance(ctx, &z), dec(500));

        let history = ctx.ledger_service.funding_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].account_number, z);
        assert_eq!(history[0].amount, dec(500));
    });
}

#[test]
fn test_deposit_amount_edit_changes_balance_by_difference() {
    on_each_backend(|ctx| {
        let z = customer(ctx, "z", 0);
        let tx = ctx.ledger_service.fund_account(&z, dec(200), None).unwrap();
        ctx.ledger_service
            .edit_transaction(
                &tx.id,
                TransactionEdit {
                    amount: Some(Decimal::new(17525, 2)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(balance(ctx, &z), Decimal::new(17525, 2));
    });
}

#[test]
fn test_delete_successful_and_pending() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 0);
        let deposit = ctx.ledger_service.fund_account(&y, dec(30), None).unwrap();
        let sent = transfer(ctx, &x, &y, dec(20));
        let pending = transfer(ctx, &x, "EXTERNAL", dec(5));

        ctx.ledger_service.delete_transaction(&pending.id).unwrap();
        assert_eq!(balance(ctx, &x), dec(80));

        ctx.ledger_service.delete_transaction(&deposit.id).unwrap();
        assert_eq!(balance(ctx, &y), dec(20));

        // Both sides of a transfer are reversed
        ctx.ledger_service.delete_transaction(&sent.id).unwrap();
        assert_eq!(balance(ctx, &x), dec(100));
        assert_eq!(balance(ctx, &y), Decimal::ZERO);
    });
}

#[test]
fn test_deleted_user_leaves_orphans() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 50);
        let user = ctx.account_service.get_by_number(&x).unwrap();
        ctx.account_service.delete_user(&user.id).unwrap();

        assert_eq!(ctx.ledger_service.list_transactions(&TransactionFilter::default()).unwrap().len(), 1);
        let report = ctx.doctor_service.run_checks().unwrap();
        assert_eq!(report.checks["orphaned_transactions"].status, "error");
    });
}

#[test]
fn test_sub_cent_and_self_transfers_keep_exact_balances() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 1);
        let y = customer(ctx, "y", 0);

        transfer(ctx, &x, &y, Decimal::new(5, 3));
        transfer(ctx, &x, &x, Decimal::new(25, 2));
        assert_eq!(balance(ctx, &x), Decimal::new(995, 3));
        assert_eq!(balance(ctx, &y), Decimal::new(5, 3));
        assert_eq!(log_of(ctx, &y)[0].amount, Decimal::new(5, 3));
    });
}

// ============================================================================
// Policy propagation
// ============================================================================

#[test]
fn test_raw_propagation_leaves_balances() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 0);
        let tx = transfer(ctx, &x, &y, dec(40));

        make_transfers_pending(ctx);
        let all = ctx.ledger_service.list_transactions(&TransactionFilter::default()).unwrap();
        assert!(all
            .iter()
            .filter(|t| t.tx_type == TransactionType::Transfer)
            .all(|t| t.status == TransactionStatus::Pending));
        assert!(all
            .iter()
            .filter(|t| t.tx_type == TransactionType::Deposit)
            .all(|t| t.status == TransactionStatus::Successful));
        assert_eq!(balance(ctx, &x), dec(60));
        assert_eq!(balance(ctx, &y), dec(40));

        // The money already reached y, so y still sees it arrive
        let recipient_view = log_of(ctx, &y);
        assert_eq!(recipient_view.len(), 1);
        assert_eq!(recipient_view[0].id, tx.id);
        assert_eq!(recipient_view[0].tx_type, TransactionType::Deposit);
        assert_eq!(recipient_view[0].status, TransactionStatus::Successful);
        assert_eq!(recipient_view[0].amount, dec(40));

        let sender_view = log_of(ctx, &x);
        let sent = sender_view.iter().find(|t| t.id == tx.id).unwrap();
        assert_eq!(sent.status, TransactionStatus::Pending);
    });
}

#[test]
fn test_edit_after_raw_propagation_books_once() {
    on_each_backend(|ctx| {
        let x = customer(ctx, "x", 100);
        let y = customer(ctx, "y", 0);
        let tx = transfer(ctx, &x, &y, dec(40));
        make_transfers_pending(ctx);

        // Approving a restated transfer must not move the money a second time
        set_status(ctx, &tx.id, TransactionStatus::Successful);
        assert_eq!(balance(ctx, &x), dec(60));
        assert_eq!(balance(ctx, &y), dec(40));

        set_status(ctx, &tx.id, TransactionStatus::Failed);
        assert_eq!(balance(ctx, &x), dec(100));
        assert_eq!(balance(ctx, &y), Decimal::ZERO);
        assert!(log_of(ctx, &y).is_empty());
    });
}

#[test]
fn test_reconcile_propagation_moves_balances() {
    for storage in [StorageBackend::Json, StorageBackend::Duckdb] {
        let temp_dir = TempDir::new().unwrap();
        let ctx = open(&temp_dir, storage, PropagationMode::Reconcile);
        let x = customer(&ctx, "x", 100);
        let y = customer(&ctx, "y", 0);
        transfer(&ctx, &x, &y, dec(40));
        let w = transfer(&ctx, &x, "EXTERNAL", dec(10));

        make_transfers_pending(&ctx);
        assert_eq!(balance(&ctx, &x), dec(100));
        assert_eq!(balance(&ctx, &y), Decimal::ZERO);

        ctx.settings_service
            .update(SettingsPatch {
                withdrawal_status: Some(TransactionStatus::Successful),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ctx.ledger_service.get_transaction(&w.id).unwrap().status, TransactionStatus::Successful);
        assert_eq!(balance(&ctx, &x), dec(90));
    }
}

#[test]
fn test_default_account_status_and_new_registrations() {
    on_each_backend(|ctx| {
        customer(ctx, "x", 0);
        ctx.settings_service
            .update(SettingsPatch {
                default_account_status: Some(AccountStatus::Active),
                initial_balance: Some(dec(15)),
                account_number_prefix: Some("7700".to_string()),
                ..Default::default()
            })
            .unwrap();

        let y = customer(ctx, "y", 0);
        assert!(y.starts_with("7700"));
        assert_eq!(balance(ctx, &y), dec(15));
        assert!(ctx
            .account_service
            .list_users(None)
            .unwrap()
            .iter()
            .all(|u| u.status == AccountStatus::Active));
    });
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_state_survives_reopen() {
    for storage in [StorageBackend::Json, StorageBackend::Duckdb] {
        let temp_dir = TempDir::new().unwrap();
        let (x, y, id) = {
            let ctx = open(&temp_dir, storage, PropagationMode::Raw);
            let x = customer(&ctx, "x", 100);
            let y = customer(&ctx, "y", 0);
            let tx = transfer(&ctx, &x, &y, Decimal::new(1234, 2));
            (x, y, tx.id)
        };

        let ctx = open(&temp_dir, storage, PropagationMode::Raw);
        assert_eq!(balance(&ctx, &x), Decimal::new(8766, 2));
        assert_eq!(balance(&ctx, &y), Decimal::new(1234, 2));
        let tx = ctx.ledger_service.get_transaction(&id).unwrap();
        assert_eq!(tx.amount, Decimal::new(1234, 2));
        assert_eq!(tx.memo, "scenario");
        assert_eq!(ctx.status_service.get_status().unwrap().total_accounts, 2);
    }
}

#[test]
fn test_json_documents_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = open(&temp_dir, StorageBackend::Json, PropagationMode::Raw);
    let x = customer(&ctx, "x", 100);

    let users: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp_dir.path().join("users.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(users[0]["accountNumber"], x.as_str());
    assert_eq!(users[0]["balance"], 100.0);

    let txs: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp_dir.path().join("transactions.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(txs[0]["type"], "deposit");
    assert_eq!(txs[0]["fromAccount"], "ADMIN");
    assert!(temp_dir.path().join("fundingHistory.json").exists());
}
