//! Concurrent ledger access tests
//!
//! Transfers racing on one sender must serialize: the balance check and
//! the debit happen under the same lock, so the account is never overdrawn.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

use rust_decimal::Decimal;

use zeusbank_core::config::{Config, StorageBackend};
use zeusbank_core::services::TransferRequest;
use zeusbank_core::{Error, NewAccount, ZeusContext};

/// Number of concurrent threads competing for the sender's balance
const THREAD_COUNT: usize = 10;

fn register(ctx: &ZeusContext, username: &str) -> String {
    ctx.account_service
        .register(NewAccount {
            full_name: username.to_string(),
            email: format!("{}@example.com", username),
            phone: None,
            username: username.to_string(),
            password: "pw".to_string(),
        })
        .unwrap()
        .account_number
}

fn race(storage: StorageBackend) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage = storage;
    let ctx = Arc::new(ZeusContext::with_config(temp_dir.path(), config).unwrap());

    let sender = register(&ctx, "sender");
    let recipient = register(&ctx, "recipient");
    ctx.ledger_service
        .fund_account(&sender, Decimal::new(100, 0), None)
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let insufficient_count = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            let success_count = Arc::clone(&success_count);
            let insufficient_count = Arc::clone(&insufficient_count);
            let sender = sender.clone();
            let recipient = recipient.clone();

            thread::spawn(move || {
                barrier.wait();
                let result = ctx.ledger_service.transfer(TransferRequest {
                    from_account: sender,
                    to_account: recipient,
                    amount: Decimal::new(20, 0),
                    memo: "race".to_string(),
                    tx_type: None,
                });
                match result {
                    Ok(_) => {
                        success_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(Error::InsufficientFunds) => {
                        insufficient_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => panic!("unexpected error: {}", e),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    println!(
        "{}: {} succeeded, {} rejected",
        ctx.repository.backend(),
        success_count.load(Ordering::SeqCst),
        insufficient_count.load(Ordering::SeqCst)
    );

    assert_eq!(success_count.load(Ordering::SeqCst), 5);
    assert_eq!(insufficient_count.load(Ordering::SeqCst), THREAD_COUNT - 5);

    let sender_balance = ctx.account_service.get_by_number(&sender).unwrap().balance;
    let recipient_balance = ctx.account_service.get_by_number(&recipient).unwrap().balance;
    assert_eq!(sender_balance, Decimal::ZERO);
    assert_eq!(recipient_balance, Decimal::new(100, 0));
}

#[test]
fn test_concurrent_transfers_json() {
    race(StorageBackend::Json);
}

#[test]
fn test_concurrent_transfers_duckdb() {
    race(StorageBackend::Duckdb);
}
