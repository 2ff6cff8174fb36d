//! Request dispatcher tests - raw JSON through `api::handle`
//!
//! Run with: cargo test --test api_tests -- --nocapture

use serde_json::{json, Value};
use tempfile::TempDir;

use zeusbank_core::api::{self, ApiResponse};
use zeusbank_core::ZeusContext;

fn context(temp_dir: &TempDir) -> ZeusContext {
    ZeusContext::with_config(temp_dir.path(), Default::default()).unwrap()
}

fn call(ctx: &ZeusContext, request: Value) -> ApiResponse {
    api::handle(ctx, &request.to_string())
}

fn data(response: &ApiResponse) -> &Value {
    response.result.data.as_ref().expect("response has no data")
}

fn register(ctx: &ZeusContext, username: &str) -> Value {
    let response = call(
        ctx,
        json!({
            "action": "register",
            "fullName": "Api Tester",
            "email": "api@example.com",
            "username": username,
            "password": "pw"
        }),
    );
    assert_eq!(response.status, 200, "{:?}", response);
    data(&response).clone()
}

#[test]
fn test_register_login_and_fund() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);

    let user = register(&ctx, "ann");
    assert!(user.get("password").is_none());
    let number = user["accountNumber"].as_str().unwrap().to_string();

    let login = call(&ctx, json!({"action": "login", "username": "ann", "password": "pw"}));
    assert!(login.is_success());
    assert_eq!(data(&login)["role"], "customer");
    assert_eq!(data(&login)["user"]["accountNumber"], number.as_str());

    let bad = call(&ctx, json!({"action": "login", "username": "ann", "password": "PW"}));
    assert_eq!(bad.status, 401);
    assert!(!bad.is_success());

    // Amounts may arrive as strings
    let fund = call(
        &ctx,
        json!({"action": "fund", "accountNumber": number, "amount": "250.75"}),
    );
    assert_eq!(fund.status, 200);
    assert_eq!(data(&fund)["amount"], 250.75);
    assert_eq!(data(&fund)["memo"], "Admin deposit");

    let user = call(&ctx, json!({"action": "getUser", "userId": user["id"]}));
    assert_eq!(data(&user)["balance"], 250.75);
}

#[test]
fn test_transfer_and_error_codes() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let a = register(&ctx, "a")["accountNumber"].as_str().unwrap().to_string();
    let b = register(&ctx, "b")["accountNumber"].as_str().unwrap().to_string();
    call(&ctx, json!({"action": "fund", "accountNumber": a, "amount": 20000}));

    let ok = call(
        &ctx,
        json!({"action": "transfer", "fromAccount": a, "toAccount": b, "amount": 12000, "memo": "car"}),
    );
    assert_eq!(ok.status, 200);
    assert_eq!(ok.result.message.as_deref(), Some("Transaction completed successfully"));
    assert!(ok.is_alert());

    let broke = call(
        &ctx,
        json!({"action": "transfer", "fromAccount": b, "toAccount": a, "amount": 50000}),
    );
    assert_eq!(broke.status, 400);
    assert_eq!(broke.result.context.as_ref().unwrap()["kind"], "insufficient_funds");

    let missing = call(
        &ctx,
        json!({"action": "transfer", "fromAccount": "00000000", "toAccount": a, "amount": 1}),
    );
    assert_eq!(missing.status, 404);

    let zero = call(
        &ctx,
        json!({"action": "transfer", "fromAccount": a, "toAccount": b, "amount": "0"}),
    );
    assert_eq!(zero.status, 400);

    let garbage = api::handle(&ctx, "{\"action\": \"transfer\", \"amount\": \"lots\"");
    assert_eq!(garbage.status, 400);
    assert_eq!(garbage.result.context.as_ref().unwrap()["kind"], "malformed_request");

    let unknown = call(&ctx, json!({"action": "launchRocket"}));
    assert_eq!(unknown.status, 400);
}

#[test]
fn test_missing_transfer_fields_are_validation_errors() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let sender = register(&ctx, "a");
    let a = sender["accountNumber"].as_str().unwrap().to_string();
    let b = register(&ctx, "b")["accountNumber"].as_str().unwrap().to_string();
    call(&ctx, json!({"action": "fund", "accountNumber": a, "amount": 100}));

    for request in [
        json!({"action": "transfer", "fromAccount": a, "toAccount": b}),
        json!({"action": "transfer", "toAccount": b, "amount": 5}),
        json!({"action": "transfer", "fromAccount": a, "amount": 5}),
    ] {
        let response = call(&ctx, request);
        assert_eq!(response.status, 400);
        let context = response.result.context.as_ref().unwrap();
        assert_eq!(context["kind"], "validation", "{:?}", response);
    }

    let user = call(&ctx, json!({"action": "getUser", "userId": sender["id"]}));
    assert_eq!(data(&user)["balance"], 100.0);
}

#[test]
fn test_edit_delete_and_listing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);
    let user = register(&ctx, "c");
    let number = user["accountNumber"].as_str().unwrap().to_string();

    let fund = call(&ctx, json!({"action": "fund", "accountNumber": number, "amount": 100}));
    let deposit_id = data(&fund)["id"].as_str().unwrap().to_string();

    let withdraw = call(
        &ctx,
        json!({"action": "transfer", "fromAccount": number, "toAccount": "EXTERNAL", "amount": 40}),
    );
    assert_eq!(withdraw.result.message.as_deref(), Some("Transaction is pending approval"));
    let withdrawal_id = data(&withdraw)["transaction"]["id"].as_str().unwrap().to_string();

    let approve = call(
        &ctx,
        json!({"action": "editTransaction", "transactionId": withdrawal_id, "status": "successful"}),
    );
    assert_eq!(approve.status, 200);

    let listed = call(&ctx, json!({"action": "listTransactions", "userId": user["id"]}));
    let listed = data(&listed).as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["type"], "withdrawal");

    let pending = call(&ctx, json!({"action": "listTransactions", "status": "pending"}));
    assert!(data(&pending).as_array().unwrap().is_empty());

    let delete = call(&ctx, json!({"action": "deleteTransaction", "id": deposit_id}));
    assert_eq!(delete.status, 200);
    let user = call(&ctx, json!({"action": "getUser", "userId": user["id"]}));
    assert_eq!(data(&user)["balance"], -40.0);

    let again = call(&ctx, json!({"action": "deleteTransaction", "id": deposit_id}));
    assert_eq!(again.status, 404);
}

#[test]
fn test_settings_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = context(&temp_dir);

    let settings = call(&ctx, json!({"action": "getSettings"}));
    assert_eq!(data(&settings)["accountNumberPrefix"], "5588");
    assert_eq!(data(&settings)["transactionFee"], 1.5);

    let updated = call(
        &ctx,
        json!({"action": "updateSettings", "withdrawalStatus": "successful", "dailyTransferLimit": 0}),
    );
    assert_eq!(updated.status, 200);
    assert_eq!(data(&updated)["withdrawalStatus"], "successful");

    let bad = call(&ctx, json!({"action": "updateSettings", "accountNumberPrefix": "abc"}));
    assert_eq!(bad.status, 400);

    let status = call(&ctx, json!({"action": "status"}));
    assert_eq!(data(&status)["backend"], "json");

    let doctor = call(&ctx, json!({"action": "doctor"}));
    assert_eq!(data(&doctor)["summary"]["errors"], 0);
}
