//! Request dispatcher - JSON in, JSON out
//!
//! One request is a JSON object tagged by `"action"`. Every outcome,
//! failures included, comes back as an [`ApiResponse`] carrying an
//! HTTP-style status code.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::result::{Error, OperationResult, Result};
use crate::domain::{AccountStatus, NewAccount, SettingsPatch, TransactionStatus, TransactionType};
use crate::services::{
    ProfileUpdate, TransactionEdit, TransactionFilter, TransferRequest, UserUpdate,
};
use crate::ZeusContext;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ApiRequest {
    Register(NewAccount),
    #[serde(rename_all = "camelCase")]
    Login { username: String, password: String },
    #[serde(rename_all = "camelCase")]
    GetUser { user_id: String },
    #[serde(rename_all = "camelCase")]
    ListUsers {
        #[serde(default)]
        status: Option<AccountStatus>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateUser {
        user_id: String,
        #[serde(default)]
        full_name: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        status: Option<AccountStatus>,
        #[serde(default, deserialize_with = "optional_amount")]
        balance: Option<Decimal>,
    },
    #[serde(rename_all = "camelCase")]
    DeleteUser { user_id: String },
    #[serde(rename_all = "camelCase")]
    UpdateProfile {
        user_id: String,
        #[serde(default)]
        full_name: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        current_password: Option<String>,
        #[serde(default)]
        new_password: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Transfer {
        from_account: String,
        to_account: String,
        #[serde(deserialize_with = "required_amount")]
        amount: Decimal,
        #[serde(default)]
        memo: String,
        #[serde(default, rename = "type")]
        tx_type: Option<TransactionType>,
    },
    #[serde(rename_all = "camelCase")]
    Fund {
        account_number: String,
        #[serde(deserialize_with = "required_amount")]
        amount: Decimal,
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    EditTransaction {
        #[serde(alias = "transactionId")]
        id: String,
        #[serde(default, deserialize_with = "optional_amount")]
        amount: Option<Decimal>,
        #[serde(default)]
        status: Option<TransactionStatus>,
    },
    #[serde(rename_all = "camelCase")]
    DeleteTransaction {
        #[serde(alias = "transactionId")]
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    GetTransaction {
        #[serde(alias = "transactionId")]
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    ListTransactions {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        account_number: Option<String>,
        #[serde(default, rename = "type")]
        tx_type: Option<TransactionType>,
        #[serde(default)]
        status: Option<TransactionStatus>,
    },
    UpdateSettings(SettingsPatch),
    GetSettings,
    FundingHistory,
    Status,
    Doctor,
}

impl ApiRequest {
    /// Action name as written on the wire, safe for the event log
    pub fn action(&self) -> &'static str {
        match self {
            ApiRequest::Register(_) => "register",
            ApiRequest::Login { .. } => "login",
            ApiRequest::GetUser { .. } => "getUser",
            ApiRequest::ListUsers { .. } => "listUsers",
            ApiRequest::UpdateUser { .. } => "updateUser",
            ApiRequest::DeleteUser { .. } => "deleteUser",
            ApiRequest::UpdateProfile { .. } => "updateProfile",
            ApiRequest::Transfer { .. } => "transfer",
            ApiRequest::Fund { .. } => "fund",
            ApiRequest::EditTransaction { .. } => "editTransaction",
            ApiRequest::DeleteTransaction { .. } => "deleteTransaction",
            ApiRequest::GetTransaction { .. } => "getTransaction",
            ApiRequest::ListTransactions { .. } => "listTransactions",
            ApiRequest::UpdateSettings(_) => "updateSettings",
            ApiRequest::GetSettings => "getSettings",
            ApiRequest::FundingHistory => "fundingHistory",
            ApiRequest::Status => "status",
            ApiRequest::Doctor => "doctor",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(flatten)]
    pub result: OperationResult<Value>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.result.success
    }

    /// Whether the response reports a transfer at or above the alert threshold
    pub fn is_alert(&self) -> bool {
        self.result
            .data
            .as_ref()
            .and_then(|d| d.get("alert"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn from_error(err: Error) -> Self {
        Self {
            status: err.status_code(),
            result: OperationResult::from(Err(err)),
        }
    }
}

/// Parse and run one raw JSON request
pub fn handle(ctx: &ZeusContext, raw: &str) -> ApiResponse {
    match serde_json::from_str::<ApiRequest>(raw) {
        Ok(request) => handle_request(ctx, request),
        Err(e) => ApiResponse::from_error(request_error(e)),
    }
}

/// A well-formed request that leaves out a required field is a validation
/// failure; anything else that does not parse is malformed.
fn request_error(e: serde_json::Error) -> Error {
    let message = e.to_string();
    if e.classify() == serde_json::error::Category::Data && message.starts_with("missing field") {
        Error::validation(message)
    } else {
        Error::malformed(message)
    }
}

/// Run one parsed request
pub fn handle_request(ctx: &ZeusContext, request: ApiRequest) -> ApiResponse {
    match dispatch(ctx, request) {
        Ok((data, message)) => ApiResponse {
            status: 200,
            result: match message {
                Some(message) => OperationResult::ok_with_message(data, message),
                None => OperationResult::ok(data),
            },
        },
        Err(e) => ApiResponse::from_error(e),
    }
}

fn dispatch(ctx: &ZeusContext, request: ApiRequest) -> Result<(Value, Option<String>)> {
    let reply = match request {
        ApiRequest::Register(profile) => {
            let user = ctx.account_service.register(profile)?;
            (to_value(&user)?, Some("Registration successful".to_string()))
        }
        ApiRequest::Login { username, password } => {
            (to_value(&ctx.account_service.login(&username, &password)?)?, None)
        }
        ApiRequest::GetUser { user_id } => (to_value(&ctx.account_service.get_user(&user_id)?)?, None),
        ApiRequest::ListUsers { status } => {
            (to_value(&ctx.account_service.list_users(status)?)?, None)
        }
        ApiRequest::UpdateUser {
            user_id,
            full_name,
            email,
            phone,
            status,
            balance,
        } => {
            let update = UserUpdate {
                full_name,
                email,
                phone,
                status,
                balance,
            };
            let user = ctx.account_service.update_user(&user_id, update)?;
            (to_value(&user)?, Some("User updated successfully".to_string()))
        }
        ApiRequest::DeleteUser { user_id } => {
            let user = ctx.account_service.delete_user(&user_id)?;
            (to_value(&user)?, Some("User deleted successfully".to_string()))
        }
        ApiRequest::UpdateProfile {
            user_id,
            full_name,
            email,
            phone,
            username,
            current_password,
            new_password,
        } => {
            let update = ProfileUpdate {
                full_name,
                email,
                phone,
                username,
                current_password,
                new_password,
            };
            let user = ctx.account_service.update_profile(&user_id, update)?;
            (to_value(&user)?, Some("Profile updated successfully".to_string()))
        }
        ApiRequest::Transfer {
            from_account,
            to_account,
            amount,
            memo,
            tx_type,
        } => {
            let outcome = ctx.ledger_service.transfer(TransferRequest {
                from_account,
                to_account,
                amount,
                memo,
                tx_type,
            })?;
            let message = outcome.message.clone();
            (to_value(&outcome)?, Some(message))
        }
        ApiRequest::Fund {
            account_number,
            amount,
            description,
        } => {
            let tx = ctx
                .ledger_service
                .fund_account(&account_number, amount, description.as_deref())?;
            (to_value(&tx)?, Some("Account funded successfully".to_string()))
        }
        ApiRequest::EditTransaction { id, amount, status } => {
            let tx = ctx
                .ledger_service
                .edit_transaction(&id, TransactionEdit { amount, status })?;
            (to_value(&tx)?, Some("Transaction updated successfully".to_string()))
        }
        ApiRequest::DeleteTransaction { id } => {
            let tx = ctx.ledger_service.delete_transaction(&id)?;
            (to_value(&tx)?, Some("Transaction deleted successfully".to_string()))
        }
        ApiRequest::GetTransaction { id } => {
            (to_value(&ctx.ledger_service.get_transaction(&id)?)?, None)
        }
        ApiRequest::ListTransactions {
            user_id,
            account_number,
            tx_type,
            status,
        } => {
            let filter = TransactionFilter {
                user_id,
                account_number,
                tx_type,
                status,
            };
            (to_value(&ctx.ledger_service.list_transactions(&filter)?)?, None)
        }
        ApiRequest::UpdateSettings(patch) => {
            let settings = ctx.settings_service.update(patch)?;
            (to_value(&settings)?, Some("Settings updated successfully".to_string()))
        }
        ApiRequest::GetSettings => (to_value(&ctx.settings_service.get()?)?, None),
        ApiRequest::FundingHistory => (to_value(&ctx.ledger_service.funding_history()?)?, None),
        ApiRequest::Status => (to_value(&ctx.status_service.get_status()?)?, None),
        ApiRequest::Doctor => (to_value(&ctx.doctor_service.run_checks()?)?, None),
    };
    Ok(reply)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Option<Decimal>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(Some(Decimal::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        Ok(Some(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        // Display of f64 is the shortest round-trip form, never exponential
        parse_amount(&v.to_string()).map(Some)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        if v.trim().is_empty() {
            return Ok(None);
        }
        parse_amount(v).map(Some)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Self::Value, D::Error> {
        d.deserialize_any(AmountVisitor)
    }
}

fn parse_amount<E: de::Error>(raw: &str) -> std::result::Result<Decimal, E> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| E::custom(format!("invalid amount '{}'", raw)))
}

fn optional_amount<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Decimal>, D::Error> {
    d.deserialize_any(AmountVisitor)
}

fn required_amount<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Decimal, D::Error> {
    d.deserialize_any(AmountVisitor)?
        .ok_or_else(|| de::Error::custom("amount is required"))
}
