//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{Account, AccountId, DomainError};
use crate::error::{AppError, AppResult};
use crate::ledger::Ledger;

use super::middleware::RequestContext;
use crate::store::LedgerStore;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub email: String,
    /// Initial balance as a decimal string; defaults to zero
    #[serde(default)]
    pub balance: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            balance: account.balance.value(),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountsListResponse {
    pub accounts: Vec<AccountResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub amount: String,
    /// Per-request deadline; the server default applies when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transfer_id: Uuid,
    pub from_id: AccountId,
    pub to_id: AccountId,
    pub amount: Decimal,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
    pub status: String,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: LedgerStore>() -> Router<Ledger<S>> {
    Router::new()
        .route("/accounts", post(create_account::<S>).get(list_accounts::<S>))
        .route("/accounts/:account_id", get(get_account::<S>))
        .route("/transfers", post(transfer::<S>))
}

/// Parse a decimal carried as a JSON string
fn parse_decimal(raw: &str, invalid: fn(String) -> DomainError) -> AppResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| AppError::from(invalid(format!("{raw:?}: {e}"))))
}

/// Unparseable JSON bodies get the same error envelope as everything else
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

// =========================================================================
// POST /accounts
// =========================================================================

/// Create a new account
async fn create_account<S: LedgerStore>(
    State(ledger): State<Ledger<S>>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AccountResponse>)> {
    let request = json_body(body)?;
    let balance = match request.balance.as_deref() {
        Some(raw) => parse_decimal(raw, DomainError::InvalidBalance)?,
        None => Decimal::ZERO,
    };

    let account = ledger
        .create_account(&request.name, &request.email, balance)
        .await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

// =========================================================================
// GET /accounts
// =========================================================================

/// List all accounts ordered by id
async fn list_accounts<S: LedgerStore>(
    State(ledger): State<Ledger<S>>,
) -> AppResult<Json<AccountsListResponse>> {
    let accounts: Vec<AccountResponse> = ledger
        .list_accounts()
        .map_ok(AccountResponse::from)
        .try_collect()
        .await?;

    Ok(Json(AccountsListResponse { accounts }))
}

// =========================================================================
// GET /accounts/:account_id
// =========================================================================

/// Get account by ID
async fn get_account<S: LedgerStore>(
    State(ledger): State<Ledger<S>>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<AccountResponse>> {
    let Path(account_id) =
        path.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    let account = ledger.get_account(AccountId::new(account_id)).await?;
    Ok(Json(account.into()))
}

// =========================================================================
// POST /transfers
// =========================================================================

/// Move funds between two accounts
async fn transfer<S: LedgerStore>(
    State(ledger): State<Ledger<S>>,
    context: Option<Extension<RequestContext>>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> AppResult<Json<TransferResponse>> {
    let request = json_body(body)?;
    let amount = parse_decimal(&request.amount, DomainError::InvalidAmount)?;

    let deadline = match request.timeout_ms {
        Some(0) => {
            return Err(AppError::InvalidRequest(
                "timeout_ms must be greater than zero".to_string(),
            ))
        }
        Some(ms) => Some(Duration::from_millis(ms)),
        None => None,
    };

    let receipt = ledger
        .transfer(request.from_id, request.to_id, amount, deadline)
        .await?;

    if let Some(Extension(context)) = context {
        tracing::info!(
            correlation_id = %context.correlation_id,
            transfer_id = %receipt.transfer_id,
            "transfer served"
        );
    }

    Ok(Json(TransferResponse {
        transfer_id: receipt.transfer_id,
        from_id: receipt.from_id,
        to_id: receipt.to_id,
        amount: receipt.amount,
        from_balance: receipt.from_balance,
        to_balance: receipt.to_balance,
        status: "completed".to_string(),
    }))
}
