use axum::{Extension, Json, Router, extract::rejection::JsonRejection, routing::post};

use crate::app::dto;
use crate::app::routes::common::{body, respond};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/transfer", post(transfer))
        .route("/history", post(history))
        .route("/detail", post(detail))
}

pub async fn deposit(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::CashRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().deposit(body.into()).await;
    respond(result, "Deposit successful", dto::CashResponse::from)
}

pub async fn withdraw(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::CashRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().withdraw(body.into()).await;
    respond(result, "Withdraw successful", dto::CashResponse::from)
}

pub async fn transfer(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::TransferRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().transfer(body.into()).await;
    respond(result, "Transfer successful", dto::TransferResponse::from)
}

pub async fn history(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::HistoryRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let filtered = body
        .account_number
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty());
    let message = if filtered {
        "Transaction history retrieved successfully"
    } else {
        "All transactions retrieved successfully"
    };
    let result = services.ledger().history(body.into()).await;
    respond(result, message, dto::HistoryResponse::from)
}

pub async fn detail(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::TransactionDetailRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().transaction_detail(body.transaction_id).await;
    respond(
        result,
        "Transaction detail retrieved successfully",
        dto::TransactionResponse::from,
    )
}
