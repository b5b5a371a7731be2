use axum::{Extension, Json, Router, extract::rejection::JsonRejection, routing::post};

use crate::app::dto;
use crate::app::routes::common::{body, respond};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/create", post(create_account))
        .route("/list", post(list_accounts))
        .route("/get", post(get_account))
        .route("/update", post(update_account))
        .route("/delete", post(delete_account))
        .route("/balance", post(check_balance))
        .route("/change-pin", post(change_pin))
        .route("/forgot-pin", post(forgot_pin))
        .route("/reset-pin", post(reset_pin))
}

pub async fn create_account(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::CreateAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().create_account(body.into()).await;
    respond(result, "Account created successfully", dto::AccountResponse::from)
}

pub async fn list_accounts(Extension(services): Extension<AppServices>) -> axum::response::Response {
    let result = services.ledger().list_accounts().await;
    let message = match &result {
        Ok(accounts) if accounts.is_empty() => "No accounts found",
        _ => "Accounts retrieved successfully",
    };
    respond(result, message, |accounts| {
        accounts
            .into_iter()
            .map(dto::AccountResponse::from)
            .collect::<Vec<_>>()
    })
}

pub async fn get_account(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::AccountIdRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().get_account(body.id).await;
    respond(result, "Account retrieved successfully", dto::AccountDetailResponse::from)
}

pub async fn update_account(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::UpdateAccountRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().rename_account(body.into()).await;
    respond(result, "Account updated successfully", dto::AccountDetailResponse::from)
}

pub async fn delete_account(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::AccountIdRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().delete_account(body.id).await;
    respond(result, "Account deleted successfully", |account| {
        dto::DeletedAccountResponse {
            deleted_account_id: account.id,
            account_number: account.account_number,
            account_name: account.account_name,
        }
    })
}

pub async fn check_balance(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::CheckBalanceRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().check_balance(body.into()).await;
    respond(result, "Balance retrieved successfully", dto::BalanceResponse::from)
}

pub async fn change_pin(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::ChangePinRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().change_pin(body.into()).await;
    respond(result, "PIN changed successfully", dto::PinChangedResponse::from)
}

pub async fn forgot_pin(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::ForgotPinRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().forgot_pin(&body.account_number).await;
    respond(
        result,
        "Reset token generated successfully. Please use this token within 5 minutes",
        dto::ForgotPinResponse::from,
    )
}

pub async fn reset_pin(
    Extension(services): Extension<AppServices>,
    payload: Result<Json<dto::ResetPinRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match body(payload) {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };
    let result = services.ledger().reset_pin(body.into()).await;
    respond(result, "PIN reset successfully", dto::PinResetResponse::from)
}
