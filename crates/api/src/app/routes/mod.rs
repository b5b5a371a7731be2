use axum::Router;

pub mod account;
pub mod common;
pub mod system;
pub mod transaction;

/// Router for every `/public` endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/public/account", account::router())
        .nest("/public/transaction", transaction::router())
}
