use axum::{routing::get, Router};

pub mod accesses;
pub mod accounts;
pub mod bank_accounts;
pub mod common;
pub mod eve;
pub mod hosts;
pub mod permissions;
pub mod prometheus;
pub mod session;
pub mod system;
pub mod transfers;
pub mod users;
pub mod vendors;
pub mod widgets;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .route("/me/budget", get(system::my_budget))
        .route("/screens", get(system::screens))
        .nest("/accounts", accounts::router())
        .nest("/vendors", vendors::router())
        .nest("/permissions", permissions::router())
        .nest("/bank_accounts", bank_accounts::router())
        .nest("/transfers", transfers::router())
        .nest("/vps", hosts::router())
        .nest("/users", users::router())
        .nest("/accesses", accesses::router())
        .nest("/widgets", widgets::router())
}
