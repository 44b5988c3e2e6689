use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::Response};

use adportal_auth::Screen;
use adportal_infra::EntityStore;

use crate::app::errors;
use crate::app::routes::common::ok;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.users.get(principal.user_id()) {
        Some(user) => ok(serde_json::json!({
            "user_id": principal.user_id(),
            "role": principal.role(),
            "user": user.view(),
        })),
        None => errors::not_found(),
    }
}

/// The current user's budget sheet link.
pub async fn my_budget(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    let budget_url = services
        .users
        .get(principal.user_id())
        .and_then(|u| u.budget_url);
    ok(serde_json::json!({ "budget_url": budget_url }))
}

/// Screens the caller may open, for navigation.
pub async fn screens(Extension(principal): Extension<PrincipalContext>) -> Response {
    let screens: Vec<String> = Screen::accessible_to(principal.role())
        .into_iter()
        .map(Screen::name)
        .collect();
    ok(serde_json::json!({ "role": principal.role(), "screens": screens }))
}
