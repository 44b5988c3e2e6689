use std::sync::Arc;

use axum::{extract::Extension, response::Response, routing::get, Json, Router};
use chrono::Utc;

use adportal_accounts::Access;
use adportal_auth::Screen;
use adportal_infra::EntityStore;

use crate::app::dto::RecordAccessRequest;
use crate::app::errors;
use crate::app::routes::accounts::visible_accounts;
use crate::app::routes::common::{created, items};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_accesses).post(record_access))
}

/// Any user may log that they opened an account they can see.
pub async fn record_access(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<RecordAccessRequest>,
) -> Response {
    let visible = visible_accounts(&services, &principal)
        .iter()
        .any(|a| a.id_typed() == body.account_id);
    if !visible {
        return errors::not_found();
    }
    let access = Access::new(
        services.accesses.next_id(),
        principal.user_id(),
        body.account_id,
        Utc::now(),
    );
    tracing::debug!(account_id = %body.account_id, user_id = %principal.user_id(), "access recorded");
    services.accesses.upsert(access.clone());
    created(access)
}

pub async fn list_accesses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::AccessLog) {
        return resp;
    }
    let mut accesses = services.accesses.list();
    accesses.reverse();
    items(accesses)
}
