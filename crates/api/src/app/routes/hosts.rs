use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use adportal_accounts::hosted_on;
use adportal_auth::Screen;
use adportal_core::{DomainResult, FieldErrors, VpsId};
use adportal_hosts::{Vps, VpsDraft};
use adportal_infra::EntityStore;

use crate::app::dto::VpsView;
use crate::app::errors;
use crate::app::routes::common::{created, items, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_hosts).post(create_host))
        .route("/:id", get(get_host).patch(update_host).delete(delete_host))
        .route("/:id/credentials", post(regenerate_credentials))
}

pub fn vps_view(services: &AppServices, vps: Vps) -> VpsView {
    let accounts = services.accounts_on_host(vps.id);
    let hosted = hosted_on(&accounts, vps.id);
    VpsView {
        account_count: hosted.len(),
        alive_count: Vps::alive_count(&hosted),
        alive_statuses: Vps::alive_statuses(&hosted),
        dead_statuses: Vps::dead_statuses(&hosted),
        vps,
    }
}

fn check_draft(services: &AppServices, draft: &VpsDraft, except: Option<VpsId>) -> DomainResult<()> {
    draft.validate()?;
    let mut errors = FieldErrors::new();
    let name = draft.name.trim();
    if !services.hosts.filter(|h| Some(h.id) != except && h.name == name).is_empty() {
        errors.add("name", "Already exists.");
    }
    errors.into_result()
}

fn parse(principal: &PrincipalContext, raw: &str) -> Result<VpsId, Response> {
    guard_screen(principal, Screen::Hosts)?;
    parse_id(raw)
}

pub async fn list_hosts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Hosts) {
        return resp;
    }
    items(services.hosts.list().into_iter().map(|h| vps_view(&services, h)).collect())
}

pub async fn get_host(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.hosts.get(id) {
        Some(h) => ok(vps_view(&services, h)),
        None => errors::not_found(),
    }
}

pub async fn create_host(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<VpsDraft>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Hosts) {
        return resp;
    }
    if let Err(e) = check_draft(&services, &draft, None) {
        return errors::domain_error_to_response(e);
    }
    let vps = Vps::create(services.hosts.next_id(), draft, Utc::now());
    tracing::info!(vps_id = %vps.id, name = %vps.name, "vps created");
    services.hosts.upsert(vps.clone());
    created(vps_view(&services, vps))
}

pub async fn update_host(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(draft): Json<VpsDraft>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut vps) = services.hosts.get(id) else {
        return errors::not_found();
    };
    if let Err(e) = check_draft(&services, &draft, Some(id)) {
        return errors::domain_error_to_response(e);
    }
    vps.update(draft, Utc::now());
    services.hosts.upsert(vps.clone());
    ok(vps_view(&services, vps))
}

/// Hosts are soft-deleted: accounts keep pointing at them.
pub async fn delete_host(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut vps) = services.hosts.get(id) else {
        return errors::not_found();
    };
    vps.is_deleted = true;
    vps.updated_at = Utc::now();
    services.hosts.upsert(vps);
    tracing::info!(vps_id = %id, "vps marked deleted");
    StatusCode::NO_CONTENT.into_response()
}

pub async fn regenerate_credentials(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut vps) = services.hosts.get(id) else {
        return errors::not_found();
    };
    vps.regenerate_credentials(Utc::now());
    services.hosts.upsert(vps.clone());
    tracing::info!(vps_id = %id, "vps credentials regenerated");
    ok(vps_view(&services, vps))
}
