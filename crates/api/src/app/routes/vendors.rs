use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use adportal_auth::Screen;
use adportal_core::{DomainError, DomainResult, FieldErrors, VendorId};
use adportal_infra::EntityStore;
use adportal_vendors::{Vendor, VendorDraft, VendorTotals};

use crate::app::dto::VendorView;
use crate::app::errors;
use crate::app::routes::common::{created, items, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_vendors).post(create_vendor))
        .route("/:id", get(get_vendor).patch(update_vendor).delete(delete_vendor))
}

pub fn vendor_view(services: &AppServices, vendor: Vendor) -> VendorView {
    let accounts = services.accounts_of_vendor(vendor.id);
    let totals = VendorTotals::tally(
        &vendor,
        accounts
            .iter()
            .map(|a| (a.status().is_activated(), a.budget().spent_in_hkd())),
    );
    VendorView {
        display_name: vendor.display_name(),
        vendor,
        totals,
    }
}

/// Draft checks plus the uniqueness and reference checks that need the store.
fn check_draft(services: &AppServices, draft: &VendorDraft, except: Option<VendorId>) -> DomainResult<()> {
    draft.validate()?;
    let mut errors = FieldErrors::new();
    let others = services.vendors.filter(|v| Some(v.id) != except);
    if others.iter().any(|v| v.nickname == draft.nickname.trim()) {
        errors.add("nickname", "Already exists.");
    }
    if let Some(profile) = draft.payments_profile_id.as_deref().filter(|p| !p.is_empty()) {
        if others.iter().any(|v| v.payments_profile_id.as_deref() == Some(profile)) {
            errors.add("payments_profile_id", "Already exists.");
        }
    }
    if let Some(bank) = draft.bank_account_id {
        if services.bank_accounts.get(bank).is_none() {
            errors.add("bank_account_id", "Not a valid choice.");
        }
    }
    errors.into_result()
}

pub async fn list_vendors(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Vendors) {
        return resp;
    }
    items(
        services
            .vendors
            .list()
            .into_iter()
            .map(|v| vendor_view(&services, v))
            .collect(),
    )
}

pub async fn get_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Vendors) {
        return resp;
    }
    let id: VendorId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.vendors.get(id) {
        Some(vendor) => ok(vendor_view(&services, vendor)),
        None => errors::not_found(),
    }
}

pub async fn create_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<VendorDraft>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Vendors) {
        return resp;
    }
    if let Err(e) = check_draft(&services, &draft, None) {
        return errors::domain_error_to_response(e);
    }
    let vendor = Vendor::create(services.vendors.next_id(), draft, Utc::now());
    tracing::info!(vendor_id = %vendor.id, nickname = %vendor.nickname, "vendor created");
    services.vendors.upsert(vendor.clone());
    created(vendor_view(&services, vendor))
}

pub async fn update_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(draft): Json<VendorDraft>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Vendors) {
        return resp;
    }
    let id: VendorId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut vendor) = services.vendors.get(id) else {
        return errors::not_found();
    };
    if let Err(e) = check_draft(&services, &draft, Some(id)) {
        return errors::domain_error_to_response(e);
    }
    vendor.update(draft, Utc::now());
    services.vendors.upsert(vendor.clone());
    ok(vendor_view(&services, vendor))
}

/// Vendors still referenced by accounts cannot be removed.
pub async fn delete_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Vendors) {
        return resp;
    }
    let id: VendorId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.vendors.get(id).is_none() {
        return errors::not_found();
    }
    let in_use = services.accounts_of_vendor(id).len();
    if in_use > 0 {
        return errors::domain_error_to_response(DomainError::conflict(format!(
            "vendor is used by {in_use} account(s)"
        )));
    }
    for grant in services.permissions.filter(|p| p.vendor_id == id) {
        services.permissions.remove(grant.id);
    }
    services.vendors.remove(id);
    tracing::info!(vendor_id = %id, "vendor deleted");
    StatusCode::NO_CONTENT.into_response()
}
