//! Client access grants, edited one by one or as a whole per vendor / per user.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use adportal_auth::{Role, Screen};
use adportal_core::{FieldErrors, UserId, VendorId};
use adportal_infra::EntityStore;
use adportal_vendors::{clients_allowed, plan_batch, BatchPlan, Permission, PermissionDraft};

use crate::app::dto::{PermissionBatchRequest, PermissionListQuery};
use crate::app::errors;
use crate::app::routes::common::{created, items, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_permissions).post(create_permission))
        .route("/:id", patch(update_notes).delete(delete_permission))
        .route("/by-vendor/:vendor_id", get(vendor_grants).put(batch_by_vendor))
        .route("/by-user/:user_id", get(user_grants).put(batch_by_user))
}

#[derive(Debug, Deserialize)]
pub struct NotesUpdate {
    #[serde(default)]
    pub notes: Option<String>,
}

fn check_pair(services: &AppServices, vendor: VendorId, user: UserId, errors: &mut FieldErrors) {
    if services.vendors.get(vendor).is_none() {
        errors.add("vendor_id", format!("Vendor(id={vendor}) does not exist."));
    }
    if !services.users.get(user).is_some_and(|u| u.has_role(Role::Client)) {
        errors.add("user_id", format!("User(id={user}) is not a client."));
    }
}

/// Apply a batch plan and report what changed.
fn apply(services: &AppServices, principal: &PrincipalContext, plan: BatchPlan) -> Response {
    let now = Utc::now();
    let (created_count, updated_count, deleted_count) =
        (plan.create.len(), plan.update_notes.len(), plan.delete.len());
    for draft in plan.create {
        let grant = Permission::create(services.permissions.next_id(), draft, Some(principal.user_id()), now);
        services.permissions.upsert(grant);
    }
    for (id, notes) in plan.update_notes {
        if let Some(mut grant) = services.permissions.get(id) {
            grant.notes = notes;
            grant.updated_at = now;
            services.permissions.upsert(grant);
        }
    }
    for id in plan.delete {
        services.permissions.remove(id);
    }
    tracing::info!(
        created = created_count,
        updated = updated_count,
        deleted = deleted_count,
        user_id = %principal.user_id(),
        "permission batch applied"
    );
    ok(json!({
        "created": created_count,
        "updated": updated_count,
        "deleted": deleted_count,
    }))
}

pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<PermissionListQuery>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    items(services.permissions.filter(|p| {
        query.vendor_id.is_none_or(|v| p.vendor_id.get() == v) && query.user_id.is_none_or(|u| p.user_id.get() == u)
    }))
}

pub async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<PermissionDraft>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let mut fields = FieldErrors::new();
    check_pair(&services, draft.vendor_id, draft.user_id, &mut fields);
    let key = (draft.vendor_id, draft.user_id);
    if !services.permissions.filter(|p| p.key() == key).is_empty() {
        fields.add("user_id", "Permission with this Vendor and User already exists.");
    }
    if !fields.is_empty() {
        return errors::field_errors(fields);
    }
    let grant = Permission::create(services.permissions.next_id(), draft, Some(principal.user_id()), Utc::now());
    tracing::info!(permission_id = %grant.id, vendor_id = %grant.vendor_id, user_id = %grant.user_id, "permission granted");
    services.permissions.upsert(grant.clone());
    created(grant)
}

pub async fn update_notes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<NotesUpdate>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut grant) = services.permissions.get(id) else {
        return errors::not_found();
    };
    grant.notes = body.notes.filter(|n| !n.trim().is_empty());
    grant.updated_at = Utc::now();
    services.permissions.upsert(grant.clone());
    ok(grant)
}

pub async fn delete_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.permissions.remove(id) {
        Some(grant) => {
            tracing::info!(permission_id = %id, vendor_id = %grant.vendor_id, user_id = %grant.user_id, "permission revoked");
            StatusCode::NO_CONTENT.into_response()
        }
        None => errors::not_found(),
    }
}

/// Grants of one vendor plus the `clients_allowed` summary accounts show.
pub async fn vendor_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(vendor_id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let vendor_id: VendorId = match parse_id(&vendor_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.vendors.get(vendor_id).is_none() {
        return errors::not_found();
    }
    let grants = services.permissions.filter(|p| p.vendor_id == vendor_id);
    ok(json!({
        "vendor_id": vendor_id,
        "clients_allowed": clients_allowed(Some(vendor_id), &grants),
        "items": grants,
    }))
}

pub async fn user_grants(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let user_id: UserId = match parse_id(&user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.users.get(user_id).is_none() {
        return errors::not_found();
    }
    items(services.permissions.filter(|p| p.user_id == user_id))
}

/// PUT /permissions/by-vendor/{id}: the checked users become the vendor's
/// complete grant list.
pub async fn batch_by_vendor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(vendor_id): Path<String>,
    Json(body): Json<PermissionBatchRequest>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let vendor_id: VendorId = match parse_id(&vendor_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.vendors.get(vendor_id).is_none() {
        return errors::not_found();
    }

    let mut fields = FieldErrors::new();
    let mut checked = BTreeMap::new();
    for grant in body.checked {
        let user_id = UserId::new(grant.id);
        check_pair(&services, vendor_id, user_id, &mut fields);
        checked.insert((vendor_id, user_id), grant.notes);
    }
    if !fields.is_empty() {
        return errors::field_errors(fields);
    }

    let existing = services.permissions.filter(|p| p.vendor_id == vendor_id);
    apply(&services, &principal, plan_batch(&existing, &checked))
}

/// PUT /permissions/by-user/{id}: the checked vendors become the user's
/// complete grant list.
pub async fn batch_by_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
    Json(body): Json<PermissionBatchRequest>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Permissions) {
        return resp;
    }
    let user_id: UserId = match parse_id(&user_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.users.get(user_id).is_none() {
        return errors::not_found();
    }

    let mut fields = FieldErrors::new();
    let mut checked = BTreeMap::new();
    for grant in body.checked {
        let vendor_id = VendorId::new(grant.id);
        check_pair(&services, vendor_id, user_id, &mut fields);
        checked.insert((vendor_id, user_id), grant.notes);
    }
    if !fields.is_empty() {
        return errors::field_errors(fields);
    }

    let existing = services.permissions.filter(|p| p.user_id == user_id);
    apply(&services, &principal, plan_batch(&existing, &checked))
}
