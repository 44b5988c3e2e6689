//! Role-scoped account screens.
//!
//! Every screen is rendered with the view's role (`/accounts/views/{role}`),
//! not the caller's: an admin opening the support view sees exactly the
//! support columns. The client view only ever shows the calling client's
//! own accounts.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use adportal_accounts::{
    batch_setup, parse_submission, render_detail, render_history, render_table, suspended_on, validate_batch,
    validate_create, validate_edit, AccessMode, Account, AccountCommand, AccountFilter, AccountStatus,
    CreateAccount, DeleteAccount, UpdateAccount,
};
use adportal_auth::{Role, Screen};
use adportal_core::{AccountId, UserId};
use adportal_infra::EntityStore;

use crate::app::dto::{AccountListQuery, BatchUploadRequest};
use crate::app::errors::{self, json_error};
use crate::app::routes::common::{created, form_object, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/views", get(own_view))
        .route("/views/:role", get(list_accounts).post(create_account))
        .route(
            "/views/:role/:id",
            get(get_account).patch(edit_account).delete(delete_account),
        )
        .route("/views/:role/:id/list", axum::routing::patch(list_edit_account))
        .route("/views/:role/:id/history", get(account_history))
        .route("/batch/:role", get(batch_setup_screen).post(batch_upload))
        .route("/lookup/:adwords_id", get(lookup_account))
}

/// Views that may create and delete accounts.
const MANAGING_VIEWS: [Role; 1] = [Role::Admin];
/// Views that offer the batch uploader.
const BATCH_VIEWS: [Role; 2] = [Role::Admin, Role::Technician];

/// Resolve the `{role}` path segment and check the caller may open it.
fn open_view(principal: &PrincipalContext, raw: &str) -> Result<Role, Response> {
    let view: Role = raw.parse().map_err(|_| errors::not_found())?;
    guard_screen(principal, Screen::AccountView(view))?;
    Ok(view)
}

/// Clients only ever see their own accounts.
fn scope(principal: &PrincipalContext) -> Option<UserId> {
    (principal.role() == Role::Client).then(|| principal.user_id())
}

/// A live account visible to the caller, `404` otherwise.
fn visible_account(services: &AppServices, principal: &PrincipalContext, raw_id: &str) -> Result<Account, Response> {
    let id: AccountId = parse_id(raw_id)?;
    services
        .directory
        .get(id)
        .filter(|a| scope(principal).is_none_or(|client| a.fields().client_id == Some(client)))
        .ok_or_else(errors::not_found)
}

fn method_not_allowed(view: Role, action: &str) -> Response {
    json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        "not_allowed",
        format!("the {view} view cannot {action} accounts"),
    )
}

/// GET /accounts/views: send the caller to their own view.
pub async fn own_view(Extension(principal): Extension<PrincipalContext>) -> Response {
    Redirect::temporary(&format!("/accounts/views/{}", principal.role())).into_response()
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(view): Path<String>,
    Query(query): Query<AccountListQuery>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<AccountStatus>)
        .transpose()
    {
        Ok(s) => s,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string()),
    };

    let filter = AccountFilter {
        status,
        q: query.q,
        client: scope(&principal),
    };
    let accounts: Vec<Account> = services
        .directory
        .list()
        .into_iter()
        .filter(|a| filter.matches(a))
        .collect();
    ok(render_table(view, &accounts, &*services))
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((view, id)): Path<(String, String)>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match visible_account(&services, &principal, &id) {
        Ok(account) => ok(render_detail(view, &account, &*services)),
        Err(resp) => resp,
    }
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(view): Path<String>,
    Json(body): Json<JsonValue>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !MANAGING_VIEWS.contains(&view) {
        return method_not_allowed(view, "create");
    }
    let form = match form_object(body) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let values = match parse_submission(view, AccessMode::Edit, &form) {
        Ok(v) => v,
        Err(e) => return errors::form_error_to_response(e),
    };
    if let Err(e) = validate_create(view, &values, &*services) {
        return errors::form_error_to_response(e);
    }

    let account_id = services.directory.next_id();
    let command = AccountCommand::Create(CreateAccount {
        account_id,
        values,
        actor: Some(principal.user_id()),
        occurred_at: Utc::now(),
    });
    if let Err(e) = services.dispatch_account(command).await {
        return errors::dispatch_error_to_response(e);
    }
    tracing::info!(account_id = %account_id, user_id = %principal.user_id(), "account created");

    match services.directory.get(account_id) {
        Some(account) => created(render_detail(view, &account, &*services)),
        None => created(json!({ "id": account_id })),
    }
}

pub async fn edit_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((view, id)): Path<(String, String)>,
    Json(body): Json<JsonValue>,
) -> Response {
    edit(services, principal, view, id, AccessMode::Edit, body).await
}

pub async fn list_edit_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((view, id)): Path<(String, String)>,
    Json(body): Json<JsonValue>,
) -> Response {
    edit(services, principal, view, id, AccessMode::ListEdit, body).await
}

async fn edit(
    services: Arc<AppServices>,
    principal: PrincipalContext,
    view: String,
    id: String,
    mode: AccessMode,
    body: JsonValue,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let account = match visible_account(&services, &principal, &id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let form = match form_object(body) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let values = match parse_submission(view, mode, &form) {
        Ok(v) => v,
        Err(e) => return errors::form_error_to_response(e),
    };
    if let Err(e) = validate_edit(view, &account, &values, &*services) {
        return errors::form_error_to_response(e);
    }

    let account_id = account.id_typed();
    let command = AccountCommand::Update(UpdateAccount {
        account_id,
        values,
        actor: Some(principal.user_id()),
        occurred_at: Utc::now(),
    });
    match services.dispatch_account(command).await {
        Ok(committed) => {
            tracing::info!(account_id = %account_id, user_id = %principal.user_id(), changed = !committed.is_empty(), "account edited");
        }
        Err(e) => return errors::dispatch_error_to_response(e),
    }

    match services.directory.get(account_id) {
        Some(account) => ok(render_detail(view, &account, &*services)),
        None => errors::not_found(),
    }
}

pub async fn delete_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((view, id)): Path<(String, String)>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !MANAGING_VIEWS.contains(&view) {
        return method_not_allowed(view, "delete");
    }
    let account = match visible_account(&services, &principal, &id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let command = AccountCommand::Delete(DeleteAccount {
        account_id: account.id_typed(),
        actor: Some(principal.user_id()),
        occurred_at: Utc::now(),
    });
    match services.dispatch_account(command).await {
        Ok(_) => {
            tracing::info!(account_id = %account.id_typed(), user_id = %principal.user_id(), "account deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn account_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((view, id)): Path<(String, String)>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let account = match visible_account(&services, &principal, &id) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let events = services.directory.history(account.id_typed());
    let accesses = services.accesses_of(account.id_typed());
    let entries = render_history(&events, &accesses, view, |user| services.user_display(user));
    ok(json!({
        "items": entries,
        "suspended_on": suspended_on(&events),
    }))
}

pub async fn batch_setup_screen(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(view): Path<String>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !BATCH_VIEWS.contains(&view) {
        return method_not_allowed(view, "batch upload");
    }

    let clients: Vec<JsonValue> = services
        .users
        .filter(|u| u.has_role(Role::Client))
        .iter()
        .map(|u| json!({ "id": u.id, "name": u.display_name() }))
        .collect();
    let vendors: Vec<JsonValue> = services
        .vendors
        .list()
        .iter()
        .map(|v| json!({ "id": v.id, "name": v.display_name() }))
        .collect();
    let hosts: Vec<JsonValue> = services
        .hosts
        .filter(|h| !h.is_deleted)
        .iter()
        .map(|h| json!({ "id": h.id, "name": h.name }))
        .collect();

    ok(json!({
        "setup": batch_setup(view),
        "clients": clients,
        "vendors": vendors,
        "vps": hosts,
    }))
}

pub async fn batch_upload(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(view): Path<String>,
    Json(body): Json<BatchUploadRequest>,
) -> Response {
    let view = match open_view(&principal, &view) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !BATCH_VIEWS.contains(&view) {
        return method_not_allowed(view, "batch upload");
    }

    let accepted = match validate_batch(view, &body.rows, &*services) {
        Ok(rows) => rows,
        Err(errors) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "errors": errors })),
            )
                .into_response();
        }
    };

    let mut count = 0usize;
    for values in accepted {
        let command = AccountCommand::Create(CreateAccount {
            account_id: services.directory.next_id(),
            values,
            actor: Some(principal.user_id()),
            occurred_at: Utc::now(),
        });
        if let Err(e) = services.dispatch_account(command).await {
            tracing::warn!(created = count, error = %e, "batch upload stopped");
            return errors::dispatch_error_to_response(e);
        }
        count += 1;
    }
    tracing::info!(created = count, user_id = %principal.user_id(), "batch upload applied");
    created(json!({ "success": true, "created": count }))
}

/// GET /accounts/lookup/{adwords_id}
pub async fn lookup_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(adwords_id): Path<String>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::AccountLookup) {
        return resp;
    }
    match services.directory.find_by_adwords_id(adwords_id.trim()) {
        Some(account) => ok(json!({ "id": account.id_typed(), "adwords_id": account.adwords_id() })),
        None => errors::not_found(),
    }
}

/// Widgets and other screens share this to list what the caller may see.
pub fn visible_accounts(services: &AppServices, principal: &PrincipalContext) -> Vec<Account> {
    let client = scope(principal);
    services
        .directory
        .list()
        .into_iter()
        .filter(|a| client.is_none_or(|c| a.fields().client_id == Some(c)))
        .collect()
}

