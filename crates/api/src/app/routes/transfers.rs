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
use adportal_core::{DomainResult, FieldErrors, TransferId};
use adportal_infra::EntityStore;
use adportal_vendors::{Transfer, TransferDraft};

use crate::app::dto::TransferView;
use crate::app::errors;
use crate::app::routes::common::{created, items, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route("/:id", get(get_transfer).patch(update_transfer).delete(delete_transfer))
}

pub fn transfer_view(services: &AppServices, transfer: Transfer) -> TransferView {
    let fees: Vec<Option<f64>> = match transfer.bank_account_id {
        Some(bank) => services
            .vendors
            .filter(|v| v.bank_account_id == Some(bank))
            .into_iter()
            .map(|v| v.service_fee)
            .collect(),
        None => vec![],
    };
    let suggested_net = transfer.suggested_net(fees);
    TransferView {
        net_in_hkd: transfer.net_in_hkd(),
        suggested_net_display: suggested_net.to_string(),
        suggested_net,
        transfer,
    }
}

fn check_draft(services: &AppServices, draft: &TransferDraft) -> DomainResult<()> {
    draft.validate()?;
    let mut errors = FieldErrors::new();
    if let Some(bank) = draft.bank_account_id {
        if services.bank_accounts.get(bank).is_none() {
            errors.add("bank_account_id", "Not a valid choice.");
        }
    }
    errors.into_result()
}

fn parse(principal: &PrincipalContext, raw: &str) -> Result<TransferId, Response> {
    guard_screen(principal, Screen::Transfers)?;
    parse_id(raw)
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Transfers) {
        return resp;
    }
    let mut transfers = services.transfers.list();
    transfers.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    items(transfers.into_iter().map(|t| transfer_view(&services, t)).collect())
}

pub async fn get_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.transfers.get(id) {
        Some(t) => ok(transfer_view(&services, t)),
        None => errors::not_found(),
    }
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<TransferDraft>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::Transfers) {
        return resp;
    }
    if let Err(e) = check_draft(&services, &draft) {
        return errors::domain_error_to_response(e);
    }
    let transfer = Transfer::create(services.transfers.next_id(), draft, Utc::now());
    tracing::info!(transfer_id = %transfer.id, gross = transfer.gross, "transfer recorded");
    services.transfers.upsert(transfer.clone());
    created(transfer_view(&services, transfer))
}

pub async fn update_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(draft): Json<TransferDraft>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut transfer) = services.transfers.get(id) else {
        return errors::not_found();
    };
    if let Err(e) = check_draft(&services, &draft) {
        return errors::domain_error_to_response(e);
    }
    transfer.update(draft, Utc::now());
    services.transfers.upsert(transfer.clone());
    ok(transfer_view(&services, transfer))
}

pub async fn delete_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.transfers.remove(id) {
        Some(_) => {
            tracing::info!(transfer_id = %id, "transfer deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        None => errors::not_found(),
    }
}
