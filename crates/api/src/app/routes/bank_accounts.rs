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
use adportal_core::{BankAccountId, DomainError};
use adportal_infra::EntityStore;
use adportal_vendors::{AccountFigures, BankAccount, BankAccountDraft, BankAccountTotals};

use crate::app::dto::BankAccountView;
use crate::app::errors;
use crate::app::routes::common::{created, items, ok, parse_id};
use crate::app::services::AppServices;
use crate::authz::guard_screen;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_bank_accounts).post(create_bank_account))
        .route(
            "/:id",
            get(get_bank_account).patch(update_bank_account).delete(delete_bank_account),
        )
}

pub fn bank_account_view(services: &AppServices, bank_account: BankAccount) -> BankAccountView {
    let transfers = services
        .transfers
        .filter(|t| t.bank_account_id == Some(bank_account.id));
    let figures: Vec<AccountFigures> = services
        .vendors
        .filter(|v| v.bank_account_id == Some(bank_account.id))
        .into_iter()
        .flat_map(|v| services.accounts_of_vendor(v.id))
        .map(|a| AccountFigures {
            spent_in_hkd: a.budget().spent_in_hkd(),
            remaining_in_hkd: a.budget().remaining_in_hkd(),
        })
        .collect();
    BankAccountView {
        totals: BankAccountTotals::compute(&transfers, figures),
        bank_account,
    }
}

fn parse(principal: &PrincipalContext, raw: &str) -> Result<BankAccountId, Response> {
    guard_screen(principal, Screen::BankAccounts)?;
    parse_id(raw)
}

pub async fn list_bank_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::BankAccounts) {
        return resp;
    }
    items(
        services
            .bank_accounts
            .list()
            .into_iter()
            .map(|b| bank_account_view(&services, b))
            .collect(),
    )
}

pub async fn get_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.bank_accounts.get(id) {
        Some(b) => ok(bank_account_view(&services, b)),
        None => errors::not_found(),
    }
}

pub async fn create_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(draft): Json<BankAccountDraft>,
) -> Response {
    if let Err(resp) = guard_screen(&principal, Screen::BankAccounts) {
        return resp;
    }
    if let Err(e) = draft.validate() {
        return errors::domain_error_to_response(e);
    }
    let bank_account = BankAccount::create(services.bank_accounts.next_id(), draft, Utc::now());
    tracing::info!(bank_account_id = %bank_account.id, "bank account created");
    services.bank_accounts.upsert(bank_account.clone());
    created(bank_account_view(&services, bank_account))
}

pub async fn update_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(draft): Json<BankAccountDraft>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(mut bank_account) = services.bank_accounts.get(id) else {
        return errors::not_found();
    };
    if let Err(e) = draft.validate() {
        return errors::domain_error_to_response(e);
    }
    bank_account.update(draft, Utc::now());
    services.bank_accounts.upsert(bank_account.clone());
    ok(bank_account_view(&services, bank_account))
}

pub async fn delete_bank_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse(&principal, &id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if services.bank_accounts.get(id).is_none() {
        return errors::not_found();
    }
    let vendors = services.vendors.filter(|v| v.bank_account_id == Some(id)).len();
    let transfers = services.transfers.filter(|t| t.bank_account_id == Some(id)).len();
    if vendors + transfers > 0 {
        return errors::domain_error_to_response(DomainError::conflict(format!(
            "bank account is used by {vendors} vendor(s) and {transfers} transfer(s)"
        )));
    }
    services.bank_accounts.remove(id);
    tracing::info!(bank_account_id = %id, "bank account deleted");
    StatusCode::NO_CONTENT.into_response()
}
