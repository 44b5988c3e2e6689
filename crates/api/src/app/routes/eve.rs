//! Endpoints for the budget ingestion job, authenticated with a VPS key pair.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use adportal_accounts::{parse_currency, parse_numeral, AccountCommand, NumeralError, RecordIngestion};
use adportal_core::AccountId;
use adportal_hosts::Vps;
use adportal_infra::EntityStore;

use crate::app::dto::{IngestionPayload, IngestionRecord};
use crate::app::errors::json_error;
use crate::app::routes::common::ok;
use crate::app::services::AppServices;
use crate::middleware::extract_basic;

pub const INGESTION_VERSION: &str = "0.3";
const UNLIMITED_SPENDING: &str = "Unlimited spending";

pub fn router() -> Router {
    Router::new()
        .route("/version", get(version))
        .route("/account/update", post(update_accounts))
}

pub async fn version() -> Json<&'static str> {
    Json(INGESTION_VERSION)
}

/// The live VPS whose key pair was presented, if any.
fn authenticate(services: &AppServices, headers: &HeaderMap) -> Option<Vps> {
    let credentials = extract_basic(headers)?;
    services
        .hosts
        .filter(|vps| !vps.is_deleted && vps.matches_credentials(&credentials.username, &credentials.password))
        .into_iter()
        .next()
}

fn no_data() -> Response {
    ok(json!({ "success": false, "message": "No data present." }))
}

/// One scraped row → the ingestion command for `account_id`.
fn ingestion_command(
    account_id: AccountId,
    record: IngestionRecord,
    now: DateTime<Utc>,
) -> Result<RecordIngestion, NumeralError> {
    Ok(RecordIngestion {
        account_id,
        nickname: record.nickname.filter(|n| !n.trim().is_empty()),
        currency: parse_currency(&record.daily_budget).trim().to_string(),
        account_budget: parse_numeral(&record.account_budget)?,
        remaining_account_budget: parse_numeral(&record.remaining_account_budget)?,
        daily_budget: parse_numeral(&record.daily_budget)?,
        is_unlimited: record.account_budget == UNLIMITED_SPENDING,
        occurred_at: now,
    })
}

pub async fn update_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(vps) = authenticate(&services, &headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid VPS credentials");
    };
    if body.is_empty() {
        return no_data();
    }
    let payload: IngestionPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(vps_id = %vps.id, error = %e, "unreadable ingestion payload");
            return no_data();
        }
    };
    if payload.response.is_empty() {
        return no_data();
    }

    let received = payload.response.len();
    let now = Utc::now();
    let mut updated = 0usize;
    for raw in payload.response {
        let record = match serde_json::from_value::<IngestionRecord>(raw.clone()) {
            Ok(record) => record,
            Err(e) => {
                let adwords_id = raw.get("adwords_id").and_then(|v| v.as_str()).unwrap_or("?");
                tracing::warn!(vps_id = %vps.id, adwords_id = %adwords_id, error = %e, "malformed ingestion record");
                continue;
            }
        };
        let Some(account) = services.directory.find_by_adwords_id(&record.adwords_id) else {
            tracing::warn!(vps_id = %vps.id, adwords_id = %record.adwords_id, "ingestion for unknown account");
            continue;
        };
        let adwords_id = record.adwords_id.clone();
        let command = match ingestion_command(account.id_typed(), record, now) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(adwords_id = %adwords_id, error = %e, "unparseable ingestion record");
                continue;
            }
        };
        match services.dispatch_account(AccountCommand::RecordIngestion(command)).await {
            Ok(_) => {
                updated += 1;
                tracing::debug!(account_id = %account.id_typed(), adwords_id = %adwords_id, "budgets ingested");
            }
            Err(e) => tracing::warn!(adwords_id = %adwords_id, error = %e, "ingestion dispatch failed"),
        }
    }
    tracing::info!(vps_id = %vps.id, received, updated, "ingestion batch processed");
    ok(json!({ "success": true, "updated_count": updated }))
}
