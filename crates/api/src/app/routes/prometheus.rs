//! Monitoring export scraped by Prometheus.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use adportal_accounts::{monitoring_entry, MonitoringEntry};

use crate::app::errors::json_error;
use crate::app::routes::common::ok;
use crate::app::services::AppServices;
use crate::middleware::extract_basic;

pub fn router() -> Router {
    Router::new().route("/account/list", get(account_list))
}

fn authenticated(services: &AppServices, headers: &HeaderMap) -> bool {
    let Some(credentials) = extract_basic(headers) else {
        return false;
    };
    if credentials.username != services.config.prometheus_login {
        return false;
    }
    services
        .find_user(&credentials.username)
        .is_some_and(|user| user.check_password(&credentials.password))
}

/// `adwords_id → entry` for every exported account.
pub async fn account_list(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    if !authenticated(&services, &headers) {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid monitoring credentials");
    }
    let threshold = services.config.whalesmedia_user_id;
    let snapshot: BTreeMap<String, MonitoringEntry> = services
        .directory
        .list()
        .iter()
        .filter(|a| a.fields().client_id.is_some_and(|client| client >= threshold))
        .map(|a| (a.fields().adwords_id.clone(), monitoring_entry(a, &*services)))
        .collect();
    tracing::debug!(accounts = snapshot.len(), "monitoring snapshot served");
    ok(snapshot)
}
