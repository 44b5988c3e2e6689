//! Dashboard widgets. Each returns plain JSON for the front end to lay out.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::Extension, response::Response, routing::get, Router};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;

use adportal_accounts::{
    active_accounts, attention, expiring, format_hk, high_spend, not_updated, recent_status_changes, releasable_hosts,
    render_history, total_spend, vendor_logins, vendor_statistics, vendor_usage, HistoryEntry, StatusChange,
    TOTAL_SPEND_DAYS,
};
use adportal_auth::Role;
use adportal_core::{AccountId, UserId};
use adportal_infra::EntityStore;

use crate::app::dto::{summaries, AccountSummary};
use crate::app::routes::accounts::visible_accounts;
use crate::app::routes::common::{items, ok};
use crate::app::routes::hosts::vps_view;
use crate::app::services::AppServices;
use crate::authz::guard_roles;
use crate::context::PrincipalContext;

const STATUS_CHANGE_DAYS: i64 = 7;
const RECENT_HISTORY_DAYS: i64 = 1;

pub fn router() -> Router {
    Router::new()
        .route("/expiring", get(expiring_accounts))
        .route("/attention", get(attention_accounts))
        .route("/not-updated", get(not_updated_accounts))
        .route("/high-spend", get(high_spend_accounts))
        .route("/recent-status-changes", get(status_changes))
        .route("/recent-history", get(recent_history))
        .route("/vendor-statistics", get(vendor_stats))
        .route("/releasable-vps", get(releasable_vps))
        .route("/total-spend", get(total_spend_by_client))
        .route("/active-accounts", get(active_accounts_by_client))
        .route("/vendor-users", get(vendor_users))
        .route("/vendor-mcc", get(vendor_mcc))
}

#[derive(Debug, Serialize)]
struct ClientColumn {
    id: UserId,
    name: String,
}

/// Client users ordered by id.
fn client_columns(services: &AppServices) -> Vec<ClientColumn> {
    let mut clients: Vec<ClientColumn> = services
        .users
        .list()
        .into_iter()
        .filter(|u| u.has_role(Role::Client))
        .map(|u| ClientColumn {
            id: u.id,
            name: u.display_name().to_string(),
        })
        .collect();
    clients.sort_by_key(|c| c.id);
    clients
}

#[derive(Debug, Serialize)]
struct AccountStatusChanges {
    account: AccountSummary,
    changes: Vec<StatusChange>,
}

#[derive(Debug, Serialize)]
struct AccountHistoryEntry {
    account_id: AccountId,
    adwords_id: String,
    #[serde(flatten)]
    entry: HistoryEntry,
}

pub async fn expiring_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    let accounts = services.directory.list();
    items(summaries(expiring(&accounts)))
}

pub async fn attention_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    let accounts = services.directory.list();
    let groups: BTreeMap<&str, Vec<AccountSummary>> = attention(&accounts)
        .into_iter()
        .map(|(label, group)| (label, summaries(group)))
        .collect();
    ok(json!({ "groups": groups }))
}

pub async fn not_updated_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin, Role::Technician]) {
        return resp;
    }
    let accounts = services.directory.list();
    let report = not_updated(&accounts, Utc::now());
    let by_login: BTreeMap<String, Vec<AccountSummary>> = report
        .by_login
        .into_iter()
        .map(|(login, group)| (login, summaries(group)))
        .collect();
    ok(json!({
        "since": report.since,
        "title": report.title,
        "by_login": by_login,
    }))
}

pub async fn high_spend_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    let accounts = services.directory.list();
    items(summaries(high_spend(&accounts)))
}

/// Accounts that went suspended or attention lately, with each change.
pub async fn status_changes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    let now = Utc::now();
    let found: Vec<AccountStatusChanges> = services
        .directory
        .list()
        .iter()
        .filter_map(|account| {
            let changes = recent_status_changes(&services.directory.history(account.id_typed()), now, STATUS_CHANGE_DAYS);
            (!changes.is_empty()).then(|| AccountStatusChanges {
                account: AccountSummary::from(account),
                changes,
            })
        })
        .collect();
    items(found)
}

/// The last day of history across the caller's accounts, newest first.
pub async fn recent_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin, Role::Support, Role::Technician]) {
        return resp;
    }
    let since = Utc::now() - Duration::days(RECENT_HISTORY_DAYS);
    let mut entries: Vec<AccountHistoryEntry> = Vec::new();
    for account in visible_accounts(&services, &principal) {
        let events = services.directory.history(account.id_typed());
        let accesses = services.accesses_of(account.id_typed());
        let rendered = render_history(&events, &accesses, principal.role(), |user| services.user_display(user));
        entries.extend(
            rendered
                .into_iter()
                .filter(|entry| entry.at >= since)
                .map(|entry| AccountHistoryEntry {
                    account_id: account.id_typed(),
                    adwords_id: account.fields().adwords_id.clone(),
                    entry,
                }),
        );
    }
    entries.sort_by(|a, b| b.entry.at.cmp(&a.entry.at));
    ok(json!({
        "since": format_hk(since),
        "items": entries,
    }))
}

pub async fn vendor_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    items(vendor_statistics(&services.vendors.list(), &services.directory.list()))
}

pub async fn releasable_vps(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin, Role::Technician]) {
        return resp;
    }
    let hosts = services.hosts.list();
    let accounts = services.directory.list();
    let views: Vec<_> = releasable_hosts(&hosts, &accounts)
        .into_iter()
        .map(|vps| vps_view(&services, vps.clone()))
        .collect();
    items(views)
}

/// Spend per client at the end of each of the last seven HK days.
pub async fn total_spend_by_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    let days = total_spend(&services.directory.all_history(), Utc::now(), TOTAL_SPEND_DAYS);
    ok(json!({
        "clients": client_columns(&services),
        "days": days,
    }))
}

pub async fn active_accounts_by_client(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin, Role::Support]) {
        return resp;
    }
    let clients = client_columns(&services);
    let ids: Vec<UserId> = clients.iter().map(|c| c.id).collect();
    let mut rows = active_accounts(&ids, &services.directory.list(), &services.directory.all_history(), Utc::now());
    let found: Vec<_> = clients
        .into_iter()
        .map(|client| {
            let accounts = rows.remove(&client.id).unwrap_or_default();
            json!({ "client": client, "accounts": accounts })
        })
        .collect();
    items(found)
}

pub async fn vendor_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    let clients = client_columns(&services);
    let ids: Vec<UserId> = clients.iter().map(|c| c.id).collect();
    let mut usage = vendor_usage(&ids, &services.directory.list());
    let vendors: BTreeMap<_, _> = services.vendors.list().into_iter().map(|v| (v.id, v.display_name())).collect();
    let found: Vec<_> = clients
        .into_iter()
        .map(|client| {
            let by_vendor = usage.remove(&client.id).unwrap_or_default();
            json!({ "client": client, "vendors": by_vendor })
        })
        .collect();
    ok(json!({ "vendors": vendors, "items": found }))
}

pub async fn vendor_mcc(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = guard_roles(&principal, &[Role::Admin]) {
        return resp;
    }
    ok(json!({ "vendors": vendor_logins(&services.vendors.list(), &services.directory.list()) }))
}
