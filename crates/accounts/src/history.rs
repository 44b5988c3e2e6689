//! Human-readable change history of an account, filtered per role.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use adportal_auth::Role;
use adportal_core::UserId;
use adportal_events::EventEnvelope;

use crate::access::Access;
use crate::account::{AccountEvent, FieldChange};
use crate::attributes::Attribute;
use crate::status::AccountStatus;

/// Name shown for writes made by the ingestion job.
pub const INGESTION_ACTOR: &str = "eve";

const HK_OFFSET_SECS: i32 = 8 * 3600;
const TIME_FORMAT: &str = "%m/%d %H:%M";

/// Columns never shown in history, whatever the role.
const NEVER_SHOWN: [Attribute; 3] = [Attribute::Password, Attribute::LastVisitedByEve, Attribute::Vpss];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Created,
    Updated,
    Deleted,
    Accessed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    /// `%m/%d %H:%M` in Hong Kong time.
    pub time: String,
    pub user: String,
    pub kind: HistoryKind,
    pub content: String,
}

/// Hong Kong local time (UTC+8, no DST).
pub fn hk_time(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(HK_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset),
        None => at.fixed_offset(),
    }
}

pub fn format_hk(at: DateTime<Utc>) -> String {
    hk_time(at).format(TIME_FORMAT).to_string()
}

fn visible(change: &FieldChange, role: Role) -> bool {
    !NEVER_SHOWN.contains(&change.column) && change.column.is_readable_by(role)
}

/// Render one event for `role`. `None` when nothing in it is visible.
pub fn render_event(
    envelope: &EventEnvelope<AccountEvent>,
    role: Role,
    user_name: &impl Fn(UserId) -> String,
) -> Option<HistoryEntry> {
    let event = envelope.payload();
    let (kind, content) = match event {
        AccountEvent::AccountCreated(e) => {
            let parts: Vec<String> = e
                .changes
                .iter()
                .filter(|c| visible(c, role))
                .map(|c| format!("{}={}", c.column, c.after))
                .collect();
            if parts.is_empty() {
                return None;
            }
            (HistoryKind::Created, format!("created {}", parts.join(", ")))
        }
        AccountEvent::AccountUpdated(e) => {
            let parts: Vec<String> = e
                .changes
                .iter()
                .filter(|c| visible(c, role))
                .map(|c| format!("{}: {} → {}", c.column, c.before, c.after))
                .collect();
            if parts.is_empty() {
                return None;
            }
            (HistoryKind::Updated, format!("updated {}", parts.join(", ")))
        }
        AccountEvent::AccountDeleted(_) => (HistoryKind::Deleted, "deleted.".to_string()),
    };

    let at = envelope.occurred_at();
    Some(HistoryEntry {
        at,
        time: format_hk(at),
        user: event
            .actor()
            .map(user_name)
            .unwrap_or_else(|| INGESTION_ACTOR.to_string()),
        kind,
        content,
    })
}

/// Full history of one account as seen by `role`, oldest first.
pub fn render_history(
    events: &[EventEnvelope<AccountEvent>],
    accesses: &[Access],
    role: Role,
    user_name: impl Fn(UserId) -> String,
) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = events
        .iter()
        .filter_map(|e| render_event(e, role, &user_name))
        .collect();
    entries.extend(accesses.iter().map(|a| HistoryEntry {
        at: a.created_at,
        time: format_hk(a.created_at),
        user: user_name(a.user_id),
        kind: HistoryKind::Accessed,
        content: "accessed this account.".to_string(),
    }));
    entries.sort_by_key(|e| e.at);
    entries
}

fn status_change(event: &AccountEvent) -> Option<AccountStatus> {
    event
        .changes()
        .iter()
        .find(|c| c.column == Attribute::Status)
        .and_then(|c| c.after.as_text())
        .and_then(|s| s.parse().ok())
}

/// When the account first became suspended.
pub fn suspended_on(events: &[EventEnvelope<AccountEvent>]) -> Option<DateTime<Utc>> {
    events
        .iter()
        .find(|e| status_change(e.payload()) == Some(AccountStatus::Suspended))
        .map(|e| e.occurred_at())
}

/// A status change into one of the watched statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub status: AccountStatus,
    pub at: DateTime<Utc>,
    pub time: String,
}

/// Changes into suspended or attention during the `days` before `now`.
pub fn recent_status_changes(
    events: &[EventEnvelope<AccountEvent>],
    now: DateTime<Utc>,
    days: i64,
) -> Vec<StatusChange> {
    let since = now - Duration::days(days);
    events
        .iter()
        .filter(|e| e.occurred_at() >= since)
        .filter_map(|e| {
            let status = status_change(e.payload())?;
            matches!(status, AccountStatus::Suspended | AccountStatus::Attention).then(|| StatusChange {
                status,
                at: e.occurred_at(),
                time: format_hk(e.occurred_at()),
            })
        })
        .collect()
}
