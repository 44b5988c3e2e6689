//! Dashboard widget data.
//!
//! Every widget is a pure function over the current account set, or over the
//! account event log for the ones that look back in time. The api layer picks
//! the inputs and serializes the result.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike, Utc};
use serde::Serialize;

use adportal_core::{AccountId, Aggregate, UserId, VendorId};
use adportal_events::EventEnvelope;
use adportal_hosts::{StatusTally, Vps};
use adportal_vendors::Vendor;

use crate::account::{Account, AccountEvent};
use crate::history::hk_time;
use crate::status::AccountStatus;
use crate::view::hosted_on;

/// HK hours at which a technician shift begins.
pub const NOT_UPDATED_SHIFTS: [u32; 3] = [4, 11, 10];

/// Rows kept by the high-spend widget.
pub const HIGH_SPEND_LIMIT: usize = 31;

/// HK days covered by the total-spend widget.
pub const TOTAL_SPEND_DAYS: i64 = 7;

const EXPIRING_DAYS: i64 = 3;

/// Accounts that run out of budget within [`EXPIRING_DAYS`], soonest first.
pub fn expiring<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Vec<&'a Account> {
    let mut found: Vec<&Account> = accounts
        .into_iter()
        .filter(|a| a.exists())
        .filter(|a| {
            !matches!(
                a.status(),
                AccountStatus::Suspended
                    | AccountStatus::Abandoned
                    | AccountStatus::AppealRequested
                    | AccountStatus::AppealSubmitted
                    | AccountStatus::Attention
            )
        })
        .filter(|a| {
            let budget = a.budget();
            !a.fields().is_unlimited
                && budget.remaining_account_budget.is_some()
                && budget.daily_budget.is_some_and(|d| d > 0.0)
                && budget.days_left() < EXPIRING_DAYS
        })
        .collect();
    found.sort_by_key(|a| (a.budget().days_left(), a.id_typed()));
    found
}

/// Accounts needing a human, grouped by status label.
pub fn attention<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> BTreeMap<&'static str, Vec<&'a Account>> {
    let mut groups: BTreeMap<&'static str, Vec<&Account>> = BTreeMap::new();
    for account in accounts.into_iter().filter(|a| a.exists()) {
        let status = account.status();
        if status.needs_attention() {
            groups.entry(status.label()).or_default().push(account);
        }
    }
    groups
}

/// Start of the shift `now` falls in.
///
/// The latest of `hours` already passed today wins; before the first one the
/// previous day's latest shift applies. `None` when `hours` is empty.
pub fn shift_start(hours: &[u32], now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let at_hour = |dt: DateTime<FixedOffset>, hour: u32| dt.with_hour(hour).and_then(|d| d.with_minute(0));

    let passed = hours
        .iter()
        .filter_map(|&h| at_hour(now, h))
        .filter(|start| now > *start)
        .max();
    match passed {
        Some(start) => Some(start),
        None => at_hour(now - Duration::days(1), *hours.iter().max()?),
    }
}

#[derive(Debug, Clone)]
pub struct NotUpdated<'a> {
    pub since: DateTime<FixedOffset>,
    pub title: String,
    /// Keyed by login (the manager account); accounts without one use `""`.
    pub by_login: BTreeMap<String, Vec<&'a Account>>,
}

/// Running accounts the ingestion job has not visited this shift.
pub fn not_updated<'a>(accounts: impl IntoIterator<Item = &'a Account>, now: DateTime<Utc>) -> NotUpdated<'a> {
    let hk_now = hk_time(now);
    let since = shift_start(&NOT_UPDATED_SHIFTS, hk_now).unwrap_or(hk_now);
    let mut by_login: BTreeMap<String, Vec<&Account>> = BTreeMap::new();
    for account in accounts.into_iter().filter(|a| a.exists()) {
        let fields = account.fields();
        let running = matches!(account.status(), AccountStatus::Active | AccountStatus::Disapproved);
        let stale = fields.last_visited_by_eve.is_none_or(|visited| visited < since);
        if running && !fields.vps_ids.is_empty() && stale {
            by_login
                .entry(fields.login.clone().unwrap_or_default())
                .or_default()
                .push(account);
        }
    }
    NotUpdated {
        since,
        title: format!("Accounts not updated since: {} HKT", since.format("%m/%d %H:%M")),
        by_login,
    }
}

/// The biggest spenders, highest first.
pub fn high_spend<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Vec<&'a Account> {
    let mut found: Vec<&Account> = accounts
        .into_iter()
        .filter(|a| a.exists() && a.budget().spent_in_hkd() > 0.0)
        .collect();
    found.sort_by(|a, b| b.budget().spent_in_hkd().total_cmp(&a.budget().spent_in_hkd()));
    found.truncate(HIGH_SPEND_LIMIT);
    found
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorStatistics {
    pub vendor_id: VendorId,
    pub name: String,
    pub is_active: bool,
    pub count_activated: usize,
    pub tally_status: StatusTally,
    pub total_spent: f64,
    pub max_spent: f64,
    pub max_spent_account: Option<AccountId>,
}

impl VendorStatistics {
    fn compute<'a>(vendor: &Vendor, accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        let mut stats = VendorStatistics {
            vendor_id: vendor.id,
            name: vendor.display_name(),
            is_active: vendor.is_active,
            count_activated: 0,
            tally_status: StatusTally::new(),
            total_spent: 0.0,
            max_spent: 0.0,
            max_spent_account: None,
        };
        for account in accounts {
            if account.fields().vendor_id != Some(vendor.id) || !account.status().is_activated() {
                continue;
            }
            stats.count_activated += 1;
            *stats.tally_status.entry(account.status().name()).or_default() += 1;
            let spent = account.budget().spent_in_hkd();
            stats.total_spent += spent;
            if spent > stats.max_spent {
                stats.max_spent = spent;
                stats.max_spent_account = Some(account.id_typed());
            }
        }
        stats
    }
}

/// Per-vendor activation and spend, active vendors first.
pub fn vendor_statistics(vendors: &[Vendor], accounts: &[Account]) -> Vec<VendorStatistics> {
    let mut ordered: Vec<&Vendor> = vendors.iter().collect();
    ordered.sort_by_key(|v| (!v.is_active, v.id));
    ordered
        .into_iter()
        .map(|v| VendorStatistics::compute(v, accounts.iter().filter(|a| a.exists())))
        .collect()
}

/// 23:59 HK time on the day `days_back` days before `now`'s HK day.
fn hk_day_end(now: DateTime<Utc>, days_back: i64) -> DateTime<Utc> {
    let local = hk_time(now);
    let end = (local.date_naive() - Duration::days(days_back)).and_time(NaiveTime::MIN)
        + Duration::minutes(23 * 60 + 59);
    end.and_utc() - Duration::seconds(i64::from(local.offset().local_minus_utc()))
}

type Stream<'a> = Vec<&'a EventEnvelope<AccountEvent>>;

fn by_account(events: &[EventEnvelope<AccountEvent>]) -> BTreeMap<AccountId, Stream<'_>> {
    let mut streams: BTreeMap<AccountId, Stream<'_>> = BTreeMap::new();
    for envelope in events {
        streams.entry(envelope.payload().account_id()).or_default().push(envelope);
    }
    for stream in streams.values_mut() {
        stream.sort_by_key(|e| e.occurred_at());
    }
    streams
}

/// The account as it stood just before `at`. `None` while it did not exist.
fn state_before(id: AccountId, stream: &[&EventEnvelope<AccountEvent>], at: DateTime<Utc>) -> Option<Account> {
    let mut account = Account::empty(id);
    for envelope in stream.iter().take_while(|e| e.occurred_at() < at) {
        account.apply(envelope.payload());
    }
    account.exists().then_some(account)
}

/// Newest version written strictly inside `(from, to)` that was active.
fn active_between(
    id: AccountId,
    stream: &[&EventEnvelope<AccountEvent>],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Option<Account> {
    let mut account = Account::empty(id);
    let mut found = None;
    for envelope in stream.iter().take_while(|e| e.occurred_at() < to) {
        account.apply(envelope.payload());
        if envelope.occurred_at() > from && account.exists() && account.status() == AccountStatus::Active {
            found = Some(account.clone());
        }
    }
    found
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySpend {
    /// `MM/DD Weekday` of the HK day.
    pub header: String,
    pub until: DateTime<Utc>,
    pub by_client: BTreeMap<UserId, f64>,
}

/// Spend per client as it stood at the end of each of the last `days` HK
/// days, oldest day first. Replays every account's history up to the cutoff.
pub fn total_spend(events: &[EventEnvelope<AccountEvent>], now: DateTime<Utc>, days: i64) -> Vec<DailySpend> {
    let streams = by_account(events);
    (0..days)
        .rev()
        .map(|back| {
            let until = hk_day_end(now, back);
            let mut by_client: BTreeMap<UserId, f64> = BTreeMap::new();
            for (id, stream) in &streams {
                let Some(account) = state_before(*id, stream, until) else {
                    continue;
                };
                if let Some(client) = account.fields().client_id {
                    *by_client.entry(client).or_insert(0.0) += account.budget().spent_in_hkd();
                }
            }
            DailySpend {
                header: hk_time(until).format("%m/%d %A").to_string(),
                until,
                by_client,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSnapshot {
    pub daily_budget: Option<f64>,
    pub spent_in_hkd: f64,
}

impl From<&Account> for ActiveSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            daily_budget: account.budget().daily_budget,
            spent_in_hkd: account.budget().spent_in_hkd(),
        }
    }
}

/// One account of a client across the last three HK days.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveAccountRow {
    pub account_id: AccountId,
    pub adwords_id: String,
    pub day_before: Option<ActiveSnapshot>,
    pub yesterday: Option<ActiveSnapshot>,
    pub today: Option<ActiveSnapshot>,
}

impl ActiveAccountRow {
    fn new(account: &Account) -> Self {
        Self {
            account_id: account.id_typed(),
            adwords_id: account.fields().adwords_id.clone(),
            day_before: None,
            yesterday: None,
            today: None,
        }
    }

    /// Active today outranks any mix of the two earlier days.
    fn score(&self) -> u32 {
        31 * u32::from(self.today.is_some())
            + 20 * u32::from(self.yesterday.is_some())
            + 10 * u32::from(self.day_before.is_some())
    }
}

/// Active accounts per client today, yesterday and the day before, most
/// consistently active first. Every listed client gets an entry.
pub fn active_accounts(
    clients: &[UserId],
    accounts: &[Account],
    events: &[EventEnvelope<AccountEvent>],
    now: DateTime<Utc>,
) -> BTreeMap<UserId, Vec<ActiveAccountRow>> {
    let mut rows: BTreeMap<UserId, BTreeMap<AccountId, ActiveAccountRow>> =
        clients.iter().map(|c| (*c, BTreeMap::new())).collect();

    for account in accounts.iter().filter(|a| a.exists() && a.status() == AccountStatus::Active) {
        if let Some(client) = account.fields().client_id {
            let row = rows
                .entry(client)
                .or_default()
                .entry(account.id_typed())
                .or_insert_with(|| ActiveAccountRow::new(account));
            row.today = Some(ActiveSnapshot::from(account));
        }
    }

    let yesterday_end = hk_day_end(now, 1);
    let day_before_end = hk_day_end(now, 2);
    for (id, stream) in by_account(events) {
        for (end, is_yesterday) in [(yesterday_end, true), (day_before_end, false)] {
            let Some(account) = active_between(id, &stream, end - Duration::days(1), end) else {
                continue;
            };
            let Some(client) = account.fields().client_id else {
                continue;
            };
            let row = rows
                .entry(client)
                .or_default()
                .entry(id)
                .or_insert_with(|| ActiveAccountRow::new(&account));
            let snapshot = Some(ActiveSnapshot::from(&account));
            if is_yesterday {
                row.yesterday = snapshot;
            } else {
                row.day_before = snapshot;
            }
        }
    }

    rows.into_iter()
        .map(|(client, by_id)| {
            let mut ordered: Vec<ActiveAccountRow> = by_id.into_values().collect();
            ordered.sort_by(|a, b| b.score().cmp(&a.score()).then_with(|| a.adwords_id.cmp(&b.adwords_id)));
            (client, ordered)
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VendorUsage {
    pub count: usize,
    pub spent_in_hkd: f64,
}

/// Activated accounts of each listed client, tallied per vendor.
pub fn vendor_usage(clients: &[UserId], accounts: &[Account]) -> BTreeMap<UserId, BTreeMap<VendorId, VendorUsage>> {
    let mut usage: BTreeMap<UserId, BTreeMap<VendorId, VendorUsage>> =
        clients.iter().map(|c| (*c, BTreeMap::new())).collect();
    for account in accounts.iter().filter(|a| a.exists() && a.status().is_activated()) {
        let (Some(client), Some(vendor)) = (account.fields().client_id, account.fields().vendor_id) else {
            continue;
        };
        let Some(per_vendor) = usage.get_mut(&client) else {
            continue;
        };
        let tally = per_vendor.entry(vendor).or_default();
        tally.count += 1;
        tally.spent_in_hkd += account.budget().spent_in_hkd();
    }
    usage
}

/// Logins used by each vendor's accounts, keyed by company name, with how
/// every account on that login splits over statuses.
pub fn vendor_logins(vendors: &[Vendor], accounts: &[Account]) -> BTreeMap<String, BTreeMap<String, StatusTally>> {
    let login_of = |a: &&Account| a.fields().login.as_deref().filter(|l| !l.is_empty()).map(str::to_owned);
    let live: Vec<&Account> = accounts.iter().filter(|a| a.exists()).collect();

    let mut per_login: BTreeMap<String, StatusTally> = BTreeMap::new();
    for account in &live {
        if let Some(login) = login_of(account) {
            *per_login.entry(login).or_default().entry(account.status().name()).or_default() += 1;
        }
    }

    let mut found: BTreeMap<String, BTreeMap<String, StatusTally>> = BTreeMap::new();
    for vendor in vendors {
        for login in live.iter().filter(|a| a.fields().vendor_id == Some(vendor.id)).filter_map(login_of) {
            if let Some(tally) = per_login.get(&login) {
                found
                    .entry(vendor.company_name.clone())
                    .or_default()
                    .insert(login, tally.clone());
            }
        }
    }
    found
}

/// Hosts still provisioned whose accounts are all dead.
pub fn releasable_hosts<'a>(hosts: &'a [Vps], accounts: &[Account]) -> Vec<&'a Vps> {
    hosts
        .iter()
        .filter(|vps| vps.is_releasable(&hosted_on(accounts, vps.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use adportal_vendors::VendorDraft;
    use uuid::Uuid;

    use crate::account::{AccountCreated, AccountDeleted, AccountUpdated, FieldChange};
    use crate::attributes::Attribute;
    use crate::value::FieldValue;
    use crate::view::tests::{account_with, Fixture};

    fn hk(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        offset.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn budgeted(id: i64, status: &str, remaining: f64, daily: f64) -> Account {
        account_with(
            id,
            vec![
                (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}"))),
                (Attribute::Status, FieldValue::Text(status.into())),
                (Attribute::AccountBudget, FieldValue::Number(1000.0)),
                (Attribute::RemainingAccountBudget, FieldValue::Number(remaining)),
                (Attribute::DailyBudget, FieldValue::Number(daily)),
                (Attribute::ExchangeRate, FieldValue::Number(1.0)),
            ],
        )
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        hk(2024, 5, d, h, 0).with_timezone(&Utc)
    }

    fn wrap(id: i64, event: AccountEvent) -> EventEnvelope<AccountEvent> {
        let occurred_at = adportal_events::Event::occurred_at(&event);
        EventEnvelope::new(
            Uuid::now_v7(),
            AccountId::new(id).aggregate_id(),
            "accounts.account",
            1,
            occurred_at,
            event,
        )
    }

    fn changes(values: Vec<(Attribute, FieldValue)>) -> Vec<FieldChange> {
        values
            .into_iter()
            .map(|(column, after)| FieldChange { column, before: FieldValue::Null, after })
            .collect()
    }

    fn created(id: i64, occurred_at: DateTime<Utc>, values: Vec<(Attribute, FieldValue)>) -> EventEnvelope<AccountEvent> {
        wrap(
            id,
            AccountEvent::AccountCreated(AccountCreated {
                account_id: AccountId::new(id),
                changes: changes(values),
                actor: None,
                occurred_at,
            }),
        )
    }

    fn updated(id: i64, occurred_at: DateTime<Utc>, values: Vec<(Attribute, FieldValue)>) -> EventEnvelope<AccountEvent> {
        wrap(
            id,
            AccountEvent::AccountUpdated(AccountUpdated {
                account_id: AccountId::new(id),
                changes: changes(values),
                actor: None,
                occurred_at,
            }),
        )
    }

    fn deleted(id: i64, occurred_at: DateTime<Utc>) -> EventEnvelope<AccountEvent> {
        wrap(
            id,
            AccountEvent::AccountDeleted(AccountDeleted {
                account_id: AccountId::new(id),
                actor: None,
                occurred_at,
            }),
        )
    }

    fn status(s: &str) -> (Attribute, FieldValue) {
        (Attribute::Status, FieldValue::Text(s.into()))
    }

    fn client(id: i64) -> (Attribute, FieldValue) {
        (Attribute::ClientId, FieldValue::Id(id))
    }

    fn current(events: &[EventEnvelope<AccountEvent>]) -> Vec<Account> {
        let mut accounts: BTreeMap<AccountId, Account> = BTreeMap::new();
        for envelope in events {
            let id = envelope.payload().account_id();
            accounts.entry(id).or_insert_with(|| Account::empty(id)).apply(envelope.payload());
        }
        accounts.into_values().collect()
    }

    #[test]
    fn hk_day_end_is_one_minute_before_hk_midnight() {
        let now = at(10, 12);
        assert_eq!(hk_day_end(now, 0), hk(2024, 5, 10, 23, 59).with_timezone(&Utc));
        assert_eq!(hk_day_end(now, 2), hk(2024, 5, 8, 23, 59).with_timezone(&Utc));
        // 01:00 HK is still the previous UTC day.
        assert_eq!(hk_day_end(at(10, 1), 0), hk(2024, 5, 10, 23, 59).with_timezone(&Utc));
    }

    #[test]
    fn total_spend_replays_each_day_up_to_its_end() {
        let budget = |remaining: f64, rate: f64| {
            vec![
                (Attribute::AccountBudget, FieldValue::Number(1000.0)),
                (Attribute::RemainingAccountBudget, FieldValue::Number(remaining)),
                (Attribute::ExchangeRate, FieldValue::Number(rate)),
            ]
        };
        let mut first = budget(1000.0, 1.0);
        first.push(client(7));
        let mut second = budget(900.0, 2.0);
        second.push(client(7));
        let events = vec![
            created(1, at(8, 10), first),
            updated(1, at(9, 10), vec![(Attribute::RemainingAccountBudget, FieldValue::Number(600.0))]),
            created(2, at(9, 12), second),
            deleted(2, at(10, 8)),
            updated(1, at(10, 9), vec![(Attribute::RemainingAccountBudget, FieldValue::Number(500.0))]),
        ];

        let days = total_spend(&events, at(10, 12), 3);
        let headers: Vec<&str> = days.iter().map(|d| d.header.as_str()).collect();
        assert_eq!(headers, vec!["05/08 Wednesday", "05/09 Thursday", "05/10 Friday"]);
        let totals: Vec<Option<f64>> = days.iter().map(|d| d.by_client.get(&UserId::new(7)).copied()).collect();
        assert_eq!(totals, vec![Some(0.0), Some(600.0), Some(500.0)]);
    }

    #[test]
    fn total_spend_skips_days_before_any_account() {
        let events = vec![created(1, at(10, 9), vec![client(7)])];
        let days = total_spend(&events, at(10, 12), TOTAL_SPEND_DAYS);
        assert_eq!(days.len(), 7);
        assert!(days[..6].iter().all(|d| d.by_client.is_empty()));
        assert_eq!(days[6].by_client.get(&UserId::new(7)), Some(&0.0));
    }

    #[test]
    fn active_accounts_rank_today_over_earlier_days() {
        let adwords = |id: i64| (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}")));
        let events = vec![
            created(1, at(8, 10), vec![adwords(1), client(7), status("active")]),
            updated(1, at(9, 10), vec![status("suspended")]),
            created(2, at(9, 11), vec![adwords(2), client(7), status("active")]),
            created(3, at(10, 8), vec![adwords(3), client(7), status("active")]),
            updated(2, at(10, 8), vec![status("suspended")]),
            updated(1, at(10, 9), vec![status("active")]),
        ];
        let accounts = current(&events);

        let found = active_accounts(&[UserId::new(7), UserId::new(8)], &accounts, &events, at(10, 12));
        assert_eq!(found[&UserId::new(8)].len(), 0);

        let rows = &found[&UserId::new(7)];
        let order: Vec<i64> = rows.iter().map(|r| r.account_id.get()).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert!(rows[0].day_before.is_some() && rows[0].yesterday.is_none() && rows[0].today.is_some());
        assert!(rows[1].today.is_some() && rows[1].yesterday.is_none());
        assert!(rows[2].yesterday.is_some() && rows[2].today.is_none());
    }

    #[test]
    fn vendor_usage_tallies_listed_clients_only() {
        let account = |id: i64, status: &str, client: i64, vendor: i64, remaining: f64| {
            account_with(
                id,
                vec![
                    (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}"))),
                    (Attribute::Status, FieldValue::Text(status.into())),
                    (Attribute::ClientId, FieldValue::Id(client)),
                    (Attribute::VendorId, FieldValue::Id(vendor)),
                    (Attribute::AccountBudget, FieldValue::Number(1000.0)),
                    (Attribute::RemainingAccountBudget, FieldValue::Number(remaining)),
                    (Attribute::ExchangeRate, FieldValue::Number(1.0)),
                ],
            )
        };
        let accounts = vec![
            account(1, "active", 7, 1, 900.0),
            account(2, "attention", 7, 1, 800.0),
            account(3, "reserved", 7, 1, 0.0),
            account(4, "active", 7, 2, 500.0),
            account(5, "active", 9, 1, 0.0),
        ];
        let usage = vendor_usage(&[UserId::new(7), UserId::new(8)], &accounts);
        assert_eq!(usage.len(), 2);
        assert!(usage[&UserId::new(8)].is_empty());
        let seven = &usage[&UserId::new(7)];
        assert_eq!(seven[&VendorId::new(1)], VendorUsage { count: 2, spent_in_hkd: 300.0 });
        assert_eq!(seven[&VendorId::new(2)], VendorUsage { count: 1, spent_in_hkd: 500.0 });
    }

    #[test]
    fn vendor_logins_count_every_account_on_a_shared_login() {
        let fx = Fixture::standard();
        let bolt = Vendor::create(
            VendorId::new(2),
            VendorDraft {
                nickname: "bolt".into(),
                company_name: "Bolt Co".into(),
                is_active: true,
                ..VendorDraft::default()
            },
            Utc::now(),
        );
        let vendors = vec![fx.vendors[&VendorId::new(1)].clone(), bolt];
        let on = |id: i64, status: &str, vendor: Option<i64>, login: Option<&str>| {
            let mut values = vec![
                (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}"))),
                (Attribute::Status, FieldValue::Text(status.into())),
            ];
            if let Some(vendor) = vendor {
                values.push((Attribute::VendorId, FieldValue::Id(vendor)));
            }
            if let Some(login) = login {
                values.push((Attribute::Login, FieldValue::Text(login.into())));
            }
            account_with(id, values)
        };
        let accounts = vec![
            on(1, "active", Some(1), Some("ops@a.com")),
            on(2, "suspended", None, Some("ops@a.com")),
            on(3, "active", Some(2), Some("ops@b.com")),
            on(4, "active", Some(1), None),
        ];

        let found = vendor_logins(&vendors, &accounts);
        let companies: Vec<&str> = found.keys().map(String::as_str).collect();
        assert_eq!(companies, vec!["Acme Ltd", "Bolt Co"]);
        let acme = &found["Acme Ltd"]["ops@a.com"];
        assert_eq!(acme.get("ACTIVE"), Some(&1));
        assert_eq!(acme.get("SUSPENDED"), Some(&1));
        assert_eq!(found["Bolt Co"].len(), 1);
    }

    #[test]
    fn shift_start_picks_the_latest_passed_hour() {
        let shifts = [1, 4, 9, 13, 17, 21];
        assert_eq!(shift_start(&shifts, hk(2024, 5, 10, 19, 56)), Some(hk(2024, 5, 10, 17, 0)));
        assert_eq!(shift_start(&shifts, hk(2024, 5, 10, 12, 49)), Some(hk(2024, 5, 10, 9, 0)));
        assert_eq!(shift_start(&shifts, hk(2024, 5, 10, 23, 59)), Some(hk(2024, 5, 10, 21, 0)));
    }

    #[test]
    fn shift_start_before_first_shift_falls_back_to_previous_day() {
        let shifts = [1, 4, 9, 13, 17, 21];
        let start = shift_start(&shifts, hk(2024, 5, 10, 0, 30)).unwrap();
        assert_eq!(start, hk(2024, 5, 9, 21, 0));
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());
    }

    #[test]
    fn shift_start_with_no_shifts() {
        assert_eq!(shift_start(&[], hk(2024, 5, 10, 8, 0)), None);
    }

    #[test]
    fn expiring_keeps_short_runways_sorted() {
        let accounts = vec![
            budgeted(1, "active", 250.0, 100.0),
            budgeted(2, "active", 50.0, 100.0),
            budgeted(3, "active", 900.0, 100.0),
            budgeted(4, "suspended", 50.0, 100.0),
            budgeted(5, "active", 50.0, 0.0),
        ];
        let ids: Vec<i64> = expiring(&accounts).iter().map(|a| a.id_typed().get()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn expiring_skips_unlimited_accounts() {
        let account = account_with(
            1,
            vec![
                (Attribute::AdwordsId, FieldValue::Text("123-456-7890".into())),
                (Attribute::IsUnlimited, FieldValue::Flag(true)),
                (Attribute::RemainingAccountBudget, FieldValue::Number(10.0)),
                (Attribute::DailyBudget, FieldValue::Number(100.0)),
            ],
        );
        assert!(expiring([&account]).is_empty());
    }

    #[test]
    fn attention_groups_by_label() {
        let accounts = vec![
            budgeted(1, "attention", 0.0, 1.0),
            budgeted(2, "appeal_requested", 0.0, 1.0),
            budgeted(3, "attention", 0.0, 1.0),
            budgeted(4, "active", 0.0, 1.0),
        ];
        let groups = attention(&accounts);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[AccountStatus::Attention.label()].len(), 2);
        assert_eq!(groups[AccountStatus::AppealRequested.label()].len(), 1);
    }

    #[test]
    fn not_updated_selects_stale_hosted_accounts() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 6, 0, 0).unwrap(); // 14:00 HKT
        let stale = now - Duration::hours(5);
        let fresh = now - Duration::hours(1);
        let hosted = |id: i64, status: &str, login: &str, visited: Option<DateTime<Utc>>| {
            let mut values = vec![
                (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}"))),
                (Attribute::Status, FieldValue::Text(status.into())),
                (Attribute::Login, FieldValue::Text(login.into())),
                (Attribute::Vpss, FieldValue::Ids(vec![1])),
            ];
            if let Some(at) = visited {
                values.push((Attribute::LastVisitedByEve, FieldValue::Time(at)));
            }
            account_with(id, values)
        };
        let accounts = vec![
            hosted(1, "active", "mcc-a", None),
            hosted(2, "disapproved", "mcc-a", Some(stale)),
            hosted(3, "active", "mcc-b", Some(fresh)),
            hosted(4, "suspended", "mcc-b", None),
            budgeted(5, "active", 1.0, 1.0),
        ];
        let report = not_updated(&accounts, now);
        assert_eq!(report.since, hk(2024, 5, 10, 11, 0));
        assert_eq!(report.by_login.len(), 1);
        assert_eq!(report.by_login["mcc-a"].len(), 2);
        assert!(report.title.ends_with("05/10 11:00 HKT"));
    }

    #[test]
    fn high_spend_orders_and_caps() {
        let accounts: Vec<Account> = (1..=40)
            .map(|i| budgeted(i, "active", 1000.0 - i as f64, 10.0))
            .chain([budgeted(41, "active", 1000.0, 10.0)])
            .collect();
        let top = high_spend(&accounts);
        assert_eq!(top.len(), HIGH_SPEND_LIMIT);
        assert_eq!(top[0].id_typed().get(), 40);
        assert!(top.iter().all(|a| a.id_typed().get() != 41));
    }

    #[test]
    fn vendor_statistics_counts_activated_accounts() {
        let fx = Fixture::standard();
        let vendor = fx.vendors[&VendorId::new(1)].clone();
        let with_vendor = |id: i64, status: &str, remaining: f64| {
            account_with(
                id,
                vec![
                    (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}"))),
                    (Attribute::Status, FieldValue::Text(status.into())),
                    (Attribute::VendorId, FieldValue::Id(1)),
                    (Attribute::AccountBudget, FieldValue::Number(1000.0)),
                    (Attribute::RemainingAccountBudget, FieldValue::Number(remaining)),
                    (Attribute::ExchangeRate, FieldValue::Number(2.0)),
                ],
            )
        };
        let accounts = vec![
            with_vendor(1, "active", 900.0),
            with_vendor(2, "suspended", 400.0),
            with_vendor(3, "reserved", 0.0),
            budgeted(4, "active", 0.0, 1.0),
        ];
        let stats = vendor_statistics(&[vendor], &accounts);
        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!(s.count_activated, 2);
        assert_eq!(s.tally_status.get("ACTIVE"), Some(&1));
        assert_eq!(s.tally_status.get("SUSPENDED"), Some(&1));
        assert_eq!(s.total_spent, 1400.0);
        assert_eq!(s.max_spent_account, Some(AccountId::new(2)));
    }

    #[test]
    fn releasable_hosts_need_only_dead_accounts() {
        let fx = Fixture::standard();
        let mut hosts: Vec<Vps> = fx.hosts.values().cloned().collect();
        hosts.sort_by_key(|v| v.id);
        let on = |id: i64, status: &str, vps: i64| {
            account_with(
                id,
                vec![
                    (Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}"))),
                    (Attribute::Status, FieldValue::Text(status.into())),
                    (Attribute::Vpss, FieldValue::Ids(vec![vps])),
                ],
            )
        };
        let accounts = vec![on(1, "suspended", 1), on(2, "abandoned", 1), on(3, "active", 2)];
        let released: Vec<&str> = releasable_hosts(&hosts, &accounts).iter().map(|v| v.name.as_str()).collect();
        assert_eq!(released, vec!["hk-2"]);
    }
}
