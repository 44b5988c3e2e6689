use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adportal_core::{DomainResult, Entity, FieldErrors, VpsId};

/// A host may carry this many accounts before new logins are refused.
pub const MAX_ACCOUNTS_PER_HOST: usize = 10;

const MAX_FIELD_LEN: usize = 48;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vps {
    pub id: VpsId,
    pub name: String,
    pub instance_id: Option<String>,
    pub provider: String,
    pub country: String,
    pub ip_addr: Option<String>,
    pub is_deleted: bool,
    pub login: String,
    pub password: String,
    pub api_key: String,
    pub api_secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpsDraft {
    pub name: String,
    #[serde(default)]
    pub instance_id: Option<String>,
    pub provider: String,
    pub country: String,
    #[serde(default)]
    pub ip_addr: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub login: String,
    pub password: String,
}

impl VpsDraft {
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        let required = [
            ("name", &self.name),
            ("provider", &self.provider),
            ("country", &self.country),
            ("login", &self.login),
            ("password", &self.password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.add(field, "This field is required.");
            } else if value.chars().count() > MAX_FIELD_LEN {
                errors.add(field, format!("Field cannot be longer than {MAX_FIELD_LEN} characters."));
            }
        }
        for (field, value) in [("instance_id", &self.instance_id), ("ip_addr", &self.ip_addr)] {
            if value.as_ref().is_some_and(|v| v.chars().count() > MAX_FIELD_LEN) {
                errors.add(field, format!("Field cannot be longer than {MAX_FIELD_LEN} characters."));
            }
        }
        errors.into_result()
    }
}

/// What a host needs to know about one of its accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostedAccount<'a> {
    /// Status value, e.g. `"active"`.
    pub status: &'a str,
    /// Suspended or abandoned.
    pub is_dead: bool,
    pub login: Option<&'a str>,
}

/// Status value → account count.
pub type StatusTally = BTreeMap<String, usize>;

impl Vps {
    /// A new host with freshly generated ingestion credentials.
    pub fn create(id: VpsId, draft: VpsDraft, now: DateTime<Utc>) -> Self {
        let mut vps = Self {
            id,
            name: String::new(),
            instance_id: None,
            provider: String::new(),
            country: String::new(),
            ip_addr: None,
            is_deleted: false,
            login: String::new(),
            password: String::new(),
            api_key: generate_credential(),
            api_secret: generate_credential(),
            created_at: now,
            updated_at: now,
        };
        vps.update(draft, now);
        vps
    }

    /// Credentials are kept across edits.
    pub fn update(&mut self, draft: VpsDraft, now: DateTime<Utc>) {
        self.name = draft.name.trim().to_string();
        self.instance_id = draft.instance_id;
        self.provider = draft.provider.trim().to_string();
        self.country = draft.country.trim().to_string();
        self.ip_addr = draft.ip_addr;
        self.is_deleted = draft.is_deleted;
        self.login = draft.login;
        self.password = draft.password;
        self.updated_at = now;
    }

    pub fn regenerate_credentials(&mut self, now: DateTime<Utc>) {
        self.api_key = generate_credential();
        self.api_secret = generate_credential();
        self.updated_at = now;
    }

    pub fn matches_credentials(&self, key: &str, secret: &str) -> bool {
        self.api_key == key && self.api_secret == secret
    }

    pub fn is_aws(&self) -> bool {
        self.provider.to_ascii_lowercase().starts_with("aws")
    }

    pub fn alive_count(accounts: &[HostedAccount<'_>]) -> usize {
        accounts.iter().filter(|a| !a.is_dead).count()
    }

    pub fn alive_statuses(accounts: &[HostedAccount<'_>]) -> StatusTally {
        tally(accounts.iter().filter(|a| !a.is_dead))
    }

    pub fn dead_statuses(accounts: &[HostedAccount<'_>]) -> StatusTally {
        tally(accounts.iter().filter(|a| a.is_dead))
    }

    /// Has accounts, none of them alive: the machine can be given back.
    pub fn is_releasable(&self, accounts: &[HostedAccount<'_>]) -> bool {
        !self.is_deleted && !accounts.is_empty() && Self::alive_count(accounts) == 0
    }

    /// Refuse another account once the host is past capacity, unless the
    /// account's login already runs there.
    pub fn check_capacity(&self, accounts: &[HostedAccount<'_>], login: Option<&str>) -> Result<(), String> {
        if accounts.len() <= MAX_ACCOUNTS_PER_HOST {
            return Ok(());
        }
        let login_present = login.is_some_and(|l| accounts.iter().any(|a| a.login == Some(l)));
        if login_present {
            Ok(())
        } else {
            Err(format!("{} overloaded: Use another one.", self.name))
        }
    }
}

impl core::fmt::Display for Vps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Entity for Vps {
    type Id = VpsId;

    fn id(&self) -> VpsId {
        self.id
    }
}

fn generate_credential() -> String {
    Uuid::new_v4().simple().to_string()
}

fn tally<'a>(accounts: impl Iterator<Item = &'a HostedAccount<'a>>) -> StatusTally {
    let mut out = StatusTally::new();
    for account in accounts {
        *out.entry(account.status.to_string()).or_default() += 1;
    }
    out
}

/// How an account's hosts read in a table cell: the first AWS host if there
/// is one, otherwise every host name sorted and comma separated.
pub fn display_hosts<'a>(hosts: impl IntoIterator<Item = &'a Vps>) -> String {
    let hosts: Vec<&Vps> = hosts.into_iter().collect();
    if let Some(aws) = hosts.iter().find(|h| h.is_aws()) {
        return aws.name.clone();
    }
    let mut names: Vec<&str> = hosts.iter().map(|h| h.name.as_str()).collect();
    names.sort_unstable();
    names.join(", ")
}
