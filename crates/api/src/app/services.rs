//! Infrastructure wiring: event store, dispatcher, projection and record stores.

use std::sync::Arc;

use chrono::{Duration, Utc};

use adportal_accounts::{Access, Account, AccountCommand, AccountLookups, FormLookups};
use adportal_auth::{Hs256JwtValidator, JwtClaims, JwtError, NewUser, Principal, Role, User};
use adportal_core::{AccountId, UserId, VendorId, VpsId};
use adportal_hosts::Vps;
use adportal_infra::{
    AccountDirectory, CommandDispatcher, DispatchError, EntityStore, EventStore, InMemoryEntityStore,
    InMemoryEventStore, StoredEvent, ACCOUNT_AGGREGATE,
};
use adportal_vendors::{is_granted, BankAccount, Permission, Transfer, Vendor};

use crate::config::AppConfig;

pub struct AppServices {
    pub config: AppConfig,
    pub jwt: Arc<Hs256JwtValidator>,
    dispatcher: CommandDispatcher<Arc<dyn EventStore>>,
    pub directory: AccountDirectory,
    pub users: InMemoryEntityStore<User>,
    pub vendors: InMemoryEntityStore<Vendor>,
    pub permissions: InMemoryEntityStore<Permission>,
    pub bank_accounts: InMemoryEntityStore<BankAccount>,
    pub transfers: InMemoryEntityStore<Transfer>,
    pub hosts: InMemoryEntityStore<Vps>,
    pub accesses: InMemoryEntityStore<Access>,
}

impl AppServices {
    pub fn new(config: AppConfig, store: Arc<dyn EventStore>) -> Self {
        let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
        Self {
            config,
            jwt,
            dispatcher: CommandDispatcher::new(store),
            directory: AccountDirectory::new(),
            users: InMemoryEntityStore::new(),
            vendors: InMemoryEntityStore::new(),
            permissions: InMemoryEntityStore::new(),
            bank_accounts: InMemoryEntityStore::new(),
            transfers: InMemoryEntityStore::new(),
            hosts: InMemoryEntityStore::new(),
            accesses: InMemoryEntityStore::new(),
        }
    }

    /// Replay stored account streams into the directory.
    pub async fn rebuild(&self) -> anyhow::Result<usize> {
        self.directory.rebuild(self.dispatcher.store()).await
    }

    /// Dispatch an account command and fold the committed events into the
    /// directory before returning.
    pub async fn dispatch_account(&self, command: AccountCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        let aggregate_id = command.account_id().aggregate_id();
        let committed = self
            .dispatcher
            .dispatch(aggregate_id, ACCOUNT_AGGREGATE, command, |id| {
                Account::empty(AccountId::new(id.get()))
            })
            .await?;
        self.fold_committed(&committed).await?;
        Ok(committed)
    }

    /// Fold committed events into the directory. On failure the directory is
    /// rebuilt from the store, which already holds them.
    async fn fold_committed(&self, committed: &[StoredEvent]) -> Result<(), DispatchError> {
        let Err(e) = self.directory.apply_stored(committed) else {
            return Ok(());
        };
        tracing::error!(error = %e, "account directory failed to apply committed events; rebuilding");
        let replayed = self
            .rebuild()
            .await
            .map_err(|e| DispatchError::Deserialize(format!("account directory rebuild failed: {e}")))?;
        tracing::info!(events = replayed, "account directory rebuilt");
        Ok(())
    }

    /// Seed the configured admin unless a user with that name exists.
    pub fn bootstrap_admin(&self) -> anyhow::Result<()> {
        let Some(admin) = self.config.admin.clone() else {
            return Ok(());
        };
        if self.find_user(&admin.username).is_some() {
            return Ok(());
        }
        let user = User::create(
            self.users.next_id(),
            NewUser {
                username: admin.username,
                password: admin.password,
                name: None,
                is_enabled: true,
                roles: vec![Role::Admin],
                budget_url: None,
            },
            Utc::now(),
        )?;
        tracing::info!(user_id = %user.id, username = %user.username, "bootstrapped admin user");
        self.users.upsert(user);
        Ok(())
    }

    pub fn find_user(&self, username: &str) -> Option<User> {
        self.users.filter(|u| u.username == username).into_iter().next()
    }

    pub fn issue_token(&self, principal: Principal) -> Result<String, JwtError> {
        let now = Utc::now();
        self.jwt.issue(&JwtClaims {
            sub: principal.user_id,
            role: principal.role,
            issued_at: now,
            expires_at: now + Duration::minutes(self.config.token_ttl_minutes),
        })
    }

    /// Live accounts hosted on `vps`.
    pub fn accounts_on_host(&self, vps: VpsId) -> Vec<Account> {
        self.directory
            .list()
            .into_iter()
            .filter(|a| a.fields().vps_ids.contains(&vps))
            .collect()
    }

    pub fn accounts_of_vendor(&self, vendor: VendorId) -> Vec<Account> {
        self.directory
            .list()
            .into_iter()
            .filter(|a| a.fields().vendor_id == Some(vendor))
            .collect()
    }

    pub fn accesses_of(&self, account: AccountId) -> Vec<Access> {
        self.accesses.filter(|a| a.account_id == account)
    }

    pub fn user_display(&self, id: UserId) -> String {
        self.user_name(id).unwrap_or_else(|| id.to_string())
    }
}

impl AccountLookups for AppServices {
    fn user_name(&self, id: UserId) -> Option<String> {
        self.users.get(id).map(|u| u.display_name().to_string())
    }

    fn vendor(&self, id: VendorId) -> Option<Vendor> {
        self.vendors.get(id)
    }

    fn vendor_permissions(&self, vendor: VendorId) -> Vec<Permission> {
        self.permissions.filter(|p| p.vendor_id == vendor)
    }

    fn hosts(&self, ids: &[VpsId]) -> Vec<Vps> {
        ids.iter().filter_map(|id| self.hosts.get(*id)).collect()
    }
}

impl FormLookups for AppServices {
    fn adwords_id_taken(&self, adwords_id: &str, except: Option<AccountId>) -> bool {
        self.directory.adwords_id_taken(adwords_id, except)
    }

    fn permission_exists(&self, vendor: VendorId, client: UserId) -> bool {
        is_granted(&self.permissions.list(), Some(vendor), Some(client))
    }

    fn client_exists(&self, id: UserId) -> bool {
        self.users.get(id).is_some_and(|u| u.has_role(Role::Client))
    }

    fn vendor_exists(&self, id: VendorId) -> bool {
        self.vendors.get(id).is_some()
    }

    fn vps(&self, id: VpsId) -> Option<Vps> {
        self.hosts.get(id)
    }

    fn accounts_on(&self, vps: VpsId) -> Vec<Account> {
        self.accounts_on_host(vps)
    }
}

/// Wire the stores for `config`: Postgres when built with the `postgres`
/// feature and `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: AppConfig) -> anyhow::Result<AppServices> {
    let store = event_store(&config).await?;
    let services = AppServices::new(config, store);
    let replayed = services.rebuild().await?;
    if replayed > 0 {
        tracing::info!(events = replayed, "rebuilt account directory");
    }
    services.bootstrap_admin()?;
    Ok(services)
}

#[cfg(feature = "postgres")]
async fn event_store(config: &AppConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = adportal_infra::PostgresEventStore::connect(url).await?;
            tracing::info!("using postgres event store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory event store");
            Ok(Arc::new(InMemoryEventStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn event_store(config: &AppConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
    }
    Ok(Arc::new(InMemoryEventStore::new()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use adportal_accounts::{Attribute, CreateAccount, FieldValue};
    use serde_json::json;

    use super::*;

    fn create(id: i64) -> AccountCommand {
        let mut values = BTreeMap::new();
        values.insert(Attribute::AdwordsId, FieldValue::Text(format!("123-456-{id:04}")));
        AccountCommand::Create(CreateAccount {
            account_id: AccountId::new(id),
            values,
            actor: None,
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn dispatch_folds_committed_events_into_directory() {
        let services = AppServices::new(AppConfig::default(), Arc::new(InMemoryEventStore::new()));
        services.dispatch_account(create(1)).await.unwrap();
        assert!(services.directory.get(AccountId::new(1)).is_some());
    }

    #[tokio::test]
    async fn unfoldable_commit_rebuilds_directory_from_store() {
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
        let writer = AppServices::new(AppConfig::default(), store.clone());
        let committed = writer.dispatch_account(create(1)).await.unwrap();

        // A second instance on the same store whose directory never saw the commit.
        let reader = AppServices::new(AppConfig::default(), store);
        assert!(reader.directory.get(AccountId::new(1)).is_none());

        let mut broken = committed[0].clone();
        broken.sequence_number += 1;
        broken.payload = json!({ "not": "an account event" });
        reader.fold_committed(&[broken]).await.unwrap();

        assert!(reader.directory.get(AccountId::new(1)).is_some());
    }
}
