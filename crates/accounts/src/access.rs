use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adportal_core::{AccessId, AccountId, Entity, UserId};

/// A user opened an account's detail screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub id: AccessId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl Access {
    pub fn new(id: AccessId, user_id: UserId, account_id: AccountId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            account_id,
            created_at,
        }
    }
}

impl Entity for Access {
    type Id = AccessId;

    fn id(&self) -> AccessId {
        self.id
    }
}
