use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four portal roles. Every user holds exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Support,
    Technician,
    Client,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Support, Role::Technician, Role::Client];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Technician => "technician",
            Role::Client => "client",
        }
    }

    /// Staff roles operate on every account; clients only on their own.
    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Client)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "support" => Ok(Role::Support),
            "technician" => Ok(Role::Technician),
            "client" => Ok(Role::Client),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Technician ".parse::<Role>().unwrap(), Role::Technician);
    }

    #[test]
    fn rejects_unknown_roles() {
        assert_eq!("manager".parse::<Role>(), Err(UnknownRole("manager".into())));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Support).unwrap(), "support");
    }
}
