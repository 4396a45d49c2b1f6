use core::str::FromStr;

use serde::{Deserialize, Serialize};

use quartermaster_core::DomainError;

/// Role of an authenticated caller.
///
/// The set is closed: every identity the authentication collaborator hands
/// over carries exactly one of these. Policy rules key off the role, so an
/// unknown role string is rejected at the boundary, never defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    BaseCommander,
    LogisticsOfficer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::BaseCommander => "base_commander",
            Role::LogisticsOfficer => "logistics_officer",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "base_commander" => Ok(Role::BaseCommander),
            "logistics_officer" => Ok(Role::LogisticsOfficer),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(
            "base_commander".parse::<Role>().unwrap(),
            Role::BaseCommander
        );
        assert_eq!(
            "logistics_officer".parse::<Role>().unwrap(),
            Role::LogisticsOfficer
        );
    }

    #[test]
    fn rejects_unknown_role() {
        let err = "quartermaster_general".parse::<Role>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Role::LogisticsOfficer).unwrap();
        assert_eq!(json, "\"logistics_officer\"");
    }
}
