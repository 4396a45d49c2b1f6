use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{BaseId, UserId};

use crate::Role;

/// Directory record of a user.
///
/// Identity issuance lives with the external authentication collaborator;
/// this record exists so policy can re-fetch a user's persisted home base
/// and so audit/report rows can name actors. Written only by seeding and
/// test plumbing in this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub home_base: Option<BaseId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, role: Role, home_base: Option<BaseId>) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            role,
            home_base,
            created_at: Utc::now(),
        }
    }
}
