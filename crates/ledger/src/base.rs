use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{BaseId, UserId};

/// A military base holding assets. Reference data; never deleted in scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
    pub id: BaseId,
    pub name: String,
    pub location: String,
    pub commander: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Base {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: BaseId::new(),
            name: name.into(),
            location: location.into(),
            commander: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_commander(mut self, commander: UserId) -> Self {
        self.commander = Some(commander);
        self
    }
}
