//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Entity names used in not-found errors and audit payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Base,
    EquipmentType,
    User,
    Asset,
    Purchase,
    Transfer,
    Assignment,
    Expenditure,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Base => "base",
            Entity::EquipmentType => "equipment type",
            Entity::User => "user",
            Entity::Asset => "asset",
            Entity::Purchase => "purchase",
            Entity::Transfer => "transfer",
            Entity::Assignment => "assignment",
            Entity::Expenditure => "expenditure",
        }
    }
}

impl core::fmt::Display for Entity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State conflicts surfaced to callers.
///
/// The wording is deliberately vague: a transition attempt on a record that
/// is missing and one on a record that already left the expected state read
/// the same, so callers learn nothing about records outside their view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictKind {
    #[error("asset is not available for assignment")]
    AssetNotAvailable,

    #[error("asset is not available for transfer")]
    AssetNotTransferable,

    #[error("transfer not found or already processed")]
    TransferAlreadyProcessed,

    #[error("assignment not found or already returned")]
    AssignmentAlreadyReturned,
}

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation, policy,
/// state conflicts). Infrastructure failures arrive only through
/// [`DomainError::Persistence`], with the cause kept for logs and never shown
/// to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, zero quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Authorization failure. Wrong-role and wrong-base denials surface
    /// identically; the distinction lives in policy logs only.
    #[error("access denied")]
    Unauthorized,

    /// A record was not in the state the operation requires.
    #[error("{0}")]
    Conflict(ConflictKind),

    /// A requested record does not exist.
    #[error("{0} not found")]
    NotFound(Entity),

    /// A storage operation failed. The payload is the underlying cause,
    /// for logging; `Display` stays generic.
    #[error("storage failure")]
    Persistence(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(kind: ConflictKind) -> Self {
        Self::Conflict(kind)
    }

    pub fn not_found(entity: Entity) -> Self {
        Self::NotFound(entity)
    }

    pub fn persistence(cause: impl Into<String>) -> Self {
        Self::Persistence(cause.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_display_never_leaks_the_cause() {
        let err = DomainError::persistence("connection refused on 10.0.0.3");
        assert_eq!(err.to_string(), "storage failure");
    }

    #[test]
    fn conflict_wording_matches_for_missing_and_processed() {
        // Both paths must produce the same sentence so state is not leaked.
        let kind = ConflictKind::TransferAlreadyProcessed;
        assert_eq!(kind.to_string(), "transfer not found or already processed");
    }

    #[test]
    fn unauthorized_display_is_uniform() {
        assert_eq!(DomainError::Unauthorized.to_string(), "access denied");
    }
}
