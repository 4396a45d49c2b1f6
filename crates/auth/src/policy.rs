//! Write authorization for ledger workflows.
//!
//! Every mutating workflow call passes through [`AccessPolicy`] before any
//! transaction opens. The rules are ordered and the first match wins:
//!
//! 1. `admin` — allowed on any base.
//! 2. `base_commander` — allowed iff the session home base equals the
//!    target base.
//! 3. `logistics_officer` — allowed iff the **persisted** home base equals
//!    the target base. The persisted base is re-fetched from the user
//!    directory; session claims are not trusted for this rule, and a
//!    directory failure denies the call outright.
//! 4. Otherwise the caller lacks the role for the action.
//!
//! Wrong-role and wrong-base denials stay distinct here (they are logged),
//! but both collapse into the same uniform error at the surface.

use async_trait::async_trait;
use thiserror::Error;

use quartermaster_core::{BaseId, DomainError, UserId};

use crate::{CallerContext, Role};

/// Mutating operations the policy knows how to gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    CreatePurchase,
    UpdatePurchase,
    RequestTransfer,
    ApproveTransfer,
    CreateAssignment,
    ReturnAssignment,
}

impl WriteAction {
    /// Roles that may attempt the action at all. A caller outside this set
    /// is denied before any base comparison.
    pub fn allowed_roles(&self) -> &'static [Role] {
        const COMMAND: &[Role] = &[Role::Admin, Role::BaseCommander];
        const LOGISTICS: &[Role] = &[Role::Admin, Role::BaseCommander, Role::LogisticsOfficer];
        match self {
            WriteAction::CreatePurchase
            | WriteAction::UpdatePurchase
            | WriteAction::ApproveTransfer
            | WriteAction::CreateAssignment
            | WriteAction::ReturnAssignment => COMMAND,
            WriteAction::RequestTransfer => LOGISTICS,
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::CreatePurchase => "create_purchase",
            WriteAction::UpdatePurchase => "update_purchase",
            WriteAction::RequestTransfer => "request_transfer",
            WriteAction::ApproveTransfer => "approve_transfer",
            WriteAction::CreateAssignment => "create_assignment",
            WriteAction::ReturnAssignment => "return_assignment",
        }
    }
}

impl core::fmt::Display for WriteAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denial (or failure) of a policy check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The caller's role may not attempt this action.
    #[error("role '{role}' may not {action}")]
    InsufficientRole { role: Role, action: WriteAction },

    /// The caller's base does not cover the target base.
    #[error("caller base does not cover base {target}")]
    WrongBase { target: BaseId },

    /// The persisted home base could not be fetched. Never a silent allow.
    #[error("user directory lookup failed: {0}")]
    Directory(String),
}

impl From<PolicyError> for DomainError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InsufficientRole { .. } | PolicyError::WrongBase { .. } => {
                DomainError::Unauthorized
            }
            PolicyError::Directory(cause) => DomainError::Persistence(cause),
        }
    }
}

/// Failure while resolving a user's persisted record.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DirectoryError(pub String);

/// Source of persisted user records (backed by the users table).
///
/// `Ok(None)` means the user has no persisted home base, including the case
/// where the user record itself is missing. Both deny the officer rule.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn home_base_of(&self, user: UserId) -> Result<Option<BaseId>, DirectoryError>;
}

#[async_trait]
impl<D> UserDirectory for std::sync::Arc<D>
where
    D: UserDirectory + ?Sized,
{
    async fn home_base_of(&self, user: UserId) -> Result<Option<BaseId>, DirectoryError> {
        (**self).home_base_of(user).await
    }
}

/// Evaluate the ordered rules with the persisted home base already resolved.
///
/// No IO, no panics. Callers normally go through
/// [`AccessPolicy::authorize_write`], which supplies `persisted_home` for
/// logistics officers and leaves it `None` for everyone else.
pub fn evaluate(
    caller: &CallerContext,
    action: WriteAction,
    target_base: BaseId,
    persisted_home: Option<BaseId>,
) -> Result<(), PolicyError> {
    if !action.allows(caller.role) {
        return Err(PolicyError::InsufficientRole {
            role: caller.role,
            action,
        });
    }

    match caller.role {
        Role::Admin => Ok(()),
        Role::BaseCommander => {
            if caller.home_base == Some(target_base) {
                Ok(())
            } else {
                Err(PolicyError::WrongBase {
                    target: target_base,
                })
            }
        }
        Role::LogisticsOfficer => {
            if persisted_home == Some(target_base) {
                Ok(())
            } else {
                Err(PolicyError::WrongBase {
                    target: target_base,
                })
            }
        }
    }
}

/// Policy front door for workflows.
#[derive(Debug, Clone)]
pub struct AccessPolicy<D> {
    directory: D,
}

impl<D> AccessPolicy<D>
where
    D: UserDirectory,
{
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Check whether `caller` may perform `action` against `target_base`.
    pub async fn authorize_write(
        &self,
        caller: &CallerContext,
        action: WriteAction,
        target_base: BaseId,
    ) -> Result<(), PolicyError> {
        if !action.allows(caller.role) {
            let err = PolicyError::InsufficientRole {
                role: caller.role,
                action,
            };
            tracing::debug!(user = %caller.user_id, %action, %target_base, "write denied: {err}");
            return Err(err);
        }

        let persisted_home = if caller.role == Role::LogisticsOfficer {
            self.directory
                .home_base_of(caller.user_id)
                .await
                .map_err(|e| PolicyError::Directory(e.to_string()))?
        } else {
            None
        };

        match evaluate(caller, action, target_base, persisted_home) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!(user = %caller.user_id, %action, %target_base, "write denied: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role, home_base: Option<BaseId>) -> CallerContext {
        CallerContext::new(UserId::new(), role, home_base)
    }

    #[test]
    fn admin_writes_anywhere() {
        let target = BaseId::new();
        let ctx = caller(Role::Admin, None);
        assert!(evaluate(&ctx, WriteAction::CreatePurchase, target, None).is_ok());
    }

    #[test]
    fn commander_writes_only_on_home_base() {
        let home = BaseId::new();
        let other = BaseId::new();
        let ctx = caller(Role::BaseCommander, Some(home));

        assert!(evaluate(&ctx, WriteAction::CreatePurchase, home, None).is_ok());
        let err = evaluate(&ctx, WriteAction::CreatePurchase, other, None).unwrap_err();
        assert!(matches!(err, PolicyError::WrongBase { .. }));
    }

    #[test]
    fn officer_rule_uses_persisted_base_not_session() {
        let target = BaseId::new();
        // Session claims say the officer belongs to the target base, but the
        // directory says otherwise. The persisted value wins.
        let ctx = caller(Role::LogisticsOfficer, Some(target));

        let err =
            evaluate(&ctx, WriteAction::RequestTransfer, target, Some(BaseId::new())).unwrap_err();
        assert!(matches!(err, PolicyError::WrongBase { .. }));

        assert!(evaluate(&ctx, WriteAction::RequestTransfer, target, Some(target)).is_ok());
    }

    #[test]
    fn officer_without_persisted_base_is_denied() {
        let target = BaseId::new();
        let ctx = caller(Role::LogisticsOfficer, Some(target));
        let err = evaluate(&ctx, WriteAction::RequestTransfer, target, None).unwrap_err();
        assert!(matches!(err, PolicyError::WrongBase { .. }));
    }

    #[test]
    fn role_gate_runs_before_base_comparison() {
        let home = BaseId::new();
        let ctx = caller(Role::LogisticsOfficer, Some(home));
        // Officers may request transfers but never approve them, even for
        // their own base.
        let err = evaluate(&ctx, WriteAction::ApproveTransfer, home, Some(home)).unwrap_err();
        assert!(matches!(err, PolicyError::InsufficientRole { .. }));
    }

    #[test]
    fn denials_map_to_uniform_domain_error() {
        let err: DomainError = PolicyError::InsufficientRole {
            role: Role::LogisticsOfficer,
            action: WriteAction::CreateAssignment,
        }
        .into();
        assert_eq!(err, DomainError::Unauthorized);

        let err: DomainError = PolicyError::WrongBase {
            target: BaseId::new(),
        }
        .into();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn directory_failure_is_fatal_not_a_silent_allow() {
        let err: DomainError = PolicyError::Directory("users table unreachable".into()).into();
        assert!(matches!(err, DomainError::Persistence(_)));
    }
}
