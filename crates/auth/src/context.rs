use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use quartermaster_core::{BaseId, UserId};

use crate::Role;

/// Identity a request acts under.
///
/// Built once at the transport boundary from the authentication
/// collaborator's hand-off and passed **explicitly** into every workflow and
/// policy call. Nothing in the system reads identity from ambient state.
///
/// `home_base` is the base carried in the session claims. Policy rules that
/// must not trust session claims (the logistics-officer rule) re-fetch the
/// persisted base through [`crate::UserDirectory`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: UserId,
    pub role: Role,
    pub home_base: Option<BaseId>,
    /// Peer address of the call, recorded on audit events when known.
    pub origin: Option<IpAddr>,
}

impl CallerContext {
    pub fn new(user_id: UserId, role: Role, home_base: Option<BaseId>) -> Self {
        Self {
            user_id,
            role,
            home_base,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: IpAddr) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Base window a read runs under.
///
/// Non-admins are pinned to their own home base no matter what filter they
/// request; admins see everything unless they narrow the view themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Every base (admin without an explicit filter).
    All,
    /// A single base.
    Base(BaseId),
    /// No base at all; reads resolve to empty results. A non-admin whose
    /// identity carries no home base lands here.
    Empty,
}

impl ReadScope {
    /// Resolve the effective scope for a caller and an optional requested
    /// base filter.
    pub fn resolve(caller: &CallerContext, requested: Option<BaseId>) -> Self {
        if caller.is_admin() {
            match requested {
                Some(base) => ReadScope::Base(base),
                None => ReadScope::All,
            }
        } else {
            match caller.home_base {
                Some(base) => ReadScope::Base(base),
                None => ReadScope::Empty,
            }
        }
    }

    /// The base filter to hand a store query, when the scope reaches the
    /// store at all (`Empty` short-circuits before any query).
    pub fn base_filter(&self) -> Option<BaseId> {
        match self {
            ReadScope::Base(base) => Some(*base),
            ReadScope::All | ReadScope::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReadScope::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role, home_base: Option<BaseId>) -> CallerContext {
        CallerContext::new(UserId::new(), role, home_base)
    }

    #[test]
    fn admin_sees_all_bases_by_default() {
        let ctx = caller(Role::Admin, None);
        assert_eq!(ReadScope::resolve(&ctx, None), ReadScope::All);
    }

    #[test]
    fn admin_can_narrow_to_one_base() {
        let base = BaseId::new();
        let ctx = caller(Role::Admin, None);
        assert_eq!(ReadScope::resolve(&ctx, Some(base)), ReadScope::Base(base));
    }

    #[test]
    fn non_admin_is_pinned_to_home_base() {
        let home = BaseId::new();
        let elsewhere = BaseId::new();
        let ctx = caller(Role::BaseCommander, Some(home));
        // The requested filter is ignored for non-admins.
        assert_eq!(
            ReadScope::resolve(&ctx, Some(elsewhere)),
            ReadScope::Base(home)
        );
    }

    #[test]
    fn non_admin_without_home_base_reads_nothing() {
        let ctx = caller(Role::LogisticsOfficer, None);
        assert_eq!(ReadScope::resolve(&ctx, None), ReadScope::Empty);
        assert!(ReadScope::resolve(&ctx, None).is_empty());
    }
}
