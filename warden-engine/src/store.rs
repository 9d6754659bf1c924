//! The storage boundary.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::StoreError;
use crate::scope::TenantScope;
use crate::types::{Ability, AbilityId, Authority, AuthorityKind, Permission, RolesLookup};

/// Persistent storage of abilities, roles and their associations.
///
/// Every read takes the active tenant scope and must apply its filters.
/// Ability lists come back in primary key order, which is what settles
/// ties when two abilities match the same check.
pub trait AbilityStore: Send + Sync {
    /// The abilities granted to an authority, directly or through its
    /// roles, with the given `forbidden` flag. De-duplicated.
    fn abilities_for(
        &self,
        authority: &Authority,
        forbidden: bool,
        scope: &dyn TenantScope,
    ) -> Result<Vec<Ability>, StoreError>;

    /// The roles assigned to an authority.
    fn roles_lookup(
        &self,
        authority: &Authority,
        scope: &dyn TenantScope,
    ) -> Result<RolesLookup, StoreError>;

    /// Every authority of one kind.
    fn authorities(
        &self,
        kind: AuthorityKind,
        scope: &dyn TenantScope,
    ) -> Result<Vec<Authority>, StoreError>;

    /// Every ability record.
    fn abilities(&self, scope: &dyn TenantScope) -> Result<Vec<Ability>, StoreError>;

    /// Every ability association, for users and roles alike.
    fn permissions(&self, scope: &dyn TenantScope) -> Result<Vec<Permission>, StoreError>;

    /// Which of `ids` still exist as rows of `entity_type`.
    fn existing_entities(
        &self,
        entity_type: &str,
        ids: &BTreeSet<u64>,
    ) -> Result<BTreeSet<u64>, StoreError>;

    /// Delete ability records in bulk, returning how many were removed.
    fn delete_abilities(&self, ids: &[AbilityId]) -> Result<usize, StoreError>;
}

impl<T: AbilityStore + ?Sized> AbilityStore for Arc<T> {
    fn abilities_for(
        &self,
        authority: &Authority,
        forbidden: bool,
        scope: &dyn TenantScope,
    ) -> Result<Vec<Ability>, StoreError> {
        (**self).abilities_for(authority, forbidden, scope)
    }

    fn roles_lookup(
        &self,
        authority: &Authority,
        scope: &dyn TenantScope,
    ) -> Result<RolesLookup, StoreError> {
        (**self).roles_lookup(authority, scope)
    }

    fn authorities(
        &self,
        kind: AuthorityKind,
        scope: &dyn TenantScope,
    ) -> Result<Vec<Authority>, StoreError> {
        (**self).authorities(kind, scope)
    }

    fn abilities(&self, scope: &dyn TenantScope) -> Result<Vec<Ability>, StoreError> {
        (**self).abilities(scope)
    }

    fn permissions(&self, scope: &dyn TenantScope) -> Result<Vec<Permission>, StoreError> {
        (**self).permissions(scope)
    }

    fn existing_entities(
        &self,
        entity_type: &str,
        ids: &BTreeSet<u64>,
    ) -> Result<BTreeSet<u64>, StoreError> {
        (**self).existing_entities(entity_type, ids)
    }

    fn delete_abilities(&self, ids: &[AbilityId]) -> Result<usize, StoreError> {
        (**self).delete_abilities(ids)
    }
}
