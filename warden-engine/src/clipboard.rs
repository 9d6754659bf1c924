//! The clipboard: resolves ability checks for an authority.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{AbilityCache, CacheStore};
use crate::cleanup::Cleanup;
use crate::error::EngineError;
use crate::identifiers;
use crate::ownership::Ownership;
use crate::scope::TenantScope;
use crate::store::AbilityStore;
use crate::types::{
    Ability, AbilityId, Authority, AuthorityKind, Decision, RoleCheck, RoleRef, RolesLookup,
    Target,
};

/// Decides what an authority may do.
///
/// Forbidden abilities are consulted first and win over any allow. Ability
/// sets and role lookups go through the tenant-scoped cache when one is
/// configured, and straight to the store otherwise.
///
/// The clipboard is generic over an `AbilityStore`, so any persistence layer
/// that honours the store contract can back it.
pub struct Clipboard<S: AbilityStore> {
    store: S,
    scope: Arc<dyn TenantScope>,
    ownership: Ownership,
    cache: Option<AbilityCache>,
}

impl<S: AbilityStore> Clipboard<S> {
    /// Create a clipboard that reads the store on every check.
    pub fn new(store: S, scope: Arc<dyn TenantScope>) -> Self {
        Self {
            store,
            scope,
            ownership: Ownership::default(),
            cache: None,
        }
    }

    /// Create a clipboard caching through `cache` under the default tag.
    pub fn cached(store: S, scope: Arc<dyn TenantScope>, cache: Arc<dyn CacheStore>) -> Self {
        Self::cached_with_tag(store, scope, cache, AbilityCache::DEFAULT_TAG)
    }

    /// Create a clipboard caching through `cache` under `tag`.
    pub fn cached_with_tag(
        store: S,
        scope: Arc<dyn TenantScope>,
        cache: Arc<dyn CacheStore>,
        tag: &str,
    ) -> Self {
        let cache = AbilityCache::new(cache, tag, scope.as_ref());
        Self {
            store,
            scope,
            ownership: Ownership::default(),
            cache: Some(cache),
        }
    }

    /// Resolve ownership of owned-scoped abilities with `ownership`.
    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }

    /// Drop the cache; every check reads the store.
    pub fn dont_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scope(&self) -> &dyn TenantScope {
        self.scope.as_ref()
    }

    pub fn cache(&self) -> Option<&AbilityCache> {
        self.cache.as_ref()
    }

    // =========================================================================
    // Ability checks
    // =========================================================================

    /// Whether the authority is allowed `ability` on `target`.
    ///
    /// Anything short of an explicit allow is a denial.
    pub fn check(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> Result<bool, EngineError> {
        Ok(self.check_get_id(authority, ability, target)?.is_allowed())
    }

    /// Resolve `ability` on `target` for the authority.
    ///
    /// 1. Compile the candidate identifiers for the ability and target
    /// 2. Match them against the forbidden abilities; any match is final
    /// 3. Match them against the allowed abilities and report the matched id
    pub fn check_get_id(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> Result<Decision, EngineError> {
        let candidates = identifiers::compile(ability, target);

        let forbidden = self.forbidden_abilities(authority)?;
        if let Some(id) = self.find_matching_ability(&forbidden, &candidates, authority, target) {
            debug!(authority = %authority, ability, forbidden_id = %id, "ability forbidden");
            return Ok(Decision::Forbidden);
        }

        let allowed = self.abilities(authority)?;
        let decision = match self.find_matching_ability(&allowed, &candidates, authority, target) {
            Some(id) => Decision::Allowed(id),
            None => Decision::Unmatched,
        };

        debug!(authority = %authority, ability, decision = ?decision, "ability checked");
        Ok(decision)
    }

    /// Match directly, then, for a target the authority owns, against the
    /// owned-scoped identifiers.
    fn find_matching_ability(
        &self,
        abilities: &[Ability],
        candidates: &[String],
        authority: &Authority,
        target: Option<&Target>,
    ) -> Option<AbilityId> {
        let ability_map = identifiers::ability_map(abilities);

        if let Some(id) = identifiers::matched_ability_id(&ability_map, candidates) {
            return Some(id);
        }

        if self.is_owned_by(authority, target) {
            return identifiers::matched_ability_id(
                &ability_map,
                &identifiers::owned(candidates),
            );
        }

        None
    }

    fn is_owned_by(&self, authority: &Authority, target: Option<&Target>) -> bool {
        match target {
            Some(Target::Entity(entity)) => self.ownership.is_owned_by(authority, entity),
            _ => false,
        }
    }

    // =========================================================================
    // Ability and role sets
    // =========================================================================

    /// The authority's allowed abilities.
    pub fn abilities(&self, authority: &Authority) -> Result<Vec<Ability>, EngineError> {
        self.load_abilities(authority, true)
    }

    /// The authority's forbidden abilities.
    pub fn forbidden_abilities(&self, authority: &Authority) -> Result<Vec<Ability>, EngineError> {
        self.load_abilities(authority, false)
    }

    fn load_abilities(
        &self,
        authority: &Authority,
        allowed: bool,
    ) -> Result<Vec<Ability>, EngineError> {
        match &self.cache {
            Some(cache) => {
                cache.abilities(authority, allowed, || self.fresh_abilities(authority, allowed))
            }
            None => self.fresh_abilities(authority, allowed),
        }
    }

    /// The authority's abilities read from the store, bypassing the cache.
    pub fn fresh_abilities(
        &self,
        authority: &Authority,
        allowed: bool,
    ) -> Result<Vec<Ability>, EngineError> {
        Ok(self
            .store
            .abilities_for(authority, !allowed, self.scope.as_ref())?)
    }

    /// The roles assigned to the authority.
    pub fn roles_lookup(&self, authority: &Authority) -> Result<RolesLookup, EngineError> {
        let fresh = || -> Result<RolesLookup, EngineError> {
            Ok(self.store.roles_lookup(authority, self.scope.as_ref())?)
        };

        match &self.cache {
            Some(cache) => cache.roles_lookup(authority, fresh),
            None => fresh(),
        }
    }

    /// Names of the roles assigned to the authority.
    pub fn roles(&self, authority: &Authority) -> Result<Vec<String>, EngineError> {
        Ok(self.roles_lookup(authority)?.names())
    }

    /// Check the authority's roles against `roles`, combined per `check`.
    pub fn check_role(
        &self,
        authority: &Authority,
        roles: &[RoleRef],
        check: RoleCheck,
    ) -> Result<bool, EngineError> {
        let lookup = self.roles_lookup(authority)?;

        let held = roles
            .iter()
            .filter(|role| match role {
                RoleRef::Id(id) => lookup.has_id(*id),
                RoleRef::Name(name) => lookup.has_name(name),
            })
            .count();

        Ok(match check {
            RoleCheck::Any => held > 0,
            RoleCheck::All => held == roles.len(),
            RoleCheck::None => held == 0,
        })
    }

    // =========================================================================
    // Cache invalidation
    // =========================================================================

    /// Forget the cached entries of one authority.
    pub fn refresh_for(&self, authority: &Authority) -> Result<(), EngineError> {
        match &self.cache {
            Some(cache) => cache.refresh_for(authority),
            None => Ok(()),
        }
    }

    /// Forget every cached entry of the current tenant.
    pub fn refresh(&self) -> Result<(), EngineError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        cache.refresh(|| {
            let mut authorities = Vec::new();
            for kind in AuthorityKind::ALL {
                authorities.extend(self.store.authorities(kind, self.scope.as_ref())?);
            }
            Ok(authorities)
        })
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Cleanup of stale ability records in the current tenant.
    ///
    /// Cleanup reads the store directly; call [`Clipboard::refresh`] once it
    /// has run.
    pub fn cleanup(&self) -> Cleanup<'_, S> {
        Cleanup::new(&self.store, self.scope.as_ref())
    }
}

impl<S: AbilityStore> std::fmt::Debug for Clipboard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clipboard")
            .field("scope", &self.scope.value())
            .field("ownership", &self.ownership)
            .field("cache", &self.cache)
            .finish()
    }
}
