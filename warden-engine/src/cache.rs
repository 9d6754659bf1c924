//! Tenant-scoped caching of ability sets and role lookups.
//!
//! Entries are written once with no expiry and only ever disappear through
//! explicit invalidation. Keys always carry the tenant tag, so one tenant's
//! invalidation never touches another tenant's entries.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{CacheError, EngineError};
use crate::scope::TenantScope;
use crate::types::{Ability, Authority, RolesLookup};

/// A key-value store that can hold entries forever.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Store a value with no expiry, replacing any previous value.
    fn forever(&self, key: &str, value: Value) -> Result<(), CacheError>;

    /// Remove a key. Removing an absent key is not an error.
    fn forget(&self, key: &str) -> Result<bool, CacheError>;

    /// A view of this store scoped to `tag`, if the store supports tags.
    fn tagged(&self, _tag: &str) -> Option<Arc<dyn TaggedStore>> {
        None
    }
}

/// A tag-scoped view of a cache store whose entries can be flushed at once.
pub trait TaggedStore: CacheStore {
    /// Remove every entry stored through this tag.
    fn flush(&self) -> Result<(), CacheError>;
}

/// How a tenant-wide refresh is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Flush the tenant's tag in one call.
    TagFlush,
    /// Forget the keys of every authority, one by one.
    Iterative,
}

enum CacheView {
    Tagged(Arc<dyn TaggedStore>),
    Direct(Arc<dyn CacheStore>),
}

impl CacheView {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        match self {
            CacheView::Tagged(store) => store.get(key),
            CacheView::Direct(store) => store.get(key),
        }
    }

    fn forever(&self, key: &str, value: Value) -> Result<(), CacheError> {
        match self {
            CacheView::Tagged(store) => store.forever(key, value),
            CacheView::Direct(store) => store.forever(key, value),
        }
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        match self {
            CacheView::Tagged(store) => store.forget(key),
            CacheView::Direct(store) => store.forget(key),
        }
    }
}

/// Cache of per-authority ability sets and role lookups.
pub struct AbilityCache {
    view: CacheView,
    tag: String,
}

impl AbilityCache {
    /// Base tag used when none is configured.
    pub const DEFAULT_TAG: &'static str = "warden";

    /// Wrap `store`, scoping it to the tenant tag when it supports tags.
    ///
    /// The invalidation strategy is fixed here: a store without tags can
    /// only be refreshed key by key.
    pub fn new(store: Arc<dyn CacheStore>, base_tag: &str, scope: &dyn TenantScope) -> Self {
        let tag = scope.append_to_cache_key(base_tag);

        let view = match store.tagged(&tag) {
            Some(tagged) => CacheView::Tagged(tagged),
            None => {
                debug!(tag = %tag, "cache store has no tag support, using iterative invalidation");
                CacheView::Direct(store)
            }
        };

        Self { view, tag }
    }

    /// The base tag with the tenant fragment appended.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn invalidation(&self) -> Invalidation {
        match self.view {
            CacheView::Tagged(_) => Invalidation::TagFlush,
            CacheView::Direct(_) => Invalidation::Iterative,
        }
    }

    /// `{tag}-abilities-{type}-{id}-{a|f}`
    pub fn abilities_key(&self, authority: &Authority, allowed: bool) -> String {
        [
            self.tag.as_str(),
            "abilities",
            authority.morph_type(),
            &authority.id.to_string(),
            if allowed { "a" } else { "f" },
        ]
        .join("-")
    }

    /// `{tag}-roles-{type}-{id}`
    pub fn roles_key(&self, authority: &Authority) -> String {
        [
            self.tag.as_str(),
            "roles",
            authority.morph_type(),
            &authority.id.to_string(),
        ]
        .join("-")
    }

    /// The authority's allowed (or forbidden) abilities, computing and
    /// storing them with `fresh` on a miss.
    pub fn abilities<F>(
        &self,
        authority: &Authority,
        allowed: bool,
        fresh: F,
    ) -> Result<Vec<Ability>, EngineError>
    where
        F: FnOnce() -> Result<Vec<Ability>, EngineError>,
    {
        let key = self.abilities_key(authority, allowed);

        if let Some(value) = self.view.get(&key)? {
            match deserialize_abilities(value) {
                Some(abilities) => {
                    debug!(key = %key, count = abilities.len(), "ability cache hit");
                    return Ok(abilities);
                }
                None => warn!(key = %key, "discarding malformed cached abilities"),
            }
        }

        let abilities = fresh()?;
        debug!(key = %key, count = abilities.len(), "ability cache miss");
        self.view.forever(&key, serialize_abilities(&abilities)?)?;

        Ok(abilities)
    }

    /// The authority's role lookup, computed once and kept until invalidated.
    pub fn roles_lookup<F>(&self, authority: &Authority, fresh: F) -> Result<RolesLookup, EngineError>
    where
        F: FnOnce() -> Result<RolesLookup, EngineError>,
    {
        self.sear(&self.roles_key(authority), fresh)
    }

    /// Get a cached value, or compute it and store it forever.
    fn sear<T, F>(&self, key: &str, fresh: F) -> Result<T, EngineError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Result<T, EngineError>,
    {
        if let Some(value) = self.view.get(key)? {
            match serde_json::from_value(value) {
                Ok(cached) => return Ok(cached),
                Err(e) => warn!(key = %key, error = %e, "discarding malformed cached value"),
            }
        }

        let value = fresh()?;
        self.view.forever(key, serde_json::to_value(&value)?)?;

        Ok(value)
    }

    /// Forget the three entries belonging to one authority.
    pub fn refresh_for(&self, authority: &Authority) -> Result<(), EngineError> {
        self.view.forget(&self.abilities_key(authority, true))?;
        self.view.forget(&self.abilities_key(authority, false))?;
        self.view.forget(&self.roles_key(authority))?;

        debug!(authority = %authority, "refreshed ability cache");
        Ok(())
    }

    /// Forget every entry of the current tenant.
    ///
    /// With tag support this is one flush and `authorities` is never called.
    /// Otherwise every authority it yields is refreshed in turn.
    pub fn refresh<F>(&self, authorities: F) -> Result<(), EngineError>
    where
        F: FnOnce() -> Result<Vec<Authority>, EngineError>,
    {
        match &self.view {
            CacheView::Tagged(store) => {
                store.flush()?;
                info!(tag = %self.tag, "flushed ability cache");
            }
            CacheView::Direct(_) => {
                let authorities = authorities()?;
                for authority in &authorities {
                    self.refresh_for(authority)?;
                }
                info!(tag = %self.tag, count = authorities.len(), "refreshed ability cache iteratively");
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for AbilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilityCache")
            .field("tag", &self.tag)
            .field("invalidation", &self.invalidation())
            .finish()
    }
}

/// Encode abilities as an array of flat attribute objects.
pub fn serialize_abilities(abilities: &[Ability]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(abilities)
}

/// Hydrate abilities from an array of flat attribute objects.
///
/// Returns `None` for anything that is not such an array.
pub fn deserialize_abilities(value: Value) -> Option<Vec<Ability>> {
    if !value.is_array() {
        return None;
    }
    serde_json::from_value(value).ok()
}
