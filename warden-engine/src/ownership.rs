//! Ownership resolution for owned-scoped abilities.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Authority, Entity};

type OwnershipFn = dyn Fn(&Authority, &Entity) -> bool + Send + Sync;

/// Decides whether an authority owns a target row.
///
/// By default an entity is owned by the authority recorded as its `owner`.
/// Entity types with a different notion of ownership can register their own
/// strategy with [`Ownership::owned_via`].
#[derive(Clone, Default)]
pub struct Ownership {
    strategies: HashMap<String, Arc<OwnershipFn>>,
}

impl Ownership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `strategy` to resolve ownership of `entity_type` rows.
    pub fn owned_via<F>(mut self, entity_type: impl Into<String>, strategy: F) -> Self
    where
        F: Fn(&Authority, &Entity) -> bool + Send + Sync + 'static,
    {
        self.strategies
            .insert(entity_type.into().to_lowercase(), Arc::new(strategy));
        self
    }

    pub fn is_owned_by(&self, authority: &Authority, entity: &Entity) -> bool {
        match self.strategies.get(&entity.entity_type.to_lowercase()) {
            Some(strategy) => strategy(authority, entity),
            None => entity.owner.as_ref() == Some(authority),
        }
    }
}

impl std::fmt::Debug for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ownership")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_owner_attribute() {
        let ownership = Ownership::new();
        let post = Entity::new("post", 1).owned_by(Authority::user(5));

        assert!(ownership.is_owned_by(&Authority::user(5), &post));
        assert!(!ownership.is_owned_by(&Authority::user(6), &post));
        assert!(!ownership.is_owned_by(&Authority::role(5), &post));
        assert!(!ownership.is_owned_by(&Authority::user(5), &Entity::new("post", 2)));
    }

    #[test]
    fn test_custom_strategy() {
        // Users own their own user row.
        let ownership = Ownership::new().owned_via("User", |authority, entity| {
            authority == &Authority::user(entity.id)
        });

        assert!(ownership.is_owned_by(&Authority::user(3), &Entity::new("user", 3)));
        assert!(!ownership.is_owned_by(&Authority::user(3), &Entity::new("user", 4)));
    }
}
