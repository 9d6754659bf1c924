//! In-memory ability store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use warden_engine::{
    Ability, AbilityId, AbilityStore, Authority, AuthorityKind, Permission, Role, RolesLookup,
    StoreError, TenantScope,
};

use crate::config::{AbilityConfig, AssignedRole, Settings, StoreConfig, UserConfig};

/// In-memory implementation of the ability store.
///
/// Tables are kept in primary key order, so ability lists come back sorted
/// by id. Deleting an ability also deletes its associations. Target rows are
/// tracked per entity type for missing-model cleanup; users and roles double
/// as the `user` and `role` target types.
pub struct MemoryStore {
    settings: Settings,
    pub(crate) state: RwLock<State>,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) users: BTreeMap<u64, UserConfig>,
    pub(crate) roles: BTreeMap<u64, Role>,
    pub(crate) abilities: BTreeMap<AbilityId, Ability>,
    pub(crate) permissions: Vec<Permission>,
    pub(crate) assigned_roles: Vec<AssignedRole>,
    pub(crate) entities: BTreeMap<String, BTreeSet<u64>>,
}

impl State {
    pub(crate) fn next_ability_id(&self) -> AbilityId {
        AbilityId(self.abilities.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    pub(crate) fn next_user_id(&self) -> u64 {
        self.users.keys().next_back().map_or(1, |id| id + 1)
    }

    pub(crate) fn next_role_id(&self) -> u64 {
        self.roles.keys().next_back().map_or(1, |id| id + 1)
    }

    /// Ids of the roles assigned to `authority` that the scope can see.
    fn role_ids(&self, authority: &Authority, scope: &dyn TenantScope) -> BTreeSet<u64> {
        self.assigned_roles
            .iter()
            .filter(|a| a.authority == *authority && scope.admits_relation(a.scope.as_deref()))
            .map(|a| a.role_id)
            .filter(|id| {
                self.roles
                    .get(id)
                    .is_some_and(|r| scope.admits_model(r.scope.as_deref()))
            })
            .collect()
    }
}

impl MemoryStore {
    /// Create a store from a parsed configuration.
    pub fn from_config(config: StoreConfig) -> Self {
        let now = Utc::now();

        let state = State {
            users: config.users.into_iter().map(|u| (u.id, u)).collect(),
            roles: config.roles.into_iter().map(|r| (r.id, r)).collect(),
            abilities: config
                .abilities
                .into_iter()
                .map(|a| {
                    let ability = a.into_ability(now);
                    (ability.id, ability)
                })
                .collect(),
            permissions: config.permissions,
            assigned_roles: config.assigned_roles,
            entities: config
                .entities
                .into_iter()
                .map(|(entity_type, ids)| (entity_type.to_lowercase(), ids.into_iter().collect()))
                .collect(),
        };

        Self {
            settings: config.settings,
            state: RwLock::new(state),
        }
    }

    /// Create a store from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, crate::config::StoreConfigError> {
        let config = StoreConfig::parse(content)?;
        Ok(Self::from_config(config))
    }

    /// Create a store from a TOML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, crate::config::StoreConfigError> {
        let config = StoreConfig::from_file(path)?;
        Ok(Self::from_config(config))
    }

    /// Create an empty store with default settings.
    pub fn empty() -> Self {
        Self::from_config(StoreConfig::default())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Snapshot the store as configuration, e.g. to write it back to disk.
    pub fn to_config(&self) -> StoreConfig {
        let state = self.state.read();

        StoreConfig {
            settings: self.settings.clone(),
            users: state.users.values().cloned().collect(),
            roles: state.roles.values().cloned().collect(),
            abilities: state.abilities.values().map(AbilityConfig::from).collect(),
            permissions: state.permissions.clone(),
            assigned_roles: state.assigned_roles.clone(),
            entities: state
                .entities
                .iter()
                .map(|(entity_type, ids)| (entity_type.clone(), ids.iter().copied().collect()))
                .collect(),
        }
    }

    /// Number of ability records, across every tenant.
    pub fn ability_count(&self) -> usize {
        self.state.read().abilities.len()
    }

    /// Record a target row as existing.
    pub fn insert_entity(&self, entity_type: &str, id: u64) {
        self.state
            .write()
            .entities
            .entry(entity_type.to_lowercase())
            .or_default()
            .insert(id);
    }

    /// Delete a target row. Abilities bound to it are left in place, as a
    /// store without cascading deletes would.
    pub fn delete_entity(&self, entity_type: &str, id: u64) -> bool {
        let mut state = self.state.write();

        match entity_type.to_lowercase().as_str() {
            "user" => state.users.remove(&id).is_some(),
            "role" => state.roles.remove(&id).is_some(),
            other => state
                .entities
                .get_mut(other)
                .is_some_and(|ids| ids.remove(&id)),
        }
    }
}

impl AbilityStore for MemoryStore {
    fn abilities_for(
        &self,
        authority: &Authority,
        forbidden: bool,
        scope: &dyn TenantScope,
    ) -> Result<Vec<Ability>, StoreError> {
        let state = self.state.read();

        let mut holders = vec![*authority];
        if authority.kind == AuthorityKind::User {
            holders.extend(state.role_ids(authority, scope).into_iter().map(Authority::role));
        }

        let ids: BTreeSet<AbilityId> = state
            .permissions
            .iter()
            .filter(|p| holders.contains(&p.authority) && scope.admits_relation(p.scope.as_deref()))
            .map(|p| p.ability_id)
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| state.abilities.get(id))
            .filter(|a| a.forbidden == forbidden && scope.admits_model(a.scope.as_deref()))
            .cloned()
            .collect())
    }

    fn roles_lookup(
        &self,
        authority: &Authority,
        scope: &dyn TenantScope,
    ) -> Result<RolesLookup, StoreError> {
        let state = self.state.read();

        Ok(state
            .role_ids(authority, scope)
            .into_iter()
            .filter_map(|id| state.roles.get(&id).map(|r| (r.id, r.name.clone())))
            .collect())
    }

    fn authorities(
        &self,
        kind: AuthorityKind,
        scope: &dyn TenantScope,
    ) -> Result<Vec<Authority>, StoreError> {
        let state = self.state.read();

        Ok(match kind {
            AuthorityKind::User => state
                .users
                .values()
                .filter(|u| scope.admits_model(u.scope.as_deref()))
                .map(|u| Authority::user(u.id))
                .collect(),
            AuthorityKind::Role => state
                .roles
                .values()
                .filter(|r| scope.admits_model(r.scope.as_deref()))
                .map(|r| Authority::role(r.id))
                .collect(),
        })
    }

    fn abilities(&self, scope: &dyn TenantScope) -> Result<Vec<Ability>, StoreError> {
        Ok(self
            .state
            .read()
            .abilities
            .values()
            .filter(|a| scope.admits_model(a.scope.as_deref()))
            .cloned()
            .collect())
    }

    fn permissions(&self, scope: &dyn TenantScope) -> Result<Vec<Permission>, StoreError> {
        Ok(self
            .state
            .read()
            .permissions
            .iter()
            .filter(|p| scope.admits_relation(p.scope.as_deref()))
            .cloned()
            .collect())
    }

    fn existing_entities(
        &self,
        entity_type: &str,
        ids: &BTreeSet<u64>,
    ) -> Result<BTreeSet<u64>, StoreError> {
        let state = self.state.read();
        let entity_type = entity_type.to_lowercase();

        let existing: BTreeSet<u64> = match entity_type.as_str() {
            "user" => state.users.keys().copied().collect(),
            "role" => state.roles.keys().copied().collect(),
            other => state
                .entities
                .get(other)
                .cloned()
                .ok_or(StoreError::UnknownEntityType(entity_type.clone()))?,
        };

        Ok(ids.intersection(&existing).copied().collect())
    }

    fn delete_abilities(&self, ids: &[AbilityId]) -> Result<usize, StoreError> {
        let mut state = self.state.write();

        let deleted = ids
            .iter()
            .filter(|id| state.abilities.remove(*id).is_some())
            .count();
        state.permissions.retain(|p| !ids.contains(&p.ability_id));

        debug!(deleted, "deleted abilities");
        Ok(deleted)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryStore")
            .field("settings", &self.settings)
            .field("users", &state.users.len())
            .field("roles", &state.roles.len())
            .field("abilities", &state.abilities.len())
            .field("permissions", &state.permissions.len())
            .finish()
    }
}
