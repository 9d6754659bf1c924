//! Grant and revoke operations on the in-memory store.
//!
//! These write the store only. A cached clipboard over the same store must
//! be refreshed once a write has been made.

use chrono::Utc;
use tracing::debug;
use warden_engine::{Ability, AbilityId, Authority, Permission, Role, Target, TenantScope};

use crate::config::{AssignedRole, UserConfig};
use crate::memory::{MemoryStore, State};

/// Writes grants into a store on behalf of one tenant scope.
///
/// New rows are stamped with the scope's tenant. Ability and role rows stay
/// unstamped when the scope only covers relations.
pub struct Conductor<'a> {
    store: &'a MemoryStore,
    scope: &'a dyn TenantScope,
}

/// The attributes an ability is looked up and created by.
struct AbilityAttributes {
    name: String,
    entity_type: Option<String>,
    entity_id: Option<u64>,
    only_owned: bool,
    forbidden: bool,
}

impl AbilityAttributes {
    fn new(name: &str, target: Option<&Target>, only_owned: bool, forbidden: bool) -> Self {
        let (entity_type, entity_id) = match target {
            None => (None, None),
            Some(Target::Wildcard) => (Some("*".to_string()), None),
            Some(Target::Class(entity_type)) => (Some(entity_type.to_lowercase()), None),
            Some(Target::Entity(entity)) => (
                Some(entity.entity_type.to_lowercase()),
                entity.exists.then_some(entity.id),
            ),
        };

        Self {
            name: name.to_string(),
            entity_type,
            entity_id,
            only_owned,
            forbidden,
        }
    }

    fn matches(&self, ability: &Ability) -> bool {
        ability.name == self.name
            && ability.entity_type == self.entity_type
            && ability.entity_id == self.entity_id
            && ability.only_owned == self.only_owned
            && ability.forbidden == self.forbidden
    }
}

impl MemoryStore {
    /// Grant and revoke abilities within `scope`.
    pub fn conductor<'a>(&'a self, scope: &'a dyn TenantScope) -> Conductor<'a> {
        Conductor { store: self, scope }
    }
}

impl<'a> Conductor<'a> {
    fn model_scope(&self) -> Option<String> {
        self.scope.model_value().map(str::to_string)
    }

    fn relation_scope(&self) -> Option<String> {
        self.scope.value().map(str::to_string)
    }

    /// Create a user row.
    pub fn create_user(&self) -> Authority {
        let mut state = self.store.state.write();
        let id = state.next_user_id();
        state.users.insert(
            id,
            UserConfig {
                id,
                scope: self.model_scope(),
            },
        );
        Authority::user(id)
    }

    /// Find or create a role row by name.
    pub fn create_role(&self, name: &str) -> Authority {
        let mut state = self.store.state.write();
        Authority::role(self.find_or_create_role(&mut state, name))
    }

    fn find_or_create_role(&self, state: &mut State, name: &str) -> u64 {
        if let Some(role) = state
            .roles
            .values()
            .find(|r| r.name == name && self.scope.admits_model(r.scope.as_deref()))
        {
            return role.id;
        }

        let id = state.next_role_id();
        state.roles.insert(
            id,
            Role {
                id,
                name: name.to_string(),
                title: None,
                scope: self.model_scope(),
            },
        );
        id
    }

    /// Allow `ability` on `target`.
    pub fn allow(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> AbilityId {
        self.grant(authority, AbilityAttributes::new(ability, target, false, false))
    }

    /// Allow `ability` on `target` rows the authority owns.
    pub fn allow_owned(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> AbilityId {
        self.grant(authority, AbilityAttributes::new(ability, target, true, false))
    }

    /// Forbid `ability` on `target`.
    pub fn forbid(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> AbilityId {
        self.grant(authority, AbilityAttributes::new(ability, target, false, true))
    }

    /// Forbid `ability` on `target` rows the authority owns.
    pub fn forbid_owned(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> AbilityId {
        self.grant(authority, AbilityAttributes::new(ability, target, true, true))
    }

    /// Remove an allow from the authority. The ability row is kept.
    pub fn disallow(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> usize {
        self.revoke(authority, AbilityAttributes::new(ability, target, false, false))
    }

    /// Remove an owned-scoped allow from the authority.
    pub fn disallow_owned(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> usize {
        self.revoke(authority, AbilityAttributes::new(ability, target, true, false))
    }

    /// Remove a forbid from the authority. The ability row is kept.
    pub fn unforbid(&self, authority: &Authority, ability: &str, target: Option<&Target>) -> usize {
        self.revoke(authority, AbilityAttributes::new(ability, target, false, true))
    }

    /// Remove an owned-scoped forbid from the authority.
    pub fn unforbid_owned(
        &self,
        authority: &Authority,
        ability: &str,
        target: Option<&Target>,
    ) -> usize {
        self.revoke(authority, AbilityAttributes::new(ability, target, true, true))
    }

    /// Assign the named role to the authority, creating the role if needed.
    pub fn assign(&self, role: &str, authority: &Authority) -> Authority {
        let mut state = self.store.state.write();
        let role_id = self.find_or_create_role(&mut state, role);
        let scope = self.relation_scope();

        let assigned = state
            .assigned_roles
            .iter()
            .any(|a| a.role_id == role_id && a.authority == *authority && a.scope == scope);
        if !assigned {
            state.assigned_roles.push(AssignedRole {
                role_id,
                authority: *authority,
                scope,
            });
        }

        Authority::role(role_id)
    }

    /// Retract the named role from the authority.
    pub fn retract(&self, role: &str, authority: &Authority) -> usize {
        let mut state = self.store.state.write();
        let role_ids: Vec<u64> = state
            .roles
            .values()
            .filter(|r| r.name == role && self.scope.admits_model(r.scope.as_deref()))
            .map(|r| r.id)
            .collect();

        let before = state.assigned_roles.len();
        state.assigned_roles.retain(|a| {
            !(role_ids.contains(&a.role_id)
                && a.authority == *authority
                && self.scope.admits_relation(a.scope.as_deref()))
        });
        before - state.assigned_roles.len()
    }

    fn grant(&self, authority: &Authority, attributes: AbilityAttributes) -> AbilityId {
        let mut state = self.store.state.write();

        let existing = state
            .abilities
            .values()
            .find(|a| attributes.matches(a) && self.scope.admits_model(a.scope.as_deref()))
            .map(|a| a.id);

        let ability_id = match existing {
            Some(id) => id,
            None => {
                let id = state.next_ability_id();
                let now = Utc::now();
                state.abilities.insert(
                    id,
                    Ability {
                        id,
                        name: attributes.name,
                        title: None,
                        entity_type: attributes.entity_type,
                        entity_id: attributes.entity_id,
                        only_owned: attributes.only_owned,
                        forbidden: attributes.forbidden,
                        scope: self.model_scope(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            }
        };

        let scope = self.relation_scope();
        let held = state
            .permissions
            .iter()
            .any(|p| p.ability_id == ability_id && p.authority == *authority && p.scope == scope);
        if !held {
            state.permissions.push(Permission {
                ability_id,
                authority: *authority,
                scope,
            });
        }

        debug!(authority = %authority, ability = %ability_id, "granted ability");
        ability_id
    }

    fn revoke(&self, authority: &Authority, attributes: AbilityAttributes) -> usize {
        let mut state = self.store.state.write();

        let ability_ids: Vec<AbilityId> = state
            .abilities
            .values()
            .filter(|a| attributes.matches(a))
            .filter(|a| self.scope.admits_model(a.scope.as_deref()))
            .map(|a| a.id)
            .collect();

        let before = state.permissions.len();
        state.permissions.retain(|p| {
            !(ability_ids.contains(&p.ability_id)
                && p.authority == *authority
                && self.scope.admits_relation(p.scope.as_deref()))
        });

        let revoked = before - state.permissions.len();
        debug!(authority = %authority, revoked, "revoked abilities");
        revoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_engine::{AbilityStore, Entity, NoScope, Scope};

    #[test]
    fn test_allow_reuses_ability_rows() {
        let store = MemoryStore::empty();
        let conductor = store.conductor(&NoScope);
        let alice = conductor.create_user();
        let bob = conductor.create_user();

        let first = conductor.allow(&alice, "ban-users", None);
        let second = conductor.allow(&bob, "ban-users", None);
        let again = conductor.allow(&alice, "ban-users", None);

        assert_eq!(first, second);
        assert_eq!(first, again);
        assert_eq!(store.ability_count(), 1);
        assert_eq!(store.permissions(&NoScope).unwrap().len(), 2);
    }

    #[test]
    fn test_target_attributes() {
        let store = MemoryStore::empty();
        let conductor = store.conductor(&NoScope);
        let user = conductor.create_user();

        conductor.allow(&user, "create", Some(&Target::class("Account")));
        conductor.allow(&user, "update", Some(&Target::entity("account", 7)));
        conductor.allow(&user, "update", Some(&Target::Entity(Entity::new("post", 3).unsaved())));
        conductor.allow(&user, "*", Some(&Target::Wildcard));
        conductor.allow_owned(&user, "edit", Some(&Target::class("post")));

        let identifiers: Vec<String> = store
            .abilities_for(&user, false, &NoScope)
            .unwrap()
            .iter()
            .map(Ability::identifier)
            .collect();

        assert_eq!(
            identifiers,
            vec!["create-account", "update-account-7", "update-post", "*-*", "edit-post-owned"]
        );
    }

    #[test]
    fn test_forbid_creates_a_separate_record() {
        let store = MemoryStore::empty();
        let conductor = store.conductor(&NoScope);
        let user = conductor.create_user();

        let allowed = conductor.allow(&user, "ban-users", None);
        let forbidden = conductor.forbid(&user, "ban-users", None);

        assert_ne!(allowed, forbidden);
        assert_eq!(store.abilities_for(&user, true, &NoScope).unwrap().len(), 1);
    }

    #[test]
    fn test_disallow_detaches_but_keeps_the_row() {
        let store = MemoryStore::empty();
        let conductor = store.conductor(&NoScope);
        let user = conductor.create_user();

        conductor.allow(&user, "ban-users", None);
        conductor.forbid(&user, "ban-users", None);

        assert_eq!(conductor.disallow(&user, "ban-users", None), 1);
        assert_eq!(conductor.disallow(&user, "ban-users", None), 0);
        assert_eq!(store.ability_count(), 2);
        assert!(store.abilities_for(&user, false, &NoScope).unwrap().is_empty());
        assert_eq!(store.abilities_for(&user, true, &NoScope).unwrap().len(), 1);

        assert_eq!(conductor.unforbid(&user, "ban-users", None), 1);
        assert!(store.abilities_for(&user, true, &NoScope).unwrap().is_empty());
    }

    #[test]
    fn test_owned_grants_are_revoked_separately() {
        let store = MemoryStore::empty();
        let conductor = store.conductor(&NoScope);
        let user = conductor.create_user();
        let post = Target::class("post");

        conductor.allow(&user, "edit", Some(&post));
        conductor.allow_owned(&user, "edit", Some(&post));
        conductor.forbid_owned(&user, "delete", Some(&post));

        assert_eq!(conductor.disallow_owned(&user, "edit", Some(&post)), 1);
        assert_eq!(conductor.disallow_owned(&user, "edit", Some(&post)), 0);

        let allowed: Vec<String> = store
            .abilities_for(&user, false, &NoScope)
            .unwrap()
            .iter()
            .map(Ability::identifier)
            .collect();
        assert_eq!(allowed, vec!["edit-post"]);

        assert_eq!(conductor.unforbid(&user, "delete", Some(&post)), 0);
        assert_eq!(conductor.unforbid_owned(&user, "delete", Some(&post)), 1);
        assert!(store.abilities_for(&user, true, &NoScope).unwrap().is_empty());
        assert_eq!(store.ability_count(), 3);
    }

    #[test]
    fn test_assign_and_retract() {
        let store = MemoryStore::empty();
        let conductor = store.conductor(&NoScope);
        let user = conductor.create_user();

        let admin = conductor.assign("admin", &user);
        conductor.assign("admin", &user);
        assert_eq!(conductor.create_role("admin"), admin);

        let lookup = store.roles_lookup(&user, &NoScope).unwrap();
        assert_eq!(lookup.names(), vec!["admin"]);

        assert_eq!(conductor.retract("admin", &user), 1);
        assert!(store.roles_lookup(&user, &NoScope).unwrap().is_empty());
    }

    #[test]
    fn test_rows_are_stamped_with_the_tenant() {
        let store = MemoryStore::empty();
        let scope = Scope::to("acme");
        let conductor = store.conductor(&scope);
        let user = conductor.create_user();

        conductor.allow(&user, "ban-users", None);

        let ability = &store.abilities(&NoScope).unwrap()[0];
        assert_eq!(ability.scope.as_deref(), Some("acme"));
        assert_eq!(
            store.permissions(&NoScope).unwrap()[0].scope.as_deref(),
            Some("acme")
        );
        assert!(store.abilities(&Scope::to("globex")).unwrap().is_empty());
    }

    #[test]
    fn test_only_relations_leaves_models_shared() {
        let store = MemoryStore::empty();
        let scope = Scope::to("acme").only_relations(true);
        let conductor = store.conductor(&scope);
        let user = conductor.create_user();

        conductor.allow(&user, "ban-users", None);

        let ability = &store.abilities(&NoScope).unwrap()[0];
        assert_eq!(ability.scope, None);
        assert_eq!(
            store.permissions(&NoScope).unwrap()[0].scope.as_deref(),
            Some("acme")
        );
    }
}
