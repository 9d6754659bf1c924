//! Core types for the ability engine.
//!
//! Provides the ability record, the polymorphic authority reference, the
//! target model checks are made against, and the decision returned by the
//! clipboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary key of an ability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub u64);

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AbilityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The kinds of authority that can hold abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityKind {
    User,
    Role,
}

impl AuthorityKind {
    /// Every authority kind, in the order cache invalidation visits them.
    pub const ALL: [AuthorityKind; 2] = [AuthorityKind::User, AuthorityKind::Role];

    /// The morph type used in cache keys and association rows.
    pub fn morph_type(&self) -> &'static str {
        match self {
            AuthorityKind::User => "user",
            AuthorityKind::Role => "role",
        }
    }
}

impl std::fmt::Display for AuthorityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.morph_type())
    }
}

/// Polymorphic reference to a principal that can hold abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authority {
    pub kind: AuthorityKind,
    pub id: u64,
}

impl Authority {
    pub fn new(kind: AuthorityKind, id: u64) -> Self {
        Self { kind, id }
    }

    pub fn user(id: u64) -> Self {
        Self::new(AuthorityKind::User, id)
    }

    pub fn role(id: u64) -> Self {
        Self::new(AuthorityKind::Role, id)
    }

    pub fn morph_type(&self) -> &'static str {
        self.kind.morph_type()
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// An ability record.
///
/// Serializes to a flat attribute mapping, which is also the form kept in
/// the cache. The identifier is derived from the fields rather than stored,
/// so it can never drift from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Target type, `"*"` for every type, `None` for non-model abilities.
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub only_owned: bool,
    #[serde(default)]
    pub forbidden: bool,
    #[serde(default)]
    pub scope: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ability {
    /// The canonical identifier: `name[-type][-id][-owned]`, lower-cased.
    pub fn identifier(&self) -> String {
        let mut slug = self.name.clone();

        if let Some(entity_type) = &self.entity_type {
            slug.push('-');
            slug.push_str(entity_type);
        }

        if let Some(entity_id) = self.entity_id {
            slug.push('-');
            slug.push_str(&entity_id.to_string());
        }

        if self.only_owned {
            slug.push_str("-owned");
        }

        slug.to_lowercase()
    }

    /// Whether this ability is bound to one specific target row.
    pub fn targets_entity(&self) -> bool {
        self.entity_id.is_some() && self.entity_type.as_deref().is_some_and(|t| t != "*")
    }
}

/// A persisted (or about to be persisted) target row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub entity_type: String,
    pub id: u64,
    /// `false` for an instance that has not been saved yet.
    pub exists: bool,
    pub owner: Option<Authority>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: u64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            exists: true,
            owner: None,
        }
    }

    pub fn owned_by(mut self, owner: Authority) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn unsaved(mut self) -> Self {
        self.exists = false;
        self
    }
}

/// What an ability is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every target (`*`).
    Wildcard,
    /// A target type as a whole, not a particular row.
    Class(String),
    /// A particular row.
    Entity(Entity),
}

impl Target {
    pub fn class(entity_type: impl Into<String>) -> Self {
        Target::Class(entity_type.into())
    }

    pub fn entity(entity_type: impl Into<String>, id: u64) -> Self {
        Target::Entity(Entity::new(entity_type, id))
    }
}

impl From<Entity> for Target {
    fn from(entity: Entity) -> Self {
        Target::Entity(entity)
    }
}

/// A role row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Association of an ability with an authority (user or role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub ability_id: AbilityId,
    pub authority: Authority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Role id to role name table for one authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RolesLookup(pub BTreeMap<u64, String>);

impl RolesLookup {
    pub fn has_id(&self, id: u64) -> bool {
        self.0.contains_key(&id)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.0.values().any(|n| n == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u64, String)> for RolesLookup {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A role given to `check_role`, by name or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Name(String),
    Id(u64),
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

impl From<u64> for RoleRef {
    fn from(id: u64) -> Self {
        RoleRef::Id(id)
    }
}

/// How the roles given to `check_role` are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCheck {
    /// The authority has at least one of the roles.
    Any,
    /// The authority has every one of the roles.
    All,
    /// The authority has none of the roles.
    None,
}

/// Result of resolving an ability for an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Allowed through the matched ability.
    Allowed(AbilityId),
    /// A forbidden ability matched. Never overridden by an allow.
    Forbidden,
    /// Neither allowed nor forbidden. Callers treat this as a denial.
    Unmatched,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    pub fn ability_id(&self) -> Option<AbilityId> {
        match self {
            Decision::Allowed(id) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability(name: &str, entity_type: Option<&str>, entity_id: Option<u64>) -> Ability {
        let now = Utc::now();
        Ability {
            id: AbilityId(1),
            name: name.to_string(),
            title: None,
            entity_type: entity_type.map(str::to_string),
            entity_id,
            only_owned: false,
            forbidden: false,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_identifier_forms() {
        assert_eq!(ability("ban-users", None, None).identifier(), "ban-users");
        assert_eq!(ability("*", Some("*"), None).identifier(), "*-*");
        assert_eq!(
            ability("Update", Some("Account"), Some(42)).identifier(),
            "update-account-42"
        );

        let mut owned = ability("edit", Some("post"), None);
        owned.only_owned = true;
        assert_eq!(owned.identifier(), "edit-post-owned");
    }

    #[test]
    fn test_targets_entity() {
        assert!(ability("update", Some("account"), Some(1)).targets_entity());
        assert!(!ability("update", Some("account"), None).targets_entity());
        assert!(!ability("update", Some("*"), Some(1)).targets_entity());
        assert!(!ability("ban-users", None, None).targets_entity());
    }

    #[test]
    fn test_roles_lookup() {
        let lookup: RolesLookup = [(1, "admin".to_string()), (2, "editor".to_string())]
            .into_iter()
            .collect();

        assert!(lookup.has_id(1));
        assert!(!lookup.has_id(3));
        assert!(lookup.has_name("editor"));
        assert!(!lookup.has_name("Editor"));
        assert_eq!(lookup.names(), vec!["admin", "editor"]);
    }
}
