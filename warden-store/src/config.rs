//! TOML configuration for the in-memory store.
//!
//! One file carries the engine settings and the seed rows of every table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_engine::{Ability, AbilityId, Authority, Permission, Role};

/// Errors from store configuration parsing and writing.
#[derive(Error, Debug)]
pub enum StoreConfigError {
    #[error("failed to read or write store file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse store TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize store TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abilities: Vec<AbilityConfig>,

    /// Ability associations of users and roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_roles: Vec<AssignedRole>,

    /// Existing target rows, by entity type.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: BTreeMap<String, Vec<u64>>,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base tag for cache keys; the tenant fragment is appended to it.
    #[serde(default = "default_cache_tag")]
    pub cache_tag: String,

    /// Active tenant. Unset for single-tenant deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    /// Scope only association rows, leaving abilities and roles shared.
    #[serde(default)]
    pub only_scope_relations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_tag: default_cache_tag(),
            tenant: None,
            only_scope_relations: false,
        }
    }
}

fn default_cache_tag() -> String {
    warden_engine::AbilityCache::DEFAULT_TAG.to_string()
}

/// A user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Assignment of a role to an authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRole {
    pub role_id: u64,
    pub authority: Authority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// An ability row. Timestamps default to load time when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityConfig {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub only_owned: bool,
    #[serde(default)]
    pub forbidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AbilityConfig {
    pub(crate) fn into_ability(self, now: DateTime<Utc>) -> Ability {
        let created_at = self.created_at.unwrap_or(now);
        Ability {
            id: AbilityId(self.id),
            name: self.name,
            title: self.title,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            only_owned: self.only_owned,
            forbidden: self.forbidden,
            scope: self.scope,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
        }
    }
}

impl From<&Ability> for AbilityConfig {
    fn from(ability: &Ability) -> Self {
        Self {
            id: ability.id.0,
            name: ability.name.clone(),
            title: ability.title.clone(),
            entity_type: ability.entity_type.clone(),
            entity_id: ability.entity_id,
            only_owned: ability.only_owned,
            forbidden: ability.forbidden,
            scope: ability.scope.clone(),
            created_at: Some(ability.created_at),
            updated_at: Some(ability.updated_at),
        }
    }
}

impl StoreConfig {
    /// Load a store from a TOML file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, StoreConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a store from a TOML string.
    pub fn parse(content: &str) -> Result<Self, StoreConfigError> {
        let config: StoreConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Render the store as TOML.
    pub fn to_toml(&self) -> Result<String, StoreConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Write the store to a TOML file path.
    pub fn write_to(&self, path: &std::path::Path) -> Result<(), StoreConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::parse("").unwrap();

        assert_eq!(config.settings.cache_tag, "warden");
        assert_eq!(config.settings.tenant, None);
        assert!(!config.settings.only_scope_relations);
        assert!(config.abilities.is_empty());
    }

    #[test]
    fn test_parse_tables() {
        let config = StoreConfig::parse(
            r#"
[settings]
cache_tag = "acl"
tenant = "acme"

[[users]]
id = 1

[[roles]]
id = 1
name = "admin"

[[abilities]]
id = 1
name = "update"
entity_type = "account"
entity_id = 42

[[permissions]]
ability_id = 1
authority = { kind = "role", id = 1 }

[[assigned_roles]]
role_id = 1
authority = { kind = "user", id = 1 }

[entities]
account = [42]
            "#,
        )
        .unwrap();

        assert_eq!(config.settings.cache_tag, "acl");
        assert_eq!(config.settings.tenant.as_deref(), Some("acme"));
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.permissions[0].authority, Authority::role(1));
        assert_eq!(config.assigned_roles[0].authority, Authority::user(1));
        assert_eq!(config.entities["account"], vec![42]);
    }

    #[test]
    fn test_missing_timestamps_default_to_load_time() {
        let now = Utc::now();
        let config = StoreConfig::parse(
            r#"
[[abilities]]
id = 3
name = "ban-users"
            "#,
        )
        .unwrap();

        let ability = config.abilities[0].clone().into_ability(now);
        assert_eq!(ability.created_at, now);
        assert_eq!(ability.updated_at, now);
        assert_eq!(ability.identifier(), "ban-users");
    }

    #[test]
    fn test_toml_round_trip() {
        let source = r#"
[settings]
tenant = "acme"

[[abilities]]
id = 1
name = "update"
entity_type = "account"
entity_id = 42
created_at = "2024-03-01T12:00:00Z"
updated_at = "2024-03-01T12:00:00Z"

[[permissions]]
ability_id = 1
authority = { kind = "user", id = 1 }

[entities]
account = [42, 43]
        "#;

        let config = StoreConfig::parse(source).unwrap();
        let rendered = config.to_toml().unwrap();
        assert_eq!(StoreConfig::parse(&rendered).unwrap(), config);
    }
}
