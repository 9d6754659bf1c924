//! Tenant scoping for cache keys and store queries.
//!
//! A scope partitions two things independently: the cache namespace (through
//! the fragment appended to the cache tag) and the rows a store read may see
//! (through the admit predicates). Stores receive the scope on every read.

/// Partitions cache keys and store queries per tenant.
pub trait TenantScope: Send + Sync {
    /// The active tenant value, if any.
    fn value(&self) -> Option<&str>;

    /// The tenant stamped on new ability and role rows.
    fn model_value(&self) -> Option<&str> {
        self.value()
    }

    /// Append the tenant fragment to a cache tag or key.
    fn append_to_cache_key(&self, key: &str) -> String;

    /// Query filter for ability and role rows.
    fn admits_model(&self, record_scope: Option<&str>) -> bool;

    /// Query filter for permission and role assignment rows.
    fn admits_relation(&self, record_scope: Option<&str>) -> bool;
}

/// Tenant-aware scope.
///
/// Rows carrying the tenant's value are visible, as are rows with no scope
/// at all, which are shared across tenants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    tenant: Option<String>,
    only_relations: bool,
}

impl Scope {
    /// A scope bound to `tenant`.
    pub fn to(tenant: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant.into()),
            only_relations: false,
        }
    }

    /// Build from an optional tenant, as read from configuration.
    pub fn from_tenant(tenant: Option<String>) -> Self {
        Self {
            tenant,
            only_relations: false,
        }
    }

    /// Leave ability and role rows unscoped, filtering only the association
    /// rows that hand them out.
    pub fn only_relations(mut self, only_relations: bool) -> Self {
        self.only_relations = only_relations;
        self
    }

    fn admits(&self, record_scope: Option<&str>) -> bool {
        match (&self.tenant, record_scope) {
            (None, _) | (Some(_), None) => true,
            (Some(tenant), Some(scope)) => tenant == scope,
        }
    }
}

impl TenantScope for Scope {
    fn value(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    fn model_value(&self) -> Option<&str> {
        if self.only_relations {
            None
        } else {
            self.value()
        }
    }

    fn append_to_cache_key(&self, key: &str) -> String {
        match &self.tenant {
            Some(tenant) => format!("{key}-{tenant}"),
            None => key.to_string(),
        }
    }

    fn admits_model(&self, record_scope: Option<&str>) -> bool {
        self.only_relations || self.admits(record_scope)
    }

    fn admits_relation(&self, record_scope: Option<&str>) -> bool {
        self.admits(record_scope)
    }
}

/// Scope for single-tenant deployments: no fragment, no filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoScope;

impl TenantScope for NoScope {
    fn value(&self) -> Option<&str> {
        None
    }

    fn append_to_cache_key(&self, key: &str) -> String {
        key.to_string()
    }

    fn admits_model(&self, _record_scope: Option<&str>) -> bool {
        true
    }

    fn admits_relation(&self, _record_scope: Option<&str>) -> bool {
        true
    }
}
