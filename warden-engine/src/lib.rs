//! # Warden Engine
//!
//! Core ability engine for the Warden authorization system.
//!
//! This crate provides:
//! - Identifier compilation and matching for ability checks
//! - `Clipboard`, which resolves checks with forbidden abilities taking precedence
//! - `AbilityCache`, a tenant-scoped forever cache of ability sets and role lookups
//! - `Cleanup`, which removes orphaned abilities and abilities with missing targets
//! - The `AbilityStore` and `CacheStore` traits the engine is built against

pub mod cache;
pub mod cleanup;
pub mod clipboard;
pub mod error;
pub mod identifiers;
pub mod ownership;
pub mod scope;
pub mod store;
pub mod types;

pub use cache::{AbilityCache, CacheStore, Invalidation, TaggedStore};
pub use cleanup::{Cleanup, CleanupOptions, CleanupReport, Removed};
pub use clipboard::Clipboard;
pub use error::{CacheError, EngineError, StoreError};
pub use ownership::Ownership;
pub use scope::{NoScope, Scope, TenantScope};
pub use store::AbilityStore;
pub use types::{
    Ability, AbilityId, Authority, AuthorityKind, Decision, Entity, Permission, Role, RoleCheck,
    RoleRef, RolesLookup, Target,
};
