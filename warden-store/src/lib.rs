//! # Warden Store
//!
//! Default in-memory backends for the Warden ability engine.
//!
//! Provides TOML-based configuration for seeding users, roles, abilities and
//! their associations, grant and revoke operations, and the two cache stores
//! a clipboard can cache through.

mod cache;
mod conductor;
mod config;
mod memory;

pub use cache::{MemoryCache, TaggedMemoryCache};
pub use conductor::Conductor;
pub use config::{
    AbilityConfig, AssignedRole, Settings, StoreConfig, StoreConfigError, UserConfig,
};
pub use memory::MemoryStore;
