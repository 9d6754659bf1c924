//! # Warden
//!
//! Convenience crate that re-exports the Warden ability engine with the
//! default in-memory store and caches.
//!
//! For custom stores, depend on `warden-engine` directly.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::{Clipboard, MemoryCache, MemoryStore, NoScope, Target};
//!
//! let store = Arc::new(MemoryStore::empty());
//! let clipboard = Clipboard::cached(
//!     store.clone(),
//!     Arc::new(NoScope),
//!     Arc::new(MemoryCache::new()),
//! );
//!
//! // Grant through the store, then refresh the cached sets
//! let conductor = store.conductor(&NoScope);
//! let user = conductor.create_user();
//! conductor.allow(&user, "update", Some(&Target::class("post")));
//! clipboard.refresh_for(&user).expect("Failed to refresh");
//!
//! assert!(clipboard
//!     .check(&user, "update", Some(&Target::entity("post", 7)))
//!     .expect("Check failed"));
//! ```

pub mod clean;
pub mod cli;
pub mod report;

// Re-export everything from the engine crate
pub use warden_engine::*;

// Re-export the default store and caches
pub use warden_store::{
    Conductor, MemoryCache, MemoryStore, Settings, StoreConfig, StoreConfigError,
    TaggedMemoryCache,
};
