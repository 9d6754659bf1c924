//! Error types for the ability engine.

use thiserror::Error;

/// Errors reported by an [`AbilityStore`](crate::AbilityStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or failed the query.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Target rows of this type cannot be resolved by the store.
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),
}

/// Errors reported by a [`CacheStore`](crate::CacheStore).
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the ability engine.
///
/// Store and cache failures pass through unchanged; the engine does not
/// retry.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A value could not be encoded for the cache.
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
