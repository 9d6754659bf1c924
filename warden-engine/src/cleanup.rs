//! Removal of stale ability records.
//!
//! Two independent passes:
//! - orphaned: allow records that no user or role holds any more
//! - missing: records bound to a target row that has since been deleted
//!
//! Cleanup reads and writes the store directly. Cached ability sets are not
//! touched; refresh the cache after a run.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::error::EngineError;
use crate::scope::{NoScope, TenantScope};
use crate::store::AbilityStore;
use crate::types::AbilityId;

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    /// Nothing matched; nothing was deleted.
    Nothing,
    /// This many records were deleted. Never zero.
    Deleted(usize),
}

impl Removed {
    fn from_count(count: usize) -> Self {
        if count == 0 {
            Removed::Nothing
        } else {
            Removed::Deleted(count)
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Removed::Nothing => 0,
            Removed::Deleted(count) => *count,
        }
    }
}

/// Which passes to run. Requesting neither runs both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    pub orphaned: bool,
    pub missing: bool,
}

impl CleanupOptions {
    pub fn all() -> Self {
        Self {
            orphaned: true,
            missing: true,
        }
    }

    fn resolved(self) -> Self {
        if !self.orphaned && !self.missing {
            Self::all()
        } else {
            self
        }
    }
}

/// Results of a cleanup run; `None` for a pass that was not requested.
#[derive(Debug)]
pub struct CleanupReport {
    pub orphaned: Option<Result<Removed, EngineError>>,
    pub missing: Option<Result<Removed, EngineError>>,
}

/// Cleanup over the abilities visible in one tenant scope.
pub struct Cleanup<'a, S: AbilityStore + ?Sized> {
    store: &'a S,
    scope: &'a dyn TenantScope,
}

impl<'a, S: AbilityStore + ?Sized> Cleanup<'a, S> {
    pub fn new(store: &'a S, scope: &'a dyn TenantScope) -> Self {
        Self { store, scope }
    }

    /// Run the requested passes. Each pass stands alone: a failure in one
    /// does not stop the other.
    pub fn run(&self, options: CleanupOptions) -> CleanupReport {
        let options = options.resolved();

        CleanupReport {
            orphaned: options.orphaned.then(|| self.orphaned()),
            missing: options.missing.then(|| self.missing()),
        }
    }

    /// Delete orphaned abilities.
    pub fn orphaned(&self) -> Result<Removed, EngineError> {
        let ids = self.orphaned_ids()?;
        let removed = self.delete(&ids)?;

        match removed {
            Removed::Nothing => debug!("no orphaned abilities"),
            Removed::Deleted(count) => info!(count, "deleted orphaned abilities"),
        }
        Ok(removed)
    }

    /// Delete abilities whose target row no longer exists.
    pub fn missing(&self) -> Result<Removed, EngineError> {
        let ids = self.missing_ids()?;
        let removed = self.delete(&ids)?;

        match removed {
            Removed::Nothing => debug!("no abilities with missing models"),
            Removed::Deleted(count) => info!(count, "deleted abilities with missing models"),
        }
        Ok(removed)
    }

    /// Allow records of this scope that no association refers to.
    ///
    /// References are counted across every tenant, so a shared ability still
    /// held elsewhere is never treated as orphaned.
    pub fn orphaned_ids(&self) -> Result<Vec<AbilityId>, EngineError> {
        let referenced: BTreeSet<AbilityId> = self
            .store
            .permissions(&NoScope)?
            .into_iter()
            .map(|p| p.ability_id)
            .collect();

        Ok(self
            .store
            .abilities(self.scope)?
            .into_iter()
            .filter(|a| !a.forbidden && !referenced.contains(&a.id))
            .map(|a| a.id)
            .collect())
    }

    /// Records bound to a target row the store can no longer find.
    ///
    /// Every target type is resolved before anything is returned, so a
    /// failing lookup leaves the pass with nothing to delete.
    pub fn missing_ids(&self) -> Result<Vec<AbilityId>, EngineError> {
        let mut by_type: BTreeMap<String, Vec<(AbilityId, u64)>> = BTreeMap::new();

        for ability in self.store.abilities(self.scope)? {
            if !ability.targets_entity() {
                continue;
            }
            if let (Some(entity_type), Some(entity_id)) = (ability.entity_type, ability.entity_id) {
                by_type
                    .entry(entity_type)
                    .or_default()
                    .push((ability.id, entity_id));
            }
        }

        let mut missing = Vec::new();
        for (entity_type, abilities) in by_type {
            let ids: BTreeSet<u64> = abilities.iter().map(|(_, entity_id)| *entity_id).collect();
            let existing = self.store.existing_entities(&entity_type, &ids)?;

            missing.extend(
                abilities
                    .into_iter()
                    .filter(|(_, entity_id)| !existing.contains(entity_id))
                    .map(|(id, _)| id),
            );
        }

        missing.sort();
        Ok(missing)
    }

    fn delete(&self, ids: &[AbilityId]) -> Result<Removed, EngineError> {
        if ids.is_empty() {
            return Ok(Removed::Nothing);
        }
        Ok(Removed::from_count(self.store.delete_abilities(ids)?))
    }
}
