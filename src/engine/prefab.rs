//! Named entity templates.
//!
//! A prefab is a build function registered under a name. Instantiation
//! spawns a fresh entity and hands it to the build function, which
//! emplaces whatever components the template calls for. Templates compose
//! with [`PrefabManager::instantiate_with`], which runs a caller-supplied
//! customizer after the template so individual spawns can override fields.
//!
//! The manager clones the build function out of its map before spawning,
//! so no lock is held while user code runs; a build function may itself
//! instantiate other prefabs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::entity::Entity;
use crate::engine::error::PrefabError;
use crate::engine::registry::Registry;

/// Build function applied to a freshly spawned entity.
pub type PrefabFn = dyn Fn(&Registry, Entity) + Send + Sync;

/// Registry of named entity templates.
#[derive(Default)]
pub struct PrefabManager {
    prefabs: RwLock<HashMap<String, Arc<PrefabFn>>>,
}

impl PrefabManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `build` under `name`.
    ///
    /// Re-registering an existing name silently replaces the previous
    /// template; entities already instantiated from it are unaffected.
    pub fn register_prefab<F>(&self, name: impl Into<String>, build: F)
    where
        F: Fn(&Registry, Entity) + Send + Sync + 'static,
    {
        self.prefabs.write().insert(name.into(), Arc::new(build));
    }

    /// Spawns one entity from the template registered under `name`.
    pub fn instantiate(&self, name: &str, registry: &Registry) -> Result<Entity, PrefabError> {
        let build = self.lookup(name)?;
        let entity = registry.spawn_entity()?;
        build(registry, entity);
        Ok(entity)
    }

    /// Spawns from a template, then runs `customize` on the new entity.
    ///
    /// The customizer sees the entity after the template has finished, so
    /// it can patch or replace template-provided components.
    pub fn instantiate_with<F>(
        &self,
        name: &str,
        registry: &Registry,
        customize: F,
    ) -> Result<Entity, PrefabError>
    where
        F: FnOnce(&Registry, Entity),
    {
        let entity = self.instantiate(name, registry)?;
        customize(registry, entity);
        Ok(entity)
    }

    /// Spawns `count` entities from the same template.
    ///
    /// Fails fast: if a spawn errors partway through, the entities created
    /// so far remain alive and the error is returned.
    pub fn instantiate_multiple(
        &self,
        name: &str,
        registry: &Registry,
        count: usize,
    ) -> Result<Vec<Entity>, PrefabError> {
        let build = self.lookup(name)?;
        let mut entities = Vec::with_capacity(count);
        for _ in 0..count {
            let entity = registry.spawn_entity()?;
            build(registry, entity);
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Whether a template is registered under `name`.
    #[must_use]
    pub fn has_prefab(&self, name: &str) -> bool {
        self.prefabs.read().contains_key(name)
    }

    /// Removes the template under `name`; returns whether one existed.
    pub fn unregister_prefab(&self, name: &str) -> bool {
        self.prefabs.write().remove(name).is_some()
    }

    /// Registered template names, sorted.
    #[must_use]
    pub fn prefab_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.prefabs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prefabs.read().len()
    }

    /// Whether no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prefabs.read().is_empty()
    }

    /// Drops every template.
    pub fn clear(&self) {
        self.prefabs.write().clear();
    }

    fn lookup(&self, name: &str) -> Result<Arc<PrefabFn>, PrefabError> {
        self.prefabs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PrefabError::NotFound(name.to_string()))
    }
}
