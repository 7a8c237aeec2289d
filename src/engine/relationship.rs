//! Parent/child relationship tracking over entity indices.
//!
//! The [`RelationshipManager`] maintains a forest over entities as
//! index-keyed adjacency maps — never pointer graphs — so it carries no
//! ownership or lifetime hazards of its own. Typical uses are transform
//! hierarchies, UI trees, and ownership chains.
//!
//! ## Invariants
//!
//! * No cycles: [`RelationshipManager::set_parent`] walks the proposed
//!   parent's ancestor chain before attaching, a bounded O(depth) check.
//! * Killing an entity detaches it from its parent and **orphans** its
//!   children; destruction never cascades through the graph.
//!
//! A reader/writer lock guards the maps, so concurrent read queries are
//! safe. Traversal results are collected while the shared lock is held and
//! returned by value; no user code runs under the lock.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::engine::entity::Entity;
use crate::engine::types::EntityIndex;

#[derive(Default)]
struct RelationshipMaps {
    parents: HashMap<EntityIndex, Entity>,
    // BTreeMap keys give deterministic child iteration order.
    children: HashMap<EntityIndex, BTreeMap<EntityIndex, Entity>>,
}

impl RelationshipMaps {
    fn would_create_cycle(&self, child: Entity, parent: Entity) -> bool {
        let mut current = parent;
        loop {
            if current == child {
                return true;
            }
            match self.parents.get(&current.index()) {
                Some(&next) => current = next,
                None => return false,
            }
        }
    }

    fn detach_from_parent(&mut self, child: Entity) {
        if let Some(parent) = self.parents.remove(&child.index()) {
            if let Some(siblings) = self.children.get_mut(&parent.index()) {
                siblings.remove(&child.index());
                if siblings.is_empty() {
                    self.children.remove(&parent.index());
                }
            }
        }
    }

    fn collect_descendants(&self, parent: Entity, result: &mut Vec<Entity>) {
        if let Some(children) = self.children.get(&parent.index()) {
            for &child in children.values() {
                result.push(child);
                self.collect_descendants(child, result);
            }
        }
    }
}

/// Parent/child graph over entity indices, cycle-safe.
#[derive(Default)]
pub struct RelationshipManager {
    maps: RwLock<RelationshipMaps>,
}

impl RelationshipManager {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `child` under `parent`, detaching any prior parent edge.
    ///
    /// Returns `false` — leaving the graph untouched — if `child == parent`
    /// or if the edge would create a cycle (checked by walking `parent`'s
    /// ancestors looking for `child`).
    pub fn set_parent(&self, child: Entity, parent: Entity) -> bool {
        if child == parent {
            return false;
        }

        let mut maps = self.maps.write();
        if maps.would_create_cycle(child, parent) {
            return false;
        }

        maps.detach_from_parent(child);
        maps.parents.insert(child.index(), parent);
        maps.children
            .entry(parent.index())
            .or_default()
            .insert(child.index(), child);
        true
    }

    /// Detaches `child` from its parent, orphaning it.
    pub fn remove_parent(&self, child: Entity) {
        self.maps.write().detach_from_parent(child);
    }

    /// Direct parent of `child`, if any.
    #[must_use]
    pub fn get_parent(&self, child: Entity) -> Option<Entity> {
        self.maps.read().parents.get(&child.index()).copied()
    }

    /// Whether `child` has a parent.
    #[must_use]
    pub fn has_parent(&self, child: Entity) -> bool {
        self.maps.read().parents.contains_key(&child.index())
    }

    /// Direct children of `parent`, in deterministic index order.
    #[must_use]
    pub fn get_children(&self, parent: Entity) -> Vec<Entity> {
        let maps = self.maps.read();
        maps.children
            .get(&parent.index())
            .map(|children| children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Every descendant of `parent`, depth-first.
    #[must_use]
    pub fn get_descendants(&self, parent: Entity) -> Vec<Entity> {
        let maps = self.maps.read();
        let mut result = Vec::new();
        maps.collect_descendants(parent, &mut result);
        result
    }

    /// Ancestors of `child`, from immediate parent to root.
    #[must_use]
    pub fn get_ancestors(&self, child: Entity) -> Vec<Entity> {
        let maps = self.maps.read();
        let mut result = Vec::new();
        let mut current = child;
        while let Some(&parent) = maps.parents.get(&current.index()) {
            result.push(parent);
            current = parent;
        }
        result
    }

    /// Root of `entity`'s tree (`entity` itself when it has no parent).
    #[must_use]
    pub fn get_root(&self, entity: Entity) -> Entity {
        let maps = self.maps.read();
        let mut current = entity;
        while let Some(&parent) = maps.parents.get(&current.index()) {
            current = parent;
        }
        current
    }

    /// Whether `potential_ancestor` appears on `entity`'s ancestor chain.
    #[must_use]
    pub fn is_ancestor(&self, potential_ancestor: Entity, entity: Entity) -> bool {
        let maps = self.maps.read();
        let mut current = entity;
        while let Some(&parent) = maps.parents.get(&current.index()) {
            if parent == potential_ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Number of direct children of `parent`.
    #[must_use]
    pub fn child_count(&self, parent: Entity) -> usize {
        let maps = self.maps.read();
        maps.children.get(&parent.index()).map_or(0, BTreeMap::len)
    }

    /// Depth of `entity` in its tree (0 for a root).
    #[must_use]
    pub fn get_depth(&self, entity: Entity) -> usize {
        let maps = self.maps.read();
        let mut depth = 0;
        let mut current = entity;
        while let Some(&parent) = maps.parents.get(&current.index()) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Detaches `entity` from the graph entirely.
    ///
    /// Invoked by the registry on kill: the entity leaves its parent's
    /// child set and its children become roots. Orphaning rather than
    /// cascading destruction is the chosen policy.
    pub fn remove_entity(&self, entity: Entity) {
        let mut maps = self.maps.write();
        maps.detach_from_parent(entity);

        if let Some(children) = maps.children.remove(&entity.index()) {
            for child_index in children.keys() {
                maps.parents.remove(child_index);
            }
        }
    }

    /// Drops every relationship.
    pub fn clear(&self) {
        let mut maps = self.maps.write();
        maps.parents.clear();
        maps.children.clear();
    }
}
