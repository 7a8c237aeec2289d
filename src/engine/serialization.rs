//! Versioned text snapshots of registry state.
//!
//! The [`Serializer`] façade writes the alive entities of a registry, and
//! the components a caller has registered serializers for, to a
//! line-oriented text format:
//!
//! ```text
//! riptide-snapshot v1
//! # optional comment
//! entity 0 0
//! component position 1.5 -2.0
//! component health 100
//! entity 3 7
//! component position 0.0 0.0
//! end
//! ```
//!
//! The header carries a version tag so the format can evolve; `#` lines
//! are ignored; each `component` record attaches to the preceding
//! `entity` record; `end` terminates the snapshot. Component payloads are
//! plain single-line strings produced and consumed by per-type
//! serializers, so callers keep full control over their on-disk shapes.
//!
//! Restoring spawns *fresh* entities: generations are never replayed into
//! the allocator, so restored handles are valid but numerically unrelated
//! to the handles recorded in the snapshot. A `component` record whose
//! name has no registered serializer is skipped with a warning, which
//! lets old builds read snapshots written by newer ones.

use std::any::TypeId;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::marker::PhantomData;

use log::{debug, warn};

use crate::engine::entity::Entity;
use crate::engine::error::SnapshotError;
use crate::engine::registry::Registry;
use crate::engine::types::Component;

const SNAPSHOT_MAGIC: &str = "riptide-snapshot";
const SNAPSHOT_VERSION: &str = "v1";

/// Per-component-type encode/decode hook.
///
/// Implementations read the component off the registry themselves, which
/// keeps the trait object-safe and the façade ignorant of component types.
pub trait ComponentSerializer: Send + Sync {
    /// Whether `entity` holds the component this serializer covers.
    fn contains(&self, entity: Entity, registry: &Registry) -> bool;

    /// Encodes `entity`'s component as a single-line payload string.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the component is absent or cannot
    /// be encoded.
    fn serialize(&self, entity: Entity, registry: &Registry) -> Result<String, SnapshotError>;

    /// Decodes `payload` and emplaces the component on `entity`.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the payload is malformed or the
    /// emplace fails.
    fn deserialize(
        &self,
        entity: Entity,
        payload: &str,
        registry: &Registry,
    ) -> Result<(), SnapshotError>;
}

/// [`ComponentSerializer`] built from a to-string / from-str closure pair.
pub struct FnComponentSerializer<T, S, D>
where
    T: Component + Clone,
    S: Fn(&T) -> String + Send + Sync,
    D: Fn(&str) -> Result<T, String> + Send + Sync,
{
    name: String,
    encode: S,
    decode: D,
    _marker: PhantomData<fn() -> T>,
}

impl<T, S, D> FnComponentSerializer<T, S, D>
where
    T: Component + Clone,
    S: Fn(&T) -> String + Send + Sync,
    D: Fn(&str) -> Result<T, String> + Send + Sync,
{
    /// Wraps an encode and a decode closure for component type `T`.
    ///
    /// `name` is used in error messages; the record name written to the
    /// snapshot is the one given at registration.
    pub fn new(name: impl Into<String>, encode: S, decode: D) -> Self {
        Self {
            name: name.into(),
            encode,
            decode,
            _marker: PhantomData,
        }
    }
}

impl<T, S, D> ComponentSerializer for FnComponentSerializer<T, S, D>
where
    T: Component + Clone,
    S: Fn(&T) -> String + Send + Sync,
    D: Fn(&str) -> Result<T, String> + Send + Sync,
{
    fn contains(&self, entity: Entity, registry: &Registry) -> bool {
        registry.has_component::<T>(entity)
    }

    fn serialize(&self, entity: Entity, registry: &Registry) -> Result<String, SnapshotError> {
        let value: T = registry.get_component(entity)?;
        Ok((self.encode)(&value))
    }

    fn deserialize(
        &self,
        entity: Entity,
        payload: &str,
        registry: &Registry,
    ) -> Result<(), SnapshotError> {
        let value = (self.decode)(payload).map_err(|reason| SnapshotError::InvalidPayload {
            component: self.name.clone(),
            reason,
        })?;
        registry.emplace_component(entity, value)?;
        Ok(())
    }
}

struct SerializerEntry {
    name: String,
    serializer: Box<dyn ComponentSerializer>,
}

/// Writes and reads registry snapshots using registered per-type hooks.
///
/// Only component types explicitly registered here appear in snapshots;
/// everything else on an entity is treated as runtime-only state.
#[derive(Default)]
pub struct Serializer {
    // Registration order fixes the component record order per entity.
    entries: Vec<SerializerEntry>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl Serializer {
    /// Creates a serializer with no registered component types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `serializer` for component type `T` under `name`.
    ///
    /// Registering the same name or the same type again replaces the
    /// previous hook.
    pub fn register<T: Component>(
        &mut self,
        name: impl Into<String>,
        serializer: impl ComponentSerializer + 'static,
    ) {
        let name = name.into();
        let type_id = TypeId::of::<T>();
        let entry = SerializerEntry {
            name: name.clone(),
            serializer: Box::new(serializer),
        };

        // Replace in place on either collision axis so names and types stay
        // one-to-one across the index maps.
        let existing = self
            .by_type
            .get(&type_id)
            .or_else(|| self.by_name.get(&name))
            .copied();
        let slot = match existing {
            Some(slot) => {
                self.by_name.remove(&self.entries[slot].name);
                self.by_type.retain(|_, s| *s != slot);
                self.entries[slot] = entry;
                slot
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        self.by_name.insert(name, slot);
        self.by_type.insert(type_id, slot);
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no component types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the registry's alive entities as a snapshot string.
    ///
    /// Entities are ordered by index so identical registries produce
    /// identical snapshots.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when a component hook fails to encode.
    pub fn snapshot(&self, registry: &Registry) -> Result<String, SnapshotError> {
        let mut out = String::new();
        out.push_str(SNAPSHOT_MAGIC);
        out.push(' ');
        out.push_str(SNAPSHOT_VERSION);
        out.push('\n');

        let mut entities = registry.entities();
        entities.sort_by_key(|entity| entity.index());

        for entity in entities {
            out.push_str(&format!(
                "entity {} {}\n",
                entity.index(),
                entity.generation()
            ));
            for entry in &self.entries {
                if entry.serializer.contains(entity, registry) {
                    let payload = entry.serializer.serialize(entity, registry)?;
                    out.push_str(&format!("component {} {payload}\n", entry.name));
                }
            }
        }

        out.push_str("end\n");
        Ok(out)
    }

    /// Writes a snapshot to `writer`.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] on encode or I/O failure.
    pub fn write_snapshot<W: Write>(
        &self,
        registry: &Registry,
        mut writer: W,
    ) -> Result<(), SnapshotError> {
        let text = self.snapshot(registry)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Rebuilds entities and components from snapshot `text`.
    ///
    /// When `clear_existing` is true the registry is emptied first. Every
    /// `entity` record spawns a fresh entity; recorded indices and
    /// generations are informational only and are not replayed into the
    /// allocator. Returns the number of entities restored.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] describing the first malformed record,
    /// failed decode, or failed registry operation.
    pub fn restore(
        &self,
        registry: &Registry,
        text: &str,
        clear_existing: bool,
    ) -> Result<usize, SnapshotError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (_, header) = lines.next().ok_or(SnapshotError::MalformedHeader)?;
        let version = header
            .strip_prefix(SNAPSHOT_MAGIC)
            .map(str::trim)
            .ok_or(SnapshotError::MalformedHeader)?;
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version.to_string()));
        }

        if clear_existing {
            registry.clear();
        }

        let mut current: Option<Entity> = None;
        let mut restored = 0usize;

        for (line_no, line) in lines {
            let mut parts = line.splitn(2, ' ');
            let keyword = parts.next().unwrap_or_default();
            let rest = parts.next().unwrap_or_default();

            match keyword {
                "entity" => {
                    // The recorded handle is logged for traceability only.
                    debug!("restoring entity record '{rest}'");
                    let entity = registry.spawn_entity()?;
                    current = Some(entity);
                    restored += 1;
                }
                "component" => {
                    let entity =
                        current.ok_or(SnapshotError::OrphanComponent(line_no))?;
                    let mut fields = rest.splitn(2, ' ');
                    let name = fields.next().unwrap_or_default();
                    let payload = fields.next().unwrap_or_default();
                    match self.by_name.get(name) {
                        Some(&slot) => {
                            self.entries[slot]
                                .serializer
                                .deserialize(entity, payload, registry)?;
                        }
                        None => {
                            warn!("skipping unknown component '{name}' at line {line_no}");
                        }
                    }
                }
                "end" => break,
                _ => {
                    return Err(SnapshotError::MalformedRecord {
                        line: line_no,
                        text: line.to_string(),
                    });
                }
            }
        }

        Ok(restored)
    }

    /// Reads a snapshot from `reader` and restores it.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] on I/O, parse, or registry failure.
    pub fn read_snapshot<R: Read>(
        &self,
        registry: &Registry,
        mut reader: R,
        clear_existing: bool,
    ) -> Result<usize, SnapshotError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.restore(registry, &text, clear_existing)
    }
}
