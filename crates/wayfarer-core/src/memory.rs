//! In-memory implementation of the world collaborator ports.
//!
//! [`MemoryWorld`] keeps registries in ordered maps and indexes positions in
//! a [`SpatialGrid`] so radius queries stay proportional to local density.
//! The runner uses it as its world store and the tests use it as a fixture.
//! Positions must be changed through [`MemoryWorld::update_entity`] or
//! [`MemoryWorld::move_entity`] so the index stays in sync.

use std::collections::BTreeMap;

use wayfarer_types::{EntityId, EntityRecord, InventorySlot, ObjectId, Vec3, WorldObject};

use crate::spatial::SpatialGrid;
use crate::world::WorldView;

/// Default broad-phase cell size in world units.
const DEFAULT_CELL_SIZE: f32 = 16.0;

/// Registries, inventories, event logs and a flat terrain in memory.
#[derive(Debug, Clone)]
pub struct MemoryWorld {
    entities: BTreeMap<EntityId, EntityRecord>,
    objects: BTreeMap<ObjectId, WorldObject>,
    inventories: BTreeMap<EntityId, Vec<Option<InventorySlot>>>,
    event_logs: BTreeMap<EntityId, Vec<String>>,
    entity_index: SpatialGrid<EntityId>,
    object_index: SpatialGrid<ObjectId>,
    ground_height: f32,
    locale: Option<String>,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorld {
    /// Create an empty world with flat ground at height 0.
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            objects: BTreeMap::new(),
            inventories: BTreeMap::new(),
            event_logs: BTreeMap::new(),
            entity_index: SpatialGrid::new(DEFAULT_CELL_SIZE),
            object_index: SpatialGrid::new(DEFAULT_CELL_SIZE),
            ground_height: 0.0,
            locale: None,
        }
    }

    /// Set the flat ground height.
    #[must_use]
    pub const fn with_ground_height(mut self, height: f32) -> Self {
        self.ground_height = height;
        self
    }

    /// Set the locale preference reported to agents.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Insert or replace an entity.
    pub fn insert_entity(&mut self, record: EntityRecord) {
        if let Some(old) = self.entities.get(&record.id) {
            self.entity_index.remove(&old.id, old.position);
        }
        self.entity_index.insert(record.id.clone(), record.position);
        self.entities.insert(record.id.clone(), record);
    }

    /// Mutate an entity in place, keeping the spatial index in sync.
    /// Returns `false` if the entity does not exist.
    pub fn update_entity(&mut self, id: &EntityId, f: impl FnOnce(&mut EntityRecord)) -> bool {
        let Some(record) = self.entities.get_mut(id) else {
            return false;
        };
        let before = record.position;
        f(record);
        let after = record.position;
        self.entity_index.relocate(id, before, after);
        true
    }

    /// Move an entity to `position`.
    pub fn move_entity(&mut self, id: &EntityId, position: Vec3) -> bool {
        self.update_entity(id, |r| r.position = position)
    }

    /// Insert or replace an object.
    pub fn insert_object(&mut self, object: WorldObject) {
        if let Some(old) = self.objects.get(&object.id) {
            self.object_index.remove(&old.id, old.position);
        }
        self.object_index.insert(object.id.clone(), object.position);
        self.objects.insert(object.id.clone(), object);
    }

    /// Mutate an object in place (positions of objects are fixed).
    pub fn update_object(&mut self, id: &ObjectId, f: impl FnOnce(&mut WorldObject)) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        let before = object.position;
        f(object);
        object.position = before;
        true
    }

    /// Replace an entity's inventory snapshot.
    pub fn set_inventory(&mut self, id: &EntityId, slots: Vec<Option<InventorySlot>>) {
        self.inventories.insert(id.clone(), slots);
    }

    /// Append a line to an entity's event log.
    pub fn push_event(&mut self, id: &EntityId, line: impl Into<String>) {
        self.event_logs.entry(id.clone()).or_default().push(line.into());
    }
}

impl WorldView for MemoryWorld {
    fn entity(&self, id: &EntityId) -> Option<&EntityRecord> {
        self.entities.get(id)
    }

    fn object(&self, id: &ObjectId) -> Option<&WorldObject> {
        self.objects.get(id)
    }

    fn entities_near(&self, center: Vec3, radius: f32) -> Vec<&EntityRecord> {
        self.entity_index
            .candidates(center, radius)
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    fn objects_near(&self, center: Vec3, radius: f32) -> Vec<&WorldObject> {
        self.object_index
            .candidates(center, radius)
            .iter()
            .filter_map(|id| self.objects.get(id))
            .collect()
    }

    fn inventory(&self, id: &EntityId) -> Vec<Option<InventorySlot>> {
        self.inventories.get(id).cloned().unwrap_or_default()
    }

    fn terrain_height(&self, _x: f32, _z: f32) -> f32 {
        self.ground_height
    }

    fn recent_events(&self, id: &EntityId, limit: usize) -> Vec<String> {
        self.event_logs.get(id).map_or_else(Vec::new, |log| {
            let skip = log.len().saturating_sub(limit);
            log.iter().skip(skip).cloned().collect()
        })
    }

    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use wayfarer_types::EntityKind;

    use super::*;
    use crate::world::{nearest_living_character, nearest_object_of_type};

    fn character(id: &str, x: f32) -> EntityRecord {
        EntityRecord {
            id: EntityId::from(id),
            kind: EntityKind::Character,
            species: None,
            position: Vec3::new(x, 0.0, 0.0),
            health: 100.0,
            dead: false,
            aggressive: false,
            current_action: "idle".to_owned(),
        }
    }

    #[test]
    fn moved_entity_is_found_at_new_position() {
        let mut world = MemoryWorld::new();
        world.insert_entity(character("Bob", 0.0));
        assert!(world.move_entity(&EntityId::from("Bob"), Vec3::new(200.0, 0.0, 0.0)));

        let origin = Vec3::new(199.0, 0.0, 0.0);
        let found = nearest_living_character(&world, origin, 5.0, &EntityId::from("me"));
        assert_eq!(found.map(|e| e.id.as_str()), Some("Bob"));
        let stale = nearest_living_character(&world, Vec3::ZERO, 5.0, &EntityId::from("me"));
        assert!(stale.is_none());
    }

    #[test]
    fn event_log_returns_latest_lines_in_order() {
        let mut world = MemoryWorld::new();
        let id = EntityId::from("Ann");
        for i in 0..12 {
            world.push_event(&id, format!("event {i}"));
        }
        let lines = world.recent_events(&id, 3);
        assert_eq!(lines, vec!["event 9", "event 10", "event 11"]);
    }

    #[test]
    fn depleted_objects_are_skipped_by_type_queries() {
        let mut world = MemoryWorld::new();
        world.insert_object(WorldObject {
            id: ObjectId::from("tree_1"),
            object_type: "tree".to_owned(),
            position: Vec3::new(2.0, 0.0, 0.0),
            interactable: true,
            resource: Some("wood".to_owned()),
            depleted: false,
        });
        assert!(nearest_object_of_type(&world, Vec3::ZERO, 10.0, "wood").is_some());

        world.update_object(&ObjectId::from("tree_1"), |o| o.depleted = true);
        assert!(nearest_object_of_type(&world, Vec3::ZERO, 10.0, "wood").is_none());
    }
}
