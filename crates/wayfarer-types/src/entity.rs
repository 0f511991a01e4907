//! Registry records for live entities and interactable objects.
//!
//! These are the shapes the engine reads from the world collaborators. The
//! [`EntityKind`] discriminator is set when an entity is created and is the
//! only way the engine tells characters and animals apart.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::Vec3;
use crate::ids::{EntityId, ObjectId};

/// What kind of live entity a registry record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// A humanoid: player or NPC.
    Character,
    /// An animal driven by the reactive state machine.
    Animal,
}

/// One entry of the live entity registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityRecord {
    /// Registry identifier.
    pub id: EntityId,
    /// Character or animal.
    pub kind: EntityKind,
    /// Species for animals (`"wolf"`, `"deer"`); `None` for characters.
    pub species: Option<String>,
    /// World position.
    pub position: Vec3,
    /// Current health points.
    pub health: f32,
    /// Whether the entity is dead.
    pub dead: bool,
    /// Whether the entity attacks on sight.
    pub aggressive: bool,
    /// Label of what the entity is currently doing (`"idle"`, `"attacking"`).
    pub current_action: String,
}

impl EntityRecord {
    /// Whether this record is alive.
    pub const fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Whether this record is a living character.
    pub fn is_living_character(&self) -> bool {
        self.kind == EntityKind::Character && !self.dead
    }

    /// The type label used for type-based re-targeting.
    ///
    /// Animals are grouped by species; characters have no type label because
    /// they are always targeted by id.
    pub fn target_type(&self) -> Option<&str> {
        match self.kind {
            EntityKind::Animal => self.species.as_deref(),
            EntityKind::Character => None,
        }
    }
}

/// One entry of the interactable object registry (trees, rocks, chests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldObject {
    /// Registry identifier.
    pub id: ObjectId,
    /// Object type (`"tree"`, `"rock"`).
    pub object_type: String,
    /// World position.
    pub position: Vec3,
    /// Whether agents may interact with it at all.
    pub interactable: bool,
    /// Resource tag yielded when harvested (`"wood"`, `"stone"`).
    pub resource: Option<String>,
    /// Whether the resource has been exhausted.
    pub depleted: bool,
}

impl WorldObject {
    /// Whether an agent can currently target this object.
    pub const fn is_available(&self) -> bool {
        self.interactable && !self.depleted
    }

    /// The type label used for type-based re-targeting: the resource tag,
    /// falling back to the object type for untagged objects.
    pub fn target_type(&self) -> &str {
        self.resource.as_deref().unwrap_or(&self.object_type)
    }
}

/// One occupied inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InventorySlot {
    /// Item identifier.
    pub id: String,
    /// Stack size.
    pub count: u32,
}
