//! Observation snapshot types.
//!
//! An [`Observation`] is everything one agent knows about the world for one
//! tick. It carries only the fields the prompt encoder and the reactive
//! triggers need; transforms, meshes and other collaborator data never leak
//! into it. Once built it is never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::entity::InventorySlot;
use crate::geometry::Vec3;
use crate::ids::{EntityId, ObjectId};

/// A per-agent snapshot of its own state and its surroundings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Observation {
    /// Wall-clock time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Simulation tick the snapshot belongs to.
    pub tick: u64,
    /// The observing agent.
    pub self_state: SelfSnapshot,
    /// Characters within the search radius, nearest first.
    pub nearby_characters: Vec<NearbyCharacter>,
    /// Animals within the search radius, nearest first.
    pub nearby_animals: Vec<NearbyAnimal>,
    /// Interactable objects within the search radius, nearest first.
    pub nearby_objects: Vec<NearbyObject>,
}

impl Observation {
    /// Find a nearby character by id.
    pub fn character(&self, id: &EntityId) -> Option<&NearbyCharacter> {
        self.nearby_characters.iter().find(|c| &c.id == id)
    }
}

/// The observing agent's own state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SelfSnapshot {
    /// The agent's id.
    pub id: EntityId,
    /// Current position.
    pub position: Vec3,
    /// Current health.
    pub health: f32,
    /// Whether the agent is dead.
    pub dead: bool,
    /// Label of the agent's current action.
    pub current_action: String,
    /// Ordered inventory slots; `None` marks an empty slot.
    pub inventory: Vec<Option<InventorySlot>>,
}

/// A character seen by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyCharacter {
    /// Registry id.
    pub id: EntityId,
    /// Position.
    pub position: Vec3,
    /// Current health.
    pub health: f32,
    /// Whether the character is dead.
    pub dead: bool,
    /// What the character is doing.
    pub current_action: String,
}

/// An animal seen by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyAnimal {
    /// Registry id.
    pub id: EntityId,
    /// Species label.
    pub species: String,
    /// Position.
    pub position: Vec3,
    /// Current health.
    pub health: f32,
    /// Whether the animal is dead.
    pub dead: bool,
    /// Whether the animal attacks on sight.
    pub aggressive: bool,
}

/// An interactable object seen by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NearbyObject {
    /// Registry id.
    pub id: ObjectId,
    /// Object type.
    pub object_type: String,
    /// Resource tag, if harvestable.
    pub resource: Option<String>,
    /// Position.
    pub position: Vec3,
}
