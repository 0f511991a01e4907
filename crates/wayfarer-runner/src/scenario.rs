//! Scenario files.
//!
//! A scenario is a YAML document describing the starting world: characters
//! (with a persona when the oracle should drive them), animals, interactable
//! objects, starting inventories and seed lines for the event logs.
//!
//! ```yaml
//! locale: en
//! characters:
//!   - id: Ann
//!     persona: A friendly farmer who trades vegetables.
//!     position: { x: 0.0, y: 0.0, z: 0.0 }
//!     inventory: [{ id: carrot, count: 4 }]
//!   - id: Bob
//!     position: { x: 6.0, y: 0.0, z: 2.0 }
//! animals:
//!   - id: wolf_1
//!     species: wolf
//!     aggressive: true
//!     position: { x: 25.0, y: 0.0, z: -10.0 }
//! objects:
//!   - id: tree_1
//!     object_type: tree
//!     resource: wood
//!     position: { x: 4.0, y: 0.0, z: 8.0 }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use rand::Rng;
use serde::Deserialize;
use tracing::info;
use wayfarer_agents::{AnimalAgent, HumanoidAgent};
use wayfarer_core::{BehaviorConfig, MemoryWorld};
use wayfarer_types::{
    EntityId, EntityKind, EntityRecord, InventorySlot, ObjectId, Vec3, WorldObject,
};

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Flat ground height.
    #[serde(default)]
    pub ground_height: f32,
    /// Prompt language preferred by this world.
    #[serde(default)]
    pub locale: Option<String>,
    /// Humanoids. Those with a persona are oracle-driven.
    #[serde(default)]
    pub characters: Vec<CharacterSpec>,
    /// Animals.
    #[serde(default)]
    pub animals: Vec<AnimalSpec>,
    /// Interactable objects.
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
}

/// One character.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterSpec {
    /// Entity id, also the name the oracle sees.
    pub id: String,
    /// Persona text. Characters without one stand still.
    #[serde(default)]
    pub persona: Option<String>,
    /// Starting position.
    pub position: Vec3,
    /// Home position for fallback roams; defaults to the start.
    #[serde(default)]
    pub home: Option<Vec3>,
    /// Starting health.
    #[serde(default = "default_health")]
    pub health: f32,
    /// Starting inventory.
    #[serde(default)]
    pub inventory: Vec<InventorySlot>,
    /// Seed lines for the character's event log, oldest first.
    #[serde(default)]
    pub events: Vec<String>,
}

/// One animal.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimalSpec {
    /// Entity id.
    pub id: String,
    /// Species, used for type-based re-targeting.
    pub species: String,
    /// Starting position, also the animal's home.
    pub position: Vec3,
    /// Starting health.
    #[serde(default = "default_health")]
    pub health: f32,
    /// Whether it hunts characters on sight.
    #[serde(default)]
    pub aggressive: bool,
}

/// One interactable object.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    /// Object id.
    pub id: String,
    /// Object type (`tree`, `rock`).
    pub object_type: String,
    /// Position.
    pub position: Vec3,
    /// Resource tag yielded when harvested.
    #[serde(default)]
    pub resource: Option<String>,
    /// Whether agents may target it.
    #[serde(default = "default_interactable")]
    pub interactable: bool,
}

const fn default_health() -> f32 {
    100.0
}

const fn default_interactable() -> bool {
    true
}

/// A scenario turned into a live world and its agents.
pub struct Population {
    /// The world registry.
    pub world: MemoryWorld,
    /// Oracle-driven characters.
    pub humanoids: Vec<HumanoidAgent>,
    /// Animals.
    pub animals: Vec<AnimalAgent>,
}

impl Scenario {
    /// Read and validate a scenario file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    /// Parse and validate a scenario document.
    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        let scenario: Self = serde_yml::from_str(yaml).context("scenario is not valid YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut entity_ids = HashSet::new();
        let entity_names = self
            .characters
            .iter()
            .map(|c| c.id.as_str())
            .chain(self.animals.iter().map(|a| a.id.as_str()));
        for id in entity_names {
            if id.trim().is_empty() {
                bail!("entity with an empty id");
            }
            if !entity_ids.insert(id) {
                bail!("duplicate entity id {id:?}");
            }
        }

        let mut object_ids = HashSet::new();
        for object in &self.objects {
            if !object_ids.insert(object.id.as_str()) {
                bail!("duplicate object id {:?}", object.id);
            }
        }

        for character in &self.characters {
            if character.persona.as_deref().is_some_and(|p| p.trim().is_empty()) {
                bail!("character {:?} has an empty persona", character.id);
            }
        }
        Ok(())
    }

    /// Build the world and its agents. Agents start at simulation time `now`.
    pub fn populate<R: Rng + ?Sized>(
        self,
        behavior: &BehaviorConfig,
        now: Duration,
        rng: &mut R,
    ) -> Population {
        let mut world = MemoryWorld::new().with_ground_height(self.ground_height);
        if let Some(locale) = self.locale {
            world = world.with_locale(locale);
        }
        let mut humanoids = Vec::new();
        let mut animals = Vec::new();

        for c in self.characters {
            let id = EntityId::new(c.id);
            world.insert_entity(EntityRecord {
                id: id.clone(),
                kind: EntityKind::Character,
                species: None,
                position: c.position,
                health: c.health,
                dead: false,
                aggressive: false,
                current_action: "idle".to_owned(),
            });
            if !c.inventory.is_empty() {
                world.set_inventory(&id, c.inventory.into_iter().map(Some).collect());
            }
            for line in c.events {
                world.push_event(&id, line);
            }
            if let Some(persona) = c.persona {
                let home = c.home.unwrap_or(c.position);
                humanoids.push(HumanoidAgent::new(
                    id,
                    persona,
                    home,
                    behavior.agent.clone(),
                    now,
                    rng,
                ));
            }
        }

        for a in self.animals {
            let id = EntityId::new(a.id);
            world.insert_entity(EntityRecord {
                id: id.clone(),
                kind: EntityKind::Animal,
                species: Some(a.species),
                position: a.position,
                health: a.health,
                dead: false,
                aggressive: a.aggressive,
                current_action: "idle".to_owned(),
            });
            animals.push(AnimalAgent::new(
                id,
                a.position,
                a.aggressive,
                behavior.animal.clone(),
                now,
                rng,
            ));
        }

        for o in self.objects {
            world.insert_object(WorldObject {
                id: ObjectId::new(o.id),
                object_type: o.object_type,
                position: o.position,
                interactable: o.interactable,
                resource: o.resource,
                depleted: false,
            });
        }

        info!(
            humanoids = humanoids.len(),
            animals = animals.len(),
            "scenario populated"
        );
        Population {
            world,
            humanoids,
            animals,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wayfarer_core::WorldView;

    use super::*;

    const SAMPLE: &str = r"
locale: de
characters:
  - id: Ann
    persona: A friendly farmer.
    position: { x: 0.0, y: 0.0, z: 0.0 }
    inventory: [{ id: carrot, count: 4 }]
    events: [Sold carrots at the market.]
  - id: Bob
    position: { x: 6.0, y: 0.0, z: 2.0 }
    health: 40
animals:
  - id: wolf_1
    species: wolf
    aggressive: true
    position: { x: 25.0, y: 0.0, z: -10.0 }
objects:
  - id: tree_1
    object_type: tree
    resource: wood
    position: { x: 4.0, y: 0.0, z: 8.0 }
";

    #[test]
    fn sample_populates_world_and_agents() {
        let scenario = Scenario::parse(SAMPLE).unwrap();
        let population = scenario.populate(
            &BehaviorConfig::default(),
            Duration::ZERO,
            &mut StdRng::seed_from_u64(1),
        );

        // Bob has no persona: present in the world, not driven.
        assert_eq!(population.humanoids.len(), 1);
        assert_eq!(population.animals.len(), 1);
        let world = &population.world;
        assert_eq!(world.locale(), Some("de"));
        let bob = world.entity(&EntityId::from("Bob")).unwrap();
        assert!((bob.health - 40.0).abs() < f32::EPSILON);
        assert_eq!(
            world.inventory(&EntityId::from("Ann")),
            vec![Some(InventorySlot {
                id: "carrot".to_owned(),
                count: 4
            })]
        );
        assert_eq!(
            world.recent_events(&EntityId::from("Ann"), 5),
            vec!["Sold carrots at the market.".to_owned()]
        );
        assert!(world.object(&ObjectId::from("tree_1")).unwrap().is_available());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = r"
characters:
  - id: Ann
    position: { x: 0.0, y: 0.0, z: 0.0 }
animals:
  - id: Ann
    species: deer
    position: { x: 1.0, y: 0.0, z: 0.0 }
";
        let err = Scenario::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate entity id"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = r"
characters:
  - id: Ann
    position: { x: 0.0, y: 0.0, z: 0.0 }
    mood: grumpy
";
        assert!(Scenario::parse(yaml).is_err());
    }
}
