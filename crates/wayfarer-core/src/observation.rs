//! Observation snapshots.
//!
//! [`snapshot`] copies the minimal state an agent needs to decide from the
//! world ports into an immutable [`Observation`]. Candidates come from the
//! broad phase and are filtered by squared distance, so the cost stays
//! proportional to the number of nearby entities.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use wayfarer_types::{
    EntityId, EntityKind, NearbyAnimal, NearbyCharacter, NearbyObject, ObjectId, Observation,
    SelfSnapshot,
};

use crate::config::PromptConfig;
use crate::world::WorldView;

/// Build an observation for `agent` covering everything within `radius`.
///
/// Returns `None` when the agent is not in the entity registry. The agent
/// itself is never listed as a neighbour; depleted or non-interactable
/// objects are omitted. Each list is deduplicated, sorted nearest first and
/// capped by the limits in `limits`.
pub fn snapshot<W: WorldView + ?Sized>(
    world: &W,
    agent: &EntityId,
    radius: f32,
    limits: &PromptConfig,
    tick: u64,
    timestamp: DateTime<Utc>,
) -> Option<Observation> {
    let me = world.entity(agent)?;
    let origin = me.position;
    let radius_sq = radius * radius;

    let mut seen: HashSet<&EntityId> = HashSet::new();
    let mut characters: Vec<(f32, NearbyCharacter)> = Vec::new();
    let mut animals: Vec<(f32, NearbyAnimal)> = Vec::new();

    for entity in world.entities_near(origin, radius) {
        if &entity.id == agent || !seen.insert(&entity.id) {
            continue;
        }
        let d = origin.horizontal_distance_squared(entity.position);
        if d > radius_sq {
            continue;
        }
        match entity.kind {
            EntityKind::Character => characters.push((
                d,
                NearbyCharacter {
                    id: entity.id.clone(),
                    position: entity.position,
                    health: entity.health,
                    dead: entity.dead,
                    current_action: entity.current_action.clone(),
                },
            )),
            EntityKind::Animal => animals.push((
                d,
                NearbyAnimal {
                    id: entity.id.clone(),
                    species: entity.species.clone().unwrap_or_default(),
                    position: entity.position,
                    health: entity.health,
                    dead: entity.dead,
                    aggressive: entity.aggressive,
                },
            )),
        }
    }

    let mut seen_objects: HashSet<ObjectId> = HashSet::new();
    let mut objects: Vec<(f32, NearbyObject)> = world
        .objects_near(origin, radius)
        .into_iter()
        .filter(|o| o.is_available() && seen_objects.insert(o.id.clone()))
        .map(|o| (origin.horizontal_distance_squared(o.position), o))
        .filter(|(d, _)| *d <= radius_sq)
        .map(|(d, o)| {
            (
                d,
                NearbyObject {
                    id: o.id.clone(),
                    object_type: o.object_type.clone(),
                    resource: o.resource.clone(),
                    position: o.position,
                },
            )
        })
        .collect();

    Some(Observation {
        timestamp,
        tick,
        self_state: SelfSnapshot {
            id: me.id.clone(),
            position: me.position,
            health: me.health,
            dead: me.dead,
            current_action: me.current_action.clone(),
            inventory: world.inventory(agent),
        },
        nearby_characters: nearest_first(&mut characters, limits.max_characters),
        nearby_animals: nearest_first(&mut animals, limits.max_animals),
        nearby_objects: nearest_first(&mut objects, limits.max_objects),
    })
}

fn nearest_first<T>(items: &mut Vec<(f32, T)>, cap: usize) -> Vec<T> {
    items.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    items.truncate(cap);
    items.drain(..).map(|(_, item)| item).collect()
}
