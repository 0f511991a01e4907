//! Collaborator ports and spatial queries over them.
//!
//! The engine never owns world state. It reads the live entity registry, the
//! interactable object registry, inventories, terrain and the event log
//! through [`WorldView`], and asks [`CombatExecutor`] to start attacks. The
//! query helpers here are the only places that search the registries, and
//! they always compare squared distances.

use wayfarer_types::{EntityId, EntityKind, EntityRecord, InventorySlot, ObjectId, TargetRef, Vec3, WorldObject};

/// Read access to the world collaborators.
pub trait WorldView {
    /// Look up a live entity by id. Dead entities may still be returned with
    /// `dead == true` until the host despawns them.
    fn entity(&self, id: &EntityId) -> Option<&EntityRecord>;

    /// Look up an interactable object by id.
    fn object(&self, id: &ObjectId) -> Option<&WorldObject>;

    /// Broad phase: entities possibly within `radius` of `center`. May
    /// over-approximate; callers filter by exact distance.
    fn entities_near(&self, center: Vec3, radius: f32) -> Vec<&EntityRecord>;

    /// Broad phase: objects possibly within `radius` of `center`.
    fn objects_near(&self, center: Vec3, radius: f32) -> Vec<&WorldObject>;

    /// Ordered inventory slots of an entity; `None` marks an empty slot.
    fn inventory(&self, id: &EntityId) -> Vec<Option<InventorySlot>>;

    /// Ground height at a horizontal position.
    fn terrain_height(&self, x: f32, z: f32) -> f32;

    /// The last `limit` lines of an entity's event log, oldest first.
    fn recent_events(&self, id: &EntityId, limit: usize) -> Vec<String>;

    /// The player's locale preference, if the host has one.
    fn locale(&self) -> Option<&str> {
        None
    }
}

/// The combat collaborator. Damage math and attack cooldowns live behind it.
pub trait CombatExecutor {
    /// Ask for an attack by `attacker` on `target`. Returns whether a swing
    /// actually started (false while the attacker's cooldown runs).
    fn initiate_attack(&mut self, attacker: &EntityId, target: &TargetRef) -> bool;
}

/// Whether `b` lies within `radius` of `a` on the horizontal plane.
pub fn within_radius(a: Vec3, b: Vec3, radius: f32) -> bool {
    a.horizontal_distance_squared(b) <= radius * radius
}

/// Resolve a target's current position, if it still exists.
pub fn target_position<W: WorldView + ?Sized>(world: &W, target: &TargetRef) -> Option<Vec3> {
    match target {
        TargetRef::Entity(id) => world.entity(id).map(|e| e.position),
        TargetRef::Object(id) => world.object(id).map(|o| o.position),
    }
}

/// Whether a target is still worth approaching: alive entity, or an
/// interactable, non-depleted object.
pub fn target_is_valid<W: WorldView + ?Sized>(world: &W, target: &TargetRef) -> bool {
    match target {
        TargetRef::Entity(id) => world.entity(id).is_some_and(EntityRecord::is_alive),
        TargetRef::Object(id) => world.object(id).is_some_and(WorldObject::is_available),
    }
}

/// A specific entity, if it is alive and within `radius` of `origin`.
pub fn living_entity_within<'w, W: WorldView + ?Sized>(
    world: &'w W,
    id: &EntityId,
    origin: Vec3,
    radius: f32,
) -> Option<&'w EntityRecord> {
    world
        .entity(id)
        .filter(|e| e.is_alive() && within_radius(origin, e.position, radius))
}

/// The nearest living entity matching `pred` within `radius`.
fn nearest_entity_where<'w, W, F>(
    world: &'w W,
    origin: Vec3,
    radius: f32,
    pred: F,
) -> Option<&'w EntityRecord>
where
    W: WorldView + ?Sized,
    F: Fn(&EntityRecord) -> bool,
{
    let radius_sq = radius * radius;
    world
        .entities_near(origin, radius)
        .into_iter()
        .filter(|e| e.is_alive() && pred(*e))
        .map(|e| (origin.horizontal_distance_squared(e.position), e))
        .filter(|(d, _)| *d <= radius_sq)
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, e)| e)
}

/// The nearest living character within `radius`, excluding `exclude`.
pub fn nearest_living_character<'w, W: WorldView + ?Sized>(
    world: &'w W,
    origin: Vec3,
    radius: f32,
    exclude: &EntityId,
) -> Option<&'w EntityRecord> {
    nearest_entity_where(world, origin, radius, |e| {
        e.kind == EntityKind::Character && &e.id != exclude
    })
}

/// The nearest living animal of `species` within `radius`.
pub fn nearest_animal_of_species<'w, W: WorldView + ?Sized>(
    world: &'w W,
    origin: Vec3,
    radius: f32,
    species: &str,
) -> Option<&'w EntityRecord> {
    nearest_entity_where(world, origin, radius, |e| {
        e.kind == EntityKind::Animal && e.species.as_deref() == Some(species)
    })
}

/// The nearest available object whose target type is `target_type`.
pub fn nearest_object_of_type<'w, W: WorldView + ?Sized>(
    world: &'w W,
    origin: Vec3,
    radius: f32,
    target_type: &str,
) -> Option<&'w WorldObject> {
    let radius_sq = radius * radius;
    world
        .objects_near(origin, radius)
        .into_iter()
        .filter(|o| o.is_available() && o.target_type() == target_type)
        .map(|o| (origin.horizontal_distance_squared(o.position), o))
        .filter(|(d, _)| *d <= radius_sq)
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, o)| o)
}

/// The nearest live instance of a target type: an animal species first,
/// then an object resource tag.
pub fn nearest_of_type<W: WorldView + ?Sized>(
    world: &W,
    origin: Vec3,
    radius: f32,
    target_type: &str,
) -> Option<TargetRef> {
    nearest_animal_of_species(world, origin, radius, target_type)
        .map(|e| TargetRef::Entity(e.id.clone()))
        .or_else(|| {
            nearest_object_of_type(world, origin, radius, target_type)
                .map(|o| TargetRef::Object(o.id.clone()))
        })
}
