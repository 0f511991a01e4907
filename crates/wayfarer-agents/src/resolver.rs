//! Action resolution.
//!
//! [`ActionResolver`] turns an oracle response into changes of an agent's
//! [`Plan`]: what it is doing, whom it is approaching and what it remembers
//! wanting to attack. Targets named by the oracle are checked against the
//! live registries; anything that does not check out degrades to idle,
//! target-lost handling or the fallback roam. Nothing here is fatal.

use rand::Rng;
use tracing::{debug, info, warn};
use wayfarer_core::world::{
    nearest_animal_of_species, nearest_object_of_type, nearest_of_type, living_entity_within,
};
use wayfarer_core::{AgentConfig, ParseError, ReplyLimits, WorldView, parse_decision};
use wayfarer_types::{
    AgentState, DecisionAction, DecisionResult, EntityId, EntityKind, ObjectId, PersistentAction,
    TargetRef, TradeItem, Vec3,
};

use crate::steering::random_point_in_disc;

/// Display intent of the fallback roam.
pub const FALLBACK_INTENT: &str = "Exploring";

/// The resolver-owned part of a humanoid agent's state.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Current state-machine state.
    pub state: AgentState,
    /// What the agent is approaching.
    pub target: Option<TargetRef>,
    /// What it will do on arrival.
    pub target_action: Option<DecisionAction>,
    /// Draft chat message, delivered on arrival.
    pub message: Option<String>,
    /// Items offered in a pending trade.
    pub give_items: Vec<TradeItem>,
    /// Items requested in a pending trade.
    pub receive_items: Vec<TradeItem>,
    /// Remembered attack intent that survives target loss.
    pub persistent_action: Option<PersistentAction>,
    /// Short display text for UI.
    pub intent: String,
    /// Where a roaming agent is heading.
    pub roam_destination: Option<Vec3>,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            state: AgentState::Idle,
            target: None,
            target_action: None,
            message: None,
            give_items: Vec::new(),
            receive_items: Vec::new(),
            persistent_action: None,
            intent: String::new(),
            roam_destination: None,
        }
    }
}

impl Plan {
    /// Drop the current approach. The persistent action is kept.
    pub fn clear_target(&mut self) {
        self.target = None;
        self.target_action = None;
        self.message = None;
        self.give_items.clear();
        self.receive_items.clear();
    }

    /// Return to idle, keeping the persistent action.
    pub fn go_idle(&mut self) {
        self.clear_target();
        self.roam_destination = None;
        self.state = AgentState::Idle;
    }

    /// Forget everything (death, respawn).
    pub fn reset(&mut self, state: AgentState) {
        *self = Self {
            state,
            ..Self::default()
        };
    }

    fn approach(&mut self, target: TargetRef, action: DecisionAction, intent: &str) {
        self.target = Some(target);
        self.target_action = Some(action);
        self.roam_destination = None;
        self.state = AgentState::MovingToTarget;
        self.intent = if intent.is_empty() {
            action.as_str().to_owned()
        } else {
            intent.to_owned()
        };
    }
}

/// Where the resolving agent is.
#[derive(Debug, Clone, Copy)]
pub struct Locus<'a> {
    /// The agent's id.
    pub id: &'a EntityId,
    /// Current position; all re-acquisition searches start here.
    pub position: Vec3,
    /// Home position; fallback roams stay near it.
    pub home: Vec3,
}

/// Applies oracle responses to a [`Plan`].
#[derive(Debug, Clone, Copy)]
pub struct ActionResolver<'a> {
    config: &'a AgentConfig,
}

impl<'a> ActionResolver<'a> {
    /// A resolver using the given agent tuning.
    pub const fn new(config: &'a AgentConfig) -> Self {
        Self { config }
    }

    /// Apply a raw oracle response (`None` when the call failed).
    pub fn resolve<W, R>(
        &self,
        plan: &mut Plan,
        raw: Option<&str>,
        limits: ReplyLimits,
        me: Locus<'_>,
        world: &W,
        rng: &mut R,
    ) where
        W: WorldView + ?Sized,
        R: Rng + ?Sized,
    {
        let Some(raw) = raw else {
            warn!(agent = %me.id, "no oracle response, falling back to roam");
            self.fallback(plan, me, world, rng);
            return;
        };
        match parse_decision(raw, limits) {
            Ok(Some(decision)) => self.apply(plan, &decision, me, world),
            Ok(None) => {
                debug!(agent = %me.id, "oracle response names no usable action, going idle");
                plan.go_idle();
            }
            Err(ParseError::Malformed(text)) => {
                warn!(agent = %me.id, raw_response = %text, "malformed oracle response, falling back to roam");
                self.fallback(plan, me, world, rng);
            }
        }
    }

    /// Apply a validated decision.
    pub fn apply<W: WorldView + ?Sized>(
        &self,
        plan: &mut Plan,
        decision: &DecisionResult,
        me: Locus<'_>,
        world: &W,
    ) {
        let Some(target_id) = decision.target_id.as_deref() else {
            plan.go_idle();
            return;
        };
        if target_id == me.id.as_str() {
            debug!(agent = %me.id, action = decision.action.as_str(), "oracle targeted the agent itself, going idle");
            plan.go_idle();
            return;
        }

        match decision.action {
            DecisionAction::Attack => self.apply_attack(plan, target_id, &decision.intent, me, world),
            DecisionAction::Chat | DecisionAction::Trade | DecisionAction::Follow => {
                let id = EntityId::from(target_id);
                let target_ok = world.entity(&id).is_some_and(|e| e.is_living_character());
                if !target_ok {
                    debug!(agent = %me.id, target = target_id, action = decision.action.as_str(), "target is not a living character, going idle");
                    plan.go_idle();
                    return;
                }
                plan.clear_target();
                plan.persistent_action = None;
                if decision.action == DecisionAction::Chat {
                    plan.message.clone_from(&decision.message);
                }
                if decision.action == DecisionAction::Trade {
                    plan.give_items.clone_from(&decision.give_items);
                    plan.receive_items.clone_from(&decision.receive_items);
                }
                plan.approach(TargetRef::Entity(id), decision.action, &decision.intent);
                info!(agent = %me.id, target = target_id, action = decision.action.as_str(), intent = %plan.intent, "decision resolved");
            }
        }
    }

    fn apply_attack<W: WorldView + ?Sized>(
        &self,
        plan: &mut Plan,
        target_id: &str,
        intent: &str,
        me: Locus<'_>,
        world: &W,
    ) {
        let radius = self.config.search_radius;
        let entity_id = EntityId::from(target_id);
        plan.clear_target();

        let substitute = if let Some(entity) = world.entity(&entity_id) {
            match entity.kind {
                EntityKind::Character => {
                    if entity.is_alive() {
                        plan.persistent_action = Some(PersistentAction::attack_id(entity_id));
                        Some(TargetRef::Entity(entity.id.clone()))
                    } else {
                        None
                    }
                }
                EntityKind::Animal => {
                    let species = entity.target_type().unwrap_or_default().to_owned();
                    let nearest = nearest_animal_of_species(world, me.position, radius, &species)
                        .map(|e| TargetRef::Entity(e.id.clone()));
                    plan.persistent_action = Some(PersistentAction::attack_type(species));
                    nearest
                }
            }
        } else if let Some(object) = world.object(&ObjectId::from(target_id)) {
            let target_type = object.target_type().to_owned();
            let nearest = nearest_object_of_type(world, me.position, radius, &target_type)
                .map(|o| TargetRef::Object(o.id.clone()));
            plan.persistent_action = Some(PersistentAction::attack_type(target_type));
            nearest
        } else {
            None
        };

        match substitute {
            Some(target) => {
                info!(agent = %me.id, named = target_id, target = %target, "attack resolved");
                plan.approach(target, DecisionAction::Attack, intent);
            }
            None => {
                debug!(agent = %me.id, named = target_id, "attack target did not resolve");
                if self.target_lost(plan, me, world) && !intent.is_empty() {
                    plan.intent = intent.to_owned();
                }
            }
        }
    }

    /// Re-acquire a target from the persistent action. Returns whether the
    /// agent keeps approaching something; otherwise the persistent action is
    /// cleared and the agent is idle.
    pub fn target_lost<W: WorldView + ?Sized>(
        &self,
        plan: &mut Plan,
        me: Locus<'_>,
        world: &W,
    ) -> bool {
        let radius = self.config.search_radius;
        let reacquired = plan.persistent_action.as_ref().and_then(|action| {
            if let Some(id) = &action.target_id {
                living_entity_within(world, id, me.position, radius)
                    .map(|e| TargetRef::Entity(e.id.clone()))
            } else if let Some(target_type) = &action.target_type {
                nearest_of_type(world, me.position, radius, target_type)
            } else {
                None
            }
        });

        if let Some(target) = reacquired {
            debug!(agent = %me.id, target = %target, "target re-acquired");
            let intent = std::mem::take(&mut plan.intent);
            plan.clear_target();
            plan.approach(target, DecisionAction::Attack, &intent);
            true
        } else {
            debug!(agent = %me.id, "no valid target found, going idle");
            plan.persistent_action = None;
            plan.go_idle();
            false
        }
    }

    /// Local roam used when the oracle is unavailable or unusable.
    pub fn fallback<W, R>(&self, plan: &mut Plan, me: Locus<'_>, world: &W, rng: &mut R)
    where
        W: WorldView + ?Sized,
        R: Rng + ?Sized,
    {
        let destination = random_point_in_disc(world, rng, me.home, self.config.roam_radius);
        plan.clear_target();
        plan.persistent_action = None;
        plan.roam_destination = Some(destination);
        plan.intent = FALLBACK_INTENT.to_owned();
        plan.state = AgentState::Roaming;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wayfarer_core::MemoryWorld;
    use wayfarer_types::{EntityRecord, PersistentActionKind, WorldObject};

    use super::*;

    fn record(id: &str, kind: EntityKind, species: Option<&str>, x: f32) -> EntityRecord {
        EntityRecord {
            id: EntityId::from(id),
            kind,
            species: species.map(str::to_owned),
            position: Vec3::new(x, 0.0, 0.0),
            health: 100.0,
            dead: false,
            aggressive: false,
            current_action: "idle".to_owned(),
        }
    }

    fn wood(id: &str, x: f32) -> WorldObject {
        WorldObject {
            id: ObjectId::from(id),
            object_type: "tree".to_owned(),
            position: Vec3::new(x, 0.0, 0.0),
            interactable: true,
            resource: Some("wood".to_owned()),
            depleted: false,
        }
    }

    fn world() -> MemoryWorld {
        let mut world = MemoryWorld::new();
        world.insert_entity(record("Ann", EntityKind::Character, None, 0.0));
        world.insert_entity(record("Bob", EntityKind::Character, None, 6.0));
        world.insert_entity(record("wolf_far", EntityKind::Animal, Some("wolf"), 20.0));
        world.insert_entity(record("wolf_near", EntityKind::Animal, Some("wolf"), 4.0));
        world
    }

    fn resolve(plan: &mut Plan, world: &MemoryWorld, raw: Option<&str>) {
        let config = AgentConfig::default();
        let me = EntityId::from("Ann");
        let locus = Locus {
            id: &me,
            position: Vec3::ZERO,
            home: Vec3::ZERO,
        };
        ActionResolver::new(&config).resolve(
            plan,
            raw,
            ReplyLimits::decision(10),
            locus,
            world,
            &mut StdRng::seed_from_u64(5),
        );
    }

    #[test]
    fn attack_on_character_records_target_id() {
        let world = world();
        let mut plan = Plan::default();
        resolve(
            &mut plan,
            &world,
            Some(r#"{"action":"attack","target_id":"Bob","intent":"settle the score"}"#),
        );

        assert_eq!(plan.state, AgentState::MovingToTarget);
        let persistent = plan.persistent_action.as_ref().unwrap();
        assert_eq!(persistent.kind, PersistentActionKind::Attack);
        assert_eq!(persistent.target_id.as_ref().map(EntityId::as_str), Some("Bob"));
        assert_eq!(plan.target, Some(TargetRef::Entity(EntityId::from("Bob"))));
        assert_eq!(plan.intent, "settle the score");
    }

    #[test]
    fn attack_on_animal_substitutes_nearest_of_species() {
        let world = world();
        let mut plan = Plan::default();
        resolve(
            &mut plan,
            &world,
            Some(r#"{"action":"attack","target_id":"wolf_far","intent":"hunt"}"#),
        );

        assert_eq!(plan.state, AgentState::MovingToTarget);
        assert_eq!(plan.target, Some(TargetRef::Entity(EntityId::from("wolf_near"))));
        let persistent = plan.persistent_action.as_ref().unwrap();
        assert_eq!(persistent.target_type.as_deref(), Some("wolf"));
        assert!(persistent.target_id.is_none());
    }

    #[test]
    fn attack_on_unknown_target_with_no_memory_goes_idle() {
        let world = world();
        let mut plan = Plan::default();
        resolve(
            &mut plan,
            &world,
            Some(r#"{"action":"attack","target_id":"ghost","intent":"boo"}"#),
        );
        assert_eq!(plan.state, AgentState::Idle);
        assert!(plan.persistent_action.is_none());
    }

    #[test]
    fn target_lost_retargets_single_wood_resource() {
        let mut world = world();
        world.insert_object(wood("tree_7", 5.0));
        let config = AgentConfig::default();
        let me = EntityId::from("Ann");
        let locus = Locus {
            id: &me,
            position: Vec3::ZERO,
            home: Vec3::ZERO,
        };
        let mut plan = Plan {
            persistent_action: Some(PersistentAction::attack_type("wood")),
            ..Plan::default()
        };

        let resolver = ActionResolver::new(&config);
        assert!(resolver.target_lost(&mut plan, locus, &world));
        assert_eq!(plan.state, AgentState::MovingToTarget);
        assert_eq!(plan.target, Some(TargetRef::Object(ObjectId::from("tree_7"))));
        assert!(plan.persistent_action.is_some());

        // Deplete the only resource: nothing left to re-acquire.
        world.update_object(&ObjectId::from("tree_7"), |o| o.depleted = true);
        assert!(!resolver.target_lost(&mut plan, locus, &world));
        assert_eq!(plan.state, AgentState::Idle);
        assert!(plan.persistent_action.is_none());
        assert!(plan.target.is_none());
    }

    #[test]
    fn target_lost_resumes_exact_character_in_range() {
        let world = world();
        let config = AgentConfig::default();
        let me = EntityId::from("Ann");
        let locus = Locus {
            id: &me,
            position: Vec3::ZERO,
            home: Vec3::ZERO,
        };
        let mut plan = Plan {
            persistent_action: Some(PersistentAction::attack_id(EntityId::from("Bob"))),
            ..Plan::default()
        };
        assert!(ActionResolver::new(&config).target_lost(&mut plan, locus, &world));
        assert_eq!(plan.target, Some(TargetRef::Entity(EntityId::from("Bob"))));
    }

    #[test]
    fn chat_requires_living_character() {
        let world = world();
        let mut plan = Plan::default();
        resolve(
            &mut plan,
            &world,
            Some(r#"{"action":"chat","target_id":"wolf_near","message":"Hi","intent":"greet"}"#),
        );
        assert_eq!(plan.state, AgentState::Idle);

        resolve(
            &mut plan,
            &world,
            Some(r#"{"action":"chat","target_id":"Bob","message":"Hi","intent":"greet"}"#),
        );
        assert_eq!(plan.state, AgentState::MovingToTarget);
        assert_eq!(plan.target_action, Some(DecisionAction::Chat));
        assert_eq!(plan.message.as_deref(), Some("Hi"));
    }

    #[test]
    fn successful_follow_clears_persistent_attack() {
        let world = world();
        let mut plan = Plan {
            persistent_action: Some(PersistentAction::attack_type("wolf")),
            ..Plan::default()
        };
        resolve(
            &mut plan,
            &world,
            Some(r#"{"action":"follow","target_id":"Bob","intent":"tag along"}"#),
        );
        assert_eq!(plan.state, AgentState::MovingToTarget);
        assert!(plan.persistent_action.is_none());
    }

    #[test]
    fn no_response_falls_back_within_roam_radius() {
        let world = world();
        let config = AgentConfig::default();
        let me = EntityId::from("Ann");
        let home = Vec3::new(40.0, 0.0, 40.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let mut plan = Plan {
                persistent_action: Some(PersistentAction::attack_type("wolf")),
                message: Some("draft".to_owned()),
                ..Plan::default()
            };
            let locus = Locus {
                id: &me,
                position: Vec3::ZERO,
                home,
            };
            ActionResolver::new(&config).resolve(
                &mut plan,
                None,
                ReplyLimits::decision(10),
                locus,
                &world,
                &mut rng,
            );
            assert_eq!(plan.state, AgentState::Roaming);
            assert_eq!(plan.intent, FALLBACK_INTENT);
            assert!(plan.persistent_action.is_none());
            assert!(plan.message.is_none());
            let dest = plan.roam_destination.unwrap();
            assert!(home.horizontal_distance(dest) <= config.roam_radius + 1e-3);
        }
    }

    #[test]
    fn malformed_falls_back_but_unknown_action_idles() {
        let world = world();
        let mut plan = Plan::default();
        resolve(&mut plan, &world, Some("let me think about it"));
        assert_eq!(plan.state, AgentState::Roaming);

        resolve(&mut plan, &world, Some(r#"{"action":"sing","target_id":"Bob"}"#));
        assert_eq!(plan.state, AgentState::Idle);
    }
}
