//! The runner's stand-in world.
//!
//! The engine only reads the world through ports and emits intents. This
//! module closes the loop for the standalone binary: a kinematic integrator
//! moves entities along their [`MoveIntent`], [`Arena`] applies cooldown-gated
//! hits, and [`Simulation`] steps every agent once per tick and routes their
//! effects back into the world.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use tracing::{debug, info};
use wayfarer_agents::{AnimalAgent, DecisionRequest, HumanoidAgent, TickContext};
use wayfarer_core::{CombatExecutor, MemoryWorld, PromptEncoder, WorldClock, WorldView};
use wayfarer_types::{AgentEffect, EntityId, MoveIntent, TargetRef, TradeItem};

use crate::dispatch::DecisionResponse;
use crate::error::RunnerError;

/// Walking speed in metres per second.
const WALK_SPEED: f32 = 4.0;

/// Sprinting speed in metres per second.
const SPRINT_SPEED: f32 = 7.0;

/// Minimum time between two swings of the same attacker.
const SWING_COOLDOWN: Duration = Duration::from_millis(1200);

/// Health removed by one hit.
const HIT_DAMAGE: f32 = 10.0;

/// Move `id` along its intent for `dt`, snapping to the terrain.
pub fn integrate(world: &mut MemoryWorld, id: &EntityId, intent: &MoveIntent, dt: Duration) {
    let (true, Some(heading)) = (intent.forward, intent.heading) else {
        return;
    };
    let Some(position) = world.entity(id).filter(|e| e.is_alive()).map(|e| e.position) else {
        return;
    };
    let speed = if intent.sprint { SPRINT_SPEED } else { WALK_SPEED };
    let mut next = position + heading * (speed * dt.as_secs_f32());
    next.y = world.terrain_height(next.x, next.z);
    world.move_entity(id, next);
}

/// Cooldown-gated combat. Swings are queued while agents tick and applied
/// afterwards, so every agent in a tick sees the same world.
#[derive(Debug, Default)]
pub struct Arena {
    now: Duration,
    last_swing: HashMap<EntityId, Duration>,
    pending: Vec<(EntityId, TargetRef)>,
}

impl Arena {
    /// Set the simulation time used for cooldowns.
    pub const fn set_now(&mut self, now: Duration) {
        self.now = now;
    }

    /// Apply queued swings to `world`.
    pub fn resolve(&mut self, world: &mut MemoryWorld) {
        for (attacker, target) in self.pending.drain(..) {
            match target {
                TargetRef::Entity(victim) => {
                    let mut killed = false;
                    let hit = world.update_entity(&victim, |e| {
                        if e.dead {
                            return;
                        }
                        e.health = (e.health - HIT_DAMAGE).max(0.0);
                        if e.health <= 0.0 {
                            e.dead = true;
                            killed = true;
                        }
                    });
                    if !hit {
                        continue;
                    }
                    world.push_event(&attacker, format!("You hit {victim}."));
                    world.push_event(&victim, format!("{attacker} hit you."));
                    if killed {
                        info!(attacker = %attacker, victim = %victim, "entity killed");
                        world.push_event(&attacker, format!("{victim} died."));
                    }
                }
                TargetRef::Object(object) => {
                    let harvested = world.update_object(&object, |o| o.depleted = true);
                    if harvested {
                        debug!(attacker = %attacker, object = %object, "object harvested");
                        world.push_event(&attacker, format!("You harvested {object}."));
                    }
                }
            }
        }
    }
}

impl CombatExecutor for Arena {
    fn initiate_attack(&mut self, attacker: &EntityId, target: &TargetRef) -> bool {
        if let Some(last) = self.last_swing.get(attacker)
            && self.now.saturating_sub(*last) < SWING_COOLDOWN
        {
            return false;
        }
        self.last_swing.insert(attacker.clone(), self.now);
        self.pending.push((attacker.clone(), target.clone()));
        true
    }
}

/// What one simulation step produced.
#[derive(Debug, Default)]
pub struct StepOutput {
    /// Oracle calls to dispatch.
    pub requests: Vec<DecisionRequest>,
    /// Effects fired this step, already applied to the world.
    pub effects: Vec<AgentEffect>,
}

/// The whole simulation: world, clock and agents.
pub struct Simulation {
    world: MemoryWorld,
    clock: WorldClock,
    encoder: PromptEncoder,
    locale: String,
    humanoids: Vec<HumanoidAgent>,
    animals: Vec<AnimalAgent>,
    arena: Arena,
    rng: StdRng,
}

impl Simulation {
    /// Assemble a simulation starting at time zero.
    pub fn new(
        world: MemoryWorld,
        humanoids: Vec<HumanoidAgent>,
        animals: Vec<AnimalAgent>,
        encoder: PromptEncoder,
        locale: String,
        rng: StdRng,
    ) -> Self {
        Self {
            world,
            clock: WorldClock::new(),
            encoder,
            locale,
            humanoids,
            animals,
            arena: Arena::default(),
            rng,
        }
    }

    /// The world registry.
    pub const fn world(&self) -> &MemoryWorld {
        &self.world
    }

    /// The simulation clock.
    pub const fn clock(&self) -> WorldClock {
        self.clock
    }

    /// Oracle-driven agents.
    pub fn humanoids(&self) -> &[HumanoidAgent] {
        &self.humanoids
    }

    /// Advance by `dt`: hand over oracle responses, tick every agent, move
    /// entities, resolve combat and deliver effects.
    pub fn step(&mut self, dt: Duration, responses: Vec<DecisionResponse>) -> Result<StepOutput, RunnerError> {
        self.clock.advance(dt)?;
        let now = self.clock.now();

        for response in responses {
            match self.humanoids.iter_mut().find(|a| a.id() == &response.agent_id) {
                Some(agent) => {
                    agent.complete_decision(
                        response.seq,
                        response.text.as_deref(),
                        &self.world,
                        now,
                        &mut self.rng,
                    );
                }
                None => debug!(agent = %response.agent_id, "response for unknown agent"),
            }
        }

        self.arena.set_now(now);
        let timestamp = Utc::now();
        let mut out = StepOutput::default();
        let mut moves = Vec::with_capacity(self.humanoids.len().saturating_add(self.animals.len()));

        for agent in &mut self.humanoids {
            let mut ctx = TickContext {
                world: &self.world,
                combat: &mut self.arena,
                encoder: &self.encoder,
                clock: self.clock,
                timestamp,
                locale: &self.locale,
            };
            let tick = agent.tick(&mut ctx, &mut self.rng);
            moves.push((agent.id().clone(), tick.intent, agent.state().as_str()));
            out.requests.extend(tick.request);
            out.effects.extend(tick.effects);
        }
        for animal in &mut self.animals {
            let intent = animal.tick(&self.world, &mut self.arena, now, &mut self.rng);
            moves.push((animal.id().clone(), intent, animal.state().as_str()));
        }

        for (id, intent, label) in moves {
            integrate(&mut self.world, &id, &intent, dt);
            self.world
                .update_entity(&id, |e| e.current_action = label.to_owned());
        }
        self.arena.resolve(&mut self.world);
        self.deliver(&out.effects, now);
        Ok(out)
    }

    fn deliver(&mut self, effects: &[AgentEffect], now: Duration) {
        for effect in effects {
            match effect {
                AgentEffect::Chat {
                    speaker,
                    target,
                    message,
                } => {
                    self.world
                        .push_event(speaker, format!("You said to {target}: \"{message}\""));
                    self.world
                        .push_event(target, format!("{speaker} said to you: \"{message}\""));
                    if let Some(listener) = self.humanoids.iter_mut().find(|a| a.id() == target) {
                        listener.hear_chat(speaker.clone(), message.clone(), now);
                    }
                }
                AgentEffect::TradeProposal {
                    proposer,
                    target,
                    give_items,
                    receive_items,
                } => {
                    let offer = describe_items(give_items);
                    let ask = describe_items(receive_items);
                    self.world.push_event(
                        proposer,
                        format!("You offered {target} {offer} for {ask}."),
                    );
                    self.world.push_event(
                        target,
                        format!("{proposer} offered you {offer} for {ask}."),
                    );
                }
            }
        }
    }
}

fn describe_items(items: &[TradeItem]) -> String {
    if items.is_empty() {
        return "nothing".to_owned();
    }
    items
        .iter()
        .map(|i| format!("{} x{}", i.id, i.count))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use wayfarer_core::{AgentConfig, PromptConfig};
    use wayfarer_types::{AgentState, EntityKind, EntityRecord, Vec3};

    use super::*;

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

    fn agent(id: &str, x: f32, rng: &mut StdRng) -> HumanoidAgent {
        let config = AgentConfig {
            decision_interval_min_ms: 200,
            decision_interval_max_ms: 200,
            ..AgentConfig::default()
        };
        HumanoidAgent::new(
            EntityId::from(id),
            "A chatty villager.",
            Vec3::new(x, 0.0, 0.0),
            config,
            Duration::ZERO,
            rng,
        )
    }

    fn simulation() -> Simulation {
        let mut world = MemoryWorld::new();
        world.insert_entity(character("Ann", 0.0));
        world.insert_entity(character("Bob", 8.0));
        let mut rng = StdRng::seed_from_u64(11);
        let ann = agent("Ann", 0.0, &mut rng);
        let bob = agent("Bob", 8.0, &mut rng);
        Simulation::new(
            world,
            vec![ann, bob],
            Vec::new(),
            PromptEncoder::new(PromptConfig::default()).unwrap(),
            "en".to_owned(),
            rng,
        )
    }

    #[test]
    fn integrate_moves_along_heading_at_walk_speed() {
        let mut world = MemoryWorld::new().with_ground_height(2.0);
        world.insert_entity(character("Ann", 0.0));
        let id = EntityId::from("Ann");
        let intent = MoveIntent::walk(Vec3::new(1.0, 0.0, 0.0), false);

        integrate(&mut world, &id, &intent, Duration::from_millis(500));
        let position = world.entity(&id).unwrap().position;
        assert!((position.x - 2.0).abs() < 1e-4);
        assert!((position.y - 2.0).abs() < f32::EPSILON);

        integrate(&mut world, &id, &MoveIntent::STILL, Duration::from_secs(1));
        assert!((world.entity(&id).unwrap().position.x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn arena_enforces_swing_cooldown_and_kills() {
        let mut world = MemoryWorld::new();
        world.insert_entity(character("Ann", 0.0));
        world.insert_entity(character("Bob", 1.0));
        world.update_entity(&EntityId::from("Bob"), |b| b.health = 15.0);
        let ann = EntityId::from("Ann");
        let bob = TargetRef::Entity(EntityId::from("Bob"));
        let mut arena = Arena::default();

        assert!(arena.initiate_attack(&ann, &bob));
        arena.set_now(Duration::from_millis(500));
        assert!(!arena.initiate_attack(&ann, &bob));
        arena.resolve(&mut world);
        assert!((world.entity(&EntityId::from("Bob")).unwrap().health - 5.0).abs() < 1e-4);

        arena.set_now(Duration::from_millis(1300));
        assert!(arena.initiate_attack(&ann, &bob));
        arena.resolve(&mut world);
        assert!(world.entity(&EntityId::from("Bob")).unwrap().dead);
        assert!(
            world
                .recent_events(&ann, 5)
                .contains(&"Bob died.".to_owned())
        );
    }

    #[test]
    fn chat_reaches_listener_log_and_agent() {
        let mut sim = simulation();
        let dt = Duration::from_millis(50);

        let mut requests = Vec::new();
        for _ in 0..4 {
            requests.extend(sim.step(dt, Vec::new()).unwrap().requests);
        }
        let ann_request = requests
            .into_iter()
            .find(|r| r.agent_id == EntityId::from("Ann"))
            .unwrap();

        let reply = DecisionResponse {
            agent_id: EntityId::from("Ann"),
            seq: ann_request.seq,
            text: Some(
                r#"{"action":"chat","target_id":"Bob","message":"Fine day!","intent":"small talk"}"#
                    .to_owned(),
            ),
        };
        let mut effects = sim.step(dt, vec![reply]).unwrap().effects;
        for _ in 0..60 {
            effects.extend(sim.step(dt, Vec::new()).unwrap().effects);
        }

        assert_eq!(effects.len(), 1);
        let bob_log = sim.world().recent_events(&EntityId::from("Bob"), 5);
        assert_eq!(bob_log, vec!["Ann said to you: \"Fine day!\"".to_owned()]);
        let ann = sim.humanoids().first().unwrap();
        assert_eq!(ann.state(), AgentState::Idle);
        assert_eq!(
            sim.world().entity(&EntityId::from("Ann")).unwrap().current_action,
            "idle"
        );
    }
}
