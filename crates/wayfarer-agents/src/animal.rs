//! Rule-driven animal agent.
//!
//! Animals never consult the oracle. Two steps run each tick:
//!
//! - perception, throttled to a jittered 0.5..=1.0 s interval, picks targets
//!   and roam destinations;
//! - steering, at full tick rate, turns the latest perception result into a
//!   [`MoveIntent`]. Between perceptions it works from state that may be up
//!   to one interval old.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};
use wayfarer_core::world::{nearest_living_character, within_radius};
use wayfarer_core::{AnimalConfig, CombatExecutor, WorldView};
use wayfarer_types::{AnimalState, EntityId, MoveIntent, TargetRef, Vec3};

use crate::scheduler::jittered;
use crate::steering::{approach, random_point_in_disc};

/// One animal.
#[derive(Debug, Clone)]
pub struct AnimalAgent {
    id: EntityId,
    home: Vec3,
    aggressive: bool,
    config: AnimalConfig,
    state: AnimalState,
    target: Option<EntityId>,
    roam_destination: Option<Vec3>,
    next_perception_at: Duration,
    idle_until: Duration,
    perception_runs: u64,
}

impl AnimalAgent {
    /// An idle animal that perceives on its first tick.
    pub fn new<R: Rng + ?Sized>(
        id: EntityId,
        home: Vec3,
        aggressive: bool,
        config: AnimalConfig,
        now: Duration,
        rng: &mut R,
    ) -> Self {
        let idle_until = now.saturating_add(jittered(rng, config.idle_min_ms, config.idle_max_ms));
        Self {
            id,
            home,
            aggressive,
            config,
            state: AnimalState::Idle,
            target: None,
            roam_destination: None,
            next_perception_at: now,
            idle_until,
            perception_runs: 0,
        }
    }

    /// The animal's entity id.
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    /// Current state.
    pub const fn state(&self) -> AnimalState {
        self.state
    }

    /// The character being chased.
    pub const fn target(&self) -> Option<&EntityId> {
        self.target.as_ref()
    }

    /// Where the animal is wandering to.
    pub const fn roam_destination(&self) -> Option<Vec3> {
        self.roam_destination
    }

    /// How many perception steps have run.
    pub const fn perception_runs(&self) -> u64 {
        self.perception_runs
    }

    /// Run one tick: perceive if the interval elapsed, then steer.
    pub fn tick<W, C, R>(&mut self, world: &W, combat: &mut C, now: Duration, rng: &mut R) -> MoveIntent
    where
        W: WorldView + ?Sized,
        C: CombatExecutor + ?Sized,
        R: Rng + ?Sized,
    {
        if self.state == AnimalState::Dead {
            return MoveIntent::STILL;
        }
        let Some(me) = world.entity(&self.id) else {
            return MoveIntent::STILL;
        };
        if !me.is_alive() {
            self.die();
            return MoveIntent::STILL;
        }
        let position = me.position;

        if now >= self.next_perception_at {
            self.perceive(world, position, now, rng);
        }
        self.steer(world, combat, position, now, rng)
    }

    fn perceive<W, R>(&mut self, world: &W, position: Vec3, now: Duration, rng: &mut R)
    where
        W: WorldView + ?Sized,
        R: Rng + ?Sized,
    {
        self.perception_runs = self.perception_runs.saturating_add(1);
        let interval = jittered(
            rng,
            self.config.perception_interval_min_ms,
            self.config.perception_interval_max_ms,
        );
        self.next_perception_at = now.saturating_add(interval);

        match self.state {
            AnimalState::Attacking => {
                let leash = self.config.detection_radius * self.config.lose_target_factor;
                let keep = self.target.as_ref().is_some_and(|id| {
                    world
                        .entity(id)
                        .is_some_and(|e| e.is_alive() && within_radius(position, e.position, leash))
                });
                if !keep {
                    debug!(animal = %self.id, "target lost");
                    self.target = None;
                    self.enter_idle(now, rng);
                }
            }
            AnimalState::Idle | AnimalState::Roaming => {
                if self.aggressive
                    && let Some(prey) =
                        nearest_living_character(world, position, self.config.detection_radius, &self.id)
                {
                    info!(animal = %self.id, target = %prey.id, "target acquired");
                    self.target = Some(prey.id.clone());
                    self.roam_destination = None;
                    self.state = AnimalState::Attacking;
                    return;
                }
                if self.state == AnimalState::Idle && now >= self.idle_until {
                    let destination =
                        random_point_in_disc(world, rng, self.home, self.config.roam_radius);
                    self.roam_destination = Some(destination);
                    self.state = AnimalState::Roaming;
                }
            }
            AnimalState::Dead => {}
        }
    }

    fn steer<W, C, R>(
        &mut self,
        world: &W,
        combat: &mut C,
        position: Vec3,
        now: Duration,
        rng: &mut R,
    ) -> MoveIntent
    where
        W: WorldView + ?Sized,
        C: CombatExecutor + ?Sized,
        R: Rng + ?Sized,
    {
        match self.state {
            AnimalState::Attacking => {
                let Some(target) = self.target.clone() else {
                    return MoveIntent::STILL;
                };
                // Perception decides whether the target is still worth it.
                let Some(target_pos) = world.entity(&target).map(|e| e.position) else {
                    return MoveIntent::STILL;
                };
                let steer = approach(position, target_pos, self.config.attack_range, true);
                if !steer.arrived {
                    return steer.intent;
                }
                combat.initiate_attack(&self.id, &TargetRef::Entity(target));
                MoveIntent {
                    attack: true,
                    ..steer.intent
                }
            }
            AnimalState::Roaming => {
                let Some(destination) = self.roam_destination else {
                    self.enter_idle(now, rng);
                    return MoveIntent::STILL;
                };
                let steer = approach(position, destination, self.config.arrival_tolerance, false);
                if steer.arrived {
                    self.enter_idle(now, rng);
                }
                steer.intent
            }
            AnimalState::Idle | AnimalState::Dead => MoveIntent::STILL,
        }
    }

    fn enter_idle<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
        self.state = AnimalState::Idle;
        self.roam_destination = None;
        self.idle_until =
            now.saturating_add(jittered(rng, self.config.idle_min_ms, self.config.idle_max_ms));
    }

    /// External death notification.
    pub fn die(&mut self) {
        if self.state != AnimalState::Dead {
            info!(animal = %self.id, "animal died");
        }
        self.state = AnimalState::Dead;
        self.target = None;
        self.roam_destination = None;
    }

    /// External respawn. The only way out of `dead`.
    pub fn respawn<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
        info!(animal = %self.id, "animal respawned");
        self.target = None;
        self.next_perception_at = now;
        self.enter_idle(now, rng);
    }
}
