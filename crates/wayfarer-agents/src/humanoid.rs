//! The oracle-driven humanoid agent.
//!
//! [`HumanoidAgent`] is a sans-IO state machine. Each call to
//! [`HumanoidAgent::tick`] snapshots the world, runs one step of the
//! `idle / roaming / deciding / movingToTarget / dead` machine and returns a
//! [`TickOutput`]: the movement intent for this frame, side effects, and at
//! most one [`DecisionRequest`]. The host performs the oracle call however
//! it likes and hands the text back through
//! [`HumanoidAgent::complete_decision`].
//!
//! # Invariants
//!
//! - At most one request is in flight. It is identified by a sequence
//!   number; responses for any other number are dropped.
//! - While `deciding` the agent emits no movement.
//! - `dead` is left only through [`HumanoidAgent::respawn`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};
use wayfarer_core::observation::snapshot;
use wayfarer_core::world::{target_is_valid, target_position, within_radius};
use wayfarer_core::{
    AgentConfig, ChatReplyContext, CombatExecutor, DecisionContext, PromptEncoder,
    RenderedPrompt, ReplyLimits, WorldClock, WorldView,
};
use wayfarer_types::{
    AgentEffect, AgentState, DecisionAction, EntityId, MoveIntent, Observation,
    PersistentAction, TargetRef, Vec3,
};

use crate::resolver::{ActionResolver, Locus, Plan};
use crate::scheduler::{DecisionScheduler, DecisionTrigger};
use crate::steering::approach;

/// Which encoder produced a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A regular decision.
    Decision,
    /// A reply to something another character said.
    ChatReply,
}

impl RequestKind {
    /// Stable label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::ChatReply => "chat_reply",
        }
    }
}

/// An oracle call the host should perform on the agent's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRequest {
    /// The requesting agent.
    pub agent_id: EntityId,
    /// Sequence number to hand back with the response.
    pub seq: u64,
    /// Which encoder rendered the prompt.
    pub kind: RequestKind,
    /// What triggered the request.
    pub trigger: DecisionTrigger,
    /// The rendered prompt.
    pub prompt: RenderedPrompt,
}

/// Everything a humanoid tick reads or writes outside the agent.
pub struct TickContext<'a, W: ?Sized, C: ?Sized> {
    /// World collaborators.
    pub world: &'a W,
    /// Combat collaborator.
    pub combat: &'a mut C,
    /// Prompt encoder shared by all agents.
    pub encoder: &'a PromptEncoder,
    /// Simulation clock at this tick.
    pub clock: WorldClock,
    /// Wall-clock timestamp stamped on observations.
    pub timestamp: DateTime<Utc>,
    /// Locale used when the world has no preference.
    pub locale: &'a str,
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutput {
    /// Movement and attack intent for this frame.
    pub intent: MoveIntent,
    /// An oracle call to start, if the agent just entered `deciding`.
    pub request: Option<DecisionRequest>,
    /// Side effects fired this tick.
    pub effects: Vec<AgentEffect>,
}

/// Outcome of handing an oracle response to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was resolved into the agent's plan.
    Applied,
    /// The response belonged to a superseded request and was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    seq: u64,
    kind: RequestKind,
    limits: ReplyLimits,
    started_at: Duration,
}

#[derive(Debug, Clone)]
struct HeardChat {
    speaker: EntityId,
    line: String,
}

/// One oracle-driven NPC.
#[derive(Debug, Clone)]
pub struct HumanoidAgent {
    id: EntityId,
    persona: String,
    home: Vec3,
    config: AgentConfig,
    plan: Plan,
    scheduler: DecisionScheduler,
    previous: Option<Observation>,
    in_flight: Option<InFlight>,
    next_seq: u64,
    heard: Option<HeardChat>,
    follow_until: Option<Duration>,
}

impl HumanoidAgent {
    /// Create an idle agent. Its first decision comes one jittered interval
    /// after `now`.
    pub fn new<R: Rng + ?Sized>(
        id: EntityId,
        persona: impl Into<String>,
        home: Vec3,
        config: AgentConfig,
        now: Duration,
        rng: &mut R,
    ) -> Self {
        let scheduler = DecisionScheduler::new(&config, now, rng);
        Self {
            id,
            persona: persona.into(),
            home,
            config,
            plan: Plan::default(),
            scheduler,
            previous: None,
            in_flight: None,
            next_seq: 0,
            heard: None,
            follow_until: None,
        }
    }

    /// The agent's entity id.
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    /// Current state.
    pub const fn state(&self) -> AgentState {
        self.plan.state
    }

    /// What the agent is approaching.
    pub const fn target(&self) -> Option<&TargetRef> {
        self.plan.target.as_ref()
    }

    /// What the agent will do on arrival.
    pub const fn target_action(&self) -> Option<DecisionAction> {
        self.plan.target_action
    }

    /// Pending chat message.
    pub fn message(&self) -> Option<&str> {
        self.plan.message.as_deref()
    }

    /// Remembered attack intent.
    pub const fn persistent_action(&self) -> Option<&PersistentAction> {
        self.plan.persistent_action.as_ref()
    }

    /// Display intent for UI.
    pub fn display_intent(&self) -> &str {
        &self.plan.intent
    }

    /// Sequence number of the in-flight request, if any.
    pub fn in_flight_seq(&self) -> Option<u64> {
        self.in_flight.map(|f| f.seq)
    }

    /// Another character spoke to this agent. The next request uses the
    /// chat-reply prompt, and a debounced follow-up decision is scheduled.
    pub fn hear_chat(&mut self, speaker: EntityId, line: impl Into<String>, now: Duration) {
        if self.plan.state == AgentState::Dead {
            return;
        }
        let line = line.into();
        debug!(agent = %self.id, speaker = %speaker, line = %line, "heard chat");
        self.heard = Some(HeardChat { speaker, line });
        self.scheduler.schedule_follow_up(now);
    }

    /// External death notification. Halts all decisions and invalidates any
    /// in-flight request.
    pub fn die(&mut self) {
        if self.plan.state == AgentState::Dead {
            return;
        }
        info!(agent = %self.id, "agent died");
        self.plan.reset(AgentState::Dead);
        self.in_flight = None;
        self.heard = None;
        self.follow_until = None;
        self.scheduler.cancel_follow_up();
    }

    /// External respawn. The only way out of `dead`.
    pub fn respawn<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
        info!(agent = %self.id, "agent respawned");
        self.plan.reset(AgentState::Idle);
        self.previous = None;
        self.in_flight = None;
        self.heard = None;
        self.follow_until = None;
        self.scheduler.reset(now, rng);
    }

    /// Run one step of the state machine.
    pub fn tick<W, C, R>(&mut self, ctx: &mut TickContext<'_, W, C>, rng: &mut R) -> TickOutput
    where
        W: WorldView + ?Sized,
        C: CombatExecutor + ?Sized,
        R: Rng + ?Sized,
    {
        let mut out = TickOutput::default();
        if self.plan.state == AgentState::Dead {
            return out;
        }
        let now = ctx.clock.now();
        let Some(obs) = snapshot(
            ctx.world,
            &self.id,
            self.config.search_radius,
            ctx.encoder.limits(),
            ctx.clock.tick(),
            ctx.timestamp,
        ) else {
            debug!(agent = %self.id, "agent missing from entity registry, skipping tick");
            return out;
        };
        if obs.self_state.dead {
            self.die();
            return out;
        }

        let damaged = took_damage(self.previous.as_ref(), &obs);
        match self.plan.state {
            AgentState::Idle | AgentState::Roaming => {
                if let Some(trigger) = self.scheduler.poll(now, damaged) {
                    out.request = self.begin_decision(trigger, &obs, ctx, rng);
                } else if self.plan.state == AgentState::Roaming {
                    out.intent = self.roam(obs.self_state.position);
                }
            }
            AgentState::Deciding => self.check_deadline(now, &obs, ctx.world, rng),
            AgentState::MovingToTarget => {
                out.intent = self.pursue(&obs, ctx.world, &mut *ctx.combat, now, &mut out.effects);
            }
            AgentState::Dead => {}
        }

        self.previous = Some(obs);
        out
    }

    /// Hand back the oracle's answer (`None` when the call failed or timed
    /// out) for request `seq`.
    pub fn complete_decision<W, R>(
        &mut self,
        seq: u64,
        response: Option<&str>,
        world: &W,
        now: Duration,
        rng: &mut R,
    ) -> Completion
    where
        W: WorldView + ?Sized,
        R: Rng + ?Sized,
    {
        let Some(in_flight) = self.in_flight.filter(|f| f.seq == seq) else {
            debug!(agent = %self.id, seq, "dropping response for superseded request");
            return Completion::Stale;
        };
        self.in_flight = None;
        if self.plan.state != AgentState::Deciding {
            warn!(agent = %self.id, seq, state = self.plan.state.as_str(), "response arrived outside deciding, dropping");
            return Completion::Stale;
        }

        let position = world
            .entity(&self.id)
            .map(|e| e.position)
            .or_else(|| self.previous.as_ref().map(|o| o.self_state.position))
            .unwrap_or(self.home);
        let locus = Locus {
            id: &self.id,
            position,
            home: self.home,
        };
        ActionResolver::new(&self.config).resolve(
            &mut self.plan,
            response,
            in_flight.limits,
            locus,
            world,
            rng,
        );

        self.follow_until = (self.plan.target_action == Some(DecisionAction::Follow))
            .then(|| now.saturating_add(self.config.follow_duration()));
        self.scheduler.schedule_next(now, rng);
        debug!(
            agent = %self.id,
            seq,
            kind = in_flight.kind.as_str(),
            state = self.plan.state.as_str(),
            "decision completed"
        );
        Completion::Applied
    }

    fn begin_decision<W, C, R>(
        &mut self,
        trigger: DecisionTrigger,
        obs: &Observation,
        ctx: &TickContext<'_, W, C>,
        rng: &mut R,
    ) -> Option<DecisionRequest>
    where
        W: WorldView + ?Sized,
        C: ?Sized,
        R: Rng + ?Sized,
    {
        let now = ctx.clock.now();
        let locale = ctx.world.locale().unwrap_or(ctx.locale);
        let limits = ctx.encoder.limits();

        let (kind, reply_limits, rendered) = match self.heard.take() {
            Some(heard) => {
                let events = ctx.world.recent_events(&self.id, limits.chat_event_history);
                let rendered = ctx.encoder.chat_reply_prompt(&ChatReplyContext {
                    persona: &self.persona,
                    observation: obs,
                    speaker: &heard.speaker,
                    heard: &heard.line,
                    events: &events,
                    locale,
                });
                (
                    RequestKind::ChatReply,
                    ReplyLimits::chat_reply(limits.intent_max_words, limits.chat_reply_max_words),
                    rendered,
                )
            }
            None => {
                let events = ctx.world.recent_events(&self.id, limits.decision_event_lines());
                let rendered = ctx.encoder.decision_prompt(&DecisionContext {
                    persona: &self.persona,
                    observation: obs,
                    events: &events,
                    locale,
                });
                (
                    RequestKind::Decision,
                    ReplyLimits::decision(limits.intent_max_words),
                    rendered,
                )
            }
        };

        match rendered {
            Ok(prompt) => {
                self.next_seq = self.next_seq.wrapping_add(1);
                let seq = self.next_seq;
                self.in_flight = Some(InFlight {
                    seq,
                    kind,
                    limits: reply_limits,
                    started_at: now,
                });
                self.plan.roam_destination = None;
                self.plan.state = AgentState::Deciding;
                info!(
                    agent = %self.id,
                    seq,
                    trigger = trigger.as_str(),
                    kind = kind.as_str(),
                    "requesting decision"
                );
                Some(DecisionRequest {
                    agent_id: self.id.clone(),
                    seq,
                    kind,
                    trigger,
                    prompt,
                })
            }
            Err(e) => {
                warn!(agent = %self.id, error = %e, "failed to render prompt, falling back to roam");
                let locus = Locus {
                    id: &self.id,
                    position: obs.self_state.position,
                    home: self.home,
                };
                ActionResolver::new(&self.config).fallback(&mut self.plan, locus, ctx.world, rng);
                self.scheduler.schedule_next(now, rng);
                None
            }
        }
    }

    fn check_deadline<W, R>(&mut self, now: Duration, obs: &Observation, world: &W, rng: &mut R)
    where
        W: WorldView + ?Sized,
        R: Rng + ?Sized,
    {
        let overdue = match self.in_flight {
            Some(f) => now.saturating_sub(f.started_at) >= self.config.decision_deadline(),
            None => {
                warn!(agent = %self.id, "deciding without a request in flight, resetting to idle");
                self.plan.go_idle();
                return;
            }
        };
        if !overdue {
            return;
        }
        warn!(agent = %self.id, seq = ?self.in_flight_seq(), "decision deadline passed, falling back to roam");
        self.in_flight = None;
        let locus = Locus {
            id: &self.id,
            position: obs.self_state.position,
            home: self.home,
        };
        ActionResolver::new(&self.config).fallback(&mut self.plan, locus, world, rng);
        self.scheduler.schedule_next(now, rng);
    }

    fn roam(&mut self, position: Vec3) -> MoveIntent {
        let Some(destination) = self.plan.roam_destination else {
            self.plan.go_idle();
            return MoveIntent::STILL;
        };
        let steer = approach(position, destination, self.config.arrival_tolerance, false);
        if steer.arrived {
            debug!(agent = %self.id, "roam destination reached");
            self.plan.go_idle();
        }
        steer.intent
    }

    fn pursue<W, C>(
        &mut self,
        obs: &Observation,
        world: &W,
        combat: &mut C,
        now: Duration,
        effects: &mut Vec<AgentEffect>,
    ) -> MoveIntent
    where
        W: WorldView + ?Sized,
        C: CombatExecutor + ?Sized,
    {
        let position = obs.self_state.position;
        let radius = self.config.search_radius;
        let still_valid = self.plan.target.as_ref().is_some_and(|t| {
            target_is_valid(world, t)
                && target_position(world, t).is_some_and(|p| within_radius(position, p, radius))
        });
        if !still_valid {
            debug!(agent = %self.id, "target invalid or out of range");
            let locus = Locus {
                id: &self.id,
                position,
                home: self.home,
            };
            if !ActionResolver::new(&self.config).target_lost(&mut self.plan, locus, world) {
                return MoveIntent::STILL;
            }
        }

        let (Some(target), Some(action)) = (self.plan.target.clone(), self.plan.target_action)
        else {
            warn!(agent = %self.id, "moving without a target, resetting to idle");
            self.plan.go_idle();
            return MoveIntent::STILL;
        };
        let Some(target_pos) = target_position(world, &target) else {
            self.plan.go_idle();
            return MoveIntent::STILL;
        };

        match action {
            DecisionAction::Attack => {
                let sprint = position.horizontal_distance(target_pos) > self.config.sprint_distance;
                let steer = approach(position, target_pos, self.config.attack_range, sprint);
                if !steer.arrived {
                    return steer.intent;
                }
                let swung = combat.initiate_attack(&self.id, &target);
                if swung {
                    debug!(agent = %self.id, target = %target, "attack started");
                }
                MoveIntent {
                    attack: true,
                    ..steer.intent
                }
            }
            DecisionAction::Chat => {
                let steer = approach(position, target_pos, self.config.interaction_range, false);
                if !steer.arrived {
                    return steer.intent;
                }
                if let (TargetRef::Entity(listener), Some(message)) = (&target, self.plan.message.take()) {
                    info!(agent = %self.id, target = %listener, message = %message, "chat delivered");
                    effects.push(AgentEffect::Chat {
                        speaker: self.id.clone(),
                        target: listener.clone(),
                        message,
                    });
                }
                self.plan.go_idle();
                self.scheduler.schedule_follow_up(now);
                steer.intent
            }
            DecisionAction::Trade => {
                let steer = approach(position, target_pos, self.config.interaction_range, false);
                if !steer.arrived {
                    return steer.intent;
                }
                if let TargetRef::Entity(partner) = &target {
                    info!(agent = %self.id, target = %partner, "trade proposed");
                    effects.push(AgentEffect::TradeProposal {
                        proposer: self.id.clone(),
                        target: partner.clone(),
                        give_items: std::mem::take(&mut self.plan.give_items),
                        receive_items: std::mem::take(&mut self.plan.receive_items),
                    });
                }
                self.plan.go_idle();
                steer.intent
            }
            DecisionAction::Follow => {
                if self.follow_until.is_none_or(|until| now >= until) {
                    debug!(agent = %self.id, "follow finished");
                    self.follow_until = None;
                    self.plan.go_idle();
                    return MoveIntent::STILL;
                }
                approach(position, target_pos, self.config.interaction_range, false).intent
            }
        }
    }
}

/// Reactive condition: own health or a nearby character's health dropped
/// since the previous observation.
///
/// Every nearby character counts, including a bystander hit by someone else:
/// the agent reacts to violence it witnesses, not only to attacks on friends.
/// The condition is only polled from `idle` and `roaming`, so hits the agent
/// lands itself while attacking do not interrupt it.
fn took_damage(previous: Option<&Observation>, current: &Observation) -> bool {
    let Some(prev) = previous else {
        return false;
    };
    if current.self_state.health < prev.self_state.health {
        return true;
    }
    current.nearby_characters.iter().any(|c| {
        prev.character(&c.id)
            .is_some_and(|before| c.health < before.health)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wayfarer_core::{MemoryWorld, PromptConfig};
    use wayfarer_types::{EntityKind, EntityRecord};

    use super::*;

    #[derive(Default)]
    struct Swings(Vec<(EntityId, TargetRef)>);

    impl CombatExecutor for Swings {
        fn initiate_attack(&mut self, attacker: &EntityId, target: &TargetRef) -> bool {
            self.0.push((attacker.clone(), target.clone()));
            true
        }
    }

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

    struct Harness {
        world: MemoryWorld,
        combat: Swings,
        encoder: PromptEncoder,
        rng: StdRng,
        agent: HumanoidAgent,
    }

    impl Harness {
        fn new(interval_ms: u64) -> Self {
            let mut world = MemoryWorld::new();
            world.insert_entity(character("Ann", 0.0));
            world.insert_entity(character("Bob", 10.0));
            let config = AgentConfig {
                decision_interval_min_ms: interval_ms,
                decision_interval_max_ms: interval_ms,
                ..AgentConfig::default()
            };
            let mut rng = StdRng::seed_from_u64(21);
            let agent = HumanoidAgent::new(
                EntityId::from("Ann"),
                "A friendly farmer.",
                Vec3::ZERO,
                config,
                Duration::ZERO,
                &mut rng,
            );
            Self {
                world,
                combat: Swings::default(),
                encoder: PromptEncoder::new(PromptConfig::default()).unwrap(),
                rng,
                agent,
            }
        }

        fn tick(&mut self, ms: u64) -> TickOutput {
            let mut ctx = TickContext {
                world: &self.world,
                combat: &mut self.combat,
                encoder: &self.encoder,
                clock: WorldClock::from_parts(ms / 50, Duration::from_millis(ms)),
                timestamp: Utc::now(),
                locale: "en",
            };
            self.agent.tick(&mut ctx, &mut self.rng)
        }

        fn complete(&mut self, seq: u64, response: Option<&str>, ms: u64) -> Completion {
            self.agent.complete_decision(
                seq,
                response,
                &self.world,
                Duration::from_millis(ms),
                &mut self.rng,
            )
        }
    }

    #[test]
    fn timer_emits_one_request_and_agent_stands_still_while_deciding() {
        let mut h = Harness::new(1_000);
        assert!(h.tick(500).request.is_none());

        let out = h.tick(1_000);
        let request = out.request.unwrap();
        assert_eq!(request.seq, 1);
        assert_eq!(request.kind, RequestKind::Decision);
        assert_eq!(request.trigger, DecisionTrigger::Timer);
        assert!(request.prompt.system.contains("friendly farmer"));
        assert_eq!(h.agent.state(), AgentState::Deciding);

        let out = h.tick(1_050);
        assert!(out.request.is_none());
        assert_eq!(out.intent, MoveIntent::STILL);
    }

    #[test]
    fn attack_on_character_approaches_then_swings() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        let completion = h.complete(
            seq,
            Some(r#"{"action":"attack","target_id":"Bob","intent":"drive him off"}"#),
            1_000,
        );
        assert_eq!(completion, Completion::Applied);
        assert_eq!(h.agent.state(), AgentState::MovingToTarget);
        assert_eq!(
            h.agent.persistent_action().and_then(|p| p.target_id.clone()),
            Some(EntityId::from("Bob"))
        );

        let out = h.tick(1_050);
        assert!(out.intent.forward);
        assert!(!out.intent.attack);
        assert!(h.combat.0.is_empty());

        h.world.move_entity(&EntityId::from("Ann"), Vec3::new(9.0, 0.0, 0.0));
        let out = h.tick(1_100);
        assert!(out.intent.attack);
        assert_eq!(h.combat.0.len(), 1);
        assert_eq!(h.agent.state(), AgentState::MovingToTarget);
    }

    #[test]
    fn dead_target_with_no_substitute_returns_idle() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        h.complete(
            seq,
            Some(r#"{"action":"attack","target_id":"Bob","intent":"fight"}"#),
            1_000,
        );
        h.world.update_entity(&EntityId::from("Bob"), |b| b.dead = true);

        h.tick(1_050);
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(h.agent.persistent_action().is_none());
    }

    #[test]
    fn stale_and_unsolicited_responses_are_dropped() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        assert_eq!(h.complete(seq.wrapping_add(7), None, 1_100), Completion::Stale);
        assert_eq!(h.agent.state(), AgentState::Deciding);

        assert_eq!(h.complete(seq, None, 1_200), Completion::Applied);
        // Already answered.
        assert_eq!(h.complete(seq, None, 1_300), Completion::Stale);
    }

    #[test]
    fn deadline_falls_back_and_late_answer_is_ignored() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;

        h.tick(12_999);
        assert_eq!(h.agent.state(), AgentState::Deciding);
        h.tick(13_000);
        assert_eq!(h.agent.state(), AgentState::Roaming);
        assert_eq!(h.agent.display_intent(), "Exploring");

        let late = r#"{"action":"chat","target_id":"Bob","message":"Hi","intent":"greet"}"#;
        assert_eq!(h.complete(seq, Some(late), 13_500), Completion::Stale);
        assert_eq!(h.agent.state(), AgentState::Roaming);
    }

    #[test]
    fn damage_interrupts_inside_decision_cooldown() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        h.complete(seq, Some(r#"{"action":"dance","target_id":"Bob"}"#), 1_000);
        assert_eq!(h.agent.state(), AgentState::Idle);

        // Timer is due again but the 10s cooldown holds it.
        assert!(h.tick(2_500).request.is_none());

        h.world.update_entity(&EntityId::from("Ann"), |a| a.health = 80.0);
        let request = h.tick(3_000).request.unwrap();
        assert_eq!(request.trigger, DecisionTrigger::Reactive);
    }

    #[test]
    fn bystander_damage_interrupts_idle_agent() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        h.complete(seq, Some(r#"{"action":"dance","target_id":"Bob"}"#), 1_000);
        assert!(h.tick(2_000).request.is_none());

        h.world.update_entity(&EntityId::from("Bob"), |b| b.health = 70.0);
        let request = h.tick(2_050).request.unwrap();
        assert_eq!(request.trigger, DecisionTrigger::Reactive);
    }

    #[test]
    fn killed_animal_target_switches_to_next_of_species() {
        let mut h = Harness::new(1_000);
        for (id, x) in [("wolf_1", 5.0), ("wolf_2", 8.0)] {
            h.world.insert_entity(EntityRecord {
                id: EntityId::from(id),
                kind: EntityKind::Animal,
                species: Some("wolf".to_owned()),
                position: Vec3::new(x, 0.0, 0.0),
                health: 30.0,
                dead: false,
                aggressive: true,
                current_action: "idle".to_owned(),
            });
        }
        let seq = h.tick(1_000).request.unwrap().seq;
        h.complete(
            seq,
            Some(r#"{"action":"attack","target_id":"wolf_1","intent":"hunt"}"#),
            1_000,
        );
        assert_eq!(h.agent.target(), Some(&TargetRef::Entity(EntityId::from("wolf_1"))));
        assert_eq!(
            h.agent.persistent_action().and_then(|p| p.target_type.clone()),
            Some("wolf".to_owned())
        );

        h.world.update_entity(&EntityId::from("wolf_1"), |w| {
            w.health = 0.0;
            w.dead = true;
        });
        h.tick(1_050);
        assert_eq!(h.agent.state(), AgentState::MovingToTarget);
        assert_eq!(h.agent.target(), Some(&TargetRef::Entity(EntityId::from("wolf_2"))));
    }

    #[test]
    fn dead_agent_stops_deciding_until_respawn() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        h.world.update_entity(&EntityId::from("Ann"), |a| a.dead = true);

        h.tick(1_050);
        assert_eq!(h.agent.state(), AgentState::Dead);
        assert_eq!(h.complete(seq, None, 1_100), Completion::Stale);
        for ms in [5_000, 20_000, 60_000] {
            assert!(h.tick(ms).request.is_none());
            assert_eq!(h.agent.state(), AgentState::Dead);
        }

        h.world.update_entity(&EntityId::from("Ann"), |a| a.dead = false);
        let mut rng = StdRng::seed_from_u64(3);
        h.agent.respawn(Duration::from_secs(60), &mut rng);
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(h.tick(61_000).request.is_some());
    }

    #[test]
    fn heard_chat_triggers_chat_reply_after_debounce() {
        let mut h = Harness::new(60_000);
        h.agent
            .hear_chat(EntityId::from("Bob"), "Lovely weather!", Duration::ZERO);
        h.agent
            .hear_chat(EntityId::from("Bob"), "Hello? Anyone?", Duration::from_millis(1_000));

        // Debounced: the first deadline (3s) was replaced by 4s.
        assert!(h.tick(3_000).request.is_none());
        let request = h.tick(4_000).request.unwrap();
        assert_eq!(request.kind, RequestKind::ChatReply);
        assert_eq!(request.trigger, DecisionTrigger::ChatFollowUp);
        assert!(request.prompt.user.contains("Bob said: \"Hello? Anyone?\""));
    }

    #[test]
    fn follow_ends_after_duration() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        h.complete(
            seq,
            Some(r#"{"action":"follow","target_id":"Bob","intent":"keep company"}"#),
            1_000,
        );
        assert_eq!(h.agent.target_action(), Some(DecisionAction::Follow));

        assert!(h.tick(2_000).intent.forward);
        h.tick(31_000);
        assert_eq!(h.agent.state(), AgentState::Idle);
    }

    #[test]
    fn trade_emits_one_proposal_on_arrival() {
        let mut h = Harness::new(1_000);
        let seq = h.tick(1_000).request.unwrap().seq;
        h.complete(
            seq,
            Some(r#"{"action":"trade","target_id":"Bob","give_items":[{"id":"wood","count":2}],"receive_items":[{"id":"apple","count":1}],"intent":"barter"}"#),
            1_000,
        );
        h.world.move_entity(&EntityId::from("Ann"), Vec3::new(8.0, 0.0, 0.0));

        let out = h.tick(1_050);
        assert_eq!(out.effects.len(), 1);
        assert!(matches!(
            out.effects.first(),
            Some(AgentEffect::TradeProposal { give_items, .. }) if give_items.len() == 1
        ));
        assert_eq!(h.agent.state(), AgentState::Idle);
        assert!(h.tick(1_100).effects.is_empty());
    }
}
