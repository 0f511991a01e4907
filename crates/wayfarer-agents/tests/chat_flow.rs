//! End-to-end chat: an oracle reply drives a humanoid across the map to
//! deliver a line exactly once.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wayfarer_agents::{Completion, HumanoidAgent, TickContext, TickOutput};
use wayfarer_core::{AgentConfig, CombatExecutor, MemoryWorld, PromptConfig, PromptEncoder, WorldClock};
use wayfarer_types::{
    AgentEffect, AgentState, DecisionAction, EntityId, EntityKind, EntityRecord, TargetRef, Vec3,
};

struct NoCombat;

impl CombatExecutor for NoCombat {
    fn initiate_attack(&mut self, _attacker: &EntityId, _target: &TargetRef) -> bool {
        false
    }
}

fn character(id: &str, x: f32, health: f32) -> EntityRecord {
    EntityRecord {
        id: EntityId::from(id),
        kind: EntityKind::Character,
        species: None,
        position: Vec3::new(x, 0.0, 0.0),
        health,
        dead: false,
        aggressive: false,
        current_action: "idle".to_owned(),
    }
}

fn tick(
    agent: &mut HumanoidAgent,
    world: &MemoryWorld,
    encoder: &PromptEncoder,
    ms: u64,
    rng: &mut StdRng,
) -> TickOutput {
    let mut combat = NoCombat;
    let mut ctx = TickContext {
        world,
        combat: &mut combat,
        encoder,
        clock: WorldClock::from_parts(ms / 50, Duration::from_millis(ms)),
        timestamp: Utc::now(),
        locale: "en",
    };
    agent.tick(&mut ctx, rng)
}

#[test]
fn friendly_farmer_greets_bob_once() {
    let farmer = EntityId::from("Farmer");
    let bob = EntityId::from("Bob");

    let mut world = MemoryWorld::new();
    world.insert_entity(character("Farmer", 0.0, 100.0));
    world.insert_entity(character("Bob", 12.0, 40.0));

    let encoder = PromptEncoder::new(PromptConfig::default()).unwrap();
    let config = AgentConfig {
        decision_interval_min_ms: 500,
        decision_interval_max_ms: 500,
        ..AgentConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(42);
    let mut agent = HumanoidAgent::new(
        farmer.clone(),
        "A friendly farmer who loves chatting with neighbors.",
        Vec3::ZERO,
        config,
        Duration::ZERO,
        &mut rng,
    );

    let request = tick(&mut agent, &world, &encoder, 500, &mut rng)
        .request
        .unwrap();
    assert!(request.prompt.system.contains("friendly farmer"));
    assert!(request.prompt.user.contains("- Bob (health 40, 12.0m away"));

    let reply = r#"{"action":"chat","target_id":"Bob","message":"Hello!","intent":"greet neighbor"}"#;
    let completion = agent.complete_decision(
        request.seq,
        Some(reply),
        &world,
        Duration::from_millis(900),
        &mut rng,
    );
    assert_eq!(completion, Completion::Applied);
    assert_eq!(agent.target(), Some(&TargetRef::Entity(bob.clone())));
    assert_eq!(agent.target_action(), Some(DecisionAction::Chat));
    assert_eq!(agent.message(), Some("Hello!"));
    assert_eq!(agent.display_intent(), "greet neighbor");
    assert_eq!(agent.state(), AgentState::MovingToTarget);

    // Walk the farmer toward Bob one metre per tick, the way a host would
    // integrate the intent.
    let mut chats = Vec::new();
    let mut x = 0.0_f32;
    let mut ms = 950;
    for _ in 0..20 {
        let out = tick(&mut agent, &world, &encoder, ms, &mut rng);
        chats.extend(
            out.effects
                .into_iter()
                .filter(|e| matches!(e, AgentEffect::Chat { .. })),
        );
        if out.intent.forward {
            x += 1.0;
            world.move_entity(&farmer, Vec3::new(x, 0.0, 0.0));
        }
        ms = ms.saturating_add(50);
    }

    assert_eq!(
        chats,
        vec![AgentEffect::Chat {
            speaker: farmer,
            target: bob,
            message: "Hello!".to_owned(),
        }]
    );
    assert_eq!(agent.state(), AgentState::Idle);
    assert!(agent.target().is_none());
}
