//! The fixed-rate tick loop.
//!
//! One `tokio` interval drives every agent sequentially:
//! 1. Drain oracle responses that arrived since the last tick
//! 2. Advance the simulation clock by the measured elapsed time
//! 3. Step the simulation (agents, movement, combat, effects)
//! 4. Dispatch any new oracle requests as background tasks
//!
//! Oracle calls never block the loop. An agent waiting on the oracle simply
//! stands still while everyone else keeps moving.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use wayfarer_core::WorldView;

use crate::dispatch::{DecisionResponse, Dispatcher};
use crate::error::RunnerError;
use crate::oracle::OracleTransport;
use crate::world::Simulation;

/// Ticks between two summary log lines.
const SUMMARY_EVERY: u64 = 200;

/// Run the simulation until `shutdown` resolves. Returns the final state.
///
/// # Errors
///
/// Returns [`RunnerError::Clock`] if the simulation clock overflows.
pub async fn run<T, S>(
    mut sim: Simulation,
    dispatcher: Dispatcher<T>,
    mut responses: mpsc::UnboundedReceiver<DecisionResponse>,
    tick_period: Duration,
    shutdown: S,
) -> Result<Simulation, RunnerError>
where
    T: OracleTransport + 'static,
    S: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(tick_period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(
        tick_period_ms = tick_period.as_millis(),
        humanoids = sim.humanoids().len(),
        "tick loop started"
    );
    let mut last = Instant::now();

    loop {
        tokio::select! {
            at = interval.tick() => {
                let dt = at.saturating_duration_since(last);
                last = at;

                let mut ready = Vec::new();
                while let Ok(response) = responses.try_recv() {
                    ready.push(response);
                }

                let out = sim.step(dt, ready)?;
                for request in out.requests {
                    debug!(
                        agent = %request.agent_id,
                        seq = request.seq,
                        trigger = request.trigger.as_str(),
                        "dispatching oracle request"
                    );
                    dispatcher.dispatch(request);
                }
                for effect in &out.effects {
                    info!(effect = ?effect, "agent effect delivered");
                }

                let clock = sim.clock();
                if clock.tick().checked_rem(SUMMARY_EVERY) == Some(0) {
                    let states: Vec<String> = sim
                        .humanoids()
                        .iter()
                        .map(|a| {
                            let health = sim.world().entity(a.id()).map_or(0.0, |e| e.health);
                            format!("{}={}({health:.0})", a.id(), a.state().as_str())
                        })
                        .collect();
                    info!(
                        tick = clock.tick(),
                        sim_time_ms = clock.now().as_millis(),
                        agents = %states.join(" "),
                        "simulation summary"
                    );
                }
            }
            () = &mut shutdown => {
                info!(tick = sim.clock().tick(), "shutdown requested, leaving tick loop");
                break;
            }
        }
    }

    Ok(sim)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use wayfarer_agents::HumanoidAgent;
    use wayfarer_core::{AgentConfig, MemoryWorld, PromptConfig, PromptEncoder, RenderedPrompt};
    use wayfarer_types::{EntityId, EntityKind, EntityRecord, Vec3};

    use super::*;
    use crate::error::OracleError;
    use crate::oracle::OracleClient;

    /// Always asks the agent to greet Bob, after a short think.
    struct Greeter;

    impl OracleTransport for Greeter {
        async fn complete(&self, _prompt: &RenderedPrompt, _api_key: &str) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(r#"{"action":"chat","target_id":"Bob","message":"Morning!","intent":"greet"}"#.to_owned())
        }

        fn name(&self) -> &'static str {
            "greeter"
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

    #[tokio::test(start_paused = true)]
    async fn loop_round_trips_a_decision_and_stops_on_shutdown() {
        let mut world = MemoryWorld::new();
        world.insert_entity(character("Ann", 0.0));
        world.insert_entity(character("Bob", 6.0));
        let mut rng = StdRng::seed_from_u64(3);
        let config = AgentConfig {
            decision_interval_min_ms: 500,
            decision_interval_max_ms: 500,
            ..AgentConfig::default()
        };
        let ann = HumanoidAgent::new(
            EntityId::from("Ann"),
            "A cheerful baker.",
            Vec3::ZERO,
            config,
            Duration::ZERO,
            &mut rng,
        );
        let sim = Simulation::new(
            world,
            vec![ann],
            Vec::new(),
            PromptEncoder::new(PromptConfig::default()).unwrap(),
            "en".to_owned(),
            rng,
        );

        let oracle = Arc::new(OracleClient::new(Greeter, "key".to_owned(), None));
        let (dispatcher, responses) = Dispatcher::new(oracle, Duration::from_secs(7));
        let shutdown = tokio::time::sleep(Duration::from_secs(4));

        let sim = run(sim, dispatcher, responses, Duration::from_millis(50), shutdown)
            .await
            .unwrap();

        // Ann keeps deciding on her timer, so she may have greeted more than once.
        let bob_log = sim.world().recent_events(&EntityId::from("Bob"), 10);
        assert!(!bob_log.is_empty());
        assert!(bob_log.iter().all(|line| line == "Ann said to you: \"Morning!\""));
        assert!(sim.clock().tick() >= 70);
    }
}
