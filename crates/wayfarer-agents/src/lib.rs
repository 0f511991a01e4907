//! Decision-making and behavior for Wayfarer NPCs.
//!
//! This crate holds the per-agent state machines. They are sans-IO: a tick
//! reads the world through the `wayfarer-core` ports and returns movement
//! intents, effects and oracle requests for the host to carry out.
//!
//! # Modules
//!
//! - [`humanoid`] -- Oracle-driven humanoid agent ([`HumanoidAgent`])
//! - [`animal`] -- Rule-driven animal agent ([`AnimalAgent`])
//! - [`resolver`] -- Turns oracle decisions into plans ([`ActionResolver`])
//! - [`scheduler`] -- Decision timers, cooldowns and the chat debounce
//! - [`steering`] -- Approach and wander helpers

pub mod animal;
pub mod humanoid;
pub mod resolver;
pub mod scheduler;
pub mod steering;

pub use animal::AnimalAgent;
pub use humanoid::{
    Completion, DecisionRequest, HumanoidAgent, RequestKind, TickContext, TickOutput,
};
pub use resolver::{ActionResolver, FALLBACK_INTENT, Locus, Plan};
pub use scheduler::{DebounceTimer, DecisionScheduler, DecisionTrigger, jittered};
