//! Core building blocks of the Wayfarer agent engine.
//!
//! Everything here is synchronous and free of I/O beyond optional template
//! and config loading. The state machines in `wayfarer-agents` are built on
//! top of these pieces; the runner plugs a concrete world and an oracle
//! client in around them.
//!
//! # Modules
//!
//! - [`world`] -- Collaborator ports ([`WorldView`], [`CombatExecutor`]) and
//!   the nearest-target queries over them
//! - [`memory`] -- [`MemoryWorld`], an in-memory implementation of the ports
//! - [`spatial`] -- Sparse grid broad phase for radius queries
//! - [`observation`] -- Per-agent observation snapshots
//! - [`prompt`] -- Decision and chat-reply prompt rendering
//! - [`parse`] -- Oracle response recovery and validation
//! - [`config`] -- Behavior configuration loaded from YAML
//! - [`clock`] -- Tick counter and simulation time

pub mod clock;
pub mod config;
pub mod memory;
pub mod observation;
pub mod parse;
pub mod prompt;
pub mod spatial;
pub mod world;

pub use clock::{ClockError, WorldClock};
pub use config::{AgentConfig, AnimalConfig, BehaviorConfig, ConfigError, PromptConfig};
pub use memory::MemoryWorld;
pub use observation::snapshot;
pub use parse::{ParseError, ReplyLimits, parse_decision};
pub use prompt::{ChatReplyContext, DecisionContext, PromptEncoder, PromptError, RenderedPrompt};
pub use spatial::SpatialGrid;
pub use world::{CombatExecutor, WorldView};
