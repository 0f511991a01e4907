//! Outputs the engine exposes to the host each tick.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::decision::TradeItem;
use crate::geometry::Vec3;
use crate::ids::EntityId;

/// Per-tick movement and action request, consumed by the physics and
/// animation collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoveIntent {
    /// Walk forward along `heading`.
    pub forward: bool,
    /// Strafe right.
    pub right: bool,
    /// Jump this tick.
    pub jump: bool,
    /// Run instead of walk.
    pub sprint: bool,
    /// Use / interact this tick.
    pub interact: bool,
    /// Swing at the current target this tick.
    pub attack: bool,
    /// Normalized horizontal facing direction, if the agent should turn.
    pub heading: Option<Vec3>,
}

impl MoveIntent {
    /// Stand still.
    pub const STILL: Self = Self {
        forward: false,
        right: false,
        jump: false,
        sprint: false,
        interact: false,
        attack: false,
        heading: None,
    };

    /// Walk (or run) along `heading`.
    pub const fn walk(heading: Vec3, sprint: bool) -> Self {
        Self {
            forward: true,
            sprint,
            heading: Some(heading),
            ..Self::STILL
        }
    }

    /// Stand still facing `heading`.
    pub const fn face(heading: Option<Vec3>) -> Self {
        Self {
            heading,
            ..Self::STILL
        }
    }
}

/// A side effect produced by an agent, delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentEffect {
    /// The agent says `message` to `target`. Fired at most once per approach.
    Chat {
        /// Who speaks.
        speaker: EntityId,
        /// Who is addressed.
        target: EntityId,
        /// What is said.
        message: String,
    },
    /// The agent proposes an item exchange to `target`.
    TradeProposal {
        /// Who proposes.
        proposer: EntityId,
        /// Who is asked.
        target: EntityId,
        /// Items offered.
        give_items: Vec<TradeItem>,
        /// Items requested.
        receive_items: Vec<TradeItem>,
    },
}
