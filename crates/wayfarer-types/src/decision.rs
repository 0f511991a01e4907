//! Decision, persistent-action and agent-state types.
//!
//! [`DecisionResult`] is the validated form of an oracle answer.
//! [`PersistentAction`] is the remembered attack intent that outlives any
//! particular target instance.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{EntityId, ObjectId};

/// The four actions the oracle may choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum DecisionAction {
    /// Attack a character, animal or harvestable object.
    Attack,
    /// Walk up to a character and say something.
    Chat,
    /// Walk up to a character and propose an item exchange.
    Trade,
    /// Stay near a character for a while.
    Follow,
}

impl DecisionAction {
    /// Parse the literal action name used in the oracle contract.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "attack" => Some(Self::Attack),
            "chat" => Some(Self::Chat),
            "trade" => Some(Self::Trade),
            "follow" => Some(Self::Follow),
            _ => None,
        }
    }

    /// The literal action name used in the oracle contract.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Chat => "chat",
            Self::Trade => "trade",
            Self::Follow => "follow",
        }
    }
}

/// An item stack offered or requested in a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TradeItem {
    /// Item identifier.
    pub id: String,
    /// Quantity.
    pub count: u32,
}

/// A validated oracle decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DecisionResult {
    /// Chosen action.
    pub action: DecisionAction,
    /// Referenced target, as named by the oracle.
    pub target_id: Option<String>,
    /// Draft chat line (chat only).
    pub message: Option<String>,
    /// Items the agent gives (trade only).
    pub give_items: Vec<TradeItem>,
    /// Items the agent wants in return (trade only).
    pub receive_items: Vec<TradeItem>,
    /// Short display intent (at most 10 words).
    pub intent: String,
}

/// The kind of a remembered action. Only attacks are remembered today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PersistentActionKind {
    /// Keep attacking the same target, or the same kind of target.
    Attack,
}

/// Remembered intent that survives target death or despawn.
///
/// Exactly one of `target_id` / `target_type` is normally set: characters are
/// remembered by id, animals by species and objects by resource tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PersistentAction {
    /// What to keep doing.
    pub kind: PersistentActionKind,
    /// A specific character to keep attacking.
    pub target_id: Option<EntityId>,
    /// A class of target (`"wood"`, `"deer"`) to keep attacking.
    pub target_type: Option<String>,
}

impl PersistentAction {
    /// Remember an attack on one specific entity.
    pub const fn attack_id(target_id: EntityId) -> Self {
        Self {
            kind: PersistentActionKind::Attack,
            target_id: Some(target_id),
            target_type: None,
        }
    }

    /// Remember an attack on any instance of a target type.
    pub fn attack_type(target_type: impl Into<String>) -> Self {
        Self {
            kind: PersistentActionKind::Attack,
            target_id: None,
            target_type: Some(target_type.into()),
        }
    }
}

/// What an agent is currently approaching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TargetRef {
    /// A live entity (character or animal).
    Entity(EntityId),
    /// An interactable object.
    Object(ObjectId),
}

impl core::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity:{id}"),
            Self::Object(id) => write!(f, "object:{id}"),
        }
    }
}

/// Humanoid agent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AgentState {
    /// Standing still, waiting for the next decision.
    Idle,
    /// Walking to a local roam destination.
    Roaming,
    /// Waiting for an oracle answer.
    Deciding,
    /// Approaching (and acting on) a target.
    MovingToTarget,
    /// Dead; no further decisions.
    Dead,
}

impl AgentState {
    /// Label used as the agent's current-action string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Roaming => "roaming",
            Self::Deciding => "deciding",
            Self::MovingToTarget => "moving_to_target",
            Self::Dead => "dead",
        }
    }
}

/// Animal agent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum AnimalState {
    /// Standing still.
    Idle,
    /// Wandering near home.
    Roaming,
    /// Chasing and attacking a character.
    Attacking,
    /// Dead.
    Dead,
}

impl AnimalState {
    /// Label used as the animal's current-action string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Roaming => "roaming",
            Self::Attacking => "attacking",
            Self::Dead => "dead",
        }
    }
}
