//! Shared type definitions for the Wayfarer agent engine.
//!
//! This crate is the single source of truth for the data model shared by the
//! engine crates and the host game. Exposed types flow to `TypeScript` via
//! `ts-rs` so a browser host can consume intents and effects directly.
//!
//! # Modules
//!
//! - [`ids`] -- String-backed identifiers for entities and objects
//! - [`geometry`] -- [`Vec3`] positions and directions
//! - [`entity`] -- Registry records and the [`EntityKind`] discriminator
//! - [`observation`] -- Per-agent observation snapshots
//! - [`decision`] -- Decisions, persistent actions, agent states
//! - [`intent`] -- Per-tick move intents and agent side effects

pub mod decision;
pub mod entity;
pub mod geometry;
pub mod ids;
pub mod intent;
pub mod observation;

// Re-export all public types at crate root for convenience.
pub use decision::{
    AgentState, AnimalState, DecisionAction, DecisionResult, PersistentAction,
    PersistentActionKind, TargetRef, TradeItem,
};
pub use entity::{EntityKind, EntityRecord, InventorySlot, WorldObject};
pub use geometry::Vec3;
pub use ids::{EntityId, ObjectId};
pub use intent::{AgentEffect, MoveIntent};
pub use observation::{NearbyAnimal, NearbyCharacter, NearbyObject, Observation, SelfSnapshot};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the exposed types.

    #[test]
    fn export_bindings() {
        // Exporting writes to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::ObjectId::export_all();
        let _ = crate::geometry::Vec3::export_all();

        let _ = crate::entity::EntityKind::export_all();
        let _ = crate::entity::EntityRecord::export_all();
        let _ = crate::entity::WorldObject::export_all();
        let _ = crate::entity::InventorySlot::export_all();

        let _ = crate::observation::Observation::export_all();

        let _ = crate::decision::DecisionResult::export_all();
        let _ = crate::decision::PersistentAction::export_all();
        let _ = crate::decision::TargetRef::export_all();
        let _ = crate::decision::AgentState::export_all();
        let _ = crate::decision::AnimalState::export_all();

        let _ = crate::intent::MoveIntent::export_all();
        let _ = crate::intent::AgentEffect::export_all();
    }
}
