//! Isometric RTS - Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of a squad-versus-boss
//! skirmish on an isometric map: steering with separation, waypoint paths,
//! knockback, boss abilities, selection and formations.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod archetype;
pub mod components;
pub mod config;
pub mod error;
pub mod formation;
pub mod intents;
pub mod iso;
pub mod pool;
pub mod render_view;
pub mod selection;
pub mod spatial;
pub mod systems;
pub mod tiles;
pub mod world;

pub use api::{SimWorld, BOSS_ID};
pub use archetype::UnitType;
pub use components::*;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use intents::Intent;
pub use render_view::{DrawItem, Viewport};
pub use selection::Modifiers;
pub use spatial::SpatialGrid;
pub use systems::*;
pub use tiles::{TileGrid, TileType};
pub use world::{SimEvent, Snapshot, UnitSnapshot};
