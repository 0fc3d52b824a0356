//! ECS systems for the isometric RTS simulation.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Tick Order
//!
//! Every tick runs the systems below strictly in sequence; nothing inside a
//! tick runs in parallel. Each system finishes its pass over the world
//! before the next one starts.
//!
//! 1. `boss_ability_system` - targeting, taunts, blast windup/resolution, melee
//! 2. `movement_system` - grid upkeep, knockback, steering, integration
//! 3. `combat_system` - death transitions, attack/hit recovery
//! 4. `animation_system` - frame advance
//! 5. `position_readback_system` - pool positions back into `Position`
//!
//! Input (selection, orders, formations) is applied between ticks through
//! [`crate::SimWorld`], never during one.

pub mod animation;
pub mod boss;
pub mod combat;
pub mod movement;

pub use animation::*;
pub use boss::*;
pub use combat::*;
pub use movement::*;
