//! Input intents.
//!
//! The input layer translates device events into these and hands them to
//! [`crate::SimWorld::apply_intent`] between ticks. Pointer positions are in
//! screen pixels; the simulation owns the camera and projection and does
//! the conversion itself.

use crate::components::Vec2;
use crate::selection::Modifiers;
use serde::{Deserialize, Serialize};

/// A single input action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Primary button pressed: start a selection drag.
    BeginSelection { screen: Vec2 },
    /// Pointer moved during a selection drag.
    UpdateSelection { screen: Vec2, additive: bool },
    /// Primary button released. Short drags count as clicks.
    EndSelection {
        screen: Vec2,
        #[serde(default)]
        modifiers: Modifiers,
        /// Input timestamp, used for double-click detection.
        at_ms: f64,
    },
    /// Start drawing a formation path.
    BeginFormation { screen: Vec2 },
    /// Pointer moved while drawing. Free-form paths append points, straight
    /// ones only keep the first and the current point.
    ExtendFormation { screen: Vec2, freeform: bool },
    /// Release while drawing: assign selected units along the path.
    CommitFormation,
    /// Order selected units to a point, replacing or queueing.
    MoveSelected { screen: Vec2, queue: bool },
    PanCamera { delta: Vec2 },
    SetCamera { offset: Vec2 },
}
