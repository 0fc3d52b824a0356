//! ECS components for the isometric RTS simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use crate::archetype::{UnitTemplate, UnitType};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::{Add, AddAssign, Mul, Sub};

// ============================================================================
// MATH
// ============================================================================

/// 2D vector in grid space (x = south-east axis, y = south-west axis).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_sq().sqrt()
    }

    #[inline]
    pub fn distance_sq(self, other: Vec2) -> f32 {
        (self - other).length_sq()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        Vec2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

// ============================================================================
// IDENTITY & SPATIAL COMPONENTS
// ============================================================================

/// Stable unit identifier. Also the deterministic iteration order.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Slot in the [`crate::pool::PositionPool`] buffers.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolIndex(pub usize);

/// Logical position in grid space.
///
/// Mirrors the pool buffer and is resynced once per tick by
/// `position_readback_system`; systems that run before movement read it.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Active knockback impulse in grid units per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Knockback(pub Option<Vec2>);

impl Knockback {
    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }
}

/// Cached spatial-grid cell key, unset until the first movement tick.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridCell(pub Option<u32>);

/// Painter's-algorithm depth: `x + y` in grid space, lower draws first.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct SortDepth(pub f32);

// ============================================================================
// PATH COMPONENT
// ============================================================================

/// Movement goal plus queued waypoints.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub target: Option<Vec2>,
    pub waypoints: VecDeque<Vec2>,
    /// Reserved for squad grouping; no system reads it yet.
    pub group_id: Option<u32>,
}

impl Path {
    /// Replace the current goal and drop any queue.
    pub fn set_target(&mut self, target: Vec2) {
        self.target = Some(target);
        self.waypoints.clear();
    }

    /// Queue a goal, or make it the target when idle.
    pub fn enqueue(&mut self, point: Vec2) {
        if self.target.is_none() {
            self.target = Some(point);
        } else {
            self.waypoints.push_back(point);
        }
    }

    /// Pull the next waypoint into `target`. Returns false when the path is done.
    pub fn advance(&mut self) -> bool {
        self.target = self.waypoints.pop_front();
        self.target.is_some()
    }

    pub fn cancel(&mut self) {
        self.target = None;
    }

    pub fn is_idle(&self) -> bool {
        self.target.is_none()
    }
}

// ============================================================================
// STATS COMPONENT
// ============================================================================

/// Archetype template plus mutable runtime values.
#[derive(Component, Debug, Clone, Copy)]
pub struct Stats {
    pub unit_type: UnitType,
    pub template: UnitTemplate,
    pub health: f32,
    pub mana: f32,
    pub last_attack_ms: f64,
}

impl Stats {
    pub fn new(unit_type: UnitType) -> Self {
        let template = *unit_type.template();
        Self {
            unit_type,
            template,
            health: template.health,
            mana: template.mana,
            last_attack_ms: 0.0,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.template.speed
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.template.radius
    }

    #[inline]
    pub fn max_health(&self) -> f32 {
        self.template.health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Subtract damage, clamping at zero.
    pub fn damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    pub fn attack_ready(&self, now_ms: f64) -> bool {
        now_ms - self.last_attack_ms > self.template.attack_cooldown_ms
    }
}

// ============================================================================
// COMBAT COMPONENT
// ============================================================================

/// Boss-only ability timers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BossState {
    pub last_special_ms: f64,
    /// Clock time at which the current windup resolves.
    pub windup_end_ms: Option<f64>,
    pub last_target_refresh_ms: Option<f64>,
}

impl BossState {
    pub fn is_charging(&self) -> bool {
        self.windup_end_ms.is_some()
    }
}

/// Whether a combatant is a regular unit or the boss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CombatRole {
    Unit,
    Boss(BossState),
}

/// Targeting state for anything that can fight.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Combat {
    pub target: Option<Entity>,
    pub aggro_radius: f32,
    pub role: CombatRole,
}

impl Combat {
    pub fn unit(aggro_radius: f32) -> Self {
        Self {
            target: None,
            aggro_radius,
            role: CombatRole::Unit,
        }
    }

    pub fn boss(aggro_radius: f32) -> Self {
        Self {
            target: None,
            aggro_radius,
            role: CombatRole::Boss(BossState::default()),
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.role, CombatRole::Boss(_))
    }

    pub fn boss_state(&self) -> Option<&BossState> {
        match &self.role {
            CombatRole::Boss(state) => Some(state),
            CombatRole::Unit => None,
        }
    }
}

// ============================================================================
// RENDER COMPONENT
// ============================================================================

/// Mutually exclusive animation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationState {
    #[default]
    Idle,
    Walk,
    Attack,
    Hit,
    Die,
    Special,
}

/// 8-way compass facing as seen on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    N,
    NE,
    E,
    SE,
    #[default]
    S,
    SW,
    W,
    NW,
}

impl Direction {
    pub fn is_diagonal(self) -> bool {
        matches!(self, Direction::NE | Direction::SE | Direction::SW | Direction::NW)
    }
}

/// Transient taunt shown above a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Heckle {
    pub text: &'static str,
    pub at_ms: f64,
}

/// Animation and presentation state. Every unit has one.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Render {
    pub unit_type: UnitType,
    state: AnimationState,
    pub direction: Direction,
    pub frame: u32,
    pub last_frame_update_ms: f64,
    pub selected: bool,
    pub heckle: Option<Heckle>,
    pub death_ms: Option<f64>,
}

impl Render {
    pub fn new(unit_type: UnitType, now_ms: f64) -> Self {
        Self {
            unit_type,
            state: AnimationState::Idle,
            direction: Direction::S,
            frame: 0,
            last_frame_update_ms: now_ms,
            selected: false,
            heckle: None,
            death_ms: None,
        }
    }

    #[inline]
    pub fn state(&self) -> AnimationState {
        self.state
    }

    #[inline]
    pub fn is_dying(&self) -> bool {
        self.state == AnimationState::Die
    }

    /// Switch animation, restarting the cycle when the state changes so the
    /// frame index stays inside the new state's frame count.
    ///
    /// Leaving `Die` is refused: death is one-way.
    pub fn set_state(&mut self, state: AnimationState) {
        if self.state == state || self.is_dying() {
            return;
        }
        self.state = state;
        self.frame = 0;
    }

    /// Enter `Die` exactly once. Returns false when already dying.
    pub fn begin_death(&mut self, now_ms: f64) -> bool {
        if self.is_dying() {
            return false;
        }
        self.state = AnimationState::Die;
        self.frame = 0;
        self.death_ms = Some(now_ms);
        true
    }

    pub fn show_heckle(&mut self, text: &'static str, now_ms: f64) {
        self.heckle = Some(Heckle { text, at_ms: now_ms });
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete unit entity.
#[derive(Bundle)]
pub struct UnitBundle {
    pub id: UnitId,
    pub pool_index: PoolIndex,
    pub position: Position,
    pub knockback: Knockback,
    pub path: Path,
    pub stats: Stats,
    pub combat: Combat,
    pub render: Render,
    pub grid_cell: GridCell,
    pub depth: SortDepth,
}

impl UnitBundle {
    pub fn new(id: u32, unit_type: UnitType, slot: usize, pos: Vec2, now_ms: f64) -> Self {
        let template = unit_type.template();
        let combat = if unit_type.is_boss() {
            Combat::boss(template.aggro_radius)
        } else {
            Combat::unit(template.aggro_radius)
        };
        Self {
            id: UnitId(id),
            pool_index: PoolIndex(slot),
            position: Position::from(pos),
            knockback: Knockback::default(),
            path: Path::default(),
            stats: Stats::new(unit_type),
            combat,
            render: Render::new(unit_type, now_ms),
            grid_cell: GridCell::default(),
            depth: SortDepth(pos.x + pos.y),
        }
    }
}
