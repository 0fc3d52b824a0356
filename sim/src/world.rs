//! Shared world resources and snapshot types.
//!
//! The `Snapshot` struct provides a flattened, serializable view of the
//! simulation state that the UI layer pulls on its own timer.

use crate::archetype::UnitType;
use crate::components::*;
use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

// ============================================================================
// CLOCK
// ============================================================================

/// Delta time of the current tick, in seconds.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);

/// Monotonic simulation clock.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    /// Milliseconds of simulated time.
    pub now_ms: f64,
    pub tick: u64,
}

impl SimClock {
    pub fn advance(&mut self, dt: f32) {
        self.now_ms += f64::from(dt) * 1000.0;
        self.tick = self.tick.wrapping_add(1);
    }
}

/// Seeded RNG so taunts and tile layouts replay identically.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub Pcg64Mcg);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(Pcg64Mcg::seed_from_u64(seed))
    }
}

// ============================================================================
// UI-AUTHORED STATE
// ============================================================================

/// Screen-space camera offset in pixels.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera(pub Vec2);

/// Drag rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub start: Vec2,
    pub end: Vec2,
}

impl ScreenRect {
    /// `(min, max)` corners regardless of drag direction.
    pub fn normalized(&self) -> (Vec2, Vec2) {
        (
            Vec2::new(self.start.x.min(self.end.x), self.start.y.min(self.end.y)),
            Vec2::new(self.start.x.max(self.end.x), self.start.y.max(self.end.y)),
        )
    }
}

/// Marker drawn where the last move order landed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveIndicator {
    pub pos: Vec2,
    pub at_ms: f64,
}

/// Transient inputs and effects shared with the input and render layers.
#[derive(Resource, Debug, Clone, Default)]
pub struct Overlays {
    pub selection_rect: Option<ScreenRect>,
    /// Formation draft in grid space.
    pub formation_path: Option<Vec<Vec2>>,
    pub move_indicator: Option<MoveIndicator>,
    /// Shake magnitude in pixels; the renderer decays it.
    pub screen_shake: Option<f32>,
}

// ============================================================================
// EVENTS
// ============================================================================

/// Notable things that happened during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    SpecialCharged { boss: UnitId, at_ms: f64 },
    SpecialBlast { boss: UnitId, victims: Vec<UnitId>, at_ms: f64 },
    MeleeHit { boss: UnitId, target: UnitId, damage: f32 },
    Heckle { unit: UnitId, text: &'static str },
    Died { unit: UnitId, at_ms: f64 },
}

/// Event log appended by systems and drained by the host.
#[derive(Resource, Debug, Default)]
pub struct SimEvents(pub Vec<SimEvent>);

impl SimEvents {
    pub fn push(&mut self, event: SimEvent) {
        self.0.push(event);
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.0)
    }
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

/// Flattened read-only view of one unit for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub unit_type: UnitType,
    pub x: f32,
    pub y: f32,
    pub target: Option<Vec2>,
    pub speed: f32,
    pub health: f32,
    pub max_health: f32,
    pub selected: bool,
    pub color: String,
    pub facing: Direction,
    pub name: String,
    pub mana: f32,
    pub animation: AnimationState,
}

/// Complete UI snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Simulated time in milliseconds.
    pub time_ms: f64,
    /// All units, ordered by id.
    pub units: Vec<UnitSnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World) -> Self {
        let clock = world.get_resource::<SimClock>().copied().unwrap_or_default();

        let mut query = world.query::<(
            &UnitId,
            &Position,
            &Render,
            Option<&Stats>,
            Option<&Path>,
        )>();

        let mut units: Vec<UnitSnapshot> = query
            .iter(world)
            .map(|(id, pos, render, stats, path)| UnitSnapshot {
                id: id.0,
                unit_type: stats.map(|s| s.unit_type).unwrap_or_default(),
                x: pos.x,
                y: pos.y,
                target: path.and_then(|p| p.target),
                speed: stats.map(|s| s.speed()).unwrap_or(0.0),
                health: stats.map(|s| s.health).unwrap_or(0.0),
                max_health: stats.map(|s| s.max_health()).unwrap_or(100.0),
                selected: render.selected,
                color: stats.map(|s| s.template.color).unwrap_or("#fff").to_string(),
                facing: render.direction,
                name: stats.map(|s| s.template.name).unwrap_or("Unknown").to_string(),
                mana: stats.map(|s| s.mana).unwrap_or(0.0),
                animation: render.state(),
            })
            .collect();
        units.sort_by_key(|u| u.id);

        Self {
            tick: clock.tick,
            time_ms: clock.now_ms,
            units,
        }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

/// Fires at a fixed interval, independent of the tick rate.
#[derive(Debug, Clone, Copy)]
pub struct UiSyncTimer {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl UiSyncTimer {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// True when a snapshot is due at `now_ms`; arms the next interval.
    pub fn due(&mut self, now_ms: f64) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_for_missing_stats() {
        let mut world = World::new();
        world.insert_resource(SimClock { now_ms: 250.0, tick: 5 });
        world.spawn((
            UnitId(3),
            Position::new(1.0, 2.0),
            Render::new(UnitType::Mage, 0.0),
        ));
        world.spawn(UnitBundle::new(1, UnitType::Warrior, 0, Vec2::new(4.0, 4.0), 0.0));

        let snapshot = Snapshot::from_world(&mut world);
        assert_eq!(snapshot.tick, 5);
        assert_eq!(snapshot.units.len(), 2);
        assert_eq!(snapshot.units[0].id, 1);
        assert_eq!(snapshot.units[0].name, "Rune Guardian");

        let bare = &snapshot.units[1];
        assert_eq!(bare.unit_type, UnitType::Scout);
        assert_eq!(bare.speed, 0.0);
        assert_eq!(bare.health, 0.0);
        assert_eq!(bare.max_health, 100.0);
        assert_eq!(bare.color, "#fff");
        assert_eq!(bare.name, "Unknown");
        assert!(bare.target.is_none());
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut world = World::new();
        world.spawn(UnitBundle::new(7, UnitType::Scout, 0, Vec2::new(1.0, 1.0), 0.0));
        let snapshot = Snapshot::from_world(&mut world);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("Phase Scout"));
        let restored = Snapshot::from_json(&json).unwrap();
        assert_eq!(restored.units, snapshot.units);
    }

    #[test]
    fn test_ui_sync_timer_interval() {
        let mut timer = UiSyncTimer::new(50.0);
        assert!(timer.due(0.0));
        assert!(!timer.due(20.0));
        assert!(!timer.due(49.9));
        assert!(timer.due(50.0));
        assert!(!timer.due(60.0));
        assert!(timer.due(120.0));
    }

    #[test]
    fn test_clock_advances_in_ms() {
        let mut clock = SimClock::default();
        clock.advance(0.1);
        clock.advance(0.1);
        assert!((clock.now_ms - 200.0).abs() < 1e-3);
        assert_eq!(clock.tick, 2);
    }
}
