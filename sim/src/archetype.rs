//! Unit archetypes: stat templates and render metadata.
//!
//! Archetypes form a closed set, so every table here is a `match` rather
//! than a string-keyed map. String ids only appear at the boundary with
//! asset files and fall back to [`UnitType::Scout`] when unknown.

use crate::components::{AnimationState, Direction};
use serde::{Deserialize, Serialize};

/// The closed set of unit archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitType {
    #[default]
    Scout,
    Warrior,
    Mage,
    TechnoPriest,
    BossOverseer,
}

impl UnitType {
    /// Every archetype, in roster order.
    pub const ALL: [UnitType; 5] = [
        UnitType::Scout,
        UnitType::Warrior,
        UnitType::Mage,
        UnitType::TechnoPriest,
        UnitType::BossOverseer,
    ];

    /// Archetypes a default player squad cycles through.
    pub const SQUAD: [UnitType; 4] = [
        UnitType::Scout,
        UnitType::Warrior,
        UnitType::Mage,
        UnitType::TechnoPriest,
    ];

    pub fn asset_id(self) -> &'static str {
        match self {
            UnitType::Scout => "scout",
            UnitType::Warrior => "warrior",
            UnitType::Mage => "mage",
            UnitType::TechnoPriest => "techno_priest",
            UnitType::BossOverseer => "overseer",
        }
    }

    /// Resolve an asset id, falling back to the scout for unknown ids.
    pub fn from_asset_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.asset_id() == id)
            .unwrap_or_else(|| {
                tracing::warn!(asset_id = id, "unknown archetype id, using scout");
                UnitType::Scout
            })
    }

    pub fn is_boss(self) -> bool {
        matches!(self, UnitType::BossOverseer)
    }

    pub fn template(self) -> &'static UnitTemplate {
        match self {
            UnitType::Scout => &SCOUT,
            UnitType::Warrior => &WARRIOR,
            UnitType::Mage => &MAGE,
            UnitType::TechnoPriest => &TECHNO_PRIEST,
            UnitType::BossOverseer => &OVERSEER,
        }
    }

    pub fn asset(self) -> &'static AssetMetadata {
        match self {
            UnitType::Scout => &SCOUT_ASSET,
            UnitType::Warrior => &WARRIOR_ASSET,
            UnitType::Mage => &MAGE_ASSET,
            UnitType::TechnoPriest => &TECHNO_PRIEST_ASSET,
            UnitType::BossOverseer => &OVERSEER_ASSET,
        }
    }
}

/// Immutable per-archetype stat block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitTemplate {
    pub name: &'static str,
    pub color: &'static str,
    /// Grid units per second.
    pub speed: f32,
    pub health: f32,
    pub mana: f32,
    pub radius: f32,
    pub attack_range: f32,
    pub attack_damage: f32,
    /// Milliseconds between attacks.
    pub attack_cooldown_ms: f64,
    pub aggro_radius: f32,
}

pub const SCOUT: UnitTemplate = UnitTemplate {
    name: "Phase Scout",
    color: "#22c55e",
    speed: 3.2,
    health: 80.0,
    mana: 50.0,
    radius: 0.25,
    attack_range: 1.2,
    attack_damage: 8.0,
    attack_cooldown_ms: 600.0,
    aggro_radius: 5.0,
};

pub const WARRIOR: UnitTemplate = UnitTemplate {
    name: "Rune Guardian",
    color: "#ef4444",
    speed: 1.8,
    health: 220.0,
    mana: 30.0,
    radius: 0.45,
    attack_range: 1.0,
    attack_damage: 15.0,
    attack_cooldown_ms: 1000.0,
    aggro_radius: 5.0,
};

pub const MAGE: UnitTemplate = UnitTemplate {
    name: "Void Weaver",
    color: "#3b82f6",
    speed: 1.6,
    health: 100.0,
    mana: 250.0,
    radius: 0.35,
    attack_range: 4.5,
    attack_damage: 20.0,
    attack_cooldown_ms: 1500.0,
    aggro_radius: 5.0,
};

pub const TECHNO_PRIEST: UnitTemplate = UnitTemplate {
    name: "Circuit Shaman",
    color: "#eab308",
    speed: 1.7,
    health: 140.0,
    mana: 180.0,
    radius: 0.4,
    attack_range: 3.0,
    attack_damage: 12.0,
    attack_cooldown_ms: 1200.0,
    aggro_radius: 5.0,
};

pub const OVERSEER: UnitTemplate = UnitTemplate {
    name: "Zog the Insufferable",
    color: "#f43f5e",
    speed: 2.2,
    health: 1500.0,
    mana: 500.0,
    radius: 0.8,
    attack_range: 2.0,
    attack_damage: 25.0,
    attack_cooldown_ms: 1200.0,
    aggro_radius: 12.0,
};

// ============================================================================
// RENDER METADATA
// ============================================================================

/// A value for each animation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerState<T> {
    pub idle: T,
    pub walk: T,
    pub attack: T,
    pub hit: T,
    pub die: T,
    pub special: T,
}

impl<T: Copy> PerState<T> {
    pub fn get(&self, state: AnimationState) -> T {
        match state {
            AnimationState::Idle => self.idle,
            AnimationState::Walk => self.walk,
            AnimationState::Attack => self.attack,
            AnimationState::Hit => self.hit,
            AnimationState::Die => self.die,
            AnimationState::Special => self.special,
        }
    }
}

/// Placeholder silhouette drawn when no sprite sheet is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderKind {
    Humanoid,
    Heavy,
    Boss,
}

/// Visor width, optionally narrower when facing a diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisorWidth {
    Fixed(f32),
    ByFacing { cardinal: f32, diagonal: f32 },
}

/// Visor color, optionally switching while the special is charging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisorColor {
    Fixed(&'static str),
    Special { normal: &'static str, special: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisorConfig {
    pub width: VisorWidth,
    pub height: f32,
    pub color: VisorColor,
}

impl VisorConfig {
    pub fn width_for(&self, facing: Direction) -> f32 {
        match self.width {
            VisorWidth::Fixed(w) => w,
            VisorWidth::ByFacing { cardinal, diagonal } => {
                if facing.is_diagonal() {
                    diagonal
                } else {
                    cardinal
                }
            }
        }
    }

    pub fn color_for(&self, state: AnimationState) -> &'static str {
        match self.color {
            VisorColor::Fixed(c) => c,
            VisorColor::Special { normal, special } => {
                if state == AnimationState::Special {
                    special
                } else {
                    normal
                }
            }
        }
    }
}

/// Optional procedural animation tweaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationHooks {
    pub bounce: bool,
    pub lunge: bool,
    pub charge_effect: bool,
}

/// Read-only render description of an archetype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetMetadata {
    pub base_scale: f32,
    pub shadow_scale: (f32, f32),
    pub hitbox_offset: (f32, f32),
    pub placeholder: PlaceholderKind,
    pub frame_count: PerState<u32>,
    /// Milliseconds per frame.
    pub frame_rate: PerState<f64>,
    pub visor: VisorConfig,
    pub hooks: AnimationHooks,
}

impl AssetMetadata {
    /// Frame count for a state, never zero.
    #[inline]
    pub fn frames(&self, state: AnimationState) -> u32 {
        self.frame_count.get(state).max(1)
    }

    #[inline]
    pub fn rate_ms(&self, state: AnimationState) -> f64 {
        self.frame_rate.get(state)
    }

    #[inline]
    pub fn last_frame(&self, state: AnimationState) -> u32 {
        self.frames(state) - 1
    }
}

const DEFAULT_FRAME_RATES: PerState<f64> = PerState {
    idle: 200.0,
    walk: 110.0,
    attack: 100.0,
    hit: 80.0,
    die: 150.0,
    special: 120.0,
};

const DEFAULT_FRAME_COUNTS: PerState<u32> = PerState {
    idle: 4,
    walk: 8,
    attack: 6,
    hit: 4,
    die: 8,
    special: 6,
};

const HUMANOID_VISOR: VisorConfig = VisorConfig {
    width: VisorWidth::ByFacing {
        cardinal: 12.0,
        diagonal: 8.0,
    },
    height: 4.0,
    color: VisorColor::Fixed("#fff"),
};

const HUMANOID_HOOKS: AnimationHooks = AnimationHooks {
    bounce: true,
    lunge: false,
    charge_effect: false,
};

const fn humanoid(base_scale: f32, shadow_scale: (f32, f32)) -> AssetMetadata {
    AssetMetadata {
        base_scale,
        shadow_scale,
        hitbox_offset: (0.0, -28.0),
        placeholder: PlaceholderKind::Humanoid,
        frame_count: DEFAULT_FRAME_COUNTS,
        frame_rate: DEFAULT_FRAME_RATES,
        visor: HUMANOID_VISOR,
        hooks: HUMANOID_HOOKS,
    }
}

const SCOUT_ASSET: AssetMetadata = humanoid(1.0, (20.0, 10.0));
const WARRIOR_ASSET: AssetMetadata = humanoid(1.15, (25.0, 12.0));
const MAGE_ASSET: AssetMetadata = humanoid(1.0, (20.0, 10.0));
const TECHNO_PRIEST_ASSET: AssetMetadata = humanoid(1.05, (22.0, 11.0));

const OVERSEER_ASSET: AssetMetadata = AssetMetadata {
    base_scale: 1.8,
    shadow_scale: (20.0, 10.0),
    hitbox_offset: (0.0, -28.0),
    placeholder: PlaceholderKind::Boss,
    frame_count: PerState {
        die: 12,
        special: 10,
        ..DEFAULT_FRAME_COUNTS
    },
    frame_rate: DEFAULT_FRAME_RATES,
    visor: VisorConfig {
        width: VisorWidth::Fixed(18.0),
        height: 6.0,
        color: VisorColor::Special {
            normal: "#f00",
            special: "#fff",
        },
    },
    hooks: AnimationHooks {
        bounce: false,
        lunge: true,
        charge_effect: true,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_round_trip_and_fallback() {
        for t in UnitType::ALL {
            assert_eq!(UnitType::from_asset_id(t.asset_id()), t);
        }
        assert_eq!(UnitType::from_asset_id("dragon"), UnitType::Scout);
    }

    #[test]
    fn test_overseer_frame_overrides() {
        let asset = UnitType::BossOverseer.asset();
        assert_eq!(asset.frames(AnimationState::Die), 12);
        assert_eq!(asset.frames(AnimationState::Special), 10);
        assert_eq!(asset.frames(AnimationState::Walk), 8);
        assert_eq!(UnitType::Scout.asset().frames(AnimationState::Die), 8);
    }

    #[test]
    fn test_visor_rules() {
        let scout = UnitType::Scout.asset();
        assert_eq!(scout.visor.width_for(Direction::NE), 8.0);
        assert_eq!(scout.visor.width_for(Direction::S), 12.0);

        let boss = UnitType::BossOverseer.asset();
        assert_eq!(boss.visor.width_for(Direction::NE), 18.0);
        assert_eq!(boss.visor.color_for(AnimationState::Special), "#fff");
        assert_eq!(boss.visor.color_for(AnimationState::Walk), "#f00");
    }

    #[test]
    fn test_only_overseer_is_boss() {
        let bosses: Vec<_> = UnitType::ALL.into_iter().filter(|t| t.is_boss()).collect();
        assert_eq!(bosses, vec![UnitType::BossOverseer]);
    }
}
