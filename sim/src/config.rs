//! Simulation tuning.
//!
//! Every constant the systems read lives here so a host can override any of
//! them from JSON. Sections use `#[serde(default)]`, so a partial document
//! only needs the fields it changes:
//!
//! ```json
//! { "boss": { "special_cooldown_ms": 4000.0 }, "world": { "seed": 7 } }
//! ```

use crate::error::{SimError, SimResult};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level simulation configuration, inserted into the world as a resource.
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub grid: GridConfig,
    pub movement: MovementConfig,
    pub combat: CombatConfig,
    pub boss: BossConfig,
    pub selection: SelectionConfig,
    pub projection: ProjectionConfig,
    pub render: RenderConfig,
}

/// World lifecycle and clock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Tiles per side of the square map.
    pub world_size: u32,
    /// Capacity of the position/velocity pool.
    pub max_entities: usize,
    /// Fixed timestep in seconds used by `SimWorld::step`.
    pub fixed_timestep: f32,
    /// Upper bound for a single frame delta fed into `step`.
    pub max_frame_dt: f32,
    /// Seed for heckles and tile generation.
    pub seed: u64,
    /// Interval between UI snapshots, in milliseconds.
    pub ui_sync_interval_ms: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_size: 24,
            max_entities: 512,
            fixed_timestep: 1.0 / 60.0,
            max_frame_dt: 0.05,
            seed: 0x5eed_2077,
            ui_sync_interval_ms: 50.0,
        }
    }
}

/// Spatial grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Cell edge length in grid units.
    pub cell_size: f32,
    /// Offset added to cell indices before packing into a key.
    pub key_bias: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 1.5,
            key_bias: 1000,
        }
    }
}

/// Steering and knockback constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub separation_strength: f32,
    /// Combined radii are scaled by this before testing overlap.
    pub separation_overlap: f32,
    pub max_separation_dist: f32,
    pub boss_separation_multiplier: f32,
    pub arrival_threshold: f32,
    pub knockback_decay: f32,
    /// Knockback is dropped once `|x| + |y|` falls below this.
    pub knockback_stop_threshold: f32,
    pub min_velocity_sq: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            separation_strength: 15.0,
            separation_overlap: 1.1,
            max_separation_dist: 1.5,
            boss_separation_multiplier: 3.0,
            arrival_threshold: 0.25,
            knockback_decay: 0.88,
            knockback_stop_threshold: 0.1,
            min_velocity_sq: 0.0025,
        }
    }
}

impl MovementConfig {
    #[inline]
    pub fn arrival_threshold_sq(&self) -> f32 {
        self.arrival_threshold * self.arrival_threshold
    }
}

/// Animation recovery timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub hit_recovery_ms: f64,
    pub attack_recovery_ms: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            hit_recovery_ms: 400.0,
            attack_recovery_ms: 800.0,
        }
    }
}

/// Boss AI, taunts and the telegraphed blast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossConfig {
    /// Per-tick probability of a taunt once the heckle cooldown has elapsed.
    pub heckle_chance: f64,
    pub heckle_cooldown_ms: f64,
    pub heckle_display_ms: f64,
    pub special_cooldown_ms: f64,
    pub windup_ms: f64,
    pub shove_radius: f32,
    pub blast_damage: f32,
    pub blast_force: f32,
    /// Added to the victim distance so the force stays finite at the center.
    pub blast_epsilon: f32,
    pub target_refresh_ms: f64,
    pub screen_shake_impact: f32,
    /// Fraction of attack range beyond which the boss keeps chasing.
    pub engage_fraction: f32,
    pub melee_knockback: f32,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            heckle_chance: 0.004,
            heckle_cooldown_ms: 4500.0,
            heckle_display_ms: 2500.0,
            special_cooldown_ms: 8000.0,
            windup_ms: 1200.0,
            shove_radius: 4.5,
            blast_damage: 20.0,
            blast_force: 20.0,
            blast_epsilon: 0.4,
            target_refresh_ms: 3000.0,
            screen_shake_impact: 18.0,
            engage_fraction: 0.85,
            melee_knockback: 2.5,
        }
    }
}

/// Screen-space hit testing (pixels) and click timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Half-width of a unit's hit box.
    pub hitbox_half_width: f32,
    /// Top edge relative to the anchor (negative = above).
    pub hitbox_top: f32,
    pub hitbox_bottom: f32,
    /// Pick distance is measured from `anchor.y - center_offset`.
    pub hitbox_center_offset: f32,
    pub pick_max_dist_sq: f32,
    pub double_click_ms: f64,
    pub drag_threshold_sq: f32,
    /// Minimum squared spacing between free-form formation points.
    pub formation_min_spacing_sq: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            hitbox_half_width: 25.0,
            hitbox_top: -70.0,
            hitbox_bottom: 15.0,
            hitbox_center_offset: 25.0,
            pick_max_dist_sq: 10_000.0,
            double_click_ms: 300.0,
            drag_threshold_sq: 36.0,
            formation_min_spacing_sq: 0.04,
        }
    }
}

/// Isometric tile dimensions in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub tile_width: f32,
    pub tile_height: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            tile_width: 128.0,
            tile_height: 64.0,
        }
    }
}

/// Values the render view exposes to the drawing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub death_duration_ms: f64,
    pub move_indicator_ms: f64,
    /// Grid-unit padding added around the culled viewport.
    pub cull_padding: f32,
    pub screen_shake_decay: f32,
    pub screen_shake_floor: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            death_duration_ms: 3000.0,
            move_indicator_ms: 500.0,
            cull_padding: 3.0,
            screen_shake_decay: 0.9,
            screen_shake_floor: 0.5,
        }
    }
}

impl SimConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json_str(data: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_path(path: &Path) -> SimResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the systems cannot work with.
    pub fn validate(&self) -> SimResult<()> {
        fn positive(field: &'static str, value: f64) -> SimResult<()> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(SimError::InvalidConfig {
                    field,
                    reason: format!("must be positive and finite, got {value}"),
                })
            }
        }

        positive("world.fixed_timestep", self.world.fixed_timestep as f64)?;
        positive("world.max_frame_dt", self.world.max_frame_dt as f64)?;
        positive("grid.cell_size", self.grid.cell_size as f64)?;
        positive("movement.arrival_threshold", self.movement.arrival_threshold as f64)?;
        positive("movement.max_separation_dist", self.movement.max_separation_dist as f64)?;
        positive("boss.shove_radius", self.boss.shove_radius as f64)?;
        positive("boss.blast_epsilon", self.boss.blast_epsilon as f64)?;
        positive("projection.tile_width", self.projection.tile_width as f64)?;
        positive("projection.tile_height", self.projection.tile_height as f64)?;

        if self.world.max_entities == 0 {
            return Err(SimError::InvalidConfig {
                field: "world.max_entities",
                reason: "must be at least 1".into(),
            });
        }
        // Both biased indices must fit in 16 bits for the packed key.
        if self.grid.key_bias <= 0 || self.grid.key_bias >= i32::from(u16::MAX) / 2 {
            return Err(SimError::InvalidConfig {
                field: "grid.key_bias",
                reason: format!("must be in 1..{}, got {}", u16::MAX / 2, self.grid.key_bias),
            });
        }
        let decay = self.movement.knockback_decay;
        if !(decay > 0.0 && decay < 1.0) {
            return Err(SimError::InvalidConfig {
                field: "movement.knockback_decay",
                reason: format!("must be in (0, 1), got {decay}"),
            });
        }
        if !(0.0..=1.0).contains(&self.boss.heckle_chance) {
            return Err(SimError::InvalidConfig {
                field: "boss.heckle_chance",
                reason: format!("must be a probability, got {}", self.boss.heckle_chance),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "boss": { "windup_ms": 600.0 }, "world": { "seed": 9 } }"#;
        let config = SimConfig::from_json_str(json).unwrap();
        assert_eq!(config.boss.windup_ms, 600.0);
        assert_eq!(config.boss.shove_radius, 4.5);
        assert_eq!(config.world.seed, 9);
        assert_eq!(config.world.max_entities, 512);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = SimConfig::from_json_str(r#"{ "grid": { "cell_size": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { field: "grid.cell_size", .. }));

        let err = SimConfig::from_json_str(r#"{ "movement": { "knockback_decay": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig { field: "movement.knockback_decay", .. }));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }
}
