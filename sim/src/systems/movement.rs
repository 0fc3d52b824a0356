//! Movement system - steering, knockback, arrival and spatial grid upkeep.
//!
//! Positions live in the [`PositionPool`]; this system is the only writer
//! during a tick and the only owner of the [`SpatialGrid`]. The `Position`
//! component is brought back in sync by [`position_readback_system`] at the
//! end of the tick.

use crate::components::*;
use crate::config::SimConfig;
use crate::iso::direction_between;
use crate::pool::PositionPool;
use crate::spatial::SpatialGrid;
use crate::world::DeltaTime;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Pairs closer than this (squared) exert no separation on each other.
const MIN_SEPARATION_DIST_SQ: f32 = 0.0001;

/// What separation needs to know about a neighbor.
#[derive(Clone, Copy)]
struct Neighbor {
    slot: usize,
    radius: f32,
}

/// Everything the steering pass touches on one entity.
type MoverQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static UnitId,
        &'static PoolIndex,
        &'static mut Render,
        &'static mut Knockback,
        &'static mut GridCell,
        &'static mut SortDepth,
        Option<&'static mut Path>,
        Option<&'static Stats>,
        Option<&'static Combat>,
    ),
>;

/// Steer every living entity and integrate its position.
///
/// Runs in two passes over entities in ascending `UnitId` order:
/// 1. grid membership is brought up to date with the pool positions
///    (dying entities leave the grid for good);
/// 2. each entity with stats resolves knockback or path following, adds
///    separation from its grid neighbors and integrates.
///
/// Neighbors are read from the pool as the pass writes it, so later
/// entities see the already-moved positions of earlier ones.
pub fn movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut grid: ResMut<SpatialGrid>,
    mut pool: ResMut<PositionPool>,
    mut query: MoverQuery,
) {
    let delta = dt.0;
    let cfg = &config.movement;

    let mut order: Vec<(UnitId, Entity)> =
        query.iter().map(|(e, id, ..)| (*id, e)).collect();
    order.sort_unstable_by_key(|(id, _)| *id);

    // ------------------------------------------------------------------
    // Pass 1: grid maintenance
    // ------------------------------------------------------------------
    for &(id, entity) in &order {
        let Ok((_, _, slot, render, _, mut cell, ..)) = query.get_mut(entity) else {
            continue;
        };

        if render.is_dying() {
            if let Some(old) = cell.0.take() {
                grid.remove_by_key(old, entity);
                tracing::trace!(unit = id.0, "left spatial grid");
            }
            continue;
        }

        let pos = pool.position(slot.0);
        let key = grid.key(pos.x, pos.y);
        match cell.0 {
            Some(old) if old == key => {}
            Some(old) => {
                grid.remove_by_key(old, entity);
                grid.insert_with_key(key, entity);
                cell.0 = Some(key);
            }
            None => {
                grid.insert_with_key(key, entity);
                cell.0 = Some(key);
            }
        }
    }

    let neighbors: HashMap<Entity, Neighbor> = query
        .iter()
        .filter(|(_, _, _, render, ..)| !render.is_dying())
        .filter_map(|(e, _, slot, _, _, _, _, _, stats, _)| {
            stats.map(|s| {
                (
                    e,
                    Neighbor {
                        slot: slot.0,
                        radius: s.radius(),
                    },
                )
            })
        })
        .collect();

    // ------------------------------------------------------------------
    // Pass 2: steering and integration
    // ------------------------------------------------------------------
    for &(id, entity) in &order {
        let Ok((_, _, slot, mut render, mut knockback, _, mut depth, mut path, stats, combat)) =
            query.get_mut(entity)
        else {
            continue;
        };
        let Some(stats) = stats else {
            continue;
        };
        if render.is_dying() {
            continue;
        }

        let slot = slot.0;
        let pos = pool.position(slot);
        let mut desired = Vec2::ZERO;
        let mut path_driven = false;

        if let Some(impulse) = knockback.0 {
            pool.translate(slot, impulse * delta);
            let decayed = impulse * cfg.knockback_decay;
            if decayed.x.abs() + decayed.y.abs() < cfg.knockback_stop_threshold {
                knockback.0 = None;
                if render.state() == AnimationState::Hit {
                    render.set_state(AnimationState::Idle);
                }
            } else {
                knockback.0 = Some(decayed);
            }
        } else if let Some(path) = path.as_deref_mut() {
            if let Some(target) = path.target {
                let to_target = target - pos;
                let d2 = to_target.length_sq();
                if d2 < cfg.arrival_threshold_sq() {
                    if path.advance() {
                        tracing::trace!(
                            unit = id.0,
                            remaining = path.waypoints.len(),
                            "waypoint reached"
                        );
                    } else if render.state() == AnimationState::Walk {
                        render.set_state(AnimationState::Idle);
                    }
                } else {
                    desired = to_target * (stats.speed() / d2.sqrt());
                    path_driven = true;
                }
            }
        }

        let separation = separation_force(
            entity,
            pos,
            stats.radius(),
            combat.is_some_and(Combat::is_boss),
            &grid,
            &pool,
            &neighbors,
            &config,
        );

        let velocity = desired + separation;
        if velocity.length_sq() > cfg.min_velocity_sq {
            pool.translate(slot, velocity * delta);
            if path_driven {
                render.direction = direction_between(pos, pos + velocity);
                render.set_state(AnimationState::Walk);
            }
        }
        pool.set_velocity(slot, velocity);

        let moved = pool.position(slot);
        depth.0 = moved.x + moved.y;
    }
}

/// Sum of pushes away from overlapping neighbors.
///
/// The weight falls off linearly from 1 at contact to 0 at the combined
/// radius threshold. A boss multiplies its own push so it clears space
/// around itself faster than the squad crowds in.
#[allow(clippy::too_many_arguments)]
fn separation_force(
    entity: Entity,
    pos: Vec2,
    radius: f32,
    is_boss: bool,
    grid: &SpatialGrid,
    pool: &PositionPool,
    neighbors: &HashMap<Entity, Neighbor>,
    config: &SimConfig,
) -> Vec2 {
    let cfg = &config.movement;
    let reach = cfg.max_separation_dist;
    let multiplier = if is_boss {
        cfg.boss_separation_multiplier
    } else {
        1.0
    };

    let mut push = Vec2::ZERO;
    grid.for_each_in_box(
        pos.x - reach,
        pos.y - reach,
        pos.x + reach,
        pos.y + reach,
        |other| {
            if other == entity {
                return;
            }
            let Some(neighbor) = neighbors.get(&other) else {
                return;
            };
            let away = pos - pool.position(neighbor.slot);
            let d2 = away.length_sq();
            let threshold = (radius + neighbor.radius) * cfg.separation_overlap;
            if d2 < threshold * threshold && d2 > MIN_SEPARATION_DIST_SQ {
                let d = d2.sqrt();
                let weight = (threshold - d) / threshold;
                push += away * (weight * cfg.separation_strength * multiplier / d);
            }
        },
    );
    push
}

/// Copy pool positions back into the `Position` mirror.
pub fn position_readback_system(
    pool: Res<PositionPool>,
    mut query: Query<(&PoolIndex, &mut Position)>,
) {
    for (slot, mut pos) in query.iter_mut() {
        let p = pool.position(slot.0);
        if pos.x != p.x || pos.y != p.y {
            *pos = Position::from(p);
        }
    }
}
