//! Boss ability system - targeting, taunts, the telegraphed blast and melee.
//!
//! Each concern is an independent per-tick check rather than one state
//! machine, so taunts and retargeting keep running while the blast winds up.
//! Every check re-validates its own preconditions.
//!
//! Order per boss and tick:
//! 1. retarget when the target is gone or the refresh interval elapsed
//! 2. roll for a taunt, or clear an expired one
//! 3. start the blast windup when a unit is inside the shove radius
//! 4. resolve the blast once the windup has expired
//! 5. chase or strike the current target when not charging

use crate::components::*;
use crate::config::{BossConfig, SimConfig};
use crate::iso::direction_between;
use crate::spatial::SpatialGrid;
use crate::systems::combat::{apply_strike, Strike};
use crate::world::{Overlays, SimClock, SimEvent, SimEvents, SimRng};
use bevy_ecs::prelude::*;
use rand::Rng;
use std::collections::HashMap;

/// Taunts picked uniformly at random.
pub const HECKLES: [&str; 8] = [
    "MOVE IT, MAGGOT!",
    "PATHETIC FORMATION!",
    "MY GRANDMA MOVES FASTER!",
    "GET OUT OF MY GRID!",
    "LOVELY TARGET PRACTICE!",
    "WASTE OF ETHER!",
    "COWER BEFORE ME!",
    "ZOG REIGNS SUPREME!",
];

/// Shouted when the blast starts charging.
pub const WINDUP_SHOUT: &str = "GET BACK!";

/// Stand-in distance for a victim standing exactly on the boss.
const ZERO_DIST_FALLBACK: f32 = 0.1;

/// Read-only view of one entity for the boss's decisions.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: UnitId,
    entity: Entity,
    pos: Vec2,
    alive: bool,
    is_boss: bool,
    has_stats: bool,
}

type BossQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static UnitId,
        &'static Position,
        &'static mut Render,
        &'static mut Knockback,
        Option<&'static mut Stats>,
        Option<&'static mut Path>,
        Option<&'static mut Combat>,
    ),
>;

/// Drive every living boss. Victim effects are applied after the boss's own
/// state is settled.
pub fn boss_ability_system(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    grid: Res<SpatialGrid>,
    mut overlays: ResMut<Overlays>,
    mut events: ResMut<SimEvents>,
    mut rng: ResMut<SimRng>,
    mut query: BossQuery,
) {
    let now = clock.now_ms;
    let cfg = &config.boss;

    let mut roster: Vec<Candidate> = query
        .iter()
        .map(|(entity, id, pos, render, _, stats, _, combat)| Candidate {
            id: *id,
            entity,
            pos: pos.vec(),
            alive: !render.is_dying(),
            is_boss: combat.is_some_and(|c| c.is_boss()),
            has_stats: stats.is_some(),
        })
        .collect();
    roster.sort_unstable_by_key(|c| c.id);
    let by_entity: HashMap<Entity, Candidate> = roster.iter().map(|c| (c.entity, *c)).collect();

    let bosses: Vec<Candidate> = roster.iter().filter(|c| c.is_boss && c.alive).copied().collect();

    for boss in bosses {
        let mut strikes: Vec<(Entity, Strike)> = Vec::new();

        {
            let Ok((_, _, _, mut render, _, Some(mut stats), mut path, Some(mut combat))) =
                query.get_mut(boss.entity)
            else {
                continue;
            };
            let combat = &mut *combat;
            let CombatRole::Boss(state) = &mut combat.role else {
                continue;
            };

            // 1. Targeting
            let target_valid = combat
                .target
                .and_then(|t| by_entity.get(&t))
                .is_some_and(|c| c.alive);
            let refresh_due = state
                .last_target_refresh_ms
                .map_or(true, |t| now - t >= cfg.target_refresh_ms);
            if !target_valid || refresh_due {
                combat.target = nearest_target(&roster, boss, combat.aggro_radius);
                state.last_target_refresh_ms = Some(now);
            }

            // 2. Heckling
            let heckle_age = render.heckle.as_ref().map(|h| now - h.at_ms);
            match heckle_age {
                None => roll_heckle(&mut render, &mut rng, &mut events, boss.id, cfg, now),
                Some(age) if age > cfg.heckle_cooldown_ms => {
                    roll_heckle(&mut render, &mut rng, &mut events, boss.id, cfg, now)
                }
                Some(age) if age > cfg.heckle_display_ms => render.heckle = None,
                Some(_) => {}
            }

            // 3. Blast trigger
            if !state.is_charging() && now - state.last_special_ms > cfg.special_cooldown_ms {
                let in_reach = blast_victims(&grid, &by_entity, boss.pos, cfg.shove_radius);
                if !in_reach.is_empty() {
                    state.windup_end_ms = Some(now + cfg.windup_ms);
                    render.set_state(AnimationState::Special);
                    render.show_heckle(WINDUP_SHOUT, now);
                    if let Some(path) = path.as_deref_mut() {
                        path.cancel();
                    }
                    events.push(SimEvent::SpecialCharged { boss: boss.id, at_ms: now });
                    tracing::info!(
                        boss = boss.id.0,
                        in_reach = in_reach.len(),
                        "boss special charging"
                    );
                }
            }

            // 4. Blast resolution
            if let Some(end) = state.windup_end_ms {
                if now >= end {
                    state.windup_end_ms = None;
                    state.last_special_ms = now;
                    overlays.screen_shake = Some(cfg.screen_shake_impact);

                    let victims = blast_victims(&grid, &by_entity, boss.pos, cfg.shove_radius);
                    for victim in &victims {
                        strikes.push((victim.entity, blast_strike(boss.pos, victim.pos, cfg)));
                    }
                    let ids: Vec<UnitId> = victims.iter().map(|v| v.id).collect();
                    tracing::info!(boss = boss.id.0, victims = ids.len(), "boss special blast");
                    events.push(SimEvent::SpecialBlast {
                        boss: boss.id,
                        victims: ids,
                        at_ms: now,
                    });
                }
            }

            // 5. Melee
            let target = combat.target.and_then(|t| by_entity.get(&t)).copied();
            if let (Some(target), false) = (target, state.is_charging()) {
                let offset = target.pos - boss.pos;
                let dist = offset.length();
                if dist > stats.template.attack_range * cfg.engage_fraction {
                    if let Some(path) = path.as_deref_mut() {
                        path.set_target(target.pos);
                    }
                } else {
                    if let Some(path) = path.as_deref_mut() {
                        path.cancel();
                    }
                    if stats.attack_ready(now) {
                        render.set_state(AnimationState::Attack);
                        stats.last_attack_ms = now;
                        render.direction = direction_between(boss.pos, target.pos);

                        if target.has_stats {
                            let dist = if dist > 0.0 { dist } else { ZERO_DIST_FALLBACK };
                            strikes.push((
                                target.entity,
                                Strike {
                                    damage: stats.template.attack_damage,
                                    impulse: offset * (cfg.melee_knockback / dist),
                                    cancel_path: false,
                                },
                            ));
                            events.push(SimEvent::MeleeHit {
                                boss: boss.id,
                                target: target.id,
                                damage: stats.template.attack_damage,
                            });
                        }
                    }
                }
            }
        }

        for (victim, strike) in strikes {
            let Ok((_, _, _, mut render, mut knockback, mut stats, mut path, _)) =
                query.get_mut(victim)
            else {
                continue;
            };
            apply_strike(
                strike,
                stats.as_deref_mut(),
                &mut render,
                &mut knockback,
                path.as_deref_mut(),
            );
        }
    }
}

/// Nearest living non-self entity strictly inside `aggro_radius`.
/// Ties keep the lower id.
fn nearest_target(roster: &[Candidate], boss: Candidate, aggro_radius: f32) -> Option<Entity> {
    let aggro_sq = aggro_radius * aggro_radius;
    let mut best: Option<(f32, Entity)> = None;
    for c in roster {
        if c.entity == boss.entity || !c.alive {
            continue;
        }
        let d2 = c.pos.distance_sq(boss.pos);
        if d2 < aggro_sq && best.map_or(true, |(b, _)| d2 < b) {
            best = Some((d2, c.entity));
        }
    }
    best.map(|(_, e)| e)
}

/// Living non-boss entities within `radius` of `center`, ordered by id.
///
/// The grid is queried with a one-cell margin because cell keys are only
/// refreshed by the movement pass; the exact distance check does the rest.
fn blast_victims(
    grid: &SpatialGrid,
    by_entity: &HashMap<Entity, Candidate>,
    center: Vec2,
    radius: f32,
) -> Vec<Candidate> {
    let mut victims: Vec<Candidate> = grid
        .query_radius(center, radius + grid.cell_size)
        .into_iter()
        .filter_map(|e| by_entity.get(&e).copied())
        .filter(|c| c.alive && !c.is_boss && c.pos.distance_sq(center) <= radius * radius)
        .collect();
    victims.sort_unstable_by_key(|c| c.id);
    victims.dedup_by_key(|c| c.id);
    victims
}

/// Knockback falls off as `force / (distance + epsilon)`, pointing away.
fn blast_strike(center: Vec2, victim: Vec2, cfg: &BossConfig) -> Strike {
    let offset = victim - center;
    let dist = match offset.length() {
        d if d > 0.0 => d,
        _ => ZERO_DIST_FALLBACK,
    };
    let force = cfg.blast_force / (dist + cfg.blast_epsilon);
    Strike {
        damage: cfg.blast_damage,
        impulse: offset * (force / dist),
        cancel_path: true,
    }
}

fn roll_heckle(
    render: &mut Render,
    rng: &mut SimRng,
    events: &mut SimEvents,
    unit: UnitId,
    cfg: &BossConfig,
    now: f64,
) {
    if rng.0.gen_bool(cfg.heckle_chance) {
        let text = HECKLES[rng.0.gen_range(0..HECKLES.len())];
        render.show_heckle(text, now);
        events.push(SimEvent::Heckle { unit, text });
        tracing::debug!(boss = unit.0, text, "boss heckle");
    }
}
