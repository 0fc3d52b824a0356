//! Combat system - death transitions and attack/hit recovery.
//!
//! This system never deals damage itself. Attackers (currently only the
//! boss) mutate their victim through [`apply_strike`]; the combat pass then
//! notices health at zero on the next run and performs the one-way
//! transition into `Die`.

use crate::components::*;
use crate::config::SimConfig;
use crate::world::{SimClock, SimEvent, SimEvents};
use bevy_ecs::prelude::*;

/// A hit delivered by an attacker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub damage: f32,
    /// Knockback impulse in grid units per second.
    pub impulse: Vec2,
    /// Drop the victim's current path target.
    pub cancel_path: bool,
}

/// Apply a strike to a living victim. Returns false for dying victims.
///
/// Victims without stats still get the impulse but take no damage and keep
/// their animation.
pub fn apply_strike(
    strike: Strike,
    stats: Option<&mut Stats>,
    render: &mut Render,
    knockback: &mut Knockback,
    path: Option<&mut Path>,
) -> bool {
    if render.is_dying() {
        return false;
    }
    knockback.0 = Some(strike.impulse);
    if let Some(stats) = stats {
        stats.damage(strike.damage);
        render.set_state(AnimationState::Hit);
        if strike.cancel_path {
            if let Some(path) = path {
                path.cancel();
            }
        }
    }
    true
}

/// Detect deaths and revert finished attack/hit animations.
pub fn combat_system(
    mut commands: Commands,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    mut events: ResMut<SimEvents>,
    mut query: Query<(Entity, &UnitId, &Stats, &mut Render)>,
) {
    let now = clock.now_ms;

    let mut order: Vec<(UnitId, Entity)> = query.iter().map(|(e, id, ..)| (*id, e)).collect();
    order.sort_unstable_by_key(|(id, _)| *id);

    for (id, entity) in order {
        let Ok((_, _, stats, mut render)) = query.get_mut(entity) else {
            continue;
        };
        if render.is_dying() {
            continue;
        }

        if !stats.is_alive() {
            render.begin_death(now);
            commands.entity(entity).remove::<(Path, Combat)>();
            events.push(SimEvent::Died { unit: id, at_ms: now });
            tracing::info!(unit = id.0, unit_type = ?stats.unit_type, "unit died");
            continue;
        }

        let recovery = match render.state() {
            AnimationState::Hit => config.combat.hit_recovery_ms,
            AnimationState::Attack => config.combat.attack_recovery_ms,
            _ => continue,
        };
        if now - render.last_frame_update_ms > recovery {
            let last = render.unit_type.asset().last_frame(render.state());
            if render.frame == last {
                render.set_state(AnimationState::Idle);
            }
        }
    }
}
