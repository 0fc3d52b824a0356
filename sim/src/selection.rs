//! Screen-space selection: drag rectangles, point picks and type selects.
//!
//! Hit boxes are asymmetric around a unit's screen anchor: taller above the
//! anchor than below, since sprites are drawn upward from their feet. The
//! boss and dying units can never be selected.
//!
//! Everything here runs between ticks on behalf of the input layer and
//! writes only `Render::selected`.

use crate::archetype::UnitType;
use crate::components::*;
use crate::config::{SelectionConfig, SimConfig};
use crate::iso::grid_to_screen;
use crate::world::{Camera, ScreenRect};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Keyboard modifiers held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl or Cmd.
    pub ctrl: bool,
}

/// Screen-space hit box `(min, max)` for an anchor.
pub fn hit_box(anchor: Vec2, cfg: &SelectionConfig) -> (Vec2, Vec2) {
    (
        Vec2::new(anchor.x - cfg.hitbox_half_width, anchor.y + cfg.hitbox_top),
        Vec2::new(anchor.x + cfg.hitbox_half_width, anchor.y + cfg.hitbox_bottom),
    )
}

/// Whether a unit's hit box overlaps the drag rectangle. Touching counts.
pub fn hit_box_intersects(anchor: Vec2, rect: &ScreenRect, cfg: &SelectionConfig) -> bool {
    let (lo, hi) = hit_box(anchor, cfg);
    let (r_lo, r_hi) = rect.normalized();
    !(hi.x < r_lo.x || lo.x > r_hi.x || hi.y < r_lo.y || lo.y > r_hi.y)
}

/// Squared pick distance from a click to a unit, or `None` when the click
/// is outside the unit's hit box. Distance is measured to a point above
/// the anchor so clicks on the sprite's body rank best.
pub fn pick_distance_sq(anchor: Vec2, click: Vec2, cfg: &SelectionConfig) -> Option<f32> {
    let dx = click.x - anchor.x;
    let dy = click.y - anchor.y;
    if dx.abs() <= cfg.hitbox_half_width && dy >= cfg.hitbox_top && dy <= cfg.hitbox_bottom {
        let cy = dy + cfg.hitbox_center_offset;
        Some(dx * dx + cy * cy)
    } else {
        None
    }
}

/// Remembers the previous click to detect double clicks.
#[derive(Resource, Debug, Clone, Default)]
pub struct ClickTracker {
    last_click_ms: Option<f64>,
    last_picked: Option<Entity>,
}

impl ClickTracker {
    /// Record a click. Returns true when it completes a double click on the
    /// same entity within `window_ms`.
    pub fn register(&mut self, picked: Option<Entity>, at_ms: f64, window_ms: f64) -> bool {
        let is_double = picked.is_some()
            && picked == self.last_picked
            && self.last_click_ms.is_some_and(|t| at_ms - t < window_ms);
        self.last_click_ms = Some(at_ms);
        self.last_picked = picked;
        is_double
    }
}

/// One entity as the selection code sees it.
#[derive(Debug, Clone, Copy)]
struct Selectable {
    entity: Entity,
    unit_type: Option<UnitType>,
    anchor: Vec2,
    /// Alive and not the boss.
    eligible: bool,
}

fn selectables(world: &mut World) -> Vec<Selectable> {
    let camera = world.get_resource::<Camera>().copied().unwrap_or_default().0;
    let proj = world
        .get_resource::<SimConfig>()
        .map(|c| c.projection)
        .unwrap_or_default();

    let mut query = world.query::<(
        Entity,
        &UnitId,
        &Position,
        &Render,
        Option<&Stats>,
        Option<&Combat>,
    )>();
    let mut out: Vec<(UnitId, Selectable)> = query
        .iter(world)
        .map(|(entity, id, pos, render, stats, combat)| {
            (
                *id,
                Selectable {
                    entity,
                    unit_type: stats.map(|s| s.unit_type),
                    anchor: grid_to_screen(pos.vec(), camera, &proj),
                    eligible: !render.is_dying() && !combat.is_some_and(Combat::is_boss),
                },
            )
        })
        .collect();
    out.sort_unstable_by_key(|(id, _)| *id);
    out.into_iter().map(|(_, s)| s).collect()
}

fn selection_config(world: &World) -> SelectionConfig {
    world
        .get_resource::<SimConfig>()
        .map(|c| c.selection.clone())
        .unwrap_or_default()
}

fn set_selected(world: &mut World, entity: Entity, selected: bool) {
    if let Some(mut render) = world.get_mut::<Render>(entity) {
        if render.selected != selected {
            render.selected = selected;
        }
    }
}

/// Apply a drag rectangle. Additive mode only ever turns selection on.
pub fn select_in_rect(world: &mut World, rect: &ScreenRect, additive: bool) {
    let cfg = selection_config(world);
    for s in selectables(world) {
        if !s.eligible {
            continue;
        }
        let inside = hit_box_intersects(s.anchor, rect, &cfg);
        if additive {
            if inside {
                set_selected(world, s.entity, true);
            }
        } else {
            set_selected(world, s.entity, inside);
        }
    }
}

/// Nearest eligible unit under a click. The boss and dying units are never
/// picked. Exact ties keep the lower id.
pub fn pick(world: &mut World, click: Vec2) -> Option<Entity> {
    let cfg = selection_config(world);
    let mut best = cfg.pick_max_dist_sq;
    let mut picked = None;
    for s in selectables(world).into_iter().filter(|s| s.eligible) {
        if let Some(d) = pick_distance_sq(s.anchor, click, &cfg) {
            if d < best {
                best = d;
                picked = Some(s.entity);
            }
        }
    }
    picked
}

/// Select every living unit of `unit_type`. Others are deselected unless
/// `additive`.
pub fn select_type(world: &mut World, unit_type: UnitType, additive: bool) {
    for s in selectables(world) {
        if s.eligible && s.unit_type == Some(unit_type) {
            set_selected(world, s.entity, true);
        } else if !additive {
            set_selected(world, s.entity, false);
        }
    }
}

/// Select exactly `entity`, or nothing.
pub fn select_only(world: &mut World, entity: Option<Entity>) {
    for s in selectables(world) {
        set_selected(world, s.entity, Some(s.entity) == entity);
    }
}

/// Flip one entity's selection.
pub fn toggle(world: &mut World, entity: Entity) {
    if let Some(mut render) = world.get_mut::<Render>(entity) {
        render.selected = !render.selected;
    }
}

/// Resolve a click (a drag shorter than the drag threshold).
///
/// Double click or ctrl selects the picked unit's whole archetype; shift
/// toggles the picked unit; a plain click selects only it.
pub fn click(world: &mut World, picked: Option<Entity>, modifiers: Modifiers, double: bool) {
    match picked {
        Some(entity) if double || modifiers.ctrl => {
            let unit_type = world.get::<Stats>(entity).map(|s| s.unit_type);
            if let Some(unit_type) = unit_type {
                tracing::debug!(?unit_type, additive = modifiers.shift, "select archetype");
                select_type(world, unit_type, modifiers.shift);
            }
        }
        Some(entity) if modifiers.shift => toggle(world, entity),
        None if modifiers.shift => {}
        _ => select_only(world, picked),
    }
}

/// Entities currently selected, ordered by id.
pub fn selected_entities(world: &mut World) -> Vec<Entity> {
    let mut query = world.query::<(Entity, &UnitId, &Render)>();
    let mut selected: Vec<(UnitId, Entity)> = query
        .iter(world)
        .filter(|(_, _, r)| r.selected)
        .map(|(e, id, _)| (*id, e))
        .collect();
    selected.sort_unstable_by_key(|(id, _)| *id);
    selected.into_iter().map(|(_, e)| e).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(units: &[(u32, UnitType, Vec2)]) -> (World, Vec<Entity>) {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(Camera(Vec2::new(400.0, 0.0)));
        let entities = units
            .iter()
            .map(|&(id, t, pos)| world.spawn(UnitBundle::new(id, t, id as usize, pos, 0.0)).id())
            .collect();
        (world, entities)
    }

    fn anchor(world: &World, e: Entity) -> Vec2 {
        let camera = world.resource::<Camera>().0;
        let pos = world.get::<Position>(e).unwrap().vec();
        grid_to_screen(pos, camera, &world.resource::<SimConfig>().projection)
    }

    fn is_selected(world: &World, e: Entity) -> bool {
        world.get::<Render>(e).unwrap().selected
    }

    #[test]
    fn test_hit_box_is_taller_above_anchor() {
        let cfg = SelectionConfig::default();
        let a = Vec2::new(100.0, 100.0);
        assert!(pick_distance_sq(a, Vec2::new(100.0, 35.0), &cfg).is_some());
        assert!(pick_distance_sq(a, Vec2::new(100.0, 115.0), &cfg).is_some());
        assert!(pick_distance_sq(a, Vec2::new(100.0, 120.0), &cfg).is_none());
        assert!(pick_distance_sq(a, Vec2::new(126.0, 100.0), &cfg).is_none());
        // Best spot is 25px above the anchor.
        assert_eq!(pick_distance_sq(a, Vec2::new(100.0, 75.0), &cfg), Some(0.0));
    }

    #[test]
    fn test_rect_replace_and_additive() {
        let (mut world, es) = world_with(&[
            (1, UnitType::Scout, Vec2::new(2.0, 2.0)),
            (2, UnitType::Warrior, Vec2::new(10.0, 10.0)),
            (3, UnitType::BossOverseer, Vec2::new(2.2, 2.2)),
        ]);
        let a0 = anchor(&world, es[0]);
        let rect = ScreenRect {
            start: Vec2::new(a0.x - 5.0, a0.y - 5.0),
            end: Vec2::new(a0.x + 5.0, a0.y + 5.0),
        };

        set_selected(&mut world, es[1], true);
        select_in_rect(&mut world, &rect, true);
        assert!(is_selected(&world, es[0]));
        assert!(is_selected(&world, es[1]), "additive never deselects");
        assert!(!is_selected(&world, es[2]), "boss is never selected");

        select_in_rect(&mut world, &rect, false);
        assert!(is_selected(&world, es[0]));
        assert!(!is_selected(&world, es[1]));
    }

    #[test]
    fn test_dragging_backwards_selects_the_same_units() {
        let (mut world, es) = world_with(&[(1, UnitType::Scout, Vec2::new(3.0, 3.0))]);
        let a = anchor(&world, es[0]);
        let rect = ScreenRect {
            start: Vec2::new(a.x + 30.0, a.y + 30.0),
            end: Vec2::new(a.x - 30.0, a.y - 30.0),
        };
        select_in_rect(&mut world, &rect, false);
        assert!(is_selected(&world, es[0]));
    }

    #[test]
    fn test_pick_prefers_nearest_and_skips_dead() {
        let (mut world, es) = world_with(&[
            (1, UnitType::Scout, Vec2::new(5.0, 5.0)),
            (2, UnitType::Mage, Vec2::new(5.1, 5.1)),
        ]);
        let a1 = anchor(&world, es[1]);
        let click_at = Vec2::new(a1.x, a1.y - 25.0);
        assert_eq!(pick(&mut world, click_at), Some(es[1]));

        world.get_mut::<Render>(es[1]).unwrap().begin_death(0.0);
        assert_eq!(pick(&mut world, click_at), Some(es[0]));
        assert_eq!(pick(&mut world, Vec2::new(-5000.0, -5000.0)), None);
    }

    #[test]
    fn test_click_modes() {
        let (mut world, es) = world_with(&[
            (1, UnitType::Scout, Vec2::new(2.0, 2.0)),
            (2, UnitType::Warrior, Vec2::new(6.0, 2.0)),
            (3, UnitType::Scout, Vec2::new(10.0, 2.0)),
            (4, UnitType::Scout, Vec2::new(14.0, 2.0)),
        ]);
        world.get_mut::<Render>(es[3]).unwrap().begin_death(0.0);

        click(&mut world, Some(es[0]), Modifiers::default(), false);
        assert_eq!(selected_entities(&mut world), vec![es[0]]);

        click(&mut world, Some(es[1]), Modifiers { shift: true, ctrl: false }, false);
        assert_eq!(selected_entities(&mut world), vec![es[0], es[1]]);
        click(&mut world, Some(es[0]), Modifiers { shift: true, ctrl: false }, false);
        assert_eq!(selected_entities(&mut world), vec![es[1]]);

        click(&mut world, Some(es[0]), Modifiers::default(), true);
        assert_eq!(selected_entities(&mut world), vec![es[0], es[2]]);

        click(&mut world, Some(es[1]), Modifiers { shift: true, ctrl: true }, false);
        assert_eq!(selected_entities(&mut world), vec![es[0], es[1], es[2]]);

        click(&mut world, None, Modifiers::default(), false);
        assert!(selected_entities(&mut world).is_empty());
    }

    #[test]
    fn test_double_click_window() {
        let mut tracker = ClickTracker::default();
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        assert!(!tracker.register(Some(a), 0.0, 300.0));
        assert!(tracker.register(Some(a), 200.0, 300.0));
        assert!(!tracker.register(Some(b), 250.0, 300.0));
        assert!(!tracker.register(Some(b), 600.0, 300.0));
        assert!(!tracker.register(None, 650.0, 300.0));
        assert!(!tracker.register(None, 700.0, 300.0));
    }
}
