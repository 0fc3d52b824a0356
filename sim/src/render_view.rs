//! Read-only view of the world for the drawing layer.
//!
//! The renderer never touches components. It asks for a culled, depth
//! sorted draw list and reads overlays; the one write it is allowed is
//! decaying the screen shake.

use crate::archetype::UnitType;
use crate::components::*;
use crate::config::{ProjectionConfig, RenderConfig, SimConfig};
use crate::iso::{grid_to_screen, screen_to_grid};
use crate::spatial::SpatialGrid;
use crate::world::{Camera, MoveIndicator, Overlays, SimClock};
use bevy_ecs::prelude::*;
use std::collections::HashSet;

/// Size of the visible canvas in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Everything needed to draw one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub entity: Entity,
    pub id: UnitId,
    pub unit_type: UnitType,
    /// Screen anchor in pixels.
    pub screen: Vec2,
    pub depth: f32,
    pub state: AnimationState,
    pub direction: Direction,
    pub frame: u32,
    pub selected: bool,
    /// 1 while alive, fading to 0 over the death duration.
    pub alpha: f32,
    pub heckle: Option<&'static str>,
    /// `health / max_health`, for units with stats.
    pub health_fraction: Option<f32>,
}

/// Grid-space box covering the viewport, padded by `padding` tiles.
pub fn visible_bounds(
    viewport: Viewport,
    camera: Vec2,
    proj: &ProjectionConfig,
    padding: f32,
) -> (Vec2, Vec2) {
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(viewport.width, 0.0),
        Vec2::new(0.0, viewport.height),
        Vec2::new(viewport.width, viewport.height),
    ]
    .map(|c| screen_to_grid(c, camera, proj));

    let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
    let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for c in corners {
        min = Vec2::new(min.x.min(c.x), min.y.min(c.y));
        max = Vec2::new(max.x.max(c.x), max.y.max(c.y));
    }
    (
        Vec2::new(min.x - padding, min.y - padding),
        Vec2::new(max.x + padding, max.y + padding),
    )
}

/// Opacity of a dying unit `elapsed` ms after death.
pub fn death_alpha(death_ms: Option<f64>, now_ms: f64, cfg: &RenderConfig) -> f32 {
    match death_ms {
        None => 1.0,
        Some(t) => (1.0 - (now_ms - t) / cfg.death_duration_ms).clamp(0.0, 1.0) as f32,
    }
}

/// Progress `0..1` of the move indicator animation, or `None` once expired.
pub fn move_indicator_progress(
    indicator: Option<&MoveIndicator>,
    now_ms: f64,
    cfg: &RenderConfig,
) -> Option<f32> {
    let indicator = indicator?;
    let elapsed = now_ms - indicator.at_ms;
    (elapsed < cfg.move_indicator_ms).then(|| (elapsed / cfg.move_indicator_ms).max(0.0) as f32)
}

/// Shake magnitude to use for this frame, decaying the stored value.
pub fn decay_screen_shake(overlays: &mut Overlays, cfg: &RenderConfig) -> Option<f32> {
    let current = overlays.screen_shake?;
    let next = current * cfg.screen_shake_decay;
    overlays.screen_shake = (next >= cfg.screen_shake_floor).then_some(next);
    Some(current)
}

/// Culled, depth-sorted draw list for the current frame.
///
/// Living units come from the spatial grid. Dying units have left the grid,
/// so they are bounds-checked directly until their fade completes.
pub fn draw_list(world: &mut World, viewport: Viewport) -> Vec<DrawItem> {
    let camera = world.get_resource::<Camera>().copied().unwrap_or_default().0;
    let now = world.get_resource::<SimClock>().map(|c| c.now_ms).unwrap_or(0.0);
    let (proj, render_cfg) = world
        .get_resource::<SimConfig>()
        .map(|c| (c.projection, c.render.clone()))
        .unwrap_or_default();

    let (min, max) = visible_bounds(viewport, camera, &proj, render_cfg.cull_padding);

    let mut seen: HashSet<Entity> = HashSet::new();
    let mut visible: Vec<Entity> = Vec::new();
    if let Some(grid) = world.get_resource::<SpatialGrid>() {
        grid.for_each_in_box(min.x, min.y, max.x, max.y, |e| {
            if seen.insert(e) {
                visible.push(e);
            }
        });
    }

    let mut query = world.query::<(
        Entity,
        &UnitId,
        &Position,
        &Render,
        &SortDepth,
        Option<&Stats>,
    )>();

    let fading = query
        .iter(world)
        .filter(|(_, _, pos, render, ..)| {
            render.is_dying()
                && death_alpha(render.death_ms, now, &render_cfg) > 0.0
                && pos.x >= min.x
                && pos.x <= max.x
                && pos.y >= min.y
                && pos.y <= max.y
        })
        .map(|(e, ..)| e)
        .collect::<Vec<_>>();
    for e in fading {
        if seen.insert(e) {
            visible.push(e);
        }
    }

    let mut items: Vec<DrawItem> = visible
        .into_iter()
        .filter_map(|e| query.get(world, e).ok())
        .map(|(entity, id, pos, render, depth, stats)| DrawItem {
            entity,
            id: *id,
            unit_type: render.unit_type,
            screen: grid_to_screen(pos.vec(), camera, &proj),
            depth: depth.0,
            state: render.state(),
            direction: render.direction,
            frame: render.frame,
            selected: render.selected,
            alpha: death_alpha(render.death_ms, now, &render_cfg),
            heckle: render.heckle.as_ref().map(|h| h.text),
            health_fraction: stats.map(|s| (s.health / s.max_health()).clamp(0.0, 1.0)),
        })
        .collect();

    items.sort_by(|a, b| a.depth.total_cmp(&b.depth).then(a.id.cmp(&b.id)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with(units: &[(u32, Vec2)]) -> (World, Vec<Entity>) {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimClock::default());
        world.insert_resource(Camera(Vec2::new(640.0, 50.0)));
        let mut grid = SpatialGrid::default();
        let mut es = Vec::new();
        for &(id, pos) in units {
            let e = world
                .spawn(UnitBundle::new(id, UnitType::Scout, id as usize, pos, 0.0))
                .id();
            grid.insert(pos.x, pos.y, e);
            es.push(e);
        }
        world.insert_resource(grid);
        (world, es)
    }

    #[test]
    fn test_draw_list_culls_and_sorts_by_depth() {
        let (mut world, es) = world_with(&[
            (1, Vec2::new(8.0, 8.0)),
            (2, Vec2::new(2.0, 3.0)),
            (3, Vec2::new(300.0, 300.0)),
        ]);
        let list = draw_list(&mut world, Viewport { width: 1280.0, height: 720.0 });
        let ids: Vec<_> = list.iter().map(|d| d.entity).collect();
        assert_eq!(ids, vec![es[1], es[0]]);
        assert!(list.iter().all(|d| d.alpha == 1.0));
    }

    #[test]
    fn test_dying_units_fade_out_of_the_list() {
        let (mut world, es) = world_with(&[(1, Vec2::new(4.0, 4.0))]);
        world.get_mut::<Render>(es[0]).unwrap().begin_death(0.0);
        {
            let mut grid = world.resource_mut::<SpatialGrid>();
            let key = grid.key(4.0, 4.0);
            grid.remove_by_key(key, es[0]);
        }

        world.resource_mut::<SimClock>().now_ms = 1500.0;
        let list = draw_list(&mut world, Viewport { width: 1280.0, height: 720.0 });
        assert_eq!(list.len(), 1);
        assert!((list[0].alpha - 0.5).abs() < 1e-6);

        world.resource_mut::<SimClock>().now_ms = 3000.0;
        assert!(draw_list(&mut world, Viewport { width: 1280.0, height: 720.0 }).is_empty());
    }

    #[test]
    fn test_screen_shake_decays_then_clears() {
        let cfg = RenderConfig::default();
        let mut overlays = Overlays {
            screen_shake: Some(18.0),
            ..Default::default()
        };
        assert_eq!(decay_screen_shake(&mut overlays, &cfg), Some(18.0));
        assert!((overlays.screen_shake.unwrap() - 16.2).abs() < 1e-4);

        let mut frames = 1;
        while decay_screen_shake(&mut overlays, &cfg).is_some() {
            frames += 1;
        }
        assert!(overlays.screen_shake.is_none());
        // 18 * 0.9^n < 0.5 first holds at n = 35.
        assert_eq!(frames, 35);
    }

    #[test]
    fn test_move_indicator_lifetime() {
        let cfg = RenderConfig::default();
        let marker = MoveIndicator {
            pos: Vec2::new(1.0, 1.0),
            at_ms: 1000.0,
        };
        assert_eq!(move_indicator_progress(Some(&marker), 1250.0, &cfg), Some(0.5));
        assert_eq!(move_indicator_progress(Some(&marker), 1500.0, &cfg), None);
        assert_eq!(move_indicator_progress(None, 1250.0, &cfg), None);
    }

    #[test]
    fn test_bounds_cover_viewport_corners() {
        let proj = ProjectionConfig::default();
        let camera = Vec2::new(640.0, 50.0);
        let viewport = Viewport {
            width: 1280.0,
            height: 720.0,
        };
        let (min, max) = visible_bounds(viewport, camera, &proj, 3.0);
        for corner in [Vec2::new(0.0, 0.0), Vec2::new(1280.0, 720.0)] {
            let g = screen_to_grid(corner, camera, &proj);
            assert!(g.x > min.x && g.x < max.x && g.y > min.y && g.y < max.y);
        }
    }
}
