//! Public API for the simulation.
//!
//! This module provides the main interface for a host (renderer, input
//! layer, test harness) to drive the simulation.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 60 Hz). When
//! `step(dt)` is called, the frame delta is clamped, accumulated, and as many
//! fixed ticks as fit are run. `tick(dt)` runs exactly one tick for hosts
//! that own their clock.
//!
//! ## Input
//!
//! Input never touches the world during a tick. Hosts either call the
//! command methods directly or queue [`Intent`]s and hand them to
//! `apply_intents` between steps.

use crate::archetype::UnitType;
use crate::components::*;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::formation::{assign_formation, FormationPlan};
use crate::intents::Intent;
use crate::iso::screen_to_grid;
use crate::pool::PositionPool;
use crate::render_view::{self, DrawItem, Viewport};
use crate::selection::{self, ClickTracker, Modifiers};
use crate::spatial::SpatialGrid;
use crate::systems::*;
use crate::tiles::TileGrid;
use crate::world::*;
use bevy_ecs::prelude::*;
use tracing::{debug, warn};

/// Id given to the boss in the default roster.
pub const BOSS_ID: u32 = 100;

/// Squad size of the default roster.
const ROSTER_SIZE: u32 = 16;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Initializing the simulation
/// - Stepping the simulation forward
/// - Extracting state snapshots and draw lists
/// - Issuing commands
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
    ui_sync: UiSyncTimer,
}

impl SimWorld {
    /// Create a new empty simulation world with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a new empty simulation world with custom configuration.
    pub fn with_config(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a world populated with the default squad and the boss.
    pub fn with_default_roster(config: SimConfig) -> SimResult<Self> {
        let mut sim = Self::with_config(config)?;
        sim.spawn_default_roster()?;
        Ok(sim)
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        let mut rng = SimRng::seeded(config.world.seed);
        let tiles = TileGrid::generate(config.world.world_size, &mut rng.0);

        world.insert_resource(DeltaTime(config.world.fixed_timestep));
        world.insert_resource(SimClock::default());
        world.insert_resource(SpatialGrid::new(config.grid.cell_size, config.grid.key_bias));
        world.insert_resource(PositionPool::new(config.world.max_entities));
        // Hosts usually recenter x to half the viewport width.
        world.insert_resource(Camera(Vec2::new(0.0, 50.0)));
        world.insert_resource(Overlays::default());
        world.insert_resource(SimEvents::default());
        world.insert_resource(ClickTracker::default());
        world.insert_resource(tiles);
        world.insert_resource(rng);

        let ui_sync = UiSyncTimer::new(config.world.ui_sync_interval_ms);
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                boss_ability_system,
                movement_system,
                combat_system,
                animation_system,
                position_readback_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            time_accumulator: 0.0,
            ui_sync,
        }
    }

    /// Spawn the 4x4 squad cycling through the playable archetypes, plus the
    /// boss at (16, 16).
    pub fn spawn_default_roster(&mut self) -> SimResult<()> {
        for i in 0..ROSTER_SIZE {
            let pos = Vec2::new(4.0 + (i / 4) as f32 * 2.5, 4.0 + (i % 4) as f32 * 2.5);
            let unit_type = UnitType::SQUAD[i as usize % UnitType::SQUAD.len()];
            self.spawn_unit(i, unit_type, pos)?;
        }
        self.spawn_unit(BOSS_ID, UnitType::BossOverseer, Vec2::new(16.0, 16.0))?;
        Ok(())
    }

    /// Spawn one unit with a fresh pool slot.
    pub fn spawn_unit(&mut self, id: u32, unit_type: UnitType, pos: Vec2) -> SimResult<Entity> {
        if self.find_entity(id).is_some() {
            return Err(SimError::DuplicateUnit(id));
        }
        let slot = self.world.resource_mut::<PositionPool>().allocate(pos)?;
        let now = self.world.resource::<SimClock>().now_ms;
        let entity = self
            .world
            .spawn(UnitBundle::new(id, unit_type, slot, pos, now))
            .id();
        debug!(unit = id, ?unit_type, slot, x = pos.x, y = pos.y, "spawned unit");
        Ok(entity)
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Step the simulation forward by a frame of `dt` seconds.
    ///
    /// The delta is clamped to `max_frame_dt` so a stalled host cannot
    /// trigger a burst of catch-up ticks. Returns the number of fixed ticks
    /// that ran.
    pub fn step(&mut self, dt: f32) -> u32 {
        let (fixed_dt, max_dt) = {
            let cfg = &self.world.resource::<SimConfig>().world;
            (cfg.fixed_timestep, cfg.max_frame_dt)
        };

        self.time_accumulator += dt.clamp(0.0, max_dt);

        let mut ticks = 0;
        while self.time_accumulator >= fixed_dt {
            self.tick(fixed_dt);
            self.time_accumulator -= fixed_dt;
            ticks += 1;
        }
        ticks
    }

    /// Run exactly one tick of `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.world.resource_mut::<SimClock>().advance(dt);
        self.schedule.run(&mut self.world);
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    /// Get the elapsed simulation time in milliseconds.
    pub fn current_time_ms(&self) -> f64 {
        self.world.resource::<SimClock>().now_ms
    }

    // ------------------------------------------------------------------
    // Snapshots and events
    // ------------------------------------------------------------------

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// A snapshot when the UI sync interval has elapsed in simulated time.
    pub fn poll_ui_snapshot(&mut self) -> Option<Snapshot> {
        let now = self.current_time_ms();
        self.ui_sync.due(now).then(|| self.snapshot())
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.world.resource_mut::<SimEvents>().drain()
    }

    // ------------------------------------------------------------------
    // Unit access
    // ------------------------------------------------------------------

    fn find_entity(&mut self, id: u32) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &UnitId)>();
        query
            .iter(&self.world)
            .find(|(_, uid)| uid.0 == id)
            .map(|(e, _)| e)
    }

    /// Entity of a unit id.
    pub fn entity_of(&mut self, id: u32) -> SimResult<Entity> {
        self.find_entity(id).ok_or(SimError::UnknownUnit(id))
    }

    /// Current grid position of a unit.
    pub fn unit_position(&mut self, id: u32) -> SimResult<Vec2> {
        let entity = self.entity_of(id)?;
        self.world
            .get::<Position>(entity)
            .map(Position::vec)
            .ok_or(SimError::UnknownUnit(id))
    }

    /// Current animation state of a unit.
    pub fn unit_state(&mut self, id: u32) -> SimResult<AnimationState> {
        let entity = self.entity_of(id)?;
        self.world
            .get::<Render>(entity)
            .map(Render::state)
            .ok_or(SimError::UnknownUnit(id))
    }

    /// Move a unit instantly, keeping the pool, mirror and grid in step.
    pub fn teleport(&mut self, id: u32, pos: Vec2) -> SimResult<()> {
        let entity = self.entity_of(id)?;
        let Some(slot) = self.world.get::<PoolIndex>(entity).copied() else {
            return Err(SimError::UnknownUnit(id));
        };
        self.world.resource_mut::<PositionPool>().set_position(slot.0, pos);

        let dying = self.world.get::<Render>(entity).is_some_and(Render::is_dying);
        let old_key = self.world.get::<GridCell>(entity).and_then(|c| c.0);
        let new_key = {
            let mut grid = self.world.resource_mut::<SpatialGrid>();
            if let Some(old) = old_key {
                grid.remove_by_key(old, entity);
            }
            (!dying).then(|| grid.insert(pos.x, pos.y, entity))
        };

        let mut unit = self.world.entity_mut(entity);
        if let Some(mut p) = unit.get_mut::<Position>() {
            *p = Position::from(pos);
        }
        if let Some(mut depth) = unit.get_mut::<SortDepth>() {
            depth.0 = pos.x + pos.y;
        }
        if let Some(mut cell) = unit.get_mut::<GridCell>() {
            cell.0 = new_key;
        }
        debug!(unit = id, x = pos.x, y = pos.y, "teleported");
        Ok(())
    }

    /// Subtract health from a unit. Death is resolved on the next tick.
    pub fn damage(&mut self, id: u32, amount: f32) -> SimResult<()> {
        let entity = self.entity_of(id)?;
        match self.world.get_mut::<Stats>(entity) {
            Some(mut stats) => {
                stats.damage(amount);
                Ok(())
            }
            None => Err(SimError::UnknownUnit(id)),
        }
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Order one unit to a grid point, replacing or queueing.
    pub fn order_move(&mut self, id: u32, target: Vec2, queue: bool) -> SimResult<()> {
        let entity = self.entity_of(id)?;
        if !self.issue_move(entity, target, queue) {
            warn!(unit = id, "move order ignored: unit cannot move");
        }
        Ok(())
    }

    /// Order every selected unit to a grid point. Returns how many took it.
    pub fn order_move_selected(&mut self, target: Vec2, queue: bool) -> usize {
        let selected = selection::selected_entities(&mut self.world);
        let moved = selected
            .into_iter()
            .filter(|&e| self.issue_move(e, target, queue))
            .count();

        let now = self.current_time_ms();
        self.world.resource_mut::<Overlays>().move_indicator = Some(MoveIndicator {
            pos: target,
            at_ms: now,
        });
        debug!(x = target.x, y = target.y, queue, units = moved, "move selected");
        moved
    }

    /// `order_move_selected` for a point given in screen pixels.
    pub fn move_selected_to_screen(&mut self, screen: Vec2, queue: bool) -> usize {
        let target = self.screen_to_grid(screen);
        self.order_move_selected(target, queue)
    }

    fn issue_move(&mut self, entity: Entity, target: Vec2, queue: bool) -> bool {
        let mut unit = self.world.entity_mut(entity);
        if unit.get::<Render>().is_some_and(Render::is_dying) {
            return false;
        }
        let Some(mut path) = unit.get_mut::<Path>() else {
            return false;
        };
        if queue {
            path.enqueue(target);
        } else {
            path.set_target(target);
        }
        if let Some(mut render) = unit.get_mut::<Render>() {
            render.set_state(AnimationState::Walk);
        }
        true
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Start a drag at a screen point.
    pub fn begin_selection(&mut self, screen: Vec2) {
        self.world.resource_mut::<Overlays>().selection_rect = Some(ScreenRect {
            start: screen,
            end: screen,
        });
    }

    /// Track the drag. Past the drag threshold the rectangle is applied live.
    pub fn update_selection(&mut self, screen: Vec2, additive: bool) {
        let threshold = self.world.resource::<SimConfig>().selection.drag_threshold_sq;
        let rect = {
            let mut overlays = self.world.resource_mut::<Overlays>();
            let Some(rect) = overlays.selection_rect.as_mut() else {
                return;
            };
            rect.end = screen;
            *rect
        };
        if rect.start.distance_sq(rect.end) >= threshold {
            selection::select_in_rect(&mut self.world, &rect, additive);
        }
    }

    /// Finish the drag. Short drags resolve as a click on the release point.
    pub fn end_selection(&mut self, screen: Vec2, modifiers: Modifiers, at_ms: f64) {
        let Some(mut rect) = self.world.resource_mut::<Overlays>().selection_rect.take() else {
            warn!("selection ended without a drag in progress");
            return;
        };
        rect.end = screen;

        let cfg = self.world.resource::<SimConfig>().selection.clone();
        if rect.start.distance_sq(rect.end) < cfg.drag_threshold_sq {
            let picked = selection::pick(&mut self.world, screen);
            let double = self
                .world
                .resource_mut::<ClickTracker>()
                .register(picked, at_ms, cfg.double_click_ms);
            debug!(?picked, double, shift = modifiers.shift, ctrl = modifiers.ctrl, "click");
            selection::click(&mut self.world, picked, modifiers, double);
        } else {
            selection::select_in_rect(&mut self.world, &rect, modifiers.shift);
        }
    }

    /// Select every living unit of one archetype.
    pub fn select_type(&mut self, unit_type: UnitType, additive: bool) {
        selection::select_type(&mut self.world, unit_type, additive);
    }

    /// Ids of the selected units, ascending.
    pub fn selected_ids(&mut self) -> Vec<u32> {
        selection::selected_entities(&mut self.world)
            .into_iter()
            .filter_map(|e| self.world.get::<UnitId>(e).map(|id| id.0))
            .collect()
    }

    // ------------------------------------------------------------------
    // Formations
    // ------------------------------------------------------------------

    /// Start a formation draft at a screen point.
    pub fn begin_formation(&mut self, screen: Vec2) {
        let start = self.screen_to_grid(screen);
        self.world.resource_mut::<Overlays>().formation_path = Some(vec![start]);
    }

    /// Extend the draft. Straight drafts keep only the start and the
    /// current point; free-form drafts append points spaced apart.
    pub fn extend_formation(&mut self, screen: Vec2, freeform: bool) {
        let point = self.screen_to_grid(screen);
        let min_spacing_sq = self
            .world
            .resource::<SimConfig>()
            .selection
            .formation_min_spacing_sq;

        let mut overlays = self.world.resource_mut::<Overlays>();
        let Some(path) = overlays.formation_path.as_mut() else {
            return;
        };
        if freeform {
            if path.last().map_or(true, |last| last.distance_sq(point) > min_spacing_sq) {
                path.push(point);
            }
        } else {
            path.truncate(1);
            path.push(point);
        }
    }

    /// Assign the selected units along the draft and clear it.
    ///
    /// Returns the plan, or `None` when the draft was too short or nothing
    /// movable was selected.
    pub fn commit_formation(&mut self) -> Option<FormationPlan<u32>> {
        let path = self.world.resource_mut::<Overlays>().formation_path.take()?;

        let selected = selection::selected_entities(&mut self.world);
        let units: Vec<(u32, Vec2)> = selected
            .iter()
            .filter(|&&e| self.world.get::<Path>(e).is_some())
            .filter_map(|&e| {
                let id = self.world.get::<UnitId>(e)?;
                let pos = self.world.get::<Position>(e)?;
                Some((id.0, pos.vec()))
            })
            .collect();

        let Some(plan) = assign_formation(&path, &units) else {
            debug!(points = path.len(), units = units.len(), "formation dropped");
            return None;
        };

        for &(id, slot) in &plan.assignments {
            if let Some(entity) = self.find_entity(id) {
                self.issue_move(entity, slot, false);
            }
        }
        debug!(
            units = plan.assignments.len(),
            reversed = plan.reversed,
            swaps = plan.swaps,
            "formation committed"
        );
        Some(plan)
    }

    // ------------------------------------------------------------------
    // Camera
    // ------------------------------------------------------------------

    pub fn camera(&self) -> Vec2 {
        self.world.resource::<Camera>().0
    }

    pub fn set_camera(&mut self, offset: Vec2) {
        self.world.resource_mut::<Camera>().0 = offset;
    }

    pub fn pan_camera(&mut self, delta: Vec2) {
        self.world.resource_mut::<Camera>().0 += delta;
    }

    /// Convert a screen point with the current camera.
    pub fn screen_to_grid(&self, screen: Vec2) -> Vec2 {
        let proj = self.world.resource::<SimConfig>().projection;
        screen_to_grid(screen, self.camera(), &proj)
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Apply one input intent.
    pub fn apply_intent(&mut self, intent: Intent) {
        debug!(?intent, "intent");
        match intent {
            Intent::BeginSelection { screen } => self.begin_selection(screen),
            Intent::UpdateSelection { screen, additive } => self.update_selection(screen, additive),
            Intent::EndSelection {
                screen,
                modifiers,
                at_ms,
            } => self.end_selection(screen, modifiers, at_ms),
            Intent::BeginFormation { screen } => self.begin_formation(screen),
            Intent::ExtendFormation { screen, freeform } => self.extend_formation(screen, freeform),
            Intent::CommitFormation => {
                if self.commit_formation().is_none() {
                    warn!("formation commit had nothing to assign");
                }
            }
            Intent::MoveSelected { screen, queue } => {
                self.move_selected_to_screen(screen, queue);
            }
            Intent::PanCamera { delta } => self.pan_camera(delta),
            Intent::SetCamera { offset } => self.set_camera(offset),
        }
    }

    /// Apply intents in order.
    pub fn apply_intents(&mut self, intents: impl IntoIterator<Item = Intent>) {
        for intent in intents {
            self.apply_intent(intent);
        }
    }

    // ------------------------------------------------------------------
    // Render access
    // ------------------------------------------------------------------

    /// Culled, depth-sorted units for the current frame.
    pub fn draw_list(&mut self, viewport: Viewport) -> Vec<DrawItem> {
        render_view::draw_list(&mut self.world, viewport)
    }

    /// Shake magnitude for this frame, decaying it for the next.
    pub fn decay_screen_shake(&mut self) -> Option<f32> {
        let cfg = self.world.resource::<SimConfig>().render.clone();
        render_view::decay_screen_shake(&mut self.world.resource_mut::<Overlays>(), &cfg)
    }

    /// Progress of the move indicator animation, if one is showing.
    pub fn move_indicator_progress(&self) -> Option<f32> {
        let now = self.current_time_ms();
        render_view::move_indicator_progress(
            self.overlays().move_indicator.as_ref(),
            now,
            &self.world.resource::<SimConfig>().render,
        )
    }

    pub fn overlays(&self) -> &Overlays {
        self.world.resource::<Overlays>()
    }

    pub fn tiles(&self) -> &TileGrid {
        self.world.resource::<TileGrid>()
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    /// Get the spatial grid reference (for debugging/visualization).
    pub fn spatial_grid(&self) -> &SpatialGrid {
        self.world.resource::<SpatialGrid>()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}
