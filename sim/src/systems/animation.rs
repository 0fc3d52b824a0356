//! Animation system - advances sprite frames by archetype frame rate.

use crate::components::*;
use crate::world::SimClock;
use bevy_ecs::prelude::*;

/// Step each entity's frame once its per-frame interval has elapsed.
///
/// Cycles wrap, except `Die`, which freezes on its final frame without
/// touching the timestamp.
pub fn animation_system(clock: Res<SimClock>, mut query: Query<&mut Render>) {
    let now = clock.now_ms;
    for mut render in query.iter_mut() {
        let state = render.state();
        let asset = render.unit_type.asset();
        if now - render.last_frame_update_ms <= asset.rate_ms(state) {
            continue;
        }
        let frames = asset.frames(state);
        if state == AnimationState::Die && render.frame >= frames - 1 {
            continue;
        }
        render.frame = (render.frame + 1) % frames;
        render.last_frame_update_ms = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::UnitType;

    fn setup(unit_type: UnitType) -> (World, Schedule, Entity) {
        let mut world = World::new();
        world.insert_resource(SimClock::default());
        let e = world.spawn(Render::new(unit_type, 0.0)).id();
        let mut schedule = Schedule::default();
        schedule.add_systems(animation_system);
        (world, schedule, e)
    }

    #[test]
    fn test_frames_wrap_and_stay_in_bounds() {
        let (mut world, mut schedule, e) = setup(UnitType::Warrior);
        world.get_mut::<Render>(e).unwrap().set_state(AnimationState::Walk);
        let frames = UnitType::Warrior.asset().frames(AnimationState::Walk);

        let mut seen_wrap = false;
        for step in 1..=40 {
            world.resource_mut::<SimClock>().now_ms = step as f64 * 120.0;
            schedule.run(&mut world);
            let frame = world.get::<Render>(e).unwrap().frame;
            assert!(frame < frames);
            seen_wrap |= frame == 0;
        }
        assert!(seen_wrap);
    }

    #[test]
    fn test_frame_waits_for_rate() {
        let (mut world, mut schedule, e) = setup(UnitType::Scout);
        // Idle runs at 200ms per frame.
        world.resource_mut::<SimClock>().now_ms = 200.0;
        schedule.run(&mut world);
        assert_eq!(world.get::<Render>(e).unwrap().frame, 0);
        world.resource_mut::<SimClock>().now_ms = 201.0;
        schedule.run(&mut world);
        assert_eq!(world.get::<Render>(e).unwrap().frame, 1);
    }

    #[test]
    fn test_death_holds_last_frame() {
        let (mut world, mut schedule, e) = setup(UnitType::BossOverseer);
        world.get_mut::<Render>(e).unwrap().begin_death(0.0);
        let last = UnitType::BossOverseer.asset().last_frame(AnimationState::Die);

        let mut previous = 0;
        for step in 1..=60 {
            world.resource_mut::<SimClock>().now_ms = step as f64 * 200.0;
            schedule.run(&mut world);
            let frame = world.get::<Render>(e).unwrap().frame;
            assert!(frame >= previous, "death frames never go backwards");
            previous = frame;
        }
        assert_eq!(previous, last);
        assert_eq!(world.get::<Render>(e).unwrap().state(), AnimationState::Die);
    }
}
