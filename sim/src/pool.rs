//! Dense position/velocity buffers indexed by slot.
//!
//! Each unit owns one slot for the lifetime of the simulation. Slots are
//! handed out in order and never reused; the entity roster is fixed after
//! start-up and dead units keep their slot.

use crate::components::Vec2;
use crate::error::{SimError, SimResult};
use bevy_ecs::prelude::*;

/// Parallel `[x0, y0, x1, y1, ...]` buffers for every slot.
#[derive(Resource, Debug, Clone)]
pub struct PositionPool {
    positions: Vec<f32>,
    velocities: Vec<f32>,
    next_free: usize,
}

impl PositionPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: vec![0.0; capacity * 2],
            velocities: vec![0.0; capacity * 2],
            next_free: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.positions.len() / 2
    }

    /// Number of slots handed out so far.
    pub fn allocated(&self) -> usize {
        self.next_free
    }

    /// Claim the next slot and seed its position.
    pub fn allocate(&mut self, pos: Vec2) -> SimResult<usize> {
        let slot = self.next_free;
        if slot >= self.capacity() {
            return Err(SimError::PoolExhausted {
                capacity: self.capacity(),
            });
        }
        self.next_free += 1;
        self.set_position(slot, pos);
        Ok(slot)
    }

    #[inline]
    pub fn position(&self, slot: usize) -> Vec2 {
        Vec2::new(self.positions[slot * 2], self.positions[slot * 2 + 1])
    }

    #[inline]
    pub fn set_position(&mut self, slot: usize, pos: Vec2) {
        self.positions[slot * 2] = pos.x;
        self.positions[slot * 2 + 1] = pos.y;
    }

    #[inline]
    pub fn translate(&mut self, slot: usize, delta: Vec2) {
        self.positions[slot * 2] += delta.x;
        self.positions[slot * 2 + 1] += delta.y;
    }

    #[inline]
    pub fn velocity(&self, slot: usize) -> Vec2 {
        Vec2::new(self.velocities[slot * 2], self.velocities[slot * 2 + 1])
    }

    #[inline]
    pub fn set_velocity(&mut self, slot: usize, vel: Vec2) {
        self.velocities[slot * 2] = vel.x;
        self.velocities[slot * 2 + 1] = vel.y;
    }
}

impl Default for PositionPool {
    fn default() -> Self {
        Self::new(512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_sequential_and_never_reused() {
        let mut pool = PositionPool::new(2);
        assert_eq!(pool.allocate(Vec2::new(1.0, 2.0)).unwrap(), 0);
        assert_eq!(pool.allocate(Vec2::new(3.0, 4.0)).unwrap(), 1);
        assert!(matches!(
            pool.allocate(Vec2::ZERO),
            Err(SimError::PoolExhausted { capacity: 2 })
        ));
        assert_eq!(pool.position(1), Vec2::new(3.0, 4.0));
        assert_eq!(pool.allocated(), 2);
    }

    #[test]
    fn test_translate_and_velocity() {
        let mut pool = PositionPool::new(1);
        let slot = pool.allocate(Vec2::new(1.0, 1.0)).unwrap();
        pool.translate(slot, Vec2::new(0.5, -0.5));
        assert_eq!(pool.position(slot), Vec2::new(1.5, 0.5));
        pool.set_velocity(slot, Vec2::new(2.0, 0.0));
        assert_eq!(pool.velocity(slot), Vec2::new(2.0, 0.0));
    }
}
