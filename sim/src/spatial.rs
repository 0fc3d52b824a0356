//! Spatial partitioning for efficient neighbor queries.
//!
//! Provides O(1) cell lookup and O(k) neighbor queries where k is the number
//! of entities in nearby cells, rather than O(n) for brute force.
//!
//! Cells are addressed by a packed `u32` key: the biased x index in the high
//! 16 bits and the biased y index in the low 16 bits. With the default bias
//! of 1000 any cell index in `-1000..64535` packs without collisions.
//!
//! Range queries return every id in every overlapping cell, so results can
//! include entities slightly outside the requested circle. Each id lives in
//! exactly one bucket, but callers that merge several queries should dedupe.

use crate::components::Vec2;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Grid-based spatial partitioning structure.
///
/// Owned and maintained by the movement system; everything else only reads.
#[derive(Resource, Debug)]
pub struct SpatialGrid {
    /// Cell size in grid units.
    pub cell_size: f32,
    bias: i32,
    cells: HashMap<u32, Vec<Entity>>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(1.5, 1000)
    }
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size and key bias.
    pub fn new(cell_size: f32, bias: i32) -> Self {
        Self {
            cell_size,
            bias,
            cells: HashMap::new(),
        }
    }

    /// Cell index along one axis.
    #[inline]
    fn axis_cell(&self, v: f32) -> i32 {
        (v / self.cell_size).floor() as i32
    }

    #[inline]
    fn pack(&self, gx: i32, gy: i32) -> u32 {
        let bx = (gx + self.bias) as u32 & 0xffff;
        let by = (gy + self.bias) as u32 & 0xffff;
        (bx << 16) | by
    }

    /// Packed key of the cell containing `(x, y)`.
    #[inline]
    pub fn key(&self, x: f32, y: f32) -> u32 {
        self.pack(self.axis_cell(x), self.axis_cell(y))
    }

    /// Unpack a key into cell indices.
    pub fn unpack(&self, key: u32) -> (i32, i32) {
        (
            (key >> 16) as i32 - self.bias,
            (key & 0xffff) as i32 - self.bias,
        )
    }

    /// Insert an entity at a position. Returns the cell key it landed in.
    pub fn insert(&mut self, x: f32, y: f32, entity: Entity) -> u32 {
        let key = self.key(x, y);
        self.insert_with_key(key, entity);
        key
    }

    /// Insert under a precomputed key. No-op if already in that bucket.
    pub fn insert_with_key(&mut self, key: u32, entity: Entity) {
        let bucket = self.cells.entry(key).or_default();
        if !bucket.contains(&entity) {
            bucket.push(entity);
        }
    }

    /// Remove an entity from a cell using swap-with-last.
    pub fn remove_by_key(&mut self, key: u32, entity: Entity) {
        if let Some(bucket) = self.cells.get_mut(&key) {
            if let Some(idx) = bucket.iter().position(|e| *e == entity) {
                bucket.swap_remove(idx);
                if bucket.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
    }

    /// All entities in cells overlapping the box `[min, max]`.
    pub fn query_box(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Vec<Entity> {
        let mut results = Vec::new();
        self.for_each_in_box(min_x, min_y, max_x, max_y, |e| results.push(e));
        results
    }

    /// Box query around `center`; corners of the box are included.
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<Entity> {
        self.query_box(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    /// Visit every entity in cells overlapping the box without allocating.
    pub fn for_each_in_box(
        &self,
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
        mut f: impl FnMut(Entity),
    ) {
        let (start_x, end_x) = (self.axis_cell(min_x), self.axis_cell(max_x));
        let (start_y, end_y) = (self.axis_cell(min_y), self.axis_cell(max_y));
        for gx in start_x..=end_x {
            for gy in start_y..=end_y {
                if let Some(bucket) = self.cells.get(&self.pack(gx, gy)) {
                    bucket.iter().copied().for_each(&mut f);
                }
            }
        }
    }

    /// Get count of entities in a cell.
    pub fn cell_count(&self, key: u32) -> usize {
        self.cells.get(&key).map(|v| v.len()).unwrap_or(0)
    }

    /// Get total entity count.
    pub fn total_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn e(n: u32) -> Entity {
        Entity::from_raw(n)
    }

    #[test]
    fn test_key_packing_is_unique_and_handles_negatives() {
        let grid = SpatialGrid::new(1.5, 1000);
        let mut seen = HashSet::new();
        for gx in -20..20 {
            for gy in -20..20 {
                assert!(seen.insert(grid.pack(gx, gy)));
                assert_eq!(grid.unpack(grid.pack(gx, gy)), (gx, gy));
            }
        }
        // floor, not truncation: -0.1 is in cell -1
        assert_eq!(grid.unpack(grid.key(-0.1, 0.1)), (-1, 0));
        assert_eq!(grid.unpack(grid.key(1.49, 1.5)), (0, 1));
    }

    #[test]
    fn test_insert_query_radius() {
        let mut grid = SpatialGrid::new(10.0, 1000);

        grid.insert(5.0, 5.0, e(1));
        grid.insert(15.0, 5.0, e(2));
        grid.insert(100.0, 100.0, e(3));

        let nearby = grid.query_radius(Vec2::new(5.0, 5.0), 12.0);
        assert_eq!(nearby.len(), 2);

        let nearby = grid.query_radius(Vec2::new(5.0, 5.0), 2.0);
        assert_eq!(nearby, vec![e(1)]);

        let nearby = grid.query_radius(Vec2::new(100.0, 100.0), 1.0);
        assert_eq!(nearby, vec![e(3)]);
    }

    #[test]
    fn test_remove_swaps_and_drops_empty_cells() {
        let mut grid = SpatialGrid::new(1.0, 1000);
        let key = grid.insert(0.5, 0.5, e(1));
        grid.insert(0.5, 0.5, e(2));
        grid.insert(0.5, 0.5, e(3));
        assert_eq!(grid.cell_count(key), 3);

        grid.remove_by_key(key, e(1));
        assert_eq!(grid.cell_count(key), 2);
        grid.remove_by_key(key, e(1));
        assert_eq!(grid.cell_count(key), 2);

        grid.remove_by_key(key, e(2));
        grid.remove_by_key(key, e(3));
        assert_eq!(grid.cell_count(key), 0);
        assert_eq!(grid.total_count(), 0);
    }

    #[test]
    fn test_bucket_never_holds_duplicates() {
        let mut grid = SpatialGrid::new(1.0, 1000);
        grid.insert(0.2, 0.2, e(7));
        grid.insert(0.8, 0.3, e(7));
        assert_eq!(grid.total_count(), 1);
    }

    #[test]
    fn test_full_bounds_query_is_exact_after_churn() {
        let mut grid = SpatialGrid::new(1.5, 1000);
        let mut keys = HashMap::new();

        for i in 0..200u32 {
            let x = (i % 23) as f32 * 1.03;
            let y = (i / 23) as f32 * 2.71;
            keys.insert(i, grid.insert(x, y, e(i)));
        }
        // Move every third entity, remove every fifth.
        for i in 0..200u32 {
            if i % 5 == 0 {
                let key = keys.remove(&i).unwrap();
                grid.remove_by_key(key, e(i));
            } else if i % 3 == 0 {
                let old = keys[&i];
                grid.remove_by_key(old, e(i));
                keys.insert(i, grid.insert(20.0 - (i % 7) as f32, (i % 11) as f32, e(i)));
            }
        }

        let found = grid.query_box(-1.0, -1.0, 30.0, 30.0);
        let unique: HashSet<_> = found.iter().copied().collect();
        assert_eq!(found.len(), unique.len(), "no duplicates");
        let expected: HashSet<_> = keys.keys().map(|&i| e(i)).collect();
        assert_eq!(unique, expected, "no omissions");
    }
}
