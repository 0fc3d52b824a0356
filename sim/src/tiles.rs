//! Ground tiles for the renderer.
//!
//! The map is a square of `world_size²` flat tiles. Tile types are rolled
//! once at start-up from the simulation RNG, so the same seed always gives
//! the same floor.

use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ground type of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileType {
    #[default]
    Dirt,
    Techno,
    Rune,
    Crystal,
    Void,
}

impl TileType {
    /// Map a uniform roll in `[0, 1)` to a tile type.
    ///
    /// Roughly 82% dirt, 6% techno, 6% rune, 4% crystal and 2% void.
    pub fn from_roll(roll: f64) -> Self {
        if roll > 0.98 {
            TileType::Void
        } else if roll > 0.94 {
            TileType::Crystal
        } else if roll > 0.88 {
            TileType::Rune
        } else if roll > 0.82 {
            TileType::Techno
        } else {
            TileType::Dirt
        }
    }
}

/// A single ground tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub height: f32,
    pub tile_type: TileType,
}

/// The full tile map, read by the renderer only.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    size: u32,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Roll a `size × size` map. Tiles are stored x-major.
    pub fn generate(size: u32, rng: &mut impl Rng) -> Self {
        let mut tiles = Vec::with_capacity((size * size) as usize);
        for x in 0..size {
            for y in 0..size {
                tiles.push(Tile {
                    x,
                    y,
                    height: 0.0,
                    tile_type: TileType::from_roll(rng.gen::<f64>()),
                });
            }
        }
        Self { size, tiles }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile under a grid position, if it is on the map.
    pub fn tile_at(&self, x: f32, y: f32) -> Option<&Tile> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (tx, ty) = (x.floor() as u32, y.floor() as u32);
        if tx >= self.size || ty >= self.size {
            return None;
        }
        self.tiles.get((tx * self.size + ty) as usize)
    }

    /// Count of each tile type, for debugging.
    pub fn histogram(&self) -> [(TileType, usize); 5] {
        let mut counts = [
            (TileType::Dirt, 0),
            (TileType::Techno, 0),
            (TileType::Rune, 0),
            (TileType::Crystal, 0),
            (TileType::Void, 0),
        ];
        for tile in &self.tiles {
            if let Some(entry) = counts.iter_mut().find(|(t, _)| *t == tile.tile_type) {
                entry.1 += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn test_roll_thresholds() {
        assert_eq!(TileType::from_roll(0.0), TileType::Dirt);
        assert_eq!(TileType::from_roll(0.82), TileType::Dirt);
        assert_eq!(TileType::from_roll(0.83), TileType::Techno);
        assert_eq!(TileType::from_roll(0.9), TileType::Rune);
        assert_eq!(TileType::from_roll(0.95), TileType::Crystal);
        assert_eq!(TileType::from_roll(0.99), TileType::Void);
    }

    #[test]
    fn test_generation_is_seeded() {
        let a = TileGrid::generate(24, &mut Pcg64Mcg::seed_from_u64(7));
        let b = TileGrid::generate(24, &mut Pcg64Mcg::seed_from_u64(7));
        assert_eq!(a.tiles(), b.tiles());
        assert_eq!(a.tiles().len(), 576);

        let dirt = a.histogram()[0].1;
        assert!(dirt > 576 / 2, "dirt dominates the map");
    }

    #[test]
    fn test_tile_lookup() {
        let grid = TileGrid::generate(4, &mut Pcg64Mcg::seed_from_u64(1));
        let tile = grid.tile_at(2.7, 1.1).unwrap();
        assert_eq!((tile.x, tile.y), (2, 1));
        assert!(grid.tile_at(-0.5, 1.0).is_none());
        assert!(grid.tile_at(4.0, 0.0).is_none());
    }
}
