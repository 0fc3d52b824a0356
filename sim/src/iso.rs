//! Isometric projection between grid space and screen pixels.
//!
//! Grid +x runs to the screen's south-east and grid +y to the south-west.
//! The screen anchor of a grid point is the center of its diamond, half a
//! tile below the diamond's top corner.

use crate::components::{Direction, Vec2};
use crate::config::ProjectionConfig;

/// Grid point → screen pixels, relative to the camera offset.
pub fn grid_to_screen(grid: Vec2, camera: Vec2, proj: &ProjectionConfig) -> Vec2 {
    let hw = proj.tile_width / 2.0;
    let hh = proj.tile_height / 2.0;
    Vec2::new(
        (grid.x - grid.y) * hw + camera.x,
        (grid.x + grid.y) * hh + camera.y + hh,
    )
}

/// Screen pixels → grid point. Inverse of [`grid_to_screen`].
pub fn screen_to_grid(screen: Vec2, camera: Vec2, proj: &ProjectionConfig) -> Vec2 {
    let hw = proj.tile_width / 2.0;
    let hh = proj.tile_height / 2.0;
    let dx = screen.x - camera.x;
    let dy = screen.y - camera.y - hh;
    Vec2::new((dx / hw + dy / hh) / 2.0, (dy / hh - dx / hw) / 2.0)
}

/// On-screen facing for movement from `from` to `to` in grid space.
///
/// Sectors are 45° wide and centered on the grid axes and diagonals;
/// a zero-length move faces south-east (angle 0).
pub fn direction_between(from: Vec2, to: Vec2) -> Direction {
    let angle = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    if angle > -22.5 && angle <= 22.5 {
        Direction::SE
    } else if angle > 22.5 && angle <= 67.5 {
        Direction::S
    } else if angle > 67.5 && angle <= 112.5 {
        Direction::SW
    } else if angle > 112.5 && angle <= 157.5 {
        Direction::W
    } else if angle > 157.5 || angle <= -157.5 {
        Direction::NW
    } else if angle > -157.5 && angle <= -112.5 {
        Direction::N
    } else if angle > -112.5 && angle <= -67.5 {
        Direction::NE
    } else {
        Direction::E
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn test_projection_round_trip() {
        let proj = ProjectionConfig::default();
        let camera = Vec2::new(640.0, 50.0);
        for &(x, y) in &[(0.0, 0.0), (3.5, 7.25), (23.0, 1.0), (-2.0, 4.0)] {
            let g = Vec2::new(x, y);
            let s = grid_to_screen(g, camera, &proj);
            assert!(close(screen_to_grid(s, camera, &proj), g));
        }
    }

    #[test]
    fn test_origin_lands_half_tile_below_camera() {
        let proj = ProjectionConfig::default();
        let s = grid_to_screen(Vec2::ZERO, Vec2::new(100.0, 10.0), &proj);
        assert_eq!(s, Vec2::new(100.0, 42.0));
        // +x moves right and down, +y moves left and down.
        let sx = grid_to_screen(Vec2::new(1.0, 0.0), Vec2::ZERO, &proj);
        assert_eq!(sx, Vec2::new(64.0, 64.0));
        let sy = grid_to_screen(Vec2::new(0.0, 1.0), Vec2::ZERO, &proj);
        assert_eq!(sy, Vec2::new(-64.0, 64.0));
    }

    #[test]
    fn test_direction_sectors() {
        let o = Vec2::ZERO;
        assert_eq!(direction_between(o, Vec2::new(1.0, 0.0)), Direction::SE);
        assert_eq!(direction_between(o, Vec2::new(1.0, 1.0)), Direction::S);
        assert_eq!(direction_between(o, Vec2::new(0.0, 1.0)), Direction::SW);
        assert_eq!(direction_between(o, Vec2::new(-1.0, 1.0)), Direction::W);
        assert_eq!(direction_between(o, Vec2::new(-1.0, 0.0)), Direction::NW);
        assert_eq!(direction_between(o, Vec2::new(-1.0, -1.0)), Direction::N);
        assert_eq!(direction_between(o, Vec2::new(0.0, -1.0)), Direction::NE);
        assert_eq!(direction_between(o, Vec2::new(1.0, -1.0)), Direction::E);
        assert_eq!(direction_between(o, o), Direction::SE);
    }
}
