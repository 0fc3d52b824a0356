//! Formation assignment of a squad onto a drawn polyline.
//!
//! The path is resampled into one evenly spaced slot per unit. Units are
//! ordered by where they project onto the path, matched to the slots in
//! whichever direction moves them less in total, and finally nudged by two
//! passes of adjacent swaps. The result is a cheap local optimum, not an
//! optimal matching.

use crate::components::Vec2;

/// Adjacent-swap refinement passes.
const SWAP_PASSES: usize = 2;

/// A polyline with cumulative arc lengths.
#[derive(Debug, Clone)]
pub struct Polyline<'a> {
    points: &'a [Vec2],
    segment_lengths: Vec<f32>,
    cumulative: Vec<f32>,
}

impl<'a> Polyline<'a> {
    /// Needs at least two points.
    pub fn new(points: &'a [Vec2]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let segment_lengths: Vec<f32> = points.windows(2).map(|w| w[0].distance(w[1])).collect();
        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        let mut total = 0.0;
        for len in &segment_lengths {
            total += len;
            cumulative.push(total);
        }
        Some(Self {
            points,
            segment_lengths,
            cumulative,
        })
    }

    pub fn total_length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Point at arc length `d`, clamped to the ends.
    pub fn point_at(&self, d: f32) -> Vec2 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if d <= 0.0 {
            return first;
        }
        if d >= self.total_length() {
            return last;
        }
        for (i, &len) in self.segment_lengths.iter().enumerate() {
            if d <= self.cumulative[i + 1] {
                let t = (d - self.cumulative[i]) / len;
                return self.points[i].lerp(self.points[i + 1], t);
            }
        }
        last
    }

    /// `n` slots evenly spaced by arc length. A single slot sits at the middle.
    pub fn resample(&self, n: usize) -> Vec<Vec2> {
        let total = self.total_length();
        (0..n)
            .map(|i| {
                let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
                self.point_at(t * total)
            })
            .collect()
    }

    /// Arc length of the point on the path nearest to `p`.
    /// Zero-length segments are skipped; earlier segments win ties.
    pub fn project(&self, p: Vec2) -> f32 {
        let mut best_sq = f32::INFINITY;
        let mut along = 0.0;
        for (i, &len) in self.segment_lengths.iter().enumerate() {
            let l2 = len * len;
            if l2 == 0.0 {
                continue;
            }
            let (a, b) = (self.points[i], self.points[i + 1]);
            let t = ((p - a).dot(b - a) / l2).clamp(0.0, 1.0);
            let d_sq = p.distance_sq(a.lerp(b, t));
            if d_sq < best_sq {
                best_sq = d_sq;
                along = self.cumulative[i] + t * len;
            }
        }
        along
    }
}

/// Outcome of a formation assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct FormationPlan<K> {
    /// Unit key and its slot, in slot order.
    pub assignments: Vec<(K, Vec2)>,
    /// Whether the reversed slot order was cheaper.
    pub reversed: bool,
    /// Adjacent swaps applied during refinement.
    pub swaps: usize,
}

impl<K> FormationPlan<K> {
    /// Sum of squared distances from each unit to its slot.
    pub fn total_cost(&self, position_of: impl Fn(&K) -> Vec2) -> f32 {
        self.assignments
            .iter()
            .map(|(k, slot)| position_of(k).distance_sq(*slot))
            .sum()
    }
}

/// Assign `units` (key and current position) to slots along `path`.
///
/// Returns `None` when the path has fewer than two points or there are no
/// units. Units with equal projections keep their input order.
pub fn assign_formation<K: Copy>(path: &[Vec2], units: &[(K, Vec2)]) -> Option<FormationPlan<K>> {
    let line = Polyline::new(path)?;
    if units.is_empty() {
        return None;
    }
    let n = units.len();
    let slots = line.resample(n);

    let mut sorted: Vec<(f32, K, Vec2)> = units
        .iter()
        .map(|&(k, pos)| (line.project(pos), k, pos))
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut forward = 0.0;
    let mut backward = 0.0;
    for (i, &(_, _, pos)) in sorted.iter().enumerate() {
        forward += pos.distance_sq(slots[i]);
        backward += pos.distance_sq(slots[n - 1 - i]);
    }
    let reversed = backward < forward;
    if reversed {
        sorted.reverse();
    }

    // (key, position, slot)
    let mut plan: Vec<(K, Vec2, Vec2)> = sorted
        .into_iter()
        .zip(slots)
        .map(|((_, k, pos), slot)| (k, pos, slot))
        .collect();

    let mut swaps = 0;
    for _ in 0..SWAP_PASSES {
        for i in 0..n.saturating_sub(1) {
            let (u1, s1) = (plan[i].1, plan[i].2);
            let (u2, s2) = (plan[i + 1].1, plan[i + 1].2);
            let current = u1.distance_sq(s1) + u2.distance_sq(s2);
            let swapped = u1.distance_sq(s2) + u2.distance_sq(s1);
            if swapped < current {
                plan[i].2 = s2;
                plan[i + 1].2 = s1;
                swaps += 1;
            }
        }
    }

    Some(FormationPlan {
        assignments: plan.into_iter().map(|(k, _, slot)| (k, slot)).collect(),
        reversed,
        swaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn test_resample_is_even_by_arc_length() {
        let path = [v(0.0, 0.0), v(2.0, 0.0), v(2.0, 2.0)];
        let line = Polyline::new(&path).unwrap();
        assert_eq!(line.total_length(), 4.0);
        assert_eq!(
            line.resample(5),
            vec![v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0), v(2.0, 1.0), v(2.0, 2.0)]
        );
        assert_eq!(line.resample(1), vec![v(2.0, 0.0)]);
    }

    #[test]
    fn test_projection_and_degenerate_segments() {
        let path = [v(0.0, 0.0), v(0.0, 0.0), v(4.0, 0.0)];
        let line = Polyline::new(&path).unwrap();
        assert_eq!(line.project(v(1.5, 3.0)), 1.5);
        assert_eq!(line.project(v(-2.0, 0.0)), 0.0);
        assert_eq!(line.project(v(9.0, 1.0)), 4.0);
        assert!(Polyline::new(&path[..1]).is_none());
    }

    #[test]
    fn test_units_already_in_place_keep_their_slots() {
        let path = [v(0.0, 0.0), v(2.0, 0.0), v(4.0, 0.0)];
        let units = [(7u32, v(0.1, 0.2)), (8, v(2.1, -0.1)), (9, v(3.9, 0.1))];
        let plan = assign_formation(&path, &units).unwrap();
        assert_eq!(
            plan.assignments,
            vec![(7, v(0.0, 0.0)), (8, v(2.0, 0.0)), (9, v(4.0, 0.0))]
        );
        assert!(!plan.reversed);
        assert_eq!(plan.swaps, 0);
    }

    #[test]
    fn test_projection_order_beats_input_order() {
        let path = [v(0.0, 0.0), v(6.0, 0.0)];
        let units = [(1u32, v(5.5, 1.0)), (2, v(0.5, 1.0)), (3, v(3.0, -1.0))];
        let plan = assign_formation(&path, &units).unwrap();
        assert_eq!(
            plan.assignments,
            vec![(2, v(0.0, 0.0)), (3, v(3.0, 0.0)), (1, v(6.0, 0.0))]
        );
    }

    #[test]
    fn test_swap_pass_never_increases_cost() {
        let path = [v(0.0, 0.0), v(3.0, 0.0), v(3.0, 3.0), v(0.0, 3.0)];
        let units: Vec<(usize, Vec2)> = [
            v(2.9, 2.0),
            v(0.2, 2.8),
            v(1.0, 0.4),
            v(3.5, 0.5),
            v(1.6, 1.5),
        ]
        .into_iter()
        .enumerate()
        .collect();
        let plan = assign_formation(&path, &units).unwrap();
        assert_eq!(plan.assignments.len(), units.len());

        let line = Polyline::new(&path).unwrap();
        let slots = line.resample(units.len());
        let mut taken: Vec<Vec2> = plan.assignments.iter().map(|(_, s)| *s).collect();
        taken.sort_by(|a, b| line.project(*a).total_cmp(&line.project(*b)));
        assert_eq!(taken, slots, "every slot used exactly once");

        // Swaps only ever lower the cost of the better sweep direction.
        let mut by_projection: Vec<Vec2> = units.iter().map(|(_, p)| *p).collect();
        by_projection.sort_by(|a, b| line.project(*a).total_cmp(&line.project(*b)));
        let forward: f32 = by_projection.iter().zip(&slots).map(|(p, s)| p.distance_sq(*s)).sum();
        let backward: f32 = by_projection
            .iter()
            .zip(slots.iter().rev())
            .map(|(p, s)| p.distance_sq(*s))
            .sum();
        let cost = plan.total_cost(|k| units[*k].1);
        assert!(cost <= forward.min(backward) + 1e-4);
    }

    #[test]
    fn test_empty_inputs() {
        let path = [v(0.0, 0.0), v(1.0, 0.0)];
        assert!(assign_formation::<u32>(&path, &[]).is_none());
        assert!(assign_formation(&path[..1], &[(1u32, v(0.0, 0.0))]).is_none());
    }
}
