use serde::{Deserialize, Serialize};

use crate::game::geometry::{GeometryIndex, Segment};
use crate::game::math::Point;

/// Tolerance applied to wall extents and to the travel-vector denominator.
pub const EPS: f64 = 1e-8;

/// Axis-aligned extent of an entity around its anchor point.
///
/// `h` is the half width. Vertically the box is asymmetric: it reaches `vn`
/// units on the positive side of the anchor and `v` units on the negative side.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub h: f64,
    pub v: f64,
    pub vn: f64,
}

impl Hitbox {
    /// Corner offsets tested for every move.
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(-self.h, self.vn),
            Point::new(self.h, self.vn),
            Point::new(-self.h, -self.v),
            Point::new(self.h, -self.v),
        ]
    }
}

impl Default for Hitbox {
    fn default() -> Self {
        Self { h: 4.0, v: 3.0, vn: 1.0 }
    }
}

// ============================================================================
// Collision Oracle
// ============================================================================

/// Whether a body with `hitbox` can translate in a straight line from `from`
/// to `to` without crossing any wall in `geometry`.
///
/// # Algorithm
/// 1. A zero-length move is always allowed.
/// 2. The move is replayed from each of the four hitbox corners.
/// 3. Two edge sweeps cover walls shorter than the hitbox that would slip
///    between parallel corner tracks: one along the leading vertical edge,
///    one along the leading horizontal edge (both chosen by travel direction).
///
/// Any single blocked sweep blocks the whole move.
///
/// # Panics
/// If a sweep degenerates to a zero denominator after the epsilon guard.
/// That can only happen on corrupt input and the oracle never guesses.
pub fn can_move(from: Point, to: Point, geometry: &GeometryIndex, hitbox: &Hitbox) -> bool {
    if from == to {
        return true;
    }

    for corner in hitbox.corners() {
        if !segment_clear(from + corner, to + corner, geometry) {
            return false;
        }
    }

    let edge_x = if to.x > from.x { hitbox.h } else { -hitbox.h };
    let leading_vertical = segment_clear(
        Point::new(from.x + edge_x, from.y + hitbox.vn),
        Point::new(to.x + edge_x, to.y - hitbox.v),
        geometry,
    );
    if !leading_vertical {
        return false;
    }

    let edge_y = if to.y > from.y { hitbox.vn } else { -hitbox.v };
    segment_clear(
        Point::new(from.x - hitbox.h, from.y + edge_y),
        Point::new(to.x + hitbox.h, to.y + edge_y),
        geometry,
    )
}

/// Center-line test: does the segment `from -> to` touch any wall?
///
/// Only walls whose fixed coordinate lies inside the segment's bounding box
/// are examined; the sorted lists make that a binary search plus a short scan.
pub fn segment_clear(from: Point, to: Point, geometry: &GeometryIndex) -> bool {
    let min_x = from.x.min(to.x);
    let max_x = from.x.max(to.x);
    let min_y = from.y.min(to.y);
    let max_y = from.y.max(to.y);

    let vertical = geometry.x_lines_between(min_x, max_x);
    if vertical.iter().any(|line| crosses(line, from.x, from.y, to.x, to.y)) {
        return false;
    }

    // Horizontal walls: same test with the axes swapped
    let horizontal = geometry.y_lines_between(min_y, max_y);
    !horizontal.iter().any(|line| crosses(line, from.y, from.x, to.y, to.x))
}

/// `a` is the axis the wall is fixed on, `b` the axis of its extent.
fn crosses(line: &Segment, a1: f64, b1: f64, a2: f64, b2: f64) -> bool {
    let (lo, hi) = line.extent();

    // Ending exactly on the wall
    if line.at == a2 && lo <= b2 && b2 <= hi {
        return true;
    }

    // Sliding along the wall's own coordinate into its extent
    if line.at == a1 && line.at == a2 && b1.min(b2) <= hi && b1.max(b2) >= lo {
        return true;
    }

    let under = a2 - a1 + EPS;
    if under == 0.0 {
        panic!(
            "collision sweep ({}, {}) -> ({}, {}) has a zero denominator",
            a1, b1, a2, b2
        );
    }
    let q = b1 + (b2 - b1) * (line.at - a1) / under;
    lo - EPS <= q && q <= hi + EPS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall_map() -> GeometryIndex {
        // Single vertical wall at x=50 spanning y in [-10, 10]
        GeometryIndex::new(
            vec![Segment::new(50.0, -10.0, 10.0)],
            vec![],
            -200.0,
            -200.0,
            200.0,
            200.0,
        )
    }

    #[test]
    fn test_zero_length_move_is_always_allowed() {
        let geometry = wall_map();
        let hitbox = Hitbox::default();
        for p in [Point::new(0.0, 0.0), Point::new(50.0, 0.0), Point::new(50.0, 10.0), Point::new(-3.5, 7.25)] {
            assert!(can_move(p, p, &geometry, &hitbox), "zero move at {:?}", p);
        }
    }

    #[test]
    fn test_open_field_allows_move() {
        let geometry = GeometryIndex::open(-200.0, -200.0, 200.0, 200.0);
        assert!(can_move(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &geometry, &Hitbox::default()));
    }

    #[test]
    fn test_wall_blocks_crossing_both_ways() {
        let geometry = wall_map();
        let hitbox = Hitbox::default();
        assert!(!can_move(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &geometry, &hitbox));
        assert!(!can_move(Point::new(100.0, 0.0), Point::new(0.0, 0.0), &geometry, &hitbox));
    }

    #[test]
    fn test_move_past_wall_end() {
        let geometry = wall_map();
        let hitbox = Hitbox::default();
        assert!(can_move(Point::new(0.0, 30.0), Point::new(100.0, 30.0), &geometry, &hitbox));
        assert!(can_move(Point::new(0.0, -30.0), Point::new(100.0, -30.0), &geometry, &hitbox));
    }

    #[test]
    fn test_hitbox_clips_wall_the_center_line_misses() {
        let geometry = wall_map();
        let hitbox = Hitbox::default();
        // Center passes 1 unit above the wall top, the top corners do not
        assert!(segment_clear(Point::new(0.0, 11.0), Point::new(100.0, 11.0), &geometry));
        assert!(!can_move(Point::new(0.0, 11.0), Point::new(100.0, 11.0), &geometry, &hitbox));
    }

    #[test]
    fn test_short_wall_between_corners_is_caught() {
        // A half-unit stub that both corner tracks (y=+1 and y=-3) pass around
        let geometry = GeometryIndex::new(
            vec![Segment::new(50.0, -1.0, -0.5)],
            vec![],
            -200.0,
            -200.0,
            200.0,
            200.0,
        );
        let hitbox = Hitbox::default();
        assert!(segment_clear(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &geometry));
        assert!(!can_move(Point::new(0.0, 0.0), Point::new(100.0, 0.0), &geometry, &hitbox));
    }

    #[test]
    fn test_ending_on_wall_is_blocked() {
        let geometry = wall_map();
        assert!(!segment_clear(Point::new(40.0, 0.0), Point::new(50.0, 0.0), &geometry));
    }

    #[test]
    fn test_sliding_into_wall_extent_is_blocked() {
        let geometry = wall_map();
        assert!(!segment_clear(Point::new(50.0, -40.0), Point::new(50.0, -5.0), &geometry));
        assert!(segment_clear(Point::new(50.0, -40.0), Point::new(50.0, -20.0), &geometry));
    }

    #[test]
    fn test_horizontal_wall() {
        let geometry = GeometryIndex::new(
            vec![],
            vec![Segment::new(50.0, -10.0, 10.0)],
            -200.0,
            -200.0,
            200.0,
            200.0,
        );
        let hitbox = Hitbox::default();
        assert!(!can_move(Point::new(0.0, 0.0), Point::new(0.0, 100.0), &geometry, &hitbox));
        assert!(can_move(Point::new(30.0, 0.0), Point::new(30.0, 100.0), &geometry, &hitbox));
    }
}
