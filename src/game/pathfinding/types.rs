use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::game::config::NeighborMode;

/// Lattice coordinate of a search node.
///
/// Nodes are offsets from the search origin in units of the search step,
/// so `(0, 0)` is always the exact (fractional) start position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Node {
    pub x: i32,
    pub y: i32,
}

impl Node {
    pub const ORIGIN: Node = Node { x: 0, y: 0 };

    pub fn offset(self, dx: i32, dy: i32) -> Node {
        Node { x: self.x + dx, y: self.y + dy }
    }
}

/// Lattice directions, cardinals first so `Four` is a prefix of `Eight`.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
];

impl NeighborMode {
    pub fn directions(self) -> &'static [(i32, i32)] {
        match self {
            NeighborMode::Four => &DIRECTIONS[..4],
            NeighborMode::Eight => &DIRECTIONS,
        }
    }
}

/// Open-set entry for the grid search (min-heap on `cost`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub(super) struct State {
    pub cost: f64,
    pub node: Node,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| self.node.x.cmp(&other.node.x))
            .then_with(|| self.node.y.cmp(&other.node.y))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Knobs for one grid search.
#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    pub step: i32,
    pub neighbor_mode: NeighborMode,
    /// Radius around the goal that counts as arrived
    pub tolerance: f64,
    /// Plain targets must also be reachable in a straight line from the
    /// arrival node, and are appended to the path. Door targets are not.
    pub must_reach: bool,
    pub max_iterations: usize,
    /// Refuse steps from a grid-open cell into a grid-blocked cell
    pub use_grid: bool,
}
