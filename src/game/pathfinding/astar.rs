use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use super::types::{Node, SearchParams, State};
use crate::game::collision::{can_move, Hitbox};
use crate::game::error::NavError;
use crate::game::map::NavMap;
use crate::game::math::Point;

fn position(start: Point, step: f64, node: Node) -> Point {
    Point::new(start.x + node.x as f64 * step, start.y + node.y as f64 * step)
}

/// Straight-line distance to the arrival circle.
pub(super) fn heuristic(p: Point, goal: Point, tolerance: f64) -> f64 {
    (p.distance(goal) - tolerance).max(0.0)
}

fn reconstruct_path(came_from: &FxHashMap<Node, Node>, mut current: Node, start: Point, step: f64) -> Vec<Point> {
    let mut path = vec![position(start, step, current)];
    while let Some(prev) = came_from.get(&current) {
        current = *prev;
        path.push(position(start, step, current));
    }
    path.reverse();
    path
}

/// A* over a lattice anchored at `start` with spacing `params.step`.
///
/// # Algorithm
/// - Neighbours: 8 (or 4) lattice directions; a neighbour is expanded only if
///   it lies inside the map bounds and the collision oracle allows the step.
///   With `use_grid` a step from a grid-open cell into a grid-blocked cell is
///   also refused, which keeps the search out of walls' fattened shadow.
/// - Cost: Euclidean step length. Priority: cost + distance to the arrival circle.
/// - Arrival: within `tolerance` of `goal` (and, for `must_reach`, with a
///   clear line from the node to `goal`, which is then appended).
///
/// The returned path starts at `start` exactly.
///
/// # Performance
/// `keep_running` is polled on every pop, so cancellation takes effect
/// within one expansion. `max_iterations` bounds the work on unreachable goals.
pub(super) fn find_path_astar(
    map: &NavMap,
    hitbox: &Hitbox,
    start: Point,
    goal: Point,
    params: &SearchParams,
    keep_running: &AtomicBool,
) -> Result<Vec<Point>, NavError> {
    let step = params.step.max(1) as f64;
    let geometry = &map.geometry;
    let arrived = |p: Point| {
        p.distance(goal) <= params.tolerance && (!params.must_reach || can_move(p, goal, geometry, hitbox))
    };
    let finish = |mut path: Vec<Point>| {
        if params.must_reach && path.last() != Some(&goal) {
            path.push(goal);
        }
        path
    };

    let mut open_set = BinaryHeap::new();
    open_set.push(State { cost: heuristic(start, goal, params.tolerance), node: Node::ORIGIN });

    let mut came_from: FxHashMap<Node, Node> = FxHashMap::default();
    let mut g_score: FxHashMap<Node, f64> = FxHashMap::default();
    let mut closed: FxHashSet<Node> = FxHashSet::default();
    g_score.insert(Node::ORIGIN, 0.0);

    let mut iterations = 0usize;

    while let Some(State { cost: _, node: current }) = open_set.pop() {
        if !keep_running.load(Ordering::Acquire) {
            debug!("[PATH] Search on {} cancelled after {} iterations", map.name, iterations);
            return Err(NavError::Cancelled);
        }
        if !closed.insert(current) {
            continue;
        }

        iterations += 1;
        crate::profile_log!(iterations, 10_000, "[PATH] {} open={} closed={}", map.name, open_set.len(), closed.len());
        if iterations > params.max_iterations {
            warn!(
                "[PATH] Search on {} exceeded {} iterations ({:?} -> {:?})",
                map.name, params.max_iterations, start, goal
            );
            break;
        }

        let here = position(start, step, current);
        if arrived(here) {
            if iterations > 5_000 {
                debug!("[PATH] Search on {} used {} iterations", map.name, iterations);
            }
            return Ok(finish(reconstruct_path(&came_from, current, start, step)));
        }

        let current_g = g_score.get(&current).copied().unwrap_or(f64::INFINITY);
        let here_open = !map.is_blocked_at(here);

        for &(dx, dy) in params.neighbor_mode.directions() {
            let neighbor = current.offset(dx, dy);
            if closed.contains(&neighbor) {
                continue;
            }
            let there = position(start, step, neighbor);
            if !map.contains(there.x, there.y) {
                continue;
            }
            if params.use_grid && here_open && map.is_blocked_at(there) {
                continue;
            }
            if !can_move(here, there, geometry, hitbox) {
                continue;
            }

            let tentative = current_g + here.distance(there);
            if tentative < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative);
                open_set.push(State {
                    cost: tentative + heuristic(there, goal, params.tolerance),
                    node: neighbor,
                });
            }
        }
    }

    Err(NavError::NoPath {
        map: map.name.clone(),
        from_x: start.x,
        from_y: start.y,
        to_x: goal.x,
        to_y: goal.y,
    })
}
