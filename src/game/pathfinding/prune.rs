use crate::game::collision::{can_move, Hitbox};
use crate::game::error::NavError;
use crate::game::geometry::GeometryIndex;
use crate::game::math::Point;

/// Collapse a dense grid path into the fewest waypoints that are each
/// reachable from the previous one in a straight line.
///
/// # Algorithm
/// 1. Greedy pass: keep an anchor (initially the first point) and walk
///    forward while the candidate is directly reachable from it. When a
///    candidate is blocked, the point before it is kept and becomes the new
///    anchor, and the same candidate is retried. The last point is always kept.
/// 2. Fixpoint pass: drop any interior waypoint whose neighbours can see
///    each other, until nothing changes. After this no waypoint can be
///    removed, so pruning an already pruned path returns it unchanged.
///
/// The first point is always kept; callers skip it when it is the
/// character's own position.
///
/// # Errors
/// `ZeroProgress` when a blocked candidate directly follows the anchor: the
/// raw path contains a step the oracle itself refuses, retrying would loop.
pub fn prune_path(raw: &[Point], geometry: &GeometryIndex, hitbox: &Hitbox) -> Result<Vec<Point>, NavError> {
    let (&first, rest) = raw.split_first().ok_or(NavError::EmptyPath)?;
    if rest.is_empty() {
        return Ok(vec![first]);
    }

    let mut kept = vec![first];
    let mut anchor = first;
    let mut i = 1;
    while i < raw.len() {
        let candidate = raw[i];
        if can_move(anchor, candidate, geometry, hitbox) {
            i += 1;
            continue;
        }
        let previous = raw[i - 1];
        if previous == anchor {
            return Err(NavError::ZeroProgress { x: candidate.x, y: candidate.y });
        }
        kept.push(previous);
        anchor = previous;
    }

    let last = raw[raw.len() - 1];
    if kept.last() != Some(&last) {
        kept.push(last);
    }

    loop {
        let mut changed = false;
        let mut j = 1;
        while j + 1 < kept.len() {
            if can_move(kept[j - 1], kept[j + 1], geometry, hitbox) {
                kept.remove(j);
                changed = true;
            } else {
                j += 1;
            }
        }
        if !changed {
            break;
        }
    }

    Ok(kept)
}
