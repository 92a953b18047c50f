use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::game::math::Point;

/// Where a door drops you on its target map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub x: f64,
    pub y: f64,
    /// Spawn index sent with the transport command
    pub spawn: usize,
}

impl Landing {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A connector out of one map.
///
/// A plain door has exactly one target; a transporter (teleporter NPC) has
/// one target per other place it serves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub x: f64,
    pub y: f64,
    pub is_transporter: bool,
    pub targets: BTreeMap<String, Landing>,
}

impl Door {
    pub fn single(x: f64, y: f64, target: impl Into<String>, landing: Landing) -> Self {
        let mut targets = BTreeMap::new();
        targets.insert(target.into(), landing);
        Self { x, y, is_transporter: false, targets }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn leads_to(&self, map: &str) -> bool {
        self.targets.contains_key(map)
    }

    pub fn landing(&self, map: &str) -> Option<&Landing> {
        self.targets.get(map)
    }
}

// ============================================================================
// Door Graph
// ============================================================================

/// Map-level connectivity: for every map, the maps one door hop away from
/// which it can be entered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DoorGraph {
    reachable_from: BTreeMap<String, BTreeSet<String>>,
}

impl DoorGraph {
    pub fn add_edge(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.reachable_from
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
    }

    /// Maps with a door leading into `map`.
    pub fn predecessors(&self, map: &str) -> impl Iterator<Item = &str> {
        self.reachable_from
            .get(map)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    pub fn edge_count(&self) -> usize {
        self.reachable_from.values().map(BTreeSet::len).sum()
    }

    /// Fewest-hops route from `from` to `to`, both ends included.
    ///
    /// # Algorithm
    /// Every edge weighs one hop, so Dijkstra degenerates to a breadth-first
    /// search. It runs backwards from `to` over the reverse adjacency and
    /// stops as soon as `from` is reached; following the parent links from
    /// `from` then yields the route in travel order.
    ///
    /// Returns an empty route when `to` cannot be reached.
    pub fn door_dijkstra(&self, from: &str, to: &str) -> Vec<String> {
        if from == to {
            return vec![from.to_string()];
        }

        // parent[m] = the map one hop closer to `to`
        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(to);
        parent.insert(to, to);

        while let Some(current) = queue.pop_front() {
            for prev in self.predecessors(current) {
                if parent.contains_key(prev) {
                    continue;
                }
                parent.insert(prev, current);
                if prev == from {
                    let mut route = vec![from.to_string()];
                    let mut at = from;
                    while at != to {
                        at = parent[at];
                        route.push(at.to_string());
                    }
                    return route;
                }
                queue.push_back(prev);
            }
        }

        Vec::new()
    }
}
