use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tracing::{debug, error, info, warn};
use wayfarer_macros::profile;

use super::astar::find_path_astar;
use super::doors::{Door, DoorGraph, Landing};
use super::prune::prune_path;
use super::types::SearchParams;
use crate::game::collision::{can_move, Hitbox};
use crate::game::config::NavigationConfig;
use crate::game::data::{GameData, MapDef};
use crate::game::error::{DataError, NavError};
use crate::game::geometry::GeometryIndex;
use crate::game::map::{load_cache, save_cache, GridSettings, MapCache, NavMap, MAP_CACHE_VERSION};
use crate::game::math::{Point, Position};
use crate::game::smart_move::{SmartMoveHelper, TransportMarker, Waypoint};

/// Preprocessed navigation data for every map plus the door graph.
///
/// Built once at startup and read-only afterwards: share it behind an `Arc`
/// and query it from any thread without locking.
#[derive(Debug)]
pub struct MapProcessor {
    maps: BTreeMap<String, NavMap>,
    graph: DoorGraph,
    config: NavigationConfig,
    data_version: Option<u64>,
}

impl MapProcessor {
    // ========================================================================
    // Preprocessing
    // ========================================================================

    /// Build geometry indexes, walkability grids and the door graph.
    ///
    /// Maps flagged `ignore` or `no_bounds` are skipped. Any data problem on
    /// a processed map aborts the whole build.
    #[profile(25)]
    pub fn process_maps(data: &GameData, config: &NavigationConfig) -> Result<Self, DataError> {
        info!("[MAPS] Preprocessing {} maps...", data.maps.len());
        let grid = grid_settings(config);
        let mut maps = BTreeMap::new();

        for (name, def) in &data.maps {
            if def.ignore {
                info!("[MAPS] Ignored map: {}", name);
                continue;
            }
            if def.no_bounds {
                info!("[MAPS] Ignored boundless map: {}", name);
                continue;
            }

            let raw = data.geometry(name)?;
            let geometry = GeometryIndex::new(
                raw.x_lines.clone(),
                raw.y_lines.clone(),
                raw.min_x,
                raw.min_y,
                raw.max_x,
                raw.max_y,
            );
            let mut map = NavMap::rasterize(name.clone(), geometry, &grid);
            map.doors = collect_doors(name, def, data)?;
            debug!(
                "[MAPS] {}: {}x{} grid, {} blocked cells, {} doors",
                name,
                map.x_size,
                map.y_size,
                map.blocked_count(),
                map.doors.len()
            );
            maps.insert(name.clone(), map);
        }

        let graph = build_graph(&maps);
        info!("[MAPS] Processed {} maps, {} door edges", maps.len(), graph.edge_count());

        Ok(Self {
            maps,
            graph,
            config: config.clone(),
            data_version: data.version,
        })
    }

    /// Reuse the cache at `config.map_cache` when it was built from the same
    /// game data version and hitboxes, otherwise rebuild and rewrite it.
    ///
    /// A cache that cannot be read or written is logged and bypassed, never fatal.
    pub fn load_or_build(data: &GameData, config: &NavigationConfig) -> Result<Self, DataError> {
        let Some(path) = config.map_cache.as_deref() else {
            return Self::process_maps(data, config);
        };

        let grid = grid_settings(config);
        if path.exists() {
            match load_cache(path) {
                Ok(cache) if cache.matches(data.version, &config.hitbox, &grid) => {
                    info!("[MAPS] Loaded {} maps from cache {}", cache.maps.len(), path.display());
                    return Ok(Self {
                        maps: cache.maps,
                        graph: cache.graph,
                        config: config.clone(),
                        data_version: cache.data_version,
                    });
                }
                Ok(_) => info!("[MAPS] Map cache {} is stale, rebuilding", path.display()),
                Err(e) => warn!("[MAPS] Could not read map cache: {}", e),
            }
        }

        let processor = Self::process_maps(data, config)?;
        if let Err(e) = processor.save_cache(path) {
            warn!("[MAPS] Could not write map cache: {}", e);
        }
        Ok(processor)
    }

    pub fn save_cache(&self, path: &Path) -> Result<(), DataError> {
        let cache = MapCache {
            version: MAP_CACHE_VERSION,
            data_version: self.data_version,
            hitbox: self.config.hitbox,
            grid: grid_settings(&self.config),
            maps: self.maps.clone(),
            graph: self.graph.clone(),
        };
        save_cache(path, &cache)?;
        info!("[MAPS] Wrote map cache {}", path.display());
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn map(&self, name: &str) -> Result<&NavMap, NavError> {
        self.maps.get(name).ok_or_else(|| NavError::UnknownMap(name.to_string()))
    }

    pub fn has_map(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn map_names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    pub fn graph(&self) -> &DoorGraph {
        &self.graph
    }

    pub fn hitbox(&self) -> &Hitbox {
        &self.config.hitbox
    }

    /// Collision oracle on a named map. Unknown maps fail instead of
    /// defaulting to "open".
    pub fn can_move(&self, map: &str, from: Point, to: Point) -> Result<bool, NavError> {
        let nav = self.map(map)?;
        Ok(can_move(from, to, &nav.geometry, &self.config.hitbox))
    }

    /// The connector on `current` that leads into `next`. A transporter
    /// serving `next` wins over plain doors.
    pub fn door_to(&self, current: &str, next: &str) -> Option<&Door> {
        let map = self.maps.get(current)?;
        if let Some(transporter) = map.transporter().filter(|t| t.leads_to(next)) {
            return Some(transporter);
        }
        map.doors.iter().find(|d| !d.is_transporter && d.leads_to(next))
    }

    /// Fewest-hops map route, empty when unreachable.
    pub fn door_dijkstra(&self, from: &str, to: &str) -> Vec<String> {
        if !self.has_map(from) || !self.has_map(to) {
            return Vec::new();
        }
        self.graph.door_dijkstra(from, to)
    }

    /// Grid search on one map, see [`find_path_astar`].
    ///
    /// Runs with the walkability grid as a pre-filter first; if that finds
    /// nothing the search is repeated with the collision oracle alone, so
    /// the conservative grid can never hide a route the oracle allows.
    #[profile(5)]
    pub fn find_path(
        &self,
        map: &str,
        start: Point,
        goal: Point,
        tolerance: f64,
        must_reach: bool,
        keep_running: &AtomicBool,
    ) -> Result<Vec<Point>, NavError> {
        let nav = self.map(map)?;
        let mut params = SearchParams {
            step: self.config.search_step,
            neighbor_mode: self.config.neighbor_mode,
            tolerance,
            must_reach,
            max_iterations: self.config.max_search_iterations,
            use_grid: true,
        };

        match find_path_astar(nav, &self.config.hitbox, start, goal, &params, keep_running) {
            Err(NavError::NoPath { .. }) => {
                debug!("[PATH] Grid-filtered search on {} failed, retrying with the oracle only", map);
                params.use_grid = false;
                find_path_astar(nav, &self.config.hitbox, start, goal, &params, keep_running)
            }
            other => other,
        }
    }

    pub fn prune_path(&self, map: &str, raw: &[Point]) -> Result<Vec<Point>, NavError> {
        let nav = self.map(map)?;
        prune_path(raw, &nav.geometry, &self.config.hitbox)
    }

    // ========================================================================
    // Route planning
    // ========================================================================

    /// Fill `helper` with the full route from `origin` to its target.
    ///
    /// # Algorithm
    /// 1. Same map and a clear straight line: one waypoint, done.
    /// 2. Otherwise resolve the door path (just the current map when the
    ///    target is on it) and plan one leg per map. A leg that leads into
    ///    another map walks to that map's door, queues a transport marker and
    ///    registers the landing as the next leg's start.
    /// 3. Every leg is grid-searched and pruned; the leg's own start point is
    ///    not queued.
    ///
    /// Any failing leg fails the whole route and `ready()` is only reached
    /// after the final leg. The caller resets the helper on error.
    pub fn plan(&self, origin: &Position, helper: &mut SmartMoveHelper) -> Result<(), NavError> {
        let flags = helper.flags();
        if !flags.can_run() {
            return Err(NavError::Cancelled);
        }

        let target_map = helper.target_map().to_string();
        let target = helper.target();
        self.map(&origin.map)?;
        self.map(&target_map)?;

        if origin.map == target_map && self.can_move(&origin.map, origin.point(), target)? {
            debug!("[PATH] Direct move on {} to {:?}", target_map, target);
            helper.push_waypoint(Waypoint::Move(target));
            helper.ready();
            return Ok(());
        }

        let door_path = if origin.map == target_map {
            vec![origin.map.clone()]
        } else {
            self.door_dijkstra(&origin.map, &target_map)
        };
        if door_path.is_empty() {
            return Err(NavError::NoDoorRoute { from: origin.map.clone(), to: target_map });
        }
        info!("[PATH] Door path: {}", door_path.join(" -> "));
        helper.inject_door_path(door_path);

        let mut start = origin.point();
        loop {
            if !flags.can_run() {
                return Err(NavError::Cancelled);
            }
            if let Some(landing) = helper.take_landing() {
                start = landing;
            }
            let current = helper.processable_map().to_string();

            let Some(next) = helper.next_processable_map().map(str::to_string) else {
                let raw = self.find_path(&current, start, target, self.config.arrival_tolerance, true, flags.running())?;
                let pruned = self.prune_path(&current, &raw)?;
                debug!("[PATH] Final leg on {}: {} raw -> {} waypoints", current, raw.len(), pruned.len());
                helper.push_waypoints(pruned.into_iter().skip(1));
                helper.ready();
                return Ok(());
            };

            let door = self
                .door_to(&current, &next)
                .ok_or_else(|| NavError::MissingDoor { from: current.clone(), to: next.clone() })?;
            let landing = *door
                .landing(&next)
                .ok_or_else(|| NavError::MissingDoor { from: current.clone(), to: next.clone() })?;
            let tolerance = if door.is_transporter {
                self.config.transporter_tolerance
            } else {
                self.config.arrival_tolerance
            };

            let raw = self.find_path(&current, start, door.position(), tolerance, false, flags.running())?;
            let pruned = self.prune_path(&current, &raw)?;
            debug!("[PATH] Leg {} -> {}: {} raw -> {} waypoints", current, next, raw.len(), pruned.len());
            helper.push_waypoints(pruned.into_iter().skip(1));
            helper.push_waypoint(Waypoint::Transport(TransportMarker {
                x: door.x,
                y: door.y,
                map: next.clone(),
                landing_x: landing.x,
                landing_y: landing.y,
                spawn: landing.spawn,
            }));
            helper.register_landing(landing.point());
            helper.bump_offset();
        }
    }
}

/// Log a planning failure at the level its kind deserves.
pub fn report_nav_error(err: &NavError) {
    if err.is_invariant() {
        error!("[PATH] Planner invariant violated: {}", err);
    } else if matches!(err, NavError::Cancelled) {
        debug!("[PATH] {}", err);
    } else {
        warn!("[PATH] {}", err);
    }
}

fn grid_settings(config: &NavigationConfig) -> GridSettings {
    GridSettings {
        hitbox: config.grid_hitbox,
        padding: config.grid_padding,
        height_margin: config.grid_height_margin,
    }
}

fn collect_doors(name: &str, def: &MapDef, data: &GameData) -> Result<Vec<Door>, DataError> {
    let mut doors = Vec::with_capacity(def.doors.len() + 1);

    for door in &def.doors {
        if data.map(&door.target).is_none() {
            return Err(DataError::UnknownDoorTarget {
                map: name.to_string(),
                target: door.target.clone(),
            });
        }
        let landing = data.spawn(&door.target, door.spawn)?;
        doors.push(Door::single(
            door.x,
            door.y,
            door.target.clone(),
            Landing { x: landing.x, y: landing.y, spawn: door.spawn },
        ));
    }

    if let Some(transporter) = transporter_door(name, def, data)? {
        doors.push(transporter);
    }
    Ok(doors)
}

/// The map's teleporter as a hub door. Only the first transporter NPC on a
/// map is used; extra ones are logged and ignored.
fn transporter_door(name: &str, def: &MapDef, data: &GameData) -> Result<Option<Door>, DataError> {
    let mut npcs = def.npcs.iter().filter(|npc| npc.id == "transporter");
    let Some(npc) = npcs.next() else {
        return Ok(None);
    };
    if npcs.next().is_some() {
        warn!("[DOORS] {} has more than one transporter, only the first is used", name);
    }

    let places = data
        .transporter_places()
        .ok_or_else(|| DataError::MissingTransporterPlaces(name.to_string()))?;
    let (x, y) = match npc.position.as_deref() {
        Some([x, y, ..]) => (*x, *y),
        _ => {
            return Err(DataError::Malformed {
                what: "transporter position",
                detail: format!("{}: {:?}", name, npc.position),
            })
        }
    };

    let mut targets = BTreeMap::new();
    for (place, &spawn) in places {
        if place == name {
            continue;
        }
        if data.map(place).is_none() {
            return Err(DataError::UnknownDoorTarget {
                map: name.to_string(),
                target: place.clone(),
            });
        }
        let landing = data.spawn(place, spawn)?;
        targets.insert(place.clone(), Landing { x: landing.x, y: landing.y, spawn });
    }

    Ok(Some(Door { x, y, is_transporter: true, targets }))
}

/// Door edges between processed maps. Doors into skipped maps stay on the
/// map but never appear in routes.
fn build_graph(maps: &BTreeMap<String, NavMap>) -> DoorGraph {
    let mut graph = DoorGraph::default();
    for (name, map) in maps {
        for door in &map.doors {
            for target in door.targets.keys() {
                if maps.contains_key(target) {
                    graph.add_edge(name, target);
                } else {
                    debug!("[DOORS] {} -> {} leads to an unprocessed map", name, target);
                }
            }
        }
    }
    graph
}
