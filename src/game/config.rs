use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::game::collision::Hitbox;

/// How many neighbors the grid search expands per node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborMode {
    /// Cardinal directions only
    Four,
    /// Cardinal + diagonal
    #[default]
    Eight,
}

/// A named place bots can smart-move to without knowing coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub map: String,
    pub x: f64,
    pub y: f64,
}

impl AliasTarget {
    fn new(map: &str, x: f64, y: f64) -> Self {
        Self { map: map.to_string(), x, y }
    }
}

/// Navigation tuning loaded once at startup.
///
/// Geometry-derived data (walkability grids, door graph) is built from these
/// values, so changing them requires rebuilding the map cache; `MapProcessor`
/// does this automatically when the cached hitbox differs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    // Collision
    pub hitbox: Hitbox,

    // Walkability grid
    pub grid_hitbox: Hitbox,
    pub grid_padding: f64,
    pub grid_height_margin: f64,

    // Grid search
    pub search_step: i32,
    pub neighbor_mode: NeighborMode,
    pub arrival_tolerance: f64,
    pub transporter_tolerance: f64,
    pub max_search_iterations: usize,

    // Navigation loop
    pub poll_interval_ms: u64,
    pub waypoint_tolerance: f64,
    pub transport_trigger_radius: f64,
    pub waypoint_timeout_ms: u64,
    pub stop_pause_ms: u64,

    pub aliases: BTreeMap<String, AliasTarget>,

    /// Where the preprocessed maps are cached between runs (None = no cache)
    pub map_cache: Option<PathBuf>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert("town".to_string(), AliasTarget::new("main", 0.0, 0.0));
        aliases.insert("upgrade".to_string(), AliasTarget::new("main", -204.0, -129.0));
        aliases.insert("compound".to_string(), AliasTarget::new("main", -204.0, -129.0));
        aliases.insert("potions".to_string(), AliasTarget::new("main", 56.0, -122.0));
        aliases.insert("exchange".to_string(), AliasTarget::new("main", -26.0, -432.0));

        Self {
            hitbox: Hitbox { h: 4.0, v: 3.0, vn: 1.0 },
            grid_hitbox: Hitbox { h: 8.0, v: 7.0, vn: 2.0 },
            grid_padding: 1.0,
            grid_height_margin: 50.0,
            search_step: 7,
            neighbor_mode: NeighborMode::Eight,
            arrival_tolerance: 20.0,
            transporter_tolerance: 60.0,
            max_search_iterations: 250_000,
            poll_interval_ms: 10,
            waypoint_tolerance: 1.0,
            transport_trigger_radius: 60.0,
            waypoint_timeout_ms: 30_000,
            stop_pause_ms: 20,
            aliases,
            map_cache: None,
        }
    }
}

impl NavigationConfig {
    /// Load the config from a RON file, falling back to defaults.
    ///
    /// A missing or unparsable file is logged and never fatal: the defaults
    /// are tuned for the live game.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match ron::from_str::<NavigationConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded navigation config from {}", path.display());
                    config
                }
                Err(e) => {
                    error!("Failed to parse navigation config: {}", e);
                    error!("Using default NavigationConfig");
                    NavigationConfig::default()
                }
            },
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                error!("Using default NavigationConfig");
                NavigationConfig::default()
            }
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}
