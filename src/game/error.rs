use thiserror::Error;

/// Problems with the static game data, the config file, or the map cache.
///
/// These are raised while preprocessing maps and abort startup: a map that
/// cannot be indexed must never silently fall back to "everything is open".
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse game data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("map '{0}' is not defined in the game data")]
    UnknownMap(String),

    #[error("map '{0}' has no geometry entry")]
    MissingGeometry(String),

    #[error("map '{map}' has a door to '{target}', which does not exist")]
    UnknownDoorTarget { map: String, target: String },

    #[error("map '{map}' has no spawn #{index}")]
    MissingSpawn { map: String, index: usize },

    #[error("map '{0}' has a transporter but the game data has no transporter places table")]
    MissingTransporterPlaces(String),

    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("map cache error: {0}")]
    Cache(String),
}

/// Why a navigation request did not produce a route.
///
/// Most variants are ordinary search failures: the caller logs them and the
/// smart-move session goes back to idle. [`NavError::is_invariant`] marks the
/// ones that mean the planner itself is broken.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error("map '{0}' is not in the navigation index")]
    UnknownMap(String),

    #[error("cannot resolve destination '{0}'")]
    UnknownDestination(String),

    #[error("no door route from '{from}' to '{to}'")]
    NoDoorRoute { from: String, to: String },

    #[error("no door on '{from}' leads to '{to}'")]
    MissingDoor { from: String, to: String },

    #[error("no walkable path on '{map}' from ({from_x}, {from_y}) to ({to_x}, {to_y})")]
    NoPath {
        map: String,
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
    },

    #[error("search was cancelled")]
    Cancelled,

    #[error("path pruning made no progress at ({x}, {y})")]
    ZeroProgress { x: f64, y: f64 },

    #[error("path reconstruction produced an empty path")]
    EmptyPath,
}

impl NavError {
    /// True for planner bugs, false for "the world has no such route".
    pub fn is_invariant(&self) -> bool {
        matches!(self, NavError::ZeroProgress { .. } | NavError::EmptyPath)
    }
}
