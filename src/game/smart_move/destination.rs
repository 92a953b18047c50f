use crate::game::config::NavigationConfig;
use crate::game::data::GameData;
use crate::game::error::NavError;
use crate::game::math::Position;

/// What a bot asked to smart-move to.
#[derive(Clone, Debug, PartialEq)]
pub enum Destination {
    /// Exact position on a named map
    Position(Position),
    /// Coordinates on whatever map the character is on
    Coordinates { x: f64, y: f64 },
    /// A configured alias (`town`, `upgrade`, ...), a map name, or a monster type
    Named(String),
}

impl From<Position> for Destination {
    fn from(p: Position) -> Self {
        Destination::Position(p)
    }
}

impl From<(f64, f64)> for Destination {
    fn from((x, y): (f64, f64)) -> Self {
        Destination::Coordinates { x, y }
    }
}

impl From<&str> for Destination {
    fn from(name: &str) -> Self {
        Destination::Named(name.to_string())
    }
}

impl From<String> for Destination {
    fn from(name: String) -> Self {
        Destination::Named(name)
    }
}

impl Destination {
    /// Turn the request into a concrete map position.
    ///
    /// Names are tried as an alias first, then as a map (its first spawn),
    /// then as a monster type (centre of the first spawn boundary, maps in
    /// name order).
    pub fn resolve(&self, current_map: &str, data: &GameData, config: &NavigationConfig) -> Result<Position, NavError> {
        match self {
            Destination::Position(p) => Ok(p.clone()),
            Destination::Coordinates { x, y } => Ok(Position::new(current_map, *x, *y)),
            Destination::Named(name) => {
                if let Some(alias) = config.aliases.get(name) {
                    return Ok(Position::new(alias.map.clone(), alias.x, alias.y));
                }
                if let Some(map) = data.map(name) {
                    if let Some(spawn) = map.spawns.first() {
                        return Ok(Position::new(name.clone(), spawn.x, spawn.y));
                    }
                }
                data.maps
                    .iter()
                    .filter(|(_, map)| !map.ignore)
                    .find_map(|(map_name, map)| {
                        map.monsters
                            .iter()
                            .filter(|m| &m.kind == name)
                            .find_map(|m| m.boundary_center())
                            .map(|c| Position::new(map_name.clone(), c.x, c.y))
                    })
                    .ok_or_else(|| NavError::UnknownDestination(name.clone()))
            }
        }
    }
}
