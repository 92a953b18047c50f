use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::game::error::DataError;
use crate::game::geometry::Segment;
use crate::game::math::Point;

/// Static game definitions as published by the game server.
///
/// Only the parts navigation needs are modelled; everything else in the
/// document is ignored on load.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameData {
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub maps: BTreeMap<String, MapDef>,
    #[serde(default)]
    pub geometry: BTreeMap<String, GeometryDef>,
    #[serde(default)]
    pub npcs: BTreeMap<String, NpcDef>,
    #[serde(default)]
    pub monsters: BTreeMap<String, MonsterDef>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapDef {
    pub name: Option<String>,
    pub doors: Vec<DoorDef>,
    pub spawns: Vec<SpawnDef>,
    pub npcs: Vec<MapNpc>,
    pub monsters: Vec<MapMonster>,
    pub ignore: bool,
    pub no_bounds: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GeometryDef {
    #[serde(default)]
    pub x_lines: Vec<Segment>,
    #[serde(default)]
    pub y_lines: Vec<Segment>,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// `[x, y, w, h, target_map, spawn, ...]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct DoorDef {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub target: String,
    pub spawn: usize,
}

impl TryFrom<Vec<Value>> for DoorDef {
    type Error = DataError;

    fn try_from(raw: Vec<Value>) -> Result<Self, Self::Error> {
        let malformed = || DataError::Malformed {
            what: "door",
            detail: Value::Array(raw.clone()).to_string(),
        };
        if raw.len() < 6 {
            return Err(malformed());
        }
        let number = |i: usize| raw[i].as_f64().ok_or_else(malformed);
        Ok(Self {
            x: number(0)?,
            y: number(1)?,
            width: number(2)?,
            height: number(3)?,
            target: raw[4].as_str().ok_or_else(malformed)?.to_string(),
            spawn: raw[5].as_u64().ok_or_else(malformed)? as usize,
        })
    }
}

/// `[x, y, ...]`; trailing elements (facing direction etc.) are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct SpawnDef {
    pub x: f64,
    pub y: f64,
}

impl TryFrom<Vec<Value>> for SpawnDef {
    type Error = DataError;

    fn try_from(raw: Vec<Value>) -> Result<Self, Self::Error> {
        match (raw.first().and_then(Value::as_f64), raw.get(1).and_then(Value::as_f64)) {
            (Some(x), Some(y)) => Ok(Self { x, y }),
            _ => Err(DataError::Malformed {
                what: "spawn",
                detail: Value::Array(raw).to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapNpc {
    pub id: String,
    #[serde(default)]
    pub position: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapMonster {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[min_x, min_y, max_x, max_y]`
    #[serde(default)]
    pub boundary: Option<[f64; 4]>,
    #[serde(default)]
    pub count: u32,
}

impl MapMonster {
    pub fn boundary_center(&self) -> Option<Point> {
        self.boundary
            .map(|[x1, y1, x2, y2]| Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NpcDef {
    #[serde(default)]
    pub name: Option<String>,
    /// Teleporter destinations: map name -> spawn index on that map
    #[serde(default)]
    pub places: Option<BTreeMap<String, usize>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MonsterDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub hp: f64,
}

impl GameData {
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, DataError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let data = Self::from_json_str(&contents)?;
        info!(
            "[MAPS] Loaded game data from {} ({} maps, version {:?})",
            path.display(),
            data.maps.len(),
            data.version
        );
        Ok(data)
    }

    pub fn map(&self, name: &str) -> Option<&MapDef> {
        self.maps.get(name)
    }

    pub fn geometry(&self, name: &str) -> Result<&GeometryDef, DataError> {
        self.geometry
            .get(name)
            .ok_or_else(|| DataError::MissingGeometry(name.to_string()))
    }

    pub fn transporter_places(&self) -> Option<&BTreeMap<String, usize>> {
        self.npcs.get("transporter").and_then(|npc| npc.places.as_ref())
    }

    /// Spawn point `index` on `map`.
    pub fn spawn(&self, map: &str, index: usize) -> Result<Point, DataError> {
        let def = self
            .maps
            .get(map)
            .ok_or_else(|| DataError::UnknownMap(map.to_string()))?;
        def.spawns
            .get(index)
            .map(|s| Point::new(s.x, s.y))
            .ok_or_else(|| DataError::MissingSpawn { map: map.to_string(), index })
    }
}
