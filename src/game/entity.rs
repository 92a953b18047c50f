use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::game::data::GameData;
use crate::game::math::{calculate_velocity, Point, Position, ARRIVAL_SNAP, MAX_FRAME_DELTA_MS};

/// Lock a mutex, recovering the data if a panicking thread poisoned it.
/// Entity state stays usable: the next server update overwrites it anyway.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Movement state
// ============================================================================

/// Client-side movement state mirrored from the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPosition {
    pub map: String,
    pub x: f64,
    pub y: f64,
    pub moving: bool,
    pub speed: f64,
    pub from_x: f64,
    pub from_y: f64,
    pub going_x: f64,
    pub going_y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl EntityPosition {
    pub fn new(map: impl Into<String>, x: f64, y: f64, speed: f64) -> Self {
        Self { map: map.into(), x, y, speed, ..Default::default() }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn position(&self) -> Position {
        Position::new(self.map.clone(), self.x, self.y)
    }

    /// Start interpolating toward `(tx, ty)` from the current position.
    pub fn begin_move(&mut self, tx: f64, ty: f64) {
        self.from_x = self.x;
        self.from_y = self.y;
        self.going_x = tx;
        self.going_y = ty;
        self.moving = true;
        self.recompute_velocity();
    }

    pub fn recompute_velocity(&mut self) {
        let v = calculate_velocity(
            Point::new(self.from_x, self.from_y),
            Point::new(self.going_x, self.going_y),
            self.speed,
        );
        self.vx = v.x;
        self.vy = v.y;
    }

    /// Advance by `delta_ms`, capped so a stalled tick cannot overshoot wildly.
    pub fn move_entity(&mut self, delta_ms: f64) {
        if !self.moving {
            return;
        }
        let delta = delta_ms.min(MAX_FRAME_DELTA_MS) / 1000.0;
        self.x += self.vx * delta;
        self.y += self.vy * delta;
    }

    /// Snap onto the destination once it has been reached or passed on both axes.
    ///
    /// Velocity components are truncated, so a short perpendicular leg can
    /// end up with zero speed on its axis. Such an axis never closes the gap
    /// on its own and counts as reached while the other axis still moves.
    pub fn stop_logic(&mut self) {
        if !self.moving {
            return;
        }
        let reached = |from: f64, at: f64, going: f64| {
            (from <= going && at >= going - ARRIVAL_SNAP) || (from >= going && at <= going + ARRIVAL_SNAP)
        };
        let done_x = (self.vx == 0.0 && self.vy != 0.0) || reached(self.from_x, self.x, self.going_x);
        let done_y = (self.vy == 0.0 && self.vx != 0.0) || reached(self.from_y, self.y, self.going_y);
        if done_x && done_y {
            self.x = self.going_x;
            self.y = self.going_y;
            self.moving = false;
        }
    }

    /// Teleport (map change, respawn): any interpolation in progress is dropped.
    pub fn place(&mut self, map: impl Into<String>, x: f64, y: f64) {
        self.map = map.into();
        self.x = x;
        self.y = y;
        self.moving = false;
        self.vx = 0.0;
        self.vy = 0.0;
    }
}

// ============================================================================
// Entity kinds
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub ctype: String,
    pub position: EntityPosition,
    pub hp: i64,
    pub max_hp: i64,
    pub mp: i64,
    pub max_mp: i64,
    pub gold: i64,
}

impl Character {
    pub fn new(name: impl Into<String>, position: EntityPosition) -> Self {
        Self { name: name.into(), position, ..Default::default() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub id: String,
    pub kind: String,
    pub position: EntityPosition,
    pub hp: i64,
    pub max_hp: i64,
    pub target: Option<String>,
}

impl Monster {
    /// A monster of `kind` using the static speed and hp from the game data.
    pub fn spawn(id: impl Into<String>, kind: impl Into<String>, at: Position, data: &GameData) -> Self {
        let kind = kind.into();
        let def = data.monsters.get(&kind);
        let speed = def.map_or(0.0, |d| d.speed);
        let hp = def.map_or(0, |d| d.hp as i64);
        Self {
            id: id.into(),
            kind,
            position: EntityPosition::new(at.map, at.x, at.y, speed),
            hp,
            max_hp: hp,
            target: None,
        }
    }
}

/// NPCs and anything else the client tracks only by position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericEntity {
    pub id: String,
    pub position: EntityPosition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Player(Character),
    Monster(Monster),
    Generic(GenericEntity),
}

impl Entity {
    pub fn position(&self) -> &EntityPosition {
        match self {
            Entity::Player(c) => &c.position,
            Entity::Monster(m) => &m.position,
            Entity::Generic(g) => &g.position,
        }
    }

    pub fn position_mut(&mut self) -> &mut EntityPosition {
        match self {
            Entity::Player(c) => &mut c.position,
            Entity::Monster(m) => &mut m.position,
            Entity::Generic(g) => &mut g.position,
        }
    }
}

/// Partial state pushed by the server; absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityUpdate {
    pub map: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub moving: Option<bool>,
    pub speed: Option<f64>,
    pub going_x: Option<f64>,
    pub going_y: Option<f64>,
    pub hp: Option<i64>,
    pub max_hp: Option<i64>,
    pub mp: Option<i64>,
    pub max_mp: Option<i64>,
    pub target: Option<String>,
}

impl EntityUpdate {
    fn apply_position(&self, pos: &mut EntityPosition) {
        if let Some(map) = &self.map {
            pos.map = map.clone();
        }
        if let Some(x) = self.x {
            pos.x = x;
        }
        if let Some(y) = self.y {
            pos.y = y;
        }
        if let Some(speed) = self.speed {
            pos.speed = speed;
        }
        if let (Some(gx), Some(gy)) = (self.going_x, self.going_y) {
            pos.begin_move(gx, gy);
        }
        if let Some(moving) = self.moving {
            pos.moving = moving;
        }
    }

    /// Merge into `entity`. A new movement target restarts interpolation
    /// from the (possibly updated) current position.
    pub fn apply(&self, entity: &mut Entity) {
        self.apply_position(entity.position_mut());
        match entity {
            Entity::Player(c) => self.apply_vitals(c),
            Entity::Monster(m) => {
                if let Some(hp) = self.hp {
                    m.hp = hp;
                }
                if let Some(max_hp) = self.max_hp {
                    m.max_hp = max_hp;
                }
                if self.target.is_some() {
                    m.target = self.target.clone();
                }
            }
            Entity::Generic(_) => {}
        }
    }

    pub fn apply_to_character(&self, character: &mut Character) {
        self.apply_position(&mut character.position);
        self.apply_vitals(character);
    }

    fn apply_vitals(&self, c: &mut Character) {
        if let Some(hp) = self.hp {
            c.hp = hp;
        }
        if let Some(max_hp) = self.max_hp {
            c.max_hp = max_hp;
        }
        if let Some(mp) = self.mp {
            c.mp = mp;
        }
        if let Some(max_mp) = self.max_mp {
            c.max_mp = max_mp;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chest {
    pub id: String,
    pub map: String,
    pub x: f64,
    pub y: f64,
}

// ============================================================================
// Entity store
// ============================================================================

/// Live state for one connected character.
///
/// Each collection has its own lock; no lock is held across calls, so the
/// network thread, the interpolator and the smart-move worker never wait on
/// each other for longer than one update.
#[derive(Debug, Default)]
pub struct EntityStore {
    character: Mutex<Character>,
    entities: Mutex<FxHashMap<String, Entity>>,
    chests: Mutex<FxHashMap<String, Chest>>,
}

impl EntityStore {
    pub fn new(character: Character) -> Self {
        Self {
            character: Mutex::new(character),
            entities: Mutex::new(FxHashMap::default()),
            chests: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn character(&self) -> Character {
        lock(&self.character).clone()
    }

    pub fn character_name(&self) -> String {
        lock(&self.character).name.clone()
    }

    pub fn position(&self) -> Position {
        lock(&self.character).position.position()
    }

    pub fn is_moving(&self) -> bool {
        lock(&self.character).position.moving
    }

    pub fn update_character(&self, update: &EntityUpdate) {
        update.apply_to_character(&mut lock(&self.character));
    }

    /// Record the intended destination after a successful pre-flight check.
    pub fn begin_move(&self, tx: f64, ty: f64) {
        lock(&self.character).position.begin_move(tx, ty);
    }

    /// The server moved the character to another map.
    pub fn place_character(&self, map: &str, x: f64, y: f64) {
        lock(&self.character).position.place(map, x, y);
    }

    pub fn upsert_entity(&self, id: impl Into<String>, entity: Entity) {
        lock(&self.entities).insert(id.into(), entity);
    }

    /// Returns false for unknown ids; the server sends a full entity first.
    pub fn update_entity(&self, id: &str, update: &EntityUpdate) -> bool {
        match lock(&self.entities).get_mut(id) {
            Some(entity) => {
                update.apply(entity);
                true
            }
            None => false,
        }
    }

    pub fn remove_entity(&self, id: &str) -> Option<Entity> {
        lock(&self.entities).remove(id)
    }

    pub fn entity(&self, id: &str) -> Option<Entity> {
        lock(&self.entities).get(id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        lock(&self.entities).len()
    }

    /// Entities on the character's current map.
    pub fn entities_on_map(&self) -> Vec<Entity> {
        let map = lock(&self.character).position.map.clone();
        lock(&self.entities)
            .values()
            .filter(|e| e.position().map == map)
            .cloned()
            .collect()
    }

    pub fn clear_entities(&self) {
        lock(&self.entities).clear();
    }

    pub fn add_chest(&self, chest: Chest) {
        lock(&self.chests).insert(chest.id.clone(), chest);
    }

    pub fn remove_chest(&self, id: &str) -> Option<Chest> {
        lock(&self.chests).remove(id)
    }

    pub fn chests(&self) -> Vec<Chest> {
        lock(&self.chests).values().cloned().collect()
    }

    /// One interpolation tick for the character and every tracked entity.
    pub fn advance(&self, delta_ms: f64) {
        {
            let mut character = lock(&self.character);
            character.position.move_entity(delta_ms);
            character.position.stop_logic();
        }
        for entity in lock(&self.entities).values_mut() {
            let pos = entity.position_mut();
            pos.move_entity(delta_ms);
            pos.stop_logic();
        }
    }
}
