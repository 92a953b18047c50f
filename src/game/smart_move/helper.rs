use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::game::math::Point;

/// Map transition queued after the walk to a door.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransportMarker {
    /// Door / transporter position on the current map
    pub x: f64,
    pub y: f64,
    /// Map on the other side
    pub map: String,
    pub landing_x: f64,
    pub landing_y: f64,
    pub spawn: usize,
}

impl TransportMarker {
    pub fn door(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn landing(&self) -> Point {
        Point::new(self.landing_x, self.landing_y)
    }
}

/// One planned stop of a smart move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Waypoint {
    Move(Point),
    Transport(TransportMarker),
}

impl Waypoint {
    pub fn is_transport(&self) -> bool {
        matches!(self, Waypoint::Transport(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmartMoveState {
    Idle,
    Searching,
    Moving,
}

/// Session flags shared with whoever needs to observe or cancel a smart
/// move without taking the helper lock (search loop, navigation loop, bot code).
#[derive(Debug)]
pub struct SmartMoveFlags {
    running: AtomicBool,
    searching: AtomicBool,
    moving: AtomicBool,
}

impl Default for SmartMoveFlags {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            searching: AtomicBool::new(false),
            moving: AtomicBool::new(false),
        }
    }
}

impl SmartMoveFlags {
    pub fn can_run(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The flag the search loop polls on every pop.
    pub fn running(&self) -> &AtomicBool {
        &self.running
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    /// True from `init_smart_move` until the session ends, searching included.
    pub fn is_smart_moving(&self) -> bool {
        self.moving.load(Ordering::Acquire)
    }

    /// Stop the in-flight search or navigation.
    ///
    /// With `temporary` the flag is raised again after `pause`, long enough
    /// for the worker to observe the stop between two iterations.
    pub fn stop(&self, temporary: bool, pause: Duration) {
        self.running.store(false, Ordering::Release);
        if temporary {
            std::thread::sleep(pause);
            self.running.store(true, Ordering::Release);
        }
    }

    fn set(&self, running: bool, searching: bool, moving: bool) {
        self.running.store(running, Ordering::Release);
        self.searching.store(searching, Ordering::Release);
        self.moving.store(moving, Ordering::Release);
    }
}

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// State of one character's smart move.
///
/// Created once per character and reinitialized for every request. The
/// planner fills the waypoint queue leg by leg; the navigation loop drains it
/// front to back.
pub struct SmartMoveHelper {
    target_map: String,
    target_x: f64,
    target_y: f64,
    door_path: Vec<String>,
    offset: usize,
    waypoints: VecDeque<Waypoint>,
    landing: Option<Point>,
    callback: Option<Callback>,
    flags: Arc<SmartMoveFlags>,
}

impl Default for SmartMoveHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SmartMoveHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartMoveHelper")
            .field("target_map", &self.target_map)
            .field("target_x", &self.target_x)
            .field("target_y", &self.target_y)
            .field("door_path", &self.door_path)
            .field("offset", &self.offset)
            .field("waypoints", &self.waypoints.len())
            .field("state", &self.state())
            .finish()
    }
}

impl SmartMoveHelper {
    pub fn new() -> Self {
        Self {
            target_map: String::new(),
            target_x: 0.0,
            target_y: 0.0,
            door_path: Vec::new(),
            offset: 0,
            waypoints: VecDeque::new(),
            landing: None,
            callback: None,
            flags: Arc::new(SmartMoveFlags::default()),
        }
    }

    pub fn flags(&self) -> Arc<SmartMoveFlags> {
        Arc::clone(&self.flags)
    }

    /// Start a new request. Clears everything left from the previous one,
    /// including its callback: register a new one afterwards.
    pub fn init_smart_move(&mut self, map: impl Into<String>, x: f64, y: f64) {
        self.target_map = map.into();
        self.target_x = x;
        self.target_y = y;
        self.deinit(false);
        self.flags.set(true, true, true);
    }

    /// Clear the session. `full` also drops the target and returns to idle.
    pub fn deinit(&mut self, full: bool) {
        if full {
            self.target_map.clear();
            self.flags.set(false, false, false);
        }
        self.callback = None;
        self.door_path.clear();
        self.waypoints.clear();
        self.offset = 0;
        self.landing = None;
    }

    pub fn with_callback(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub fn set_callback(&mut self, callback: Option<Callback>) {
        self.callback = callback;
    }

    pub fn target_map(&self) -> &str {
        &self.target_map
    }

    pub fn target_x(&self) -> f64 {
        self.target_x
    }

    pub fn target_y(&self) -> f64 {
        self.target_y
    }

    pub fn target(&self) -> Point {
        Point::new(self.target_x, self.target_y)
    }

    // ------------------------------------------------------------------------
    // Door path
    // ------------------------------------------------------------------------

    pub fn inject_door_path(&mut self, path: Vec<String>) {
        self.door_path = path;
        self.offset = 0;
    }

    pub fn door_path(&self) -> &[String] {
        &self.door_path
    }

    pub fn has_multiple_destinations(&self) -> bool {
        !self.door_path.is_empty()
    }

    /// Map the planner is currently routing across.
    pub fn processable_map(&self) -> &str {
        self.door_path
            .get(self.offset)
            .map(String::as_str)
            .unwrap_or(self.target_map.as_str())
    }

    /// Map the current leg leads into, `None` on the final leg.
    pub fn next_processable_map(&self) -> Option<&str> {
        self.door_path.get(self.offset + 1).map(String::as_str)
    }

    pub fn bump_offset(&mut self) {
        if !self.door_path.is_empty() {
            self.offset += 1;
        }
    }

    /// Where the next leg starts: set when a door leg is planned, consumed
    /// by the leg after it.
    pub fn register_landing(&mut self, landing: Point) {
        self.landing = Some(landing);
    }

    pub fn take_landing(&mut self) -> Option<Point> {
        self.landing.take()
    }

    // ------------------------------------------------------------------------
    // Waypoint queue
    // ------------------------------------------------------------------------

    pub fn push_waypoint(&mut self, waypoint: Waypoint) {
        self.waypoints.push_back(waypoint);
    }

    pub fn push_waypoints(&mut self, points: impl IntoIterator<Item = Point>) {
        self.waypoints.extend(points.into_iter().map(Waypoint::Move));
    }

    pub fn pop_waypoint(&mut self) -> Option<Waypoint> {
        self.waypoints.pop_front()
    }

    pub fn peek_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.front()
    }

    pub fn is_next_transport(&self) -> bool {
        self.peek_waypoint().is_some_and(Waypoint::is_transport)
    }

    pub fn has_more(&self) -> bool {
        !self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &VecDeque<Waypoint> {
        &self.waypoints
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Searching is over; the queue holds the full route.
    pub fn ready(&mut self) {
        self.flags.searching.store(false, Ordering::Release);
    }

    /// Destination reached. Resets the session and hands back the callback
    /// so the caller can run it outside any lock. Returns `None` on every
    /// call after the first.
    #[must_use]
    pub fn finished(&mut self) -> Option<Callback> {
        let callback = self.callback.take();
        self.deinit(true);
        callback
    }

    pub fn stop(&self, temporary: bool, pause: Duration) {
        self.flags.stop(temporary, pause);
    }

    pub fn can_run(&self) -> bool {
        self.flags.can_run()
    }

    pub fn is_searching(&self) -> bool {
        self.flags.is_searching()
    }

    pub fn is_smart_moving(&self) -> bool {
        self.flags.is_smart_moving()
    }

    pub fn state(&self) -> SmartMoveState {
        if self.flags.is_searching() {
            SmartMoveState::Searching
        } else if self.flags.is_smart_moving() {
            SmartMoveState::Moving
        } else {
            SmartMoveState::Idle
        }
    }
}
