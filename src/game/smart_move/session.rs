use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Span};

use super::destination::Destination;
use super::helper::{Callback, SmartMoveFlags, SmartMoveHelper, SmartMoveState, Waypoint};
use crate::game::commands::CommandSink;
use crate::game::data::GameData;
use crate::game::entity::{lock, EntityStore};
use crate::game::math::Point;
use crate::game::pathfinding::{report_nav_error, MapProcessor};

/// Smart-move driver for one character.
///
/// Each request runs on its own worker thread: the route is planned first,
/// then the same thread walks it, polling the entity store for arrival and
/// emitting commands through the sink. A new request always stops and joins
/// the previous worker before touching the helper; requests from several
/// threads are serialized, so at most one worker is ever alive.
pub struct SmartMover {
    name: String,
    processor: Arc<MapProcessor>,
    data: Arc<GameData>,
    store: Arc<EntityStore>,
    sink: Arc<dyn CommandSink>,
    helper: Arc<Mutex<SmartMoveHelper>>,
    flags: Arc<SmartMoveFlags>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: Mutex<Option<ThreadId>>,
    start_lock: Mutex<()>,
    span: Span,
}

impl std::fmt::Debug for SmartMover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartMover")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Everything the worker thread needs, cloned out of the mover.
struct Session {
    processor: Arc<MapProcessor>,
    store: Arc<EntityStore>,
    sink: Arc<dyn CommandSink>,
    helper: Arc<Mutex<SmartMoveHelper>>,
    flags: Arc<SmartMoveFlags>,
}

enum Wait {
    Done,
    Cancelled,
    TimedOut,
}

impl SmartMover {
    pub fn new(
        processor: Arc<MapProcessor>,
        data: Arc<GameData>,
        store: Arc<EntityStore>,
        sink: Arc<dyn CommandSink>,
    ) -> Self {
        let name = store.character_name();
        let helper = SmartMoveHelper::new();
        let flags = helper.flags();
        let span = info_span!("smart_move", character = %name);
        Self {
            name,
            processor,
            data,
            store,
            sink,
            helper: Arc::new(Mutex::new(helper)),
            flags,
            worker: Mutex::new(None),
            worker_id: Mutex::new(None),
            start_lock: Mutex::new(()),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn smart_move(&self, destination: impl Into<Destination>) -> bool {
        self.start(destination.into(), None)
    }

    /// Like [`smart_move`](Self::smart_move); `on_complete` runs once on
    /// arrival and never on failure or cancellation.
    pub fn smart_move_with(
        &self,
        destination: impl Into<Destination>,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> bool {
        self.start(destination.into(), Some(Box::new(on_complete)))
    }

    fn start(&self, destination: Destination, callback: Option<Callback>) -> bool {
        let _enter = self.span.enter();
        let Some(_serial) = self.serialize() else {
            debug!("[SMART_MOVE] Superseded while finishing, dropping follow-up request");
            return false;
        };
        let current = self.store.position();
        let target = match destination.resolve(&current.map, &self.data, self.processor.config()) {
            Ok(target) => target,
            Err(e) => {
                report_nav_error(&e);
                return false;
            }
        };

        self.halt_worker();
        {
            let mut helper = lock(&self.helper);
            helper.init_smart_move(target.map.clone(), target.x, target.y);
            helper.set_callback(callback);
        }
        info!(
            "[SMART_MOVE] {} ({:.0}, {:.0}) -> {} ({:.0}, {:.0})",
            current.map, current.x, current.y, target.map, target.x, target.y
        );

        let session = Session {
            processor: Arc::clone(&self.processor),
            store: Arc::clone(&self.store),
            sink: Arc::clone(&self.sink),
            helper: Arc::clone(&self.helper),
            flags: Arc::clone(&self.flags),
        };
        let span = self.span.clone();
        let spawned = thread::Builder::new()
            .name(format!("smart_move-{}", self.name))
            .spawn(move || {
                let _enter = span.enter();
                session.run();
            });

        match spawned {
            Ok(handle) => {
                *lock(&self.worker_id) = Some(handle.thread().id());
                *lock(&self.worker) = Some(handle);
                true
            }
            Err(e) => {
                error!("[SMART_MOVE] Could not start worker thread: {}", e);
                lock(&self.helper).deinit(true);
                false
            }
        }
    }

    /// Cancel the running search or walk and wait for the worker to exit.
    pub fn stop(&self) {
        let Some(_serial) = self.serialize() else {
            return;
        };
        self.halt_worker();
        lock(&self.helper).deinit(true);
    }

    /// Interrupt the session without joining the worker. The running flag
    /// is raised again after `stop_pause_ms`, so a follow-up request can
    /// start right away.
    pub fn pause(&self) {
        let pause = Duration::from_millis(self.processor.config().stop_pause_ms);
        self.flags.stop(true, pause);
    }

    /// Take the request lock. Returns `None` when the running worker asks
    /// (from its completion callback) while another thread holds the lock:
    /// that thread is about to join the worker, so waiting would deadlock.
    fn serialize(&self) -> Option<MutexGuard<'_, ()>> {
        match self.start_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if *lock(&self.worker_id) == Some(thread::current().id()) {
                    None
                } else {
                    Some(lock(&self.start_lock))
                }
            }
        }
    }

    fn halt_worker(&self) {
        let handle = lock(&self.worker).take();
        let Some(handle) = handle else {
            return;
        };
        // A completion callback may start the next move from the worker itself
        if handle.thread().id() == thread::current().id() {
            return;
        }
        self.flags.stop(false, Duration::ZERO);
        if handle.join().is_err() {
            error!("[SMART_MOVE] Worker thread for {} panicked", self.name);
        }
    }

    pub fn is_smart_moving(&self) -> bool {
        self.flags.is_smart_moving()
    }

    pub fn is_searching(&self) -> bool {
        self.flags.is_searching()
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

    /// Remaining route. Blocks while a search holds the helper.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        lock(&self.helper).waypoints().iter().cloned().collect()
    }

    /// Whether the character could walk straight to `(x, y)` on its current map.
    pub fn can_move(&self, x: f64, y: f64) -> bool {
        let pos = self.store.position();
        match self.processor.can_move(&pos.map, pos.point(), Point::new(x, y)) {
            Ok(open) => open,
            Err(e) => {
                report_nav_error(&e);
                false
            }
        }
    }

    /// Plain move. Refused unless the straight line is clear: the server
    /// does not validate positions.
    pub fn move_to(&self, x: f64, y: f64) -> bool {
        if !self.can_move(x, y) {
            debug!("[SMART_MOVE] Refusing blocked move to ({:.0}, {:.0})", x, y);
            return false;
        }
        let from = self.store.position();
        self.store.begin_move(x, y);
        self.sink.emit_move(&from.map, from.point(), Point::new(x, y));
        true
    }
}

impl Drop for SmartMover {
    fn drop(&mut self) {
        self.halt_worker();
    }
}

impl Session {
    fn run(&self) {
        let origin = self.store.position();
        let planned = {
            let mut helper = lock(&self.helper);
            let result = self.processor.plan(&origin, &mut helper);
            if result.is_ok() {
                debug!("[SMART_MOVE] Planned {} waypoints", helper.waypoints().len());
            }
            result
        };
        if let Err(e) = planned {
            report_nav_error(&e);
            lock(&self.helper).deinit(true);
            return;
        }
        self.navigate();
    }

    /// Walk the queue front to back until it is empty, cancelled or stalled.
    fn navigate(&self) {
        let config = self.processor.config();
        loop {
            if !self.flags.can_run() {
                debug!("[SMART_MOVE] Navigation cancelled");
                lock(&self.helper).deinit(true);
                return;
            }

            let next = lock(&self.helper).pop_waypoint();
            let outcome = match next {
                None => {
                    let callback = lock(&self.helper).finished();
                    info!("[SMART_MOVE] Arrived");
                    if let Some(callback) = callback {
                        callback();
                    }
                    return;
                }
                Some(Waypoint::Move(point)) => {
                    let from = self.store.position();
                    self.store.begin_move(point.x, point.y);
                    self.sink.emit_move(&from.map, from.point(), point);
                    let tolerance = config.waypoint_tolerance;
                    self.wait_until(|| self.store.position().point().distance(point) <= tolerance)
                }
                Some(Waypoint::Transport(marker)) => {
                    let door = marker.door();
                    let radius = config.transport_trigger_radius;
                    match self.wait_until(|| self.store.position().point().distance(door) <= radius) {
                        Wait::Done => {
                            debug!("[SMART_MOVE] Transporting to {} (spawn {})", marker.map, marker.spawn);
                            self.sink.emit_transport(&marker.map, marker.spawn);
                            self.wait_until(|| self.store.position().map == marker.map)
                        }
                        other => other,
                    }
                }
            };

            match outcome {
                Wait::Done => {}
                Wait::Cancelled => {
                    debug!("[SMART_MOVE] Navigation cancelled while waiting");
                    lock(&self.helper).deinit(true);
                    return;
                }
                Wait::TimedOut => {
                    let pos = self.store.position();
                    warn!(
                        "[SMART_MOVE] No progress for {} ms at {} ({:.0}, {:.0}), giving up",
                        config.waypoint_timeout_ms, pos.map, pos.x, pos.y
                    );
                    lock(&self.helper).deinit(true);
                    return;
                }
            }
        }
    }

    fn wait_until(&self, mut done: impl FnMut() -> bool) -> Wait {
        let config = self.processor.config();
        let deadline = Instant::now() + Duration::from_millis(config.waypoint_timeout_ms);
        loop {
            if done() {
                return Wait::Done;
            }
            if !self.flags.can_run() {
                return Wait::Cancelled;
            }
            if Instant::now() >= deadline {
                return Wait::TimedOut;
            }
            thread::sleep(config.poll_interval());
        }
    }
}
