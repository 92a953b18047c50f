use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::time::{Duration, Instant};

use wayfarer::game::commands::CommandSink;
use wayfarer::game::config::NavigationConfig;
use wayfarer::game::data::GameData;
use wayfarer::game::entity::{Character, EntityPosition, EntityStore};
use wayfarer::game::math::Point;
use wayfarer::game::pathfinding::MapProcessor;
use wayfarer::game::simulation::Interpolator;
use wayfarer::game::smart_move::{Destination, SmartMover};
use wayfarer::game::Position;

fn world() -> (Arc<GameData>, Arc<MapProcessor>) {
    world_with(NavigationConfig::default())
}

fn world_with(config: NavigationConfig) -> (Arc<GameData>, Arc<MapProcessor>) {
    let open = json!({ "x_lines": [], "y_lines": [], "min_x": -200, "min_y": -200, "max_x": 200, "max_y": 200 });
    let data = GameData::from_value(json!({
        "maps": {
            "a": { "spawns": [[0, 0]], "doors": [[10, 10, 20, 20, "b", 0]] },
            "b": { "spawns": [[5, 5]] }
        },
        "geometry": {
            "a": { "x_lines": [[50, -10, 10]], "y_lines": [], "min_x": -200, "min_y": -200, "max_x": 200, "max_y": 200 },
            "b": open
        }
    }))
    .expect("valid game data");
    let processor = MapProcessor::process_maps(&data, &config).expect("maps process");
    (Arc::new(data), Arc::new(processor))
}

fn store_at(map: &str, x: f64, y: f64) -> Arc<EntityStore> {
    Arc::new(EntityStore::new(Character::new("tester", EntityPosition::new(map, x, y, 2000.0))))
}

/// Server stand-in that completes every command instantly.
struct TeleportSink {
    store: Arc<EntityStore>,
    data: Arc<GameData>,
    log: Mutex<Vec<String>>,
}

impl CommandSink for TeleportSink {
    fn emit_move(&self, map: &str, _from: Point, to: Point) {
        self.log.lock().expect("log").push(format!("move {} {} {}", map, to.x, to.y));
        self.store.place_character(map, to.x, to.y);
    }

    fn emit_transport(&self, map: &str, spawn: usize) {
        self.log.lock().expect("log").push(format!("transport {} {}", map, spawn));
        let landing = self.data.spawn(map, spawn).expect("spawn exists");
        self.store.place_character(map, landing.x, landing.y);
    }
}

/// Server that never answers; the character only moves if something
/// else advances it.
struct SilentSink;

impl CommandSink for SilentSink {
    fn emit_move(&self, _map: &str, _from: Point, _to: Point) {}
    fn emit_transport(&self, _map: &str, _spawn: usize) {}
}

fn wait_for(what: &str, timeout: Duration, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_smart_move_across_a_door_runs_callback_once() {
    let (data, processor) = world();
    let store = store_at("a", -100.0, 0.0);
    let sink = Arc::new(TeleportSink { store: Arc::clone(&store), data: Arc::clone(&data), log: Mutex::new(Vec::new()) });
    let mover = SmartMover::new(processor, data, Arc::clone(&store), sink.clone());

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let c = Arc::clone(&calls);
    let started = mover.smart_move_with(Position::new("b", 80.0, -40.0), move || {
        c.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(());
    });
    assert!(started);

    rx.recv_timeout(Duration::from_secs(10)).expect("callback fired");
    wait_for("session to end", Duration::from_secs(5), || !mover.is_smart_moving());

    let pos = store.position();
    assert_eq!((pos.map.as_str(), pos.x, pos.y), ("b", 80.0, -40.0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let log = sink.log.lock().expect("log").clone();
    println!("commands: {:?}", log);
    assert!(log.contains(&"transport b 0".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("move b 80 -40"));
    assert!(mover.waypoints().is_empty());
}

#[test]
fn test_unknown_destination_is_refused() {
    let (data, processor) = world();
    let store = store_at("a", 0.0, 0.0);
    let mover = SmartMover::new(processor, data, store, Arc::new(SilentSink));

    assert!(!mover.smart_move("dragon"));
    assert!(!mover.is_smart_moving());
}

#[test]
fn test_stop_cancels_a_stalled_walk() {
    let (data, processor) = world();
    let store = store_at("a", 0.0, 0.0);
    let mover = SmartMover::new(processor, data, store, Arc::new(SilentSink));

    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    assert!(mover.smart_move_with(Destination::Coordinates { x: 100.0, y: 0.0 }, move || {
        c.fetch_add(1, Ordering::SeqCst);
    }));
    wait_for("search to finish", Duration::from_secs(10), || !mover.is_searching());
    assert!(mover.is_smart_moving(), "nothing moves the character, the walk must still be pending");

    mover.stop();
    assert!(!mover.is_smart_moving());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_requests_leave_one_worker() {
    let (data, processor) = world();

    for round in 0..20 {
        let store = store_at("a", 0.0, 0.0);
        let mover = SmartMover::new(Arc::clone(&processor), Arc::clone(&data), Arc::clone(&store), Arc::new(SilentSink));
        let barrier = Barrier::new(2);

        let (first, second) = std::thread::scope(|s| {
            let a = s.spawn(|| {
                barrier.wait();
                mover.smart_move((-100.0, 0.0))
            });
            let b = s.spawn(|| {
                barrier.wait();
                mover.smart_move((0.0, -100.0))
            });
            (a.join().expect("caller a"), b.join().expect("caller b"))
        });
        assert!(first && second, "round {}", round);

        // Test + mover + exactly one live worker session; the walk never completes
        assert_eq!(Arc::strong_count(&store), 3, "round {}: extra worker alive", round);
        assert!(mover.is_smart_moving());

        mover.stop();
        assert_eq!(Arc::strong_count(&store), 2, "round {}: worker outlived stop", round);
    }
}

#[test]
fn test_pause_ends_the_session_and_allows_a_new_one() {
    // Long enough for the worker to see the flag between two polls
    let (data, processor) = world_with(NavigationConfig { stop_pause_ms: 250, ..NavigationConfig::default() });
    let store = store_at("a", 0.0, 0.0);
    let mover = SmartMover::new(processor, data, store, Arc::new(SilentSink));

    assert!(mover.smart_move((-100.0, 0.0)));
    wait_for("search to finish", Duration::from_secs(10), || !mover.is_searching());

    mover.pause();
    wait_for("worker to observe the pause", Duration::from_secs(5), || !mover.is_smart_moving());

    assert!(mover.smart_move((-50.0, 0.0)));
    assert!(mover.is_smart_moving());
    mover.stop();
}

#[test]
fn test_interpolated_walk_and_superseded_request() {
    let (data, processor) = world();
    let store = store_at("a", 0.0, 0.0);
    let mut sim = Interpolator::spawn(Duration::from_millis(5)).expect("interpolator thread");
    sim.register(&store);
    let mover = SmartMover::new(processor, data, Arc::clone(&store), Arc::new(SilentSink));

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&first);
    let s = Arc::clone(&second);

    // Around the wall on the far side; replaced straight away
    assert!(mover.smart_move_with((100.0, 0.0), move || {
        f.fetch_add(1, Ordering::SeqCst);
    }));
    assert!(mover.smart_move_with((-60.0, 30.0), move || {
        s.fetch_add(1, Ordering::SeqCst);
    }));

    wait_for("second request to arrive", Duration::from_secs(10), || second.load(Ordering::SeqCst) == 1);
    sim.stop();

    let pos = store.position();
    println!("arrived at ({}, {})", pos.x, pos.y);
    assert!(pos.point().distance(Point::new(-60.0, 30.0)) <= 1.0);
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert!(!mover.is_smart_moving());
}

#[test]
fn test_move_to_checks_walls() {
    let (data, processor) = world();
    let store = store_at("a", 0.0, 0.0);
    let mover = SmartMover::new(processor, data, Arc::clone(&store), Arc::new(SilentSink));

    assert!(!mover.can_move(100.0, 0.0));
    assert!(!mover.move_to(100.0, 0.0));
    assert!(!store.is_moving());

    assert!(mover.can_move(0.0, 100.0));
    assert!(mover.move_to(0.0, 100.0));
    let character = store.character();
    assert!(character.position.moving);
    assert_eq!((character.position.going_x, character.position.going_y), (0.0, 100.0));
}
