/// Tests for grid search, pruning and the door graph
///
/// Maps are built from small synthetic game data documents so every test
/// controls exactly which walls and doors exist.

use super::*;
use crate::game::collision::can_move;
use crate::game::config::{NavigationConfig, NeighborMode};
use crate::game::data::GameData;
use crate::game::error::{DataError, NavError};
use crate::game::math::Point;
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;

fn processor(maps: Value, geometry: Value, npcs: Value) -> MapProcessor {
    let data = GameData::from_value(json!({ "maps": maps, "geometry": geometry, "npcs": npcs }))
        .expect("valid game data");
    MapProcessor::process_maps(&data, &NavigationConfig::default()).expect("maps process")
}

fn bounds(x_lines: Value, y_lines: Value) -> Value {
    json!({ "x_lines": x_lines, "y_lines": y_lines, "min_x": -200, "min_y": -200, "max_x": 200, "max_y": 200 })
}

fn wall_processor() -> MapProcessor {
    processor(
        json!({ "main": { "spawns": [[0, 0]] } }),
        json!({ "main": bounds(json!([[50, -10, 10]]), json!([])) }),
        json!({}),
    )
}

fn running() -> AtomicBool {
    AtomicBool::new(true)
}

#[test]
fn test_search_detours_around_wall() {
    let processor = wall_processor();
    let start = Point::new(0.0, 0.0);
    let goal = Point::new(100.0, 0.0);
    assert!(!processor.can_move("main", start, goal).expect("known map"));

    let raw = processor
        .find_path("main", start, goal, 20.0, true, &running())
        .expect("path around the wall");
    println!("raw path: {} points", raw.len());
    assert_eq!(raw.first(), Some(&start));
    assert_eq!(raw.last(), Some(&goal));

    let pruned = processor.prune_path("main", &raw).expect("prunes");
    println!("pruned: {:?}", pruned);
    assert!(pruned.len() >= 3, "a detour needs at least one turn: {:?}", pruned);
    assert!(pruned.iter().any(|p| p.y.abs() > 10.0));
    assert_eq!(pruned.last(), Some(&goal));

    let geometry = &processor.map("main").expect("main").geometry;
    for pair in pruned.windows(2) {
        assert!(
            can_move(pair[0], pair[1], geometry, processor.hitbox()),
            "{:?} -> {:?} is not a straight move",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_prune_is_idempotent() {
    let processor = wall_processor();
    let raw = processor
        .find_path("main", Point::new(-150.0, -120.0), Point::new(150.0, 40.0), 20.0, true, &running())
        .expect("path");
    let once = processor.prune_path("main", &raw).expect("first prune");
    let twice = processor.prune_path("main", &once).expect("second prune");
    assert_eq!(once, twice);
}

#[test]
fn test_prune_single_point_and_empty() {
    let processor = wall_processor();
    let p = Point::new(3.0, 4.0);
    assert_eq!(processor.prune_path("main", &[p]).expect("single"), vec![p]);
    assert_eq!(processor.prune_path("main", &[]), Err(NavError::EmptyPath));
}

#[test]
fn test_prune_refuses_blocked_step() {
    let processor = wall_processor();
    // Consecutive raw points straddling the wall: no anchor can advance
    let raw = [Point::new(40.0, 0.0), Point::new(60.0, 0.0)];
    let err = processor.prune_path("main", &raw).unwrap_err();
    assert!(matches!(err, NavError::ZeroProgress { .. }));
    assert!(err.is_invariant());
}

#[test]
fn test_four_neighbor_mode_still_finds_path() {
    let data = GameData::from_value(json!({
        "maps": { "main": { "spawns": [[0, 0]] } },
        "geometry": { "main": bounds(json!([[50, -10, 10]]), json!([])) }
    }))
    .expect("valid");
    let config = NavigationConfig { neighbor_mode: NeighborMode::Four, ..NavigationConfig::default() };
    let processor = MapProcessor::process_maps(&data, &config).expect("process");
    let raw = processor
        .find_path("main", Point::new(0.0, 0.0), Point::new(100.0, 0.0), 20.0, true, &running())
        .expect("path");
    for pair in raw.windows(2).take(raw.len().saturating_sub(2)) {
        let d = pair[0].distance(pair[1]);
        assert!((d - 7.0).abs() < 1e-9, "non-cardinal step of {}", d);
    }
}

#[test]
fn test_enclosed_goal_has_no_path() {
    let processor = processor(
        json!({ "main": {} }),
        json!({ "main": bounds(json!([[80, 80, 120], [120, 80, 120]]), json!([[80, 80, 120], [120, 80, 120]])) }),
        json!({}),
    );
    let err = processor
        .find_path("main", Point::new(0.0, 0.0), Point::new(100.0, 100.0), 20.0, true, &running())
        .unwrap_err();
    assert!(matches!(err, NavError::NoPath { .. }));
    assert!(!err.is_invariant());
}

#[test]
fn test_cancelled_search_stops() {
    let processor = wall_processor();
    let stop = AtomicBool::new(false);
    let err = processor
        .find_path("main", Point::new(0.0, 0.0), Point::new(100.0, 0.0), 20.0, true, &stop)
        .unwrap_err();
    assert_eq!(err, NavError::Cancelled);
}

#[test]
fn test_unknown_map_is_an_error() {
    let processor = wall_processor();
    assert_eq!(
        processor.can_move("nowhere", Point::ZERO, Point::ZERO),
        Err(NavError::UnknownMap("nowhere".into()))
    );
}

#[test]
fn test_door_graph_shortest_hops() {
    let mut graph = DoorGraph::default();
    for (from, to) in [("a", "b"), ("b", "c"), ("c", "e"), ("a", "d"), ("d", "e"), ("e", "a")] {
        graph.add_edge(from, to);
    }

    let cases = [
        ("a", "e", 3),
        ("a", "c", 3),
        ("b", "a", 4),
        ("d", "b", 4),
        ("e", "d", 3),
        ("c", "c", 1),
    ];
    for (from, to, len) in cases {
        let route = graph.door_dijkstra(from, to);
        println!("{} -> {}: {:?}", from, to, route);
        assert_eq!(route.len(), len, "{} -> {}", from, to);
        assert_eq!(route.first().map(String::as_str), Some(from));
        assert_eq!(route.last().map(String::as_str), Some(to));
        for hop in route.windows(2) {
            assert!(graph.predecessors(&hop[1]).any(|p| p == hop[0]), "no edge {:?}", hop);
        }
    }
    assert_eq!(graph.door_dijkstra("a", "d"), vec!["a", "d"]);
    assert!(graph.door_dijkstra("a", "f").is_empty());
    assert!(graph.door_dijkstra("f", "a").is_empty());
}

#[test]
fn test_transporter_preferred_over_door() {
    let processor = processor(
        json!({
            "a": {
                "spawns": [[0, 0]],
                "doors": [[100, 0, 10, 10, "b", 0]],
                "npcs": [{ "id": "transporter", "position": [-100, 0] }]
            },
            "b": { "spawns": [[5, 5]] }
        }),
        json!({ "a": bounds(json!([]), json!([])), "b": bounds(json!([]), json!([])) }),
        json!({ "transporter": { "places": { "a": 0, "b": 0 } } }),
    );
    let door = processor.door_to("a", "b").expect("door to b");
    assert!(door.is_transporter);
    assert_eq!(door.position(), Point::new(-100.0, 0.0));
    assert!(!door.leads_to("a"));
    assert!(processor.door_to("b", "a").is_none());
}

#[test]
fn test_door_to_unknown_map_fails_preprocessing() {
    let data = GameData::from_value(json!({
        "maps": { "a": { "doors": [[0, 0, 10, 10, "missing", 0]] } },
        "geometry": { "a": bounds(json!([]), json!([])) }
    }))
    .expect("valid");
    let err = MapProcessor::process_maps(&data, &NavigationConfig::default()).unwrap_err();
    assert!(matches!(err, DataError::UnknownDoorTarget { ref target, .. } if target == "missing"));
}

#[test]
fn test_missing_geometry_fails_preprocessing() {
    let data = GameData::from_value(json!({ "maps": { "a": {} } })).expect("valid");
    let err = MapProcessor::process_maps(&data, &NavigationConfig::default()).unwrap_err();
    assert!(matches!(err, DataError::MissingGeometry(ref m) if m == "a"));
}

#[test]
fn test_transporter_without_places_fails_preprocessing() {
    let data = GameData::from_value(json!({
        "maps": { "a": { "npcs": [{ "id": "transporter", "position": [0, 0] }] } },
        "geometry": { "a": bounds(json!([]), json!([])) }
    }))
    .expect("valid");
    let err = MapProcessor::process_maps(&data, &NavigationConfig::default()).unwrap_err();
    assert!(matches!(err, DataError::MissingTransporterPlaces(_)));
}

#[test]
fn test_ignored_maps_are_skipped() {
    let processor = processor(
        json!({
            "a": { "spawns": [[0, 0]], "doors": [[0, 0, 10, 10, "jail", 0]] },
            "jail": { "spawns": [[0, 0]], "ignore": true },
            "void": { "no_bounds": true }
        }),
        json!({ "a": bounds(json!([]), json!([])) }),
        json!({}),
    );
    assert_eq!(processor.map_names().collect::<Vec<_>>(), vec!["a"]);
    // The door exists but never shows up in routes
    assert_eq!(processor.map("a").expect("a").doors.len(), 1);
    assert!(processor.door_dijkstra("a", "jail").is_empty());
}
