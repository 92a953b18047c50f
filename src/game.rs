pub mod collision;
pub mod commands;
pub mod config;
pub mod data;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod map;
pub mod math;
pub mod pathfinding;
pub mod simulation;
pub mod smart_move;

pub use collision::{can_move, Hitbox};
pub use commands::{ClientEvent, CommandSink, EventHooks, LogSink};
pub use config::NavigationConfig;
pub use data::GameData;
pub use entity::EntityStore;
pub use error::{DataError, NavError};
pub use math::{Point, Position};
pub use pathfinding::MapProcessor;
pub use simulation::Interpolator;
pub use smart_move::{Destination, SmartMoveHelper, SmartMover, Waypoint};
