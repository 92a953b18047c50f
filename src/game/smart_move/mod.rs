mod destination;
mod helper;
mod session;

pub use destination::Destination;
pub use helper::{Callback, SmartMoveFlags, SmartMoveHelper, SmartMoveState, TransportMarker, Waypoint};
pub use session::SmartMover;
