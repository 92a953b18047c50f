mod astar;
mod doors;
mod processor;
mod prune;
mod types;

#[cfg(test)]
mod tests;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use doors::{Door, DoorGraph, Landing};
pub use processor::{report_nav_error, MapProcessor};
pub use prune::prune_path;
pub use types::{Node, SearchParams, DIRECTIONS};
