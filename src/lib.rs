//! grid_astar - A* search on 8-connected occupancy grids
//!
//! This crate provides a grid graph with start/goal roles and walls, a
//! library of distance heuristics, an A* search engine with optional
//! step-by-step tracing, and line-of-sight path post-processing.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod path_planning;

// Re-export common types for convenience
pub use common::{CellKind, GridNode, GridPath, SearchState, UNREACHABLE};
pub use common::GridPathPlanner;
pub use common::{PathfindingError, PathfindingResult};
pub use path_planning::{AStarConfig, AStarPlanner, SearchMode, SearchReport, SearchStats};
pub use path_planning::{Heuristic, HeuristicRegistry};
pub use path_planning::{has_line_of_sight, path_cost, smooth_path};
pub use utils::GridMap;
