//! Error types for grid_astar

use std::fmt;

/// Main error type for grid search
#[derive(Debug, Clone, PartialEq)]
pub enum PathfindingError {
    /// Search was requested on a grid without a start or goal cell
    Configuration(String),
    /// Coordinates outside the grid
    OutOfBounds { x: i32, y: i32 },
    /// A heuristic produced a value that cannot be used as an estimate
    HeuristicEvaluation { heuristic: String, reason: String },
    /// Invalid parameter
    InvalidParameter(String),
    /// The run was aborted through its cancel flag
    Cancelled,
}

impl fmt::Display for PathfindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathfindingError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            PathfindingError::OutOfBounds { x, y } => {
                write!(f, "Out of bounds: ({}, {}) is outside the grid", x, y)
            }
            PathfindingError::HeuristicEvaluation { heuristic, reason } => {
                write!(f, "Heuristic '{}' failed: {}", heuristic, reason)
            }
            PathfindingError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PathfindingError::Cancelled => write!(f, "Search cancelled"),
        }
    }
}

impl std::error::Error for PathfindingError {}

/// Result type alias for grid search operations
pub type PathfindingResult<T> = Result<T, PathfindingError>;
