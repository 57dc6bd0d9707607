//! Common traits defining interfaces for grid search algorithms

use crate::common::error::PathfindingResult;
use crate::path_planning::a_star::SearchReport;
use crate::utils::GridMap;

/// Trait for grid-based path planning algorithms
pub trait GridPathPlanner {
    /// Search from the grid's start cell to its goal cell.
    ///
    /// `Ok` covers both outcomes of a completed search; a missing start
    /// or goal is an `Err`.
    fn find_path(&mut self, grid: &mut GridMap) -> PathfindingResult<SearchReport>;

    /// Name of the heuristic driving the search
    fn heuristic_name(&self) -> String;
}
