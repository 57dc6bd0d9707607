//! A* path planning on a grid
//!
//! Best-first search over the 8-connected grid of a [`GridMap`]. The open set
//! is a plain binary heap ordered by `f` and then `h` (closer to the goal
//! wins a tie). Improving a cell that is already open pushes a second entry
//! instead of decreasing its key; entries popped for an already-closed cell
//! are skipped.
//!
//! The goal test is lazy: a search ends when the goal is popped, not when it
//! is first discovered.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, trace, warn};
use ordered_float::OrderedFloat;

use crate::common::{GridNode, GridPath, GridPathPlanner, PathfindingError, PathfindingResult};
use crate::path_planning::heuristics::{Heuristic, HeuristicRegistry};
use crate::utils::GridMap;

/// How much of every iteration is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceMode {
    /// No step records
    #[default]
    Off,
    /// Expanded cell, its neighbours and open/closed counts
    Summary,
    /// Summary plus the identities of every open and closed cell
    Full,
}

/// Configuration for A* planner
#[derive(Debug, Clone, Default)]
pub struct AStarConfig {
    /// Distance estimate to the goal
    pub heuristic: Heuristic,
    /// Step recording
    pub trace_mode: TraceMode,
}

impl AStarConfig {
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_trace_mode(mut self, trace_mode: TraceMode) -> Self {
        self.trace_mode = trace_mode;
        self
    }
}

/// Search direction requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchMode {
    Forward,
    /// Not implemented; answered with a forward search
    Bidirectional,
}

/// Lifecycle of the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Running,
    PathFound,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepAction {
    Exploring,
    GoalReached,
}

/// One iteration of a traced search
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepRecord {
    /// Iteration number, starting at 1
    pub step: usize,
    pub action: StepAction,
    /// Cell popped from the open set
    pub cell: GridNode,
    pub g_cost: u32,
    pub f_cost: f64,
    /// Neighbours considered; empty for the goal step
    pub neighbors: Vec<GridNode>,
    pub open_count: usize,
    pub closed_count: usize,
    /// Only with `TraceMode::Full`
    pub open_cells: Option<Vec<GridNode>>,
    /// Only with `TraceMode::Full`, in closing order
    pub closed_cells: Option<Vec<GridNode>>,
}

/// Statistics of the last search
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchStats {
    /// Cells closed
    pub nodes_explored: usize,
    /// Distinct cells ever pushed to the open set, start included
    pub nodes_opened: usize,
    /// Number of cells in the path
    pub path_length: usize,
    /// g-cost of the goal, 0 when no path was found
    pub path_cost: u32,
    pub heuristic: String,
    pub path_found: bool,
    pub total_steps: usize,
}

/// Outcome of a completed search, found or not
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchReport {
    /// Start to goal inclusive, empty when no path exists
    pub path: GridPath,
    pub stats: SearchStats,
    pub requested_mode: SearchMode,
    pub performed_mode: SearchMode,
}

impl SearchReport {
    pub fn success(&self) -> bool {
        self.stats.path_found
    }

    pub fn bidirectional_performed(&self) -> bool {
        self.performed_mode == SearchMode::Bidirectional
    }
}

/// Open set entry, ordered by f, then h, then cell index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    h: OrderedFloat<f64>,
    index: usize,
}

type OpenSet = BinaryHeap<Reverse<OpenEntry>>;

/// A* path planner
///
/// Owns configuration, the statistics of the last run and its trace. The
/// per-cell search state lives in the grid, so a grid is borrowed mutably
/// for the duration of a search.
pub struct AStarPlanner {
    config: AStarConfig,
    registry: HeuristicRegistry,
    phase: SearchPhase,
    stats: SearchStats,
    steps: Vec<StepRecord>,
    cancel: Option<Arc<AtomicBool>>,
}

impl AStarPlanner {
    /// Create a new A* planner
    pub fn new(config: AStarConfig) -> Self {
        AStarPlanner {
            config,
            registry: HeuristicRegistry::default(),
            phase: SearchPhase::Idle,
            stats: SearchStats::default(),
            steps: Vec::new(),
            cancel: None,
        }
    }

    /// Create from a registered heuristic name; unknown names fall back
    /// to euclidean
    pub fn from_heuristic_name(name: &str) -> Self {
        let heuristic = HeuristicRegistry::default().resolve(name);
        Self::new(AStarConfig::default().with_heuristic(heuristic))
    }

    /// Weighted A*: the heuristic is scaled by `weight`
    pub fn weighted(base: Heuristic, weight: f64) -> Self {
        Self::new(AStarConfig::default().with_heuristic(Heuristic::weighted(base, weight)))
    }

    /// Abort runs at the next iteration once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &AStarConfig {
        &self.config
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Statistics of the last completed search
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Trace of the last search
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepRecord> {
        self.steps.get(index)
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Swap the heuristic; results of the previous run are discarded
    pub fn set_heuristic(&mut self, heuristic: Heuristic) {
        self.config.heuristic = heuristic;
        self.discard_results();
    }

    pub fn set_heuristic_by_name(&mut self, name: &str) {
        let heuristic = self.registry.resolve(name);
        self.set_heuristic(heuristic);
    }

    pub fn set_trace_mode(&mut self, trace_mode: TraceMode) {
        self.config.trace_mode = trace_mode;
    }

    pub fn registry(&self) -> &HeuristicRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HeuristicRegistry {
        &mut self.registry
    }

    pub fn available_heuristics(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Every registered heuristic evaluated for one pair of cells
    pub fn compare_heuristics(&self, a: GridNode, b: GridNode) -> BTreeMap<String, f64> {
        self.registry.compare(a, b)
    }

    /// Plan from the grid's start to its goal
    pub fn find_path(&mut self, grid: &mut GridMap) -> PathfindingResult<SearchReport> {
        self.find_path_with_mode(grid, SearchMode::Forward)
    }

    /// Plan with an explicit search mode.
    ///
    /// Only forward search exists. A bidirectional request runs the forward
    /// search and says so in `SearchReport::performed_mode`.
    pub fn find_path_with_mode(
        &mut self,
        grid: &mut GridMap,
        mode: SearchMode,
    ) -> PathfindingResult<SearchReport> {
        if mode == SearchMode::Bidirectional {
            warn!("[AStar] bidirectional search is not implemented, running forward search");
        }

        let (start, goal) = match (grid.start(), grid.goal()) {
            (Some(start), Some(goal)) => (start, goal),
            (None, _) => {
                return Err(PathfindingError::Configuration(
                    "start cell is not set".to_string(),
                ))
            }
            (_, None) => {
                return Err(PathfindingError::Configuration(
                    "goal cell is not set".to_string(),
                ))
            }
        };

        self.discard_results();
        self.stats.heuristic = self.config.heuristic.name();
        self.phase = SearchPhase::Running;

        match self.search(grid, start, goal) {
            Ok(path) => {
                self.phase = if self.stats.path_found {
                    SearchPhase::PathFound
                } else {
                    SearchPhase::Exhausted
                };
                self.stats.total_steps = self.steps.len();
                Ok(SearchReport {
                    path,
                    stats: self.stats.clone(),
                    requested_mode: mode,
                    performed_mode: SearchMode::Forward,
                })
            }
            Err(e) => {
                debug!("[AStar] search aborted: {}", e);
                self.discard_results();
                Err(e)
            }
        }
    }

    fn search(
        &mut self,
        grid: &mut GridMap,
        start: GridNode,
        goal: GridNode,
    ) -> PathfindingResult<GridPath> {
        debug!(
            "[AStar] find_path: start=({},{}) goal=({},{}) heuristic={}",
            start.x, start.y, goal.x, goal.y, self.stats.heuristic
        );

        grid.reset_search_state();
        let heuristic = self.config.heuristic.clone();
        let start_index = Self::cell_index(grid, start)?;
        let goal_index = Self::cell_index(grid, goal)?;

        let h_start = heuristic.evaluate(start, goal)?;
        {
            let state = grid.state_at_mut(start_index);
            state.g_cost = 0;
            state.h_cost = h_start;
            state.f_cost = h_start;
            state.in_open = true;
        }

        let mut open_set: OpenSet = BinaryHeap::new();
        open_set.push(Reverse(OpenEntry {
            f: OrderedFloat(h_start),
            h: OrderedFloat(h_start),
            index: start_index,
        }));
        let mut open_count = 1;
        let mut closed_order: Vec<usize> = Vec::new();
        self.stats.nodes_opened = 1;

        let mut iteration = 0;
        loop {
            self.check_cancelled()?;

            let Some(Reverse(entry)) = open_set.pop() else {
                break;
            };
            let current_index = entry.index;

            // stale duplicate of a finalized cell
            if grid.state_at(current_index).visited {
                continue;
            }

            iteration += 1;
            let current = grid.node_at(current_index);
            let current_g = {
                let state = grid.state_at_mut(current_index);
                state.in_open = false;
                state.g_cost
            };
            open_count -= 1;

            if current_index == goal_index {
                let path = Self::reconstruct_path(grid, goal_index);
                self.stats.path_found = true;
                self.stats.path_length = path.len();
                self.stats.path_cost = current_g;
                debug!(
                    "[AStar] goal reached after {} iterations, {} cells closed, cost {}",
                    iteration, self.stats.nodes_explored, current_g
                );
                self.record_step(
                    grid,
                    iteration,
                    StepAction::GoalReached,
                    current_index,
                    Vec::new(),
                    &open_set,
                    open_count,
                    &closed_order,
                );
                return Ok(path);
            }

            grid.state_at_mut(current_index).visited = true;
            closed_order.push(current_index);
            self.stats.nodes_explored += 1;

            let neighbors = grid.neighbors(current);
            for &neighbor in &neighbors {
                let neighbor_index = Self::cell_index(grid, neighbor)?;
                if grid.state_at(neighbor_index).visited {
                    continue;
                }

                let tentative_g = current_g.saturating_add(grid.edge_cost(current, neighbor));
                if tentative_g >= grid.state_at(neighbor_index).g_cost {
                    continue;
                }

                let h = heuristic.evaluate(neighbor, goal)?;
                let state = grid.state_at_mut(neighbor_index);
                state.parent = Some(current_index);
                state.g_cost = tentative_g;
                state.h_cost = h;
                state.f_cost = tentative_g as f64 + h;
                let f = state.f_cost;
                if !state.in_open {
                    state.in_open = true;
                    open_count += 1;
                    self.stats.nodes_opened += 1;
                }

                open_set.push(Reverse(OpenEntry {
                    f: OrderedFloat(f),
                    h: OrderedFloat(h),
                    index: neighbor_index,
                }));
            }

            trace!(
                "[AStar] iteration {}: expanded ({},{}) g={} open={} closed={}",
                iteration,
                current.x,
                current.y,
                current_g,
                open_count,
                closed_order.len()
            );
            self.record_step(
                grid,
                iteration,
                StepAction::Exploring,
                current_index,
                neighbors,
                &open_set,
                open_count,
                &closed_order,
            );
        }

        debug!(
            "[AStar] no path: open set exhausted after expanding {} nodes",
            self.stats.nodes_explored
        );
        Ok(GridPath::new())
    }

    #[allow(clippy::too_many_arguments)]
    fn record_step(
        &mut self,
        grid: &GridMap,
        iteration: usize,
        action: StepAction,
        cell_index: usize,
        neighbors: Vec<GridNode>,
        open_set: &OpenSet,
        open_count: usize,
        closed_order: &[usize],
    ) {
        if self.config.trace_mode == TraceMode::Off {
            return;
        }

        let (open_cells, closed_cells) = if self.config.trace_mode == TraceMode::Full {
            let open_cells = open_set
                .iter()
                .map(|Reverse(entry)| entry.index)
                .filter(|&i| grid.state_at(i).in_open)
                .sorted()
                .dedup()
                .map(|i| grid.node_at(i))
                .collect();
            let closed_cells = closed_order.iter().map(|&i| grid.node_at(i)).collect();
            (Some(open_cells), Some(closed_cells))
        } else {
            (None, None)
        };

        let state = grid.state_at(cell_index);
        self.steps.push(StepRecord {
            step: iteration,
            action,
            cell: grid.node_at(cell_index),
            g_cost: state.g_cost,
            f_cost: state.f_cost,
            neighbors,
            open_count,
            closed_count: closed_order.len(),
            open_cells,
            closed_cells,
        });
    }

    fn reconstruct_path(grid: &GridMap, goal_index: usize) -> GridPath {
        let mut cells = Vec::new();
        let mut current_index = Some(goal_index);

        while let Some(index) = current_index {
            cells.push(grid.node_at(index));
            current_index = grid.state_at(index).parent;
        }

        cells.reverse();
        GridPath::from_cells(cells)
    }

    fn cell_index(grid: &GridMap, node: GridNode) -> PathfindingResult<usize> {
        grid.index(node).ok_or(PathfindingError::OutOfBounds {
            x: node.x,
            y: node.y,
        })
    }

    fn check_cancelled(&self) -> PathfindingResult<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(PathfindingError::Cancelled),
            _ => Ok(()),
        }
    }

    fn discard_results(&mut self) {
        self.phase = SearchPhase::Idle;
        self.stats = SearchStats::default();
        self.steps.clear();
    }
}

impl Default for AStarPlanner {
    fn default() -> Self {
        Self::new(AStarConfig::default())
    }
}

impl GridPathPlanner for AStarPlanner {
    fn find_path(&mut self, grid: &mut GridMap) -> PathfindingResult<SearchReport> {
        self.find_path_with_mode(grid, SearchMode::Forward)
    }

    fn heuristic_name(&self) -> String {
        self.config.heuristic.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CellKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn open_grid(width: usize, height: usize, start: (i32, i32), goal: (i32, i32)) -> GridMap {
        let mut grid = GridMap::new(width, height);
        grid.set_start(start.0, start.1).unwrap();
        grid.set_goal(goal.0, goal.1).unwrap();
        grid
    }

    fn random_grid(seed: u64) -> GridMap {
        let mut grid = GridMap::new(20, 20);
        grid.random_walls(0.3, &mut StdRng::seed_from_u64(seed)).unwrap();
        grid.set_start(0, 0).unwrap();
        grid.set_goal(19, 19).unwrap();
        grid
    }

    fn octile(a: GridNode, b: GridNode) -> u32 {
        Heuristic::Octile.evaluate(a, b).unwrap() as u32
    }

    fn assert_valid_path(grid: &GridMap, path: &GridPath) {
        assert_eq!(path.first().copied(), grid.start());
        assert_eq!(path.last().copied(), grid.goal());
        assert!(path.is_connected());
        assert!(path.iter().all(|&c| !grid.is_wall(c)));
    }

    #[test]
    fn test_open_grid_diagonal() {
        let mut grid = open_grid(5, 5, (0, 0), (4, 4));
        let mut planner = AStarPlanner::from_heuristic_name("octile");
        let report = planner.find_path(&mut grid).unwrap();

        assert!(report.success());
        let expected: Vec<GridNode> = (0..5).map(|i| GridNode::new(i, i)).collect();
        assert_eq!(report.path.cells, expected);
        assert_eq!(report.stats.path_cost, 56);
        assert_eq!(report.stats.path_length, 5);
        assert_eq!(report.stats.nodes_explored, 4);
        assert_eq!(report.stats.heuristic, "octile");
        assert_eq!(planner.phase(), SearchPhase::PathFound);
    }

    #[test]
    fn test_start_equals_goal() {
        let mut grid = open_grid(4, 4, (2, 1), (2, 1));
        let mut planner = AStarPlanner::default();
        let report = planner.find_path(&mut grid).unwrap();

        assert!(report.success());
        assert_eq!(report.path.cells, vec![GridNode::new(2, 1)]);
        assert_eq!(report.stats.nodes_explored, 0);
        assert_eq!(report.stats.path_cost, 0);
    }

    #[test]
    fn test_missing_endpoints_is_configuration_error() {
        let mut grid = GridMap::new(5, 5);
        let mut planner = AStarPlanner::default();
        assert!(matches!(
            planner.find_path(&mut grid),
            Err(PathfindingError::Configuration(_))
        ));

        grid.set_start(0, 0).unwrap();
        assert!(matches!(
            planner.find_path(&mut grid),
            Err(PathfindingError::Configuration(_))
        ));
        assert_eq!(planner.phase(), SearchPhase::Idle);
        assert_eq!(planner.total_steps(), 0);
    }

    #[test]
    fn test_separating_wall_exhausts_start_side() {
        let mut grid = open_grid(9, 5, (0, 2), (8, 2));
        for x in 3..6 {
            for y in 0..5 {
                grid.set_wall(x, y).unwrap();
            }
        }
        let mut planner = AStarPlanner::from_heuristic_name("octile");
        let report = planner.find_path(&mut grid).unwrap();

        assert!(!report.success());
        assert!(report.path.is_empty());
        assert_eq!(report.stats.nodes_explored, 15);
        assert_eq!(report.stats.path_length, 0);
        assert_eq!(planner.phase(), SearchPhase::Exhausted);
    }

    #[test]
    fn test_weighted_search_expands_no_more() {
        let build = || {
            let mut grid = open_grid(12, 12, (2, 5), (10, 6));
            for y in 2..10 {
                grid.set_wall(6, y).unwrap();
            }
            grid
        };

        let mut plain = AStarPlanner::weighted(Heuristic::Euclidean, 1.0);
        let mut greedy = AStarPlanner::weighted(Heuristic::Euclidean, 3.0);
        let plain_report = plain.find_path(&mut build()).unwrap();
        let greedy_report = greedy.find_path(&mut build()).unwrap();

        assert!(plain_report.success() && greedy_report.success());
        assert!(greedy_report.stats.nodes_explored <= plain_report.stats.nodes_explored);
        assert!(greedy_report.stats.path_cost >= plain_report.stats.path_cost);
        assert_eq!(greedy_report.stats.heuristic, "weighted_euclidean_3");
    }

    #[test]
    fn test_octile_is_optimal_on_open_grid() {
        let pairs = [((0, 0), (9, 3)), ((7, 1), (2, 8)), ((5, 5), (5, 0)), ((9, 9), (0, 4))];
        for &(start, goal) in &pairs {
            let mut grid = open_grid(10, 10, start, goal);
            let report = AStarPlanner::from_heuristic_name("octile")
                .find_path(&mut grid)
                .unwrap();
            let expected = octile(start.into(), goal.into());
            assert_eq!(report.stats.path_cost, expected);
            assert_eq!(crate::path_planning::path_cost(&grid, &report.path), expected);
        }
    }

    #[test]
    fn test_paths_are_valid_and_optimal_on_random_grids() {
        for seed in 0..10 {
            let mut grid = random_grid(seed);
            let octile_report = AStarPlanner::from_heuristic_name("octile")
                .find_path(&mut grid)
                .unwrap();
            let dijkstra_report = AStarPlanner::weighted(Heuristic::Euclidean, 0.0)
                .find_path(&mut grid)
                .unwrap();

            assert_eq!(octile_report.success(), dijkstra_report.success());
            if octile_report.success() {
                assert_valid_path(&grid, &octile_report.path);
                assert_eq!(octile_report.stats.path_cost, dijkstra_report.stats.path_cost);
            }
        }
    }

    #[test]
    fn test_inadmissible_heuristics_still_return_valid_paths() {
        for name in ["hamming", "canberra", "weighted_euclidean", "manhattan", "minkowski"] {
            let mut grid = random_grid(3);
            grid.set_goal(17, 12).unwrap();
            let mut planner = AStarPlanner::from_heuristic_name(name);
            let report = planner.find_path(&mut grid).unwrap();
            if report.success() {
                assert_valid_path(&grid, &report.path);
                let cost = crate::path_planning::path_cost(&grid, &report.path);
                assert_eq!(cost, report.stats.path_cost, "{}", name);
            }
        }
    }

    #[test]
    fn test_repeated_searches_are_deterministic() {
        let mut grid = random_grid(11);
        let mut planner =
            AStarPlanner::new(AStarConfig::default().with_trace_mode(TraceMode::Full));

        let first = planner.find_path(&mut grid).unwrap();
        let first_steps = planner.steps().to_vec();
        let second = planner.find_path(&mut grid).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_steps, planner.steps());
    }

    #[test]
    fn test_dijkstra_ordering_closes_in_cost_order() {
        let mut grid = random_grid(5);
        let mut planner = AStarPlanner::new(
            AStarConfig::default()
                .with_heuristic(Heuristic::weighted(Heuristic::Euclidean, 0.0))
                .with_trace_mode(TraceMode::Summary),
        );
        planner.find_path(&mut grid).unwrap();

        let closed_g: Vec<u32> = planner
            .steps()
            .iter()
            .filter(|s| s.action == StepAction::Exploring)
            .map(|s| s.g_cost)
            .collect();
        assert!(!closed_g.is_empty());
        assert!(closed_g.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_consistent_heuristic_closes_in_f_order() {
        let mut grid = random_grid(8);
        let mut planner = AStarPlanner::new(
            AStarConfig::default()
                .with_heuristic(Heuristic::Octile)
                .with_trace_mode(TraceMode::Summary),
        );
        planner.find_path(&mut grid).unwrap();

        let f: Vec<f64> = planner.steps().iter().map(|s| s.f_cost).collect();
        assert!(f.windows(2).all(|w| w[0] <= w[1] + 1e-9));
    }

    #[test]
    fn test_closed_cells_keep_their_cost() {
        let mut grid = random_grid(2);
        let mut planner =
            AStarPlanner::new(AStarConfig::default().with_trace_mode(TraceMode::Summary));
        planner.find_path(&mut grid).unwrap();

        for step in planner.steps() {
            if step.action == StepAction::Exploring {
                let state = grid.state(step.cell).unwrap();
                assert!(state.visited);
                assert_eq!(state.g_cost, step.g_cost);
            }
        }
    }

    #[test]
    fn test_trace_off_records_nothing() {
        let mut grid = open_grid(6, 6, (0, 0), (5, 3));
        let mut planner = AStarPlanner::default();
        let report = planner.find_path(&mut grid).unwrap();
        assert_eq!(planner.total_steps(), 0);
        assert_eq!(report.stats.total_steps, 0);
    }

    #[test]
    fn test_summary_trace() {
        let mut grid = open_grid(6, 6, (0, 0), (5, 3));
        let mut planner = AStarPlanner::new(
            AStarConfig::default()
                .with_heuristic(Heuristic::Octile)
                .with_trace_mode(TraceMode::Summary),
        );
        let report = planner.find_path(&mut grid).unwrap();

        let steps = planner.steps();
        assert_eq!(report.stats.total_steps, steps.len());
        assert_eq!(steps.len(), report.stats.nodes_explored + 1);
        assert_eq!(steps[0].step, 1);
        assert_eq!(steps[0].cell, GridNode::new(0, 0));
        assert_eq!(steps[0].neighbors.len(), 3);
        assert_eq!(steps[0].closed_count, 1);
        assert!(steps.iter().all(|s| s.open_cells.is_none() && s.closed_cells.is_none()));

        let last = steps.last().unwrap();
        assert_eq!(last.action, StepAction::GoalReached);
        assert_eq!(last.cell, GridNode::new(5, 3));
        assert!(last.neighbors.is_empty());
        assert_eq!(planner.step(0), Some(&steps[0]));
        assert_eq!(planner.step(steps.len()), None);
    }

    #[test]
    fn test_full_trace_snapshots() {
        let mut grid = random_grid(4);
        let mut planner =
            AStarPlanner::new(AStarConfig::default().with_trace_mode(TraceMode::Full));
        planner.find_path(&mut grid).unwrap();

        for step in planner.steps() {
            let open = step.open_cells.as_ref().unwrap();
            let closed = step.closed_cells.as_ref().unwrap();
            assert_eq!(open.len(), step.open_count);
            assert_eq!(closed.len(), step.closed_count);
            assert!(open.iter().all(|c| !closed.contains(c)));
            if step.action == StepAction::Exploring {
                assert_eq!(closed.last(), Some(&step.cell));
            }
        }
    }

    #[test]
    fn test_trace_is_replaced_by_next_search() {
        let mut grid = open_grid(8, 8, (0, 0), (7, 7));
        let mut planner =
            AStarPlanner::new(AStarConfig::default().with_trace_mode(TraceMode::Summary));
        planner.find_path(&mut grid).unwrap();
        let long_trace = planner.total_steps();

        grid.set_goal(1, 0).unwrap();
        planner.find_path(&mut grid).unwrap();
        assert!(planner.total_steps() < long_trace);
        assert_eq!(planner.steps().last().unwrap().cell, GridNode::new(1, 0));
    }

    #[test]
    fn test_grid_is_reused_between_searches() {
        let mut grid = open_grid(7, 7, (0, 3), (6, 3));
        let mut planner = AStarPlanner::from_heuristic_name("octile");
        assert_eq!(planner.find_path(&mut grid).unwrap().stats.path_cost, 60);

        for y in 0..7 {
            grid.set_wall(3, y).unwrap();
        }
        let blocked = planner.find_path(&mut grid).unwrap();
        assert!(!blocked.success());

        grid.clear_wall(3, 6).unwrap();
        let detour = planner.find_path(&mut grid).unwrap();
        assert!(detour.success());
        assert!(detour.path.iter().any(|&c| c == GridNode::new(3, 6)));
        assert_eq!(grid.kind(GridNode::new(0, 3)), Some(CellKind::Start));
    }

    #[test]
    fn test_statistics_bounds() {
        let mut grid = random_grid(9);
        let walkable = grid.cells().filter(|(_, k)| !k.is_wall()).count();
        let report = AStarPlanner::default().find_path(&mut grid).unwrap();
        assert!(report.stats.nodes_explored <= report.stats.nodes_opened);
        assert!(report.stats.nodes_opened <= walkable);
    }

    #[test]
    fn test_bidirectional_request_is_reported_as_forward() {
        let mut grid = open_grid(6, 6, (0, 0), (5, 5));
        let mut planner = AStarPlanner::from_heuristic_name("octile");
        let forward = planner.find_path(&mut grid).unwrap();
        let report = planner
            .find_path_with_mode(&mut grid, SearchMode::Bidirectional)
            .unwrap();

        assert_eq!(report.requested_mode, SearchMode::Bidirectional);
        assert_eq!(report.performed_mode, SearchMode::Forward);
        assert!(!report.bidirectional_performed());
        assert_eq!(report.path, forward.path);
    }

    #[test]
    fn test_cancelled_search() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut grid = open_grid(6, 6, (0, 0), (5, 5));
        let mut planner = AStarPlanner::new(
            AStarConfig::default().with_trace_mode(TraceMode::Summary),
        )
        .with_cancel_flag(flag.clone());
        assert_eq!(planner.find_path(&mut grid), Err(PathfindingError::Cancelled));
        assert_eq!(planner.phase(), SearchPhase::Idle);
        assert_eq!(planner.stats(), &SearchStats::default());

        flag.store(false, Ordering::Relaxed);
        assert!(planner.find_path(&mut grid).unwrap().success());
        assert!(planner.total_steps() > 0);

        // a cancelled rerun leaves nothing of the previous one behind
        flag.store(true, Ordering::Relaxed);
        assert_eq!(planner.find_path(&mut grid), Err(PathfindingError::Cancelled));
        assert_eq!(planner.stats(), &SearchStats::default());
        assert_eq!(planner.total_steps(), 0);
    }

    #[test]
    fn test_failing_heuristic_aborts_its_own_run() {
        let mut grid = open_grid(6, 6, (0, 0), (5, 5));
        let mut planner =
            AStarPlanner::new(AStarConfig::default().with_heuristic(Heuristic::Minkowski(-1.0)));
        assert!(matches!(
            planner.find_path(&mut grid),
            Err(PathfindingError::HeuristicEvaluation { .. })
        ));

        assert_eq!(planner.stats(), &SearchStats::default());

        planner.set_heuristic_by_name("chebyshev");
        assert!(planner.find_path(&mut grid).unwrap().success());
    }

    #[test]
    fn test_failure_mid_search_discards_partial_results() {
        // a corridor along y = 0 that opens to row 1 at x = 4
        let mut grid = open_grid(8, 2, (0, 0), (7, 0));
        for x in 0..4 {
            grid.set_wall(x, 1).unwrap();
        }
        // finite while dy == 0, overflows once both deltas are non-zero
        let mut planner = AStarPlanner::new(
            AStarConfig::default()
                .with_heuristic(Heuristic::Minkowski(1e-4))
                .with_trace_mode(TraceMode::Full),
        );

        assert!(matches!(
            planner.find_path(&mut grid),
            Err(PathfindingError::HeuristicEvaluation { .. })
        ));
        assert_eq!(planner.phase(), SearchPhase::Idle);
        assert_eq!(planner.stats(), &SearchStats::default());
        assert_eq!(planner.total_steps(), 0);
        assert!(planner.steps().is_empty());
    }

    #[test]
    fn test_heuristic_swap_returns_to_idle() {
        let mut grid = open_grid(6, 6, (0, 0), (5, 5));
        let mut planner =
            AStarPlanner::new(AStarConfig::default().with_trace_mode(TraceMode::Summary));
        planner.find_path(&mut grid).unwrap();
        assert_eq!(planner.phase(), SearchPhase::PathFound);

        planner.set_heuristic(Heuristic::Manhattan);
        assert_eq!(planner.phase(), SearchPhase::Idle);
        assert_eq!(planner.total_steps(), 0);
        assert_eq!(planner.stats(), &SearchStats::default());
        assert_eq!(GridPathPlanner::heuristic_name(&planner), "manhattan");
    }

    #[test]
    fn test_unknown_heuristic_name_falls_back() {
        let mut planner = AStarPlanner::from_heuristic_name("zigzag");
        assert_eq!(planner.config().heuristic, Heuristic::Euclidean);
        let mut grid = open_grid(4, 4, (0, 0), (3, 2));
        assert_eq!(planner.find_path(&mut grid).unwrap().stats.heuristic, "euclidean");
    }

    #[test]
    fn test_registry_queries() {
        let mut planner = AStarPlanner::default();
        assert_eq!(planner.available_heuristics().len(), 8);

        planner
            .registry_mut()
            .register("lazy_octile", Heuristic::weighted(Heuristic::Octile, 0.5));
        let values = planner.compare_heuristics(GridNode::new(0, 0), GridNode::new(2, 2));
        assert_eq!(values["lazy_octile"], 14.0);
        assert_eq!(values["octile"], 28.0);

        planner.set_heuristic_by_name("lazy_octile");
        assert_eq!(planner.config().heuristic.name(), "weighted_octile_0.5");
    }

    #[test]
    fn test_through_planner_trait() {
        fn run<P: GridPathPlanner>(planner: &mut P, grid: &mut GridMap) -> SearchReport {
            planner.find_path(grid).unwrap()
        }

        let mut grid = open_grid(5, 3, (0, 1), (4, 1));
        let report = run(&mut AStarPlanner::from_heuristic_name("octile"), &mut grid);
        assert_eq!(report.stats.path_cost, 40);
        assert_eq!(report.path.len(), 5);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_serializes() {
        let mut grid = open_grid(4, 4, (0, 0), (3, 2));
        let mut planner = AStarPlanner::new(
            AStarConfig::default()
                .with_heuristic(Heuristic::Octile)
                .with_trace_mode(TraceMode::Full),
        );
        let report = planner.find_path(&mut grid).unwrap();

        let json = serde_json::to_string(&report).unwrap();
        let decoded: SearchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, report);

        let step = planner.step(0).unwrap();
        let json = serde_json::to_string(step).unwrap();
        assert!(json.contains("\"action\":\"Exploring\""));
        assert_eq!(serde_json::from_str::<StepRecord>(&json).unwrap(), *step);
    }
}
