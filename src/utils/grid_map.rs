// grid map definition
// dense 8-connected grid with start/goal roles and per-cell search state

use itertools::iproduct;
use log::debug;
use nalgebra as na;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::common::{CellKind, GridNode, PathfindingError, PathfindingResult, SearchState};

/// Cost of an orthogonal move
pub const STRAIGHT_COST: u32 = 10;
/// Cost of a diagonal move, 10 * sqrt(2) rounded
pub const DIAGONAL_COST: u32 = 14;

// king moves, in the order neighbours are reported
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Fixed-size grid of cells.
///
/// Cell kinds live in a `width x height` matrix indexed by `(x, y)`; search
/// state lives in an arena addressed by the same column-major cell index,
/// which is also what `SearchState::parent` refers to.
#[derive(Debug, Clone)]
pub struct GridMap {
    kinds: na::DMatrix<CellKind>,
    states: Vec<SearchState>,
    start: Option<GridNode>,
    goal: Option<GridNode>,
}

impl GridMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            kinds: na::DMatrix::from_element(width, height, CellKind::Empty),
            states: vec![SearchState::default(); width * height],
            start: None,
            goal: None,
        }
    }

    /// Build a grid from an occupancy matrix (rows are y, columns are x,
    /// non-zero is a wall), upscaling every cell to a `scale x scale` block.
    pub fn from_occupancy(occupancy: &na::DMatrix<i32>, scale: usize) -> PathfindingResult<Self> {
        if scale < 1 {
            return Err(PathfindingError::InvalidParameter(
                "scale must be >= 1".to_string(),
            ));
        }
        let scaled = occupancy.kronecker(&na::DMatrix::<i32>::repeat(scale, scale, 1));
        let (height, width) = scaled.shape();

        let mut grid = Self::new(width, height);
        for (x, y) in iproduct!(0..width, 0..height) {
            if scaled[(y, x)] != 0 {
                grid.kinds[(x, y)] = CellKind::Wall;
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.kinds.nrows()
    }

    pub fn height(&self) -> usize {
        self.kinds.ncols()
    }

    pub fn total_cells(&self) -> usize {
        self.kinds.len()
    }

    /// Number of cells that are neither walls nor start/goal
    pub fn empty_cells(&self) -> usize {
        self.kinds.iter().filter(|&&k| k == CellKind::Empty).count()
    }

    pub fn in_bounds(&self, node: GridNode) -> bool {
        node.x >= 0
            && node.y >= 0
            && (node.x as usize) < self.width()
            && (node.y as usize) < self.height()
    }

    /// Arena index of a cell
    pub fn index(&self, node: GridNode) -> Option<usize> {
        if self.in_bounds(node) {
            Some(node.x as usize + node.y as usize * self.width())
        } else {
            None
        }
    }

    pub fn node_at(&self, index: usize) -> GridNode {
        let width = self.width();
        GridNode::new((index % width) as i32, (index / width) as i32)
    }

    pub fn kind(&self, node: GridNode) -> Option<CellKind> {
        self.index(node).map(|i| self.kinds[i])
    }

    pub fn is_wall(&self, node: GridNode) -> bool {
        self.kind(node).map_or(false, |k| k.is_wall())
    }

    /// In bounds and not a wall
    pub fn is_walkable(&self, node: GridNode) -> bool {
        self.kind(node).map_or(false, |k| !k.is_wall())
    }

    pub fn start(&self) -> Option<GridNode> {
        self.start
    }

    pub fn goal(&self) -> Option<GridNode> {
        self.goal
    }

    /// All cells with their kinds, column by column
    pub fn cells(&self) -> impl Iterator<Item = (GridNode, CellKind)> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .map(move |(i, &kind)| (self.node_at(i), kind))
    }

    /// Move the start role to `(x, y)`, demoting the previous start cell.
    /// A wall at the target is replaced.
    pub fn set_start(&mut self, x: i32, y: i32) -> PathfindingResult<()> {
        let node = self.checked(x, y)?;
        if let Some(previous) = self.start.take() {
            self.restore_kind(previous);
        }
        self.set_kind(node, CellKind::Start);
        self.start = Some(node);
        Ok(())
    }

    /// Move the goal role to `(x, y)`, demoting the previous goal cell.
    /// A wall at the target is replaced.
    pub fn set_goal(&mut self, x: i32, y: i32) -> PathfindingResult<()> {
        let node = self.checked(x, y)?;
        if let Some(previous) = self.goal.take() {
            self.restore_kind(previous);
        }
        self.set_kind(node, CellKind::Goal);
        self.goal = Some(node);
        Ok(())
    }

    /// Turn an empty cell into a wall. Returns whether the cell changed.
    pub fn set_wall(&mut self, x: i32, y: i32) -> PathfindingResult<bool> {
        let node = self.checked(x, y)?;
        if self.kind(node) != Some(CellKind::Empty) {
            return Ok(false);
        }
        self.set_kind(node, CellKind::Wall);
        Ok(true)
    }

    /// Turn a wall back into an empty cell. Returns whether the cell changed.
    pub fn clear_wall(&mut self, x: i32, y: i32) -> PathfindingResult<bool> {
        let node = self.checked(x, y)?;
        if self.kind(node) != Some(CellKind::Wall) {
            return Ok(false);
        }
        self.set_kind(node, CellKind::Empty);
        Ok(true)
    }

    /// In-bounds, non-wall king-move neighbours. Diagonal moves between two
    /// orthogonal walls are allowed.
    pub fn neighbors(&self, node: GridNode) -> Vec<GridNode> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| node.offset(dx, dy))
            .filter(|&n| self.is_walkable(n))
            .collect()
    }

    /// Move cost between two cells: 10 straight, 14 diagonal.
    ///
    /// For cells further apart this is the cheapest 8-connected walk on an
    /// empty grid, which is what a smoothed path segment is charged.
    pub fn edge_cost(&self, a: GridNode, b: GridNode) -> u32 {
        let (dx, dy) = a.deltas(&b);
        let diagonal = dx.min(dy) as u32;
        let straight = (dx.max(dy) - dx.min(dy)) as u32;
        DIAGONAL_COST * diagonal + STRAIGHT_COST * straight
    }

    /// Clear the transient search fields of every cell; kinds are untouched.
    pub fn reset_search_state(&mut self) {
        for state in self.states.iter_mut() {
            *state = SearchState::default();
        }
    }

    pub fn state(&self, node: GridNode) -> Option<&SearchState> {
        self.index(node).map(|i| &self.states[i])
    }

    pub(crate) fn state_at(&self, index: usize) -> &SearchState {
        &self.states[index]
    }

    pub(crate) fn state_at_mut(&mut self, index: usize) -> &mut SearchState {
        &mut self.states[index]
    }

    /// Scatter walls over `density` of the grid, only on empty cells.
    ///
    /// Start and goal cells are never overwritten. Returns the number of
    /// walls added, which is smaller than requested when the grid runs
    /// out of empty cells.
    pub fn random_walls<R: Rng + ?Sized>(
        &mut self,
        density: f64,
        rng: &mut R,
    ) -> PathfindingResult<usize> {
        if !(0.0..=1.0).contains(&density) {
            return Err(PathfindingError::InvalidParameter(format!(
                "wall density must be within [0, 1], got {}",
                density
            )));
        }
        let target = ((self.total_cells() as f64 * density) as usize).min(self.empty_cells());
        if target == 0 {
            return Ok(0);
        }

        let x_dist = Uniform::new(0, self.width() as i32);
        let y_dist = Uniform::new(0, self.height() as i32);
        let mut added = 0;
        while added < target {
            let x = x_dist.sample(rng);
            let y = y_dist.sample(rng);
            if self.set_wall(x, y)? {
                added += 1;
            }
        }
        debug!("random_walls: added {} walls (density {})", added, density);
        Ok(added)
    }

    /// Lattice of walls along every 4th column and row. Lattice crossings
    /// stay open, so rooms connect diagonally through them.
    pub fn maze_pattern(&mut self) {
        let (width, height) = (self.width() as i32, self.height() as i32);
        for (x, y) in iproduct!((0..width).step_by(4), 0..height) {
            if y % 4 != 0 {
                self.set_kind_if_empty(x, y);
            }
        }
        for (y, x) in iproduct!((0..height).step_by(4), 0..width) {
            if x % 4 != 0 {
                self.set_kind_if_empty(x, y);
            }
        }
    }

    fn set_kind_if_empty(&mut self, x: i32, y: i32) {
        let node = GridNode::new(x, y);
        if self.kind(node) == Some(CellKind::Empty) {
            self.set_kind(node, CellKind::Wall);
        }
    }

    fn checked(&self, x: i32, y: i32) -> PathfindingResult<GridNode> {
        let node = GridNode::new(x, y);
        if self.in_bounds(node) {
            Ok(node)
        } else {
            Err(PathfindingError::OutOfBounds { x, y })
        }
    }

    fn set_kind(&mut self, node: GridNode, kind: CellKind) {
        self.kinds[(node.x as usize, node.y as usize)] = kind;
    }

    // the cell lost a role; keep the other role if it still holds one
    fn restore_kind(&mut self, node: GridNode) {
        let kind = if self.start == Some(node) {
            CellKind::Start
        } else if self.goal == Some(node) {
            CellKind::Goal
        } else {
            CellKind::Empty
        };
        self.set_kind(node, kind);
    }
}
