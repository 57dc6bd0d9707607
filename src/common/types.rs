//! Common types used throughout grid_astar

/// Sentinel g-cost for cells that have not been reached yet
pub const UNREACHABLE: u32 = u32::MAX;

/// Grid cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridNode {
    pub x: i32,
    pub y: i32,
}

impl GridNode {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Per-axis absolute deltas to `other`
    pub fn deltas(&self, other: &GridNode) -> (i32, i32) {
        ((self.x - other.x).abs(), (self.y - other.y).abs())
    }

    /// True for the 8 king-move neighbours (not the cell itself)
    pub fn is_adjacent(&self, other: &GridNode) -> bool {
        let (dx, dy) = self.deltas(other);
        dx <= 1 && dy <= 1 && (dx, dy) != (0, 0)
    }

    pub fn is_diagonal_to(&self, other: &GridNode) -> bool {
        let (dx, dy) = self.deltas(other);
        dx > 0 && dy > 0
    }
}

impl From<(i32, i32)> for GridNode {
    fn from(tuple: (i32, i32)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

/// Classification of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    #[default]
    Empty,
    Wall,
    Start,
    Goal,
}

impl CellKind {
    pub fn is_wall(&self) -> bool {
        matches!(self, CellKind::Wall)
    }
}

/// Transient per-cell bookkeeping of one search run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    /// Best known cost from the start, `UNREACHABLE` until discovered
    pub g_cost: u32,
    /// Heuristic estimate to the goal
    pub h_cost: f64,
    /// `g_cost + h_cost`
    pub f_cost: f64,
    /// Arena index of the predecessor on the best known path
    pub parent: Option<usize>,
    pub in_open: bool,
    /// Closed: the g-cost is final
    pub visited: bool,
}

impl SearchState {
    pub fn is_reached(&self) -> bool {
        self.g_cost != UNREACHABLE
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            g_cost: UNREACHABLE,
            h_cost: 0.0,
            f_cost: f64::INFINITY,
            parent: None,
            in_open: false,
            visited: false,
        }
    }
}

/// Path represented as a sequence of grid cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridPath {
    pub cells: Vec<GridNode>,
}

impl GridPath {
    pub fn new() -> Self {
        Self { cells: Vec::new() }
    }

    pub fn from_cells(cells: Vec<GridNode>) -> Self {
        Self { cells }
    }

    pub fn push(&mut self, cell: GridNode) {
        self.cells.push(cell);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn first(&self) -> Option<&GridNode> {
        self.cells.first()
    }

    pub fn last(&self) -> Option<&GridNode> {
        self.cells.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridNode> {
        self.cells.iter()
    }

    /// Consecutive cells are all 8-directionally adjacent
    pub fn is_connected(&self) -> bool {
        self.cells.windows(2).all(|w| w[0].is_adjacent(&w[1]))
    }
}

impl From<Vec<GridNode>> for GridPath {
    fn from(cells: Vec<GridNode>) -> Self {
        Self { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_node_adjacency() {
        let a = GridNode::new(2, 2);
        assert!(a.is_adjacent(&GridNode::new(3, 3)));
        assert!(a.is_adjacent(&GridNode::new(2, 1)));
        assert!(!a.is_adjacent(&a));
        assert!(!a.is_adjacent(&GridNode::new(4, 2)));
        assert!(a.is_diagonal_to(&GridNode::new(1, 3)));
        assert!(!a.is_diagonal_to(&GridNode::new(1, 2)));
    }

    #[test]
    fn test_search_state_default_is_unreached() {
        let state = SearchState::default();
        assert!(!state.is_reached());
        assert!(state.f_cost.is_infinite());
        assert_eq!(state.parent, None);
        assert!(!state.in_open && !state.visited);
    }

    #[test]
    fn test_grid_path_connectivity() {
        let path = GridPath::from_cells(vec![
            GridNode::new(0, 0),
            GridNode::new(1, 1),
            GridNode::new(1, 2),
        ]);
        assert!(path.is_connected());
        assert_eq!(path.first(), Some(&GridNode::new(0, 0)));
        assert_eq!(path.last(), Some(&GridNode::new(1, 2)));

        let broken = GridPath::from_cells(vec![GridNode::new(0, 0), GridNode::new(2, 0)]);
        assert!(!broken.is_connected());
    }
}
