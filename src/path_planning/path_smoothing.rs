//! Path cost and line-of-sight smoothing
//!
//! Smoothing greedily replaces runs of grid steps by straight segments. A
//! smoothed path is no longer 8-connected; its segments are charged the
//! octile cost of [`GridMap::edge_cost`].

use itertools::Itertools;

use crate::common::{GridNode, GridPath};
use crate::utils::GridMap;

/// Sum of edge costs over consecutive cells; 0 for fewer than 2 cells
pub fn path_cost(grid: &GridMap, path: &GridPath) -> u32 {
    path.iter()
        .tuple_windows()
        .map(|(&a, &b)| grid.edge_cost(a, b))
        .sum()
}

/// Shortcut a path with line-of-sight checks.
///
/// From the current anchor, the farthest remaining cell that is visible
/// becomes the next waypoint; if none is, the next cell is kept. The result
/// keeps both endpoints and never has more cells than the input.
pub fn smooth_path(grid: &GridMap, path: &GridPath) -> GridPath {
    let cells = &path.cells;
    if cells.len() < 3 {
        return path.clone();
    }

    let last = cells.len() - 1;
    let mut smoothed = vec![cells[0]];
    let mut anchor = 0;
    while anchor < last {
        let next = (anchor + 2..=last)
            .rev()
            .find(|&j| has_line_of_sight(grid, cells[anchor], cells[j]))
            .unwrap_or(anchor + 1);
        smoothed.push(cells[next]);
        anchor = next;
    }

    GridPath::from_cells(smoothed)
}

/// Check whether the segment between two cell centres touches a wall.
///
/// Walks every cell the segment enters, one axis per step, by comparing
/// where it next crosses a vertical and a horizontal cell boundary. When it
/// passes exactly through a cell corner both side cells are checked, so a
/// segment never squeezes between walls and the answer does not depend on
/// direction. Both endpoints are checked.
pub fn has_line_of_sight(grid: &GridMap, a: GridNode, b: GridNode) -> bool {
    let (nx, ny) = a.deltas(&b);
    let (nx, ny) = (nx as i64, ny as i64);
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };

    let mut cell = a;
    if grid.is_wall(cell) {
        return false;
    }

    let (mut ix, mut iy) = (0, 0);
    while ix < nx || iy < ny {
        // boundary crossings compared as (ix + 1/2) / nx against (iy + 1/2) / ny
        let to_x = (1 + 2 * ix) * ny;
        let to_y = (1 + 2 * iy) * nx;
        if to_x < to_y {
            cell.x += sx;
            ix += 1;
        } else if to_x > to_y {
            cell.y += sy;
            iy += 1;
        } else {
            if grid.is_wall(cell.offset(sx, 0)) || grid.is_wall(cell.offset(0, sy)) {
                return false;
            }
            cell = cell.offset(sx, sy);
            ix += 1;
            iy += 1;
        }
        if grid.is_wall(cell) {
            return false;
        }
    }

    debug_assert_eq!(cell, b);
    true
}
