//! Grid pathfinding.
//!
//! A* over a binary occupancy grid (`1` = blocked, `0` = free) with
//! 8-directional movement. Diagonal steps are always allowed, including past
//! blocked corners. Costs use the usual integer octile weights (10 straight,
//! 14 diagonal) so the open set can order nodes without float comparisons.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use arrayvec::ArrayVec;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// Binary occupancy matrix, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl PathGrid {
    /// All-free grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; (width as usize) * (height as usize)],
        }
    }

    /// Build from a row-major matrix. Missing cells are free.
    pub fn from_cells(width: u32, height: u32, mut cells: Vec<u8>) -> Self {
        cells.resize((width as usize) * (height as usize), 0);
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Row `gz` of the matrix.
    pub fn row(&self, gz: u32) -> &[u8] {
        let start = (gz as usize) * (self.width as usize);
        let end = start + self.width as usize;
        self.cells.get(start..end).unwrap_or(&[])
    }

    #[inline]
    fn index(&self, gx: u32, gz: u32) -> Option<usize> {
        (gx < self.width && gz < self.height)
            .then(|| (gz as usize) * (self.width as usize) + (gx as usize))
    }

    pub fn set_blocked(&mut self, gx: u32, gz: u32, blocked: bool) {
        if let Some(i) = self.index(gx, gz) {
            self.cells[i] = u8::from(blocked);
        }
    }

    /// Out-of-bounds cells count as blocked.
    pub fn is_blocked(&self, gx: u32, gz: u32) -> bool {
        self.index(gx, gz).map_or(true, |i| self.cells[i] != 0)
    }

    pub fn blocked_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    fn neighbors(&self, gx: u32, gz: u32) -> ArrayVec<(u32, u32, u32), 8> {
        let mut out = ArrayVec::new();
        for dz in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dz == 0 {
                    continue;
                }
                let nx = gx as i64 + dx;
                let nz = gz as i64 + dz;
                if nx < 0 || nz < 0 {
                    continue;
                }
                let (nx, nz) = (nx as u32, nz as u32);
                if self.is_blocked(nx, nz) {
                    continue;
                }
                let cost = if dx != 0 && dz != 0 {
                    DIAGONAL_COST
                } else {
                    STRAIGHT_COST
                };
                out.push((nx, nz, cost));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f: u32,
    h: u32,
    seq: u32,
    index: usize,
}

// Min-heap on f, then h, then insertion order.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn octile(ax: u32, az: u32, bx: u32, bz: u32) -> u32 {
    let dx = ax.abs_diff(bx);
    let dz = az.abs_diff(bz);
    STRAIGHT_COST * dx.max(dz) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dz)
}

/// Shortest path from `from` to `to`, both `(gx, gz)`.
///
/// The result excludes `from` and ends with `to`. An empty vector means no
/// path: the target is blocked or enclosed, either end is out of bounds, or
/// `from == to`.
pub fn find_path(grid: &PathGrid, from: (u32, u32), to: (u32, u32)) -> Vec<(u32, u32)> {
    let (Some(start), Some(goal)) = (grid.index(from.0, from.1), grid.index(to.0, to.1)) else {
        return Vec::new();
    };
    if start == goal || grid.is_blocked(to.0, to.1) {
        return Vec::new();
    }

    let w = grid.width as usize;
    let n = grid.cells.len();
    let mut g = vec![u32::MAX; n];
    let mut parent = vec![usize::MAX; n];
    let mut closed = vec![false; n];
    let mut open = BinaryHeap::new();
    let mut seq = 0u32;

    g[start] = 0;
    let h0 = octile(from.0, from.1, to.0, to.1);
    open.push(OpenNode {
        f: h0,
        h: h0,
        seq,
        index: start,
    });

    while let Some(node) = open.pop() {
        if closed[node.index] {
            continue;
        }
        if node.index == goal {
            let mut path = Vec::new();
            let mut cur = goal;
            while cur != start {
                path.push(((cur % w) as u32, (cur / w) as u32));
                cur = parent[cur];
            }
            path.reverse();
            return path;
        }
        closed[node.index] = true;

        let (cx, cz) = ((node.index % w) as u32, (node.index / w) as u32);
        for (nx, nz, cost) in grid.neighbors(cx, cz) {
            let ni = (nz as usize) * w + nx as usize;
            if closed[ni] {
                continue;
            }
            let tentative = g[node.index] + cost;
            if tentative < g[ni] {
                g[ni] = tentative;
                parent[ni] = node.index;
                let h = octile(nx, nz, to.0, to.1);
                seq += 1;
                open.push(OpenNode {
                    f: tentative + h,
                    h,
                    seq,
                    index: ni,
                });
            }
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_adjacent(a: (u32, u32), b: (u32, u32)) -> bool {
        a != b && a.0.abs_diff(b.0) <= 1 && a.1.abs_diff(b.1) <= 1
    }

    #[test]
    fn open_grid_walks_the_diagonal() {
        let grid = PathGrid::new(4, 4);
        let path = find_path(&grid, (0, 0), (3, 3));
        assert_eq!(path, vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn path_steps_are_adjacent_and_avoid_obstacles() {
        let mut grid = PathGrid::new(6, 5);
        for gz in 0..4 {
            grid.set_blocked(3, gz, true);
        }
        let path = find_path(&grid, (0, 0), (5, 0));
        assert_eq!(path.last(), Some(&(5, 0)));
        assert!(is_adjacent((0, 0), path[0]));
        for pair in path.windows(2) {
            assert!(is_adjacent(pair[0], pair[1]));
        }
        assert!(path.iter().all(|&(x, z)| !grid.is_blocked(x, z)));
    }

    #[test]
    fn enclosed_target_has_no_path() {
        let mut grid = PathGrid::new(5, 5);
        for (x, z) in [(1, 1), (2, 1), (3, 1), (1, 2), (3, 2), (1, 3), (2, 3), (3, 3)] {
            grid.set_blocked(x, z, true);
        }
        assert!(find_path(&grid, (0, 0), (2, 2)).is_empty());
    }

    #[test]
    fn blocked_target_same_cell_and_out_of_bounds_are_empty() {
        let mut grid = PathGrid::new(3, 3);
        grid.set_blocked(2, 2, true);
        assert!(find_path(&grid, (0, 0), (2, 2)).is_empty());
        assert!(find_path(&grid, (1, 1), (1, 1)).is_empty());
        assert!(find_path(&grid, (0, 0), (9, 0)).is_empty());
    }

    #[test]
    fn blocked_start_can_still_leave() {
        let mut grid = PathGrid::new(3, 1);
        grid.set_blocked(0, 0, true);
        assert_eq!(find_path(&grid, (0, 0), (2, 0)), vec![(1, 0), (2, 0)]);
    }
}
