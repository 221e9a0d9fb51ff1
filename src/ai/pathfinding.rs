//! A* pathfinding on a walkability grid
//!
//! The grid lies on the XZ plane at a fixed floor height. Agents only talk to
//! it through [`NavigationService`], so a level may plug in any other
//! navigation backend.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A cell of the navigation grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellHandle {
    /// Column (X)
    pub x: u32,
    /// Row (Z)
    pub z: u32,
}

/// Result of pathfinding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathResult {
    /// Waypoints in world coordinates, start cell first
    pub waypoints: Vec<Vec3>,
    /// Total path length
    pub length: f32,
}

impl PathResult {
    /// Check if path was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Black-box navigation backend consumed by agents
pub trait NavigationService {
    /// Cell containing `position`; with `must_be_walkable` blocked cells resolve to `None`
    fn cell_at(&self, position: Vec3, must_be_walkable: bool) -> Option<CellHandle>;

    /// World position of a cell's center
    fn cell_center(&self, cell: CellHandle) -> Vec3;

    /// Path from `from` to the center of `to`; empty when unreachable
    fn request_path(&self, from: Vec3, to: CellHandle) -> PathResult;
}

/// A 2D navigation grid on the XZ plane
#[derive(Debug, Clone)]
pub struct NavGrid {
    /// Width in cells (X)
    pub width: usize,
    /// Depth in cells (Z)
    pub depth: usize,
    /// Cell size in world units
    pub cell_size: f32,
    /// World XZ of the grid's minimum corner
    pub origin: Vec2,
    /// Y of the walkable floor
    pub floor_height: f32,
    /// Walkable cells (true = walkable)
    cells: Vec<bool>,
}

impl NavGrid {
    /// Create a new grid (all cells walkable by default)
    #[must_use]
    pub fn new(width: usize, depth: usize, cell_size: f32) -> Self {
        Self {
            width,
            depth,
            cell_size,
            origin: Vec2::ZERO,
            floor_height: 0.0,
            cells: vec![true; width * depth],
        }
    }

    /// Move the grid's minimum corner
    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Set the floor height of waypoints
    #[must_use]
    pub fn with_floor_height(mut self, floor_height: f32) -> Self {
        self.floor_height = floor_height;
        self
    }

    /// Set a cell's walkability
    pub fn set_walkable(&mut self, x: usize, z: usize, walkable: bool) {
        if x < self.width && z < self.depth {
            self.cells[z * self.width + x] = walkable;
        }
    }

    /// Block every cell whose center lies inside an XZ rectangle
    pub fn block_rect(&mut self, min: Vec2, max: Vec2) {
        for z in 0..self.depth {
            for x in 0..self.width {
                let center = self.grid_to_world(x, z);
                if center.x >= min.x && center.x <= max.x && center.z >= min.y && center.z <= max.y
                {
                    self.set_walkable(x, z, false);
                }
            }
        }
    }

    /// Check if a cell is walkable
    #[must_use]
    pub fn is_walkable(&self, x: usize, z: usize) -> bool {
        if x >= self.width || z >= self.depth {
            return false;
        }
        self.cells[z * self.width + x]
    }

    /// Convert world position to (possibly out-of-range) grid coordinates
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3) -> (i64, i64) {
        let local = Vec2::new(pos.x, pos.z) - self.origin;
        (
            (local.x / self.cell_size).floor() as i64,
            (local.y / self.cell_size).floor() as i64,
        )
    }

    /// Convert grid coordinates to world position (center of cell, on the floor)
    #[must_use]
    pub fn grid_to_world(&self, x: usize, z: usize) -> Vec3 {
        Vec3::new(
            self.origin.x + (x as f32 + 0.5) * self.cell_size,
            self.floor_height,
            self.origin.y + (z as f32 + 0.5) * self.cell_size,
        )
    }

    fn in_range(&self, (x, z): (i64, i64)) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok()?;
        let z = usize::try_from(z).ok()?;
        (x < self.width && z < self.depth).then_some((x, z))
    }

    /// Walkable 4-directional neighbors of a cell
    fn neighbors(&self, x: usize, z: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let candidates = [
            x.checked_sub(1).map(|nx| (nx, z)),
            Some((x + 1, z)),
            z.checked_sub(1).map(|nz| (x, nz)),
            Some((x, z + 1)),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter(|&(nx, nz)| self.is_walkable(nx, nz))
    }
}

impl NavigationService for NavGrid {
    fn cell_at(&self, position: Vec3, must_be_walkable: bool) -> Option<CellHandle> {
        let (x, z) = self.in_range(self.world_to_grid(position))?;
        if must_be_walkable && !self.is_walkable(x, z) {
            return None;
        }
        Some(CellHandle {
            x: x as u32,
            z: z as u32,
        })
    }

    fn cell_center(&self, cell: CellHandle) -> Vec3 {
        self.grid_to_world(cell.x as usize, cell.z as usize)
    }

    fn request_path(&self, from: Vec3, to: CellHandle) -> PathResult {
        let Some(start) = self.in_range(self.world_to_grid(from)) else {
            return PathResult::default();
        };
        find_path(self, start, (to.x as usize, to.z as usize))
    }
}

/// A* node for priority queue
#[derive(Debug, Clone)]
struct Node {
    x: usize,
    z: usize,
    f_cost: f32, // g_cost + heuristic
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.z == other.z
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap, ties broken by cell for stable paths
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| (other.z, other.x).cmp(&(self.z, self.x)))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path between two grid cells using A*
#[must_use]
pub fn find_path(grid: &NavGrid, start: (usize, usize), goal: (usize, usize)) -> PathResult {
    if !grid.is_walkable(start.0, start.1) || !grid.is_walkable(goal.0, goal.1) {
        return PathResult::default();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: FxHashMap<(usize, usize), (usize, usize)> = FxHashMap::default();
    let mut g_score: FxHashMap<(usize, usize), f32> = FxHashMap::default();

    let heuristic = |x: usize, z: usize| -> f32 {
        let dx = (x as f32 - goal.0 as f32).abs();
        let dz = (z as f32 - goal.1 as f32).abs();
        dx + dz // Manhattan distance
    };

    g_score.insert(start, 0.0);
    open_set.push(Node {
        x: start.0,
        z: start.1,
        f_cost: heuristic(start.0, start.1),
    });

    while let Some(current) = open_set.pop() {
        let cell = (current.x, current.z);
        if cell == goal {
            let mut path = vec![goal];
            let mut curr = goal;
            while let Some(&prev) = came_from.get(&curr) {
                path.push(prev);
                curr = prev;
            }
            path.reverse();

            let waypoints: Vec<Vec3> = path
                .iter()
                .map(|&(x, z)| grid.grid_to_world(x, z))
                .collect();
            let length = calculate_path_length(&waypoints);
            return PathResult { waypoints, length };
        }

        let current_g = g_score.get(&cell).copied().unwrap_or(f32::MAX);
        for next in grid.neighbors(current.x, current.z) {
            let tentative_g = current_g + 1.0;
            if tentative_g < g_score.get(&next).copied().unwrap_or(f32::MAX) {
                came_from.insert(next, cell);
                g_score.insert(next, tentative_g);
                open_set.push(Node {
                    x: next.0,
                    z: next.1,
                    f_cost: tentative_g + heuristic(next.0, next.1),
                });
            }
        }
    }

    PathResult::default()
}

/// Calculate total path length
fn calculate_path_length(waypoints: &[Vec3]) -> f32 {
    waypoints
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pathfinding_around_wall() {
        let mut grid = NavGrid::new(10, 10, 1.0);
        for z in 2..8 {
            grid.set_walkable(5, z, false);
        }

        let goal = grid.cell_at(Vec3::new(8.5, 0.0, 5.5), true).unwrap();
        let path = grid.request_path(Vec3::new(2.5, 0.0, 5.5), goal);

        assert!(!path.is_empty());
        assert!(path.waypoints.len() > 7); // Must detour around the wall
        assert!(path.waypoints.iter().all(|w| w.y == 0.0));
    }

    #[test]
    fn test_direct_path() {
        let grid = NavGrid::new(10, 10, 1.0);
        let goal = grid.cell_at(Vec3::new(3.5, 0.0, 0.5), true).unwrap();
        let path = grid.request_path(Vec3::new(0.5, 0.0, 0.5), goal);

        assert_eq!(path.waypoints.len(), 4); // 4 cells in a line
        assert!((path.length - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_path() {
        let mut grid = NavGrid::new(5, 5, 1.0);
        grid.set_walkable(3, 2, false);
        grid.set_walkable(3, 4, false);
        grid.set_walkable(2, 3, false);
        grid.set_walkable(4, 3, false);

        let goal = CellHandle { x: 3, z: 3 };
        let path = grid.request_path(Vec3::new(0.5, 0.0, 0.5), goal);
        assert!(path.is_empty());
    }

    #[test]
    fn test_cell_at_respects_walkability_and_bounds() {
        let mut grid = NavGrid::new(4, 4, 32.0).with_origin(Vec2::new(-64.0, -64.0));
        grid.set_walkable(0, 0, false);

        assert!(grid.cell_at(Vec3::new(-60.0, 0.0, -60.0), true).is_none());
        assert_eq!(
            grid.cell_at(Vec3::new(-60.0, 0.0, -60.0), false),
            Some(CellHandle { x: 0, z: 0 })
        );
        assert!(grid.cell_at(Vec3::new(100.0, 0.0, 0.0), false).is_none());
        assert_eq!(
            grid.cell_center(CellHandle { x: 2, z: 1 }),
            Vec3::new(16.0, 0.0, -16.0)
        );
    }

    #[test]
    fn test_block_rect() {
        let mut grid = NavGrid::new(8, 8, 10.0);
        grid.block_rect(Vec2::new(20.0, 0.0), Vec2::new(40.0, 80.0));
        assert!(!grid.is_walkable(2, 0));
        assert!(!grid.is_walkable(3, 7));
        assert!(grid.is_walkable(1, 0));
        assert!(grid.is_walkable(4, 0));
    }
}
