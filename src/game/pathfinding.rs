use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::trace;

use crate::protocol::Vec2;

use super::arena::Rect;

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;
/// How far (in cells) to look for a walkable substitute for a blocked endpoint.
const ENDPOINT_SEARCH_RADIUS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

/// Static-obstacle grid with A* search in world coordinates.
#[derive(Debug, Clone)]
pub struct NavGrid {
    width: u32,
    height: u32,
    cell_size: f32,
    blocked: Vec<bool>,
}

impl NavGrid {
    pub fn new(width: u32, height: u32, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size,
            blocked: vec![false; (width * height) as usize],
        }
    }

    /// Grid covering `world_width` × `world_height`; a cell is blocked when its
    /// center lies inside any obstacle.
    pub fn from_obstacles(
        world_width: f32,
        world_height: f32,
        cell_size: f32,
        obstacles: &[Rect],
    ) -> Self {
        let width = (world_width / cell_size).ceil() as u32;
        let height = (world_height / cell_size).ceil() as u32;
        let mut grid = Self::new(width, height, cell_size);
        for y in 0..height {
            for x in 0..width {
                let center = grid.cell_center(Cell { x, y });
                if obstacles.iter().any(|r| r.contains(center)) {
                    grid.set_blocked(Cell { x, y }, true);
                }
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn set_blocked(&mut self, cell: Cell, blocked: bool) {
        if let Some(index) = self.index_of(cell) {
            self.blocked[index] = blocked;
        }
    }

    fn index_of(&self, cell: Cell) -> Option<usize> {
        if cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        Some(cell.y as usize * self.width as usize + cell.x as usize)
    }

    pub fn cell_of(&self, point: Vec2) -> Option<Cell> {
        let cx = (point.x / self.cell_size).floor();
        let cy = (point.y / self.cell_size).floor();
        if cx < 0.0 || cy < 0.0 {
            return None;
        }
        let cell = Cell {
            x: cx as u32,
            y: cy as u32,
        };
        self.index_of(cell).map(|_| cell)
    }

    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        Vec2::new(
            (cell.x as f32 + 0.5) * self.cell_size,
            (cell.y as f32 + 0.5) * self.cell_size,
        )
    }

    pub fn is_walkable_cell(&self, cell: Cell) -> bool {
        self.index_of(cell)
            .map(|index| !self.blocked[index])
            .unwrap_or(false)
    }

    /// Out-of-bounds points are never walkable.
    pub fn is_walkable(&self, point: Vec2) -> bool {
        self.cell_of(point)
            .map(|cell| self.is_walkable_cell(cell))
            .unwrap_or(false)
    }

    /// Straight segment test, sampled at a quarter cell.
    pub fn has_line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let dist = from.distance(to);
        let step = self.cell_size * 0.25;
        let samples = (dist / step).ceil().max(1.0) as u32;
        (0..=samples).all(|i| {
            let t = i as f32 / samples as f32;
            self.is_walkable(Vec2::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t))
        })
    }

    fn nearest_walkable(&self, cell: Cell) -> Option<Cell> {
        if self.is_walkable_cell(cell) {
            return Some(cell);
        }
        for radius in 1..=ENDPOINT_SEARCH_RADIUS {
            let mut best: Option<(u32, Cell)> = None;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let nx = cell.x as i32 + dx;
                    let ny = cell.y as i32 + dy;
                    if nx < 0 || ny < 0 {
                        continue;
                    }
                    let candidate = Cell {
                        x: nx as u32,
                        y: ny as u32,
                    };
                    if !self.is_walkable_cell(candidate) {
                        continue;
                    }
                    let d = (dx * dx + dy * dy) as u32;
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, candidate));
                    }
                }
            }
            if let Some((_, found)) = best {
                return Some(found);
            }
        }
        None
    }

    /// Ordered waypoints from `start` to `goal`. The first point is the
    /// center of the start cell; callers usually skip it. `None` when no
    /// route exists.
    pub fn find_path(&self, start: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
        let start_cell = self.nearest_walkable(self.cell_of(start)?)?;
        let goal_raw = self.cell_of(goal)?;
        let goal_cell = self.nearest_walkable(goal_raw)?;
        let goal_point = if goal_cell == goal_raw {
            goal
        } else {
            self.cell_center(goal_cell)
        };

        if start_cell == goal_cell {
            return Some(vec![self.cell_center(start_cell), goal_point]);
        }

        let cells = self.search(start_cell, goal_cell)?;
        let mut points: Vec<Vec2> = cells.iter().map(|c| self.cell_center(*c)).collect();
        if let Some(last) = points.last_mut() {
            *last = goal_point;
        }
        Some(self.smooth(points))
    }

    /// Drop intermediate waypoints that are visible from the previous kept one.
    fn smooth(&self, points: Vec<Vec2>) -> Vec<Vec2> {
        if points.len() <= 2 {
            return points;
        }
        let mut out = vec![points[0], points[1]];
        let mut anchor = 0;
        let mut i = 2;
        while i < points.len() {
            if self.has_line_of_sight(points[anchor], points[i]) {
                if let Some(last) = out.last_mut() {
                    *last = points[i];
                }
            } else {
                anchor = i - 1;
                out.push(points[i]);
            }
            i += 1;
        }
        out
    }

    fn search(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        let node_count = (self.width * self.height) as usize;
        let start_index = self.index_of(start)?;
        let goal_index = self.index_of(goal)?;

        let mut best_g = vec![u32::MAX; node_count];
        let mut parent = vec![None::<usize>; node_count];
        let mut closed = vec![false; node_count];
        let mut open = BinaryHeap::new();
        let mut insertion = 0u64;

        best_g[start_index] = 0;
        let h = octile(start, goal);
        open.push(OpenNode {
            cell: start,
            f_cost: h,
            h_cost: h,
            insertion,
        });

        while let Some(current) = open.pop() {
            let Some(current_index) = self.index_of(current.cell) else {
                continue;
            };
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current_index == goal_index {
                return Some(self.reconstruct(&parent, start_index, goal_index));
            }

            let current_g = best_g[current_index];
            for (neighbor, step_cost) in self.neighbors(current.cell) {
                let Some(neighbor_index) = self.index_of(neighbor) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }
                let tentative = current_g.saturating_add(step_cost);
                if tentative >= best_g[neighbor_index] {
                    continue;
                }
                best_g[neighbor_index] = tentative;
                parent[neighbor_index] = Some(current_index);
                insertion += 1;
                let h = octile(neighbor, goal);
                open.push(OpenNode {
                    cell: neighbor,
                    f_cost: tentative.saturating_add(h),
                    h_cost: h,
                    insertion,
                });
            }
        }

        trace!(?start, ?goal, "no path");
        None
    }

    /// Walkable 8-neighbours; diagonals may not cut blocked corners.
    fn neighbors(&self, cell: Cell) -> Vec<(Cell, u32)> {
        let mut out = Vec::with_capacity(8);
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = cell.x as i32 + dx;
                let ny = cell.y as i32 + dy;
                if nx < 0 || ny < 0 {
                    continue;
                }
                let next = Cell {
                    x: nx as u32,
                    y: ny as u32,
                };
                if !self.is_walkable_cell(next) {
                    continue;
                }
                if dx != 0 && dy != 0 {
                    let side_a = Cell { x: nx as u32, y: cell.y };
                    let side_b = Cell { x: cell.x, y: ny as u32 };
                    if !self.is_walkable_cell(side_a) || !self.is_walkable_cell(side_b) {
                        continue;
                    }
                    out.push((next, DIAGONAL_COST));
                } else {
                    out.push((next, STRAIGHT_COST));
                }
            }
        }
        out
    }

    fn reconstruct(
        &self,
        parent: &[Option<usize>],
        start_index: usize,
        goal_index: usize,
    ) -> Vec<Cell> {
        let mut cursor = goal_index;
        let mut indices = vec![cursor];
        while cursor != start_index {
            match parent[cursor] {
                Some(prev) => {
                    cursor = prev;
                    indices.push(cursor);
                }
                None => break,
            }
        }
        indices.reverse();
        indices
            .into_iter()
            .map(|index| Cell {
                x: (index as u32) % self.width,
                y: (index as u32) / self.width,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    cell: Cell,
    f_cost: u32,
    h_cost: u32,
    insertion: u64,
}

// Min-heap on (f, h, insertion) so ties break deterministically.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.insertion.cmp(&self.insertion))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn octile(a: Cell, b: Cell) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * lo + STRAIGHT_COST * (hi - lo)
}
