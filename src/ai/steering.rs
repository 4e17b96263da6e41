use std::collections::HashMap;

use hecs::Entity;
use tracing::trace;

use crate::game::pathfinding::NavGrid;
use crate::protocol::Vec2;

// ── Waypoint following ───────────────────────────────────────────────

/// Waypoints from the grid plus the index of the one being walked to.
#[derive(Debug, Clone)]
pub struct PathFollower {
    waypoints: Vec<Vec2>,
    index: usize,
    recompute_timer_ms: f32,
    interval_ms: f32,
    /// The last request found no path; walk straight until the timer elapses.
    failed: bool,
}

impl PathFollower {
    pub fn new(interval_ms: f32) -> Self {
        Self {
            waypoints: Vec::new(),
            index: 0,
            recompute_timer_ms: 0.0,
            interval_ms,
            failed: false,
        }
    }

    /// True when the path ran out or the recompute interval elapsed.
    pub fn needs_path(&self) -> bool {
        self.recompute_timer_ms <= 0.0 || (!self.failed && self.index >= self.waypoints.len())
    }

    /// Store a fresh search result. The first point duplicates the current
    /// position and is skipped.
    pub fn set_path(&mut self, path: Option<Vec<Vec2>>) {
        self.recompute_timer_ms = self.interval_ms;
        match path {
            Some(points) => {
                self.waypoints = points;
                self.index = 1.min(self.waypoints.len());
                self.failed = false;
            }
            None => {
                self.waypoints.clear();
                self.index = 0;
                self.failed = true;
            }
        }
    }

    /// Search from `from` to `goal` if the current path is stale.
    pub fn refresh(&mut self, grid: &NavGrid, from: Vec2, goal: Vec2) {
        if !self.needs_path() {
            return;
        }
        let path = grid.find_path(from, goal);
        if path.is_none() {
            trace!(?from, ?goal, "no path, falling back to direct movement");
        }
        self.set_path(path);
    }

    /// Unit direction toward the current waypoint, advancing past any within
    /// `tolerance`. `None` once the path is exhausted or failed.
    pub fn direction(&mut self, from: Vec2, tolerance: f32) -> Option<Vec2> {
        while let Some(waypoint) = self.waypoints.get(self.index) {
            if from.distance(*waypoint) > tolerance {
                return Some((*waypoint - from).normalized());
            }
            self.index += 1;
        }
        None
    }

    pub fn tick(&mut self, dt_ms: f32) {
        self.recompute_timer_ms -= dt_ms;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.index = 0;
        self.recompute_timer_ms = 0.0;
        self.failed = false;
    }

    pub fn remaining(&self) -> &[Vec2] {
        self.waypoints.get(self.index..).unwrap_or(&[])
    }
}

/// Direction toward `goal`: straight when `direct`, else along the follower,
/// else straight as the fallback.
pub fn steer_toward(
    follower: &mut PathFollower,
    from: Vec2,
    goal: Vec2,
    direct: bool,
    tolerance: f32,
) -> Vec2 {
    if direct {
        return (goal - from).normalized();
    }
    follower
        .direction(from, tolerance)
        .unwrap_or_else(|| (goal - from).normalized())
}

// ── Neighbour lookup ─────────────────────────────────────────────────

/// Bucket grid of unit centers, rebuilt by the scheduler every tick.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    cell_size: f32,
    buckets: HashMap<(i32, i32), Vec<(Entity, Vec2)>>,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            buckets: HashMap::new(),
        }
    }

    fn key(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x / self.cell_size).floor() as i32,
            (p.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn insert(&mut self, entity: Entity, center: Vec2) {
        let key = self.key(center);
        self.buckets.entry(key).or_default().push((entity, center));
    }

    /// Every indexed entity within `radius` of `center`.
    pub fn neighbors(&self, center: Vec2, radius: f32) -> Vec<(Entity, Vec2)> {
        let (cx, cy) = self.key(center);
        let span = (radius / self.cell_size).ceil() as i32;
        let radius_sq = radius * radius;
        let mut out = Vec::new();
        for gx in (cx - span)..=(cx + span) {
            for gy in (cy - span)..=(cy + span) {
                let Some(bucket) = self.buckets.get(&(gx, gy)) else {
                    continue;
                };
                out.extend(
                    bucket
                        .iter()
                        .filter(|(_, p)| p.distance_sq(center) <= radius_sq)
                        .copied(),
                );
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Push-apart velocity for `entity`. Each close neighbour contributes in
/// proportion to how deep it overlaps; the sum is capped at `max_speed`.
pub fn separation_force(
    entity: Entity,
    center: Vec2,
    index: &SpatialIndex,
    distance: f32,
    max_speed: f32,
) -> Vec2 {
    let mut push = Vec2::ZERO;
    for (other, other_center) in index.neighbors(center, distance) {
        if other == entity {
            continue;
        }
        let offset = center - other_center;
        let d = offset.length();
        let away = if d < 0.0001 {
            // Stacked exactly: split along x by id so the pair separates.
            if entity.id() < other.id() {
                Vec2::new(-1.0, 0.0)
            } else {
                Vec2::new(1.0, 0.0)
            }
        } else {
            offset.scale(1.0 / d)
        };
        let severity = ((distance - d) / distance).clamp(0.0, 1.0);
        push += away.scale(severity);
    }
    push.scale(max_speed).clamp_length(max_speed)
}

// ── Movement integration ─────────────────────────────────────────────

/// Move `center` by `delta`, sliding along blocked cells axis by axis.
/// Returns the new center.
pub fn apply_movement(grid: &NavGrid, center: Vec2, delta: Vec2) -> Vec2 {
    if delta.is_zero() {
        return center;
    }
    let full = center + delta;
    if grid.is_walkable(full) {
        return full;
    }
    let along_x = Vec2::new(center.x + delta.x, center.y);
    if delta.x != 0.0 && grid.is_walkable(along_x) {
        return along_x;
    }
    let along_y = Vec2::new(center.x, center.y + delta.y);
    if delta.y != 0.0 && grid.is_walkable(along_y) {
        return along_y;
    }
    center
}

/// Walk up to `distance` from `from` along `direction`, stopping before the
/// first blocked sample.
pub fn dash_destination(grid: &NavGrid, from: Vec2, direction: Vec2, distance: f32) -> Vec2 {
    let step = grid.cell_size() * 0.25;
    let steps = (distance / step).ceil().max(1.0) as u32;
    let mut last = from;
    for i in 1..=steps {
        let travelled = (i as f32 * step).min(distance);
        let next = from + direction.scale(travelled);
        if !grid.is_walkable(next) {
            break;
        }
        last = next;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::Rect;

    fn open_grid() -> NavGrid {
        NavGrid::new(20, 20, 40.0)
    }

    /// A full-height wall at x in [200, 240).
    fn walled_grid() -> NavGrid {
        NavGrid::from_obstacles(800.0, 800.0, 40.0, &[Rect::new(200.0, 0.0, 40.0, 800.0)])
    }

    #[test]
    fn follower_skips_first_point_and_advances() {
        let mut f = PathFollower::new(1000.0);
        f.set_path(Some(vec![
            Vec2::new(20.0, 20.0),
            Vec2::new(100.0, 20.0),
            Vec2::new(100.0, 100.0),
        ]));
        assert!(!f.needs_path());
        assert_eq!(f.direction(Vec2::new(20.0, 20.0), 5.0), Some(Vec2::new(1.0, 0.0)));
        assert_eq!(f.direction(Vec2::new(100.0, 22.0), 5.0), Some(Vec2::new(0.0, 1.0)));
        assert_eq!(f.direction(Vec2::new(100.0, 99.0), 5.0), None);
        assert!(f.needs_path());
    }

    #[test]
    fn follower_recomputes_on_interval() {
        let mut f = PathFollower::new(400.0);
        f.set_path(Some(vec![Vec2::ZERO, Vec2::new(500.0, 0.0)]));
        f.tick(399.0);
        assert!(!f.needs_path());
        f.tick(1.0);
        assert!(f.needs_path());
    }

    #[test]
    fn failed_search_degrades_to_direct() {
        let mut f = PathFollower::new(400.0);
        f.set_path(None);
        assert!(!f.needs_path());
        let dir = steer_toward(&mut f, Vec2::ZERO, Vec2::new(0.0, 10.0), false, 5.0);
        assert_eq!(dir, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn neighbors_respect_radius() {
        let mut world = hecs::World::new();
        let a = world.spawn((0u8,));
        let b = world.spawn((0u8,));
        let c = world.spawn((0u8,));
        let mut index = SpatialIndex::new(64.0);
        index.insert(a, Vec2::new(10.0, 10.0));
        index.insert(b, Vec2::new(40.0, 10.0));
        index.insert(c, Vec2::new(400.0, 10.0));

        let near: Vec<_> = index
            .neighbors(Vec2::new(10.0, 10.0), 50.0)
            .into_iter()
            .map(|(e, _)| e)
            .collect();
        assert!(near.contains(&a));
        assert!(near.contains(&b));
        assert!(!near.contains(&c));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn separation_pushes_apart_and_is_capped() {
        let mut world = hecs::World::new();
        let a = world.spawn((0u8,));
        let b = world.spawn((0u8,));
        let c = world.spawn((0u8,));
        let mut index = SpatialIndex::new(64.0);
        index.insert(a, Vec2::new(100.0, 100.0));
        index.insert(b, Vec2::new(110.0, 100.0));
        index.insert(c, Vec2::new(110.0, 100.0));

        let force = separation_force(a, Vec2::new(100.0, 100.0), &index, 36.0, 70.0);
        assert!(force.x < 0.0);
        assert!(force.length() <= 70.0 + 1e-3);

        let empty = SpatialIndex::new(64.0);
        let far = separation_force(a, Vec2::new(100.0, 100.0), &empty, 36.0, 70.0);
        assert!(far.is_zero());
    }

    #[test]
    fn movement_slides_along_walls() {
        let grid = walled_grid();
        let start = Vec2::new(180.0, 100.0);
        let moved = apply_movement(&grid, start, Vec2::new(30.0, 10.0));
        assert_eq!(moved, Vec2::new(180.0, 110.0));
        let open = apply_movement(&open_grid(), start, Vec2::new(5.0, 0.0));
        assert_eq!(open, Vec2::new(185.0, 100.0));
    }

    #[test]
    fn dash_stops_before_walls() {
        let grid = walled_grid();
        let end = dash_destination(&grid, Vec2::new(100.0, 100.0), Vec2::new(1.0, 0.0), 300.0);
        assert!(end.x < 200.0);
        assert!(end.x >= 190.0);
    }
}
