use crate::protocol::{Team, Vec2};

use super::pathfinding::NavGrid;

pub const ARENA_WIDTH: f32 = 2400.0;
pub const ARENA_HEIGHT: f32 = 1200.0;
pub const NAV_CELL_SIZE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }
}

/// Static structure placements for one side.
#[derive(Debug, Clone)]
pub struct SideLayout {
    pub team: Team,
    pub nexus: Vec2,
    pub towers: Vec<Vec2>,
    /// Where this side's minion waves appear.
    pub lane_anchor: Vec2,
}

/// Fixed arena map: one lane between two walls, jungle above and below.
#[derive(Debug, Clone)]
pub struct ArenaLayout {
    pub width: f32,
    pub height: f32,
    pub cell_size: f32,
    pub obstacles: Vec<Rect>,
    pub blue: SideLayout,
    pub red: SideLayout,
    pub camps: Vec<Vec2>,
    pub avatar_spawn: Vec2,
}

impl ArenaLayout {
    pub fn standard() -> Self {
        ArenaLayout {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            cell_size: NAV_CELL_SIZE,
            obstacles: vec![
                // Upper lane wall with a gap into the upper jungle.
                Rect::new(640.0, 440.0, 520.0, 40.0),
                Rect::new(1240.0, 440.0, 520.0, 40.0),
                // Lower lane wall with a gap into the lower jungle.
                Rect::new(640.0, 720.0, 520.0, 40.0),
                Rect::new(1240.0, 720.0, 520.0, 40.0),
                // Jungle rocks.
                Rect::new(1000.0, 160.0, 80.0, 160.0),
                Rect::new(1320.0, 880.0, 80.0, 160.0),
            ],
            blue: SideLayout {
                team: Team::Blue,
                nexus: Vec2::new(160.0, 600.0),
                towers: vec![Vec2::new(560.0, 600.0)],
                lane_anchor: Vec2::new(360.0, 600.0),
            },
            red: SideLayout {
                team: Team::Red,
                nexus: Vec2::new(2240.0, 600.0),
                towers: vec![Vec2::new(1840.0, 600.0)],
                lane_anchor: Vec2::new(2040.0, 600.0),
            },
            camps: vec![Vec2::new(880.0, 260.0), Vec2::new(1520.0, 940.0)],
            avatar_spawn: Vec2::new(300.0, 600.0),
        }
    }

    pub fn side(&self, team: Team) -> Option<&SideLayout> {
        match team {
            Team::Blue => Some(&self.blue),
            Team::Red => Some(&self.red),
            Team::Neutral => None,
        }
    }

    /// The point a side's minions march toward.
    pub fn objective_for(&self, team: Team) -> Option<Vec2> {
        self.side(team.opponent()).map(|side| side.nexus)
    }

    pub fn nav_grid(&self) -> NavGrid {
        NavGrid::from_obstacles(self.width, self.height, self.cell_size, &self.obstacles)
    }
}
