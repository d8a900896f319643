//! Square grid geometry (origin bottom-left, Manhattan metric)

use serde::{Deserialize, Serialize};

use crate::core::config::GridConfig;
use crate::core::types::{Direction, Position};

/// Fixed-size board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// 0 <= x < width and 0 <= y < height
    pub fn is_valid_position(&self, position: Position) -> bool {
        position.x >= 0 && position.x < self.width && position.y >= 0 && position.y < self.height
    }

    /// All tiles, row by row from the bottom
    pub fn tiles(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }
}

impl From<GridConfig> for Grid {
    fn from(config: GridConfig) -> Self {
        Self::new(config.width, config.height)
    }
}

/// Manhattan distance |dx| + |dy|
pub fn distance(a: Position, b: Position) -> u32 {
    a.distance(&b)
}

/// Whether `attacker` stands in the half-plane behind a target facing `facing`
///
/// Facing N means the back is south, so the attacker must have a smaller y.
/// Only the axis of the facing counts; there is no diagonal credit.
pub fn is_behind(attacker: Position, target: Position, facing: Direction) -> bool {
    match facing {
        Direction::North => attacker.y < target.y,
        Direction::South => attacker.y > target.y,
        Direction::East => attacker.x < target.x,
        Direction::West => attacker.x > target.x,
    }
}

/// Facing after a displacement from `from` to `to`
///
/// Vertical wins ties (|dy| >= |dx|). `None` when the two are equal.
pub fn facing_for(from: Position, to: Position) -> Option<Direction> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx == 0 && dy == 0 {
        return None;
    }

    if dy.abs() >= dx.abs() {
        if dy > 0 {
            Some(Direction::North)
        } else {
            Some(Direction::South)
        }
    } else if dx > 0 {
        Some(Direction::East)
    } else {
        Some(Direction::West)
    }
}

/// The tile one step past `target` on the ray from `shooter` through it
pub fn extend_line(shooter: Position, target: Position) -> Position {
    let step_x = (target.x - shooter.x).signum();
    let step_y = (target.y - shooter.y).signum();
    Position::new(target.x + step_x, target.y + step_y)
}
