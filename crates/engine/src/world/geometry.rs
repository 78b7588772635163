use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// Pixel-space position or displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub const fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// Axis-aligned rectangle in pixels, `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    /// Closest distance from `point` to the rectangle; zero when inside.
    pub fn distance_to(&self, point: Vec2) -> f32 {
        let near_x = point.x.clamp(self.x, self.x + self.width);
        let near_y = point.y.clamp(self.y, self.y + self.height);
        point.distance(Vec2::new(near_x, near_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_distance_is_zero_inside_and_euclidean_outside() {
        let rect = PixelRect {
            x: 16.0,
            y: 16.0,
            width: 32.0,
            height: 16.0,
        };
        assert_eq!(rect.distance_to(Vec2::new(20.0, 20.0)), 0.0);
        assert_eq!(rect.distance_to(Vec2::new(10.0, 20.0)), 6.0);
        assert_eq!(rect.distance_to(Vec2::new(51.0, 36.0)), 5.0);
    }

    #[test]
    fn direction_units_are_axis_aligned() {
        assert_eq!(Direction::Up.unit(), Vec2::new(0.0, -1.0));
        assert_eq!(Direction::Right.unit() * 0.5, Vec2::new(0.5, 0.0));
        assert_eq!(Direction::default(), Direction::Down);
    }
}
