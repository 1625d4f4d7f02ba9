//! Moving obstacle geometry
//!
//! An obstacle is an axis-aligned rectangle whose top edge oscillates
//! vertically with the global tick counter:
//! - x: fixed left edge
//! - y(tick) = y0 + amplitude * sin(tick * frequency)
//! - width/height: fixed rectangle size

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{OBSTACLE_HEIGHT, OBSTACLE_WIDTH};

/// A vertically oscillating rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Left edge (fixed)
    pub x: f32,
    /// Resting top edge
    pub y0: f32,
    /// Current top edge
    pub y: f32,
    pub amplitude: f32,
    pub frequency: f32,
    pub width: f32,
    pub height: f32,
}

impl Obstacle {
    pub fn new(x: f32, y: f32, amplitude: f32, frequency: f32) -> Self {
        Self {
            x,
            y0: y,
            y,
            amplitude,
            frequency,
            width: OBSTACLE_WIDTH,
            height: OBSTACLE_HEIGHT,
        }
    }

    /// Move to the position for the given tick
    pub fn update(&mut self, tick: u64) {
        self.y = self.y0 + self.amplitude * (tick as f32 * self.frequency).sin();
    }

    /// Center of the rectangle (used for repulsion)
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rectangle bounds as (min corner, max corner)
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let min = Vec2::new(self.x, self.y);
        (min, min + Vec2::new(self.width, self.height))
    }
}

/// All obstacles of a run, updated once per tick and read-only afterwards
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleSet {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// Advance every obstacle to the given tick
    pub fn update(&mut self, tick: u64) {
        for obstacle in &mut self.obstacles {
            obstacle.update(tick);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_obstacle_oscillation_is_not_cumulative() {
        let mut obstacle = Obstacle::new(100.0, 200.0, 2.0, PI / 2.0);
        obstacle.update(1);
        assert!((obstacle.y - 202.0).abs() < 1e-4);
        obstacle.update(1);
        // Same tick, same position
        assert!((obstacle.y - 202.0).abs() < 1e-4);
        obstacle.update(2);
        assert!((obstacle.y - 200.0).abs() < 1e-4);
        assert_eq!(obstacle.x, 100.0);
    }

    #[test]
    fn test_obstacle_center_and_bounds() {
        let obstacle = Obstacle::new(10.0, 20.0, 1.0, 0.0);
        assert_eq!(obstacle.center(), Vec2::new(20.0, 35.0));
        let (min, max) = obstacle.bounds();
        assert_eq!(min, Vec2::new(10.0, 20.0));
        assert_eq!(max, Vec2::new(30.0, 50.0));
    }

    #[test]
    fn test_set_updates_all() {
        let mut set = ObstacleSet::new(vec![
            Obstacle::new(0.0, 0.0, 1.0, PI / 2.0),
            Obstacle::new(50.0, 50.0, 2.0, PI / 2.0),
        ]);
        set.update(1);
        let ys: Vec<f32> = set.iter().map(|o| o.y).collect();
        assert!((ys[0] - 1.0).abs() < 1e-4);
        assert!((ys[1] - 52.0).abs() < 1e-4);
    }
}
