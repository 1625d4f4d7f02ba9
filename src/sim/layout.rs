//! Initial agent/target/obstacle layout
//!
//! Persisted externally as an ordered JSON triple:
//! `[[agent (x, y)...], [target (x, y)...], [obstacle (x, y, amplitude, frequency)...]]`

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::obstacle::{Obstacle, ObstacleSet};
use crate::error::SimError;
use crate::settings::Settings;

type LayoutTriple = (Vec<[f32; 2]>, Vec<[f32; 2]>, Vec<[f32; 4]>);

/// Start positions, targets and obstacles of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub agents: Vec<Vec2>,
    pub targets: Vec<Vec2>,
    /// (x, y, amplitude, frequency)
    pub obstacles: Vec<[f32; 4]>,
}

impl Layout {
    /// Random layout: agents in a start square on the left, targets on a
    /// column near the right edge, obstacles in the middle band.
    ///
    /// Expects settings that passed [`Settings::validate`].
    pub fn generate<R: Rng>(settings: &Settings, rng: &mut R) -> Self {
        let env = &settings.env;
        let swarm = &settings.swarm;
        let (width, height) = (env.screen_width, env.screen_height);

        let agents = (0..swarm.num_agents)
            .map(|_| {
                Vec2::new(
                    rng.random_range(0.0..=swarm.start_area_len),
                    rng.random_range(height / 3.0..=height / 3.0 + swarm.start_area_len),
                )
            })
            .collect();

        let target_x = width - swarm.starting_area_width - env.target_size / 2.0;
        let targets = (0..env.num_target)
            .map(|_| Vec2::new(target_x, rng.random_range(50.0..=(height - 50.0).max(50.0))))
            .collect();

        let obstacles = (0..env.num_hurdle)
            .map(|_| {
                let amplitude = if rng.random_bool(0.5) { 1.0 } else { 2.0 };
                [
                    rng.random_range(width / 3.0..=width * 4.0 / 5.0),
                    rng.random_range(0.0..=(height - 50.0).max(0.0)),
                    amplitude,
                    rng.random_range(0.0..0.1),
                ]
            })
            .collect();

        Self {
            agents,
            targets,
            obstacles,
        }
    }

    /// Parse the ordered-triple JSON form
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let (agents, targets, obstacles): LayoutTriple = serde_json::from_str(json)?;
        Ok(Self {
            agents: agents.into_iter().map(Vec2::from).collect(),
            targets: targets.into_iter().map(Vec2::from).collect(),
            obstacles,
        })
    }

    /// Serialize to the ordered-triple JSON form
    pub fn to_json_string(&self) -> Result<String, SimError> {
        let triple: LayoutTriple = (
            self.agents.iter().map(|p| p.to_array()).collect(),
            self.targets.iter().map(|p| p.to_array()).collect(),
            self.obstacles.clone(),
        );
        Ok(serde_json::to_string(&triple)?)
    }

    /// Check the layout against the configuration it will be run with
    pub fn validate(&self, settings: &Settings) -> Result<(), SimError> {
        if self.agents.len() != settings.swarm.num_agents {
            return Err(SimError::InvalidLayout(format!(
                "layout has {} agents but NUM_AGENTS is {}",
                self.agents.len(),
                settings.swarm.num_agents
            )));
        }
        if self.targets.is_empty() {
            return Err(SimError::InvalidLayout("layout has no targets".to_string()));
        }
        let finite = self.agents.iter().chain(&self.targets).all(|p| p.is_finite())
            && self.obstacles.iter().flatten().all(|v| v.is_finite());
        if !finite {
            return Err(SimError::InvalidLayout(
                "layout contains non-finite coordinates".to_string(),
            ));
        }
        let arena = Vec2::new(settings.env.screen_width, settings.env.screen_height);
        for obstacle in self.obstacle_set().iter() {
            let (min, max) = obstacle.bounds();
            if min.cmplt(Vec2::ZERO).any() || max.cmpgt(arena).any() {
                log::warn!(
                    "Obstacle at ({}, {}) extends outside the {}x{} arena",
                    obstacle.x,
                    obstacle.y0,
                    arena.x,
                    arena.y
                );
            }
        }
        Ok(())
    }

    /// Build the obstacle set described by this layout
    pub fn obstacle_set(&self) -> ObstacleSet {
        ObstacleSet::new(
            self.obstacles
                .iter()
                .map(|&[x, y, amplitude, frequency]| Obstacle::new(x, y, amplitude, frequency))
                .collect(),
        )
    }
}
