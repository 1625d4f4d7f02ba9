//! Fixed timestep simulation driver
//!
//! Advances the tick counter, moves the obstacles, then asks the active
//! protocol model to update. Nothing is exposed mid-tick.

use std::sync::atomic::{AtomicBool, Ordering};

use super::layout::Layout;
use super::model::{ProtocolKind, SwarmModel};
use super::obstacle::ObstacleSet;
use crate::error::SimError;
use crate::metrics::MetricsSink;
use crate::settings::Settings;

/// A complete run: model, obstacles, metrics and the tick counter
#[derive(Debug, Clone)]
pub struct Simulation {
    pub model: SwarmModel,
    pub obstacles: ObstacleSet,
    pub metrics: MetricsSink,
    /// Next tick to execute (starts at 1)
    pub time_ticks: u64,
}

impl Simulation {
    pub fn new(
        kind: ProtocolKind,
        layout: &Layout,
        settings: &Settings,
        seed: u64,
    ) -> Result<Self, SimError> {
        let model = SwarmModel::new(kind, layout, settings, seed)?;
        Ok(Self {
            model,
            obstacles: layout.obstacle_set(),
            metrics: MetricsSink::new(),
            time_ticks: 1,
        })
    }

    /// Run until `max_steps` ticks have executed (0 = no budget) or `stop` is raised
    pub fn run(&mut self, max_steps: u64, stop: Option<&AtomicBool>) -> &MetricsSink {
        let mut steps = 0u64;
        loop {
            if max_steps != 0 && steps >= max_steps {
                break;
            }
            if stop.is_some_and(|s| s.load(Ordering::Relaxed)) {
                log::info!("Stop requested at tick {}", self.time_ticks);
                break;
            }
            tick(self);
            steps += 1;
        }
        self.metrics.final_tick = Some(self.time_ticks);
        log::info!(
            "{} finished after {} ticks ({} checkpoints)",
            self.model.name(),
            steps,
            self.metrics.checkpoints.len()
        );
        &self.metrics
    }
}

/// Advance the simulation by one tick
pub fn tick(sim: &mut Simulation) {
    let t = sim.time_ticks;
    sim.obstacles.update(t);
    sim.model.update(t, &sim.obstacles, &mut sim.metrics);
    sim.time_ticks += 1;
}
