//! Performance metrics collected while the simulation runs
//!
//! One record per consensus checkpoint plus a per-tick count of agents that
//! have arrived at a target. Serializable so an outer layer can log or plot it.

use serde::{Deserialize, Serialize};

/// Measurements taken at a single consensus checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Tick the checkpoint ran at
    pub tick: u64,
    /// Per-agent |consensus_direction - direction| before commit
    /// (only agents that computed a consensus direction)
    pub direction_mismatch: Vec<f32>,
    /// Per-agent count of neighbors closer than the separation distance
    pub collisions: Vec<u32>,
    /// Fraction of agents within the target radius of their selected goal
    pub decision_accuracy: f32,
    /// Fraction of agents that completed a phase update (Kuramoto only)
    #[serde(default)]
    pub phase_sync: Option<f32>,
}

impl CheckpointRecord {
    /// Mean direction mismatch, 0 when no agent reported one
    pub fn avg_mismatch(&self) -> f32 {
        mean(self.direction_mismatch.iter().copied())
    }

    /// Mean collision proxy count
    pub fn avg_collisions(&self) -> f32 {
        mean(self.collisions.iter().map(|&c| c as f32))
    }
}

/// Metrics accumulated over a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSink {
    pub checkpoints: Vec<CheckpointRecord>,
    /// Agents within target radius of any target, one entry per tick
    pub agents_at_target: Vec<u32>,
    /// Tick counter value when the run stopped
    pub final_tick: Option<u64>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_checkpoint(&mut self, record: CheckpointRecord) {
        self.checkpoints.push(record);
    }

    pub fn record_tick(&mut self, agents_at_target: u32) {
        self.agents_at_target.push(agents_at_target);
    }

    /// Average direction mismatch per checkpoint
    pub fn avg_mismatch_series(&self) -> Vec<f32> {
        self.checkpoints.iter().map(|c| c.avg_mismatch()).collect()
    }

    /// Average collision proxy per checkpoint
    pub fn avg_collision_series(&self) -> Vec<f32> {
        self.checkpoints.iter().map(|c| c.avg_collisions()).collect()
    }

    /// Decision accuracy per checkpoint
    pub fn decision_accuracy_series(&self) -> Vec<f32> {
        self.checkpoints.iter().map(|c| c.decision_accuracy).collect()
    }

    /// Phase-sync averages for the checkpoints that reported one
    pub fn phase_sync_series(&self) -> Vec<f32> {
        self.checkpoints.iter().filter_map(|c| c.phase_sync).collect()
    }

    /// Accuracy at the latest checkpoint
    pub fn latest_accuracy(&self) -> Option<f32> {
        self.checkpoints.last().map(|c| c.decision_accuracy)
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty() && self.agents_at_target.is_empty()
    }
}

fn mean<I: Iterator<Item = f32>>(values: I) -> f32 {
    let (sum, count) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f32 }
}
