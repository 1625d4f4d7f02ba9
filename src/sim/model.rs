//! The swarm model: one population running one consensus protocol
//!
//! Every tick is a read-then-write pass:
//! 1. snapshot positions/headings and rebuild neighbor lists
//! 2. on checkpoint ticks, run the protocol's decision step
//! 3. compute flocking forces for steering agents from a fresh snapshot
//! 4. commit headings, then move every agent

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::agent::{Agent, Decision, Kinematics, OpinionCount, ProtocolState};
use super::consensus::{
    CheckpointContext, kuramoto_checkpoint, kuramoto_refresh_goals, majority_checkpoint,
    voter_checkpoint,
};
use super::forces::{
    FlockingForces, centroid, compute_forces, count_within, neighborhoods, snapshot,
};
use super::layout::Layout;
use super::obstacle::ObstacleSet;
use crate::error::SimError;
use crate::metrics::{CheckpointRecord, MetricsSink};
use crate::settings::Settings;

/// Collective decision protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolKind {
    Majority,
    Voter,
    Kuramoto,
}

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 3] = [
        ProtocolKind::Majority,
        ProtocolKind::Voter,
        ProtocolKind::Kuramoto,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::Majority => "majority",
            ProtocolKind::Voter => "voter",
            ProtocolKind::Kuramoto => "kuramoto",
        }
    }

    /// Human-readable model name
    pub fn display_name(&self) -> &'static str {
        match self {
            ProtocolKind::Majority => "Majority Model",
            ProtocolKind::Voter => "Voter Model",
            ProtocolKind::Kuramoto => "Kuramoto Model",
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProtocolKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "majority" | "m" => Ok(ProtocolKind::Majority),
            "voter" | "v" => Ok(ProtocolKind::Voter),
            "kuramoto" | "k" => Ok(ProtocolKind::Kuramoto),
            _ => Err(SimError::UnknownProtocol(s.to_string())),
        }
    }
}

/// A population of agents driven by one consensus protocol
#[derive(Debug, Clone)]
pub struct SwarmModel {
    pub kind: ProtocolKind,
    /// Seed of the model's random source
    pub seed: u64,
    /// Agent arena (neighbor lists index into it)
    pub agents: Vec<Agent>,
    pub targets: Vec<Vec2>,
    consensus_period: u64,
    k_increment: f32,
    target_radius: f32,
    /// Neighbor lists of the current tick
    neighbors: Vec<Vec<usize>>,
    rng: Pcg32,
}

impl SwarmModel {
    /// Build a model from a validated layout and configuration
    pub fn new(
        kind: ProtocolKind,
        layout: &Layout,
        settings: &Settings,
        seed: u64,
    ) -> Result<Self, SimError> {
        settings.validate()?;
        layout.validate(settings)?;

        let mut rng = Pcg32::seed_from_u64(seed);
        let kinematics = Kinematics::from_settings(settings);
        let targets = layout.targets.clone();

        let agents = layout
            .agents
            .iter()
            .enumerate()
            .map(|(i, &pos)| {
                let heading = rng.random_range(0.0..std::f32::consts::TAU);
                let protocol = match kind {
                    ProtocolKind::Majority => ProtocolState::Majority {
                        opinion_count: OpinionCount::new(&targets),
                        decision: Decision::Undecided,
                    },
                    ProtocolKind::Voter => ProtocolState::Voter {
                        decision: Decision::Undecided,
                    },
                    ProtocolKind::Kuramoto => ProtocolState::Kuramoto {
                        omega: 0.0,
                        coupling_k: 0.0,
                        phase_synched: true,
                    },
                };
                let mut agent = Agent::new(i as u32, pos, heading, kinematics, protocol);
                agent.is_latent = rng.random_bool(0.5);
                if kind == ProtocolKind::Voter {
                    agent.nearest_goal = targets.choose(&mut rng).copied();
                }
                agent.clip_to_bounds();
                agent
            })
            .collect();

        log::info!(
            "{} initialized: {} agents, {} targets, seed {}",
            kind,
            layout.agents.len(),
            targets.len(),
            seed
        );

        Ok(Self {
            kind,
            seed,
            agents,
            targets,
            consensus_period: settings.swarm.consensus_period,
            k_increment: settings.swarm.k_increment,
            target_radius: settings.env.target_size,
            neighbors: Vec::new(),
            rng,
        })
    }

    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    /// Whether `tick` runs the protocol's decision step
    pub fn is_checkpoint(&self, tick: u64) -> bool {
        tick % self.consensus_period == 0
    }

    /// Neighbors of agent `index` for the current tick
    pub fn neighbors_of(&self, index: usize) -> &[usize] {
        self.neighbors.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Advance the swarm by one tick
    pub fn update(&mut self, tick: u64, obstacles: &ObstacleSet, metrics: &mut MetricsSink) {
        let snap = snapshot(&self.agents);
        let radius = self
            .agents
            .first()
            .map(|a| a.kinematics.interaction_radius)
            .unwrap_or(0.0);
        self.neighbors = neighborhoods(&snap, radius);

        if self.kind == ProtocolKind::Kuramoto {
            kuramoto_refresh_goals(&mut self.agents, &self.targets);
        }

        if self.is_checkpoint(tick) {
            log::info!("{} checkpoint at tick {}", self.name(), tick);
            let ctx = CheckpointContext {
                snapshot: &snap,
                neighbors: &self.neighbors,
                targets: &self.targets,
                k_increment: self.k_increment,
            };
            let direction_mismatch = match self.kind {
                ProtocolKind::Majority => majority_checkpoint(&mut self.agents, &ctx),
                ProtocolKind::Voter => voter_checkpoint(&mut self.agents, &ctx, &mut self.rng),
                ProtocolKind::Kuramoto => kuramoto_checkpoint(&mut self.agents, &ctx),
            };
            let collisions = self
                .agents
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    count_within(&snap, i, &self.neighbors[i], a.kinematics.separation_distance)
                })
                .collect();

            let record = CheckpointRecord {
                tick,
                direction_mismatch,
                collisions,
                decision_accuracy: self.decision_accuracy(),
                phase_sync: self.phase_sync_average(),
            };
            log::debug!(
                "Tick {}: avg mismatch {:.4}, accuracy {:.2}",
                tick,
                record.avg_mismatch(),
                record.decision_accuracy
            );
            metrics.record_checkpoint(record);
        }

        self.steer_and_move(obstacles);
        metrics.record_tick(self.agents_at_target());
    }

    /// Flocking for steering agents (double-buffered), then motion for all
    fn steer_and_move(&mut self, obstacles: &ObstacleSet) {
        let snap = snapshot(&self.agents);
        let swarm_centroid = centroid(&snap);

        let forces: Vec<Option<FlockingForces>> = self
            .agents
            .iter()
            .enumerate()
            .map(|(i, agent)| {
                agent.protocol.steering_enabled().then(|| {
                    compute_forces(
                        &snap,
                        i,
                        &self.neighbors[i],
                        agent.kinematics.separation_distance,
                        swarm_centroid,
                        agent.nearest_goal,
                    )
                })
            })
            .collect();

        for (agent, forces) in self.agents.iter_mut().zip(&forces) {
            if let Some(forces) = forces {
                agent.update_direction(forces);
            }
            agent.move_step(obstacles);
        }
    }

    /// Fraction of agents within the target radius of their selected goal
    pub fn decision_accuracy(&self) -> f32 {
        if self.agents.is_empty() {
            return 0.0;
        }
        let reached = self
            .agents
            .iter()
            .filter(|a| a.reached_goal(self.target_radius))
            .count();
        reached as f32 / self.agents.len() as f32
    }

    /// Agents within the target radius of any target
    pub fn agents_at_target(&self) -> u32 {
        self.agents
            .iter()
            .filter(|a| {
                self.targets
                    .iter()
                    .any(|t| a.pos.distance(*t) <= self.target_radius)
            })
            .count() as u32
    }

    /// Fraction of agents whose latest checkpoint produced a phase update (Kuramoto only)
    pub fn phase_sync_average(&self) -> Option<f32> {
        if self.kind != ProtocolKind::Kuramoto || self.agents.is_empty() {
            return None;
        }
        let synched = self
            .agents
            .iter()
            .filter(|a| {
                matches!(
                    a.protocol,
                    ProtocolState::Kuramoto {
                        phase_synched: true,
                        ..
                    }
                )
            })
            .count();
        Some(synched as f32 / self.agents.len() as f32)
    }
}
