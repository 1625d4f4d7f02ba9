//! Swarm agents: a shared kinematic core plus a protocol-specific payload

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::forces::{FlockingForces, obstacle_repulsion};
use super::obstacle::ObstacleSet;
use crate::settings::Settings;
use crate::wrap_angle;

/// Homogeneous kinematic constants shared by every agent of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub speed: f32,
    pub interaction_radius: f32,
    pub separation_distance: f32,
    pub separation_strength: f32,
    pub alignment_strength: f32,
    pub attract_strength: f32,
    pub repulsion_radius: f32,
    /// Upper corner of the arena; the lower corner is the origin
    pub bounds: Vec2,
}

impl Kinematics {
    pub fn from_settings(settings: &Settings) -> Self {
        let swarm = &settings.swarm;
        Self {
            speed: swarm.agent_speed,
            interaction_radius: swarm.interaction_radius,
            separation_distance: swarm.separation_distance,
            separation_strength: swarm.separation_strength,
            alignment_strength: swarm.alignment_strength,
            attract_strength: swarm.attract_strength,
            repulsion_radius: swarm.repulsion_radius,
            bounds: Vec2::new(settings.env.screen_width, settings.env.screen_height),
        }
    }
}

/// One-way decision state used by the majority and voter protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Decision {
    #[default]
    Undecided,
    Committed,
}

impl Decision {
    /// Move to `Committed`; there is no transition back
    pub fn commit(&mut self) {
        *self = Decision::Committed;
    }

    pub fn is_committed(self) -> bool {
        self == Decision::Committed
    }
}

/// Vote tally for one target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpinionTally {
    pub target: Vec2,
    pub votes: u32,
}

/// Cumulative per-target vote counts, keyed by target value in configuration order.
///
/// Never reset during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpinionCount {
    tallies: Vec<OpinionTally>,
}

impl OpinionCount {
    pub fn new(targets: &[Vec2]) -> Self {
        Self {
            tallies: targets
                .iter()
                .map(|&target| OpinionTally { target, votes: 0 })
                .collect(),
        }
    }

    /// Add one vote for `target`. Returns false if it is not a configured target.
    pub fn record(&mut self, target: Vec2) -> bool {
        match self.tallies.iter_mut().find(|t| t.target == target) {
            Some(tally) => {
                tally.votes += 1;
                true
            }
            None => false,
        }
    }

    /// Votes recorded for `target` so far
    pub fn get(&self, target: Vec2) -> Option<u32> {
        self.tallies
            .iter()
            .find(|t| t.target == target)
            .map(|t| t.votes)
    }

    /// Target with the most votes; ties go to the earliest configured target
    pub fn majority(&self) -> Option<Vec2> {
        let mut best: Option<&OpinionTally> = None;
        for tally in &self.tallies {
            if best.is_none_or(|b| tally.votes > b.votes) {
                best = Some(tally);
            }
        }
        best.map(|t| t.target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpinionTally> {
        self.tallies.iter()
    }
}

/// Protocol-specific agent data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProtocolState {
    Majority {
        opinion_count: OpinionCount,
        decision: Decision,
    },
    Voter {
        decision: Decision,
    },
    Kuramoto {
        /// Goal-seeking bias: bearing from the nearest target to the agent, refreshed every tick
        omega: f32,
        /// Grows by a fixed increment each checkpoint, capped
        coupling_k: f32,
        /// Result of the latest checkpoint; cleared at the start of each one
        phase_synched: bool,
    },
}

impl ProtocolState {
    /// Whether the agent steers with the flocking forces between checkpoints
    pub fn steering_enabled(&self) -> bool {
        match self {
            ProtocolState::Majority { decision, .. } | ProtocolState::Voter { decision } => {
                decision.is_committed()
            }
            ProtocolState::Kuramoto { phase_synched, .. } => *phase_synched,
        }
    }
}

/// A swarm member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    pub pos: Vec2,
    /// Direction of travel, always in (-π, π]
    pub heading: f32,
    pub kinematics: Kinematics,
    /// Had no neighbors the last time the direction was updated
    pub is_latent: bool,
    /// Circular mean of neighbor headings at the last checkpoint (unset without neighbors)
    pub consensus_direction: Option<f32>,
    pub nearest_goal: Option<Vec2>,
    pub protocol: ProtocolState,
}

impl Agent {
    pub fn new(
        id: u32,
        pos: Vec2,
        heading: f32,
        kinematics: Kinematics,
        protocol: ProtocolState,
    ) -> Self {
        Self {
            id,
            pos,
            heading: wrap_angle(heading),
            kinematics,
            is_latent: false,
            consensus_direction: None,
            nearest_goal: None,
            protocol,
        }
    }

    /// Compose the flocking forces into a new heading
    pub fn update_direction(&mut self, forces: &FlockingForces) {
        self.heading = self.compose_heading(forces);
        self.is_latent = !forces.has_neighbors;
    }

    /// Heading the flocking forces would produce, without mutating the agent
    pub fn compose_heading(&self, forces: &FlockingForces) -> f32 {
        let k = &self.kinematics;
        let steer = if forces.has_neighbors {
            Vec2::from_angle(self.heading + k.alignment_strength * forces.alignment)
                + forces.separation * k.separation_strength
                + forces.cohesion * k.attract_strength
                + forces.goal_bias
        } else {
            forces.goal_bias
        };

        if steer.length_squared() > 0.0 && steer.is_finite() {
            wrap_angle(steer.y.atan2(steer.x))
        } else {
            self.heading
        }
    }

    /// Advance one step along the heading, get pushed off nearby obstacles,
    /// then clip into the arena
    pub fn move_step(&mut self, obstacles: &ObstacleSet) {
        let k = self.kinematics;
        self.pos += Vec2::from_angle(self.heading) * k.speed;
        self.pos += obstacle_repulsion(self.pos, obstacles, k.repulsion_radius);
        self.clip_to_bounds();
    }

    pub fn clip_to_bounds(&mut self) {
        self.pos = self.pos.clamp(Vec2::ZERO, self.kinematics.bounds);
    }

    /// Within `radius` of the selected goal
    pub fn reached_goal(&self, radius: f32) -> bool {
        self.nearest_goal
            .is_some_and(|goal| self.pos.distance(goal) <= radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::obstacle::Obstacle;
    use std::f32::consts::PI;

    fn kinematics() -> Kinematics {
        Kinematics::from_settings(&Settings::default())
    }

    fn voter(pos: Vec2, heading: f32) -> Agent {
        Agent::new(
            0,
            pos,
            heading,
            kinematics(),
            ProtocolState::Voter {
                decision: Decision::Undecided,
            },
        )
    }

    #[test]
    fn test_decision_is_one_way() {
        let mut d = Decision::default();
        assert!(!d.is_committed());
        d.commit();
        d.commit();
        assert!(d.is_committed());
    }

    #[test]
    fn test_opinion_count_majority_and_ties() {
        let t1 = Vec2::new(1.0, 1.0);
        let t2 = Vec2::new(2.0, 2.0);
        let mut count = OpinionCount::new(&[t1, t2]);
        // Tie at zero goes to the first target
        assert_eq!(count.majority(), Some(t1));
        assert!(count.record(t2));
        assert_eq!(count.majority(), Some(t2));
        assert!(count.record(t1));
        assert_eq!(count.majority(), Some(t1));
        assert!(!count.record(Vec2::new(9.0, 9.0)));
        assert_eq!(count.get(Vec2::new(9.0, 9.0)), None);
        assert_eq!(count.iter().count(), 2);
    }

    #[test]
    fn test_move_step_clips_to_bounds() {
        let mut agent = voter(Vec2::new(0.5, 699.5), PI * 0.75);
        agent.move_step(&ObstacleSet::default());
        assert_eq!(agent.pos.x, 0.0);
        assert_eq!(agent.pos.y, 700.0);
    }

    #[test]
    fn test_move_at_obstacle_center_stays_finite() {
        let obstacle = Obstacle::new(100.0, 100.0, 1.0, 0.0);
        let center = obstacle.center();
        let mut agent = voter(center, 0.0);
        agent.kinematics.speed = 0.0;
        agent.move_step(&ObstacleSet::new(vec![obstacle]));
        assert!(agent.pos.is_finite());
        assert_eq!(agent.pos, center);
    }

    #[test]
    fn test_latent_agent_follows_goal_bias() {
        let mut agent = voter(Vec2::new(10.0, 10.0), 0.0);
        let forces = FlockingForces {
            goal_bias: Vec2::new(0.0, 1.0),
            ..Default::default()
        };
        agent.update_direction(&forces);
        assert!(agent.is_latent);
        assert!((agent.heading - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_steer_keeps_heading() {
        let mut agent = voter(Vec2::new(10.0, 10.0), 1.0);
        agent.update_direction(&FlockingForces::default());
        assert_eq!(agent.heading, 1.0);
    }

    #[test]
    fn test_neighbors_clear_latent_flag() {
        let mut agent = voter(Vec2::new(10.0, 10.0), 0.0);
        agent.is_latent = true;
        let forces = FlockingForces {
            has_neighbors: true,
            ..Default::default()
        };
        agent.update_direction(&forces);
        assert!(!agent.is_latent);
        assert!(agent.heading.abs() < 1e-6);
    }

    #[test]
    fn test_neighbor_forces_are_weighted() {
        let mut agent = voter(Vec2::new(10.0, 10.0), 0.3);
        let forces = FlockingForces {
            separation: Vec2::new(1.0, -2.0),
            alignment: 0.5,
            cohesion: Vec2::new(30.0, 40.0),
            goal_bias: Vec2::new(0.01, 0.02),
            has_neighbors: true,
        };
        agent.update_direction(&forces);

        // Alignment 0.08, separation 0.17, attraction 0.002
        let turned = 0.3f32 + 0.08 * 0.5;
        let x = turned.cos() + 0.17 + 30.0 * 0.002 + 0.01;
        let y = turned.sin() - 0.34 + 40.0 * 0.002 + 0.02;
        assert!((agent.heading - y.atan2(x)).abs() < 1e-5);
        assert!(!agent.is_latent);
    }

    #[test]
    fn test_steering_gate() {
        let mut state = ProtocolState::Majority {
            opinion_count: OpinionCount::new(&[]),
            decision: Decision::Undecided,
        };
        assert!(!state.steering_enabled());
        if let ProtocolState::Majority { decision, .. } = &mut state {
            decision.commit();
        }
        assert!(state.steering_enabled());

        let state = ProtocolState::Kuramoto {
            omega: 0.0,
            coupling_k: 0.0,
            phase_synched: false,
        };
        assert!(!state.steering_enabled());
    }
}
