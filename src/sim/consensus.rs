//! Checkpoint state transitions for the three consensus protocols
//!
//! Each function runs one protocol's discrete decision step over the whole
//! population. Inputs come from the tick snapshot; values produced by an
//! earlier step of the same checkpoint (consensus directions, goals) are
//! copied before any agent reads them, so agent order never matters.
//! Each returns the per-agent direction mismatch recorded before committing.

use glam::Vec2;
use rand::Rng;

use super::agent::{Agent, ProtocolState};
use super::forces::{AgentSnapshot, nearest_target};
use crate::consts::{MAX_COUPLING, PHASE_STEP};
use crate::{angle_mismatch, circular_mean, wrap_angle};

/// Read-only inputs shared by the checkpoint steps
#[derive(Debug, Clone, Copy)]
pub struct CheckpointContext<'a> {
    pub snapshot: &'a [AgentSnapshot],
    pub neighbors: &'a [Vec<usize>],
    pub targets: &'a [Vec2],
    /// Kuramoto coupling growth per checkpoint
    pub k_increment: f32,
}

impl CheckpointContext<'_> {
    /// Circular mean of the neighbors' snapshot headings
    fn neighbor_consensus(&self, index: usize) -> Option<f32> {
        circular_mean(self.neighbors[index].iter().map(|&j| self.snapshot[j].heading))
    }
}

/// Majority rule: tally neighbors' goals into the cumulative opinion count,
/// follow the most popular target and commit to the consensus heading
pub fn majority_checkpoint(agents: &mut [Agent], ctx: &CheckpointContext) -> Vec<f32> {
    for (i, agent) in agents.iter_mut().enumerate() {
        agent.consensus_direction = ctx.neighbor_consensus(i);
        agent.nearest_goal = nearest_target(ctx.snapshot[i].pos, ctx.targets);
    }

    let goals: Vec<Option<Vec2>> = agents.iter().map(|a| a.nearest_goal).collect();
    let mut mismatches = Vec::new();

    for (i, agent) in agents.iter_mut().enumerate() {
        let Some(consensus) = agent.consensus_direction else {
            continue;
        };
        let ProtocolState::Majority {
            opinion_count,
            decision,
        } = &mut agent.protocol
        else {
            continue;
        };

        for &j in &ctx.neighbors[i] {
            if let Some(goal) = goals[j] {
                opinion_count.record(goal);
            }
        }
        if let Some(goal) = opinion_count.majority() {
            agent.nearest_goal = Some(goal);
        }

        mismatches.push(angle_mismatch(consensus, agent.heading));
        agent.heading = consensus;
        decision.commit();
        log::debug!(
            "Agent {} committed to goal {:?} heading {:.3}",
            agent.id,
            agent.nearest_goal,
            consensus
        );
    }

    mismatches
}

/// Voter model: refresh goals, then copy the goal (and heading) of one
/// random neighbor
pub fn voter_checkpoint<R: Rng>(
    agents: &mut [Agent],
    ctx: &CheckpointContext,
    rng: &mut R,
) -> Vec<f32> {
    let mut mismatches = Vec::new();
    for (i, agent) in agents.iter_mut().enumerate() {
        agent.consensus_direction = ctx.neighbor_consensus(i);
        if let Some(consensus) = agent.consensus_direction {
            agent.nearest_goal = nearest_target(ctx.snapshot[i].pos, ctx.targets);
            mismatches.push(angle_mismatch(consensus, agent.heading));
        }
    }

    let goals: Vec<Option<Vec2>> = agents.iter().map(|a| a.nearest_goal).collect();
    let consensus: Vec<Option<f32>> = agents.iter().map(|a| a.consensus_direction).collect();

    for (i, agent) in agents.iter_mut().enumerate() {
        if agent.consensus_direction.is_some() {
            switch_opinion(agent, &ctx.neighbors[i], &goals, &consensus, rng);
        }
    }

    mismatches
}

/// Adopt the opinion of a uniformly chosen neighbor.
///
/// No-op without neighbors or when the chosen neighbor has no goal.
/// Returns whether the agent switched.
pub fn switch_opinion<R: Rng>(
    agent: &mut Agent,
    neighbors: &[usize],
    goals: &[Option<Vec2>],
    consensus: &[Option<f32>],
    rng: &mut R,
) -> bool {
    if neighbors.is_empty() {
        return false;
    }
    let pick = neighbors[rng.random_range(0..neighbors.len())];
    let Some(goal) = goals[pick] else {
        return false;
    };
    let own_consensus = agent.consensus_direction.unwrap_or(agent.heading);

    if agent.nearest_goal == Some(goal) {
        agent.heading = own_consensus;
    } else {
        agent.nearest_goal = Some(goal);
        agent.heading = consensus[pick].unwrap_or(own_consensus);
    }

    if let ProtocolState::Voter { decision } = &mut agent.protocol {
        decision.commit();
    }
    true
}

/// Discrete Kuramoto-style phase update:
/// `θ' = wrap(θ + dt * (wrap(ω - θ) + K * mean(sin(θ_j - θ))))`
pub fn kuramoto_phase_update(
    theta: f32,
    omega: f32,
    coupling_k: f32,
    neighbor_headings: &[f32],
) -> f32 {
    let goal_turn = wrap_angle(omega - theta);
    let coupling = if neighbor_headings.is_empty() {
        0.0
    } else {
        neighbor_headings.iter().map(|&h| (h - theta).sin()).sum::<f32>()
            / neighbor_headings.len() as f32
    };
    let k = coupling_k.max(0.0);
    wrap_angle(theta + PHASE_STEP * (goal_turn + k * coupling))
}

/// Refresh each agent's nearest goal and the goal-seeking bias `omega`
/// (bearing from that goal to the agent). Runs every tick.
pub fn kuramoto_refresh_goals(agents: &mut [Agent], targets: &[Vec2]) {
    for agent in agents.iter_mut() {
        agent.nearest_goal = nearest_target(agent.pos, targets);
        if let (Some(goal), ProtocolState::Kuramoto { omega, .. }) =
            (agent.nearest_goal, &mut agent.protocol)
        {
            let away = agent.pos - goal;
            *omega = away.y.atan2(away.x);
        }
    }
}

/// Kuramoto: phase-update every agent while the coupling has not exceeded
/// its cap, grow the coupling, and commit the new phase as heading
pub fn kuramoto_checkpoint(agents: &mut [Agent], ctx: &CheckpointContext) -> Vec<f32> {
    let mut mismatches = Vec::new();
    for (i, agent) in agents.iter_mut().enumerate() {
        let ProtocolState::Kuramoto {
            omega,
            coupling_k,
            phase_synched,
        } = &mut agent.protocol
        else {
            continue;
        };

        *phase_synched = false;
        agent.consensus_direction = None;

        if *coupling_k <= MAX_COUPLING {
            let theta = ctx.snapshot[i].heading;
            let headings: Vec<f32> = ctx.neighbors[i]
                .iter()
                .map(|&j| ctx.snapshot[j].heading)
                .collect();
            agent.consensus_direction =
                Some(kuramoto_phase_update(theta, *omega, *coupling_k, &headings));
            *phase_synched = true;
            *coupling_k = (*coupling_k + ctx.k_increment).min(MAX_COUPLING);
        }

        if let Some(next) = agent.consensus_direction {
            mismatches.push(angle_mismatch(next, agent.heading));
            agent.heading = next;
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::agent::{Decision, Kinematics, OpinionCount};
    use crate::sim::forces::{neighborhoods, snapshot};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::f32::consts::PI;

    fn kin() -> Kinematics {
        Kinematics::from_settings(&Settings::default())
    }

    fn majority_agents(points: &[(f32, f32)], targets: &[Vec2]) -> Vec<Agent> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Agent::new(
                    i as u32,
                    Vec2::new(x, y),
                    0.1 * i as f32,
                    kin(),
                    ProtocolState::Majority {
                        opinion_count: OpinionCount::new(targets),
                        decision: Decision::Undecided,
                    },
                )
            })
            .collect()
    }

    fn voter_agents(points: &[(f32, f32)]) -> Vec<Agent> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                Agent::new(
                    i as u32,
                    Vec2::new(x, y),
                    0.0,
                    kin(),
                    ProtocolState::Voter {
                        decision: Decision::Undecided,
                    },
                )
            })
            .collect()
    }

    fn kuramoto_agents(points: &[(f32, f32, f32)], coupling_k: f32) -> Vec<Agent> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y, heading))| {
                Agent::new(
                    i as u32,
                    Vec2::new(x, y),
                    heading,
                    kin(),
                    ProtocolState::Kuramoto {
                        omega: 0.0,
                        coupling_k,
                        phase_synched: true,
                    },
                )
            })
            .collect()
    }

    fn run<F>(agents: &mut [Agent], targets: &[Vec2], step: F) -> Vec<f32>
    where
        F: FnOnce(&mut [Agent], &CheckpointContext<'_>) -> Vec<f32>,
    {
        let snap = snapshot(agents);
        let hoods = neighborhoods(&snap, 30.0);
        let ctx = CheckpointContext {
            snapshot: &snap,
            neighbors: &hoods,
            targets,
            k_increment: 0.01,
        };
        step(agents, &ctx)
    }

    fn tally(agent: &Agent, target: Vec2) -> u32 {
        match &agent.protocol {
            ProtocolState::Majority { opinion_count, .. } => opinion_count.get(target).unwrap(),
            _ => panic!("not a majority agent"),
        }
    }

    #[test]
    fn test_majority_follows_most_voted_target() {
        let t1 = Vec2::new(0.0, 0.0);
        let t2 = Vec2::new(100.0, 0.0);
        let targets = [t1, t2];
        // Agent 0 sees two neighbors nearest to t1 and one nearest to t2
        let mut agents = majority_agents(
            &[(45.0, 0.0), (30.0, 0.0), (35.0, 5.0), (60.0, 0.0)],
            &targets,
        );
        let mismatches = run(&mut agents, &targets, majority_checkpoint);

        assert_eq!(tally(&agents[0], t1), 2);
        assert_eq!(tally(&agents[0], t2), 1);
        assert_eq!(agents[0].nearest_goal, Some(t1));
        assert!(agents.iter().all(|a| a.protocol.steering_enabled()));
        assert_eq!(mismatches.len(), 4);
    }

    #[test]
    fn test_majority_tally_accumulates() {
        let targets = [Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)];
        let mut agents = majority_agents(&[(10.0, 0.0), (20.0, 0.0)], &targets);
        run(&mut agents, &targets, majority_checkpoint);
        assert_eq!(tally(&agents[0], targets[0]), 1);
        run(&mut agents, &targets, majority_checkpoint);
        assert_eq!(tally(&agents[0], targets[0]), 2);
    }

    #[test]
    fn test_majority_isolated_agent_stays_undecided() {
        let targets = [Vec2::new(0.0, 0.0)];
        let mut agents = majority_agents(&[(10.0, 0.0), (500.0, 500.0)], &targets);
        let mismatches = run(&mut agents, &targets, majority_checkpoint);
        assert!(mismatches.is_empty());
        assert_eq!(agents[0].consensus_direction, None);
        assert!(!agents[0].protocol.steering_enabled());
        // Nearest goal is still refreshed
        assert_eq!(agents[0].nearest_goal, Some(targets[0]));
    }

    #[test]
    fn test_majority_commits_consensus_heading() {
        let targets = [Vec2::new(0.0, 0.0)];
        let mut agents = majority_agents(&[(10.0, 0.0), (20.0, 0.0)], &targets);
        agents[1].heading = 1.2;
        run(&mut agents, &targets, majority_checkpoint);
        assert!((agents[0].heading - 1.2).abs() < 1e-5);
        // Agent 1 read agent 0's snapshot heading, not the committed one
        assert!(agents[1].heading.abs() < 1e-5);
    }

    #[test]
    fn test_voter_without_neighbors_is_noop() {
        let targets = [Vec2::new(0.0, 0.0)];
        let mut agents = voter_agents(&[(10.0, 0.0), (500.0, 500.0)]);
        agents[0].nearest_goal = Some(Vec2::new(42.0, 42.0));
        let mut rng = Pcg32::seed_from_u64(1);
        let mismatches = run(&mut agents, &targets, |a, ctx| {
            voter_checkpoint(a, ctx, &mut rng)
        });
        assert!(mismatches.is_empty());
        assert!(!agents[0].protocol.steering_enabled());
        assert_eq!(agents[0].nearest_goal, Some(Vec2::new(42.0, 42.0)));
        assert_eq!(agents[0].heading, 0.0);
    }

    #[test]
    fn test_switch_opinion_adopts_neighbor_goal_and_heading() {
        let mut agents = voter_agents(&[(0.0, 0.0)]);
        let agent = &mut agents[0];
        agent.nearest_goal = Some(Vec2::new(1.0, 1.0));
        agent.consensus_direction = Some(0.3);
        let goals = [None, Some(Vec2::new(5.0, 5.0))];
        let consensus = [None, Some(-0.7)];
        let mut rng = Pcg32::seed_from_u64(3);

        assert!(switch_opinion(agent, &[1], &goals, &consensus, &mut rng));
        assert_eq!(agent.nearest_goal, Some(Vec2::new(5.0, 5.0)));
        assert!((agent.heading + 0.7).abs() < 1e-6);
        assert!(agent.protocol.steering_enabled());
    }

    #[test]
    fn test_switch_opinion_same_goal_uses_own_consensus() {
        let mut agents = voter_agents(&[(0.0, 0.0)]);
        let agent = &mut agents[0];
        agent.nearest_goal = Some(Vec2::new(5.0, 5.0));
        agent.consensus_direction = Some(0.3);
        let goals = [None, Some(Vec2::new(5.0, 5.0))];
        let consensus = [None, Some(-0.7)];
        let mut rng = Pcg32::seed_from_u64(3);

        assert!(switch_opinion(agent, &[1], &goals, &consensus, &mut rng));
        assert!((agent.heading - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_switch_opinion_neighbor_without_goal_keeps_flag() {
        let mut agents = voter_agents(&[(0.0, 0.0)]);
        let agent = &mut agents[0];
        agent.consensus_direction = Some(0.3);
        let mut rng = Pcg32::seed_from_u64(3);
        assert!(!switch_opinion(agent, &[0], &[None], &[None], &mut rng));
        assert!(!agent.protocol.steering_enabled());
    }

    #[test]
    fn test_zero_coupling_ignores_neighbors() {
        let with = kuramoto_phase_update(0.5, 1.5, 0.0, &[2.0, -1.0, 3.0]);
        let without = kuramoto_phase_update(0.5, 1.5, 0.0, &[]);
        assert_eq!(with, without);
        assert!((without - (0.5 + PHASE_STEP * 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_coupling_pulls_toward_neighbors() {
        let free = kuramoto_phase_update(0.0, 0.0, 0.0, &[1.0]);
        let coupled = kuramoto_phase_update(0.0, 0.0, 1.0, &[1.0]);
        assert_eq!(free, 0.0);
        assert!((coupled - PHASE_STEP * 1.0f32.sin()).abs() < 1e-6);
    }

    #[test]
    fn test_first_kuramoto_checkpoint_depends_only_on_goal_turn() {
        let mut agents = kuramoto_agents(&[(0.0, 0.0, 0.0), (5.0, 0.0, PI / 2.0)], 0.0);
        if let ProtocolState::Kuramoto { omega, .. } = &mut agents[0].protocol {
            *omega = 1.0;
        }
        run(&mut agents, &[], kuramoto_checkpoint);
        assert!((agents[0].heading - PHASE_STEP).abs() < 1e-6);
        match agents[0].protocol {
            ProtocolState::Kuramoto {
                coupling_k,
                phase_synched,
                ..
            } => {
                assert!((coupling_k - 0.01).abs() < 1e-7);
                assert!(phase_synched);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_kuramoto_flag_resets_when_coupling_exceeds_cap() {
        let mut agents = kuramoto_agents(&[(0.0, 0.0, 0.4)], 1.5);
        let mismatches = run(&mut agents, &[], kuramoto_checkpoint);
        assert!(mismatches.is_empty());
        assert!(!agents[0].protocol.steering_enabled());
        assert_eq!(agents[0].consensus_direction, None);
        assert_eq!(agents[0].heading, 0.4);
    }

    #[test]
    fn test_coupling_saturates_at_cap() {
        let mut agents = kuramoto_agents(&[(0.0, 0.0, 0.0)], 0.995);
        run(&mut agents, &[], kuramoto_checkpoint);
        match agents[0].protocol {
            ProtocolState::Kuramoto { coupling_k, .. } => assert_eq!(coupling_k, MAX_COUPLING),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_omega_is_bearing_from_goal_to_agent() {
        let mut agents = kuramoto_agents(&[(10.0, 20.0, 0.0)], 0.0);
        kuramoto_refresh_goals(&mut agents, &[Vec2::new(10.0, 0.0), Vec2::new(500.0, 0.0)]);
        assert_eq!(agents[0].nearest_goal, Some(Vec2::new(10.0, 0.0)));
        match agents[0].protocol {
            ProtocolState::Kuramoto { omega, .. } => assert!((omega - PI / 2.0).abs() < 1e-6),
            _ => unreachable!(),
        }
    }
}
