//! Neighbor discovery and flocking force model
//!
//! Everything here reads a single per-tick snapshot of agent positions and
//! headings, so results never depend on the order agents are processed in.
//! Neighbor lists are indices into the agent arena and only live for one tick.

use glam::Vec2;

use super::agent::Agent;
use super::obstacle::ObstacleSet;
use crate::consts::*;
use crate::{circular_mean, wrap_angle};

/// Position and heading of one agent at the start of a phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub pos: Vec2,
    pub heading: f32,
}

/// Capture the simultaneous state all force computations read from
pub fn snapshot(agents: &[Agent]) -> Vec<AgentSnapshot> {
    agents
        .iter()
        .map(|a| AgentSnapshot {
            pos: a.pos,
            heading: a.heading,
        })
        .collect()
}

/// Indices of all other agents within `radius` (inclusive) of agent `index`
pub fn get_neighbors(snapshot: &[AgentSnapshot], index: usize, radius: f32) -> Vec<usize> {
    let origin = snapshot[index].pos;
    snapshot
        .iter()
        .enumerate()
        .filter(|&(j, other)| j != index && origin.distance(other.pos) <= radius)
        .map(|(j, _)| j)
        .collect()
}

/// Neighbor lists for every agent, all taken from the same snapshot
pub fn neighborhoods(snapshot: &[AgentSnapshot], radius: f32) -> Vec<Vec<usize>> {
    (0..snapshot.len())
        .map(|i| get_neighbors(snapshot, i, radius))
        .collect()
}

/// Sum of unit vectors pointing away from neighbors closer than `separation_distance`
pub fn compute_separation(
    snapshot: &[AgentSnapshot],
    index: usize,
    neighbors: &[usize],
    separation_distance: f32,
) -> Vec2 {
    let origin = snapshot[index].pos;
    neighbors
        .iter()
        .filter_map(|&j| {
            let delta = origin - snapshot[j].pos;
            let dist = delta.length();
            (dist < separation_distance).then(|| delta / dist.max(EPSILON))
        })
        .fold(Vec2::ZERO, |acc, v| acc + v)
}

/// Angle from own heading to the circular mean of neighbor headings, wrapped
pub fn compute_alignment(snapshot: &[AgentSnapshot], index: usize, neighbors: &[usize]) -> f32 {
    match circular_mean(neighbors.iter().map(|&j| snapshot[j].heading)) {
        Some(mean) => wrap_angle(mean - snapshot[index].heading),
        None => 0.0,
    }
}

/// Centroid of the whole population
pub fn centroid(snapshot: &[AgentSnapshot]) -> Vec2 {
    if snapshot.is_empty() {
        return Vec2::ZERO;
    }
    snapshot.iter().map(|s| s.pos).sum::<Vec2>() / snapshot.len() as f32
}

/// Vector from the agent to the population centroid.
///
/// Deliberately global: cohesion ignores the interaction radius.
pub fn compute_cohesion(snapshot: &[AgentSnapshot], index: usize) -> Vec2 {
    centroid(snapshot) - snapshot[index].pos
}

/// Goal-seeking bias: swarm-centroid pull toward the goal plus a turn
/// from the current heading toward the direct bearing to the goal.
///
/// Zero when no goal is selected.
pub fn goal_bias(pos: Vec2, heading: f32, swarm_centroid: Vec2, goal: Option<Vec2>) -> Vec2 {
    let Some(goal) = goal else {
        return Vec2::ZERO;
    };
    let pull = (goal - swarm_centroid) * GOAL_PULL_GAIN * GOAL_PULL_WEIGHT;

    let to_goal = goal - pos;
    let correction = if to_goal.length_squared() > 0.0 {
        wrap_angle(to_goal.y.atan2(to_goal.x) - heading)
    } else {
        0.0
    };
    let turn = Vec2::from_angle(heading).perp() * correction * GOAL_TURN_GAIN * GOAL_TURN_WEIGHT;

    pull + turn
}

/// Nearest target to `pos`; ties go to the first target in list order
pub fn nearest_target(pos: Vec2, targets: &[Vec2]) -> Option<Vec2> {
    let mut best: Option<(Vec2, f32)> = None;
    for &target in targets {
        let dist = pos.distance(target);
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((target, dist)),
        }
    }
    best.map(|(target, _)| target)
}

/// Positional push away from every obstacle whose center is within `repulsion_radius`.
///
/// Obstacles at distance zero are skipped.
pub fn obstacle_repulsion(pos: Vec2, obstacles: &ObstacleSet, repulsion_radius: f32) -> Vec2 {
    let mut push = Vec2::ZERO;
    for obstacle in obstacles.iter() {
        let delta = pos - obstacle.center();
        let dist = delta.length();
        if dist <= 0.0 || dist >= repulsion_radius {
            continue;
        }
        push += delta * ((repulsion_radius - dist) / dist.max(EPSILON));
    }
    push
}

/// Number of neighbors closer than `distance` (collision proxy)
pub fn count_within(
    snapshot: &[AgentSnapshot],
    index: usize,
    neighbors: &[usize],
    distance: f32,
) -> u32 {
    let origin = snapshot[index].pos;
    neighbors
        .iter()
        .filter(|&&j| origin.distance(snapshot[j].pos) < distance)
        .count() as u32
}

/// Flocking contributions acting on one agent for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlockingForces {
    pub separation: Vec2,
    /// Angle to rotate the heading by to match the neighbors
    pub alignment: f32,
    pub cohesion: Vec2,
    pub goal_bias: Vec2,
    /// Whether any neighbor was present
    pub has_neighbors: bool,
}

/// Evaluate all flocking forces for agent `index` against the snapshot
pub fn compute_forces(
    snapshot: &[AgentSnapshot],
    index: usize,
    neighbors: &[usize],
    separation_distance: f32,
    swarm_centroid: Vec2,
    goal: Option<Vec2>,
) -> FlockingForces {
    let me = snapshot[index];
    FlockingForces {
        separation: compute_separation(snapshot, index, neighbors, separation_distance),
        alignment: compute_alignment(snapshot, index, neighbors),
        cohesion: swarm_centroid - me.pos,
        goal_bias: goal_bias(me.pos, me.heading, swarm_centroid, goal),
        has_neighbors: !neighbors.is_empty(),
    }
}
