//! Deterministic simulation module
//!
//! All swarm logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, threaded through the model
//! - Snapshot-then-commit updates (agent order never matters)
//! - No rendering, file or platform dependencies

pub mod agent;
pub mod consensus;
pub mod forces;
pub mod layout;
pub mod model;
pub mod obstacle;
pub mod tick;

pub use agent::{Agent, Decision, Kinematics, OpinionCount, OpinionTally, ProtocolState};
pub use consensus::{
    CheckpointContext, kuramoto_checkpoint, kuramoto_phase_update, majority_checkpoint,
    switch_opinion, voter_checkpoint,
};
pub use forces::{
    AgentSnapshot, FlockingForces, compute_alignment, compute_cohesion, compute_separation,
    get_neighbors, goal_bias, nearest_target, neighborhoods, snapshot,
};
pub use layout::Layout;
pub use model::{ProtocolKind, SwarmModel};
pub use obstacle::{Obstacle, ObstacleSet};
pub use tick::{Simulation, tick};
