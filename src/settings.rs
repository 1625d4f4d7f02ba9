//! Simulation parameters
//!
//! Two flat groups mirroring the external configuration: environment
//! (`SCREEN_WIDTH`, `NUM_TARGET`, ...) and swarm (`NUM_AGENTS`,
//! `INTERACTION_RADIUS`, ...). Every documented key is required when loading
//! from JSON; nothing critical is silently defaulted.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Environment parameter group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvParams {
    #[serde(rename = "SCREEN_WIDTH")]
    pub screen_width: f32,
    #[serde(rename = "SCREEN_HEIGHT")]
    pub screen_height: f32,
    #[serde(rename = "NUM_TARGET")]
    pub num_target: usize,
    /// Radius around a target that counts as "reached"
    #[serde(rename = "TARGET_SIZE")]
    pub target_size: f32,
    #[serde(rename = "NUM_HURDLE")]
    pub num_hurdle: usize,
    /// Frame rate of the outer driver (informational for the core)
    #[serde(rename = "FPS")]
    pub fps: u32,
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            screen_width: 1200.0,
            screen_height: 700.0,
            num_target: 2,
            target_size: 20.0,
            num_hurdle: 10,
            fps: 60,
        }
    }
}

/// Swarm parameter group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmParams {
    #[serde(rename = "NUM_AGENTS")]
    pub num_agents: usize,
    #[serde(rename = "INTERACTION_RADIUS")]
    pub interaction_radius: f32,
    /// Ticks between consensus checkpoints
    #[serde(rename = "CONSENSUS_PERIOD")]
    pub consensus_period: u64,
    #[serde(rename = "AGENT_SPEED")]
    pub agent_speed: f32,
    #[serde(rename = "SEPERATION_DISTANCE")]
    pub separation_distance: f32,
    #[serde(rename = "SEPERATION_STRENGTH")]
    pub separation_strength: f32,
    #[serde(rename = "ALIGNMENT_STRENGTH")]
    pub alignment_strength: f32,
    #[serde(rename = "ATTRACT_STRENGTH")]
    pub attract_strength: f32,
    #[serde(rename = "REPULSION_RADIUS")]
    pub repulsion_radius: f32,
    /// Kuramoto coupling growth per checkpoint
    #[serde(rename = "K_INCREMENT")]
    pub k_increment: f32,
    /// Side of the square agents start in (layout generation only)
    #[serde(rename = "START_AREA_LEN", default = "default_start_area")]
    pub start_area_len: f32,
    /// Margin between the right edge and the target column (layout generation only)
    #[serde(rename = "STARTING_AREA_WIDTH", default = "default_start_area")]
    pub starting_area_width: f32,
}

fn default_start_area() -> f32 {
    20.0
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            num_agents: 10,
            interaction_radius: 30.0,
            consensus_period: 10,
            agent_speed: 1.0,
            separation_distance: 25.0,
            separation_strength: 0.17,
            alignment_strength: 0.08,
            attract_strength: 0.002,
            repulsion_radius: 50.0,
            k_increment: 0.01,
            start_area_len: default_start_area(),
            starting_area_width: default_start_area(),
        }
    }
}

/// Complete parameter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub env: EnvParams,
    pub swarm: SwarmParams,
}

impl Settings {
    /// Parse and validate settings from a `{"env": {..}, "swarm": {..}}` document
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        log::info!(
            "Loaded settings: {} agents, {} targets, period {}",
            settings.swarm.num_agents,
            settings.env.num_target,
            settings.swarm.consensus_period
        );
        Ok(settings)
    }

    /// Serialize to the same document shape accepted by [`Settings::from_json_str`]
    pub fn to_json_string(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        let env = &self.env;
        let swarm = &self.swarm;

        if !(env.screen_width > 0.0 && env.screen_height > 0.0) {
            return Err(SimError::InvalidConfig("screen dimensions must be positive"));
        }
        if env.num_target == 0 {
            return Err(SimError::InvalidConfig("NUM_TARGET must be at least 1"));
        }
        if env.target_size < 0.0 {
            return Err(SimError::InvalidConfig("TARGET_SIZE must be non-negative"));
        }
        if swarm.num_agents == 0 {
            return Err(SimError::InvalidConfig("NUM_AGENTS must be at least 1"));
        }
        if swarm.consensus_period == 0 {
            return Err(SimError::InvalidConfig("CONSENSUS_PERIOD must be at least 1"));
        }
        if !(swarm.interaction_radius > 0.0) {
            return Err(SimError::InvalidConfig("INTERACTION_RADIUS must be positive"));
        }
        if !(swarm.agent_speed >= 0.0) {
            return Err(SimError::InvalidConfig("AGENT_SPEED must be non-negative"));
        }
        if swarm.separation_distance < 0.0 || swarm.repulsion_radius < 0.0 {
            return Err(SimError::InvalidConfig(
                "SEPERATION_DISTANCE and REPULSION_RADIUS must be non-negative",
            ));
        }
        if !(swarm.separation_strength.is_finite()
            && swarm.alignment_strength.is_finite()
            && swarm.attract_strength.is_finite())
        {
            return Err(SimError::InvalidConfig("force strengths must be finite"));
        }
        if !(swarm.k_increment >= 0.0) {
            return Err(SimError::InvalidConfig("K_INCREMENT must be non-negative"));
        }
        if !(swarm.start_area_len >= 0.0 && swarm.start_area_len.is_finite()) {
            return Err(SimError::InvalidConfig(
                "START_AREA_LEN must be finite and non-negative",
            ));
        }
        if !(swarm.starting_area_width >= 0.0 && swarm.starting_area_width.is_finite()) {
            return Err(SimError::InvalidConfig(
                "STARTING_AREA_WIDTH must be finite and non-negative",
            ));
        }
        Ok(())
    }
}
