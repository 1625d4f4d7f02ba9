//! Error types for simulation setup.
//!
//! The per-tick update never fails; everything here is surfaced while building
//! settings, layouts and models.

use thiserror::Error;

/// Errors that can occur when constructing a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A parameter failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A configuration or layout document could not be parsed (including missing keys).
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),
    /// The initial layout disagrees with the configuration.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    /// Protocol name not recognised.
    #[error("unknown protocol `{0}` (expected majority, voter or kuramoto)")]
    UnknownProtocol(String),
}
