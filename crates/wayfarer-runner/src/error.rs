//! Error types for the runner.
//!
//! Uses `thiserror` for typed errors: [`OracleError`] for a single failed
//! oracle call (always non-fatal to the simulation) and [`RunnerError`] for
//! startup and tick-loop failures.

use wayfarer_core::{ClockError, ConfigError, PromptError};

/// Why one oracle call produced no text.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The backend answered HTTP 429.
    #[error("rate limited by oracle backend")]
    RateLimited,

    /// The request never got a response.
    #[error("oracle request failed: {0}")]
    Network(String),

    /// The backend answered with a non-success status other than 429.
    #[error("oracle returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected oracle response: {0}")]
    Decode(String),
}

/// Errors that can occur while starting or running the simulation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Behavior configuration failed to load.
    #[error("behavior config error: {0}")]
    Behavior(#[from] ConfigError),

    /// Prompt templates failed to load.
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// The simulation clock overflowed.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}
