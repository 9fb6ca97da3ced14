//! Event loop configuration.

use pledge_core::{PledgeError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the event loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Maximum number of tasks a single `run_until_idle` may execute.
    pub max_tasks: usize,

    /// Virtual clock reading when the loop starts, in milliseconds.
    pub start_time_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tasks: 10_000,
            start_time_ms: 0,
        }
    }
}

impl LoopConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoopConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_tasks == 0 {
            return Err(PledgeError::Config(
                "max_tasks must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
