//! Self-play loop configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration of the self-play training loop.
///
/// Immutable once handed to a trainer; every derived constant is computed
/// from it on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    /// Number of environments stepped in lockstep.
    pub num_envs: usize,

    /// Trainee decisions per environment per update.
    pub num_steps: usize,

    /// Budget of trainee decisions per training call.
    pub total_timesteps: usize,

    /// Log a reward summary every N updates.
    pub eval_every: usize,

    /// Anneal the trainee's learning rate across updates.
    pub anneal_lr: bool,

    /// Capacity of the recent-returns window.
    pub reward_window: usize,

    /// Number of alternating meta-epochs.
    pub meta_epochs: usize,

    /// Base seed; environment `i` is seeded with `seed + i`.
    pub seed: u64,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            num_envs: 8,
            num_steps: 128,
            total_timesteps: 10_000_000,
            eval_every: 100,
            anneal_lr: true,
            reward_window: 50,
            meta_epochs: 10,
            seed: 1,
        }
    }
}

impl SelfPlayConfig {
    /// Create a new self-play config.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_envs(mut self, num_envs: usize) -> Self {
        self.num_envs = num_envs;
        self
    }

    pub fn with_num_steps(mut self, num_steps: usize) -> Self {
        self.num_steps = num_steps;
        self
    }

    pub fn with_total_timesteps(mut self, total: usize) -> Self {
        self.total_timesteps = total;
        self
    }

    pub fn with_eval_every(mut self, every: usize) -> Self {
        self.eval_every = every;
        self
    }

    pub fn with_anneal_lr(mut self, anneal: bool) -> Self {
        self.anneal_lr = anneal;
        self
    }

    pub fn with_reward_window(mut self, capacity: usize) -> Self {
        self.reward_window = capacity;
        self
    }

    pub fn with_meta_epochs(mut self, epochs: usize) -> Self {
        self.meta_epochs = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Trainee decisions per update across all environments.
    pub fn batch_size(&self) -> usize {
        self.num_envs * self.num_steps
    }

    /// Number of updates per training call.
    ///
    /// Floor division: a partial final batch is dropped, and a budget smaller
    /// than one batch yields zero updates.
    pub fn num_updates(&self) -> usize {
        match self.batch_size() {
            0 => 0,
            batch => self.total_timesteps / batch,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_envs == 0 {
            return Err(ConfigError::Validation("self_play.num_envs must be > 0".into()));
        }
        if self.num_steps == 0 {
            return Err(ConfigError::Validation("self_play.num_steps must be > 0".into()));
        }
        if self.eval_every == 0 {
            return Err(ConfigError::Validation("self_play.eval_every must be > 0".into()));
        }
        if self.reward_window == 0 {
            return Err(ConfigError::Validation("self_play.reward_window must be > 0".into()));
        }
        Ok(())
    }
}
