//! PPO configuration and hyperparameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// PPO hyperparameters.
///
/// The policy and value function are tables, so the learning rate is much
/// larger than the usual neural-network settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpoConfig {
    /// Learning rate for policy logits and values.
    pub learning_rate: f64,

    /// Discount factor.
    pub gamma: f64,

    /// GAE lambda.
    pub gae_lambda: f64,

    /// Minibatches per epoch.
    pub num_minibatches: usize,

    /// Passes over each rollout.
    pub update_epochs: usize,

    /// Normalize advantages within each minibatch.
    pub normalize_advantages: bool,

    /// Surrogate clipping coefficient.
    pub clip_coef: f64,

    /// Entropy bonus coefficient.
    pub entropy_coef: f64,

    /// Value loss coefficient.
    pub value_coef: f64,

    /// Per-sample bound on the policy gradient norm.
    pub max_grad_norm: f64,

    /// Stop the epochs early once the mean approximate KL exceeds this.
    pub target_kl: Option<f64>,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            gamma: 0.99,
            gae_lambda: 0.95,
            num_minibatches: 4,
            update_epochs: 4,
            normalize_advantages: true,
            clip_coef: 0.1,
            entropy_coef: 0.01,
            value_coef: 0.5,
            max_grad_norm: 0.5,
            target_kl: None,
        }
    }
}

impl PpoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_gae_lambda(mut self, lambda: f64) -> Self {
        self.gae_lambda = lambda;
        self
    }

    pub fn with_minibatches(mut self, num_minibatches: usize) -> Self {
        self.num_minibatches = num_minibatches;
        self
    }

    pub fn with_update_epochs(mut self, epochs: usize) -> Self {
        self.update_epochs = epochs;
        self
    }

    pub fn with_normalize_advantages(mut self, normalize: bool) -> Self {
        self.normalize_advantages = normalize;
        self
    }

    pub fn with_clip_coef(mut self, clip: f64) -> Self {
        self.clip_coef = clip;
        self
    }

    pub fn with_entropy_coef(mut self, coef: f64) -> Self {
        self.entropy_coef = coef;
        self
    }

    pub fn with_value_coef(mut self, coef: f64) -> Self {
        self.value_coef = coef;
        self
    }

    pub fn with_max_grad_norm(mut self, norm: f64) -> Self {
        self.max_grad_norm = norm;
        self
    }

    pub fn with_target_kl(mut self, target_kl: Option<f64>) -> Self {
        self.target_kl = target_kl;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.learning_rate <= 0.0 {
            return Err(ConfigError::Validation("ppo.learning_rate must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::Validation("ppo.gamma must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return Err(ConfigError::Validation("ppo.gae_lambda must be in [0, 1]".into()));
        }
        if self.num_minibatches == 0 {
            return Err(ConfigError::Validation("ppo.num_minibatches must be > 0".into()));
        }
        if self.update_epochs == 0 {
            return Err(ConfigError::Validation("ppo.update_epochs must be > 0".into()));
        }
        if self.clip_coef <= 0.0 {
            return Err(ConfigError::Validation("ppo.clip_coef must be > 0".into()));
        }
        if self.entropy_coef < 0.0 || self.value_coef < 0.0 {
            return Err(ConfigError::Validation(
                "ppo.entropy_coef and ppo.value_coef must be >= 0".into(),
            ));
        }
        if self.max_grad_norm <= 0.0 {
            return Err(ConfigError::Validation("ppo.max_grad_norm must be > 0".into()));
        }
        if matches!(self.target_kl, Some(kl) if kl <= 0.0) {
            return Err(ConfigError::Validation("ppo.target_kl must be > 0".into()));
        }
        Ok(())
    }
}
