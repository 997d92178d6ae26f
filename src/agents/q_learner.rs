//! Tabular Q-learning agent.
//!
//! Q-values are stored per observation key. Learning happens online: each
//! non-evaluation `step` first completes the TD update of the action taken
//! previously in the same environment slot, and `post_step` / `end_episode`
//! complete it for transitions that ended an episode.
//!
//! Exploration is epsilon-greedy with a linear schedule over training
//! decisions; evaluation steps are greedy and leave the table untouched.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{ActionId, GameRng, PlayerId, TimeStep};
use crate::error::{AgentError, ConfigError};

use super::{check_action_range, legal_actions_for, state_key, Agent, AgentOutput, StateKey};

/// Q-learning hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearnerConfig {
    /// Learning rate of the TD update.
    pub step_size: f64,

    /// Discount factor.
    pub discount_factor: f64,

    /// Exploration rate at the first training decision.
    pub epsilon_start: f64,

    /// Exploration rate once the schedule has run out.
    pub epsilon_end: f64,

    /// Training decisions over which epsilon decays linearly.
    pub epsilon_decay_duration: u64,

    /// Factor applied to the step size by `step_scheduler`.
    pub scheduler_gamma: f64,
}

impl Default for QLearnerConfig {
    fn default() -> Self {
        Self {
            step_size: 0.1,
            discount_factor: 0.95,
            epsilon_start: 1.0,
            epsilon_end: 0.1,
            epsilon_decay_duration: 30_000,
            scheduler_gamma: 0.5,
        }
    }
}

impl QLearnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_discount_factor(mut self, gamma: f64) -> Self {
        self.discount_factor = gamma;
        self
    }

    pub fn with_epsilon(mut self, start: f64, end: f64, decay_duration: u64) -> Self {
        self.epsilon_start = start;
        self.epsilon_end = end;
        self.epsilon_decay_duration = decay_duration;
        self
    }

    pub fn with_scheduler_gamma(mut self, gamma: f64) -> Self {
        self.scheduler_gamma = gamma;
        self
    }

    /// Copies of `self` over every pairing of epsilon decay durations and
    /// step sizes, decay-major.
    pub fn grid(&self, decay_durations: &[u64], step_sizes: &[f64]) -> Vec<QLearnerConfig> {
        decay_durations
            .iter()
            .flat_map(|&decay| {
                step_sizes.iter().map(move |&lr| {
                    self.clone()
                        .with_epsilon(self.epsilon_start, self.epsilon_end, decay)
                        .with_step_size(lr)
                })
            })
            .collect()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_size <= 0.0 {
            return Err(ConfigError::Validation("q_learning.step_size must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(ConfigError::Validation(
                "q_learning.discount_factor must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_start) || !(0.0..=1.0).contains(&self.epsilon_end) {
            return Err(ConfigError::Validation(
                "q_learning.epsilon_start and epsilon_end must be in [0, 1]".into(),
            ));
        }
        if self.epsilon_end > self.epsilon_start {
            return Err(ConfigError::Validation(
                "q_learning.epsilon_end must be <= epsilon_start".into(),
            ));
        }
        if self.scheduler_gamma <= 0.0 || self.scheduler_gamma > 1.0 {
            return Err(ConfigError::Validation(
                "q_learning.scheduler_gamma must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Action awaiting its TD update.
#[derive(Clone, Debug)]
struct Pending {
    key: StateKey,
    action: ActionId,
    /// Reward of the agent's own transition, delivered by `post_step`.
    reward: f64,
}

/// Epsilon-greedy tabular Q-learner.
pub struct TabularQLearner {
    player: PlayerId,
    num_actions: usize,
    config: QLearnerConfig,
    q_values: FxHashMap<StateKey, Vec<f64>>,
    step_size: f64,
    pending: Vec<Option<Pending>>,
    rng: GameRng,
    steps: u64,
}

impl TabularQLearner {
    pub fn new(player: PlayerId, num_actions: usize, config: QLearnerConfig, seed: u64) -> Self {
        let step_size = config.step_size;
        Self {
            player,
            num_actions,
            config,
            q_values: FxHashMap::default(),
            step_size,
            pending: Vec::new(),
            rng: GameRng::new(seed),
            steps: 0,
        }
    }

    /// Current exploration rate of training decisions.
    pub fn epsilon(&self) -> f64 {
        let cfg = &self.config;
        if cfg.epsilon_decay_duration == 0 || self.steps >= cfg.epsilon_decay_duration {
            return cfg.epsilon_end;
        }
        let progress = self.steps as f64 / cfg.epsilon_decay_duration as f64;
        cfg.epsilon_start + (cfg.epsilon_end - cfg.epsilon_start) * progress
    }

    /// Current learning rate.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Learned value of `action` for an observation, 0 if never visited.
    pub fn q_value(&self, info_state: &[f32], action: ActionId) -> f64 {
        self.q_values
            .get(&state_key(info_state))
            .and_then(|row| row.get(action as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of distinct observations in the table.
    pub fn table_size(&self) -> usize {
        self.q_values.len()
    }

    fn max_q(&self, key: &StateKey, legal: &[ActionId]) -> f64 {
        let Some(row) = self.q_values.get(key) else {
            return 0.0;
        };
        legal
            .iter()
            .filter_map(|&a| row.get(a as usize).copied())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn update(&mut self, pending: Pending, target: f64) {
        let num_actions = self.num_actions;
        let row = self
            .q_values
            .entry(pending.key)
            .or_insert_with(|| vec![0.0; num_actions]);
        if let Some(q) = row.get_mut(pending.action as usize) {
            *q += self.step_size * (target - *q);
        }
    }

    /// Epsilon-greedy distribution over all actions.
    fn policy(&self, key: &StateKey, legal: &[ActionId], epsilon: f64) -> Vec<f64> {
        let mut probs = vec![0.0; self.num_actions];
        let row = self.q_values.get(key);
        let q = |a: ActionId| row.and_then(|r| r.get(a as usize)).copied().unwrap_or(0.0);

        let best = legal.iter().map(|&a| q(a)).fold(f64::NEG_INFINITY, f64::max);
        let greedy: Vec<ActionId> = legal.iter().copied().filter(|&a| q(a) == best).collect();

        let explore = epsilon / legal.len() as f64;
        for &a in legal {
            if let Some(p) = probs.get_mut(a as usize) {
                *p += explore;
            }
        }
        let exploit = (1.0 - epsilon) / greedy.len() as f64;
        for &a in &greedy {
            if let Some(p) = probs.get_mut(a as usize) {
                *p += exploit;
            }
        }
        probs
    }
}

impl Agent for TabularQLearner {
    fn player_id(&self) -> PlayerId {
        self.player
    }

    fn name(&self) -> &str {
        "Q-learning"
    }

    fn step(&mut self, time_steps: &[TimeStep], is_evaluation: bool) -> Result<Vec<AgentOutput>, AgentError> {
        if !is_evaluation && self.pending.len() < time_steps.len() {
            self.pending.resize(time_steps.len(), None);
        }

        let epsilon = if is_evaluation { 0.0 } else { self.epsilon() };
        let mut outputs = Vec::with_capacity(time_steps.len());

        for (slot, ts) in time_steps.iter().enumerate() {
            let legal = legal_actions_for(ts, self.player)?;
            check_action_range(legal, self.num_actions)?;
            let key = state_key(ts.info_state(self.player));

            if !is_evaluation {
                if let Some(pending) = self.pending[slot].take() {
                    // A fresh episode means the previous one ended on an opponent move.
                    let bootstrap = if ts.first() {
                        0.0
                    } else {
                        self.config.discount_factor * self.max_q(&key, legal)
                    };
                    let target = pending.reward + ts.reward(self.player) + bootstrap;
                    self.update(pending, target);
                }
            }

            let probs = self.policy(&key, legal, epsilon);
            let action = match self.rng.choose_weighted(&probs) {
                Some(idx) => idx as ActionId,
                None => legal[0],
            };

            if !is_evaluation {
                self.pending[slot] = Some(Pending {
                    key,
                    action,
                    reward: 0.0,
                });
            }
            outputs.push(AgentOutput::new(action, probs));
        }

        if !is_evaluation {
            self.steps += time_steps.len() as u64;
        }
        Ok(outputs)
    }

    fn post_step(&mut self, rewards: &[f64], dones: &[bool]) -> Result<(), AgentError> {
        if rewards.len() != dones.len() {
            return Err(AgentError::BatchMismatch {
                expected: rewards.len(),
                actual: dones.len(),
            });
        }
        for (slot, (&reward, &done)) in rewards.iter().zip(dones).enumerate() {
            let Some(entry) = self.pending.get_mut(slot) else {
                continue;
            };
            if done {
                if let Some(mut pending) = entry.take() {
                    pending.reward += reward;
                    let target = pending.reward;
                    self.update(pending, target);
                }
            } else if let Some(pending) = entry.as_mut() {
                pending.reward += reward;
            }
        }
        Ok(())
    }

    fn anneal_learning_rate(&mut self, update: usize, total_updates: usize) {
        if total_updates == 0 {
            return;
        }
        let frac = 1.0 - update as f64 / total_updates as f64;
        self.step_size = frac * self.config.step_size;
    }

    /// Multiply the learning rate by `scheduler_gamma`.
    fn step_scheduler(&mut self) {
        self.step_size *= self.config.scheduler_gamma;
        debug!(player = %self.player, step_size = self.step_size, "q-learner step size decayed");
    }

    fn end_episode(&mut self, time_step: &TimeStep) -> Result<(), AgentError> {
        let reward = time_step.reward(self.player);
        for slot in 0..self.pending.len() {
            if let Some(pending) = self.pending[slot].take() {
                let target = pending.reward + reward;
                self.update(pending, target);
            }
        }
        Ok(())
    }

    fn total_steps_done(&self) -> u64 {
        self.steps
    }
}
