//! Tabular PPO agent.
//!
//! The policy is a table of logits per observation key, masked to the legal
//! actions and normalized with a softmax. A second table holds state values.
//!
//! Every training `step` records one decision per environment, `post_step`
//! records its reward and done flag, and `learn` turns the rollout into
//! GAE advantages and runs the clipped-surrogate update:
//!
//! ```text
//! ratio  = π_new(a|s) / π_old(a|s)
//! L_clip = min(ratio · A, clip(ratio, 1 - ε, 1 + ε) · A)
//! ```
//!
//! Gradients are taken per sample directly on the touched table rows.

mod config;
mod rollout;

pub use config::PpoConfig;
pub use rollout::{compute_gae, RolloutBuffer, RolloutEntry, Sample};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::core::{ActionId, GameRng, PlayerId, TimeStep};
use crate::error::AgentError;

use super::{check_action_range, legal_actions_for, state_key, Agent, AgentOutput, StateKey, UpdateStats};

/// Per-legal-action scratch values.
type Scratch = SmallVec<[f64; 16]>;

/// Loss terms of a single sample update.
#[derive(Default)]
struct SampleStats {
    policy_loss: f64,
    value_loss: f64,
    entropy: f64,
    approx_kl: f64,
    clipped: bool,
}

/// Clipped-surrogate actor-critic over observation keys.
pub struct TabularPpo {
    player: PlayerId,
    num_actions: usize,
    config: PpoConfig,
    logits: FxHashMap<StateKey, Vec<f64>>,
    values: FxHashMap<StateKey, f64>,
    learning_rate: f64,
    rollout: RolloutBuffer,
    rng: GameRng,
    steps: u64,
    updates: u64,
}

impl TabularPpo {
    pub fn new(player: PlayerId, num_actions: usize, config: PpoConfig, seed: u64) -> Self {
        let learning_rate = config.learning_rate;
        Self {
            player,
            num_actions,
            config,
            logits: FxHashMap::default(),
            values: FxHashMap::default(),
            learning_rate,
            rollout: RolloutBuffer::new(),
            rng: GameRng::new(seed),
            steps: 0,
            updates: 0,
        }
    }

    pub fn config(&self) -> &PpoConfig {
        &self.config
    }

    /// Current (possibly annealed) learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Number of completed `learn` calls that consumed samples.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Ticks recorded since the last update.
    pub fn pending_ticks(&self) -> usize {
        self.rollout.len()
    }

    /// Policy distribution over all actions for an observation.
    pub fn action_probabilities(&self, info_state: &[f32], legal: &[ActionId]) -> Vec<f64> {
        let probs = self.masked_softmax(&state_key(info_state), legal);
        self.expand(legal, &probs)
    }

    /// Learned state value, 0 if never visited.
    pub fn value(&self, info_state: &[f32]) -> f64 {
        self.value_of(&state_key(info_state))
    }

    fn value_of(&self, key: &StateKey) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Softmax of the logits restricted to `legal`, in `legal` order.
    fn masked_softmax(&self, key: &StateKey, legal: &[ActionId]) -> Scratch {
        let row = self.logits.get(key);
        let logit = |a: ActionId| row.and_then(|r| r.get(a as usize)).copied().unwrap_or(0.0);

        let max = legal.iter().map(|&a| logit(a)).fold(f64::NEG_INFINITY, f64::max);
        let mut probs: Scratch = legal.iter().map(|&a| (logit(a) - max).exp()).collect();
        let total: f64 = probs.iter().sum();
        for p in probs.iter_mut() {
            *p /= total;
        }
        probs
    }

    fn expand(&self, legal: &[ActionId], probs: &[f64]) -> Vec<f64> {
        let mut full = vec![0.0; self.num_actions];
        for (&a, &p) in legal.iter().zip(probs) {
            if let Some(slot) = full.get_mut(a as usize) {
                *slot = p;
            }
        }
        full
    }

    /// Advantages of one minibatch, normalized if configured.
    fn minibatch_advantages(&self, samples: &[Sample], batch: &[usize]) -> Vec<f64> {
        let mut advantages: Vec<f64> = batch.iter().map(|&i| samples[i].advantage).collect();
        if !self.config.normalize_advantages || advantages.len() < 2 {
            return advantages;
        }

        let n = advantages.len() as f64;
        let mean = advantages.iter().sum::<f64>() / n;
        let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std = var.sqrt() + 1e-8;
        for a in advantages.iter_mut() {
            *a = (*a - mean) / std;
        }
        advantages
    }

    fn update_sample(&mut self, sample: &Sample, advantage: f64) -> SampleStats {
        let entry = &sample.entry;
        let probs = self.masked_softmax(&entry.key, &entry.legal);
        let idx = entry
            .legal
            .iter()
            .position(|&a| a == entry.action)
            .unwrap_or(0);

        let log_ratio = probs[idx].max(f64::MIN_POSITIVE).ln() - entry.log_prob;
        let ratio = log_ratio.exp();
        let clip = self.config.clip_coef;

        let policy_loss = (-advantage * ratio).max(-advantage * ratio.clamp(1.0 - clip, 1.0 + clip));
        // The clipped branch has zero gradient.
        let surrogate_active = !((advantage > 0.0 && ratio > 1.0 + clip)
            || (advantage < 0.0 && ratio < 1.0 - clip));

        let entropy: f64 = -probs
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| p * p.ln())
            .sum::<f64>();

        let entropy_coef = self.config.entropy_coef;
        let mut grad: Scratch = probs
            .iter()
            .enumerate()
            .map(|(j, &p)| {
                let mut g = 0.0;
                if surrogate_active {
                    let indicator = if j == idx { 1.0 } else { 0.0 };
                    g += advantage * ratio * (indicator - p);
                }
                if p > 0.0 {
                    g -= entropy_coef * p * (p.ln() + entropy);
                }
                g
            })
            .collect();

        let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
        if norm > self.config.max_grad_norm {
            let scale = self.config.max_grad_norm / norm;
            for g in grad.iter_mut() {
                *g *= scale;
            }
        }

        let lr = self.learning_rate;
        let num_actions = self.num_actions;
        let row = self
            .logits
            .entry(entry.key.clone())
            .or_insert_with(|| vec![0.0; num_actions]);
        for (&a, g) in entry.legal.iter().zip(&grad) {
            if let Some(logit) = row.get_mut(a as usize) {
                *logit += lr * g;
            }
        }

        let value_coef = self.config.value_coef;
        let value = self.values.entry(entry.key.clone()).or_insert(0.0);
        let error = sample.ret - *value;
        *value += lr * value_coef * error;

        SampleStats {
            policy_loss,
            value_loss: 0.5 * error * error,
            entropy,
            approx_kl: (ratio - 1.0) - log_ratio,
            clipped: (ratio - 1.0).abs() > clip,
        }
    }
}

impl Agent for TabularPpo {
    fn player_id(&self) -> PlayerId {
        self.player
    }

    fn name(&self) -> &str {
        "PPO"
    }

    fn step(&mut self, time_steps: &[TimeStep], is_evaluation: bool) -> Result<Vec<AgentOutput>, AgentError> {
        let mut outputs = Vec::with_capacity(time_steps.len());
        let mut entries = Vec::with_capacity(time_steps.len());

        for ts in time_steps {
            let legal = legal_actions_for(ts, self.player)?;
            check_action_range(legal, self.num_actions)?;
            let key = state_key(ts.info_state(self.player));
            let probs = self.masked_softmax(&key, legal);

            let idx = if is_evaluation {
                probs
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
                    .0
            } else {
                self.rng.choose_weighted(&probs).unwrap_or(0)
            };
            let action = legal[idx];

            if !is_evaluation {
                entries.push(RolloutEntry {
                    value: self.value_of(&key),
                    key,
                    legal: legal.to_vec(),
                    action,
                    log_prob: probs[idx].max(f64::MIN_POSITIVE).ln(),
                });
            }
            outputs.push(AgentOutput::new(action, self.expand(legal, &probs)));
        }

        if !is_evaluation {
            self.rollout.push_decisions(entries);
            self.steps += time_steps.len() as u64;
        }
        Ok(outputs)
    }

    fn post_step(&mut self, rewards: &[f64], dones: &[bool]) -> Result<(), AgentError> {
        self.rollout.push_outcomes(rewards, dones)
    }

    fn learn(&mut self, time_steps: &[TimeStep]) -> Result<UpdateStats, AgentError> {
        if self.rollout.is_empty() {
            return Ok(UpdateStats::default());
        }

        let last_values: Vec<f64> = time_steps
            .iter()
            .map(|ts| self.value_of(&state_key(ts.info_state(self.player))))
            .collect();
        let samples = match self
            .rollout
            .into_samples(&last_values, self.config.gamma, self.config.gae_lambda)
        {
            Ok(samples) => samples,
            Err(e) => {
                self.rollout.clear();
                return Err(e);
            }
        };

        let n = samples.len();
        let minibatch_size = n.div_ceil(self.config.num_minibatches).max(1);
        let mut indices: Vec<usize> = (0..n).collect();

        let mut totals = SampleStats::default();
        let mut clipped = 0usize;
        let mut updates = 0usize;

        for epoch in 0..self.config.update_epochs {
            self.rng.shuffle(&mut indices);
            let mut epoch_kl = 0.0;

            for batch in indices.chunks(minibatch_size) {
                let advantages = self.minibatch_advantages(&samples, batch);
                for (&i, &advantage) in batch.iter().zip(&advantages) {
                    let stats = self.update_sample(&samples[i], advantage);
                    totals.policy_loss += stats.policy_loss;
                    totals.value_loss += stats.value_loss;
                    totals.entropy += stats.entropy;
                    totals.approx_kl += stats.approx_kl;
                    epoch_kl += stats.approx_kl;
                    clipped += usize::from(stats.clipped);
                    updates += 1;
                }
            }

            if let Some(target_kl) = self.config.target_kl {
                let mean_kl = epoch_kl / n.max(1) as f64;
                if mean_kl > target_kl {
                    debug!(epoch, mean_kl, target_kl, "ppo update stopped early");
                    break;
                }
            }
        }

        self.updates += 1;
        let denom = updates.max(1) as f64;
        let stats = UpdateStats {
            policy_loss: totals.policy_loss / denom,
            value_loss: totals.value_loss / denom,
            entropy: totals.entropy / denom,
            approx_kl: totals.approx_kl / denom,
            clip_fraction: clipped as f64 / denom,
            samples: n,
        };
        debug!(
            player = %self.player,
            samples = n,
            policy_loss = stats.policy_loss,
            value_loss = stats.value_loss,
            approx_kl = stats.approx_kl,
            "ppo update"
        );
        Ok(stats)
    }

    fn anneal_learning_rate(&mut self, update: usize, total_updates: usize) {
        if total_updates == 0 {
            return;
        }
        let frac = 1.0 - update as f64 / total_updates as f64;
        self.learning_rate = frac * self.config.learning_rate;
    }

    fn total_steps_done(&self) -> u64 {
        self.steps
    }
}
