//! Rollout storage and Generalized Advantage Estimation.
//!
//! The buffer is laid out `[tick][env]`: every training `step` appends one
//! row of decisions and every `post_step` appends the matching row of
//! rewards and done flags.

use crate::agents::StateKey;
use crate::core::ActionId;
use crate::error::AgentError;

/// One recorded decision.
#[derive(Clone, Debug)]
pub struct RolloutEntry {
    pub key: StateKey,
    pub legal: Vec<ActionId>,
    pub action: ActionId,
    pub log_prob: f64,
    pub value: f64,
}

/// A flattened training sample with its targets.
#[derive(Clone, Debug)]
pub struct Sample {
    pub entry: RolloutEntry,
    pub advantage: f64,
    pub ret: f64,
}

/// Decisions and outcomes of one rollout.
#[derive(Clone, Debug, Default)]
pub struct RolloutBuffer {
    decisions: Vec<Vec<RolloutEntry>>,
    rewards: Vec<Vec<f64>>,
    dones: Vec<Vec<bool>>,
}

impl RolloutBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick of decisions, one per environment.
    pub fn push_decisions(&mut self, entries: Vec<RolloutEntry>) {
        self.decisions.push(entries);
    }

    /// Record the outcome of the latest decisions.
    pub fn push_outcomes(&mut self, rewards: &[f64], dones: &[bool]) -> Result<(), AgentError> {
        let expected = self.decisions.last().map_or(0, Vec::len);
        if rewards.len() != expected || dones.len() != expected {
            return Err(AgentError::BatchMismatch {
                expected,
                actual: rewards.len().min(dones.len()),
            });
        }
        self.rewards.push(rewards.to_vec());
        self.dones.push(dones.to_vec());
        Ok(())
    }

    /// Number of recorded ticks.
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn clear(&mut self) {
        self.decisions.clear();
        self.rewards.clear();
        self.dones.clear();
    }

    /// Compute advantages and returns, then flatten into samples.
    ///
    /// `last_values` bootstraps the final tick, one value per environment.
    pub fn into_samples(
        &mut self,
        last_values: &[f64],
        gamma: f64,
        gae_lambda: f64,
    ) -> Result<Vec<Sample>, AgentError> {
        if self.rewards.len() != self.decisions.len() {
            return Err(AgentError::BatchMismatch {
                expected: self.decisions.len(),
                actual: self.rewards.len(),
            });
        }
        let num_envs = self.decisions.first().map_or(0, Vec::len);
        if let Some(row) = self.decisions.iter().find(|row| row.len() != num_envs) {
            return Err(AgentError::BatchMismatch {
                expected: num_envs,
                actual: row.len(),
            });
        }
        if last_values.len() != num_envs {
            return Err(AgentError::BatchMismatch {
                expected: num_envs,
                actual: last_values.len(),
            });
        }

        let values: Vec<Vec<f64>> = self
            .decisions
            .iter()
            .map(|row| row.iter().map(|e| e.value).collect())
            .collect();
        let (advantages, returns) =
            compute_gae(&self.rewards, &values, &self.dones, last_values, gamma, gae_lambda);

        let mut samples = Vec::with_capacity(self.decisions.len() * num_envs);
        for (t, row) in self.decisions.drain(..).enumerate() {
            for (env, entry) in row.into_iter().enumerate() {
                samples.push(Sample {
                    entry,
                    advantage: advantages[t][env],
                    ret: returns[t][env],
                });
            }
        }
        self.rewards.clear();
        self.dones.clear();
        Ok(samples)
    }
}

/// Generalized Advantage Estimation over a `[tick][env]` rollout.
///
/// ```text
/// δ_t = r_t + γ · V_{t+1} · (1 - done_t) - V_t
/// A_t = δ_t + γ · λ · (1 - done_t) · A_{t+1}
/// ```
///
/// `done_t` marks a transition that ended its episode, so nothing is
/// bootstrapped across it. Returns are `A_t + V_t`.
pub fn compute_gae(
    rewards: &[Vec<f64>],
    values: &[Vec<f64>],
    dones: &[Vec<bool>],
    last_values: &[f64],
    gamma: f64,
    gae_lambda: f64,
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let num_steps = rewards.len();
    let num_envs = last_values.len();

    let mut advantages = vec![vec![0.0; num_envs]; num_steps];
    let mut returns = vec![vec![0.0; num_envs]; num_steps];

    for env in 0..num_envs {
        let mut gae = 0.0;
        for t in (0..num_steps).rev() {
            let next_value = if t + 1 == num_steps {
                last_values[env]
            } else {
                values[t + 1][env]
            };
            let non_terminal = if dones[t][env] { 0.0 } else { 1.0 };

            let delta = rewards[t][env] + gamma * next_value * non_terminal - values[t][env];
            gae = delta + gamma * gae_lambda * non_terminal * gae;

            advantages[t][env] = gae;
            returns[t][env] = gae + values[t][env];
        }
    }

    (advantages, returns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: f64) -> RolloutEntry {
        RolloutEntry {
            key: vec![0],
            legal: vec![0, 1],
            action: 0,
            log_prob: (0.5f64).ln(),
            value,
        }
    }

    #[test]
    fn test_gae_single_terminal_step() {
        let (adv, ret) = compute_gae(&[vec![1.0]], &[vec![0.25]], &[vec![true]], &[10.0], 0.99, 0.95);
        assert!((adv[0][0] - 0.75).abs() < 1e-12);
        assert!((ret[0][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gae_bootstraps_last_value() {
        let (adv, _) = compute_gae(&[vec![0.0]], &[vec![0.0]], &[vec![false]], &[2.0], 0.5, 1.0);
        assert!((adv[0][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gae_with_lambda_one_is_discounted_return() {
        let rewards = vec![vec![0.0], vec![0.0], vec![1.0]];
        let values = vec![vec![0.0], vec![0.0], vec![0.0]];
        let dones = vec![vec![false], vec![false], vec![true]];
        let (_, ret) = compute_gae(&rewards, &values, &dones, &[0.0], 0.9, 1.0);

        assert!((ret[0][0] - 0.81).abs() < 1e-12);
        assert!((ret[1][0] - 0.9).abs() < 1e-12);
        assert!((ret[2][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_done_stops_propagation() {
        let rewards = vec![vec![0.0], vec![5.0]];
        let values = vec![vec![0.0], vec![0.0]];
        let dones = vec![vec![true], vec![true]];
        let (adv, _) = compute_gae(&rewards, &values, &dones, &[0.0], 1.0, 1.0);
        assert_eq!(adv[0][0], 0.0);
        assert_eq!(adv[1][0], 5.0);
    }

    #[test]
    fn test_outcome_batch_must_match() {
        let mut buffer = RolloutBuffer::new();
        buffer.push_decisions(vec![entry(0.0), entry(0.0)]);
        assert!(buffer.push_outcomes(&[1.0], &[false]).is_err());
        assert!(buffer.push_outcomes(&[1.0, 0.0], &[false, true]).is_ok());
    }

    #[test]
    fn test_into_samples_flattens_and_clears() {
        let mut buffer = RolloutBuffer::new();
        buffer.push_decisions(vec![entry(0.0), entry(0.0)]);
        buffer.push_outcomes(&[1.0, -1.0], &[true, true]).unwrap();

        let samples = buffer.into_samples(&[0.0, 0.0], 0.99, 0.95).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].advantage, 1.0);
        assert_eq!(samples[1].advantage, -1.0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_into_samples_rejects_ragged_rows() {
        let mut buffer = RolloutBuffer::new();
        buffer.push_decisions(vec![entry(0.0), entry(0.0)]);
        buffer.push_outcomes(&[0.0, 0.0], &[false, false]).unwrap();
        buffer.push_decisions(vec![entry(0.0)]);
        buffer.push_outcomes(&[1.0], &[true]).unwrap();

        let err = buffer.into_samples(&[0.0, 0.0], 0.99, 0.95).unwrap_err();
        assert!(matches!(err, AgentError::BatchMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_into_samples_requires_outcomes() {
        let mut buffer = RolloutBuffer::new();
        buffer.push_decisions(vec![entry(0.0)]);
        assert!(buffer.into_samples(&[0.0], 0.99, 0.95).is_err());
    }
}
