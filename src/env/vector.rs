//! Batched environments stepped in lockstep.
//!
//! `SyncVectorEnv` holds `num_envs` independent environments and steps them
//! one after another inside a single call, so every step of a batch has
//! completed before control returns.
//!
//! ```
//! use rust_selfplay::env::SyncVectorEnv;
//! use rust_selfplay::games::tic_tac_toe::TicTacToe;
//!
//! let mut envs = SyncVectorEnv::from_fn(4, |seed| (TicTacToe::new(), seed));
//! let time_steps = envs.reset();
//! assert_eq!(time_steps.len(), 4);
//!
//! let batch = envs.step(&[4, 4, 4, 4], true).unwrap();
//! assert_eq!(batch.dones, vec![false; 4]);
//! ```

use crate::core::{ActionId, PlayerMap, TimeStep};
use crate::error::EnvError;

use super::environment::Environment;
use super::game::Game;

/// Result of one batched step.
#[derive(Clone, Debug)]
pub struct VectorStep {
    /// Pending time step per environment (post-reset where a reset happened).
    pub time_steps: Vec<TimeStep>,

    /// Reward of the stepped transition per environment.
    pub rewards: Vec<PlayerMap<f64>>,

    /// Whether the stepped transition ended the episode.
    pub dones: Vec<bool>,

    /// Time steps as produced by the step, before any reset.
    pub unreset_time_steps: Vec<TimeStep>,
}

/// A fixed-size batch of environments.
pub struct SyncVectorEnv<G: Game> {
    envs: Vec<Environment<G>>,
}

impl<G: Game> SyncVectorEnv<G> {
    /// Wrap existing environments.
    ///
    /// # Panics
    ///
    /// Panics if `envs` is empty.
    pub fn new(envs: Vec<Environment<G>>) -> Self {
        assert!(!envs.is_empty(), "Must have at least 1 environment");
        Self { envs }
    }

    /// Build `num_envs` environments from a factory.
    ///
    /// The factory receives the environment index and returns the game and
    /// the chance seed for that environment.
    ///
    /// # Panics
    ///
    /// Panics if `num_envs` is zero.
    pub fn from_fn(num_envs: usize, mut factory: impl FnMut(u64) -> (G, u64)) -> Self {
        let envs = (0..num_envs as u64)
            .map(|i| {
                let (game, seed) = factory(i);
                Environment::new(game, seed)
            })
            .collect();
        Self::new(envs)
    }

    /// Number of environments.
    pub fn len(&self) -> usize {
        self.envs.len()
    }

    /// Always false; construction requires at least one environment.
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    /// The wrapped environments.
    pub fn envs(&self) -> &[Environment<G>] {
        &self.envs
    }

    /// Mutable access to the wrapped environments.
    pub fn envs_mut(&mut self) -> &mut [Environment<G>] {
        &mut self.envs
    }

    /// One environment by index.
    pub fn env_mut(&mut self, index: usize) -> &mut Environment<G> {
        &mut self.envs[index]
    }

    /// Reset every environment.
    pub fn reset(&mut self) -> Vec<TimeStep> {
        self.envs.iter_mut().map(Environment::reset).collect()
    }

    /// Step every environment with its action.
    ///
    /// With `reset_if_done`, environments whose episode ended on this step
    /// are reset and their post-reset step is reported in `time_steps`.
    pub fn step(&mut self, actions: &[ActionId], reset_if_done: bool) -> Result<VectorStep, EnvError> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::BatchMismatch {
                expected: self.envs.len(),
                actual: actions.len(),
            });
        }

        let n = self.envs.len();
        let mut batch = VectorStep {
            time_steps: Vec::with_capacity(n),
            rewards: Vec::with_capacity(n),
            dones: Vec::with_capacity(n),
            unreset_time_steps: Vec::with_capacity(n),
        };

        for (env, &action) in self.envs.iter_mut().zip(actions) {
            let stepped = env.step(action)?;
            let done = stepped.last();

            batch.rewards.push(stepped.rewards.clone());
            batch.dones.push(done);
            let pending = if done && reset_if_done {
                env.reset()
            } else {
                stepped.clone()
            };
            batch.time_steps.push(pending);
            batch.unreset_time_steps.push(stepped);
        }

        Ok(batch)
    }
}
