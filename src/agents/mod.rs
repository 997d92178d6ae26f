//! Agents: the capability trait shared by every seat and its implementations.
//!
//! ## Overview
//!
//! - **Agent**: step / post_step / learn / anneal_learning_rate / step_scheduler /
//!   end_episode
//! - **RandomAgent**: uniform over legal actions (baseline and evaluation bots)
//! - **TabularQLearner**: epsilon-greedy Q-learning over observation keys
//! - **TabularPpo**: clipped-surrogate actor-critic over observation keys
//! - **HumanAgent**: reads actions from a terminal
//!
//! The training loops only talk to `dyn Agent`; they never branch on the
//! agent kind.

pub mod human;
pub mod ppo;
pub mod q_learner;
pub mod random;

pub use human::HumanAgent;
pub use ppo::{PpoConfig, TabularPpo};
pub use q_learner::{QLearnerConfig, TabularQLearner};
pub use random::RandomAgent;

use crate::core::{ActionId, PlayerId, TimeStep};
use crate::error::AgentError;

/// An agent's decision for one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentOutput {
    /// Chosen action.
    pub action: ActionId,

    /// Distribution over all `num_distinct_actions` the choice was drawn
    /// from. Empty if the agent has none.
    pub probs: Vec<f64>,
}

impl AgentOutput {
    pub fn new(action: ActionId, probs: Vec<f64>) -> Self {
        Self { action, probs }
    }
}

/// Metrics returned from a learning update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateStats {
    pub policy_loss: f64,
    pub value_loss: f64,
    pub entropy: f64,
    pub approx_kl: f64,
    pub clip_fraction: f64,

    /// Transitions consumed by the update.
    pub samples: usize,
}

/// Universal interface for every seat.
///
/// Batches are per environment: `step` receives one time step per
/// environment and returns one output per time step, in order. Calls with
/// `is_evaluation = true` must not change anything the agent has learned.
pub trait Agent {
    /// Seat this agent plays.
    fn player_id(&self) -> PlayerId;

    /// Display name.
    fn name(&self) -> &str;

    /// Choose an action for every time step.
    ///
    /// When `is_evaluation` is false the agent may explore and record
    /// experience; otherwise it acts greedily and records nothing.
    fn step(&mut self, time_steps: &[TimeStep], is_evaluation: bool) -> Result<Vec<AgentOutput>, AgentError>;

    /// Receive the reward and done flag of the transition caused by the
    /// previous `step`, one entry per environment.
    fn post_step(&mut self, _rewards: &[f64], _dones: &[bool]) -> Result<(), AgentError> {
        Ok(())
    }

    /// Run a learning update on collected experience.
    ///
    /// `time_steps` are the pending steps after the last transition, used
    /// for bootstrapping.
    fn learn(&mut self, _time_steps: &[TimeStep]) -> Result<UpdateStats, AgentError> {
        Ok(UpdateStats::default())
    }

    /// Scale the learning rate for progress `update / total_updates`.
    fn anneal_learning_rate(&mut self, _update: usize, _total_updates: usize) {}

    /// Advance a step-wise learning-rate schedule by one step.
    fn step_scheduler(&mut self) {}

    /// Observe the final step of an episode played with single-environment
    /// batches.
    fn end_episode(&mut self, _time_step: &TimeStep) -> Result<(), AgentError> {
        Ok(())
    }

    /// Number of non-evaluation decisions taken so far.
    fn total_steps_done(&self) -> u64;
}

/// Hashable key for an observation tensor.
pub(crate) type StateKey = Vec<u32>;

pub(crate) fn state_key(info_state: &[f32]) -> StateKey {
    info_state.iter().map(|v| v.to_bits()).collect()
}

/// Legal actions of `player` at `time_step`, or an error when it is not
/// `player`'s turn.
pub(crate) fn legal_actions_for(time_step: &TimeStep, player: PlayerId) -> Result<&[ActionId], AgentError> {
    let legal = time_step.legal_actions(player);
    if legal.is_empty() {
        Err(AgentError::NoLegalActions { player })
    } else {
        Ok(legal)
    }
}

/// Reject legal actions that do not fit a table of `num_actions` columns.
pub(crate) fn check_action_range(legal: &[ActionId], num_actions: usize) -> Result<(), AgentError> {
    match legal.iter().find(|&&a| a as usize >= num_actions) {
        Some(&action) => Err(AgentError::ActionOutOfRange { action, num_actions }),
        None => Ok(()),
    }
}
