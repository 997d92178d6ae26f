//! Training loops for agents seated in N-player games.
//!
//! ## Overview
//!
//! - **SelfPlayTrainer**: vectorized self-play with one trainee seat; opponents
//!   are driven in evaluation mode until the trainee is to move everywhere
//! - **play_out**: one evaluation episode printed move by move
//! - **run_episode / eval_against_random**: single-environment episodes for
//!   agents that learn online
//! - **RewardWindow**: recent training returns and their summary
//! - **MetricsSink**: destination for per-tick scalars
//!
//! ## Usage
//!
//! ```
//! use rust_selfplay::agents::{Agent, RandomAgent};
//! use rust_selfplay::core::{PlayerId, PlayerMap};
//! use rust_selfplay::env::SyncVectorEnv;
//! use rust_selfplay::games::tic_tac_toe::TicTacToe;
//! use rust_selfplay::training::{MetaEpoch, NullSink, SelfPlayConfig, SelfPlayTrainer};
//!
//! let config = SelfPlayConfig::new()
//!     .with_num_envs(2)
//!     .with_num_steps(4)
//!     .with_total_timesteps(16);
//! let trainer = SelfPlayTrainer::new(config);
//!
//! let mut envs = SyncVectorEnv::from_fn(2, |i| (TicTacToe::new(), i));
//! let mut agents: PlayerMap<Box<dyn Agent>> =
//!     PlayerMap::new(2, |p| Box::new(RandomAgent::new(p, 9, p.index() as u64)) as Box<dyn Agent>);
//!
//! let report = trainer
//!     .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
//!     .unwrap();
//! assert_eq!(report.updates, 2);
//! assert_eq!(report.ticks, 8);
//! ```

pub mod config;
pub mod episode;
pub mod metrics;
pub mod play_out;
pub mod reward_window;
pub mod self_play;

pub use config::SelfPlayConfig;
pub use episode::{eval_against_random, run_episode, EpisodeResult};
pub use metrics::{MemorySink, MetricsSink, NullSink, TracingSink};
pub use play_out::play_out;
pub use reward_window::{RewardSummary, RewardWindow};
pub use self_play::{drain_opponents, reporting_return, MetaEpoch, SelfPlayTrainer, SlotState, TrainReport};

use crate::agents::{Agent, AgentOutput};
use crate::core::{ActionId, PlayerId, PlayerMap, TimeStep};
use crate::error::{AgentError, TrainingError};

/// The agent seated at `player`.
pub(crate) fn seat(
    agents: &mut PlayerMap<Box<dyn Agent>>,
    player: PlayerId,
) -> Result<&mut Box<dyn Agent>, TrainingError> {
    agents.get_mut(player).ok_or(TrainingError::MissingAgent { player })
}

/// Ask one agent for a single action.
pub(crate) fn single_action(
    agent: &mut Box<dyn Agent>,
    time_step: &TimeStep,
    is_evaluation: bool,
) -> Result<ActionId, TrainingError> {
    let outputs = agent.step(std::slice::from_ref(time_step), is_evaluation)?;
    outputs
        .first()
        .map(|o: &AgentOutput| o.action)
        .ok_or_else(|| AgentError::BatchMismatch { expected: 1, actual: 0 }.into())
}
