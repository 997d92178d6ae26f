//! # rust-selfplay
//!
//! Self-play training loops for reinforcement-learning agents in N-player
//! sequential games.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: Loops only see the `Game` trait, `TimeStep`s and
//!    integer action ids. Chance nodes are resolved by the environment.
//!
//! 2. **N-Player First**: Seats are `PlayerId`s and per-seat data lives in
//!    `PlayerMap`. Nothing assumes two players.
//!
//! 3. **Configuration Over Convention**: Every loop and agent takes an
//!    explicit config struct; the binaries load them from TOML.
//!
//! ## Architecture
//!
//! - **Drain-then-act**: a self-play tick first lets opponents move (in
//!   evaluation mode) until the trainee is to move in every environment,
//!   then asks the trainee for one batched decision.
//!
//! - **One agent trait**: trainee, opponents, random bots and humans are all
//!   `Box<dyn Agent>`; loops never branch on the agent kind.
//!
//! - **Tabular agents**: policies, values and Q-values are stored per
//!   observation key, so learning needs no ML framework.
//!
//! ## Modules
//!
//! - `core`: players, per-player maps, RNG, time steps
//! - `env`: game contract, single and vectorized environments
//! - `games`: concrete games (tic-tac-toe)
//! - `agents`: the `Agent` trait and its implementations
//! - `training`: self-play, play-out and episode loops, reward window, metrics
//! - `config`: TOML application config
//! - `error`: error types

pub mod agents;
pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod games;
pub mod training;

// Re-export commonly used types
pub use crate::core::{ActionId, GameRng, Observations, PlayerId, PlayerMap, StepType, TimeStep};

pub use crate::env::{Environment, Game, SyncVectorEnv, Turn, VectorStep};

pub use crate::agents::{
    Agent, AgentOutput, HumanAgent, PpoConfig, QLearnerConfig, RandomAgent, TabularPpo,
    TabularQLearner, UpdateStats,
};

pub use crate::training::{
    MetaEpoch, MetricsSink, RewardSummary, RewardWindow, SelfPlayConfig, SelfPlayTrainer,
    SlotState, TrainReport,
};

pub use crate::config::AppConfig;
pub use crate::error::{AgentError, ConfigError, EnvError, TrainingError};
