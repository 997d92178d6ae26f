//! Structured error types.

use std::path::PathBuf;

use crate::core::{ActionId, PlayerId};

/// Errors raised by environments.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("action {action} is not legal (legal: {legal:?})")]
    IllegalAction { action: ActionId, legal: Vec<ActionId> },

    #[error("cannot step an environment whose episode is over")]
    SteppedTerminal,

    #[error("no seat is to move and the chance node has no outcomes")]
    NoActor,

    #[error("episode is already over after reset")]
    TerminalAtReset,

    #[error("expected {expected} actions, got {actual}")]
    BatchMismatch { expected: usize, actual: usize },
}

/// Errors raised by agents.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("player {player} has no legal actions")]
    NoLegalActions { player: PlayerId },

    #[error("action {action} is outside the agent's {num_actions} actions")]
    ActionOutOfRange { action: ActionId, num_actions: usize },

    #[error("agent returned {actual} outputs for {expected} time steps")]
    BatchMismatch { expected: usize, actual: usize },

    #[error("input closed before a legal action was entered")]
    InputClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during training and play-outs.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("no agent seated for player {player}")]
    MissingAgent { player: PlayerId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
