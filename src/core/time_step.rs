//! Per-environment snapshots handed to agents.
//!
//! A `TimeStep` is produced by every `Environment::reset` and
//! `Environment::step` and superseded by the next one. Agents only ever read
//! it.

use serde::{Deserialize, Serialize};

use super::player::{PlayerId, PlayerMap};

/// Game-wide integer action id in `0..num_distinct_actions`.
pub type ActionId = u32;

/// Position of a time step within its episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    /// Produced by a reset.
    First,
    /// Produced by a step that did not end the episode.
    Mid,
    /// Produced by the step that ended the episode.
    Last,
}

/// What each seat can see at this point of the episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observations {
    /// Seat to move, `None` once the episode is over.
    pub current_player: Option<PlayerId>,

    /// Legal actions per seat. Empty for every seat that is not to move.
    pub legal_actions: PlayerMap<Vec<ActionId>>,

    /// Observation tensor per seat.
    pub info_state: PlayerMap<Vec<f32>>,
}

/// Snapshot of one environment after a reset or a step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeStep {
    pub observations: Observations,

    /// Reward each seat received on the transition that produced this step.
    pub rewards: PlayerMap<f64>,

    pub step_type: StepType,
}

impl TimeStep {
    /// Whether this step ended the episode.
    #[must_use]
    pub fn last(&self) -> bool {
        self.step_type == StepType::Last
    }

    /// Whether this step was produced by a reset.
    #[must_use]
    pub fn first(&self) -> bool {
        self.step_type == StepType::First
    }

    /// Seat to move, `None` once terminal.
    #[must_use]
    pub fn current_player(&self) -> Option<PlayerId> {
        self.observations.current_player
    }

    /// Legal actions of `player`.
    #[must_use]
    pub fn legal_actions(&self, player: PlayerId) -> &[ActionId] {
        self.observations
            .legal_actions
            .get(player)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Observation tensor of `player`.
    #[must_use]
    pub fn info_state(&self, player: PlayerId) -> &[f32] {
        self.observations
            .info_state
            .get(player)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Reward `player` received on the last transition.
    #[must_use]
    pub fn reward(&self, player: PlayerId) -> f64 {
        self.rewards.get(player).copied().unwrap_or(0.0)
    }

    /// Number of seats described by this step.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.rewards.player_count()
    }
}
