//! Game trait for rules implementations.
//!
//! Games implement `Game` to define their rules:
//! - Whose turn it is, including chance nodes
//! - What actions are legal
//! - How actions modify state
//! - Cumulative returns and per-seat observations
//!
//! Environments wrap a `Game` and turn these calls into `TimeStep`s.

use crate::core::{ActionId, PlayerId, PlayerMap};

/// Who acts next in a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    /// A seat chooses the next action.
    Player(PlayerId),
    /// The outcome is sampled from `Game::chance_outcomes`.
    Chance,
    /// The episode is over.
    Terminal,
}

/// Rules of a sequential N-player game.
///
/// ## Implementation Notes
///
/// - `legal_actions`: actions of the seat to move; empty at terminal states
/// - `chance_outcomes`: only consulted when `turn` is `Turn::Chance`
/// - `apply_action`: called only with actions from `legal_actions` or
///   `chance_outcomes`
/// - `returns`: cumulative return per seat since the initial state
pub trait Game {
    /// Mutable game state. Cloned by environments for bookkeeping.
    type State: Clone;

    /// Short name for logs.
    fn name(&self) -> &str;

    /// Number of seats.
    fn player_count(&self) -> usize;

    /// Size of the action id space.
    fn num_distinct_actions(&self) -> usize;

    /// Length of `observation_tensor`.
    fn observation_size(&self) -> usize;

    /// Create the initial state of an episode.
    fn new_initial_state(&self) -> Self::State;

    /// Who acts next.
    fn turn(&self, state: &Self::State) -> Turn;

    /// Legal actions for the seat to move.
    fn legal_actions(&self, state: &Self::State) -> Vec<ActionId>;

    /// Outcome distribution at a chance node.
    fn chance_outcomes(&self, _state: &Self::State) -> Vec<(ActionId, f64)> {
        Vec::new()
    }

    /// Apply an action (or chance outcome) to the state.
    fn apply_action(&self, state: &mut Self::State, action: ActionId);

    /// Cumulative return of every seat.
    fn returns(&self, state: &Self::State) -> PlayerMap<f64>;

    /// Observation tensor from `player`'s point of view.
    fn observation_tensor(&self, state: &Self::State, player: PlayerId) -> Vec<f32>;

    /// Human-readable label of `action` taken by `player`.
    fn action_to_string(&self, player: PlayerId, action: ActionId) -> String;

    /// Check if the episode is over.
    fn is_terminal(&self, state: &Self::State) -> bool {
        self.turn(state) == Turn::Terminal
    }

    /// Seat to move, `None` at chance and terminal states.
    fn current_player(&self, state: &Self::State) -> Option<PlayerId> {
        match self.turn(state) {
            Turn::Player(p) => Some(p),
            Turn::Chance | Turn::Terminal => None,
        }
    }
}
