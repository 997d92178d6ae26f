//! Single-game environment producing `TimeStep`s.
//!
//! Wraps a `Game` and its current state:
//! - Chance nodes are resolved automatically with the environment's RNG, so
//!   agents only ever see seat decisions
//! - Per-step rewards are the change in `Game::returns` across the step
//! - Illegal actions are rejected before they reach the game

use crate::core::{ActionId, GameRng, Observations, PlayerId, PlayerMap, StepType, TimeStep};
use crate::error::EnvError;

use super::game::{Game, Turn};

/// One game instance with reset/step semantics.
pub struct Environment<G: Game> {
    game: G,
    state: G::State,
    rng: GameRng,
    last_returns: PlayerMap<f64>,
    time_step: TimeStep,
}

impl<G: Game> Environment<G> {
    /// Create an environment and reset it to a fresh episode.
    ///
    /// `seed` drives chance sampling.
    pub fn new(game: G, seed: u64) -> Self {
        let state = game.new_initial_state();
        let last_returns = game.returns(&state);
        let time_step = observe(&game, &state, last_returns.map(|_, _| 0.0), StepType::First);
        let mut env = Self {
            game,
            state,
            rng: GameRng::new(seed),
            last_returns,
            time_step,
        };
        env.reset();
        env
    }

    /// Start a new episode.
    ///
    /// Rewards on the returned step are zero. If the game is already over
    /// after its opening chance events, the step is `StepType::Last`.
    pub fn reset(&mut self) -> TimeStep {
        self.state = self.game.new_initial_state();
        self.resolve_chance();
        self.last_returns = self.game.returns(&self.state);

        let step_type = if self.game.is_terminal(&self.state) {
            StepType::Last
        } else {
            StepType::First
        };
        let rewards = self.last_returns.map(|_, _| 0.0);
        self.time_step = observe(&self.game, &self.state, rewards, step_type);
        self.time_step.clone()
    }

    /// Apply the acting seat's action and advance past any chance events.
    pub fn step(&mut self, action: ActionId) -> Result<TimeStep, EnvError> {
        match self.game.turn(&self.state) {
            Turn::Player(_) => {}
            Turn::Terminal => return Err(EnvError::SteppedTerminal),
            Turn::Chance => return Err(EnvError::NoActor),
        }

        let legal = self.game.legal_actions(&self.state);
        if !legal.contains(&action) {
            return Err(EnvError::IllegalAction { action, legal });
        }

        self.game.apply_action(&mut self.state, action);
        self.resolve_chance();

        let returns = self.game.returns(&self.state);
        let rewards = returns.delta_from(&self.last_returns);
        self.last_returns = returns;

        let step_type = if self.game.is_terminal(&self.state) {
            StepType::Last
        } else {
            StepType::Mid
        };
        self.time_step = observe(&self.game, &self.state, rewards, step_type);
        Ok(self.time_step.clone())
    }

    /// Sample and apply chance outcomes until a seat is to move or the game ends.
    fn resolve_chance(&mut self) {
        while self.game.turn(&self.state) == Turn::Chance {
            let outcomes = self.game.chance_outcomes(&self.state);
            let weights: Vec<f64> = outcomes.iter().map(|(_, p)| *p).collect();
            let Some(idx) = self.rng.choose_weighted(&weights) else {
                // Leaves the state without an actor; `step` reports it.
                return;
            };
            self.game.apply_action(&mut self.state, outcomes[idx].0);
        }
    }

    /// The wrapped game.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// The current game state.
    pub fn state(&self) -> &G::State {
        &self.state
    }

    /// The most recent time step.
    pub fn time_step(&self) -> &TimeStep {
        &self.time_step
    }

    /// Cumulative return of every seat in the current episode.
    pub fn returns(&self) -> PlayerMap<f64> {
        self.game.returns(&self.state)
    }

    /// Check if the current episode is over.
    pub fn is_terminal(&self) -> bool {
        self.game.is_terminal(&self.state)
    }

    /// Seat to move, `None` once terminal.
    pub fn current_player(&self) -> Option<PlayerId> {
        self.game.current_player(&self.state)
    }

    /// Human-readable label of an action.
    pub fn action_to_string(&self, player: PlayerId, action: ActionId) -> String {
        self.game.action_to_string(player, action)
    }
}

fn observe<G: Game>(
    game: &G,
    state: &G::State,
    rewards: PlayerMap<f64>,
    step_type: StepType,
) -> TimeStep {
    let player_count = game.player_count();
    let current_player = game.current_player(state);

    let mut legal_actions = PlayerMap::with_default(player_count);
    if let Some(p) = current_player {
        legal_actions[p] = game.legal_actions(state);
    }

    TimeStep {
        observations: Observations {
            current_player,
            legal_actions,
            info_state: PlayerMap::new(player_count, |p| game.observation_tensor(state, p)),
        },
        rewards,
        step_type,
    }
}
