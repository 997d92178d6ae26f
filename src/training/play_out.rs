//! Single evaluation episode, printed move by move.

use std::io::Write;

use crate::agents::Agent;
use crate::core::{PlayerId, PlayerMap};
use crate::env::{Environment, Game};
use crate::error::{EnvError, TrainingError};

use super::{seat, single_action};

/// Play one episode with every seat in evaluation mode.
///
/// Writes one line per move: the acting player, the action label and
/// player 0's reward for the move. Returns the number of moves. Nothing is
/// written if the episode is over right after the reset.
pub fn play_out<G: Game, W: Write>(
    env: &mut Environment<G>,
    agents: &mut PlayerMap<Box<dyn Agent>>,
    out: &mut W,
) -> Result<usize, TrainingError> {
    let mut time_step = env.reset();
    let mut steps = 0;

    while !env.is_terminal() {
        let player = time_step.current_player().ok_or(EnvError::NoActor)?;
        let action = single_action(seat(agents, player)?, &time_step, true)?;
        let label = env.action_to_string(player, action);

        time_step = env.step(action)?;
        writeln!(out, "{} {} {}", player, label, time_step.reward(PlayerId::new(0)))?;
        steps += 1;
    }

    out.flush()?;
    Ok(steps)
}
