//! Single-environment episodes for agents that learn online.

use tracing::debug;

use crate::agents::Agent;
use crate::core::{PlayerId, PlayerMap};
use crate::env::{Environment, Game};
use crate::error::{EnvError, TrainingError};

use super::{seat, single_action};

/// Outcome of one episode.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeResult {
    /// Cumulative returns at the end of the episode.
    pub returns: PlayerMap<f64>,
    /// Number of moves played.
    pub length: usize,
}

/// Play one episode, every seat acting for itself.
///
/// When not evaluating, every agent sees the final time step through
/// `end_episode` so it can complete its last update.
pub fn run_episode<G: Game>(
    env: &mut Environment<G>,
    agents: &mut PlayerMap<Box<dyn Agent>>,
    is_evaluation: bool,
) -> Result<EpisodeResult, TrainingError> {
    let mut time_step = env.reset();
    let mut length = 0;

    while !time_step.last() {
        let player = time_step.current_player().ok_or(EnvError::NoActor)?;
        let action = single_action(seat(agents, player)?, &time_step, is_evaluation)?;
        time_step = env.step(action)?;
        length += 1;
    }

    if !is_evaluation {
        for (_, agent) in agents.iter_mut() {
            agent.end_episode(&time_step)?;
        }
    }

    Ok(EpisodeResult {
        returns: env.returns(),
        length,
    })
}

/// Average reward of each trained seat against random opponents.
///
/// For every seat `pos`, the trained agent plays `pos` and the random
/// agents fill the other seats for `num_episodes` evaluation episodes. The
/// result at `pos` is the summed reward of seat `pos` divided by
/// `num_episodes`.
pub fn eval_against_random<G: Game>(
    env: &mut Environment<G>,
    trained: &mut PlayerMap<Box<dyn Agent>>,
    random: &mut PlayerMap<Box<dyn Agent>>,
    num_episodes: usize,
) -> Result<PlayerMap<f64>, TrainingError> {
    let player_count = trained.player_count();
    let mut totals = PlayerMap::with_value(player_count, 0.0);
    if num_episodes == 0 {
        return Ok(totals);
    }

    for pos in PlayerId::all(player_count) {
        let mut total = 0.0;
        for _ in 0..num_episodes {
            let mut time_step = env.reset();
            while !time_step.last() {
                let player = time_step.current_player().ok_or(EnvError::NoActor)?;
                let agent = if player == pos {
                    seat(trained, player)?
                } else {
                    seat(random, player)?
                };
                let action = single_action(agent, &time_step, true)?;
                time_step = env.step(action)?;
                total += time_step.reward(pos);
            }
        }
        totals[pos] = total / num_episodes as f64;
        debug!(seat = %pos, average = totals[pos], "evaluated against random");
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{QLearnerConfig, RandomAgent, TabularQLearner};
    use crate::games::tic_tac_toe::TicTacToe;

    fn random_agents(seed: u64) -> PlayerMap<Box<dyn Agent>> {
        PlayerMap::new(2, |p| Box::new(RandomAgent::new(p, 9, seed + p.index() as u64)) as Box<dyn Agent>)
    }

    #[test]
    fn test_run_episode_reports_returns() {
        let mut env = Environment::new(TicTacToe::new(), 0);
        let mut agents = random_agents(0);

        let result = run_episode(&mut env, &mut agents, false).unwrap();
        assert!((5..=9).contains(&result.length));
        let sum: f64 = result.returns.as_slice().iter().sum();
        assert_eq!(sum, 0.0);
        assert_eq!(agents[PlayerId::new(0)].total_steps_done() + agents[PlayerId::new(1)].total_steps_done(), result.length as u64);
    }

    #[test]
    fn test_eval_against_random_is_bounded() {
        let mut env = Environment::new(TicTacToe::new(), 0);
        let mut trained = random_agents(1);
        let mut random = random_agents(100);

        let rates = eval_against_random(&mut env, &mut trained, &mut random, 20).unwrap();
        for (_, &rate) in rates.iter() {
            assert!((-1.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn test_q_learners_beat_random_after_training() {
        let mut env = Environment::new(TicTacToe::new(), 0);
        let config = QLearnerConfig::new().with_step_size(0.5).with_epsilon(0.2, 0.2, 0);
        let mut agents: PlayerMap<Box<dyn Agent>> = PlayerMap::new(2, |p| {
            Box::new(TabularQLearner::new(p, 9, config.clone(), p.index() as u64)) as Box<dyn Agent>
        });

        for _ in 0..20_000 {
            run_episode(&mut env, &mut agents, false).unwrap();
        }

        let mut random = random_agents(7);
        let rates = eval_against_random(&mut env, &mut agents, &mut random, 200).unwrap();
        assert!(rates[PlayerId::new(0)] > 0.3, "rates = {:?}", rates);
    }
}
