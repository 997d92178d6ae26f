use crate::core::{GameRng, PlayerId, TimeStep};
use crate::error::AgentError;

use super::{legal_actions_for, Agent, AgentOutput};

/// An agent that selects uniformly at random from legal actions.
pub struct RandomAgent {
    player: PlayerId,
    num_actions: usize,
    rng: GameRng,
    steps: u64,
}

impl RandomAgent {
    pub fn new(player: PlayerId, num_actions: usize, seed: u64) -> Self {
        RandomAgent {
            player,
            num_actions,
            rng: GameRng::new(seed),
            steps: 0,
        }
    }
}

impl Agent for RandomAgent {
    fn player_id(&self) -> PlayerId {
        self.player
    }

    fn name(&self) -> &str {
        "Random"
    }

    fn step(&mut self, time_steps: &[TimeStep], is_evaluation: bool) -> Result<Vec<AgentOutput>, AgentError> {
        let mut outputs = Vec::with_capacity(time_steps.len());
        for ts in time_steps {
            let legal = legal_actions_for(ts, self.player)?;
            let action = self
                .rng
                .choose(legal)
                .copied()
                .ok_or(AgentError::NoLegalActions { player: self.player })?;

            let mut probs = vec![0.0; self.num_actions];
            let p = 1.0 / legal.len() as f64;
            for &a in legal {
                if let Some(slot) = probs.get_mut(a as usize) {
                    *slot = p;
                }
            }
            outputs.push(AgentOutput::new(action, probs));
        }

        if !is_evaluation {
            self.steps += time_steps.len() as u64;
        }
        Ok(outputs)
    }

    fn total_steps_done(&self) -> u64 {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::games::tic_tac_toe::TicTacToe;

    #[test]
    fn test_random_agent_selects_legal_action() {
        let mut env = Environment::new(TicTacToe::new(), 0);
        env.step(4).unwrap();
        let ts = env.step(0).unwrap();

        let mut agent = RandomAgent::new(PlayerId::new(0), 9, 42);
        for _ in 0..100 {
            let out = agent.step(std::slice::from_ref(&ts), false).unwrap();
            assert!(ts.legal_actions(PlayerId::new(0)).contains(&out[0].action));
            assert_eq!(out[0].probs[4], 0.0);
            assert!((out[0].probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert_eq!(agent.total_steps_done(), 100);
    }

    #[test]
    fn test_random_agents_play_full_game() {
        let mut env = Environment::new(TicTacToe::new(), 0);
        let mut agents = [
            RandomAgent::new(PlayerId::new(0), 9, 1),
            RandomAgent::new(PlayerId::new(1), 9, 2),
        ];

        let mut ts = env.reset();
        while !ts.last() {
            let player = ts.current_player().unwrap();
            let out = agents[player.index()].step(std::slice::from_ref(&ts), true).unwrap();
            ts = env.step(out[0].action).unwrap();
        }

        assert!(env.is_terminal());
        assert_eq!(agents[0].total_steps_done(), 0);
    }

    #[test]
    fn test_not_our_turn_is_an_error() {
        let env = Environment::new(TicTacToe::new(), 0);
        let mut agent = RandomAgent::new(PlayerId::new(1), 9, 42);
        let err = agent.step(std::slice::from_ref(env.time_step()), true).unwrap_err();
        assert!(matches!(err, AgentError::NoLegalActions { .. }));
    }
}
