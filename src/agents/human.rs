use std::io::{BufRead, Write};

use crate::core::{ActionId, PlayerId, TimeStep};
use crate::error::AgentError;

use super::{legal_actions_for, Agent, AgentOutput};

/// An agent that reads its actions from a line-oriented terminal.
///
/// The legal actions are printed as a prompt and input is re-read until it
/// parses to one of them. End of input is an error.
pub struct HumanAgent<R, W> {
    player: PlayerId,
    input: R,
    output: W,
    steps: u64,
}

impl<R: BufRead, W: Write> HumanAgent<R, W> {
    pub fn new(player: PlayerId, input: R, output: W) -> Self {
        Self {
            player,
            input,
            output,
            steps: 0,
        }
    }

    /// Consume the agent and return its output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_action(&mut self, legal: &[ActionId]) -> Result<ActionId, AgentError> {
        let choices = legal.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
        let mut line = String::new();
        loop {
            write!(self.output, "Choose an action from [{}]: ", choices)?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(AgentError::InputClosed);
            }
            match line.trim().parse::<ActionId>() {
                Ok(action) if legal.contains(&action) => return Ok(action),
                _ => writeln!(self.output, "Illegal action: {}", line.trim())?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Agent for HumanAgent<R, W> {
    fn player_id(&self) -> PlayerId {
        self.player
    }

    fn name(&self) -> &str {
        "Human"
    }

    fn step(&mut self, time_steps: &[TimeStep], is_evaluation: bool) -> Result<Vec<AgentOutput>, AgentError> {
        let mut outputs = Vec::with_capacity(time_steps.len());
        for ts in time_steps {
            let legal = legal_actions_for(ts, self.player)?;
            let action = self.read_action(legal)?;
            outputs.push(AgentOutput::new(action, Vec::new()));
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
