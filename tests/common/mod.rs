//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rust_selfplay::agents::{Agent, AgentOutput, UpdateStats};
use rust_selfplay::core::{ActionId, PlayerId, PlayerMap, TimeStep};
use rust_selfplay::env::{Game, Turn};
use rust_selfplay::error::AgentError;

/// Round-robin game lasting a fixed number of plies.
///
/// Each seat picks `0` ("zero") or `1` ("one"); a seat's return is the
/// number of times it picked `1`.
#[derive(Clone, Debug)]
pub struct PlyGame {
    pub players: usize,
    pub plies: usize,
}

#[derive(Clone, Debug)]
pub struct PlyState {
    pub ply: usize,
    pub ones: Vec<f64>,
}

impl PlyGame {
    pub fn new(players: usize, plies: usize) -> Self {
        Self { players, plies }
    }
}

impl Game for PlyGame {
    type State = PlyState;

    fn name(&self) -> &str {
        "ply_game"
    }

    fn player_count(&self) -> usize {
        self.players
    }

    fn num_distinct_actions(&self) -> usize {
        2
    }

    fn observation_size(&self) -> usize {
        2
    }

    fn new_initial_state(&self) -> PlyState {
        PlyState {
            ply: 0,
            ones: vec![0.0; self.players],
        }
    }

    fn turn(&self, state: &PlyState) -> Turn {
        if state.ply >= self.plies {
            Turn::Terminal
        } else {
            Turn::Player(PlayerId::new((state.ply % self.players) as u8))
        }
    }

    fn legal_actions(&self, state: &PlyState) -> Vec<ActionId> {
        if state.ply >= self.plies {
            Vec::new()
        } else {
            vec![0, 1]
        }
    }

    fn apply_action(&self, state: &mut PlyState, action: ActionId) {
        let player = state.ply % self.players;
        state.ones[player] += action as f64;
        state.ply += 1;
    }

    fn returns(&self, state: &PlyState) -> PlayerMap<f64> {
        PlayerMap::from_vec(state.ones.clone())
    }

    fn observation_tensor(&self, state: &PlyState, player: PlayerId) -> Vec<f32> {
        vec![state.ply as f32, player.0 as f32]
    }

    fn action_to_string(&self, _player: PlayerId, action: ActionId) -> String {
        let label = if action == 1 { "one" } else { "zero" };
        label.to_string()
    }
}

/// Two-seat game that reaches a chance node without outcomes after
/// `plies` moves, leaving nobody to act.
#[derive(Clone, Debug)]
pub struct StuckChanceGame {
    pub plies: usize,
}

impl Game for StuckChanceGame {
    type State = usize;

    fn name(&self) -> &str {
        "stuck_chance"
    }

    fn player_count(&self) -> usize {
        2
    }

    fn num_distinct_actions(&self) -> usize {
        2
    }

    fn observation_size(&self) -> usize {
        1
    }

    fn new_initial_state(&self) -> usize {
        0
    }

    fn turn(&self, ply: &usize) -> Turn {
        if *ply >= self.plies {
            Turn::Chance
        } else {
            Turn::Player(PlayerId::new((*ply % 2) as u8))
        }
    }

    fn legal_actions(&self, ply: &usize) -> Vec<ActionId> {
        if *ply >= self.plies {
            Vec::new()
        } else {
            vec![0, 1]
        }
    }

    fn apply_action(&self, ply: &mut usize, _action: ActionId) {
        *ply += 1;
    }

    fn returns(&self, _ply: &usize) -> PlayerMap<f64> {
        PlayerMap::with_value(2, 0.0)
    }

    fn observation_tensor(&self, ply: &usize, _player: PlayerId) -> Vec<f32> {
        vec![*ply as f32]
    }

    fn action_to_string(&self, _player: PlayerId, action: ActionId) -> String {
        action.to_string()
    }
}

/// Everything a `CountingAgent` was asked to do.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    /// Batch size of every training `step`.
    pub train_steps: Vec<usize>,
    /// Batch size of every evaluation `step`.
    pub eval_steps: Vec<usize>,
    pub post_steps: Vec<(Vec<f64>, Vec<bool>)>,
    pub learns: usize,
    pub anneals: Vec<(usize, usize)>,
    pub scheduler_steps: usize,
    pub end_episodes: usize,
}

pub type SharedLog = Rc<RefCell<CallLog>>;

/// Plays a fixed action (or the last legal one) and records every call.
pub struct CountingAgent {
    pub player: PlayerId,
    pub log: SharedLog,
    pub action: Option<ActionId>,
    pub short_batches: bool,
    pub fail_learn: bool,
    steps: u64,
}

impl CountingAgent {
    pub fn new(player: PlayerId) -> (Self, SharedLog) {
        let log = SharedLog::default();
        let agent = Self {
            player,
            log: Rc::clone(&log),
            action: None,
            short_batches: false,
            fail_learn: false,
            steps: 0,
        };
        (agent, log)
    }
}

impl Agent for CountingAgent {
    fn player_id(&self) -> PlayerId {
        self.player
    }

    fn name(&self) -> &str {
        "Counting"
    }

    fn step(&mut self, time_steps: &[TimeStep], is_evaluation: bool) -> Result<Vec<AgentOutput>, AgentError> {
        let mut log = self.log.borrow_mut();
        if is_evaluation {
            log.eval_steps.push(time_steps.len());
        } else {
            log.train_steps.push(time_steps.len());
            self.steps += time_steps.len() as u64;
        }

        let mut outputs = Vec::with_capacity(time_steps.len());
        for ts in time_steps {
            let legal = ts.legal_actions(self.player);
            let Some(&last) = legal.last() else {
                return Err(AgentError::NoLegalActions { player: self.player });
            };
            outputs.push(AgentOutput::new(self.action.unwrap_or(last), Vec::new()));
        }
        if self.short_batches {
            outputs.pop();
        }
        Ok(outputs)
    }

    fn post_step(&mut self, rewards: &[f64], dones: &[bool]) -> Result<(), AgentError> {
        self.log.borrow_mut().post_steps.push((rewards.to_vec(), dones.to_vec()));
        Ok(())
    }

    fn learn(&mut self, time_steps: &[TimeStep]) -> Result<UpdateStats, AgentError> {
        self.log.borrow_mut().learns += 1;
        if self.fail_learn {
            return Err(AgentError::BatchMismatch { expected: 1, actual: 0 });
        }
        Ok(UpdateStats {
            samples: time_steps.len(),
            ..UpdateStats::default()
        })
    }

    fn anneal_learning_rate(&mut self, update: usize, total_updates: usize) {
        self.log.borrow_mut().anneals.push((update, total_updates));
    }

    fn step_scheduler(&mut self) {
        self.log.borrow_mut().scheduler_steps += 1;
    }

    fn end_episode(&mut self, _time_step: &TimeStep) -> Result<(), AgentError> {
        self.log.borrow_mut().end_episodes += 1;
        Ok(())
    }

    fn total_steps_done(&self) -> u64 {
        self.steps
    }
}

/// One counting agent per seat, with their logs.
pub fn counting_agents(players: usize) -> (PlayerMap<Box<dyn Agent>>, Vec<SharedLog>) {
    let mut logs = Vec::with_capacity(players);
    let agents = PlayerMap::new(players, |p| {
        let (agent, log) = CountingAgent::new(p);
        logs.push(log);
        Box::new(agent) as Box<dyn Agent>
    });
    (agents, logs)
}
