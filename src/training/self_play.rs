//! Vectorized self-play with a single trainee seat.
//!
//! Each tick has two phases. First every environment is drained: opponents
//! act in evaluation mode (and finished episodes are reset) until the
//! trainee is to move in that environment. Then the trainee acts once for
//! the whole batch and the vector environment is stepped with
//! reset-on-done. After `num_steps` ticks the trainee learns.

use std::io::Write;

use tracing::{info, warn};

use crate::agents::{Agent, UpdateStats};
use crate::core::{ActionId, PlayerId, PlayerMap, TimeStep};
use crate::env::{Game, SyncVectorEnv};
use crate::error::{AgentError, EnvError, TrainingError};

use super::config::SelfPlayConfig;
use super::metrics::MetricsSink;
use super::play_out::play_out;
use super::reward_window::{RewardSummary, RewardWindow};
use super::{seat, single_action};

/// What an environment slot is waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// The trainee is to move.
    AwaitingTrainee,
    /// Another seat is to move.
    AwaitingOpponent(PlayerId),
    /// The episode is over and needs a reset.
    Terminal,
}

impl SlotState {
    /// Fails with [`EnvError::NoActor`] when a live episode has nobody to
    /// move, which only a chance node without outcomes can produce.
    pub fn classify(time_step: &TimeStep, trainee: PlayerId) -> Result<Self, EnvError> {
        if time_step.last() {
            return Ok(SlotState::Terminal);
        }
        match time_step.current_player() {
            Some(p) if p == trainee => Ok(SlotState::AwaitingTrainee),
            Some(p) => Ok(SlotState::AwaitingOpponent(p)),
            None => Err(EnvError::NoActor),
        }
    }
}

/// Position of a training call within an alternating schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaEpoch {
    pub current: usize,
    pub total: usize,
}

impl MetaEpoch {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }
}

/// Outcome of one training call.
#[derive(Clone, Debug)]
pub struct TrainReport {
    pub trainee: PlayerId,
    pub updates: usize,
    pub ticks: usize,
    pub post_steps: usize,
    /// Opponent moves taken while draining.
    pub opponent_turns: usize,
    /// Stats of the last update, if any ran.
    pub learn_stats: Option<UpdateStats>,
    /// Reward window at the end of the call.
    pub summary: RewardSummary,
}

/// Runs self-play training calls for a fixed configuration.
pub struct SelfPlayTrainer {
    config: SelfPlayConfig,
}

impl SelfPlayTrainer {
    pub fn new(config: SelfPlayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelfPlayConfig {
        &self.config
    }

    /// Trainee decisions per update across all environments.
    pub fn batch_size(&self) -> usize {
        self.config.batch_size()
    }

    /// Updates per training call, see [`SelfPlayConfig::num_updates`].
    pub fn num_updates(&self) -> usize {
        self.config.num_updates()
    }

    /// Arguments for `anneal_learning_rate` at `update` of `epoch`.
    ///
    /// Progress runs across all meta-epochs, so the rate keeps falling from
    /// one training call to the next.
    pub fn anneal_progress(&self, epoch: MetaEpoch, update: usize) -> (usize, usize) {
        let num_updates = self.num_updates();
        (epoch.current * num_updates + update, epoch.total * num_updates)
    }

    /// Train the agent at `trainee` against the other seats.
    ///
    /// Only the trainee is stepped with `is_evaluation = false` and only it
    /// receives `post_step`, `anneal_learning_rate` and `learn`. Any agent or
    /// environment failure aborts the call.
    pub fn train<G: Game>(
        &self,
        agents: &mut PlayerMap<Box<dyn Agent>>,
        trainee: PlayerId,
        envs: &mut SyncVectorEnv<G>,
        sink: &mut dyn MetricsSink,
        epoch: MetaEpoch,
    ) -> Result<TrainReport, TrainingError> {
        seat(agents, trainee)?;

        let num_updates = self.num_updates();
        if num_updates == 0 {
            warn!(
                total_timesteps = self.config.total_timesteps,
                batch_size = self.batch_size(),
                "budget is smaller than one batch, no updates will run"
            );
        }

        let tag = format!("charts/player_{}_training_returns", trainee);
        let eval_every = self.config.eval_every.max(1);
        let mut window = RewardWindow::new(self.config.reward_window);
        let mut report = TrainReport {
            trainee,
            updates: 0,
            ticks: 0,
            post_steps: 0,
            opponent_turns: 0,
            learn_stats: None,
            summary: window.describe(),
        };

        let mut time_steps = envs.reset();
        for update in 0..num_updates {
            for _ in 0..self.config.num_steps {
                report.opponent_turns += drain_opponents(agents, trainee, envs, &mut time_steps)?;

                let agent = seat(agents, trainee)?;
                let outputs = agent.step(&time_steps, false)?;
                if outputs.len() != envs.len() {
                    return Err(AgentError::BatchMismatch {
                        expected: envs.len(),
                        actual: outputs.len(),
                    }
                    .into());
                }
                let actions: Vec<ActionId> = outputs.iter().map(|o| o.action).collect();

                let batch = envs.step(&actions, true)?;
                time_steps = batch.time_steps;

                if let Some(value) = reporting_return(envs, trainee) {
                    window.push(value);
                    sink.add_scalar(&tag, value, agent.total_steps_done());
                }

                let rewards: Vec<f64> = batch
                    .rewards
                    .iter()
                    .map(|r| r.get(trainee).copied().unwrap_or(0.0))
                    .collect();
                agent.post_step(&rewards, &batch.dones)?;

                report.ticks += 1;
                report.post_steps += 1;
            }

            let agent = seat(agents, trainee)?;
            if self.config.anneal_lr {
                let (progress, total) = self.anneal_progress(epoch, update);
                agent.anneal_learning_rate(progress, total);
            }

            report.learn_stats = Some(agent.learn(&time_steps)?);
            report.updates += 1;

            if update % eval_every == 0 {
                info!("{}", "-".repeat(80));
                info!(trainee = %trainee, step = agent.total_steps_done(), "update {}", update);
                info!("Summary of past {} rewards\n{}", window.capacity(), window.describe());
            }
        }

        report.summary = window.describe();
        Ok(report)
    }

    /// Alternate the trainee seat over `meta_epochs`, printing a play-out on
    /// the first environment after each meta-epoch.
    pub fn train_alternating<G: Game, W: Write>(
        &self,
        agents: &mut PlayerMap<Box<dyn Agent>>,
        envs: &mut SyncVectorEnv<G>,
        sink: &mut dyn MetricsSink,
        out: &mut W,
    ) -> Result<Vec<TrainReport>, TrainingError> {
        let total = self.config.meta_epochs;
        let seats: Vec<PlayerId> = agents.player_ids().collect();
        let mut reports = Vec::with_capacity(total * seats.len());

        for current in 0..total {
            let epoch = MetaEpoch::new(current, total);
            for &trainee in &seats {
                info!(epoch = current, trainee = %trainee, "training");
                reports.push(self.train(agents, trainee, envs, sink, epoch)?);
            }
            let steps = play_out(envs.env_mut(0), agents, out)?;
            info!(epoch = current, steps, "play-out finished");
        }
        Ok(reports)
    }
}

/// Drive every environment until the trainee is to move in it.
///
/// Opponents act with `is_evaluation = true` on single-element batches;
/// finished episodes are reset in place. Returns the number of opponent
/// moves taken.
pub fn drain_opponents<G: Game>(
    agents: &mut PlayerMap<Box<dyn Agent>>,
    trainee: PlayerId,
    envs: &mut SyncVectorEnv<G>,
    time_steps: &mut [TimeStep],
) -> Result<usize, TrainingError> {
    let mut turns = 0;
    for (i, time_step) in time_steps.iter_mut().enumerate() {
        loop {
            match SlotState::classify(time_step, trainee)? {
                SlotState::AwaitingTrainee => break,
                SlotState::AwaitingOpponent(player) => {
                    let action = single_action(seat(agents, player)?, time_step, true)?;
                    *time_step = envs.env_mut(i).step(action)?;
                    turns += 1;
                }
                SlotState::Terminal => {
                    *time_step = envs.env_mut(i).reset();
                    if time_step.last() {
                        return Err(EnvError::TerminalAtReset.into());
                    }
                }
            }
        }
    }
    Ok(turns)
}

/// Best cumulative return of `trainee` over the environments that are not
/// terminal, or `None` if every environment is terminal.
pub fn reporting_return<G: Game>(envs: &SyncVectorEnv<G>, trainee: PlayerId) -> Option<f64> {
    envs.envs()
        .iter()
        .filter(|env| !env.is_terminal())
        .filter_map(|env| env.returns().get(trainee).copied())
        .fold(None, |best, v| Some(best.map_or(v, |b: f64| b.max(v))))
}
