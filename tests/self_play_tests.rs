//! Integration tests for the self-play training loop.

mod common;

use common::{counting_agents, CountingAgent, PlyGame, StuckChanceGame};
use rust_selfplay::agents::{Agent, PpoConfig, RandomAgent, TabularPpo};
use rust_selfplay::core::{PlayerId, PlayerMap};
use rust_selfplay::env::SyncVectorEnv;
use rust_selfplay::error::{AgentError, EnvError, TrainingError};
use rust_selfplay::games::tic_tac_toe::TicTacToe;
use rust_selfplay::training::{
    drain_opponents, reporting_return, MemorySink, MetaEpoch, NullSink, SelfPlayConfig, SelfPlayTrainer,
};

fn ply_envs(num_envs: usize, players: usize, plies: usize) -> SyncVectorEnv<PlyGame> {
    SyncVectorEnv::from_fn(num_envs, |i| (PlyGame::new(players, plies), i))
}

fn trainer(num_envs: usize, num_steps: usize, total: usize) -> SelfPlayTrainer {
    SelfPlayTrainer::new(
        SelfPlayConfig::new()
            .with_num_envs(num_envs)
            .with_num_steps(num_steps)
            .with_total_timesteps(total)
            .with_eval_every(1),
    )
}

// =============================================================================
// Call Protocol
// =============================================================================

#[test]
fn test_one_update_call_protocol() {
    let trainer = trainer(2, 5, 10);
    let (mut agents, logs) = counting_agents(2);
    let mut envs = ply_envs(2, 2, 3);
    let mut sink = MemorySink::new();

    let report = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut sink, MetaEpoch::new(0, 1))
        .unwrap();

    assert_eq!(report.updates, 1);
    assert_eq!(report.ticks, 5);
    assert_eq!(report.post_steps, 5);
    assert_eq!(report.opponent_turns, 4);

    let trainee = logs[0].borrow();
    assert_eq!(trainee.train_steps, vec![2; 5]);
    assert!(trainee.eval_steps.is_empty());
    assert_eq!(trainee.post_steps.len(), 5);
    assert_eq!(trainee.learns, 1);
    assert_eq!(trainee.anneals, vec![(0, 1)]);

    let dones: Vec<bool> = trainee.post_steps.iter().map(|(_, d)| d[0]).collect();
    assert_eq!(dones, vec![false, true, false, true, false]);
    for (rewards, _) in &trainee.post_steps {
        assert_eq!(rewards, &vec![1.0, 1.0]);
    }

    let opponent = logs[1].borrow();
    assert!(opponent.train_steps.is_empty());
    assert_eq!(opponent.eval_steps, vec![1; 4]);
    assert!(opponent.post_steps.is_empty());
    assert_eq!(opponent.learns, 0);
    assert!(opponent.anneals.is_empty());

    let scalars = &sink.scalars;
    assert_eq!(scalars.len(), 5);
    assert!(scalars.iter().all(|(tag, _, _)| tag == "charts/player_0_training_returns"));
    assert_eq!(sink.values("charts/player_0_training_returns"), vec![1.0, 0.0, 1.0, 0.0, 1.0]);
    let steps: Vec<u64> = scalars.iter().map(|(_, _, s)| *s).collect();
    assert_eq!(steps, vec![2, 4, 6, 8, 10]);

    assert_eq!(report.summary.count, 5);
    assert!((report.summary.mean - 0.6).abs() < 1e-12);
}

#[test]
fn test_budget_below_one_batch_runs_nothing() {
    let trainer = trainer(8, 128, 1000);
    assert_eq!(trainer.num_updates(), 0);

    let (mut agents, logs) = counting_agents(2);
    let mut envs = ply_envs(8, 2, 3);
    let report = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap();

    assert_eq!(report.updates, 0);
    assert_eq!(report.summary.count, 0);
    for log in &logs {
        let log = log.borrow();
        assert!(log.train_steps.is_empty() && log.eval_steps.is_empty());
        assert_eq!(log.learns, 0);
    }
}

#[test]
fn test_partial_batch_is_dropped() {
    let trainer = trainer(2, 3, 11);
    assert_eq!(trainer.batch_size(), 6);
    assert_eq!(trainer.num_updates(), 1);
}

#[test]
fn test_three_players_drain_every_opponent() {
    let trainer = trainer(1, 3, 3);
    let (mut agents, logs) = counting_agents(3);
    let mut envs = ply_envs(1, 3, 3);

    trainer
        .train(&mut agents, PlayerId::new(2), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap();

    assert_eq!(logs[0].borrow().eval_steps.len(), 3);
    assert_eq!(logs[1].borrow().eval_steps.len(), 3);
    let trainee = logs[2].borrow();
    assert_eq!(trainee.train_steps, vec![1; 3]);
    assert!(trainee.post_steps.iter().all(|(r, d)| r == &vec![1.0] && d == &vec![true]));
}

// =============================================================================
// Annealing
// =============================================================================

#[test]
fn test_anneal_progress_continues_across_meta_epochs() {
    let trainer = trainer(1, 2, 6);
    let (mut agents, logs) = counting_agents(2);
    let mut envs = ply_envs(1, 2, 3);

    for current in 0..2 {
        trainer
            .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(current, 2))
            .unwrap();
    }

    let anneals = logs[0].borrow().anneals.clone();
    assert_eq!(anneals, (0..6).map(|u| (u, 6)).collect::<Vec<_>>());
    assert!(anneals.windows(2).all(|w| w[0].0 < w[1].0));
}

#[test]
fn test_anneal_disabled() {
    let trainer = SelfPlayTrainer::new(
        SelfPlayConfig::new()
            .with_num_envs(1)
            .with_num_steps(2)
            .with_total_timesteps(4)
            .with_anneal_lr(false),
    );
    let (mut agents, logs) = counting_agents(2);
    let mut envs = ply_envs(1, 2, 3);

    trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap();

    assert!(logs[0].borrow().anneals.is_empty());
    assert_eq!(logs[0].borrow().learns, 2);
}

// =============================================================================
// Reporting
// =============================================================================

#[test]
fn test_reporting_return_none_when_all_terminal() {
    let mut envs = ply_envs(2, 2, 1);
    envs.reset();
    envs.step(&[1, 1], false).unwrap();

    assert!(envs.envs().iter().all(|e| e.is_terminal()));
    assert_eq!(reporting_return(&envs, PlayerId::new(0)), None);
}

#[test]
fn test_reporting_return_ignores_terminal_envs() {
    let mut envs = SyncVectorEnv::from_fn(3, |i| (PlyGame::new(2, if i == 0 { 1 } else { 3 }), i));
    envs.reset();
    envs.step(&[1, 1, 0], false).unwrap();

    // env 0 finished with return 1; env 1 is live with return 1, env 2 with 0
    assert!(envs.envs()[0].is_terminal());
    assert_eq!(reporting_return(&envs, PlayerId::new(0)), Some(1.0));
    assert_eq!(reporting_return(&envs, PlayerId::new(1)), Some(0.0));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_no_actor_at_reset_is_an_error() {
    let trainer = trainer(1, 1, 1);
    let (mut agents, logs) = counting_agents(2);
    let mut envs = SyncVectorEnv::from_fn(1, |i| (StuckChanceGame { plies: 0 }, i));

    let err = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap_err();
    assert!(matches!(err, TrainingError::Env(EnvError::NoActor)));
    assert!(logs[0].borrow().train_steps.is_empty());
}

#[test]
fn test_drain_stops_at_mid_episode_no_actor() {
    let (mut agents, logs) = counting_agents(2);
    let mut envs = SyncVectorEnv::from_fn(1, |i| (StuckChanceGame { plies: 1 }, i));
    let mut time_steps = envs.reset();

    let err = drain_opponents(&mut agents, PlayerId::new(1), &mut envs, &mut time_steps).unwrap_err();
    assert!(matches!(err, TrainingError::Env(EnvError::NoActor)));
    // The opponent moved once; the episode was not reset and thrown away.
    assert_eq!(logs[0].borrow().eval_steps, vec![1]);
    assert!(!time_steps[0].last());
}

#[test]
fn test_terminal_at_reset_is_an_error() {
    let trainer = trainer(1, 1, 1);
    let (mut agents, _) = counting_agents(2);
    let mut envs = ply_envs(1, 2, 0);

    let err = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap_err();
    assert!(matches!(err, TrainingError::Env(EnvError::TerminalAtReset)));
}

#[test]
fn test_short_trainee_batch_is_an_error() {
    let trainer = trainer(2, 1, 2);
    let (mut agents, _) = counting_agents(2);
    let (mut short, _) = CountingAgent::new(PlayerId::new(0));
    short.short_batches = true;
    agents[PlayerId::new(0)] = Box::new(short);
    let mut envs = ply_envs(2, 2, 3);

    let err = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        TrainingError::Agent(AgentError::BatchMismatch { expected: 2, actual: 1 })
    ));
}

#[test]
fn test_learn_failure_propagates() {
    let trainer = trainer(1, 1, 3);
    let (mut agents, _) = counting_agents(2);
    let (mut failing, log) = CountingAgent::new(PlayerId::new(0));
    failing.fail_learn = true;
    agents[PlayerId::new(0)] = Box::new(failing);
    let mut envs = ply_envs(1, 2, 3);

    let err = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap_err();
    assert!(matches!(err, TrainingError::Agent(_)));
    assert_eq!(log.borrow().learns, 1);
}

#[test]
fn test_missing_opponent_seat() {
    let trainer = trainer(1, 2, 2);
    let (mut agents, _) = counting_agents(2);
    let mut envs = ply_envs(1, 3, 3);

    let err = trainer
        .train(&mut agents, PlayerId::new(0), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap_err();
    assert!(matches!(err, TrainingError::MissingAgent { player } if player == PlayerId::new(2)));
}

// =============================================================================
// Alternating Schedule
// =============================================================================

#[test]
fn test_train_alternating_prints_play_outs() {
    let trainer = SelfPlayTrainer::new(
        SelfPlayConfig::new()
            .with_num_envs(1)
            .with_num_steps(2)
            .with_total_timesteps(2)
            .with_meta_epochs(2),
    );
    let (mut agents, logs) = counting_agents(2);
    let mut envs = ply_envs(1, 2, 3);
    let mut out = Vec::new();

    let reports = trainer
        .train_alternating(&mut agents, &mut envs, &mut NullSink, &mut out)
        .unwrap();

    let trainees: Vec<u8> = reports.iter().map(|r| r.trainee.0).collect();
    assert_eq!(trainees, vec![0, 1, 0, 1]);
    assert_eq!(logs[0].borrow().learns, 2);
    assert_eq!(logs[1].borrow().learns, 2);
    assert_eq!(logs[0].borrow().anneals, vec![(0, 2), (1, 2)]);

    let text = String::from_utf8(out).unwrap();
    let expected = "0 one 1\n1 one 0\n0 one 1\n";
    assert_eq!(text, expected.repeat(2));
}

// =============================================================================
// Real Agents
// =============================================================================

#[test]
fn test_ppo_self_play_on_tic_tac_toe() {
    let trainer = trainer(4, 8, 64);
    let mut envs = SyncVectorEnv::from_fn(4, |i| (TicTacToe::new(), i));
    let mut agents: PlayerMap<Box<dyn Agent>> = PlayerMap::new(2, |p| {
        Box::new(TabularPpo::new(p, 9, PpoConfig::default(), p.index() as u64)) as Box<dyn Agent>
    });

    for trainee in [PlayerId::new(0), PlayerId::new(1)] {
        let report = trainer
            .train(&mut agents, trainee, &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
            .unwrap();
        assert_eq!(report.updates, 2);
        assert_eq!(report.learn_stats.unwrap().samples, 32);
        assert_eq!(agents[trainee].total_steps_done(), 64);
    }
}

#[test]
fn test_random_opponent_never_trains() {
    let trainer = trainer(2, 4, 16);
    let mut envs = SyncVectorEnv::from_fn(2, |i| (TicTacToe::new(), i));
    let mut agents: PlayerMap<Box<dyn Agent>> = PlayerMap::new(2, |p| {
        Box::new(RandomAgent::new(p, 9, 7 + p.index() as u64)) as Box<dyn Agent>
    });

    trainer
        .train(&mut agents, PlayerId::new(1), &mut envs, &mut NullSink, MetaEpoch::new(0, 1))
        .unwrap();

    assert_eq!(agents[PlayerId::new(0)].total_steps_done(), 0);
    assert_eq!(agents[PlayerId::new(1)].total_steps_done(), 16);
}
