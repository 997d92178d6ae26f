//! Tabular Q-learning on tic-tac-toe.
//!
//! Two Q-learners train against each other episode by episode, are
//! evaluated against random bots every 1000 episodes, and can then be
//! played against from the terminal. `--sweep` instead trains one pair per
//! epsilon decay and step size setting and reports each pair's final
//! evaluation.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_selfplay::agents::{Agent, HumanAgent, QLearnerConfig, RandomAgent, TabularQLearner};
use rust_selfplay::config::AppConfig;
use rust_selfplay::core::{GameRng, PlayerId, PlayerMap};
use rust_selfplay::env::{Environment, Game};
use rust_selfplay::games::tic_tac_toe::TicTacToe;
use rust_selfplay::training::{eval_against_random, play_out, run_episode};

const LOG_EVERY: usize = 100;
const EVAL_EVERY: usize = 1000;
const EVAL_EPISODES: usize = 100;
const SCHEDULER_EVERY: usize = 5000;
const SWEEP_DECAY_DURATIONS: [u64; 2] = [2_000, 30_000];
const SWEEP_STEP_SIZES: [f64; 2] = [0.1, 0.01];

/// Train two Q-learning agents against each other.
#[derive(Parser)]
#[command(name = "q_learning", about = "Tabular Q-learning on tic-tac-toe")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "selfplay.toml")]
    config: PathBuf,

    /// Number of training episodes
    #[arg(long, default_value_t = 50_000)]
    num_episodes: usize,

    /// Play against the trained agents after training (off unless given)
    #[arg(long, conflicts_with = "sweep")]
    interactive: bool,

    /// Train one pair per epsilon decay duration and step size setting
    #[arg(long)]
    sweep: bool,

    /// Seat taken by the human in interactive play
    #[arg(long, default_value_t = 1)]
    human_player: u8,

    /// Base seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let mut seeds = GameRng::new(cli.seed);

    if cli.sweep {
        for config in app_config
            .q_learning
            .grid(&SWEEP_DECAY_DURATIONS, &SWEEP_STEP_SIZES)
        {
            info!(
                epsilon_decay_duration = config.epsilon_decay_duration,
                step_size = config.step_size,
                "sweep setting"
            );
            let (mut env, mut agents) = train(&config, cli.num_episodes, &mut seeds)?;
            let mut random_agents = random_agents(&mut seeds);
            let rates = eval_against_random(&mut env, &mut agents, &mut random_agents, EVAL_EPISODES)?;
            info!(
                epsilon_decay_duration = config.epsilon_decay_duration,
                step_size = config.step_size,
                win_rates = ?rates.as_slice(),
                "sweep result"
            );
        }
        return Ok(());
    }

    let (mut env, mut agents) = train(&app_config.q_learning, cli.num_episodes, &mut seeds)?;
    if !cli.interactive {
        return Ok(());
    }

    let human = PlayerId::new(cli.human_player);
    let num_players = agents.player_count();
    let slot = agents
        .get_mut(human)
        .with_context(|| format!("no seat {} in a {}-player game", human, num_players))?;
    *slot = Box::new(HumanAgent::new(human, io::stdin().lock(), io::stdout()));

    let mut out = io::stdout();
    play_out(&mut env, &mut agents, &mut out)?;
    println!("{}", env.state());
    Ok(())
}

fn random_agents(seeds: &mut GameRng) -> PlayerMap<Box<dyn Agent>> {
    let game = TicTacToe::new();
    let num_actions = game.num_distinct_actions();
    PlayerMap::new(game.player_count(), |p| {
        Box::new(RandomAgent::new(p, num_actions, seeds.fork().seed())) as Box<dyn Agent>
    })
}

/// Train a fresh pair of Q-learners against each other.
fn train(
    config: &QLearnerConfig,
    num_episodes: usize,
    seeds: &mut GameRng,
) -> Result<(Environment<TicTacToe>, PlayerMap<Box<dyn Agent>>)> {
    let game = TicTacToe::new();
    let num_actions = game.num_distinct_actions();
    info!(num_actions, state_size = game.observation_size(), "starting q-learning");

    let mut env = Environment::new(game, seeds.fork().seed());
    let mut agents: PlayerMap<Box<dyn Agent>> = PlayerMap::new(env.game().player_count(), |p| {
        Box::new(TabularQLearner::new(p, num_actions, config.clone(), seeds.fork().seed())) as Box<dyn Agent>
    });
    let mut random_agents = random_agents(seeds);

    for episode in 0..num_episodes {
        if episode % LOG_EVERY == 0 {
            info!(episode, "training");
        }
        if episode % EVAL_EVERY == 0 {
            let rates = eval_against_random(&mut env, &mut agents, &mut random_agents, EVAL_EPISODES)?;
            info!(episode, win_rates = ?rates.as_slice(), "evaluated against random bots");
        }

        run_episode(&mut env, &mut agents, false)?;

        if (episode + 1) % SCHEDULER_EVERY == 0 {
            for (_, agent) in agents.iter_mut() {
                agent.step_scheduler();
            }
        }
    }
    Ok((env, agents))
}
