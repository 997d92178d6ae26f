//! PPO self-play on tic-tac-toe.
//!
//! Both seats are tabular PPO agents. Each meta-epoch trains seat 0 then
//! seat 1 as the trainee and prints a play-out of the first environment.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_selfplay::agents::{Agent, TabularPpo};
use rust_selfplay::config::AppConfig;
use rust_selfplay::core::{GameRng, PlayerMap};
use rust_selfplay::env::{Game, SyncVectorEnv};
use rust_selfplay::games::tic_tac_toe::TicTacToe;
use rust_selfplay::training::{SelfPlayTrainer, TracingSink};

/// Train two PPO agents against each other.
#[derive(Parser)]
#[command(name = "ppo_self_play", about = "Tabular PPO self-play on tic-tac-toe")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "selfplay.toml")]
    config: PathBuf,

    /// Override total trainee decisions per training call
    #[arg(long)]
    total_timesteps: Option<usize>,

    /// Override number of parallel environments
    #[arg(long)]
    num_envs: Option<usize>,

    /// Override number of meta-epochs
    #[arg(long)]
    meta_epochs: Option<usize>,

    /// Override the PPO learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Override the base seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    if let Some(total) = cli.total_timesteps {
        app_config.self_play.total_timesteps = total;
    }
    if let Some(num_envs) = cli.num_envs {
        app_config.self_play.num_envs = num_envs;
    }
    if let Some(epochs) = cli.meta_epochs {
        app_config.self_play.meta_epochs = epochs;
    }
    if let Some(lr) = cli.lr {
        app_config.ppo.learning_rate = lr;
    }
    if let Some(seed) = cli.seed {
        app_config.self_play.seed = seed;
    }
    app_config.validate().context("invalid configuration")?;

    let game = TicTacToe::new();
    let seed = app_config.self_play.seed;
    info!(
        game = game.name(),
        num_actions = game.num_distinct_actions(),
        observation_size = game.observation_size(),
        "starting self-play"
    );

    let mut envs = SyncVectorEnv::from_fn(app_config.self_play.num_envs, |i| (TicTacToe::new(), seed + i));
    let mut seeds = GameRng::new(seed);
    let mut agents: PlayerMap<Box<dyn Agent>> = PlayerMap::new(game.player_count(), |p| {
        Box::new(TabularPpo::new(
            p,
            game.num_distinct_actions(),
            app_config.ppo.clone(),
            seeds.fork().seed(),
        )) as Box<dyn Agent>
    });

    let trainer = SelfPlayTrainer::new(app_config.self_play.clone());
    info!(
        batch_size = trainer.batch_size(),
        num_updates = trainer.num_updates(),
        meta_epochs = app_config.self_play.meta_epochs,
        "derived schedule"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let reports = trainer.train_alternating(&mut agents, &mut envs, &mut TracingSink, &mut out)?;

    for report in reports.iter().rev().take(game.player_count()) {
        info!(
            trainee = %report.trainee,
            updates = report.updates,
            mean_return = report.summary.mean,
            "final training call"
        );
    }
    Ok(())
}
