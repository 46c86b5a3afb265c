//! # gridworld-dqn
//!
//! Command line entry point: train a Q-network on the hazard grid, or load a
//! checkpoint and watch how it plays greedily.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use gridworld_dqn::agent::DqnAgent;
use gridworld_dqn::approximator::Approximator;
use gridworld_dqn::config::Config;
use gridworld_dqn::env::{Contact, Environment};
use gridworld_dqn::exploration::EpsilonSchedule;
use gridworld_dqn::logging::init_logging;
use gridworld_dqn::network::NeuralNetwork;
use gridworld_dqn::trainer::Trainer;
use gridworld_dqn::Result;

#[derive(Parser)]
#[command(name = "gridworld-dqn", about = "Deep Q-learning on a grid with a goal and a hazard")]
struct Cli {
    /// JSON config file; missing fields fall back to defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a new Q-network
    Train {
        #[arg(long)]
        episodes: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,
    },
    /// Play greedily with a saved Q-network
    Evaluate {
        #[arg(long)]
        model: PathBuf,
        #[arg(long, default_value_t = 10)]
        episodes: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Train {
            episodes,
            seed,
            checkpoint_dir,
        } => {
            if let Some(episodes) = episodes {
                config.training.episodes = episodes;
            }
            if seed.is_some() {
                config.training.seed = seed;
            }
            if let Some(dir) = checkpoint_dir {
                config.training.checkpoint_dir = dir;
            }
            train(&config)
        }
        Command::Evaluate { model, episodes, seed } => {
            if seed.is_some() {
                config.training.seed = seed;
            }
            evaluate(&config, &model, episodes)
        }
    }
}

fn train(config: &Config) -> Result<()> {
    info!(
        "training for {} episodes on a {}x{} grid",
        config.training.episodes, config.env.size, config.env.size
    );
    let mut trainer = Trainer::from_config(config)?;
    let summary = trainer.run()?;

    let final_path = config
        .training
        .checkpoint_dir
        .join(format!("{}-final.bin", config.training.model_name));
    trainer.agent().save_online(&final_path)?;

    info!(
        "finished {} episodes ({} steps), epsilon {:.4}, {} target syncs, {} checkpoints, final model {}",
        summary.episodes,
        summary.total_steps,
        summary.final_epsilon,
        summary.target_syncs,
        summary.checkpoints.len(),
        final_path.display()
    );
    if let Some(stats) = summary.recent_rewards {
        info!(
            "last {} episodes: avg {:.2}, min {:.2}, max {:.2}",
            stats.episodes, stats.average, stats.min, stats.max
        );
    }
    Ok(())
}

fn evaluate(config: &Config, model: &Path, episodes: usize) -> Result<()> {
    config.validate()?;
    let network = NeuralNetwork::load(model)?;
    let env = match config.training.seed {
        Some(seed) => Environment::with_seed(config.env.clone(), seed)?,
        None => Environment::new(config.env.clone())?,
    };
    let agent = DqnAgent::new(
        network,
        config.agent.clone(),
        env.action_space_size(),
        config.training.seed,
    )?;
    let mut trainer = Trainer::new(env, agent, EpsilonSchedule::new(0.0, 1.0, 0.0), config.training.clone());

    let results = trainer.evaluate(episodes)?;
    for result in &results {
        info!(
            "episode {}: reward {:.0} in {} steps ({})",
            result.episode,
            result.reward,
            result.steps,
            match result.outcome {
                Contact::Goal => "goal",
                Contact::Hazard => "hazard",
                Contact::Nothing => "step limit",
            }
        );
    }
    let reached = results.iter().filter(|r| r.outcome == Contact::Goal).count();
    info!("reached the goal in {}/{} episodes", reached, results.len());
    Ok(())
}
