//! # gridworld-dqn - Deep Q-learning on a hazard grid
//!
//! An agent learns to walk to a goal cell on a square grid while staying
//! clear of a hazard cell. Learning uses deep Q-networks: experience replay,
//! epsilon-greedy exploration and a periodically synchronized target network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridworld_dqn::config::Config;
//! use gridworld_dqn::trainer::Trainer;
//!
//! let mut config = Config::default();
//! config.training.episodes = 100;
//! config.training.seed = Some(7);
//!
//! let mut trainer = Trainer::from_config(&config).unwrap();
//! let summary = trainer.run().unwrap();
//! println!("final epsilon {}", summary.final_epsilon);
//! ```
//!
//! ## Module Organization
//!
//! - [`env`] - grid entities, the environment state machine and observations
//! - [`replay_buffer`] - ring buffer of transitions
//! - [`approximator`] - the contract a Q-value model must satisfy
//! - [`network`] / [`optimizer`] - the bundled fully connected Q-network
//! - [`agent`] - epsilon-greedy DQN agent with a target network
//! - [`exploration`] - epsilon decay schedule
//! - [`trainer`] - the episode loop, checkpoints and evaluation
//! - [`metrics`] - rolling episode statistics
//! - [`config`] - JSON-backed configuration
//! - [`error`] - error type and result alias
//! - [`logging`] - `env_logger` setup

pub mod agent;
pub mod approximator;
pub mod config;
pub mod env;
pub mod error;
pub mod exploration;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;
pub mod trainer;

pub use error::{GridError, Result};

#[cfg(test)]
mod tests;
