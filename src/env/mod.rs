//! # Grid World Environment
//!
//! A square grid holding three entities: the agent, a goal and a hazard.
//! Every episode starts with the three on distinct random cells; the agent
//! then moves one cell per step (or stays) in one of nine directions.
//!
//! ## Rewards
//!
//! - stepping onto the hazard: `-hazard_penalty`, episode ends
//! - stepping onto the goal: `+goal_reward`, episode ends
//! - anything else: `-move_penalty`
//!
//! The episode is also cut off after `max_episode_steps` steps.
//!
//! ```rust
//! use gridworld_dqn::config::EnvConfig;
//! use gridworld_dqn::env::Environment;
//!
//! let mut env = Environment::with_seed(EnvConfig::default(), 42).unwrap();
//! let _observation = env.reset();
//! let outcome = env.step(8).unwrap();
//! assert!(outcome.reward <= 25.0);
//! ```

pub mod entity;
pub mod grid;
pub mod observation;

pub use entity::{GridEntity, ACTION_COUNT, ACTION_DELTAS};
pub use grid::{Contact, Environment, StepResult};
pub use observation::{stack_features, Observation};
