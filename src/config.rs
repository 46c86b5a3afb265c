//! # Configuration
//!
//! Every recognized option lives in one of the sections of [`Config`]. All
//! fields carry defaults, so a JSON file only has to name what it changes:
//!
//! ```json
//! { "env": { "size": 6 }, "training": { "episodes": 500, "seed": 7 } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::env::entity::ACTION_COUNT;
use crate::error::{GridError, Result};

/// What the environment hands back as the state of the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// `(size, size, 3)` colour image of the grid
    Image,
    /// agent-to-goal and agent-to-hazard offsets
    Relative,
}

/// Grid world settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub size: usize,
    pub move_penalty: f32,
    pub hazard_penalty: f32,
    pub goal_reward: f32,
    pub max_episode_steps: usize,
    /// Step cap used by greedy evaluation runs
    pub eval_max_episode_steps: usize,
    pub action_space_size: usize,
    pub observation_mode: ObservationMode,
    pub goal_moves: bool,
    pub hazard_moves: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        EnvConfig {
            size: 10,
            move_penalty: 1.0,
            hazard_penalty: 300.0,
            goal_reward: 25.0,
            max_episode_steps: 200,
            eval_max_episode_steps: 50,
            action_space_size: ACTION_COUNT,
            observation_mode: ObservationMode::Image,
            goal_moves: false,
            hazard_moves: false,
        }
    }
}

impl EnvConfig {
    /// Check the settings an [`Environment`](crate::env::Environment) cannot
    /// run with.
    ///
    /// The grid needs at least one cell, both step caps at least one step,
    /// and the action space must be a prefix of the nine entity moves.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(GridError::invalid_parameter("env.size", "must be at least 1"));
        }
        if self.max_episode_steps == 0 || self.eval_max_episode_steps == 0 {
            return Err(GridError::invalid_parameter(
                "env.max_episode_steps",
                "step caps must be at least 1",
            ));
        }
        if self.action_space_size == 0 || self.action_space_size > ACTION_COUNT {
            return Err(GridError::InvalidParameter {
                name: "env.action_space_size".to_string(),
                reason: format!("must be in 1..={}", ACTION_COUNT),
            });
        }
        Ok(())
    }
}

/// Replay and Q-learning update settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub replay_capacity: usize,
    /// Training is skipped until the buffer holds this many transitions
    pub min_replay_size: usize,
    pub minibatch_size: usize,
    pub discount: f32,
    /// Completed episodes between target network syncs
    pub update_target_every: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            replay_capacity: 50_000,
            min_replay_size: 1_000,
            minibatch_size: 64,
            discount: 0.99,
            update_target_every: 5,
        }
    }
}

/// Epsilon-greedy schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub initial: f32,
    pub decay: f32,
    pub min: f32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        ExplorationConfig {
            initial: 1.0,
            decay: 0.99975,
            min: 0.001,
        }
    }
}

/// Outer loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    /// Save the online network every this many episodes, 0 disables
    pub checkpoint_every: usize,
    pub checkpoint_dir: PathBuf,
    pub model_name: String,
    /// Only checkpoint when the worst episode of the last stats window reached this
    pub checkpoint_min_reward: Option<f32>,
    pub stats_every: usize,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            episodes: 20_000,
            checkpoint_every: 200,
            checkpoint_dir: PathBuf::from("checkpoints"),
            model_name: "AgentV1".to_string(),
            checkpoint_min_reward: None,
            stats_every: 50,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

/// Settings of the bundled fully connected Q-network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f32,
    pub optimizer: OptimizerKind,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_layers: vec![64, 64],
            learning_rate: 0.001,
            optimizer: OptimizerKind::Adam,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub env: EnvConfig,
    pub agent: AgentConfig,
    pub exploration: ExplorationConfig,
    pub training: TrainingConfig,
    pub network: NetworkConfig,
}

impl Config {
    /// Read a JSON config file and validate it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would make the run meaningless.
    ///
    /// `min_replay_size` below `minibatch_size` is deliberately accepted; the
    /// mismatch surfaces as [`GridError::InsufficientData`] when sampling.
    pub fn validate(&self) -> Result<()> {
        self.env.validate()?;

        let agent = &self.agent;
        if agent.replay_capacity == 0 {
            return Err(GridError::invalid_parameter(
                "agent.replay_capacity",
                "must be greater than 0",
            ));
        }
        if agent.minibatch_size == 0 || agent.minibatch_size > agent.replay_capacity {
            return Err(GridError::invalid_parameter(
                "agent.minibatch_size",
                "must be in 1..=replay_capacity",
            ));
        }
        if !(0.0..=1.0).contains(&agent.discount) {
            return Err(GridError::invalid_parameter("agent.discount", "must be in [0, 1]"));
        }

        let exploration = &self.exploration;
        if !(0.0..=1.0).contains(&exploration.min) || !(0.0..=1.0).contains(&exploration.initial) {
            return Err(GridError::invalid_parameter(
                "exploration",
                "initial and min must be in [0, 1]",
            ));
        }
        if exploration.min > exploration.initial {
            return Err(GridError::invalid_parameter(
                "exploration.min",
                "must not exceed exploration.initial",
            ));
        }
        if !(exploration.decay > 0.0 && exploration.decay <= 1.0) {
            return Err(GridError::invalid_parameter("exploration.decay", "must be in (0, 1]"));
        }

        if self.network.learning_rate <= 0.0 {
            return Err(GridError::invalid_parameter(
                "network.learning_rate",
                "must be positive",
            ));
        }
        if self.network.hidden_layers.iter().any(|&units| units == 0) {
            return Err(GridError::invalid_parameter(
                "network.hidden_layers",
                "layers must have at least one unit",
            ));
        }
        Ok(())
    }
}
