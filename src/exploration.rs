use serde::{Deserialize, Serialize};

use crate::config::ExplorationConfig;

/// Exploration rate with multiplicative decay and a floor.
///
/// The trainer owns one of these and hands `value()` to the agent on every
/// action selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    epsilon: f32,
    decay: f32,
    min: f32,
}

impl EpsilonSchedule {
    pub fn new(initial: f32, decay: f32, min: f32) -> Self {
        EpsilonSchedule {
            epsilon: initial.min(1.0).max(min),
            decay,
            min,
        }
    }

    pub fn from_config(config: &ExplorationConfig) -> Self {
        Self::new(config.initial, config.decay, config.min)
    }

    pub fn value(&self) -> f32 {
        self.epsilon
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    /// Apply one episode's worth of decay and return the new value.
    pub fn decay(&mut self) -> f32 {
        if self.epsilon > self.min {
            self.epsilon = (self.epsilon * self.decay).max(self.min);
        }
        self.epsilon
    }
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self::from_config(&ExplorationConfig::default())
    }
}
