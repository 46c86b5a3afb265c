//! # Deep Q-Network agent
//!
//! [`DqnAgent`] keeps two copies of an [`Approximator`]: the online model,
//! fitted on every training step, and the target model, which supplies the
//! bootstrapped values and is only refreshed from the online weights every
//! few completed episodes.
//!
//! ```rust
//! use gridworld_dqn::agent::DqnAgent;
//! use gridworld_dqn::config::{AgentConfig, NetworkConfig};
//! use gridworld_dqn::network::NeuralNetwork;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let network = NeuralNetwork::from_config(&NetworkConfig::default(), 4, 9, &mut rng).unwrap();
//! let agent = DqnAgent::new(network, AgentConfig::default(), 9, Some(0)).unwrap();
//! assert_eq!(agent.replay_buffer().len(), 0);
//! ```

use std::path::Path;

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::approximator::Approximator;
use crate::config::AgentConfig;
use crate::env::{stack_features, Observation};
use crate::error::{GridError, Result};
use crate::replay_buffer::{ReplayBuffer, Transition};

/// Epsilon-greedy DQN agent over any [`Approximator`].
///
/// The agent owns its replay buffer and random number generator. The
/// exploration rate is not stored here; callers pass it to
/// [`DqnAgent::select_action`] on every call.
pub struct DqnAgent<A: Approximator> {
    online: A,
    target: A,
    replay_buffer: ReplayBuffer<Transition>,
    config: AgentConfig,
    action_space_size: usize,
    /// Completed episodes since the last target sync
    target_update_counter: usize,
    train_steps: usize,
    target_syncs: usize,
    rng: StdRng,
}

impl<A: Approximator + Clone> DqnAgent<A> {
    /// Create an agent whose target model starts as a copy of `online`.
    ///
    /// `seed` fixes exploration and minibatch sampling; `None` seeds from
    /// system entropy.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidParameter`] for an empty action space, a
    /// zero replay capacity or a zero minibatch size.
    pub fn new(online: A, config: AgentConfig, action_space_size: usize, seed: Option<u64>) -> Result<Self> {
        let target = online.clone();
        Self::with_target(online, target, config, action_space_size, seed)
    }
}

impl<A: Approximator> DqnAgent<A> {
    /// Create an agent from two separately built models. The target model
    /// takes over the online weights immediately.
    ///
    /// Fails like [`DqnAgent::new`], or with the target model's own error if
    /// it cannot accept the online weights.
    pub fn with_target(
        online: A,
        mut target: A,
        config: AgentConfig,
        action_space_size: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if action_space_size == 0 {
            return Err(GridError::invalid_parameter(
                "action_space_size",
                "must be at least 1",
            ));
        }
        if config.replay_capacity == 0 {
            return Err(GridError::invalid_parameter(
                "replay_capacity",
                "must be greater than 0",
            ));
        }
        if config.minibatch_size == 0 {
            return Err(GridError::invalid_parameter(
                "minibatch_size",
                "must be greater than 0",
            ));
        }
        target.set_weights(online.weights())?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(DqnAgent {
            online,
            target,
            replay_buffer: ReplayBuffer::new(config.replay_capacity),
            config,
            action_space_size,
            target_update_counter: 0,
            train_steps: 0,
            target_syncs: 0,
            rng,
        })
    }

    /// Epsilon-greedy choice: random with probability `epsilon`, otherwise
    /// the action with the highest online Q-value.
    pub fn select_action(&mut self, state: &Observation, epsilon: f32) -> Result<usize> {
        if self.rng.gen::<f32>() < epsilon {
            Ok(self.rng.gen_range(0..self.action_space_size))
        } else {
            let q_values = self.q_values(state)?;
            Ok(greedy_action(q_values.view()))
        }
    }

    /// Online Q-values for a single observation.
    ///
    /// Fails with [`GridError::DimensionMismatch`] if the model does not
    /// return exactly one value per action.
    pub fn q_values(&mut self, state: &Observation) -> Result<Array1<f32>> {
        let input = state.features().insert_axis(Axis(0));
        let output = self.online.predict(input.view())?;
        self.check_output(output.view(), 1)?;
        Ok(output.row(0).to_owned())
    }

    /// Store one step of experience, evicting the oldest when the buffer is full.
    pub fn record_transition(&mut self, transition: Transition) {
        self.replay_buffer.push(transition);
    }

    /// One minibatch update of the online model.
    ///
    /// Does nothing and returns `Ok(None)` until the buffer holds
    /// `min_replay_size` transitions. `episode_ended` counts towards the next
    /// target sync.
    ///
    /// Approximator errors are returned unchanged. A minibatch larger than
    /// the buffer surfaces as [`GridError::InsufficientData`].
    pub fn train_step(&mut self, episode_ended: bool) -> Result<Option<f32>> {
        if self.replay_buffer.len() < self.config.min_replay_size {
            return Ok(None);
        }

        let batch = self.replay_buffer.sample(self.config.minibatch_size, &mut self.rng)?;
        let states = stack_features(batch.iter().map(|t| &t.state))?;
        let next_states = stack_features(batch.iter().map(|t| &t.next_state))?;

        let current_q = self.online.predict(states.view())?;
        self.check_output(current_q.view(), batch.len())?;
        let future_q = self.target.predict(next_states.view())?;
        self.check_output(future_q.view(), batch.len())?;

        let targets = bellman_targets(current_q, future_q.view(), &batch, self.config.discount)?;
        let loss = self.online.fit(states.view(), targets.view())?;
        self.train_steps += 1;

        if episode_ended {
            self.target_update_counter += 1;
        }
        if self.target_update_counter > self.config.update_target_every {
            self.sync_target()?;
        }
        Ok(Some(loss))
    }

    /// Copy the online weights into the target model and restart the count.
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.set_weights(self.online.weights())?;
        self.target_update_counter = 0;
        self.target_syncs += 1;
        debug!(
            "target network synced (sync #{}, after {} training steps)",
            self.target_syncs, self.train_steps
        );
        Ok(())
    }

    fn check_output(&self, output: ArrayView2<f32>, rows: usize) -> Result<()> {
        if output.dim() != (rows, self.action_space_size) {
            return Err(GridError::dimension_mismatch(
                format!("({}, {})", rows, self.action_space_size),
                format!("{:?}", output.dim()),
            ));
        }
        Ok(())
    }

    /// Persist the online model through [`Approximator::save`].
    pub fn save_online(&self, path: &Path) -> Result<()> {
        self.online.save(path)
    }

    /// The model being fitted on every training step.
    pub fn online(&self) -> &A {
        &self.online
    }

    /// Mutable access to the online model, e.g. to adjust it between episodes.
    pub fn online_mut(&mut self) -> &mut A {
        &mut self.online
    }

    /// The model supplying bootstrapped values.
    pub fn target(&self) -> &A {
        &self.target
    }

    /// Consume the agent and keep only the trained online model.
    pub fn into_online(self) -> A {
        self.online
    }

    /// Experience recorded so far.
    pub fn replay_buffer(&self) -> &ReplayBuffer<Transition> {
        &self.replay_buffer
    }

    /// Replay and update settings the agent was built with.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Number of actions `select_action` chooses from.
    pub fn action_space_size(&self) -> usize {
        self.action_space_size
    }

    /// Episode ends counted since the last target sync.
    pub fn target_update_counter(&self) -> usize {
        self.target_update_counter
    }

    /// Minibatch updates performed, skipped calls excluded.
    pub fn train_steps(&self) -> usize {
        self.train_steps
    }

    /// Number of times the target model was refreshed.
    pub fn target_syncs(&self) -> usize {
        self.target_syncs
    }
}

/// Index of the largest value; the lowest index wins ties and NaNs are skipped.
pub fn greedy_action(q_values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &value) in q_values.iter().enumerate() {
        if value > best_value {
            best = i;
            best_value = value;
        }
    }
    best
}

/// Overwrite the taken action's value in each row of `current_q` with its
/// bootstrapped target.
///
/// Terminal transitions use the reward alone; others add `gamma` times the
/// best target-model value of the next state. All other entries pass through
/// unchanged.
pub fn bellman_targets(
    mut current_q: Array2<f32>,
    future_q: ArrayView2<f32>,
    batch: &[&Transition],
    gamma: f32,
) -> Result<Array2<f32>> {
    if current_q.nrows() != batch.len() || future_q.nrows() != batch.len() {
        return Err(GridError::dimension_mismatch(
            format!("{} rows", batch.len()),
            format!("{} and {} rows", current_q.nrows(), future_q.nrows()),
        ));
    }
    let actions = current_q.ncols();
    for (i, transition) in batch.iter().enumerate() {
        if transition.action >= actions {
            return Err(GridError::InvalidAction {
                action: transition.action,
                max_actions: actions,
            });
        }
        let target = if transition.done {
            transition.reward
        } else {
            let max_future_q = future_q
                .row(i)
                .iter()
                .fold(f32::NEG_INFINITY, |max, &v| max.max(v));
            transition.reward + gamma * max_future_q
        };
        current_q[[i, transition.action]] = target;
    }
    Ok(current_q)
}
