//! # Training loop
//!
//! [`Trainer`] owns the environment, the agent and the exploration schedule
//! and runs them strictly in sequence: reset, then act, step, record and
//! train until the episode ends, then decay epsilon. Every
//! `checkpoint_every` episodes the online model is saved, and every
//! `stats_every` episodes reward statistics are logged.

use std::path::PathBuf;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::agent::DqnAgent;
use crate::approximator::Approximator;
use crate::config::{Config, TrainingConfig};
use crate::env::{Contact, Environment};
use crate::error::Result;
use crate::exploration::EpsilonSchedule;
use crate::metrics::{MetricsTracker, RewardStats};
use crate::network::NeuralNetwork;
use crate::replay_buffer::Transition;

/// How one episode went.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub reward: f32,
    pub steps: usize,
    /// `Contact::Nothing` means the step cap ended the episode
    pub outcome: Contact,
    /// Exploration rate used during the episode
    pub epsilon: f32,
}

/// Result of a whole training run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub total_steps: usize,
    pub final_epsilon: f32,
    pub recent_rewards: Option<RewardStats>,
    pub target_syncs: usize,
    pub checkpoints: Vec<PathBuf>,
}

/// Sequential episode driver for one environment and one agent.
///
/// Epsilon lives here and is handed to the agent on every action, so the
/// same agent can be trained and evaluated without touching its state.
pub struct Trainer<A: Approximator> {
    env: Environment,
    agent: DqnAgent<A>,
    epsilon: EpsilonSchedule,
    config: TrainingConfig,
    eval_max_episode_steps: usize,
    metrics: MetricsTracker,
    episodes_run: usize,
    checkpoints: Vec<PathBuf>,
}

impl Trainer<NeuralNetwork> {
    /// Build environment, Q-network and agent from a validated config.
    ///
    /// With `training.seed` set the whole run is reproducible.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let seed = config.training.seed;

        let env = match seed {
            Some(seed) => Environment::with_seed(config.env.clone(), seed)?,
            None => Environment::new(config.env.clone())?,
        };
        let mut init_rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(2)),
            None => StdRng::from_entropy(),
        };
        let network = NeuralNetwork::from_config(
            &config.network,
            env.observation_len(),
            env.action_space_size(),
            &mut init_rng,
        )?;
        let agent = DqnAgent::new(
            network,
            config.agent.clone(),
            env.action_space_size(),
            seed.map(|s| s.wrapping_add(1)),
        )?;
        Ok(Trainer::new(
            env,
            agent,
            EpsilonSchedule::from_config(&config.exploration),
            config.training.clone(),
        ))
    }
}

impl<A: Approximator> Trainer<A> {
    /// Assemble a trainer from parts built elsewhere.
    ///
    /// The evaluation step cap is taken from the environment config, and the
    /// metrics history spans one `stats_every` window.
    pub fn new(env: Environment, agent: DqnAgent<A>, epsilon: EpsilonSchedule, config: TrainingConfig) -> Self {
        let history_size = config.stats_every.max(1);
        let eval_max_episode_steps = env.config().eval_max_episode_steps;
        Trainer {
            env,
            agent,
            epsilon,
            config,
            eval_max_episode_steps,
            metrics: MetricsTracker::new(history_size),
            episodes_run: 0,
            checkpoints: Vec::new(),
        }
    }

    /// Run `training.episodes` episodes.
    pub fn run(&mut self) -> Result<TrainingSummary> {
        self.run_episodes(self.config.episodes)
    }

    /// Run `episodes` more episodes and summarize the whole run so far.
    ///
    /// Stops at the first error; episodes already finished stay counted.
    pub fn run_episodes(&mut self, episodes: usize) -> Result<TrainingSummary> {
        for _ in 0..episodes {
            self.run_episode()?;
        }
        Ok(self.summary())
    }

    /// Play and learn from one full episode, then decay epsilon.
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        let epsilon = self.epsilon.value();
        let mut state = self.env.reset();

        loop {
            let action = self.agent.select_action(&state, epsilon)?;
            let step = self.env.step(action)?;
            self.metrics.record_step(step.reward);

            self.agent.record_transition(Transition {
                state,
                action,
                reward: step.reward,
                next_state: step.observation.clone(),
                done: step.done,
            });
            if let Some(loss) = self.agent.train_step(step.done)? {
                self.metrics.record_loss(loss);
            }

            state = step.observation;
            if step.done {
                break;
            }
        }

        self.episodes_run += 1;
        let summary = EpisodeSummary {
            episode: self.episodes_run,
            reward: self.metrics.end_episode(epsilon),
            steps: self.env.episode_step(),
            outcome: self.env.contact(),
            epsilon,
        };
        self.epsilon.decay();

        if self.config.stats_every > 0 && self.episodes_run % self.config.stats_every == 0 {
            self.log_stats();
        }
        if self.config.checkpoint_every > 0 && self.episodes_run % self.config.checkpoint_every == 0 {
            self.checkpoint()?;
        }
        Ok(summary)
    }

    fn log_stats(&self) {
        if let Some(stats) = self.metrics.reward_stats(self.config.stats_every) {
            info!(
                "episode {}: avg reward {:.2}, min {:.2}, max {:.2}, epsilon {:.4}, buffer {}, loss {}",
                self.episodes_run,
                stats.average,
                stats.min,
                stats.max,
                self.epsilon.value(),
                self.agent.replay_buffer().len(),
                self.metrics
                    .mean_loss()
                    .map(|l| format!("{:.4}", l))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
    }

    /// Save the online model unless the reward gate says otherwise.
    fn checkpoint(&mut self) -> Result<Option<PathBuf>> {
        if let Some(gate) = self.config.checkpoint_min_reward {
            let worst = self
                .metrics
                .reward_stats(self.config.stats_every.max(1))
                .map(|stats| stats.min)
                .unwrap_or(f32::NEG_INFINITY);
            if worst < gate {
                debug!(
                    "skipping checkpoint at episode {}: worst recent reward {:.2} below {:.2}",
                    self.episodes_run, worst, gate
                );
                return Ok(None);
            }
        }
        let path = self.config.checkpoint_dir.join(format!(
            "{}-{:06}.bin",
            self.config.model_name, self.episodes_run
        ));
        self.agent.save_online(&path)?;
        info!("saved checkpoint {}", path.display());
        self.checkpoints.push(path.clone());
        Ok(Some(path))
    }

    /// Play greedily (epsilon 0) without recording or training.
    ///
    /// Episodes are capped at `eval_max_episode_steps`.
    pub fn evaluate(&mut self, episodes: usize) -> Result<Vec<EpisodeSummary>> {
        let training_cap = self.env.config().max_episode_steps;
        self.env.set_max_episode_steps(self.eval_max_episode_steps);
        let result = self.play_greedy(episodes);
        self.env.set_max_episode_steps(training_cap);
        result
    }

    fn play_greedy(&mut self, episodes: usize) -> Result<Vec<EpisodeSummary>> {
        let mut summaries = Vec::with_capacity(episodes);
        for episode in 1..=episodes {
            let mut state = self.env.reset();
            let mut reward = 0.0;
            loop {
                let action = self.agent.select_action(&state, 0.0)?;
                let step = self.env.step(action)?;
                reward += step.reward;
                state = step.observation;
                if step.done {
                    break;
                }
            }
            summaries.push(EpisodeSummary {
                episode,
                reward,
                steps: self.env.episode_step(),
                outcome: self.env.contact(),
                epsilon: 0.0,
            });
        }
        Ok(summaries)
    }

    /// Snapshot of the run so far.
    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            episodes: self.episodes_run,
            total_steps: self.metrics.total_steps(),
            final_epsilon: self.epsilon.value(),
            recent_rewards: self.metrics.reward_stats(self.config.stats_every.max(1)),
            target_syncs: self.agent.target_syncs(),
            checkpoints: self.checkpoints.clone(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Mutable access to the environment, e.g. to script a reset before evaluation.
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// The agent being trained, with its models and replay buffer.
    pub fn agent(&self) -> &DqnAgent<A> {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut DqnAgent<A> {
        &mut self.agent
    }

    /// Exploration rate the next episode will use.
    pub fn epsilon(&self) -> &EpsilonSchedule {
        &self.epsilon
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    /// Training episodes completed; evaluation episodes are not counted.
    pub fn episodes_run(&self) -> usize {
        self.episodes_run
    }
}
