use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Reward summary over a window of episodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardStats {
    pub episodes: usize,
    pub average: f32,
    pub min: f32,
    pub max: f32,
}

/// Stores training metrics over time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Rewards per episode
    pub episode_rewards: VecDeque<f32>,

    /// Episode lengths
    pub episode_lengths: VecDeque<usize>,

    /// Loss values over time
    pub losses: VecDeque<f32>,

    /// Epsilon at the end of each episode
    pub epsilons: VecDeque<f32>,
}

/// Tracks metrics during training, keeping at most `history_size` entries per series.
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,

    current_episode_reward: f32,
    current_episode_length: usize,
    episode_count: usize,
    total_steps: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size: history_size.max(1),
            current_episode_reward: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            total_steps: 0,
        }
    }

    fn push_bounded<T>(series: &mut VecDeque<T>, value: T, history_size: usize) {
        if series.len() >= history_size {
            series.pop_front();
        }
        series.push_back(value);
    }

    /// Record one environment step of the running episode
    pub fn record_step(&mut self, reward: f32) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    pub fn record_loss(&mut self, loss: f32) {
        Self::push_bounded(&mut self.metrics.losses, loss, self.history_size);
    }

    /// Close the running episode and return its total reward
    pub fn end_episode(&mut self, epsilon: f32) -> f32 {
        let reward = self.current_episode_reward;
        Self::push_bounded(&mut self.metrics.episode_rewards, reward, self.history_size);
        Self::push_bounded(&mut self.metrics.episode_lengths, self.current_episode_length, self.history_size);
        Self::push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
        self.episode_count += 1;
        reward
    }

    /// Reward statistics over the last `window` finished episodes
    pub fn reward_stats(&self, window: usize) -> Option<RewardStats> {
        let rewards = &self.metrics.episode_rewards;
        let take = window.min(rewards.len());
        if take == 0 {
            return None;
        }
        let recent = rewards.iter().skip(rewards.len() - take);
        let (sum, min, max) = recent.fold((0.0f32, f32::INFINITY, f32::NEG_INFINITY), |(s, lo, hi), &r| {
            (s + r, lo.min(r), hi.max(r))
        });
        Some(RewardStats {
            episodes: take,
            average: sum / take as f32,
            min,
            max,
        })
    }

    /// Mean loss over the stored history
    pub fn mean_loss(&self) -> Option<f32> {
        let losses = &self.metrics.losses;
        if losses.is_empty() {
            None
        } else {
            Some(losses.iter().sum::<f32>() / losses.len() as f32)
        }
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}
