use std::path::Path;

use super::mock_approximator::MockApproximator;
use crate::agent::DqnAgent;
use crate::approximator::Approximator;
use crate::config::{AgentConfig, Config, EnvConfig, ObservationMode, TrainingConfig};
use crate::env::{Contact, Environment};
use crate::exploration::EpsilonSchedule;
use crate::logging::init_test_logging;
use crate::trainer::Trainer;

/// Q-values that always prefer staying put
fn stay_put() -> Vec<f32> {
    let mut q = vec![0.0; 9];
    q[8] = 1.0;
    q
}

fn env_config() -> EnvConfig {
    EnvConfig {
        size: 5,
        max_episode_steps: 10,
        eval_max_episode_steps: 3,
        observation_mode: ObservationMode::Relative,
        ..EnvConfig::default()
    }
}

fn mock_trainer(epsilon: EpsilonSchedule, training: TrainingConfig) -> Trainer<MockApproximator> {
    let env = Environment::with_seed(env_config(), 3).unwrap();
    let agent_config = AgentConfig {
        replay_capacity: 100,
        min_replay_size: 4,
        minibatch_size: 4,
        discount: 0.9,
        update_target_every: 1,
    };
    let agent = DqnAgent::new(MockApproximator::new(stay_put(), 4), agent_config, 9, Some(4)).unwrap();
    Trainer::new(env, agent, epsilon, training)
}

fn training_config(dir: &Path) -> TrainingConfig {
    TrainingConfig {
        episodes: 4,
        checkpoint_every: 2,
        checkpoint_dir: dir.to_path_buf(),
        model_name: "Mock".to_string(),
        checkpoint_min_reward: None,
        stats_every: 2,
        seed: None,
    }
}

#[test]
fn test_greedy_stay_runs_to_step_cap() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = mock_trainer(EpsilonSchedule::new(0.0, 1.0, 0.0), training_config(dir.path()));

    let episode = trainer.run_episode().unwrap();
    assert_eq!(episode.episode, 1);
    assert_eq!(episode.steps, 10);
    assert_eq!(episode.outcome, Contact::Nothing);
    assert_eq!(episode.reward, -10.0);
    assert_eq!(trainer.agent().replay_buffer().len(), 10);
    // the first three steps only fill the buffer
    assert_eq!(trainer.agent().train_steps(), 7);
    assert_eq!(trainer.agent().target_update_counter(), 1);
}

#[test]
fn test_run_decays_epsilon_per_episode() {
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = mock_trainer(EpsilonSchedule::new(1.0, 0.5, 0.1), training_config(dir.path()));

    let first = trainer.run_episode().unwrap();
    assert_eq!(first.epsilon, 1.0);
    assert_eq!(trainer.epsilon().value(), 0.5);

    let summary = trainer.run_episodes(3).unwrap();
    assert_eq!(summary.episodes, 4);
    assert_eq!(summary.final_epsilon, 0.1);
    assert_eq!(trainer.metrics().episode_count(), 4);
    assert_eq!(summary.total_steps, trainer.agent().replay_buffer().len());
}

#[test]
fn test_checkpoints_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = mock_trainer(EpsilonSchedule::new(0.0, 1.0, 0.0), training_config(dir.path()));
    let summary = trainer.run().unwrap();

    let expected = vec![dir.path().join("Mock-000002.bin"), dir.path().join("Mock-000004.bin")];
    assert_eq!(summary.checkpoints, expected);
    for path in &expected {
        let restored = MockApproximator::load(path).unwrap();
        assert_eq!(restored.q, stay_put());
        assert_eq!(restored.input_width, 4);
    }
}

#[test]
fn test_checkpoint_gate_skips_poor_windows() {
    let dir = tempfile::tempdir().unwrap();
    let mut training = training_config(dir.path());
    training.checkpoint_min_reward = Some(0.0);
    let mut trainer = mock_trainer(EpsilonSchedule::new(0.0, 1.0, 0.0), training);

    let summary = trainer.run().unwrap();
    assert!(summary.checkpoints.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_checkpoints_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut training = training_config(dir.path());
    training.checkpoint_every = 0;
    let mut trainer = mock_trainer(EpsilonSchedule::new(0.0, 1.0, 0.0), training);
    assert!(trainer.run().unwrap().checkpoints.is_empty());
}

#[test]
fn test_evaluate_uses_eval_cap_and_restores_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut trainer = mock_trainer(EpsilonSchedule::new(1.0, 1.0, 1.0), training_config(dir.path()));

    let results = trainer.evaluate(2).unwrap();
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.steps, 3);
        assert_eq!(result.outcome, Contact::Nothing);
        assert_eq!(result.reward, -3.0);
        assert_eq!(result.epsilon, 0.0);
    }
    assert_eq!(trainer.env().config().max_episode_steps, 10);
    // evaluation neither records nor trains
    assert!(trainer.agent().replay_buffer().is_empty());
    assert_eq!(trainer.episodes_run(), 0);
    assert_eq!(trainer.epsilon().value(), 1.0);
}

fn small_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.env = EnvConfig {
        max_episode_steps: 20,
        ..env_config()
    };
    config.agent.replay_capacity = 500;
    config.agent.min_replay_size = 16;
    config.agent.minibatch_size = 8;
    config.network.hidden_layers = vec![8];
    config.training = TrainingConfig {
        episodes: 5,
        checkpoint_every: 0,
        seed: Some(11),
        ..training_config(dir)
    };
    config
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());

    let mut first = Trainer::from_config(&config).unwrap();
    let mut second = Trainer::from_config(&config).unwrap();
    let a = first.run().unwrap();
    let b = second.run().unwrap();

    assert_eq!(a.total_steps, b.total_steps);
    assert_eq!(a.recent_rewards, b.recent_rewards);
    assert_eq!(first.agent().online().weights(), second.agent().online().weights());
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(dir.path());
    config.env.size = 0;
    assert!(Trainer::from_config(&config).is_err());
}
