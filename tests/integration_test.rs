use gridworld_dqn::approximator::Approximator;
use gridworld_dqn::config::{Config, EnvConfig, ObservationMode, OptimizerKind};
use gridworld_dqn::env::{Contact, Environment, Observation};
use gridworld_dqn::network::NeuralNetwork;
use gridworld_dqn::trainer::Trainer;

fn four_by_four() -> EnvConfig {
    EnvConfig {
        size: 4,
        ..EnvConfig::default()
    }
}

#[test]
fn test_diagonal_walk_reaches_goal() {
    let mut env = Environment::with_seed(four_by_four(), 1).unwrap();
    env.reset_to((0, 0), (3, 3), (0, 3)).unwrap();

    let first = env.step(0).unwrap();
    assert_eq!((first.reward, first.done), (-1.0, false));
    let second = env.step(0).unwrap();
    assert_eq!((second.reward, second.done), (-1.0, false));
    let last = env.step(0).unwrap();
    assert_eq!((last.reward, last.done), (25.0, true));

    assert_eq!(env.agent().position(), (3, 3));
    assert_eq!(env.contact(), Contact::Goal);
    assert_eq!(env.episode_step(), 3);
}

#[test]
fn test_walking_into_hazard() {
    let mut env = Environment::with_seed(four_by_four(), 1).unwrap();
    env.reset_to((0, 0), (3, 3), (1, 1)).unwrap();
    let result = env.step(0).unwrap();
    assert_eq!(result.reward, -300.0);
    assert!(result.done);
    assert_eq!(env.contact(), Contact::Hazard);
}

#[test]
fn test_step_cap_ends_episode() {
    let config = EnvConfig {
        max_episode_steps: 5,
        ..four_by_four()
    };
    let mut env = Environment::with_seed(config, 1).unwrap();
    env.reset_to((1, 1), (3, 3), (0, 3)).unwrap();

    for _ in 0..4 {
        let result = env.step(8).unwrap();
        assert!(!result.done);
    }
    let last = env.step(8).unwrap();
    assert!(last.done);
    assert_eq!(last.reward, -1.0);
    assert_eq!(env.contact(), Contact::Nothing);
}

#[test]
fn test_corner_stays_clamped() {
    let mut env = Environment::with_seed(four_by_four(), 1).unwrap();
    env.reset_to((0, 0), (3, 3), (3, 0)).unwrap();
    let result = env.step(1).unwrap();
    assert_eq!(env.agent().position(), (0, 0));
    assert_eq!(result.reward, -1.0);
}

fn quick_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.env = EnvConfig {
        size: 5,
        max_episode_steps: 30,
        observation_mode: ObservationMode::Image,
        ..EnvConfig::default()
    };
    config.agent.replay_capacity = 1_000;
    config.agent.min_replay_size = 32;
    config.agent.minibatch_size = 16;
    config.agent.update_target_every = 2;
    config.exploration.decay = 0.9;
    config.network.hidden_layers = vec![16];
    config.network.optimizer = OptimizerKind::Adam;
    config.training.episodes = 6;
    config.training.checkpoint_every = 3;
    config.training.checkpoint_dir = dir.to_path_buf();
    config.training.model_name = "Quick".to_string();
    config.training.stats_every = 3;
    config.training.seed = Some(2024);
    config
}

#[test]
fn test_short_training_run_saves_loadable_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let config = quick_config(dir.path());
    let mut trainer = Trainer::from_config(&config).unwrap();
    let summary = trainer.run().unwrap();

    assert_eq!(summary.episodes, 6);
    assert!(summary.total_steps >= 6);
    assert!(summary.final_epsilon < 1.0);
    assert_eq!(
        summary.checkpoints,
        vec![dir.path().join("Quick-000003.bin"), dir.path().join("Quick-000006.bin")]
    );

    let mut restored = NeuralNetwork::load(&summary.checkpoints[1]).unwrap();
    assert_eq!(restored.weights(), trainer.agent().online().weights());

    let mut env = Environment::with_seed(config.env.clone(), 5).unwrap();
    let observation = env.reset();
    let input = match &observation {
        Observation::Image(_) => observation.features().insert_axis(ndarray::Axis(0)),
        other => panic!("expected an image observation, got {:?}", other),
    };
    let q = restored.predict(input.view()).unwrap();
    assert_eq!(q.dim(), (1, 9));
    assert!(q.iter().all(|v| v.is_finite()));
}

#[test]
fn test_evaluation_after_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = quick_config(dir.path());
    config.training.checkpoint_every = 0;
    config.env.eval_max_episode_steps = 7;
    let mut trainer = Trainer::from_config(&config).unwrap();
    trainer.run_episodes(2).unwrap();

    let results = trainer.evaluate(3).unwrap();
    assert_eq!(results.len(), 3);
    for result in &results {
        assert!(result.steps >= 1 && result.steps <= 7);
        if result.outcome == Contact::Nothing {
            assert_eq!(result.steps, 7);
        }
    }
    assert_eq!(trainer.env().config().max_episode_steps, 30);
}
