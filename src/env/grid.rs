use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{EnvConfig, ObservationMode};
use crate::env::entity::GridEntity;
use crate::env::observation::{render_grid, Observation};
use crate::error::{GridError, Result};

/// Outcome of a single [`Environment::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    /// World state after the move
    pub observation: Observation,
    /// `-hazard_penalty`, `goal_reward` or `-move_penalty`
    pub reward: f32,
    /// Hazard or goal reached, or the step cap hit
    pub done: bool,
}

/// What the agent ran into on its last move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    /// Agent shares a cell with the hazard
    Hazard,
    /// Agent shares a cell with the goal
    Goal,
    /// Agent is on an empty cell
    Nothing,
}

#[derive(Clone, Debug)]
struct Entities {
    agent: GridEntity,
    goal: GridEntity,
    hazard: GridEntity,
}

/// Square grid with an agent, a goal and a hazard.
///
/// `reset` must be called before the first `step`. Stepping after an episode
/// reported `done` is allowed but meaningless until the next reset.
pub struct Environment {
    config: EnvConfig,
    entities: Entities,
    episode_step: usize,
    rng: StdRng,
}

impl Environment {
    /// Create an environment seeded from system entropy.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidParameter`] if `config` fails
    /// [`EnvConfig::validate`].
    pub fn new(config: EnvConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an environment whose placements and drift moves are fully
    /// determined by `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidParameter`] if `config` fails
    /// [`EnvConfig::validate`].
    pub fn with_seed(config: EnvConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EnvConfig, mut rng: StdRng) -> Result<Self> {
        config.validate()?;
        let entities = Self::place_random(config.size, &mut rng);
        Ok(Environment {
            config,
            entities,
            episode_step: 0,
            rng,
        })
    }

    /// Draw agent, goal and hazard on three distinct cells.
    fn place_random(size: usize, rng: &mut StdRng) -> Entities {
        let agent = GridEntity::random(size, rng);
        let mut goal = GridEntity::random(size, rng);
        // A grid with fewer than three cells cannot hold three distinct entities.
        if size * size >= 3 {
            while goal == agent {
                goal = GridEntity::random(size, rng);
            }
        }
        let mut hazard = GridEntity::random(size, rng);
        if size * size >= 3 {
            while hazard == agent || hazard == goal {
                hazard = GridEntity::random(size, rng);
            }
        }
        Entities { agent, goal, hazard }
    }

    /// Start a new episode at random distinct positions.
    pub fn reset(&mut self) -> Observation {
        self.entities = Self::place_random(self.config.size, &mut self.rng);
        self.episode_step = 0;
        self.observe()
    }

    /// Start a new episode with every entity at an explicit cell.
    ///
    /// Positions are `(x, y)` pairs. Fails with
    /// [`GridError::InvalidPlacement`] if a cell lies off the grid or two
    /// entities share a cell; the current episode is left as it was.
    pub fn reset_to(
        &mut self,
        agent: (usize, usize),
        goal: (usize, usize),
        hazard: (usize, usize),
    ) -> Result<Observation> {
        let size = self.config.size;
        let agent = GridEntity::at(agent.0, agent.1, size)?;
        let goal = GridEntity::at(goal.0, goal.1, size)?;
        let hazard = GridEntity::at(hazard.0, hazard.1, size)?;
        if agent == goal || agent == hazard || goal == hazard {
            return Err(GridError::InvalidPlacement(
                "agent, goal and hazard must occupy distinct cells".to_string(),
            ));
        }
        self.entities = Entities { agent, goal, hazard };
        self.episode_step = 0;
        Ok(self.observe())
    }

    /// Move the agent and score the result.
    ///
    /// The step counter advances only for valid actions; an action outside
    /// the action space fails with [`GridError::InvalidAction`] and leaves
    /// the state untouched. `done` is decided by what the agent touched, not
    /// by comparing the reward with the configured penalties.
    pub fn step(&mut self, action: usize) -> Result<StepResult> {
        if action >= self.config.action_space_size {
            return Err(GridError::InvalidAction {
                action,
                max_actions: self.config.action_space_size,
            });
        }

        self.entities.agent.apply_action(action)?;
        self.episode_step += 1;
        if self.config.hazard_moves {
            self.entities.hazard.move_by(None, None, &mut self.rng);
        }
        if self.config.goal_moves {
            self.entities.goal.move_by(None, None, &mut self.rng);
        }

        let observation = self.observe();
        let contact = self.contact();
        let reward = match contact {
            Contact::Hazard => -self.config.hazard_penalty,
            Contact::Goal => self.config.goal_reward,
            Contact::Nothing => -self.config.move_penalty,
        };
        let done = contact != Contact::Nothing || self.episode_step >= self.config.max_episode_steps;

        Ok(StepResult {
            observation,
            reward,
            done,
        })
    }

    /// Hazard is checked before goal.
    pub fn contact(&self) -> Contact {
        let Entities { agent, goal, hazard } = &self.entities;
        if agent == hazard {
            Contact::Hazard
        } else if agent == goal {
            Contact::Goal
        } else {
            Contact::Nothing
        }
    }

    /// Current observation in the configured [`ObservationMode`].
    pub fn observe(&self) -> Observation {
        let Entities { agent, goal, hazard } = &self.entities;
        match self.config.observation_mode {
            ObservationMode::Image => Observation::Image(self.render()),
            ObservationMode::Relative => {
                let (gx, gy) = *agent - *goal;
                let (hx, hy) = *agent - *hazard;
                Observation::Relative([gx, gy, hx, hy])
            }
        }
    }

    /// Raw colour image of the grid, regardless of observation mode.
    pub fn render(&self) -> Array3<u8> {
        let Entities { agent, goal, hazard } = &self.entities;
        render_grid(self.config.size, agent, goal, hazard)
    }

    /// Length of the feature vector an observation of this environment flattens to.
    pub fn observation_len(&self) -> usize {
        match self.config.observation_mode {
            ObservationMode::Image => self.config.size * self.config.size * 3,
            ObservationMode::Relative => 4,
        }
    }

    /// The entity moved by [`Environment::step`].
    pub fn agent(&self) -> &GridEntity {
        &self.entities.agent
    }

    /// Cell the agent is rewarded for reaching.
    pub fn goal(&self) -> &GridEntity {
        &self.entities.goal
    }

    /// Cell the agent is penalized for entering.
    pub fn hazard(&self) -> &GridEntity {
        &self.entities.hazard
    }

    /// Steps taken since the last reset.
    pub fn episode_step(&self) -> usize {
        self.episode_step
    }

    /// Settings in effect, including any step cap set for evaluation.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Number of actions `step` accepts, at most [`ACTION_COUNT`](crate::env::ACTION_COUNT).
    pub fn action_space_size(&self) -> usize {
        self.config.action_space_size
    }

    /// Change the step cap, e.g. for greedy evaluation runs.
    ///
    /// A cap of zero is raised to one step.
    pub fn set_max_episode_steps(&mut self, steps: usize) {
        self.config.max_episode_steps = steps.max(1);
    }
}
