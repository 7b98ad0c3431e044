use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

use crate::{
    config::EnvConfig,
    error::EnvError,
    map::Grid,
    render::{self, Sprite},
    reward,
    state::{OBSERVATION_LEN, Observation, State},
    transition::{self, ACTION_COUNT, Action},
};

/// Counters describing where a step happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Episode the step belonged to.
    pub episode: u64,
    /// Step number within that episode, starting at 1.
    pub step: u64,
}

/// Result of a reset or an environment step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    /// True when the episode ended on this step. The environment has already
    /// been reset by the time the caller sees it.
    pub done: bool,
    pub info: StepInfo,
}

/// Describes the shape of an action or observation space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Space {
    /// `n` discrete choices, `0..n`.
    Discrete(usize),
    /// Fixed-length integer vector, each entry in `0..=high[i]`.
    MultiDiscrete { high: Vec<i64> },
}

/// Manages a single put-ball-in-box episode at a time.
#[derive(Debug, Clone)]
pub struct Environment {
    config: EnvConfig,
    initial_state: State,
    current_state: State,
    step_count: u64,
    episode_count: u64,
    goal_reached: bool,
    rng: StdRng,
}

impl Environment {
    /// Creates an environment seeded from OS entropy.
    pub fn new(config: EnvConfig) -> Result<Self, EnvError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates an environment whose random draws are reproducible.
    pub fn with_seed(config: EnvConfig, seed: u64) -> Result<Self, EnvError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EnvConfig, mut rng: StdRng) -> Result<Self, EnvError> {
        let (width, height) = config.space_size;
        let initial_state = State::random(&mut rng, width, height)?;
        debug!(?config, ?initial_state, "environment created");
        Ok(Environment {
            config,
            initial_state,
            current_state: initial_state,
            step_count: 0,
            episode_count: 0,
            goal_reached: false,
            rng,
        })
    }

    /// Starts a new episode and returns its first observation.
    pub fn reset(&mut self) -> Result<StepResult, EnvError> {
        self.start_episode()?;
        Ok(StepResult {
            observation: self.initial_state.observation(),
            reward: 0.0,
            done: false,
            info: self.info(),
        })
    }

    fn start_episode(&mut self) -> Result<(), EnvError> {
        self.episode_count += 1;
        self.step_count = 0;
        self.goal_reached = false;
        if !self.config.fixed_initial_state && self.episode_count > 1 {
            let (width, height) = self.config.space_size;
            self.initial_state = State::random(&mut self.rng, width, height)?;
            debug!(initial_state = ?self.initial_state, "initial state resampled");
        }
        self.current_state = self.initial_state;
        debug!(episode = self.episode_count, "episode started");
        Ok(())
    }

    /// Applies `action` and scores the result.
    ///
    /// When the ball lands in the box the returned observation is the terminal
    /// state, while the environment itself has already moved on to a fresh
    /// episode.
    pub fn step(&mut self, action: Action) -> Result<StepResult, EnvError> {
        let (width, height) = self.config.space_size;
        let outcome = transition::apply(self.current_state, action, width, height);

        // Nothing is committed unless the new state passes its checks.
        if let Err(e) = outcome.state.check(width, height, outcome.goal_reached) {
            error!(?action, error = %e, "transition broke a state invariant");
            return Err(e);
        }
        self.step_count += 1;
        self.current_state = outcome.state;
        self.goal_reached = outcome.goal_reached;

        let reward = reward::reward(self.goal_reached);
        let info = self.info();
        trace!(?action, state = ?self.current_state, reward, "step");

        if self.goal_reached {
            let terminal = self.current_state.observation();
            info!(
                episode = info.episode,
                steps = info.step,
                "ball placed in box"
            );
            self.start_episode()?;
            return Ok(StepResult {
                observation: terminal,
                reward,
                done: true,
                info,
            });
        }

        Ok(StepResult {
            observation: self.current_state.observation(),
            reward,
            done: false,
            info,
        })
    }

    /// Like [`step`](Self::step) but takes a raw action code.
    pub fn step_raw(&mut self, code: i64) -> Result<StepResult, EnvError> {
        let action = Action::try_from(code)?;
        self.step(action)
    }

    /// Replaces the current state after checking it against the grid and the
    /// validity rules. A rejected state leaves the environment untouched.
    pub fn set_state(&mut self, state: State) -> Result<(), EnvError> {
        let (width, height) = self.config.space_size;
        state.check(width, height, false)?;
        self.current_state = state;
        self.goal_reached = false;
        Ok(())
    }

    fn info(&self) -> StepInfo {
        StepInfo {
            episode: self.episode_count,
            step: self.step_count,
        }
    }

    /// Returns the configuration the environment was built with.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Returns the state of the running episode.
    pub fn state(&self) -> &State {
        &self.current_state
    }

    /// Returns the state every episode starts from until the next resample.
    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Returns the number of steps taken in the running episode.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Returns the number of episodes started so far.
    pub fn episode_count(&self) -> u64 {
        self.episode_count
    }

    /// Returns true between a goal step and the reset that follows it.
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Returns the flattened current state.
    pub fn observation(&self) -> Observation {
        self.current_state.observation()
    }

    /// Renders the current state as a sprite raster.
    pub fn render(&self) -> Result<Grid<Sprite>, EnvError> {
        let (width, height) = self.config.space_size;
        Ok(render::render(&self.current_state, width, height)?)
    }

    /// Returns the ten discrete actions.
        pub fn action_space(&self) -> Space {
        Space::Discrete(ACTION_COUNT)
    }

    /// Returns the upper bound of each observation entry.
    pub fn observation_space(&self) -> Space {
        let (width, height) = self.config.space_size;
        let (max_x, max_y) = (width as i64 - 1, height as i64 - 1);
        let high = vec![max_x, max_y, max_x, max_y, max_x, max_y, 2];
        debug_assert_eq!(high.len(), OBSERVATION_LEN);
        Space::MultiDiscrete { high }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Holding;

    fn fixed_8x8() -> Environment {
        let mut env = Environment::with_seed(EnvConfig::fixed(8), 42).unwrap();
        env.reset().unwrap();
        env
    }

    #[test]
    fn test_reset_returns_initial_observation() {
        let mut env = Environment::with_seed(EnvConfig::fixed(8), 1).unwrap();
        let result = env.reset().unwrap();
        assert_eq!(result.observation, env.initial_state().observation());
        assert_eq!(result.reward, 0.0);
        assert!(!result.done);
        assert_eq!(env.episode_count(), 1);
        assert_eq!(env.step_count(), 0);
        assert_eq!(env.state(), env.initial_state());
    }

    #[test]
    fn test_step_to_goal() {
        let mut env = fixed_8x8();
        env.set_state(State::new((6, 3), (6, 3), (6, 3)).with_holding(Holding::Ball))
            .unwrap();

        let result = env.step(Action::PutDown).unwrap();
        assert_eq!(result.observation, [6, 3, 6, 3, 6, 3, 0]);
        assert_eq!(result.reward, 100.0);
        assert!(result.done);
        assert_eq!(result.info, StepInfo { episode: 1, step: 1 });

        assert_eq!(env.episode_count(), 2);
        assert_eq!(env.step_count(), 0);
        assert!(!env.goal_reached());
        assert_eq!(env.state(), env.initial_state());
    }

    #[test]
    fn test_step_not_to_goal() {
        let mut env = fixed_8x8();
        env.set_state(State::new((6, 3), (6, 3), (6, 3)).with_holding(Holding::Ball))
            .unwrap();

        let result = env.step(Action::PickUp).unwrap();
        assert_eq!(result.observation, [6, 3, 6, 3, 6, 3, 1]);
        assert_eq!(result.reward, -1.0);
        assert!(!result.done);
        assert_eq!(env.episode_count(), 1);
    }

    #[test]
    fn test_step_counter_increments() {
        let mut env = fixed_8x8();
        env.set_state(State::new((0, 0), (5, 5), (6, 6))).unwrap();
        for expected in 1..=5 {
            let result = env.step(Action::Left).unwrap();
            assert_eq!(result.info.step, expected);
            assert_eq!(result.observation, [0, 0, 5, 5, 6, 6, 0]);
        }
    }

    #[test]
    fn test_step_raw_rejects_unknown_codes() {
        let mut env = fixed_8x8();
        let before = *env.state();
        assert_eq!(env.step_raw(10), Err(EnvError::InvalidAction { code: 10 }));
        assert_eq!(env.step_count(), 0);
        assert_eq!(*env.state(), before);
        assert!(env.step_raw(3).is_ok());
    }

    #[test]
    fn test_invalid_state_aborts_step() {
        let mut env = fixed_8x8();
        // Not reachable through set_state; simulates an engine defect upstream.
        env.current_state = State::new((1, 1), (4, 4), (4, 4));
        let before = env.current_state;
        let err = env.step(Action::Up).unwrap_err();
        assert!(matches!(err, EnvError::InvalidState { .. }));
        assert_eq!(env.current_state, before);
        assert_eq!(env.step_count(), 0);
        assert!(!env.goal_reached());
    }

    #[test]
    fn test_render_reports_off_grid_positions() {
        let mut env = fixed_8x8();
        assert!(env.render().is_ok());
        env.current_state = State::new((0, 0), (1, 1), (8, 2));
        assert!(matches!(env.render(), Err(EnvError::Render(_))));
    }

    #[test]
    fn test_set_state_rejects_bad_states() {
        let mut env = fixed_8x8();
        let before = *env.state();
        assert!(matches!(
            env.set_state(State::new((8, 0), (1, 1), (2, 2))),
            Err(EnvError::OutOfBounds { width: 8, height: 8, .. })
        ));
        assert!(matches!(
            env.set_state(State::new((0, 0), (1, 1), (2, 2)).with_holding(Holding::Box)),
            Err(EnvError::InvalidState { .. })
        ));
        assert_eq!(*env.state(), before);
    }

    #[test]
    fn test_fixed_initial_state_survives_resets() {
        let mut env = fixed_8x8();
        let initial = *env.initial_state();
        for _ in 0..10 {
            env.reset().unwrap();
            assert_eq!(*env.initial_state(), initial);
        }
    }

    #[test]
    fn test_random_initial_state_changes_after_first_reset() {
        let mut env = Environment::with_seed(EnvConfig::random(20), 3).unwrap();
        let constructed = *env.initial_state();
        env.reset().unwrap();
        assert_eq!(*env.initial_state(), constructed);

        let seen: Vec<State> = (0..5)
            .map(|_| {
                env.reset().unwrap();
                *env.initial_state()
            })
            .collect();
        assert!(seen.iter().any(|s| *s != constructed));
    }

    #[test]
    fn test_stepping_never_touches_initial_state() {
        let mut env = fixed_8x8();
        let initial = *env.initial_state();
        for action in Action::ALL {
            env.step(action).unwrap();
        }
        assert_eq!(*env.initial_state(), initial);
    }

    #[test]
    fn test_spaces() {
        let env = Environment::with_seed(EnvConfig::new(true, 5, 3), 0).unwrap();
        assert_eq!(env.action_space(), Space::Discrete(10));
        assert_eq!(
            env.observation_space(),
            Space::MultiDiscrete {
                high: vec![4, 2, 4, 2, 4, 2, 2]
            }
        );
    }

    #[test]
    fn test_degenerate_configs_fail_loudly() {
        assert!(matches!(
            Environment::with_seed(EnvConfig::fixed(1), 0),
            Err(EnvError::PlacementExhausted { .. })
        ));
        assert!(matches!(
            Environment::with_seed(EnvConfig::new(true, 0, 5), 0),
            Err(EnvError::EmptyGrid { .. })
        ));
    }
}
