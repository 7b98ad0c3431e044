use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Holding, Position, error::EnvError};

/// Upper bound on draws for the box position when sampling an initial state.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1024;

/// Number of integers in a flattened observation.
pub const OBSERVATION_LEN: usize = 7;

/// Flattened world state handed back to callers:
/// `[agent_x, agent_y, ball_x, ball_y, box_x, box_y, holding]`.
pub type Observation = [i64; OBSERVATION_LEN];

/// Complete world state. A plain value: copies never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub agent_position: Position,
    pub ball_position: Position,
    pub box_position: Position,
    pub holding: Holding,
}

impl State {
    /// Creates a state with the agent holding nothing.
    pub fn new(agent: (usize, usize), ball: (usize, usize), box_cell: (usize, usize)) -> Self {
        State {
            agent_position: agent.into(),
            ball_position: ball.into(),
            box_position: box_cell.into(),
            holding: Holding::Nothing,
        }
    }

    pub fn with_holding(mut self, holding: Holding) -> Self {
        self.holding = holding;
        self
    }

    /// Samples a uniformly random starting state.
    ///
    /// The agent may share a cell with either object, but the ball and the box
    /// are redrawn until they land in different cells.
    pub fn random<R: Rng>(
        rng: &mut R,
        width: usize,
        height: usize,
    ) -> Result<Self, EnvError> {
        if width == 0 || height == 0 {
            return Err(EnvError::EmptyGrid { width, height });
        }
        let cell = |rng: &mut R| Position {
            x: rng.random_range(0..width),
            y: rng.random_range(0..height),
        };

        let agent_position = cell(rng);
        let ball_position = cell(rng);
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let box_position = cell(rng);
            if box_position != ball_position {
                return Ok(State {
                    agent_position,
                    ball_position,
                    box_position,
                    holding: Holding::Nothing,
                });
            }
        }
        Err(EnvError::PlacementExhausted {
            attempts: MAX_PLACEMENT_ATTEMPTS,
            width,
            height,
        })
    }

    /// Checks the carry and overlap rules.
    ///
    /// Ball and box may only share a floor cell once the goal has been reached.
    pub fn is_valid(&self, goal_reached: bool) -> bool {
        match self.holding {
            Holding::Nothing => goal_reached || self.ball_position != self.box_position,
            Holding::Ball => self.agent_position == self.ball_position,
            Holding::Box => self.agent_position == self.box_position,
        }
    }

    /// Returns true if every position lies inside a `width` x `height` grid.
    pub fn within(&self, width: usize, height: usize) -> bool {
        [self.agent_position, self.ball_position, self.box_position]
            .iter()
            .all(|p| p.x < width && p.y < height)
    }

    /// Bounds check followed by the validity check, as a `Result`.
    pub fn check(&self, width: usize, height: usize, goal_reached: bool) -> Result<(), EnvError> {
        if !self.within(width, height) {
            return Err(EnvError::OutOfBounds {
                state: *self,
                width,
                height,
            });
        }
        if !self.is_valid(goal_reached) {
            return Err(EnvError::InvalidState { state: *self });
        }
        Ok(())
    }

    pub fn observation(&self) -> Observation {
        let Position { x: ax, y: ay } = self.agent_position;
        let Position { x: lx, y: ly } = self.ball_position;
        let Position { x: bx, y: by } = self.box_position;
        [
            ax as i64,
            ay as i64,
            lx as i64,
            ly as i64,
            bx as i64,
            by as i64,
            self.holding.code() as i64,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_overlap_only_valid_after_goal() {
        let state = State::new((2, 2), (4, 4), (4, 4));
        assert!(!state.is_valid(false));
        assert!(state.is_valid(true));
    }

    #[test]
    fn test_holding_requires_colocation() {
        let ball = State::new((1, 1), (2, 2), (3, 3)).with_holding(Holding::Ball);
        assert!(!ball.is_valid(false));
        let ball = State::new((2, 2), (2, 2), (3, 3)).with_holding(Holding::Ball);
        assert!(ball.is_valid(false));

        let held_box = State::new((1, 1), (2, 2), (3, 3)).with_holding(Holding::Box);
        assert!(!held_box.is_valid(false));
        let held_box = State::new((3, 3), (2, 2), (3, 3)).with_holding(Holding::Box);
        assert!(held_box.is_valid(false));
    }

    #[test]
    fn test_check_reports_out_of_bounds_first() {
        let state = State::new((0, 0), (5, 1), (5, 1));
        assert_eq!(
            state.check(5, 5, false),
            Err(EnvError::OutOfBounds {
                state,
                width: 5,
                height: 5
            })
        );
        assert_eq!(
            state.check(8, 8, false),
            Err(EnvError::InvalidState { state })
        );
    }

    #[test]
    fn test_observation_layout() {
        let state = State::new((6, 3), (6, 1), (2, 4)).with_holding(Holding::Box);
        assert_eq!(state.observation(), [6, 3, 6, 1, 2, 4, 2]);
    }

    #[test]
    fn test_random_state_is_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let state = State::random(&mut rng, 3, 3).unwrap();
            assert!(state.within(3, 3));
            assert!(state.is_valid(false));
            assert_eq!(state.holding, Holding::Nothing);
        }
    }

    #[test]
    fn test_random_state_rejects_degenerate_grids() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            State::random(&mut rng, 1, 1),
            Err(EnvError::PlacementExhausted { attempts: MAX_PLACEMENT_ATTEMPTS, .. })
        ));
        assert_eq!(
            State::random(&mut rng, 0, 4),
            Err(EnvError::EmptyGrid { width: 0, height: 4 })
        );
    }
}
