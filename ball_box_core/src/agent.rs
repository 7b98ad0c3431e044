use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Holding, Position,
    config::EnvConfig,
    state::State,
    transition::{ACTION_COUNT, Action},
};

/// Trait defining something that picks actions for the environment.
pub trait Agent {
    /// Chooses the next action given the current state.
    fn act(&mut self, state: &State, config: &EnvConfig) -> Action;
}

/// An agent that picks uniformly among all actions.
#[derive(Debug)]
pub struct RandomWalker {
    rng: StdRng,
}

impl RandomWalker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomWalker {
    fn act(&mut self, _state: &State, _config: &EnvConfig) -> Action {
        Action::ALL[self.rng.random_range(0..ACTION_COUNT)]
    }
}

/// Scripted agent: fetch the ball, carry it to the box, drop it.
///
/// Diagonal moves let it close both axes at once, so it needs at most
/// `2 * max(width, height) + 2` steps from any start state.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedySolver;

impl GreedySolver {
    /// Returns the move that brings `from` one step closer to `to` on both axes.
    fn step_towards(from: Position, to: Position) -> Option<Action> {
        let dx = (to.x as isize - from.x as isize).signum();
        let dy = (to.y as isize - from.y as isize).signum();
        Action::from_delta(dx, dy)
    }

    /// Any move that stays on the grid.
    fn any_legal_move(from: Position, config: &EnvConfig) -> Action {
        Action::ALL
            .into_iter()
            .find(|a| match a.delta() {
                Some((dx, dy)) => {
                    from.x.checked_add_signed(dx).is_some_and(|x| x < config.width())
                        && from.y.checked_add_signed(dy).is_some_and(|y| y < config.height())
                }
                None => false,
            })
            .unwrap_or(Action::PutDown)
    }
}

impl Agent for GreedySolver {
    fn act(&mut self, state: &State, config: &EnvConfig) -> Action {
        let agent = state.agent_position;
        match state.holding {
            Holding::Nothing => {
                Self::step_towards(agent, state.ball_position).unwrap_or(Action::PickUp)
            }
            Holding::Ball => {
                Self::step_towards(agent, state.box_position).unwrap_or(Action::PutDown)
            }
            // Wrong object. Drop it, or walk off the ball first if it is lying here.
            Holding::Box if state.ball_position != state.box_position => Action::PutDown,
            Holding::Box => Self::any_legal_move(agent, config),
        }
    }
}
