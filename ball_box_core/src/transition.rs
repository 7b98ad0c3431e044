use serde::{Deserialize, Serialize};

use crate::{Holding, Position, error::EnvError, state::State};

/// Size of the discrete action space.
pub const ACTION_COUNT: usize = 10;

/// Represents actions the agent can take.
///
/// The discriminants are the published action codes and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    UpRight = 4,
    UpLeft = 5,
    DownRight = 6,
    DownLeft = 7,
    PickUp = 8,
    PutDown = 9,
}

impl Action {
    /// All actions in code order.
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::UpRight,
        Action::UpLeft,
        Action::DownRight,
        Action::DownLeft,
        Action::PickUp,
        Action::PutDown,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns the `(dx, dy)` displacement for move actions, `None` otherwise.
    ///
    /// Up/down act on `x`, left/right on `y`.
    pub const fn delta(self) -> Option<(isize, isize)> {
        match self {
            Action::Up => Some((-1, 0)),
            Action::Down => Some((1, 0)),
            Action::Left => Some((0, -1)),
            Action::Right => Some((0, 1)),
            Action::UpRight => Some((-1, 1)),
            Action::UpLeft => Some((-1, -1)),
            Action::DownRight => Some((1, 1)),
            Action::DownLeft => Some((1, -1)),
            Action::PickUp | Action::PutDown => None,
        }
    }

    /// Finds the move action with the given displacement.
    pub fn from_delta(dx: isize, dy: isize) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.delta() == Some((dx, dy)))
    }
}

impl TryFrom<i64> for Action {
    type Error = EnvError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Action::ALL.get(index).copied())
            .ok_or(EnvError::InvalidAction { code })
    }
}

/// Outcome of applying one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: State,
    /// True if this action put the ball into the box.
    pub goal_reached: bool,
}

/// Applies `action` to `state` on a `width` x `height` grid.
///
/// Moves that would leave the grid are no-ops. Pick-up and put-down that
/// have nothing to act on are no-ops as well.
pub fn apply(state: State, action: Action, width: usize, height: usize) -> Transition {
    match action.delta() {
        Some((dx, dy)) => Transition {
            state: apply_move(state, dx, dy, width, height),
            goal_reached: false,
        },
        None if action == Action::PickUp => Transition {
            state: apply_pick_up(state),
            goal_reached: false,
        },
        None => apply_put_down(state),
    }
}

fn apply_move(mut state: State, dx: isize, dy: isize, width: usize, height: usize) -> State {
    let current = state.agent_position;
    let target = match (
        current.x.checked_add_signed(dx),
        current.y.checked_add_signed(dy),
    ) {
        (Some(x), Some(y)) if x < width && y < height => Position { x, y },
        // Bumped into the wall
        _ => return state,
    };

    state.agent_position = target;
    match state.holding {
        Holding::Ball => state.ball_position = target,
        Holding::Box => state.box_position = target,
        Holding::Nothing => {}
    }
    state
}

fn apply_pick_up(mut state: State) -> State {
    if state.holding != Holding::Nothing {
        return state;
    }
    // Ball wins if the agent stands on both
    if state.agent_position == state.ball_position {
        state.holding = Holding::Ball;
    } else if state.agent_position == state.box_position {
        state.holding = Holding::Box;
    }
    state
}

fn apply_put_down(mut state: State) -> Transition {
    let mut goal_reached = false;
    match state.holding {
        Holding::Nothing => {}
        _ if state.ball_position != state.box_position => state.holding = Holding::Nothing,
        Holding::Ball => {
            state.holding = Holding::Nothing;
            goal_reached = true;
        }
        // The ball is already lying here; the box cannot go down on top of it.
        Holding::Box => {}
    }
    Transition {
        state,
        goal_reached,
    }
}
