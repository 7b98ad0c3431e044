use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod map;
pub mod render;
pub mod reward;
pub mod state;
pub mod transition;

pub use config::EnvConfig;
pub use environment::{Environment, StepResult};
pub use error::EnvError;
pub use state::State;
pub use transition::Action;

/// Represents a 2D coordinate on the lattice.
///
/// `x` is the axis moved by up/down actions, `y` the axis moved by left/right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

impl From<(usize, usize)> for Position {
    fn from((x, y): (usize, usize)) -> Self {
        Position { x, y }
    }
}

/// What the agent is currently carrying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holding {
    #[default]
    Nothing,
    Ball,
    Box,
}

impl Holding {
    /// Integer code used in observations: 0 nothing, 1 ball, 2 box.
    pub const fn code(self) -> u8 {
        match self {
            Holding::Nothing => 0,
            Holding::Ball => 1,
            Holding::Box => 2,
        }
    }
}
