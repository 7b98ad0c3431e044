use crate::{map::GridError, state::State};

/// Errors raised by the environment.
///
/// None of these are recoverable inside the simulation: each one means the
/// caller passed something outside the contract, or the engine broke one of
/// its own invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvError {
    #[error("Action code {code} is outside the action space (0..=9)")]
    InvalidAction { code: i64 },

    #[error("Transition produced an invalid state: {state:?}")]
    InvalidState { state: State },

    #[error("State {state:?} has a position outside the grid ({width}, {height})")]
    OutOfBounds {
        state: State,
        width: usize,
        height: usize,
    },

    #[error(
        "Could not place ball and box in distinct cells after {attempts} attempts on a ({width}, {height}) grid"
    )]
    PlacementExhausted {
        attempts: usize,
        width: usize,
        height: usize,
    },

    #[error("Grid dimensions must be non-zero, got ({width}, {height})")]
    EmptyGrid { width: usize, height: usize },

    #[error("Unknown environment id '{id}'")]
    UnknownEnvironment { id: String },

    #[error("Failed to render state: {0}")]
    Render(#[from] GridError),
}
