//! Raster view of a [`State`] for front ends.
//!
//! Every lattice cell becomes a `CELL_WIDTH` x `CELL_HEIGHT` block of
//! sub-cells. The agent sits in the top-left sub-cell. Objects on the floor
//! occupy the bottom row and carried objects move up one row, so a viewer can
//! tell "held" from "lying here" without any other state:
//!
//! ```text
//! +---+---+
//! | A |   |   row 0: agent
//! | X | o |   row 1: held box, held ball
//! | X | o |   row 2: floor box, floor ball
//! +---+---+
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    Holding, Position,
    map::{Grid, GridError},
    state::State,
};

pub const CELL_WIDTH: usize = 2;
pub const CELL_HEIGHT: usize = 3;

/// Contents of one raster sub-cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sprite {
    #[default]
    Empty,
    Agent,
    Ball,
    Box,
}

/// Draws `state` onto a raster of `width * CELL_WIDTH` by
/// `height * CELL_HEIGHT` sub-cells.
///
/// State coordinate `x` maps to raster columns and `y` to raster rows. A
/// position outside the `width` x `height` grid is an error.
pub fn render(state: &State, width: usize, height: usize) -> Result<Grid<Sprite>, GridError> {
    let mut raster = Grid::new(width * CELL_WIDTH, height * CELL_HEIGHT);

    let (box_row, ball_row) = match state.holding {
        Holding::Nothing => (2, 2),
        Holding::Ball => (2, 1),
        Holding::Box => (1, 2),
    };
    draw(&mut raster, state.box_position, (0, box_row), Sprite::Box)?;
    draw(&mut raster, state.ball_position, (1, ball_row), Sprite::Ball)?;
    draw(&mut raster, state.agent_position, (0, 0), Sprite::Agent)?;
    Ok(raster)
}

fn draw(
    raster: &mut Grid<Sprite>,
    cell: Position,
    (dx, dy): (usize, usize),
    sprite: Sprite,
) -> Result<(), GridError> {
    raster.set(cell.x * CELL_WIDTH + dx, cell.y * CELL_HEIGHT + dy, sprite)
}
