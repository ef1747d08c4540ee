/**
* A live cell dies if it has fewer than two live neighbors.
* A live cell with two or three live neighbors lives on to the next generation.
* A live cell with more than three live neighbors dies.
* A dead cell will be brought back to live if it has exactly three live neighbors.
*
* The grid wraps at every edge, so it is topologically a torus.
*/

pub mod grid;

pub mod canvas;
pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod seed;

pub use canvas::{Canvas, Shade, PALETTE};
pub use config::Config;
pub use controller::{tick_shared, Clock, Controller, FrameSink, Pending, SystemClock, TickOutcome, TITLE};
pub use error::LifeError;
pub use grid::{conway, Initializer, Life, Rule};
pub use input::{Button, Command, InputEvent, InputState};
pub use seed::{RandomFill, SeedSource};
