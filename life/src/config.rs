use std::time::Duration;

use crate::seed::DEFAULT_DENSITY;

pub const GRID_WIDTH: usize = 200;
pub const GRID_HEIGHT: usize = GRID_WIDTH * 9 / 16;
pub const CELL_SCALE: usize = 5;
pub const STEP_INTERVAL_MS: u64 = 50;
/// Longest interval the controller accepts. Scrolling stops growing it here
/// so one rendered generation never waits more than two seconds.
pub const MAX_INTERVAL_MS: u64 = 2_000;
pub const PAUSE_QUANTUM: Duration = Duration::from_millis(10);
pub const SEED_VAR: &str = "LIFE_SEED";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub width: usize,
    pub height: usize,
    /// Canvas pixels per cell edge.
    pub scale: usize,
    /// Delay between rendered generations, capped at [`MAX_INTERVAL_MS`].
    pub interval_ms: u64,
    /// Sleep per tick while paused.
    pub pause_quantum: Duration,
    /// Skip redraw and sleep on every Nth tick; 0 never skips. 1 would skip
    /// every tick and is rejected by the controller.
    pub skip_every: u32,
    pub density: f64,
    /// Fixed initial seed; drawn from entropy when `None`.
    pub seed: Option<u64>,
    pub start_paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            scale: CELL_SCALE,
            interval_ms: STEP_INTERVAL_MS,
            pause_quantum: PAUSE_QUANTUM,
            skip_every: 0,
            density: DEFAULT_DENSITY,
            seed: None,
            start_paused: false,
        }
    }
}

impl Config {
    /// Defaults, with the initial seed taken from `LIFE_SEED` when set.
    pub fn from_env() -> Self {
        let seed = match std::env::var(SEED_VAR) {
            Ok(value) => match value.trim().parse() {
                Ok(seed) => Some(seed),
                Err(err) => {
                    log::warn!("ignoring {SEED_VAR}={value:?}: {err}");
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            seed,
            ..Self::default()
        }
    }
}
