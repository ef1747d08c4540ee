use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifeError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },
    #[error("grid of {width}x{height} cells does not fit in memory")]
    GridTooLarge { width: usize, height: usize },
    #[error("canvas scale must be at least 1")]
    ZeroScale,
    #[error("skipping every tick would never draw a frame")]
    SkipsEveryTick,
}

pub type Result<T> = std::result::Result<T, LifeError>;
