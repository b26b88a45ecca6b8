//! Centralized error type for the looper umbrella crate.
//!
//! Wraps core errors so `?` propagates naturally across the crate boundary.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] looper_core::Error),

    /// The scheduler thread is gone (shut down or panicked).
    #[error("Engine stopped")]
    EngineStopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
