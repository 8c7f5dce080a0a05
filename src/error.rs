//! Error types shared by the board model, opening book and turn controller.

use thiserror::Error;

/// Errors surfaced by the Kalaha engine.
#[derive(Error, Debug)]
pub enum KalahaError {
    /// Pit index outside 1..=6.
    #[error("invalid move: pit {pit} (must be 1-6)")]
    InvalidMove { pit: u8 },

    /// The named pit holds no seeds.
    #[error("illegal move: pit {pit} is empty")]
    EmptyPit { pit: u8 },

    /// Board snapshot could not be decoded.
    #[error("malformed board snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// Board snapshot decoded but violates seed conservation.
    #[error("board holds {found} seeds, expected {expected}")]
    SeedCount { found: u32, expected: u32 },

    /// Opening book file is present but unreadable as a table.
    #[error("opening book line {line}: {reason}")]
    BookFormat { line: usize, reason: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type alias for engine operations.
pub type KalahaResult<T> = Result<T, KalahaError>;
