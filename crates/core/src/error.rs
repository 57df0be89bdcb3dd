//! Error types shared by the engine and the persistence layer.

use thiserror::Error;

use crate::player::PlayerId;

/// Failures raised by game setup and turn handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Not enough player descriptors were supplied to start a game.
    #[error("at least {min} players are required, got {found}")]
    TooFewPlayers {
        /// Minimum accepted player count.
        min: usize,
        /// Number of descriptors supplied.
        found: usize,
    },

    /// More player descriptors were supplied than the rules allow.
    #[error("at most {max} players are allowed, got {found}")]
    TooManyPlayers {
        /// Maximum accepted player count.
        max: usize,
        /// Number of descriptors supplied.
        found: usize,
    },

    /// A roll was requested before any game was started.
    #[error("no game in progress")]
    NoGameInProgress,

    /// A roll was requested after the game was already won.
    #[error("game already won by player {winner}")]
    GameOver {
        /// Serial number of the winning player.
        winner: PlayerId,
    },

    /// A die value outside 1..=6 was fed to the engine.
    #[error("invalid die value {0}")]
    InvalidDieValue(u8),

    /// Drawing unique obstacle endpoints exhausted the retry budget.
    #[error("failed to place {count} obstacles after {attempts} attempts")]
    ObstacleGeneration {
        /// Number of obstacles requested.
        count: usize,
        /// Attempts spent on the failing draw.
        attempts: usize,
    },

    /// The board does not have enough interior cells for the requested obstacles.
    #[error("{count} obstacles need {} cells but only {available} are available", .count * 2)]
    TooManyObstacles {
        /// Number of obstacles requested.
        count: usize,
        /// Interior cells available for endpoints.
        available: usize,
    },

    /// A restored state violates a board, player or obstacle invariant.
    #[error("invalid game state: {0}")]
    InvalidState(String),
}

/// Failures raised while writing or reading save files.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Underlying filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for a save payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The requested save file does not exist.
    #[error("save file not found: {0}")]
    NotFound(String),

    /// The file was written by something other than this game.
    #[error("invalid save file header")]
    InvalidHeader,

    /// The file uses a schema version this build cannot read.
    #[error("incompatible save version: expected {expected}, found {found}")]
    IncompatibleVersion {
        /// Version this build writes.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// The payload parsed but describes an impossible game.
    #[error("save file corrupted: {0}")]
    Corrupted(String),

    /// No destination was chosen, nothing was written.
    #[error("save aborted")]
    Aborted,

    /// There is no game in progress to write.
    #[error("no game in progress to save")]
    NothingToSave,
}

impl From<GameError> for SaveError {
    fn from(err: GameError) -> Self {
        SaveError::Corrupted(err.to_string())
    }
}
