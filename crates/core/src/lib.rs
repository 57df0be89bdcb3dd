#![warn(clippy::all, missing_docs)]

//! Core rules for Munros & Selkies.
//!
//! This crate holds the board geometry, the player and obstacle registries,
//! the turn engine, configuration, and save-file persistence used by the
//! terminal front end.

pub mod board;
pub mod config;
pub mod dice;
pub mod engine;
pub mod error;
pub mod game;
pub mod obstacle;
pub mod player;
pub mod rng;
pub mod save;
pub mod state;

pub use board::{Board, Cell, GridCoord};
pub use config::AppConfig;
pub use dice::DiceTimer;
pub use engine::{GameEngine, GameRules, TurnOutcome, TurnPhase};
pub use error::{GameError, SaveError};
pub use game::Game;
pub use obstacle::{Obstacle, ObstacleHit, ObstacleKind, ObstacleRegistry};
pub use player::{Icon, Player, PlayerDescriptor, PlayerId, PlayerRegistry};
pub use rng::GameRng;
pub use save::{SaveEntry, SaveManager};
pub use state::GameState;
