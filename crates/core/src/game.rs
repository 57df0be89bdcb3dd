//! Entry points used by front ends: new game, roll, save and load.

use tracing::warn;

use crate::{
    config::AppConfig,
    engine::{GameEngine, TurnOutcome, TurnPhase},
    error::{GameError, SaveError},
    player::PlayerDescriptor,
    save::{SaveEntry, SaveManager},
    state::GameState,
};

/// A game engine paired with the save directory it persists to.
#[derive(Debug, Clone)]
pub struct Game {
    engine: GameEngine,
    saves: SaveManager,
}

impl Game {
    /// Pair an engine with a save directory.
    pub fn new(engine: GameEngine, saves: SaveManager) -> Self {
        Self { engine, saves }
    }

    /// Build a game from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            GameEngine::new(config.rules(), config.rng()),
            SaveManager::new(config.save_root.clone()),
        )
    }

    /// Read-only view of the engine for rendering.
    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn phase(&self) -> TurnPhase {
        self.engine.phase()
    }

    /// Start a new game. Fewer than the minimum number of seats is refused
    /// without touching the current game.
    pub fn new_game(&mut self, descriptors: &[PlayerDescriptor]) -> Result<GameState, GameError> {
        self.engine.new_game(descriptors)
    }

    /// Roll for the active player and play out the turn.
    pub fn roll_and_move(&mut self) -> Result<TurnOutcome, GameError> {
        self.engine.roll_and_move()
    }

    /// Clear a won game so a new one can start.
    pub fn acknowledge_win(&mut self) -> bool {
        self.engine.acknowledge_win()
    }

    /// Save the current game under `name`.
    ///
    /// `None` means the user backed out of choosing a destination; nothing is
    /// written and [`SaveError::Aborted`] is returned.
    pub fn save_game(&self, name: Option<&str>) -> Result<SaveEntry, SaveError> {
        let Some(name) = name else {
            return Err(SaveError::Aborted);
        };
        if self.engine.phase() == TurnPhase::NoGame {
            return Err(SaveError::NothingToSave);
        }
        self.saves.create_save(Some(name), &self.engine.snapshot())
    }

    /// Replace the running game with the one stored for `entry`. The running
    /// game is kept if anything goes wrong.
    pub fn load_game(&mut self, entry: &SaveEntry) -> Result<(), SaveError> {
        let state = self.saves.load(entry)?;
        self.engine.restore(state).map_err(|err| {
            warn!(path = %entry.path.display(), %err, "rejected save");
            SaveError::from(err)
        })
    }

    /// All saves, newest first.
    pub fn save_entries(&self) -> Result<Vec<SaveEntry>, SaveError> {
        self.saves.entries()
    }
}
