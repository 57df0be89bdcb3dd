//! Application configuration.
//!
//! Values are layered: built-in defaults, then `<config_dir>/munros/config.json`
//! if present, then `MUNROS_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, Environment, File};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    engine::{GameRules, MIN_PLAYERS},
    rng::GameRng,
    save::SaveManager,
};

/// Directory under the user's config dir holding `config.json`.
pub const CONFIG_DIR: &str = "munros";

/// Largest board side accepted from configuration.
pub const MAX_BOARD_SIDE: usize = 40;

const CONFIG_FILE: &str = "config.json";

/// User-tunable settings for the game and the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cells along one side of the board.
    pub board_side: usize,
    /// Obstacles placed per game.
    pub obstacle_count: usize,
    /// Fewest players a game accepts.
    pub min_players: usize,
    /// Most players a game accepts.
    pub max_players: usize,
    /// Milliseconds the die spins before its value is revealed.
    pub dice_delay_ms: u64,
    /// Retry cap for each obstacle endpoint draw.
    pub max_draw_attempts: usize,
    /// Directory save files are written to.
    pub save_root: PathBuf,
    /// Fixed RNG seed for reproducible games.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let rules = GameRules::default();
        Self {
            board_side: rules.board_side,
            obstacle_count: rules.obstacle_count,
            min_players: rules.min_players,
            max_players: rules.max_players,
            dice_delay_ms: 2000,
            max_draw_attempts: rules.max_draw_attempts,
            save_root: SaveManager::default_root(),
            seed: None,
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from a specific file (which may be absent) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("MUNROS").try_parsing(true))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot play with.
    pub fn validate(&self) -> Result<()> {
        if !(2..=MAX_BOARD_SIDE).contains(&self.board_side) {
            bail!(
                "board_side must be within 2..={MAX_BOARD_SIDE}, got {}",
                self.board_side
            );
        }
        if self.min_players < MIN_PLAYERS {
            bail!(
                "min_players must be at least {MIN_PLAYERS}, got {}",
                self.min_players
            );
        }
        if self.min_players > self.max_players {
            bail!(
                "player limits {}..={} are not a valid range",
                self.min_players,
                self.max_players
            );
        }
        if usize::from(u8::MAX) < self.max_players {
            bail!("max_players must fit a serial number, got {}", self.max_players);
        }
        let interior = self.board_side * self.board_side - 2;
        if self.obstacle_count * 2 > interior {
            bail!(
                "{} obstacles do not fit on a board with {interior} free cells",
                self.obstacle_count
            );
        }
        Ok(())
    }

    /// Engine-facing subset of the settings.
    pub fn rules(&self) -> GameRules {
        GameRules {
            board_side: self.board_side,
            obstacle_count: self.obstacle_count,
            min_players: self.min_players,
            max_players: self.max_players,
            max_draw_attempts: self.max_draw_attempts,
        }
    }

    pub fn dice_delay(&self) -> Duration {
        Duration::from_millis(self.dice_delay_ms)
    }

    /// RNG for a new session, seeded if a seed is configured.
    pub fn rng(&self) -> GameRng {
        match self.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        }
    }
}

/// Location of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a default config file unless one already exists.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(config_path())
}

/// Write a default config file at `path` unless one already exists.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default config")?;
    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default config");
    Ok(())
}
