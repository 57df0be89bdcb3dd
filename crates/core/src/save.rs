//! Save-game persistence.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::SaveError, state::GameState};

/// Directory under the user's config dir used for save files.
pub const DEFAULT_SAVE_DIR: &str = "munros/saves";

/// Current save file format version.
pub const SAVE_VERSION: u32 = 1;

const SAVE_MAGIC: &str = "MUNROS";

/// Metadata describing a persisted game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEntry {
    /// Absolute path to the save file on disk.
    pub path: PathBuf,
    /// Human readable save name.
    pub name: String,
    /// Number of players in the saved game.
    pub players: usize,
    /// Timestamp when the save was written.
    pub updated_at: DateTime<Utc>,
}

/// Identifies a file as one of ours and pins its schema version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveHeader {
    magic: String,
    version: u32,
}

impl SaveHeader {
    fn current() -> Self {
        Self {
            magic: SAVE_MAGIC.to_string(),
            version: SAVE_VERSION,
        }
    }

    fn validate(&self) -> Result<(), SaveError> {
        if self.magic != SAVE_MAGIC {
            return Err(SaveError::InvalidHeader);
        }
        if self.version != SAVE_VERSION {
            return Err(SaveError::IncompatibleVersion {
                expected: SAVE_VERSION,
                found: self.version,
            });
        }
        Ok(())
    }
}

/// Serialized representation of a save file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePayload {
    header: SaveHeader,
    name: String,
    saved_at: DateTime<Utc>,
    state: GameState,
}

impl SavePayload {
    fn new(name: Option<&str>, state: GameState) -> Self {
        let display_name = name
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
            .unwrap_or_else(|| "Munros & Selkies".to_string());
        Self {
            header: SaveHeader::current(),
            name: display_name,
            saved_at: Utc::now(),
            state,
        }
    }

    /// Consume the payload and return the stored game state.
    pub fn into_state(self) -> GameState {
        self.state
    }

    fn entry(&self, path: PathBuf) -> SaveEntry {
        SaveEntry {
            path,
            name: self.name.clone(),
            players: self.state.players.len(),
            updated_at: self.saved_at,
        }
    }
}

/// Manager responsible for loading and writing save files.
#[derive(Debug, Clone)]
pub struct SaveManager {
    root: PathBuf,
}

impl SaveManager {
    /// Create a new manager rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_SAVE_DIR)
    }

    /// Return all readable saves sorted by timestamp (most recent first).
    pub fn entries(&self) -> Result<Vec<SaveEntry>, SaveError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match read_payload(&entry.path()) {
                Ok(payload) => entries.push(payload.entry(entry.path())),
                Err(err) => {
                    warn!("Failed to read save {:?}: {err}", entry.path());
                }
            }
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    /// Write `state` to a new file in the save directory and return where it went.
    pub fn create_save(&self, name: Option<&str>, state: &GameState) -> Result<SaveEntry, SaveError> {
        fs::create_dir_all(&self.root)?;

        let payload = SavePayload::new(name, state.clone());
        let stem = format!(
            "{}_{}",
            sanitize_component(&payload.name),
            payload.saved_at.format("%Y%m%d%H%M%S%3f")
        );
        let path = write_new(&self.root, &stem, &payload)?;
        info!(path = %path.display(), "game saved");
        Ok(payload.entry(path))
    }

    /// Write `state` to an explicit destination.
    pub fn write_to(
        &self,
        path: impl AsRef<Path>,
        name: Option<&str>,
        state: &GameState,
    ) -> Result<SaveEntry, SaveError> {
        let path = path.as_ref();
        let payload = SavePayload::new(name, state.clone());
        write_payload(path, &payload)?;
        info!(path = %path.display(), "game saved");
        Ok(payload.entry(path.to_path_buf()))
    }

    /// Read the game stored at an explicit location.
    pub fn read_from(&self, path: impl AsRef<Path>) -> Result<GameState, SaveError> {
        Ok(read_payload(path.as_ref())?.into_state())
    }

    /// Load the game stored for `entry`.
    pub fn load(&self, entry: &SaveEntry) -> Result<GameState, SaveError> {
        self.read_from(&entry.path)
    }

    /// Most recent save entry, if any.
    pub fn latest(&self) -> Result<Option<SaveEntry>, SaveError> {
        let entries = self.entries()?;
        Ok(entries.into_iter().next())
    }
}

fn write_payload(path: &Path, payload: &SavePayload) -> Result<(), SaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let serialised = serde_json::to_vec_pretty(payload)?;
    fs::write(path, serialised)?;
    Ok(())
}

/// Write `payload` to a file named after `stem` that does not exist yet,
/// appending `_1`, `_2`, ... until a free name is found.
fn write_new(root: &Path, stem: &str, payload: &SavePayload) -> Result<PathBuf, SaveError> {
    let serialised = serde_json::to_vec_pretty(payload)?;
    let mut attempt = 0u32;
    loop {
        let file_name = match attempt {
            0 => format!("{stem}.json"),
            n => format!("{stem}_{n}.json"),
        };
        let path = root.join(file_name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(&serialised)?;
                return Ok(path);
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                attempt = attempt.checked_add(1).ok_or(SaveError::Io(err))?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn read_payload(path: &Path) -> Result<SavePayload, SaveError> {
    let content = fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => SaveError::NotFound(path.display().to_string()),
        _ => SaveError::Io(err),
    })?;
    let payload: SavePayload = serde_json::from_str(&content)?;
    payload.header.validate()?;
    Ok(payload)
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "munros".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{GameEngine, GameRules},
        player::{Icon, PlayerDescriptor},
        rng::GameRng,
    };
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn colliding_save_names_get_distinct_files() {
        let dir = tempdir().unwrap();
        let manager = SaveManager::new(dir.path());
        let first = SavePayload::new(Some("Ben Nevis"), played_state(21, 3));
        let second = SavePayload::new(Some("Ben Nevis"), played_state(22, 5));

        let a = write_new(dir.path(), "BenNevis_20260101000000000", &first).unwrap();
        let b = write_new(dir.path(), "BenNevis_20260101000000000", &second).unwrap();
        assert_ne!(a, b);
        assert!(b.ends_with("BenNevis_20260101000000000_1.json"));
        assert_eq!(manager.read_from(&a).unwrap(), played_state(21, 3));
        assert_eq!(manager.read_from(&b).unwrap(), played_state(22, 5));
    }

    fn played_state(seed: u64, rolls: usize) -> GameState {
        let mut engine = GameEngine::new(GameRules::default(), GameRng::new(seed));
        engine
            .new_game(&[
                PlayerDescriptor::new("Fiona", Icon::Triangle),
                PlayerDescriptor::new("Calum", Icon::Diamond),
                PlayerDescriptor {
                    name: String::new(),
                    icon: None,
                },
            ])
            .unwrap();
        for _ in 0..rolls {
            match engine.roll_and_move() {
                Ok(outcome) if outcome.winner.is_none() => {}
                _ => break,
            }
        }
        engine.snapshot()
    }

    #[test]
    fn save_round_trip() -> Result<(), SaveError> {
        let dir = tempdir()?;
        let manager = SaveManager::new(dir.path());
        let state = played_state(42, 12);

        let entry = manager.create_save(Some("Evening game"), &state)?;
        assert!(entry.path.exists());
        assert_eq!(entry.players, 3);

        let entries = manager.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Evening game");

        let loaded = manager.load(&entries[0])?;
        assert_eq!(loaded, state);

        let latest = manager.latest()?.expect("expected latest entry");
        assert_eq!(latest.path, entry.path);
        Ok(())
    }

    #[test]
    fn entries_skip_foreign_files() -> Result<(), SaveError> {
        let dir = tempdir()?;
        let manager = SaveManager::new(dir.path());
        fs::write(dir.path().join("notes.json"), "{\"hello\": 1}")?;
        fs::write(dir.path().join("readme.txt"), "not a save")?;
        manager.create_save(None, &played_state(1, 0))?;

        let entries = manager.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Munros & Selkies");
        Ok(())
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let manager = SaveManager::new(dir.path());
        let err = manager.read_from(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SaveError::NotFound(_)));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ this is not json").unwrap();
        let err = SaveManager::new(dir.path()).read_from(&path).unwrap_err();
        assert!(matches!(err, SaveError::Serialization(_)));
    }

    #[test]
    fn header_is_validated() {
        let dir = tempdir().unwrap();
        let manager = SaveManager::new(dir.path());
        let path = dir.path().join("game.json");
        manager.write_to(&path, Some("x"), &played_state(3, 2)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("\"MUNROS\"", "\"NHRS\"")).unwrap();
        assert!(matches!(
            manager.read_from(&path),
            Err(SaveError::InvalidHeader)
        ));

        let content = fs::read_to_string(&path).unwrap();
        let bumped = content
            .replace("\"NHRS\"", "\"MUNROS\"")
            .replace("\"version\": 1", "\"version\": 9");
        fs::write(&path, bumped).unwrap();
        assert!(matches!(
            manager.read_from(&path),
            Err(SaveError::IncompatibleVersion {
                expected: 1,
                found: 9
            })
        ));
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("Ben Nevis / 1345m!"), "BenNevis1345m");
        assert_eq!(sanitize_component("???"), "munros");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        #[test]
        fn any_played_game_round_trips(seed in any::<u64>(), rolls in 0usize..60) {
            let dir = tempdir().unwrap();
            let manager = SaveManager::new(dir.path());
            let state = played_state(seed, rolls);
            let entry = manager.create_save(Some("prop"), &state).unwrap();
            prop_assert_eq!(manager.load(&entry).unwrap(), state);
        }
    }
}
