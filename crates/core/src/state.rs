//! Persistable snapshot of a game.

use serde::{Deserialize, Serialize};

use crate::{obstacle::Obstacle, player::Player};

/// Players and obstacles, indexed only by cell numbers and serial numbers.
///
/// This is the unit written to and read from save files. It holds no
/// reference to any front-end object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Players in seating order.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Obstacles in placement order.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl GameState {
    /// `true` when no game has been set up.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
