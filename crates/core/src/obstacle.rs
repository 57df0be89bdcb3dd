#![allow(missing_docs)]

//! Munros and Selkies, and the registry that places and resolves them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    board::{Board, Cell},
    error::GameError,
    rng::GameRng,
};

/// Which way an obstacle moves a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Munro: climbs from its lower cell to its higher cell.
    Advancing,
    /// Selkie: drags from its higher cell down to its lower cell.
    Penalizing,
}

impl ObstacleKind {
    /// Display name used on the board.
    pub fn label(self) -> &'static str {
        match self {
            ObstacleKind::Advancing => "Munro",
            ObstacleKind::Penalizing => "Selkie",
        }
    }
}

/// An obstacle bound to two board cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Obstacle {
    kind: ObstacleKind,
    start: Cell,
    end: Cell,
}

impl Obstacle {
    /// Bind an obstacle to an unordered pair of distinct cells.
    ///
    /// The trigger is the lower cell for a Munro and the higher cell for a Selkie.
    pub fn from_pair(kind: ObstacleKind, a: Cell, b: Cell) -> Result<Self, GameError> {
        if a == b {
            return Err(GameError::InvalidState(format!(
                "obstacle endpoints must differ, both are {a}"
            )));
        }
        let (low, high) = (a.min(b), a.max(b));
        let (start, end) = match kind {
            ObstacleKind::Advancing => (low, high),
            ObstacleKind::Penalizing => (high, low),
        };
        Ok(Self { kind, start, end })
    }

    /// Bind an obstacle to an explicit trigger and target, checking the
    /// direction matches the kind.
    pub fn new(kind: ObstacleKind, start: Cell, end: Cell) -> Result<Self, GameError> {
        let obstacle = Self { kind, start, end };
        obstacle.check_direction()?;
        Ok(obstacle)
    }

    pub fn kind(&self) -> ObstacleKind {
        self.kind
    }

    /// Trigger cell.
    pub fn start(&self) -> Cell {
        self.start
    }

    /// Cell a triggered player is moved to.
    pub fn end(&self) -> Cell {
        self.end
    }

    /// Both board cells the obstacle is attached to.
    pub fn cells(&self) -> [Cell; 2] {
        [self.start, self.end]
    }

    fn check_direction(&self) -> Result<(), GameError> {
        let ordered = match self.kind {
            ObstacleKind::Advancing => self.start < self.end,
            ObstacleKind::Penalizing => self.start > self.end,
        };
        if ordered {
            Ok(())
        } else {
            Err(GameError::InvalidState(format!(
                "{} from {} to {} points the wrong way",
                self.kind.label(),
                self.start,
                self.end
            )))
        }
    }
}

/// Result of landing on a trigger cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleHit {
    pub kind: ObstacleKind,
    pub from: Cell,
    pub to: Cell,
}

/// The set of obstacles on the board. Built once per game, read-only during play.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObstacleRegistry {
    obstacles: Vec<Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `count` obstacles, alternating Munro and Selkie starting with a Munro.
    ///
    /// Every endpoint is drawn uniformly from the interior cells and no cell
    /// is used twice across the whole set. Each draw gives up after
    /// `max_attempts` collisions.
    pub fn generate(
        count: usize,
        board: &Board,
        rng: &mut GameRng,
        max_attempts: usize,
    ) -> Result<Self, GameError> {
        let available = board.interior_cells().count();
        if count * 2 > available {
            return Err(GameError::TooManyObstacles { count, available });
        }

        let mut used: HashSet<Cell> = HashSet::with_capacity(count * 2);
        let exhausted = GameError::ObstacleGeneration {
            count,
            attempts: max_attempts,
        };

        let mut obstacles = Vec::with_capacity(count);
        for index in 0..count {
            let kind = if index % 2 == 0 {
                ObstacleKind::Advancing
            } else {
                ObstacleKind::Penalizing
            };
            let a = draw_unused(rng, &mut used, board, max_attempts)
                .ok_or_else(|| exhausted.clone())?;
            let b = draw_unused(rng, &mut used, board, max_attempts)
                .ok_or_else(|| exhausted.clone())?;
            let obstacle = Obstacle::from_pair(kind, a, b)?;
            debug!(
                kind = kind.label(),
                start = obstacle.start,
                end = obstacle.end,
                "obstacle placed"
            );
            obstacles.push(obstacle);
        }

        Ok(Self { obstacles })
    }

    /// Rebuild a registry from stored obstacles, re-checking every invariant
    /// against `board`.
    pub fn from_obstacles(obstacles: Vec<Obstacle>, board: &Board) -> Result<Self, GameError> {
        let interior = board.interior_cells();
        let mut used: HashSet<Cell> = HashSet::with_capacity(obstacles.len() * 2);
        for obstacle in &obstacles {
            obstacle.check_direction()?;
            for cell in obstacle.cells() {
                if !interior.contains(&cell) {
                    return Err(GameError::InvalidState(format!(
                        "obstacle cell {cell} outside {}..={}",
                        interior.start(),
                        interior.end()
                    )));
                }
                if !used.insert(cell) {
                    return Err(GameError::InvalidState(format!(
                        "cell {cell} is shared by two obstacles"
                    )));
                }
            }
        }
        Ok(Self { obstacles })
    }

    /// Where a player landing on `position` ends up, if an obstacle triggers there.
    pub fn resolve(&self, position: Cell) -> Option<Cell> {
        self.hit(position).map(|hit| hit.to)
    }

    /// Like [`ObstacleRegistry::resolve`] but reports which obstacle fired.
    pub fn hit(&self, position: Cell) -> Option<ObstacleHit> {
        self.obstacles
            .iter()
            .find(|obstacle| obstacle.start == position)
            .map(|obstacle| ObstacleHit {
                kind: obstacle.kind,
                from: obstacle.start,
                to: obstacle.end,
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }

    pub fn to_vec(&self) -> Vec<Obstacle> {
        self.obstacles.clone()
    }
}

/// Draw an interior cell not yet in `used`, marking it used.
fn draw_unused(
    rng: &mut GameRng,
    used: &mut HashSet<Cell>,
    board: &Board,
    max_attempts: usize,
) -> Option<Cell> {
    let interior = board.interior_cells();
    (0..max_attempts.max(1))
        .map(|_| rng.gen_range_inclusive(*interior.start(), *interior.end()))
        .find(|cell| used.insert(*cell))
}
