#![allow(missing_docs)]

//! Players and the ordered player registry.
//!
//! Turn order follows serial numbers, which are a random permutation of
//! `1..=N` handed out when a game starts. Insertion order carries no meaning.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{board::Cell, error::GameError, rng::GameRng};

/// Serial number of a player. 1-based and unique within a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Raw serial number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token shape drawn for a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Star,
    Square,
    Circle,
    Triangle,
    Diamond,
}

impl Icon {
    /// All icons in selector order.
    pub const ALL: [Icon; 5] = [
        Icon::Star,
        Icon::Square,
        Icon::Circle,
        Icon::Triangle,
        Icon::Diamond,
    ];

    /// Icon for a selector index. Unknown indices fall back to [`Icon::Circle`].
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Icon::Circle)
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|icon| *icon == self)
            .unwrap_or_default()
    }

    /// Uniformly random icon.
    pub fn random(rng: &mut GameRng) -> Self {
        Self::from_index(rng.gen_range_inclusive(0, Self::ALL.len() - 1))
    }

    /// Next icon in selector order, wrapping around.
    pub fn next(self) -> Self {
        Self::from_index((self.index() + 1) % Self::ALL.len())
    }

    /// Single character used by text front ends.
    pub fn glyph(self) -> char {
        match self {
            Icon::Star => '★',
            Icon::Square => '■',
            Icon::Circle => '●',
            Icon::Triangle => '▲',
            Icon::Diamond => '◆',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Icon::Star => "Star",
            Icon::Square => "Square",
            Icon::Circle => "Circle",
            Icon::Triangle => "Triangle",
            Icon::Diamond => "Diamond",
        }
    }
}

/// What the caller supplies for each seat when starting a game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerDescriptor {
    /// Display name. Blank names are replaced with `Player <n>`.
    pub name: String,
    /// Chosen icon. `None` picks one at random.
    pub icon: Option<Icon>,
}

impl PlayerDescriptor {
    /// Descriptor with an explicit name and icon.
    pub fn new(name: impl Into<String>, icon: Icon) -> Self {
        Self {
            name: name.into(),
            icon: Some(icon),
        }
    }
}

/// A player taking part in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    icon: Icon,
    position: Cell,
    steps: u32,
    active: bool,
}

impl Player {
    /// Player standing on the start cell with no steps taken.
    pub fn new(id: PlayerId, name: impl Into<String>, icon: Icon) -> Self {
        Self {
            id,
            name: name.into(),
            icon,
            position: 0,
            steps: 0,
            active: false,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> Icon {
        self.icon
    }

    pub fn position(&self) -> Cell {
        self.position
    }

    /// Number of position changes made so far.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Put the player on `cell`, counting one step. The counter saturates
    /// rather than wrapping.
    pub fn move_to(&mut self, cell: Cell) {
        self.position = cell;
        self.steps = self.steps.saturating_add(1);
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_id(&mut self, id: PlayerId) {
        self.id = id;
    }

    #[cfg(test)]
    pub(crate) fn set_steps(&mut self, steps: u32) {
        self.steps = steps;
    }
}

/// Ordered collection of players with exactly one active seat during play.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerRegistry {
    players: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from descriptors, assigning shuffled serial numbers
    /// and activating serial number 1.
    pub fn from_descriptors(descriptors: &[PlayerDescriptor], rng: &mut GameRng) -> Self {
        let mut registry = Self::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            let name = descriptor.name.trim();
            let name = if name.is_empty() {
                format!("Player {}", index + 1)
            } else {
                name.to_string()
            };
            let icon = descriptor.icon.unwrap_or_else(|| Icon::random(rng));
            registry.add(Player::new(PlayerId::new(0), name, icon));
        }
        registry.assign_serials(rng);
        registry.activate(PlayerId::new(1));
        registry
    }

    /// Rebuild a roster from stored players, checking serial numbers and
    /// the single-active-player rule. Activates serial 1 when nobody is active.
    pub fn from_players(players: Vec<Player>, last_cell: Cell) -> Result<Self, GameError> {
        let count = players.len();
        let mut seen = vec![false; count];
        for player in &players {
            let serial = player.id.get() as usize;
            if serial == 0 || serial > count {
                return Err(GameError::InvalidState(format!(
                    "player serial {serial} outside 1..={count}"
                )));
            }
            if std::mem::replace(&mut seen[serial - 1], true) {
                return Err(GameError::InvalidState(format!(
                    "duplicate player serial {serial}"
                )));
            }
            if player.position > last_cell {
                return Err(GameError::InvalidState(format!(
                    "player {} stands on cell {} beyond {last_cell}",
                    player.id, player.position
                )));
            }
        }

        let active = players.iter().filter(|player| player.active).count();
        if active > 1 {
            return Err(GameError::InvalidState(format!(
                "{active} players are marked active"
            )));
        }

        let mut registry = Self { players };
        if active == 0 && !registry.is_empty() {
            registry.activate(PlayerId::new(1));
        }
        Ok(registry)
    }

    pub fn add(&mut self, player: Player) {
        self.players.push(player);
    }

    /// Drop every player.
    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Players in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Players sorted by serial number, i.e. in turn order.
    pub fn in_turn_order(&self) -> Vec<&Player> {
        let mut ordered: Vec<&Player> = self.players.iter().collect();
        ordered.sort_by_key(|player| player.id);
        ordered
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    /// The player whose turn it is.
    pub fn active(&self) -> Option<&Player> {
        self.players.iter().find(|player| player.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.active)
    }

    /// Hand the turn to the next serial number, wrapping from the highest back to 1.
    pub fn advance(&mut self) -> Option<PlayerId> {
        let current = self.active()?.id;
        let next = if current.get() as usize >= self.players.len() {
            PlayerId::new(1)
        } else {
            PlayerId::new(current.get() + 1)
        };
        self.activate(next);
        Some(next)
    }

    /// Give serial numbers `1..=N` to the players in a shuffled order.
    pub fn assign_serials(&mut self, rng: &mut GameRng) {
        let mut order: Vec<u8> = (1..=self.players.len() as u8).collect();
        rng.shuffle(&mut order);
        for (player, serial) in self.players.iter_mut().zip(order) {
            player.set_id(PlayerId::new(serial));
        }
    }

    fn activate(&mut self, id: PlayerId) {
        for player in &mut self.players {
            player.set_active(player.id == id);
        }
    }

    /// Copy of every player, in insertion order.
    pub fn to_vec(&self) -> Vec<Player> {
        self.players.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(count: usize, seed: u64) -> PlayerRegistry {
        let descriptors: Vec<PlayerDescriptor> = (0..count)
            .map(|i| PlayerDescriptor::new(format!("P{i}"), Icon::from_index(i)))
            .collect();
        PlayerRegistry::from_descriptors(&descriptors, &mut GameRng::new(seed))
    }

    #[test]
    fn serials_are_a_permutation() {
        for seed in 0..20 {
            let registry = roster(5, seed);
            let mut serials: Vec<u8> = registry.iter().map(|p| p.id().get()).collect();
            serials.sort_unstable();
            assert_eq!(serials, vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn serial_one_starts() {
        let registry = roster(4, 9);
        let active: Vec<_> = registry.iter().filter(|p| p.is_active()).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), PlayerId::new(1));
    }

    #[test]
    fn rotation_wraps_to_first_serial() {
        let mut registry = roster(3, 4);
        let order: Vec<u8> = (0..4)
            .map(|_| registry.advance().map(PlayerId::get).unwrap_or_default())
            .collect();
        assert_eq!(order, vec![2, 3, 1, 2]);
    }

    #[test]
    fn blank_names_get_defaults() {
        let descriptors = vec![
            PlayerDescriptor {
                name: "  ".to_string(),
                icon: None,
            },
            PlayerDescriptor::new("Morag", Icon::Star),
        ];
        let registry = PlayerRegistry::from_descriptors(&descriptors, &mut GameRng::new(3));
        let names: Vec<&str> = registry.iter().map(Player::name).collect();
        assert_eq!(names, vec!["Player 1", "Morag"]);
    }

    #[test]
    fn empty_registry_has_no_active_player() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.active().is_none());
        assert!(registry.advance().is_none());
    }

    #[test]
    fn move_to_counts_steps() {
        let mut player = Player::new(PlayerId::new(1), "Ailsa", Icon::Diamond);
        player.move_to(4);
        player.move_to(17);
        assert_eq!(player.position(), 17);
        assert_eq!(player.steps(), 2);
    }

    #[test]
    fn from_players_rejects_duplicate_serials() {
        let players = vec![
            Player::new(PlayerId::new(1), "A", Icon::Star),
            Player::new(PlayerId::new(1), "B", Icon::Star),
        ];
        let err = PlayerRegistry::from_players(players, 99).unwrap_err();
        assert!(matches!(err, GameError::InvalidState(_)));
    }

    #[test]
    fn from_players_activates_first_serial_when_none_active() {
        let players = vec![
            Player::new(PlayerId::new(2), "A", Icon::Star),
            Player::new(PlayerId::new(1), "B", Icon::Square),
        ];
        let registry = PlayerRegistry::from_players(players, 99).unwrap();
        assert_eq!(registry.active().map(Player::name), Some("B"));
    }

    #[test]
    fn icon_index_falls_back_to_circle() {
        assert_eq!(Icon::from_index(0), Icon::Star);
        assert_eq!(Icon::from_index(4), Icon::Diamond);
        assert_eq!(Icon::from_index(42), Icon::Circle);
        assert_eq!(Icon::Diamond.next(), Icon::Star);
    }
}
