//! Turn engine: moves the active player, applies obstacles and detects wins.
//!
//! The engine owns every piece of mutable game state, including its RNG, so
//! nothing lives in globals. A turn runs start to finish inside
//! [`GameEngine::apply_roll`]; the player is moved by the die, moved once more
//! if they landed on a trigger cell, and then either wins or hands the turn on.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    board::{Board, Cell, Occupancy, DEFAULT_SIDE},
    error::GameError,
    obstacle::{ObstacleHit, ObstacleRegistry},
    player::{Player, PlayerDescriptor, PlayerId, PlayerRegistry},
    rng::{GameRng, DIE_FACES},
    state::GameState,
};

/// Fewest players any game can have, whatever the configured rules say.
pub const MIN_PLAYERS: usize = 2;

/// Table rules the engine is built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// Cells along one side of the square board.
    pub board_side: usize,
    /// Obstacles placed at the start of every game.
    pub obstacle_count: usize,
    /// Fewest players a game can start with.
    pub min_players: usize,
    /// Most players a game can start with.
    pub max_players: usize,
    /// Retry cap for each obstacle endpoint draw.
    pub max_draw_attempts: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            board_side: DEFAULT_SIDE,
            obstacle_count: 10,
            min_players: 2,
            max_players: 5,
            max_draw_attempts: 1000,
        }
    }
}

/// Where the game stands between user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No players; a new game or a load is needed.
    NoGame,
    /// The active player may roll.
    AwaitingRoll,
    /// A player reached the last cell. Rolls are refused until the win is
    /// acknowledged and a new game is started.
    Won {
        /// Serial number of the winner.
        winner: PlayerId,
    },
}

/// Everything a front end needs to animate one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Player who rolled.
    pub player: PlayerId,
    /// Face shown by the die.
    pub die: u8,
    /// Cells occupied during the turn: start, landing cell and, after an
    /// obstacle, its target.
    pub path: Vec<Cell>,
    /// Obstacle that fired, if any.
    pub obstacle: Option<ObstacleHit>,
    /// Set when the roll won the game.
    pub winner: Option<PlayerId>,
}

impl TurnOutcome {
    /// Cell the player finished the turn on.
    pub fn final_cell(&self) -> Cell {
        self.path.last().copied().unwrap_or_default()
    }
}

/// Owns the board, both registries and the turn state machine.
#[derive(Debug, Clone)]
pub struct GameEngine {
    rules: GameRules,
    board: Board,
    players: PlayerRegistry,
    obstacles: ObstacleRegistry,
    occupancy: Occupancy,
    rng: GameRng,
    phase: TurnPhase,
    last_roll: Option<u8>,
}

impl GameEngine {
    /// Create an idle engine. No game is running until [`GameEngine::new_game`]
    /// or [`GameEngine::restore`] succeeds.
    pub fn new(rules: GameRules, rng: GameRng) -> Self {
        let board = Board::new(rules.board_side);
        Self {
            occupancy: Occupancy::new(&board),
            rules,
            board,
            players: PlayerRegistry::new(),
            obstacles: ObstacleRegistry::new(),
            rng,
            phase: TurnPhase::NoGame,
            last_roll: None,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn obstacles(&self) -> &ObstacleRegistry {
        &self.obstacles
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Face of the most recent roll in the current game.
    pub fn last_roll(&self) -> Option<u8> {
        self.last_roll
    }

    /// Player whose turn it is. `None` when no game is running.
    pub fn active_player(&self) -> Option<&Player> {
        match self.phase {
            TurnPhase::NoGame => None,
            _ => self.players.active(),
        }
    }

    pub fn winner(&self) -> Option<&Player> {
        match self.phase {
            TurnPhase::Won { winner } => self.players.get(winner),
            _ => None,
        }
    }

    /// Players standing on `cell`.
    pub fn occupants(&self, cell: Cell) -> &[PlayerId] {
        self.occupancy.occupants(cell)
    }

    /// Start a fresh game for the given seats.
    ///
    /// Serial numbers are shuffled, serial 1 moves first, and a new obstacle
    /// set is drawn. On error the current game is left as it was.
    pub fn new_game(&mut self, descriptors: &[PlayerDescriptor]) -> Result<GameState, GameError> {
        let found = descriptors.len();
        let min = self.rules.min_players.max(MIN_PLAYERS);
        if found < min {
            return Err(GameError::TooFewPlayers { min, found });
        }
        if found > self.rules.max_players {
            return Err(GameError::TooManyPlayers {
                max: self.rules.max_players,
                found,
            });
        }

        let obstacles = ObstacleRegistry::generate(
            self.rules.obstacle_count,
            &self.board,
            &mut self.rng,
            self.rules.max_draw_attempts,
        )?;
        let players = PlayerRegistry::from_descriptors(descriptors, &mut self.rng);

        self.install(players, obstacles);
        info!(
            players = self.players.len(),
            obstacles = self.obstacles.len(),
            "new game started"
        );
        Ok(self.snapshot())
    }

    /// Roll the die for the active player and play out the turn.
    pub fn roll_and_move(&mut self) -> Result<TurnOutcome, GameError> {
        self.ensure_can_roll()?;
        let die = self.rng.roll_die();
        self.apply_roll(die)
    }

    /// Play out a turn with a known die face.
    pub fn apply_roll(&mut self, die: u8) -> Result<TurnOutcome, GameError> {
        if !(1..=DIE_FACES).contains(&die) {
            return Err(GameError::InvalidDieValue(die));
        }
        self.ensure_can_roll()?;

        let board = self.board;
        let player = self
            .players
            .active_mut()
            .ok_or(GameError::NoGameInProgress)?;
        let id = player.id();
        let from = player.position();
        let mut path = vec![from];

        let landed = board.advance(from, usize::from(die));
        player.move_to(landed);
        self.occupancy.relocate(id, from, landed);
        path.push(landed);

        // Single resolution pass: the target of an obstacle never triggers another.
        let obstacle = self.obstacles.hit(landed);
        if let Some(hit) = obstacle {
            player.move_to(hit.to);
            self.occupancy.relocate(id, landed, hit.to);
            path.push(hit.to);
        }

        let finish = player.position();
        self.last_roll = Some(die);
        debug!(player = %id, die, ?path, ?obstacle, "turn played");

        let winner = if finish == board.last_cell() {
            self.phase = TurnPhase::Won { winner: id };
            info!(player = %id, name = player.name(), steps = player.steps(), "player won");
            Some(id)
        } else {
            self.players.advance();
            None
        };

        Ok(TurnOutcome {
            player: id,
            die,
            path,
            obstacle,
            winner,
        })
    }

    /// Clear a finished game. Returns `false` if the game was not won.
    pub fn acknowledge_win(&mut self) -> bool {
        if matches!(self.phase, TurnPhase::Won { .. }) {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Discard players, obstacles and occupancy.
    pub fn reset(&mut self) {
        self.players.clear();
        self.obstacles.clear();
        self.occupancy.clear();
        self.phase = TurnPhase::NoGame;
        self.last_roll = None;
    }

    /// Copy of the current players and obstacles.
    pub fn snapshot(&self) -> GameState {
        GameState {
            players: self.players.to_vec(),
            obstacles: self.obstacles.to_vec(),
        }
    }

    /// Replace the current game with a stored one.
    ///
    /// Every invariant is checked against the live board first; on error the
    /// running game is untouched.
    pub fn restore(&mut self, state: GameState) -> Result<(), GameError> {
        let last = self.board.last_cell();
        let count = state.players.len();
        if count > 0 && count < MIN_PLAYERS {
            return Err(GameError::InvalidState(format!(
                "{count} player cannot make a game, at least {MIN_PLAYERS} are needed"
            )));
        }
        if count > self.rules.max_players {
            return Err(GameError::InvalidState(format!(
                "{} players exceed the table limit of {}",
                state.players.len(),
                self.rules.max_players
            )));
        }
        let obstacles = ObstacleRegistry::from_obstacles(state.obstacles, &self.board)?;
        let players = PlayerRegistry::from_players(state.players, last)?;

        self.install(players, obstacles);
        if let Some(winner) = self.players.iter().find(|player| player.position() == last) {
            self.phase = TurnPhase::Won {
                winner: winner.id(),
            };
        }
        info!(
            players = self.players.len(),
            obstacles = self.obstacles.len(),
            "game restored"
        );
        Ok(())
    }

    fn install(&mut self, players: PlayerRegistry, obstacles: ObstacleRegistry) {
        self.occupancy.clear();
        for player in players.in_turn_order() {
            self.occupancy.place(player.id(), player.position());
        }
        self.phase = if players.is_empty() {
            TurnPhase::NoGame
        } else {
            TurnPhase::AwaitingRoll
        };
        self.players = players;
        self.obstacles = obstacles;
        self.last_roll = None;
    }

    fn ensure_can_roll(&self) -> Result<(), GameError> {
        match self.phase {
            TurnPhase::AwaitingRoll => Ok(()),
            TurnPhase::NoGame => Err(GameError::NoGameInProgress),
            TurnPhase::Won { winner } => Err(GameError::GameOver { winner }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        obstacle::{Obstacle, ObstacleKind},
        player::Icon,
    };
    use proptest::prelude::*;

    fn seats(count: usize) -> Vec<PlayerDescriptor> {
        (0..count)
            .map(|i| PlayerDescriptor::new(format!("Seat {i}"), Icon::from_index(i)))
            .collect()
    }

    fn engine(seed: u64) -> GameEngine {
        GameEngine::new(GameRules::default(), GameRng::new(seed))
    }

    /// Two players, serial 1 on `position`, serial 2 on the start cell.
    fn staged(position: Cell, obstacles: Vec<Obstacle>) -> GameEngine {
        let mut first = Player::new(PlayerId::new(1), "Isla", Icon::Star);
        if position > 0 {
            first.move_to(position);
        }
        let second = Player::new(PlayerId::new(2), "Euan", Icon::Square);
        let mut engine = engine(0);
        engine
            .restore(GameState {
                players: vec![first, second],
                obstacles,
            })
            .unwrap();
        engine
    }

    #[test]
    fn new_game_needs_two_players() {
        let mut engine = engine(1);
        let err = engine.new_game(&seats(1)).unwrap_err();
        assert_eq!(err, GameError::TooFewPlayers { min: 2, found: 1 });
        assert_eq!(engine.phase(), TurnPhase::NoGame);
        assert!(engine.players().is_empty());
    }

    #[test]
    fn rules_cannot_lower_the_two_player_floor() {
        let rules = GameRules {
            min_players: 1,
            ..GameRules::default()
        };
        let mut engine = GameEngine::new(rules, GameRng::new(1));
        let err = engine.new_game(&seats(1)).unwrap_err();
        assert_eq!(err, GameError::TooFewPlayers { min: 2, found: 1 });
        assert_eq!(engine.phase(), TurnPhase::NoGame);
    }

    #[test]
    fn restoring_a_lone_player_is_refused() {
        let mut engine = engine(1);
        let lone = GameState {
            players: vec![Player::new(PlayerId::new(1), "Solo", Icon::Star)],
            obstacles: Vec::new(),
        };
        assert!(matches!(
            engine.restore(lone),
            Err(GameError::InvalidState(_))
        ));
        assert_eq!(engine.phase(), TurnPhase::NoGame);

        engine.restore(GameState::default()).unwrap();
        assert_eq!(engine.phase(), TurnPhase::NoGame);
    }

    #[test]
    fn exhausted_step_counter_does_not_overflow() {
        let mut engine = staged(10, Vec::new());
        let mut state = engine.snapshot();
        for player in &mut state.players {
            player.set_steps(u32::MAX);
        }
        engine.restore(state).unwrap();
        let outcome = engine.apply_roll(3).unwrap();
        let player = engine.players().get(outcome.player).unwrap();
        assert_eq!(player.position(), 13);
        assert_eq!(player.steps(), u32::MAX);
    }

    #[test]
    fn new_game_caps_players() {
        let mut engine = engine(1);
        let err = engine.new_game(&seats(6)).unwrap_err();
        assert_eq!(err, GameError::TooManyPlayers { max: 5, found: 6 });
    }

    #[test]
    fn failed_new_game_keeps_running_game() {
        let mut engine = engine(2);
        engine.new_game(&seats(3)).unwrap();
        let before = engine.snapshot();
        assert!(engine.new_game(&seats(1)).is_err());
        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.phase(), TurnPhase::AwaitingRoll);
    }

    #[test]
    fn new_game_sets_up_board() {
        let mut engine = engine(3);
        let state = engine.new_game(&seats(4)).unwrap();
        assert_eq!(state.players.len(), 4);
        assert_eq!(state.obstacles.len(), 10);
        assert_eq!(engine.occupants(0).len(), 4);
        assert_eq!(engine.active_player().map(Player::id), Some(PlayerId::new(1)));
    }

    #[test]
    fn rolling_without_game_is_refused() {
        let mut engine = engine(4);
        assert_eq!(engine.roll_and_move(), Err(GameError::NoGameInProgress));
    }

    #[test]
    fn die_value_is_validated() {
        let mut engine = staged(0, Vec::new());
        assert_eq!(engine.apply_roll(0), Err(GameError::InvalidDieValue(0)));
        assert_eq!(engine.apply_roll(7), Err(GameError::InvalidDieValue(7)));
    }

    #[test]
    fn overshoot_bounces_back() {
        let mut engine = staged(95, Vec::new());
        let outcome = engine.apply_roll(6).unwrap();
        assert_eq!(outcome.path, vec![95, 97]);
        assert_eq!(outcome.winner, None);
        assert_eq!(engine.players().get(PlayerId::new(1)).unwrap().position(), 97);
    }

    #[test]
    fn munro_jump_counts_as_a_second_step() {
        let munro = Obstacle::new(ObstacleKind::Advancing, 3, 20).unwrap();
        let mut engine = staged(0, vec![munro]);
        let outcome = engine.apply_roll(3).unwrap();
        assert_eq!(outcome.path, vec![0, 3, 20]);
        assert_eq!(
            outcome.obstacle,
            Some(ObstacleHit {
                kind: ObstacleKind::Advancing,
                from: 3,
                to: 20
            })
        );
        let player = engine.players().get(PlayerId::new(1)).unwrap();
        assert_eq!(player.position(), 20);
        assert_eq!(player.steps(), 2);
        assert_eq!(engine.occupants(20), &[PlayerId::new(1)]);
        assert!(engine.occupants(3).is_empty());
    }

    #[test]
    fn selkie_drags_player_down() {
        let selkie = Obstacle::new(ObstacleKind::Penalizing, 50, 7).unwrap();
        let mut engine = staged(46, vec![selkie]);
        let outcome = engine.apply_roll(4).unwrap();
        assert_eq!(outcome.final_cell(), 7);
    }

    #[test]
    fn landing_on_obstacle_target_does_nothing() {
        let munro = Obstacle::new(ObstacleKind::Advancing, 3, 20).unwrap();
        let mut engine = staged(17, vec![munro]);
        let outcome = engine.apply_roll(3).unwrap();
        assert_eq!(outcome.path, vec![17, 20]);
        assert!(outcome.obstacle.is_none());
    }

    #[test]
    fn exact_landing_wins_and_locks_the_board() {
        let mut engine = staged(97, Vec::new());
        let outcome = engine.apply_roll(2).unwrap();
        assert_eq!(outcome.winner, Some(PlayerId::new(1)));
        assert_eq!(
            engine.phase(),
            TurnPhase::Won {
                winner: PlayerId::new(1)
            }
        );
        assert_eq!(engine.winner().map(Player::name), Some("Isla"));
        assert_eq!(
            engine.roll_and_move(),
            Err(GameError::GameOver {
                winner: PlayerId::new(1)
            })
        );

        assert!(engine.acknowledge_win());
        assert_eq!(engine.phase(), TurnPhase::NoGame);
        assert_eq!(engine.roll_and_move(), Err(GameError::NoGameInProgress));

        engine.new_game(&seats(2)).unwrap();
        assert!(engine.roll_and_move().is_ok());
    }

    #[test]
    fn turns_cycle_back_to_first_serial() {
        let mut engine = engine(5);
        engine.new_game(&seats(3)).unwrap();
        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(engine.roll_and_move().unwrap().player.get());
        }
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(engine.active_player().map(Player::id), Some(PlayerId::new(1)));
    }

    #[test]
    fn failed_restore_leaves_game_untouched() {
        let mut engine = engine(6);
        engine.new_game(&seats(2)).unwrap();
        engine.roll_and_move().unwrap();
        let before = engine.snapshot();

        let bad = GameState {
            players: vec![Player::new(PlayerId::new(3), "Ghost", Icon::Circle)],
            obstacles: Vec::new(),
        };
        assert!(engine.restore(bad).is_err());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn restore_rebuilds_occupancy_and_phase() {
        let mut engine = engine(7);
        engine.new_game(&seats(3)).unwrap();
        for _ in 0..4 {
            if engine.roll_and_move().unwrap().winner.is_some() {
                break;
            }
        }
        let saved = engine.snapshot();

        let mut other = GameEngine::new(GameRules::default(), GameRng::new(99));
        other.restore(saved.clone()).unwrap();
        assert_eq!(other.snapshot(), saved);
        assert_eq!(other.phase(), engine.phase());
        for player in other.players().iter() {
            assert!(other.occupants(player.position()).contains(&player.id()));
        }
        assert_eq!(
            other.active_player().map(Player::id),
            engine.active_player().map(Player::id)
        );
    }

    #[test]
    fn restoring_a_finished_game_reports_the_winner() {
        let engine = staged(99, Vec::new());
        assert_eq!(
            engine.phase(),
            TurnPhase::Won {
                winner: PlayerId::new(1)
            }
        );
    }

    proptest! {
        #[test]
        fn positions_stay_on_board(seed in any::<u64>(), rolls in prop::collection::vec(1u8..=6, 1..200)) {
            let mut engine = engine(seed);
            engine.new_game(&seats(3)).unwrap();
            for die in rolls {
                let steps_before: u32 = engine.players().iter().map(Player::steps).sum();
                let outcome = engine.apply_roll(die).unwrap();
                let steps_after: u32 = engine.players().iter().map(Player::steps).sum();

                prop_assert!(outcome.path.iter().all(|cell| *cell <= 99));
                prop_assert!(outcome.path.len() == 2 || outcome.path.len() == 3);
                prop_assert_eq!(steps_after - steps_before, outcome.path.len() as u32 - 1);
                if outcome.winner.is_some() {
                    break;
                }
            }
        }
    }
}
