use std::{cmp, collections::HashMap, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use munros_core::{
    AppConfig, Cell, DiceTimer, Game, GameError, Icon, ObstacleKind, PlayerDescriptor, SaveEntry,
    SaveError, TurnOutcome, TurnPhase,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::dice_face;

const TICK_RATE: Duration = Duration::from_millis(120);
const MAX_PLAYER_NAME_LEN: usize = 24;
const MAX_SAVE_NAME_LEN: usize = 64;
const CELL_WIDTH: u16 = 6;

#[derive(Debug, Clone)]
struct Theme {
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
    munro: Color,
    selkie: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            munro: Color::Green,
            selkie: Color::Magenta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Setup,
    Play,
    Saves,
}

/// Single-line text field with a cursor.
#[derive(Debug, Clone)]
struct TextInput {
    input: String,
    cursor: usize,
    limit: usize,
}

impl TextInput {
    fn new(limit: usize) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            limit,
        }
    }

    fn with_value(value: &str, limit: usize) -> Self {
        let mut field = Self::new(limit);
        for ch in value.chars() {
            field.insert(ch);
        }
        field
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.input.len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    fn insert(&mut self, ch: char) {
        if self.input.len() >= self.limit {
            return;
        }
        // ASCII only, so byte offsets and char offsets agree.
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.input.insert(self.cursor, ch);
            self.cursor += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.input.len() {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }

    fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn value(&self) -> &str {
        self.input.trim()
    }

    /// Apply an editing key. Returns `false` for keys the field does not use.
    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.insert(ch)
            }
            _ => return false,
        }
        true
    }
}

/// Seats collected before a game starts.
#[derive(Debug, Clone)]
struct SetupState {
    name: TextInput,
    icon: Icon,
    seats: Vec<PlayerDescriptor>,
}

impl Default for SetupState {
    fn default() -> Self {
        Self {
            name: TextInput::new(MAX_PLAYER_NAME_LEN),
            icon: Icon::Star,
            seats: Vec::new(),
        }
    }
}

impl SetupState {
    fn add_seat(&mut self) {
        let seat = PlayerDescriptor::new(self.name.value(), self.icon);
        self.seats.push(seat);
        self.name.clear();
        self.icon = self.icon.next();
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    DiceSettled,
}

/// Terminal front end for Munros & Selkies.
pub struct MunrosApp {
    game: Game,
    dice: DiceTimer,
    screen: Screen,
    setup: SetupState,
    saves: Vec<SaveEntry>,
    saves_cursor: usize,
    save_prompt: Option<TextInput>,
    show_help: bool,
    rolling: bool,
    tick: u64,
    last_outcome: Option<TurnOutcome>,
    win_banner: Option<String>,
    status: String,
    should_quit: bool,
    theme: Theme,
    event_tx: Option<mpsc::Sender<AppEvent>>,
}

impl MunrosApp {
    pub fn new(game: Game, config: &AppConfig) -> Self {
        Self {
            game,
            dice: DiceTimer::new(config.dice_delay()),
            screen: Screen::Setup,
            setup: SetupState::default(),
            saves: Vec::new(),
            saves_cursor: 0,
            save_prompt: None,
            show_help: false,
            rolling: false,
            tick: 0,
            last_outcome: None,
            win_banner: None,
            status: "Add players, then press F2 to start".to_string(),
            should_quit: false,
            theme: Theme::default(),
            event_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) || self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        info!("session ended");
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind != KeyEventKind::Release {
                    self.handle_key(key);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.tick = self.tick.wrapping_add(1);
                true
            }
            Some(AppEvent::DiceSettled) => {
                self.settle_roll();
                true
            }
            None => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.win_banner.is_some() {
            self.handle_win_key(key);
        } else if self.save_prompt.is_some() {
            self.handle_save_prompt_key(key);
        } else if self.show_help {
            self.show_help = false;
        } else {
            match self.screen {
                Screen::Setup => self.handle_setup_key(key),
                Screen::Play => self.handle_play_key(key),
                Screen::Saves => self.handle_saves_key(key),
            }
        }
    }

    fn handle_win_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            self.win_banner = None;
            self.game.acknowledge_win();
            self.last_outcome = None;
            self.screen = Screen::Setup;
            self.set_status("Game over. Add players for a new game");
        }
    }

    fn handle_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let max = self.game.engine().rules().max_players;
                if self.setup.seats.len() >= max {
                    self.set_status(format!("The table seats at most {max} players"));
                } else {
                    self.setup.add_seat();
                    self.set_status(format!("{} player(s) seated", self.setup.seats.len()));
                }
            }
            KeyCode::Tab => self.setup.icon = self.setup.icon.next(),
            KeyCode::F(2) => self.start_game(),
            KeyCode::F(3) => self.open_saves(),
            KeyCode::Esc => {
                self.setup = SetupState::default();
                if self.game.phase() == TurnPhase::AwaitingRoll {
                    self.screen = Screen::Play;
                    self.set_status("New game cancelled");
                } else {
                    self.set_status("Seats cleared");
                }
            }
            KeyCode::Delete if self.setup.name.value().is_empty() => {
                self.setup.seats.pop();
            }
            _ => {
                self.setup.name.handle_key(&key);
            }
        }
    }

    fn start_game(&mut self) {
        if self.roll_in_flight() {
            return;
        }
        match self.game.new_game(&self.setup.seats) {
            Ok(state) => {
                self.setup = SetupState::default();
                self.last_outcome = None;
                self.screen = Screen::Play;
                let first = self
                    .game
                    .engine()
                    .active_player()
                    .map(|player| player.name().to_string())
                    .unwrap_or_default();
                self.set_status(format!(
                    "{} players on the hill, {first} rolls first",
                    state.players.len()
                ));
            }
            Err(err) => self.set_status(format!("Cannot start: {err}")),
        }
    }

    fn handle_play_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') | KeyCode::Char(' ') => self.request_roll(),
            KeyCode::Char('n') => {
                if self.roll_in_flight() {
                    return;
                }
                self.setup = SetupState::default();
                self.screen = Screen::Setup;
                self.set_status("Add players, then press F2 to start");
            }
            KeyCode::Char('s') => {
                if self.game.phase() == TurnPhase::NoGame {
                    self.set_status("Nothing to save");
                } else {
                    self.save_prompt = Some(TextInput::with_value("Munros", MAX_SAVE_NAME_LEN));
                }
            }
            KeyCode::Char('l') => self.open_saves(),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_save_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.save_prompt.as_mut() else {
            return;
        };
        let name = match key.code {
            KeyCode::Esc => None,
            KeyCode::Enter => Some(prompt.value().to_string()),
            _ => {
                prompt.handle_key(&key);
                return;
            }
        };
        self.save_prompt = None;
        match self.game.save_game(name.as_deref()) {
            Ok(entry) => self.set_status(format!("Saved \"{}\"", entry.name)),
            Err(SaveError::Aborted) => {}
            Err(err) => {
                error!(%err, "save failed");
                self.set_status(format!("Save failed: {err}"));
            }
        }
    }

    fn open_saves(&mut self) {
        if self.roll_in_flight() {
            return;
        }
        match self.game.save_entries() {
            Ok(entries) => {
                self.saves = entries;
                self.saves_cursor = 0;
                self.screen = Screen::Saves;
                if self.saves.is_empty() {
                    self.set_status("No saves found");
                }
            }
            Err(err) => self.set_status(format!("Failed to list saves: {err}")),
        }
    }

    fn handle_saves_key(&mut self, key: KeyEvent) {
        let total = self.saves.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.saves_cursor = self.saves_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.saves_cursor = cmp::min(self.saves_cursor + 1, total.saturating_sub(1));
            }
            KeyCode::Enter => {
                if self.roll_in_flight() {
                    return;
                }
                let Some(entry) = self.saves.get(self.saves_cursor).cloned() else {
                    return;
                };
                match self.game.load_game(&entry) {
                    Ok(()) => {
                        self.last_outcome = None;
                        self.screen = Screen::Play;
                        self.set_status(format!("Loaded \"{}\"", entry.name));
                        if let TurnPhase::Won { .. } = self.game.phase() {
                            self.show_winner();
                        }
                    }
                    Err(err) => self.set_status(format!("Load failed: {err}")),
                }
            }
            KeyCode::Esc => self.leave_saves(),
            _ => {}
        }
    }

    fn leave_saves(&mut self) {
        self.screen = if self.game.phase() == TurnPhase::NoGame {
            Screen::Setup
        } else {
            Screen::Play
        };
    }

    /// A pending roll belongs to the current game, so anything that would
    /// replace that game waits for the die to settle.
    fn roll_in_flight(&mut self) -> bool {
        if self.rolling {
            self.set_status("Wait for the die to settle");
        }
        self.rolling
    }

    fn request_roll(&mut self) {
        if self.rolling {
            return;
        }
        match self.game.phase() {
            TurnPhase::AwaitingRoll => {}
            TurnPhase::NoGame => {
                self.set_status(GameError::NoGameInProgress.to_string());
                return;
            }
            TurnPhase::Won { .. } => {
                self.show_winner();
                return;
            }
        }
        let Some(sender) = self.event_tx.clone() else {
            return;
        };
        self.rolling = true;
        self.dice.spawn(sender, AppEvent::DiceSettled);
    }

    fn settle_roll(&mut self) {
        self.rolling = false;
        match self.game.roll_and_move() {
            Ok(outcome) => {
                let message = self.describe(&outcome);
                self.set_status(message);
                let won = outcome.winner.is_some();
                self.last_outcome = Some(outcome);
                if won {
                    self.show_winner();
                }
            }
            Err(err) => self.set_status(format!("Roll refused: {err}")),
        }
    }

    fn describe(&self, outcome: &TurnOutcome) -> String {
        let name = self
            .game
            .engine()
            .players()
            .get(outcome.player)
            .map(|player| player.name().to_string())
            .unwrap_or_else(|| format!("Player {}", outcome.player));
        let landed = outcome.path.get(1).copied().unwrap_or_default();
        let mut text = format!("{name} rolled {} and reached {}", outcome.die, landed + 1);
        if let Some(hit) = outcome.obstacle {
            let verb = match hit.kind {
                ObstacleKind::Advancing => "climbed a Munro",
                ObstacleKind::Penalizing => "was dragged down by a Selkie",
            };
            text.push_str(&format!(", {verb} to {}", hit.to + 1));
        }
        text
    }

    fn show_winner(&mut self) {
        if let Some(winner) = self.game.engine().winner() {
            self.win_banner = Some(format!(
                "{} {} reached the summit in {} steps!",
                winner.icon().glyph(),
                winner.name(),
                winner.steps()
            ));
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Setup => self.draw_setup(frame),
            Screen::Play => self.draw_play(frame),
            Screen::Saves => self.draw_saves(frame),
        }
        if self.show_help {
            self.render_help(frame);
        }
        if let Some(prompt) = &self.save_prompt {
            self.render_save_prompt(frame, prompt);
        }
        if let Some(banner) = &self.win_banner {
            self.render_win_modal(frame, banner);
        }
    }

    fn draw_setup(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(4),
                Constraint::Length(3),
            ])
            .split(frame.size());

        let input_line = Line::from(vec![
            Span::styled(
                format!("{} ", self.setup.icon.glyph()),
                Style::default().fg(self.theme.accent),
            ),
            Span::raw(self.setup.name.input.clone()),
        ]);
        let input = Paragraph::new(input_line).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Name (Enter add, Tab icon, F2 start, F3 load, Esc cancel)"),
        );
        frame.render_widget(input, chunks[0]);
        let cursor_x = (chunks[0].x + 3 + self.setup.name.cursor as u16)
            .min(chunks[0].x + chunks[0].width.saturating_sub(2));
        frame.set_cursor(cursor_x, chunks[0].y + 1);

        let rules = self.game.engine().rules();
        let items: Vec<ListItem> = if self.setup.seats.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "  No players yet",
                Style::default().fg(self.theme.muted),
            )))]
        } else {
            self.setup
                .seats
                .iter()
                .enumerate()
                .map(|(idx, seat)| {
                    let name = if seat.name.trim().is_empty() {
                        format!("Player {}", idx + 1)
                    } else {
                        seat.name.clone()
                    };
                    let glyph = seat.icon.map(Icon::glyph).unwrap_or('?');
                    ListItem::new(Line::from(format!("  {glyph} {name}")))
                })
                .collect()
        };
        let seats = List::new(items).block(Block::default().borders(Borders::ALL).title(format!(
            "Players {}/{} (min {})",
            self.setup.seats.len(),
            rules.max_players,
            rules.min_players
        )));
        frame.render_widget(seats, chunks[1]);
        self.render_status(frame, chunks[2]);
    }

    fn draw_play(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(3)])
            .split(frame.size());
        let side = u16::try_from(self.game.engine().board().side()).unwrap_or(u16::MAX);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(side.saturating_mul(CELL_WIDTH).saturating_add(2)),
                Constraint::Min(24),
            ])
            .split(rows[0]);
        let panes = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(dice_face::height() as u16 + 2),
                Constraint::Min(4),
            ])
            .split(columns[1]);

        self.render_board(frame, columns[0]);
        self.render_dice(frame, panes[0]);
        self.render_players(frame, panes[1]);
        self.render_status(frame, rows[1]);
    }

    fn render_board(&self, frame: &mut Frame, area: Rect) {
        let engine = self.game.engine();
        let board = engine.board();
        let mut markers: HashMap<Cell, (ObstacleKind, bool)> = HashMap::new();
        for obstacle in engine.obstacles().iter() {
            markers.insert(obstacle.start(), (obstacle.kind(), true));
            markers.insert(obstacle.end(), (obstacle.kind(), false));
        }
        let width = CELL_WIDTH as usize;

        let mut lines = Vec::with_capacity(board.side() * 2);
        for row in (0..board.side()).rev() {
            let mut numbers = Vec::with_capacity(board.side());
            let mut tokens = Vec::with_capacity(board.side());
            for col in 0..board.side() {
                let cell = board.grid_to_cell(row, col);
                let (marker, style) = match markers.get(&cell) {
                    Some((ObstacleKind::Advancing, true)) => ("^", Style::default().fg(self.theme.munro)),
                    Some((ObstacleKind::Advancing, false)) => ("*", Style::default().fg(self.theme.munro)),
                    Some((ObstacleKind::Penalizing, true)) => ("~", Style::default().fg(self.theme.selkie)),
                    Some((ObstacleKind::Penalizing, false)) => ("_", Style::default().fg(self.theme.selkie)),
                    None => (" ", Style::default().fg(self.theme.muted)),
                };
                let style = if cell == board.last_cell() {
                    style.fg(self.theme.warning).add_modifier(Modifier::BOLD)
                } else {
                    style
                };
                numbers.push(Span::styled(format!("{:>4}{marker} ", cell + 1), style));

                let glyphs: String = engine
                    .occupants(cell)
                    .iter()
                    .filter_map(|id| engine.players().get(*id))
                    .map(|player| player.icon().glyph())
                    .collect();
                tokens.push(Span::styled(
                    format!(" {:<w$}", truncate(&glyphs, width - 1), w = width - 1),
                    Style::default().fg(self.theme.accent),
                ));
            }
            lines.push(Line::from(numbers));
            lines.push(Line::from(tokens));
        }

        let title = format!(
            "Board  ^ Munro  ~ Selkie  ({} obstacles)",
            engine.obstacles().len()
        );
        let paragraph =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
    }

    fn render_dice(&self, frame: &mut Frame, area: Rect) {
        let face = if self.rolling {
            dice_face::spinning(self.tick)
        } else {
            dice_face::render(self.game.engine().last_roll().unwrap_or(0))
        };
        let lines: Vec<Line> = face.into_iter().map(Line::from).collect();
        let title = if self.rolling { "Rolling..." } else { "Die" };
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
    }

    fn render_players(&self, frame: &mut Frame, area: Rect) {
        let engine = self.game.engine();
        let active = engine.active_player().map(|player| player.id());
        let mut lines: Vec<Line> = engine
            .players()
            .in_turn_order()
            .into_iter()
            .map(|player| {
                let style = if Some(player.id()) == active {
                    Style::default()
                        .fg(self.theme.success)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let marker = if Some(player.id()) == active { "▶" } else { " " };
                Line::from(Span::styled(
                    format!(
                        "{marker} {} {:<12} cell {:>3}  steps {}",
                        player.icon().glyph(),
                        truncate(player.name(), 12),
                        player.position() + 1,
                        player.steps()
                    ),
                    style,
                ))
            })
            .collect();

        if let Some(outcome) = &self.last_outcome {
            lines.push(Line::from(""));
            let path: Vec<String> = outcome.path.iter().map(|cell| (cell + 1).to_string()).collect();
            lines.push(Line::from(Span::styled(
                format!("Last move: {}", path.join(" → ")),
                Style::default().fg(self.theme.muted),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Players"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_saves(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(frame.size());

        let total = self.saves.len();
        let mut list_state = ListState::default();
        if total > 0 {
            list_state.select(Some(self.saves_cursor.min(total - 1)));
        }

        let items: Vec<ListItem> = if total == 0 {
            vec![ListItem::new(Line::from("  No saves found"))]
        } else {
            self.saves
                .iter()
                .map(|entry| {
                    let timestamp = entry.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
                    ListItem::new(Line::from(format!(
                        "{}  [{} players, {}]",
                        entry.name, entry.players, timestamp
                    )))
                })
                .collect()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Load Game (Enter load, Esc back)"),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg))
            .highlight_symbol("▶ ");
        frame.render_stateful_widget(list, chunks[0], &mut list_state);
        self.render_status(frame, chunks[1]);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let style = if self.status.starts_with("Save failed")
            || self.status.starts_with("Load failed")
            || self.status.starts_with("Cannot")
        {
            Style::default().fg(self.theme.danger)
        } else {
            Style::default()
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(self.status.clone(), style)))
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame) {
        let area = centered_rect(48, 13, frame.size());
        frame.render_widget(Clear, area);
        let key = |label: &'static str| {
            Span::styled(
                format!("{label:<8}"),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
        };
        let lines = vec![
            Line::from(vec![key("r/space"), Span::raw("roll the die")]),
            Line::from(vec![key("n"), Span::raw("new game")]),
            Line::from(vec![key("s"), Span::raw("save game")]),
            Line::from(vec![key("l"), Span::raw("load game")]),
            Line::from(vec![key("?"), Span::raw("this help")]),
            Line::from(vec![key("q"), Span::raw("quit")]),
            Line::from(""),
            Line::from("Land on ^ to climb a Munro."),
            Line::from("Land on ~ and a Selkie drags you down."),
            Line::from("Reach the last cell exactly to win."),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_save_prompt(&self, frame: &mut Frame, prompt: &TextInput) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(60_u16, frame_area.width.saturating_sub(4)), 24_u16);
        let area = centered_rect(width, 6, frame_area);
        frame.render_widget(Clear, area);

        let input_line = Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::raw(prompt.input.clone()),
        ]);
        let helper = Line::from(vec![
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" save  "),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]);
        let paragraph = Paragraph::new(vec![input_line, Line::from(""), helper])
            .block(Block::default().borders(Borders::ALL).title("Save Game"));
        frame.render_widget(paragraph, area);

        let cursor_x =
            (area.x + 3 + prompt.cursor as u16).min(area.x + area.width.saturating_sub(2));
        frame.set_cursor(cursor_x, area.y + 1);
    }

    fn render_win_modal(&self, frame: &mut Frame, banner: &str) {
        let area = centered_rect(56, 7, frame.size());
        frame.render_widget(Clear, area);
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                banner.to_string(),
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to continue",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Summit!"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use munros_core::{GameEngine, GameRng, GameRules, SaveManager};
    use tempfile::tempdir;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(root: &std::path::Path) -> MunrosApp {
        let config = AppConfig {
            save_root: root.to_path_buf(),
            dice_delay_ms: 0,
            seed: Some(11),
            ..AppConfig::default()
        };
        let game = Game::new(
            GameEngine::new(GameRules::default(), GameRng::new(11)),
            SaveManager::new(root),
        );
        MunrosApp::new(game, &config)
    }

    fn type_text(app: &mut MunrosApp, text: &str) {
        for ch in text.chars() {
            app.handle_key(press(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut field = TextInput::with_value("Ben", 8);
        field.move_home();
        field.insert('A');
        field.move_end();
        field.backspace();
        assert_eq!(field.value(), "ABe");
        field.move_cursor(-10);
        field.delete();
        assert_eq!(field.value(), "Be");
        for ch in "abcdefghij".chars() {
            field.insert(ch);
        }
        assert_eq!(field.input.len(), 8);
    }

    #[test]
    fn setup_needs_two_players() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        type_text(&mut app, "Morag");
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::F(2)));
        assert_eq!(app.screen, Screen::Setup);
        assert!(app.status.starts_with("Cannot start"));

        type_text(&mut app, "Hamish");
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::F(2)));
        assert_eq!(app.screen, Screen::Play);
        assert_eq!(app.game.engine().players().len(), 2);
        assert!(app.setup.seats.is_empty());
    }

    #[test]
    fn escape_in_save_prompt_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        for name in ["Ailsa", "Rory"] {
            type_text(&mut app, name);
            app.handle_key(press(KeyCode::Enter));
        }
        app.handle_key(press(KeyCode::F(2)));
        let status = app.status.clone();

        app.handle_key(press(KeyCode::Char('s')));
        assert!(app.save_prompt.is_some());
        app.handle_key(press(KeyCode::Esc));
        assert!(app.save_prompt.is_none());
        assert_eq!(app.status, status);
        assert!(app.game.save_entries().unwrap().is_empty());

        app.handle_key(press(KeyCode::Char('s')));
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.game.save_entries().unwrap().len(), 1);
    }

    #[test]
    fn settled_roll_moves_the_active_player() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        for name in ["Ailsa", "Rory"] {
            type_text(&mut app, name);
            app.handle_key(press(KeyCode::Enter));
        }
        app.handle_key(press(KeyCode::F(2)));

        app.rolling = true;
        assert!(app.process_app_event(Some(AppEvent::DiceSettled)));
        assert!(!app.rolling);
        let outcome = app.last_outcome.as_ref().unwrap();
        assert_eq!(outcome.player.get(), 1);
        assert!((1..=6).contains(&outcome.die));
    }

    #[test]
    fn pending_roll_blocks_new_game_and_load() {
        let dir = tempdir().unwrap();
        let mut app = app(dir.path());
        for name in ["Ailsa", "Rory"] {
            type_text(&mut app, name);
            app.handle_key(press(KeyCode::Enter));
        }
        app.handle_key(press(KeyCode::F(2)));
        app.handle_key(press(KeyCode::Char('s')));
        app.handle_key(press(KeyCode::Enter));
        let before = app.game.engine().snapshot();

        app.rolling = true;
        app.handle_key(press(KeyCode::Char('n')));
        assert_eq!(app.screen, Screen::Play);
        assert_eq!(app.status, "Wait for the die to settle");
        app.handle_key(press(KeyCode::Char('l')));
        assert_eq!(app.screen, Screen::Play);
        app.start_game();
        assert_eq!(app.game.engine().snapshot(), before);

        app.screen = Screen::Saves;
        app.saves = app.game.save_entries().unwrap();
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Saves);
        assert_eq!(app.game.engine().snapshot(), before);

        app.screen = Screen::Play;
        assert!(app.process_app_event(Some(AppEvent::DiceSettled)));
        let outcome = app.last_outcome.as_ref().unwrap();
        assert_eq!(outcome.player.get(), 1);
        assert_eq!(
            app.game.engine().players().get(outcome.player).unwrap().position(),
            outcome.final_cell()
        );
    }
}
