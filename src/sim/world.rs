/// SessionState: everything the running game owns, in one aggregate.
///
/// ## Screens
///   StartMenu → PackSelect → LevelSelect → InGame → GameOver
///
/// Two overlays suspend any screen without changing it: the exit
/// confirmation dialog and the help pages. While one is open the level
/// timer is paused; closing it credits the open duration back.
///
/// ## Level attempt
/// `PlayState` holds the template, the live grid and a one-slot undo
/// buffer (`last_step`). Undo is a swap, so pressing it twice restores
/// the state before the first press.

use std::time::{Duration, Instant};

use crate::domain::entity::Position;
use crate::domain::grid::Grid;
use crate::sim::level::{LevelPack, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};
use crate::sim::save::{PackProgress, PackSummary, SaveStore};

/// Cells per row of the pack and level selection grids.
pub const SELECT_COLUMNS: usize = 24;

/// Loop ticks between player highlight toggles.
const BLINK_TICKS: u32 = 12;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Screen {
    StartMenu,
    PackSelect,
    LevelSelect,
    InGame,
    GameOver,
}

impl Screen {
    /// Question shown by the exit confirmation dialog.
    pub fn exit_prompt(self) -> &'static str {
        match self {
            Screen::StartMenu => "Exit game?",
            Screen::PackSelect => "Back to start menu?",
            Screen::LevelSelect => "Back to level pack selection?",
            Screen::InGame | Screen::GameOver => "Back to level selection?",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Overlay {
    ConfirmExit,
    Help,
}

// ══════════════════════════════════════════════════════════════
// Exit dialog geometry
// ══════════════════════════════════════════════════════════════

/// Placement of the exit confirmation dialog, centred in the playfield.
///
/// ```text
///   x
/// y ┌──────────────────┐
///   │ message          │
///   │ -------          │
///   │                  │
///   │[y]es         [n]o│  ← row y + 4
///   └──────────────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DialogLayout {
    pub x: usize,
    pub y: usize,
    /// Inner width, without the border.
    pub width: usize,
}

impl DialogLayout {
    pub const HEIGHT: usize = 6;
    const MIN_WIDTH: usize = 16;

    pub fn for_message(message: &str) -> Self {
        let width = message.chars().count().max(Self::MIN_WIDTH);
        DialogLayout {
            x: PLAYFIELD_WIDTH.saturating_sub(width + 2) / 2,
            y: (PLAYFIELD_HEIGHT - Self::HEIGHT) / 2,
            width,
        }
    }

    /// Some(true) for a click on `[y]es`, Some(false) for `[n]o`.
    pub fn hit(&self, column: usize, row: usize) -> Option<bool> {
        if row != self.y + 4 {
            return None;
        }
        if (self.x + 1..self.x + 6).contains(&column) {
            Some(true)
        } else if (self.x + self.width - 3..self.x + self.width + 1).contains(&column) {
            Some(false)
        } else {
            None
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Level timer
// ══════════════════════════════════════════════════════════════

/// Wall-clock level timer.
///
/// Idle until the first accepted move. A pause is undone by shifting
/// the start instant forward by the paused duration. Freezing fixes the
/// reading for good (level completed).
#[derive(Clone, Copy, Debug, Default)]
pub struct LevelTimer {
    start: Option<Instant>,
    paused_at: Option<Instant>,
    frozen: Option<Duration>,
}

impl LevelTimer {
    pub fn start_if_idle(&mut self, now: Instant) {
        if self.start.is_none() {
            self.start = Some(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.paused_at.is_none() && self.frozen.is_none()
    }

    pub fn pause(&mut self, now: Instant) {
        if self.is_running() {
            self.paused_at = Some(now);
        }
    }

    /// Resume after a pause, crediting back the paused duration.
    pub fn resume(&mut self, now: Instant) {
        let (Some(start), Some(paused_at)) = (self.start, self.paused_at.take()) else {
            return;
        };
        let paused_for = now.saturating_duration_since(paused_at);
        self.start = Some(start.checked_add(paused_for).unwrap_or(start));
    }

    /// Stop the clock and return the final reading.
    pub fn freeze(&mut self, now: Instant) -> Duration {
        let elapsed = self.elapsed(now);
        self.frozen = Some(elapsed);
        elapsed
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        if let Some(frozen) = self.frozen {
            return frozen;
        }
        match (self.start, self.paused_at) {
            (None, _) => Duration::ZERO,
            (Some(start), Some(paused_at)) => paused_at.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Level attempt
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct PlayState {
    pub level: usize,
    /// As parsed. Never mutated.
    pub template: Grid,
    pub live: Grid,
    /// Grid before the last accepted move; swapped with `live` on undo.
    pub last_step: Grid,
    pub player: Position,
    pub old_player: Position,
    pub moves: u32,
    pub old_moves: u32,
    pub timer: LevelTimer,
    /// Level solved, waiting for Enter (next) or r (retry).
    pub continue_flag: bool,
}

impl PlayState {
    pub fn start(level: usize, template: &Grid) -> Self {
        let player = template.find_player().unwrap_or_default();
        PlayState {
            level,
            template: template.clone(),
            live: template.clone(),
            last_step: template.clone(),
            player,
            old_player: player,
            moves: 0,
            old_moves: 0,
            timer: LevelTimer::default(),
            continue_flag: false,
        }
    }

    /// One step back or forward.
    pub fn swap_undo(&mut self) {
        std::mem::swap(&mut self.live, &mut self.last_step);
        std::mem::swap(&mut self.moves, &mut self.old_moves);
        std::mem::swap(&mut self.player, &mut self.old_player);
    }
}

// ══════════════════════════════════════════════════════════════
// Session
// ══════════════════════════════════════════════════════════════

pub struct SessionState {
    // ── Catalog ──
    pub packs: Vec<LevelPack>,
    /// One per pack, refreshed on entering pack selection.
    pub summaries: Vec<PackSummary>,
    pub store: SaveStore,

    // ── Navigation ──
    pub screen: Screen,
    pub overlay: Option<Overlay>,
    pub help_page: usize,
    pub pack_cursor: usize,
    pub level_cursor: usize,

    // ── Active pack ──
    pub progress: PackProgress,
    pub play: Option<PlayState>,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub player_highlight: bool,
    blink_tick: u32,

    pub should_exit: bool,
}

impl SessionState {
    pub fn new(packs: Vec<LevelPack>, store: SaveStore) -> Self {
        let summaries = vec![PackSummary::UNKNOWN; packs.len()];
        SessionState {
            packs,
            summaries,
            store,
            screen: Screen::StartMenu,
            overlay: None,
            help_page: 0,
            pack_cursor: 0,
            level_cursor: 0,
            progress: PackProgress::default(),
            play: None,
            message: String::new(),
            message_timer: 0,
            player_highlight: false,
            blink_tick: 0,
            should_exit: false,
        }
    }

    pub fn active_pack(&self) -> Option<&LevelPack> {
        self.packs.get(self.pack_cursor)
    }

    pub fn refresh_summaries(&mut self) {
        self.summaries = self.packs.iter().map(|p| self.store.summarize(p)).collect();
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    /// Per-tick housekeeping: message expiry and player blink.
    pub fn advance_tick(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }

        // The highlighted phase lasts one tick longer.
        self.blink_tick += 1;
        if self.blink_tick >= BLINK_TICKS + self.player_highlight as u32 {
            self.blink_tick = 0;
            self.player_highlight = !self.player_highlight;
        }
    }
}
