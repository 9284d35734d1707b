/// Session transitions: one key or click in, events out.
///
/// Dispatch order for a key:
///   1. Help overlay open       → paging / close
///   2. Exit dialog open        → y / n / Esc
///   3. Esc                     → open exit dialog
///   4. F1                      → open help
///   5. Current screen handler
///
/// Overlays pause the level timer; closing them resumes it with the
/// open duration credited back.
///
/// Completing a level writes progress through to the save store at once.
/// A failed write is logged and shown, play continues.

use std::time::Instant;

use log::{debug, info, warn};

use crate::domain::entity::{Direction, Key};
use crate::domain::rules;
use crate::domain::tile::Tile;
use crate::error::GameResult;
use crate::sim::event::GameEvent;
use crate::sim::world::{DialogLayout, Overlay, PlayState, Screen, SessionState, SELECT_COLUMNS};
use crate::ui::help;

/// Ticks the "could not save" message stays up.
const SAVE_FAILED_TICKS: u32 = 100;

// ══════════════════════════════════════════════════════════════
// Entry points
// ══════════════════════════════════════════════════════════════

pub fn handle_key(state: &mut SessionState, key: Key, now: Instant) -> GameResult<Vec<GameEvent>> {
    let mut events = Vec::new();

    match state.overlay {
        Some(Overlay::Help) => {
            handle_help_key(state, key, now, &mut events);
            return Ok(events);
        }
        Some(Overlay::ConfirmExit) => {
            match key {
                Key::Char('y') => confirm_exit(state, &mut events),
                Key::Char('n') | Key::Esc => close_overlay(state, now),
                _ => {}
            }
            return Ok(events);
        }
        None => {}
    }

    match key {
        Key::Esc => {
            open_overlay(state, Overlay::ConfirmExit, now);
            events.push(GameEvent::DialogOpened);
        }
        Key::F(1) => {
            open_overlay(state, Overlay::Help, now);
            events.push(GameEvent::HelpOpened);
        }
        _ => match state.screen {
            Screen::StartMenu => {
                if key == Key::Enter {
                    enter_pack_select(state, &mut events);
                }
            }
            Screen::PackSelect => handle_pack_select(state, key, &mut events)?,
            Screen::LevelSelect => handle_level_select(state, key, &mut events),
            Screen::InGame => handle_in_game(state, key, now, &mut events),
            Screen::GameOver => {
                if key == Key::Enter {
                    leave_level(state, &mut events);
                }
            }
        },
    }

    Ok(events)
}

/// Primary-button click at terminal cell (`column`, `row`).
pub fn handle_click(state: &mut SessionState, column: usize, row: usize, now: Instant) -> GameResult<Vec<GameEvent>> {
    match state.overlay {
        Some(Overlay::Help) => {
            let mut events = Vec::new();
            if let Some(page) = help::page_at_click(state.help_page, column, row) {
                turn_help_page(state, page, &mut events);
            }
            return Ok(events);
        }
        Some(Overlay::ConfirmExit) => {
            let dialog = DialogLayout::for_message(state.screen.exit_prompt());
            return match dialog.hit(column, row) {
                Some(true) => handle_key(state, Key::Char('y'), now),
                Some(false) => handle_key(state, Key::Char('n'), now),
                None => Ok(Vec::new()),
            };
        }
        None => {}
    }

    match state.screen {
        Screen::StartMenu => {
            if row == START_ENTER_ROW && START_ENTER_COLS.contains(&column) {
                handle_key(state, Key::Enter, now)
            } else if row == START_HELP_ROW && START_HELP_COLS.contains(&column) {
                handle_key(state, Key::F(1), now)
            } else {
                Ok(Vec::new())
            }
        }
        Screen::PackSelect => {
            match grid_index_at(column, row).filter(|&i| i < state.packs.len()) {
                Some(index) => {
                    state.pack_cursor = index;
                    handle_key(state, Key::Enter, now)
                }
                None => Ok(Vec::new()),
            }
        }
        Screen::LevelSelect => {
            let count = state.active_pack().map_or(0, |p| p.level_count());
            match grid_index_at(column, row).filter(|&i| i < count) {
                Some(index) => {
                    state.level_cursor = index;
                    handle_key(state, Key::Enter, now)
                }
                None => Ok(Vec::new()),
            }
        }
        Screen::InGame | Screen::GameOver => Ok(Vec::new()),
    }
}

/// Called once per loop tick.
pub fn tick(state: &mut SessionState) {
    state.advance_tick();
}

// ── Start menu click targets ──

pub const START_ENTER_ROW: usize = 16;
pub const START_ENTER_COLS: std::ops::Range<usize> = 27..32;
pub const START_HELP_ROW: usize = 21;
pub const START_HELP_COLS: std::ops::Range<usize> = 65..73;

/// Selection grid cell under a click. Row 0 is the title line.
fn grid_index_at(column: usize, row: usize) -> Option<usize> {
    if row == 0 || column >= SELECT_COLUMNS * 3 {
        return None;
    }
    Some(column / 3 + (row - 1) / 2 * SELECT_COLUMNS)
}

/// Move a selection cursor without wrapping. Up/Down jump a whole row.
pub fn move_cursor(cursor: usize, count: usize, dir: Direction) -> Option<usize> {
    let next = match dir {
        Direction::Left => cursor.checked_sub(1)?,
        Direction::Right => cursor + 1,
        Direction::Up => cursor.checked_sub(SELECT_COLUMNS)?,
        Direction::Down => cursor + SELECT_COLUMNS,
    };
    (next < count).then_some(next)
}

// ══════════════════════════════════════════════════════════════
// Overlays
// ══════════════════════════════════════════════════════════════

fn open_overlay(state: &mut SessionState, overlay: Overlay, now: Instant) {
    state.overlay = Some(overlay);
    if let Some(play) = state.play.as_mut() {
        play.timer.pause(now);
    }
}

fn close_overlay(state: &mut SessionState, now: Instant) {
    state.overlay = None;
    if let Some(play) = state.play.as_mut() {
        play.timer.resume(now);
    }
}

fn handle_help_key(state: &mut SessionState, key: Key, now: Instant, events: &mut Vec<GameEvent>) {
    match key {
        Key::Esc | Key::F(1) => close_overlay(state, now),
        Key::Up => turn_help_page(state, help::previous_page(state.help_page), events),
        Key::Down => turn_help_page(state, help::next_page(state.help_page), events),
        _ => {}
    }
}

fn turn_help_page(state: &mut SessionState, page: usize, events: &mut Vec<GameEvent>) {
    if page != state.help_page {
        state.help_page = page;
        events.push(GameEvent::HelpPageTurned);
    }
}

/// The dialog's "yes": leave the current screen.
fn confirm_exit(state: &mut SessionState, events: &mut Vec<GameEvent>) {
    state.overlay = None;
    match state.screen {
        Screen::StartMenu => {
            info!("exit confirmed");
            state.should_exit = true;
        }
        Screen::PackSelect => {
            state.screen = Screen::StartMenu;
            events.push(GameEvent::Select);
        }
        Screen::LevelSelect => enter_pack_select(state, events),
        Screen::InGame | Screen::GameOver => leave_level(state, events),
    }
}

// ══════════════════════════════════════════════════════════════
// Menus
// ══════════════════════════════════════════════════════════════

fn enter_pack_select(state: &mut SessionState, events: &mut Vec<GameEvent>) {
    state.refresh_summaries();
    state.screen = Screen::PackSelect;
    events.push(GameEvent::Select);
}

fn handle_pack_select(state: &mut SessionState, key: Key, events: &mut Vec<GameEvent>) -> GameResult<()> {
    if let Some(dir) = key.direction() {
        if let Some(next) = move_cursor(state.pack_cursor, state.packs.len(), dir) {
            state.pack_cursor = next;
            events.push(GameEvent::Select);
        }
        return Ok(());
    }
    if key == Key::Enter {
        open_pack(state, events)?;
    }
    Ok(())
}

/// Load the selected pack's progress and show its levels.
fn open_pack(state: &mut SessionState, events: &mut Vec<GameEvent>) -> GameResult<()> {
    let Some(pack) = state.packs.get(state.pack_cursor) else {
        return Ok(());
    };
    let progress = state.store.load_progress(pack)?;
    state.level_cursor = if progress.all_beaten() { 0 } else { progress.watermark };
    debug!("opened pack {} at level {}", pack.id, state.level_cursor);
    state.progress = progress;
    state.screen = Screen::LevelSelect;
    events.push(GameEvent::Select);
    Ok(())
}

fn handle_level_select(state: &mut SessionState, key: Key, events: &mut Vec<GameEvent>) {
    let count = state.active_pack().map_or(0, |p| p.level_count());
    if let Some(dir) = key.direction() {
        if let Some(next) = move_cursor(state.level_cursor, count, dir) {
            state.level_cursor = next;
            events.push(GameEvent::Select);
        }
        return;
    }
    if key == Key::Enter {
        if state.level_cursor <= state.progress.watermark && state.level_cursor < count {
            start_level(state, state.level_cursor);
            events.push(GameEvent::Select);
        } else {
            events.push(GameEvent::Rejected);
        }
    }
}

fn start_level(state: &mut SessionState, level: usize) {
    let Some(template) = state.active_pack().and_then(|p| p.level(level)) else {
        return;
    };
    state.play = Some(PlayState::start(level, template));
    state.level_cursor = level;
    state.screen = Screen::InGame;
}

/// Back to level selection, dropping the attempt.
fn leave_level(state: &mut SessionState, events: &mut Vec<GameEvent>) {
    state.play = None;
    state.screen = Screen::LevelSelect;
    events.push(GameEvent::Select);
}

// ══════════════════════════════════════════════════════════════
// In game
// ══════════════════════════════════════════════════════════════

fn handle_in_game(state: &mut SessionState, key: Key, now: Instant, events: &mut Vec<GameEvent>) {
    let Some(play) = state.play.as_mut() else {
        return;
    };
    let level = play.level;

    if play.continue_flag {
        match key {
            Key::Enter => {
                let count = state.active_pack().map_or(0, |p| p.level_count());
                if level + 1 >= count {
                    info!("pack complete");
                    state.screen = Screen::GameOver;
                    events.push(GameEvent::PackComplete);
                } else {
                    start_level(state, level + 1);
                    events.push(GameEvent::Select);
                }
            }
            Key::Char('r') => {
                start_level(state, level);
                events.push(GameEvent::Reset);
            }
            _ => {}
        }
        return;
    }

    match key {
        Key::Char('z') => {
            play.swap_undo();
            events.push(GameEvent::Undo);
        }
        Key::Char('r') => {
            start_level(state, level);
            events.push(GameEvent::Reset);
        }
        _ => {
            if let Some(dir) = key.direction() {
                apply_move(state, dir, now, events);
            }
        }
    }
}

fn apply_move(state: &mut SessionState, dir: Direction, now: Instant, events: &mut Vec<GameEvent>) {
    let Some(play) = state.play.as_mut() else {
        return;
    };

    let before = play.live.clone();
    let from = play.player;
    let pushing = from.step(dir).is_some_and(|p| play.live.get(p).is_pushable());
    let doors = play.live.count(Tile::LockedDoor);

    let outcome = rules::attempt_move(&mut play.live, &play.template, from, dir);
    if !outcome.moved {
        events.push(GameEvent::Rejected);
        return;
    }

    play.timer.start_if_idle(now);
    play.old_moves = play.moves;
    play.moves += 1;
    play.old_player = from;
    play.player = outcome.player;
    play.last_step = before;

    events.push(GameEvent::Step);
    if pushing {
        events.push(GameEvent::Push);
    }
    if play.live.count(Tile::LockedDoor) < doors {
        events.push(GameEvent::DoorOpened);
    }

    if outcome.level_complete {
        let time_ms = u64::try_from(play.timer.freeze(now).as_millis()).unwrap_or(u64::MAX);
        play.continue_flag = true;
        let (level, moves) = (play.level, play.moves);
        complete_level(state, level, time_ms, moves);
        events.push(GameEvent::LevelComplete { level, time_ms, moves });
    }
}

/// Record the result and write it through to disk.
fn complete_level(state: &mut SessionState, level: usize, time_ms: u64, moves: u32) {
    let bests = state.progress.record_completion(level, time_ms, moves);
    let Some(pack) = state.packs.get(state.pack_cursor) else {
        return;
    };
    info!(
        "{} level {} complete in {time_ms} ms, {moves} moves (new best time: {}, new best moves: {})",
        pack.id,
        level + 1,
        bests.time,
        bests.moves
    );

    match state.store.save_progress(pack, &state.progress) {
        Ok(()) => {
            if let Some(summary) = state.summaries.get_mut(state.pack_cursor) {
                *summary = state.progress.summary();
            }
        }
        Err(e) => {
            warn!("progress not saved: {e}");
            state.set_message("Progress could not be saved", SAVE_FAILED_TICKS);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════
