/// Input queue.
///
/// Drains pending crossterm events without blocking and turns them into
/// the session's key vocabulary and primary-button clicks. The loop takes
/// at most one key and one click per tick; the rest wait in the queues.
///
/// Release events are dropped, so terminals with keyboard enhancement
/// behave like the rest.

use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::domain::entity::Key;

/// Events beyond this many queued keys are dropped.
const MAX_QUEUED: usize = 32;

pub struct InputState {
    keys: VecDeque<Key>,
    clicks: VecDeque<(usize, usize)>,
    ctrl_c: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            keys: VecDeque::with_capacity(8),
            clicks: VecDeque::with_capacity(4),
            ctrl_c: false,
        }
    }

    /// Drain all pending terminal events into the queues.
    pub fn drain_events(&mut self) {
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if is_ctrl_c(&key) {
                        self.ctrl_c = true;
                    } else if let Some(k) = map_key(&key) {
                        if self.keys.len() < MAX_QUEUED {
                            self.keys.push_back(k);
                        }
                    }
                }
                Ok(Event::Mouse(mouse)) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left) && self.clicks.len() < MAX_QUEUED {
                        self.clicks.push_back((mouse.column as usize, mouse.row as usize));
                    }
                }
                _ => {}
            }
        }
    }

    pub fn next_key(&mut self) -> Option<Key> {
        self.keys.pop_front()
    }

    pub fn next_click(&mut self) -> Option<(usize, usize)> {
        self.clicks.pop_front()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// Map a terminal key event onto the session vocabulary.
/// Letters are lowercased; unmapped keys and releases give None.
fn map_key(key: &KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let k = match key.code {
        KeyCode::Left => Key::Left,
        KeyCode::Up => Key::Up,
        KeyCode::Right => Key::Right,
        KeyCode::Down => Key::Down,
        KeyCode::Esc => Key::Esc,
        KeyCode::Delete => Key::Delete,
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::F(n) if (1..=12).contains(&n) => Key::F(n),
        KeyCode::Char(c) if !c.is_control() => Key::Char(c.to_ascii_lowercase()),
        _ => return None,
    };
    Some(k)
}
