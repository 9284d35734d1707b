/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Everything is laid out on the fixed 74x23 playfield in the top-left
/// corner of the terminal. One `compose_*` function per screen; the help
/// overlay replaces the screen, the exit dialog is drawn on top of it.

use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::tile::Tile;
use crate::error::{GameError, GameResult};
use crate::sim::level::{PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH, SPECIAL_PACK_ID, TUTORIAL_PACK_ID};
use crate::sim::save::PackSummary;
use crate::sim::step::{START_ENTER_ROW, START_HELP_ROW};
use crate::sim::world::{DialogLayout, Overlay, PlayState, Screen, SessionState, SELECT_COLUMNS};
use crate::ui::help::{self, HelpLine, LineKind};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
    underline: bool,
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Color::Reset,
        underline: false,
    };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
        underline: true,
    };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg, underline: false }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    /// Returns the column after the last char.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
        cx
    }

    fn put_underlined(&mut self, x: usize, y: usize, s: &str, fg: Color) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            self.set(cx, y, Cell { ch, fg, bg: Color::Reset, underline: true });
            cx += 1;
        }
        cx
    }

    /// Write differently coloured runs one after another.
    fn put_segments(&mut self, x: usize, y: usize, segments: &[(&str, Color)]) -> usize {
        segments
            .iter()
            .fold(x, |cx, &(s, fg)| self.put_str(cx, y, s, fg, Color::Reset))
    }

    /// Text of one row, trailing blanks removed.
    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        let s: String = (0..self.width).map(|x| self.get(x, y).ch).collect();
        s.trim_end().to_string()
    }
}

// ── Layout ──

const HUD_ROW: usize = 0;
const LEVEL_ROW: usize = 1;
/// First row for the hint under a level, unless the level reaches further down.
const HINT_ROW: usize = 8;
const MESSAGE_ROW: usize = PLAYFIELD_HEIGHT - 1;

const TEXT: Color = Color::White;
const HIGHLIGHT: Color = Color::Red;

/// Title lettering for the start menu, one glyph per entry.
const TITLE_LETTERS: [[&str; 5]; 8] = [
    [r" ____  ", r"/ ___| ", r"\___ \ ", r" ___) |", r"|____/ "],
    [r"  ___  ", r" / _ \ ", r"| | | |", r"| |_| |", r" \___/ "],
    [r" _  __", r"| |/ /", r"| ' / ", r"| . \ ", r"|_|\_\"],
    [r"  ___  ", r" / _ \ ", r"| | | |", r"| |_| |", r" \___/ "],
    [r" _____ ", r"|_   _|", r"  | |  ", r"  | |  ", r"  |_|  "],
    [r" _____ ", r"| ____|", r"|  _|  ", r"| |___ ", r"|_____|"],
    [r" ____  ", r"|  _ \ ", r"| |_) |", r"|  _ < ", r"|_| \_\"],
    [r" __  __ ", r"|  \/  |", r"| |\/| |", r"| |  | |", r"|_|  |_|"],
];
const TITLE_ROW: usize = 3;

/// Glyph and colour a tile is drawn with.
fn tile_glyph(tile: Tile) -> (char, Color) {
    match tile {
        Tile::Empty => ('-', Color::Blue),
        Tile::OneWayLeft => ('<', Color::Blue),
        Tile::OneWayUp => ('^', Color::Blue),
        Tile::OneWayRight => ('>', Color::Blue),
        Tile::OneWayDown => ('v', Color::Blue),
        Tile::Wall => ('#', Color::Green),
        Tile::Player => ('P', Color::Yellow),
        Tile::Box => ('@', Color::Cyan),
        Tile::Key => ('*', Color::Cyan),
        Tile::BoxInGoal => ('@', Color::Magenta),
        Tile::KeyInGoal => ('*', Color::Magenta),
        Tile::LockedDoor => ('=', Color::Red),
        Tile::Goal => ('x', Color::Red),
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_view: Option<(Screen, Option<Overlay>)>,
}

/// Fail with `ConsoleTooSmall` unless the terminal holds the playfield.
pub fn check_terminal_size() -> GameResult<()> {
    let (width, height) = terminal::size()?;
    let (min_width, min_height) = (PLAYFIELD_WIDTH as u16, PLAYFIELD_HEIGHT as u16);
    if width < min_width || height < min_height {
        return Err(GameError::ConsoleTooSmall { width, height, min_width, min_height });
    }
    Ok(())
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_view: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((PLAYFIELD_WIDTH as u16, PLAYFIELD_HEIGHT as u16));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            SetAttribute(Attribute::Reset),
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, state: &SessionState, now: Instant) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((self.term_w as u16, self.term_h as u16));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, ResetColor, Clear(ClearType::All))?;
        }

        // Screen or overlay change → clear for clean transition
        let view = (state.screen, state.overlay);
        if self.last_view != Some(view) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, ResetColor, Clear(ClearType::All))?;
            self.last_view = Some(view);
        }

        self.compose(state, now);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn compose(&mut self, state: &SessionState, now: Instant) {
        self.front.clear();

        if state.overlay == Some(Overlay::Help) {
            self.compose_help(state.help_page);
            return;
        }

        match state.screen {
            Screen::StartMenu => self.compose_start_menu(),
            Screen::PackSelect => self.compose_pack_select(state),
            Screen::LevelSelect => self.compose_level_select(state),
            Screen::InGame | Screen::GameOver => self.compose_in_game(state, now),
        }

        if !state.message.is_empty() {
            let x = PLAYFIELD_WIDTH.saturating_sub(state.message.chars().count()) / 2;
            self.front.put_str(x, MESSAGE_ROW, &state.message, Color::Black, Color::Yellow);
        }

        if state.overlay == Some(Overlay::ConfirmExit) {
            self.compose_dialog(state.screen.exit_prompt());
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Color::Reset;
        let mut last_underline = false;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        queue!(
            self.writer,
            SetAttribute(Attribute::NoUnderline),
            SetForegroundColor(last_fg),
            SetBackgroundColor(last_bg),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                // Position cursor if needed
                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                // Set attributes only if changed
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                if cell.underline != last_underline {
                    let attr = if cell.underline { Attribute::Underlined } else { Attribute::NoUnderline };
                    queue!(self.writer, SetAttribute(attr))?;
                    last_underline = cell.underline;
                }

                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ══════════════════════════════════════════════════════════════
    // Start menu
    // ══════════════════════════════════════════════════════════════

    fn compose_start_menu(&mut self) {
        let (fg, bg) = (Color::White, Color::DarkBlue);
        let right = PLAYFIELD_WIDTH - 1;
        let bottom = PLAYFIELD_HEIGHT - 1;

        // Border
        let dashes = "-".repeat(PLAYFIELD_WIDTH - 2);
        self.front.put_str(0, 0, &format!("/{dashes}\\"), fg, bg);
        self.front.put_str(0, bottom, &format!("\\{dashes}/"), fg, bg);
        for y in 1..bottom {
            self.front.set(0, y, Cell::new('|', fg, bg));
            self.front.set(right, y, Cell::new('|', fg, bg));
        }

        // Title
        let title_w: usize = TITLE_LETTERS.iter().map(|l| l[0].len()).sum();
        let title_x = (PLAYFIELD_WIDTH - title_w) / 2;
        for row in 0..5 {
            let line: String = TITLE_LETTERS.iter().map(|l| l[row]).collect();
            self.front.put_str(title_x, TITLE_ROW + row, &line, Color::Yellow, Color::Reset);
        }

        let version = format!("Version: {}", env!("CARGO_PKG_VERSION"));
        self.front.put_str(PLAYFIELD_WIDTH - version.len() - 3, 14, &version, TEXT, Color::Reset);

        self.front.put_segments(
            21,
            START_ENTER_ROW,
            &[("Press ", TEXT), ("ENTER", HIGHLIGHT), (" to start the game!", TEXT)],
        );

        self.front.put_str(2, START_HELP_ROW, "Boxes, keys and one-way doors", Color::DarkGrey, Color::Reset);
        self.front.put_segments(65, START_HELP_ROW, &[("Help: ", TEXT), ("F1", HIGHLIGHT)]);
    }

    // ══════════════════════════════════════════════════════════════
    // Selection grids
    // ══════════════════════════════════════════════════════════════

    /// Draw `count` numbered cells, 24 per row, three columns each.
    /// `style(i)` gives the label and background of cell `i`.
    fn compose_select_grid<F>(&mut self, count: usize, selected: usize, style: F)
    where
        F: Fn(usize) -> (String, Color),
    {
        for i in 0..count {
            let x = (i % SELECT_COLUMNS) * 3;
            let y = 2 + (i / SELECT_COLUMNS) * 2;
            let (label, bg) = style(i);
            self.compose_grid_frame(x, y, TEXT);
            self.front.put_str(x + 1, y, &label, Color::Black, bg);
        }
        if selected < count {
            let x = (selected % SELECT_COLUMNS) * 3;
            let y = 2 + (selected / SELECT_COLUMNS) * 2;
            self.compose_grid_frame(x, y, Color::Cyan);
        }
    }

    fn compose_grid_frame(&mut self, x: usize, y: usize, fg: Color) {
        self.front.put_str(x, y - 1, "----", fg, Color::Reset);
        self.front.put_str(x, y + 1, "----", fg, Color::Reset);
        self.front.set(x, y, Cell::new('|', fg, Color::Reset));
        self.front.set(x + 3, y, Cell::new('|', fg, Color::Reset));
    }

    /// Framed box with one text line per entry.
    fn compose_info_box(&mut self, x: usize, y: usize, lines: &[String]) {
        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        let dashes = "-".repeat(inner);
        self.front.put_str(x, y, &format!(".{dashes}."), TEXT, Color::Reset);
        for (i, line) in lines.iter().enumerate() {
            let row = y + 1 + i;
            self.front.put_str(x, row, &format!("| {line:<w$} |", w = inner - 2), TEXT, Color::Reset);
        }
        self.front.put_str(x, y + 1 + lines.len(), &format!("'{dashes}'"), TEXT, Color::Reset);
    }

    fn compose_pack_select(&mut self, state: &SessionState) {
        self.front.put_underlined(0, 0, "Select a level pack:", TEXT);

        let count = state.packs.len();
        self.compose_select_grid(count, state.pack_cursor, |i| {
            let beaten = state.summaries.get(i).is_some_and(|s| s.all_beaten);
            let bg = if beaten { Color::DarkGreen } else { Color::DarkYellow };
            (format!("{:2}", i + 1), bg)
        });

        let summary = state.summaries.get(state.pack_cursor).copied().unwrap_or(PackSummary::UNKNOWN);
        let box_y = 4 + (count.saturating_sub(1) / SELECT_COLUMNS) * 2;
        self.compose_info_box(
            0,
            box_y,
            &[
                format!("Selected level pack:             {:02}", state.pack_cursor + 1),
                format!("Sum of best time   : {}", format_time_sum(summary.best_time_sum)),
                format!("Sum of best moves  :        {}", format_moves_sum(summary.best_moves_sum)),
            ],
        );

        if let Some(pack) = state.active_pack() {
            let name = format!("Pack: {}", pack.source.display_name());
            self.front.put_str(0, box_y + 6, &name, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_level_select(&mut self, state: &SessionState) {
        let Some(pack) = state.active_pack() else {
            return;
        };
        self.front.put_underlined(0, 0, &format!("Select a level (Level pack \"{}\"):", pack.id), TEXT);

        let count = pack.level_count();
        let watermark = state.progress.watermark;
        self.compose_select_grid(count, state.level_cursor, |i| {
            let bg = match i.cmp(&watermark) {
                std::cmp::Ordering::Less => Color::DarkGreen,
                std::cmp::Ordering::Equal => Color::DarkYellow,
                std::cmp::Ordering::Greater => Color::DarkRed,
            };
            (level_label(i), bg)
        });

        let record = state.progress.record(state.level_cursor);
        let box_y = 4 + (count.saturating_sub(1) / SELECT_COLUMNS) * 2;
        self.compose_info_box(
            0,
            box_y,
            &[
                format!("Selected level:        {}", level_number(state.level_cursor)),
                format!(
                    "Best time     : {}",
                    record.best_time_ms.map_or_else(|| "XX:XX.XXX".to_string(), format_level_time)
                ),
                format!(
                    "Best moves    :      {}",
                    record.best_moves.map_or_else(|| "XXXX".to_string(), |m| format!("{m:04}"))
                ),
            ],
        );
    }

    // ══════════════════════════════════════════════════════════════
    // In game / game over
    // ══════════════════════════════════════════════════════════════

    fn compose_in_game(&mut self, state: &SessionState, now: Instant) {
        let Some(play) = state.play.as_ref() else {
            return;
        };
        let game_over = state.screen == Screen::GameOver;

        // HUD
        self.front.put_str(0, HUD_ROW, &format!("Pack: {:02}", state.pack_cursor + 1), TEXT, Color::Reset);
        self.front.put_str(
            (PLAYFIELD_WIDTH - 9) / 4,
            HUD_ROW,
            &format!("Level: {}", level_number(play.level)),
            TEXT,
            Color::Reset,
        );
        self.front.put_str(
            (PLAYFIELD_WIDTH - 11) * 3 / 4,
            HUD_ROW,
            &format!("Moves: {:04}", play.moves),
            TEXT,
            Color::Reset,
        );
        self.front.put_str(
            PLAYFIELD_WIDTH - 15,
            HUD_ROW,
            &format!("Time: {}", format_level_time(duration_ms(play.timer.elapsed(now)))),
            TEXT,
            Color::Reset,
        );
        if game_over {
            self.front.put_str((PLAYFIELD_WIDTH - 13) / 2, HUD_ROW, "You have won!", Color::Green, Color::Reset);
        } else if play.continue_flag {
            self.front.put_str((PLAYFIELD_WIDTH - 16) / 2, HUD_ROW, "Level completed!", Color::Green, Color::Reset);
        }

        // Level
        let grid = &play.live;
        let x_off = PLAYFIELD_WIDTH.saturating_sub(grid.width()) / 2;
        for y in 0..grid.height() {
            for (x, &tile) in grid.row(y).iter().enumerate() {
                let (ch, fg) = tile_glyph(tile);
                let cell = if tile == Tile::Player && state.player_highlight {
                    Cell::new(ch, Color::Black, Color::Yellow)
                } else {
                    Cell::new(ch, fg, Color::Reset)
                };
                self.front.set(x_off + x, LEVEL_ROW + y, cell);
            }
        }

        let hint_row = HINT_ROW.max(LEVEL_ROW + grid.height() + 1);
        let segments = if game_over {
            vec![("Press ", TEXT), ("ENTER", HIGHLIGHT), (" to go back to the level selection screen", TEXT)]
        } else {
            state
                .active_pack()
                .map(|pack| tutorial_hint(&pack.id, play))
                .unwrap_or_default()
        };
        if !segments.is_empty() {
            let width: usize = segments.iter().map(|(s, _)| s.chars().count()).sum();
            self.front.put_segments(PLAYFIELD_WIDTH.saturating_sub(width) / 2, hint_row, &segments);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Overlays
    // ══════════════════════════════════════════════════════════════

    fn compose_dialog(&mut self, prompt: &str) {
        let layout = DialogLayout::for_message(prompt);
        let (fg, bg) = (Color::Black, Color::Yellow);
        let border = Cell::new(' ', TEXT, Color::DarkRed);
        let right = layout.x + layout.width + 1;
        let bottom = layout.y + DialogLayout::HEIGHT - 1;

        for y in layout.y..=bottom {
            for x in layout.x..=right {
                let edge = y == layout.y || y == bottom || x == layout.x || x == right;
                self.front.set(x, y, if edge { border } else { Cell::new(' ', fg, bg) });
            }
        }

        let len = prompt.chars().count();
        let text_x = layout.x + 1 + (layout.width - len) / 2;
        self.front.put_str(text_x, layout.y + 1, prompt, fg, bg);
        self.front.put_str(text_x, layout.y + 2, &"-".repeat(len), fg, bg);

        let row = layout.y + 4;
        self.front.put_str(layout.x + 1, row, "[y]es", fg, bg);
        self.front.put_str(layout.x + layout.width - 3, row, "[n]o", fg, bg);
    }

    fn compose_help(&mut self, page: usize) {
        self.front.put_underlined(0, 0, "Help menu", Color::Yellow);

        if page == 0 {
            for (i, (line, target)) in help::contents().into_iter().enumerate() {
                let row = help::BODY_ROW + i;
                let (indent, fg) = heading_style(line.kind);
                let end = self.front.put_str(indent, row, line.text, fg, Color::Reset);
                let number = target.to_string();
                let num_x = PLAYFIELD_WIDTH - number.len();
                self.front.put_str(end + 1, row, &".".repeat(num_x.saturating_sub(end + 2)), Color::DarkGrey, Color::Reset);
                self.front.put_str(num_x, row, &number, TEXT, Color::Reset);
            }
        } else {
            for (i, line) in help::page_lines(page).iter().enumerate() {
                self.compose_help_line(help::BODY_ROW + i, line);
            }
        }

        let footer = format!("Page: {} of {}", page + 1, help::PAGE_COUNT);
        self.front.put_segments(0, help::FOOTER_ROW, &[(&footer[..5], HIGHLIGHT), (&footer[5..], TEXT)]);
    }

    fn compose_help_line(&mut self, row: usize, line: &HelpLine) {
        match line.kind {
            LineKind::Heading1 | LineKind::Heading2 | LineKind::Heading3 => {
                let (indent, fg) = heading_style(line.kind);
                self.front.put_underlined(indent, row, line.text, fg);
            }
            LineKind::Binding(keys) => {
                self.front.put_segments(4, row, &[(keys, HIGHLIGHT), (": ", TEXT), (line.text, TEXT)]);
            }
            LineKind::Legend(glyphs) => {
                let mut x = 4;
                for c in glyphs.chars() {
                    let cell = if c == ' ' {
                        Cell::BLANK
                    } else {
                        let (ch, fg) = tile_glyph(Tile::from_char(c));
                        Cell::new(ch, fg, Color::Reset)
                    };
                    self.front.set(x, row, cell);
                    x += 1;
                }
                self.front.put_str(12, row, &format!(": {}", line.text), TEXT, Color::Reset);
            }
            LineKind::Text => {
                self.front.put_str(4, row, line.text, TEXT, Color::Reset);
            }
            LineKind::Blank => {}
        }
    }
}

fn heading_style(kind: LineKind) -> (usize, Color) {
    match kind {
        LineKind::Heading1 => (0, Color::Blue),
        LineKind::Heading2 => (2, Color::Green),
        _ => (4, Color::Cyan),
    }
}

/// Hint line for the introductory levels of the tutorial and special packs.
fn tutorial_hint(pack_id: &str, play: &PlayState) -> Vec<(&'static str, Color)> {
    const BOX: (&str, Color) = ("@", Color::Cyan);
    const BOX_IN_GOAL: (&str, Color) = ("@", Color::Magenta);
    const KEY: (&str, Color) = ("*", Color::Cyan);
    const KEY_IN_GOAL: (&str, Color) = ("*", Color::Magenta);
    const GOAL: (&str, Color) = ("x", HIGHLIGHT);
    const DOOR: (&str, Color) = ("=", HIGHLIGHT);
    const ONE_WAY: (&str, Color) = ("< ^ > v", Color::Blue);

    match (pack_id, play.level) {
        (TUTORIAL_PACK_ID, 0) if play.continue_flag => {
            vec![("Press ", TEXT), ("ENTER", HIGHLIGHT), (" to go to the next level...", TEXT)]
        }
        (TUTORIAL_PACK_ID, 0) => vec![("Use the arrow keys (< ^ > v) to move...", TEXT)],
        (TUTORIAL_PACK_ID, 1) => vec![
            ("Boxes (", TEXT), BOX, (") must be placed on ", TEXT), ("all", HIGHLIGHT),
            (" goals (", TEXT), GOAL, (")", TEXT),
        ],
        (TUTORIAL_PACK_ID, 2) => vec![
            ("Some boxes (", TEXT), BOX_IN_GOAL, (") might already be in a goal (", TEXT), GOAL, (")", TEXT),
        ],
        (TUTORIAL_PACK_ID, 3) => vec![
            ("Not all boxes (", TEXT), BOX, (") must be in a goal (", TEXT), GOAL, (") to win", TEXT),
        ],
        (TUTORIAL_PACK_ID, 4) => vec![
            ("One-way doors (", TEXT), ONE_WAY, (") can only be entered from the opened side", TEXT),
        ],
        (TUTORIAL_PACK_ID, 5) => vec![
            ("Boxes (", TEXT), BOX, (") can not be moved through one-way doors (", TEXT), ONE_WAY, (")", TEXT),
        ],
        (SPECIAL_PACK_ID, 0) => vec![
            ("Keys (", TEXT), KEY, (") can be used to open doors (", TEXT), DOOR, (")", TEXT),
        ],
        (SPECIAL_PACK_ID, 1) => vec![
            ("Every key (", TEXT), KEY, (") can open any door (", TEXT), DOOR, (")", TEXT),
        ],
        (SPECIAL_PACK_ID, 2) => vec![
            ("Keys (", TEXT), KEY_IN_GOAL, (") might be in a goal (", TEXT), GOAL, (")", TEXT),
        ],
        _ => Vec::new(),
    }
}

// ── Formatting ──

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Two-column label of a level cell: 1-based number, "A0".."J2" from 100 on.
fn level_label(index: usize) -> String {
    let n = index + 1;
    if n < 100 {
        format!("{n:2}")
    } else {
        let letter = char::from(b'A' + ((n - 100) / 10).min(25) as u8);
        format!("{letter}{}", n % 10)
    }
}

/// 1-based level number, zero-padded below 100.
fn level_number(index: usize) -> String {
    if index + 1 < 100 {
        format!("{:02}", index + 1)
    } else {
        level_label(index)
    }
}

/// MM:SS.mmm
fn format_level_time(ms: u64) -> String {
    format!("{:02}:{:02}.{:03}", ms / 60_000, ms / 1000 % 60, ms % 1000)
}

/// D:HH:MM:SS.mmm, or a placeholder while some level has no record.
fn format_time_sum(ms: Option<u64>) -> String {
    match ms {
        Some(ms) => format!(
            "{}:{:02}:{:02}:{:02}.{:03}",
            ms / 86_400_000,
            ms / 3_600_000 % 24,
            ms / 60_000 % 60,
            ms / 1000 % 60,
            ms % 1000
        ),
        None => "X:XX:XX:XX.XXX".to_string(),
    }
}

fn format_moves_sum(moves: Option<u64>) -> String {
    moves.map_or_else(|| "XXXXXXX".to_string(), |m| format!("{m:07}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Key;
    use crate::sim::level::{load_pack, PackSource};
    use crate::sim::save::SaveStore;
    use crate::sim::step;

    fn session(dir: &std::path::Path) -> SessionState {
        let packs = [TUTORIAL_PACK_ID, "main", SPECIAL_PACK_ID]
            .into_iter()
            .map(|id| load_pack(PackSource::Builtin(id)).unwrap())
            .collect();
        SessionState::new(packs, SaveStore::new(dir))
    }

    fn frame(state: &SessionState) -> Renderer {
        let mut r = Renderer::new();
        r.front.resize(PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT);
        r.compose(state, Instant::now());
        r
    }

    fn press(state: &mut SessionState, keys: &[Key]) {
        for &k in keys {
            step::handle_key(state, k, Instant::now()).unwrap();
        }
    }

    #[test]
    fn time_formats() {
        assert_eq!(format_level_time(61_005), "01:01.005");
        assert_eq!(format_time_sum(Some(90_061_001)), "1:01:01:01.001");
        assert_eq!(format_time_sum(None), "X:XX:XX:XX.XXX");
        assert_eq!(format_moves_sum(Some(42)), "0000042");
        assert_eq!(format_moves_sum(None), "XXXXXXX");
    }

    #[test]
    fn level_labels() {
        assert_eq!(level_label(0), " 1");
        assert_eq!(level_label(98), "99");
        assert_eq!(level_label(99), "A0");
        assert_eq!(level_label(110), "B1");
        assert_eq!(level_label(191), "J2");
        assert_eq!(level_number(4), "05");
        assert_eq!(level_number(100), "A1");
    }

    #[test]
    fn start_menu_targets_match_click_rows() {
        let dir = tempfile::tempdir().unwrap();
        let r = frame(&session(dir.path()));
        let enter_row = r.front.row_text(START_ENTER_ROW);
        assert_eq!(enter_row.find("ENTER"), Some(step::START_ENTER_COLS.start));
        let help_row = r.front.row_text(START_HELP_ROW);
        assert_eq!(help_row.find("Help: F1"), Some(step::START_HELP_COLS.start));
    }

    #[test]
    fn pack_grid_and_summary_box() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        press(&mut s, &[Key::Enter, Key::Right]);
        let r = frame(&s);
        assert_eq!(r.front.row_text(0), "Select a level pack:");
        assert_eq!(r.front.row_text(2), "| 1| 2| 3|");
        // Selected cell frame is cyan.
        assert_eq!(r.front.get(3, 2).fg, Color::Cyan);
        assert_eq!(r.front.get(0, 2).fg, TEXT);
        assert!(r.front.row_text(5).contains("Selected level pack:             02"));
        assert!(r.front.row_text(6).contains("X:XX:XX:XX.XXX"));
    }

    #[test]
    fn level_grid_colours_follow_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        press(&mut s, &[Key::Enter, Key::Enter]);
        assert_eq!(s.screen, Screen::LevelSelect);
        let r = frame(&s);
        assert_eq!(r.front.row_text(0), "Select a level (Level pack \"tutorial\"):");
        assert_eq!(r.front.get(1, 2).bg, Color::DarkYellow);
        assert_eq!(r.front.get(4, 2).bg, Color::DarkRed);
        assert!(r.front.row_text(6).contains("Best time     : XX:XX.XXX"));
    }

    #[test]
    fn in_game_hud_level_and_hint() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        press(&mut s, &[Key::Enter, Key::Enter, Key::Enter]);
        assert_eq!(s.screen, Screen::InGame);
        let r = frame(&s);
        let hud = r.front.row_text(HUD_ROW);
        assert!(hud.starts_with("Pack: 01"));
        assert!(hud.contains("Level: 01"));
        assert!(hud.contains("Moves: 0000"));
        assert!(hud.ends_with("Time: 00:00.000"));

        // Level 1 of the tutorial is 9 wide, centred.
        let x_off = (PLAYFIELD_WIDTH - 9) / 2;
        assert_eq!(r.front.get(x_off, LEVEL_ROW).ch, '#');
        assert_eq!(r.front.get(x_off + 1, LEVEL_ROW + 1).ch, 'P');
        assert_eq!(r.front.get(x_off + 5, LEVEL_ROW + 1).fg, Color::Cyan);
        assert!(r.front.row_text(HINT_ROW).contains("Use the arrow keys"));
    }

    #[test]
    fn completed_level_shows_banner_and_next_hint() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        press(&mut s, &[Key::Enter, Key::Enter, Key::Enter, Key::Right, Key::Right, Key::Right, Key::Right]);
        assert!(s.play.as_ref().unwrap().continue_flag);
        let r = frame(&s);
        assert!(r.front.row_text(HUD_ROW).contains("Level completed!"));
        assert!(r.front.row_text(HINT_ROW).contains("Press ENTER to go to the next level..."));
        // The box in goal is drawn as a magenta '@'.
        let x_off = (PLAYFIELD_WIDTH - 9) / 2;
        assert_eq!(r.front.get(x_off + 6, LEVEL_ROW + 1).ch, '@');
        assert_eq!(r.front.get(x_off + 6, LEVEL_ROW + 1).fg, Color::Magenta);
    }

    #[test]
    fn dialog_buttons_line_up_with_hit_test() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        press(&mut s, &[Key::Esc]);
        assert_eq!(s.overlay, Some(Overlay::ConfirmExit));
        let r = frame(&s);
        let layout = DialogLayout::for_message(Screen::StartMenu.exit_prompt());
        let row = r.front.row_text(layout.y + 4);
        let yes = row.find("[y]es").unwrap();
        let no = row.find("[n]o").unwrap();
        assert_eq!(layout.hit(yes, layout.y + 4), Some(true));
        assert_eq!(layout.hit(no + 2, layout.y + 4), Some(false));
        assert!(r.front.row_text(layout.y + 1).contains("Exit game?"));
        assert_eq!(r.front.get(layout.x, layout.y).bg, Color::DarkRed);
    }

    #[test]
    fn help_contents_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        press(&mut s, &[Key::F(1)]);
        let r = frame(&s);
        assert_eq!(r.front.row_text(0), "Help menu");
        let first = r.front.row_text(help::BODY_ROW);
        assert!(first.starts_with("1 Controls"));
        assert!(first.ends_with(" 1"));
        assert_eq!(r.front.row_text(help::FOOTER_ROW), format!("Page: 1 of {}", help::PAGE_COUNT));
    }

    #[test]
    fn help_legend_uses_tile_colours() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        s.overlay = Some(Overlay::Help);
        s.help_page = 4;
        let r = frame(&s);
        let wall_row = (help::BODY_ROW..help::FOOTER_ROW)
            .find(|&y| r.front.row_text(y).ends_with(": Wall"))
            .unwrap();
        assert_eq!(r.front.get(4, wall_row).ch, '#');
        assert_eq!(r.front.get(4, wall_row).fg, Color::Green);
    }

    #[test]
    fn message_line_drawn_on_any_screen() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path());
        s.set_message("Progress could not be saved", 10);
        let r = frame(&s);
        assert!(r.front.row_text(MESSAGE_ROW).contains("Progress could not be saved"));
    }
}
