/// Help overlay content and paging.
///
/// Page 0 is a table of contents generated from the headings of the
/// other pages. Up/Down wrap around at both ends.

use crate::sim::level::PLAYFIELD_HEIGHT;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineKind {
    /// Chapter heading, "x Title".
    Heading1,
    /// "x.x Title".
    Heading2,
    /// "x.x.x Title".
    Heading3,
    /// Key binding: key part, then description.
    Binding(&'static str),
    /// Tile legend: glyphs drawn in their tile colours, then description.
    Legend(&'static str),
    Text,
    Blank,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HelpLine {
    pub kind: LineKind,
    pub text: &'static str,
}

const fn h1(text: &'static str) -> HelpLine {
    HelpLine { kind: LineKind::Heading1, text }
}
const fn h2(text: &'static str) -> HelpLine {
    HelpLine { kind: LineKind::Heading2, text }
}
const fn h3(text: &'static str) -> HelpLine {
    HelpLine { kind: LineKind::Heading3, text }
}
const fn key(keys: &'static str, text: &'static str) -> HelpLine {
    HelpLine { kind: LineKind::Binding(keys), text }
}
const fn legend(glyphs: &'static str, text: &'static str) -> HelpLine {
    HelpLine { kind: LineKind::Legend(glyphs), text }
}
const fn text(text: &'static str) -> HelpLine {
    HelpLine { kind: LineKind::Text, text }
}
const BLANK: HelpLine = HelpLine { kind: LineKind::Blank, text: "" };

/// Content pages, shown as pages 1.. after the table of contents.
const CONTENT: &[&[HelpLine]] = &[
    &[
        h1("1 Controls"),
        h2("1.1 Keyboard"),
        key("F1", "Open help"),
        h3("1.1.1 Help"),
        key("ESC/F1", "Close help"),
        key("UP/DOWN", "Switch page"),
        h3("1.1.2 Exit window"),
        key("y/n", "Yes (leave) / No (stay)"),
        h3("1.1.3 Menus"),
        key("ENTER", "Start game / open pack / play level"),
        key("Arrow keys", "Move selection"),
        key("ESC", "Exit window"),
        h3("1.1.4 Game"),
        key("Arrow keys", "Move"),
        key("r", "Reset level"),
        key("z", "One step back/forward"),
        key("ENTER", "Next level (after completion)"),
    ],
    &[
        h2("1.2 Mouse"),
        text("Left click on a pack or level number selects and opens it."),
        BLANK,
        h3("1.2.1 Help"),
        text("Click \"Page:\" to switch to the next page."),
        text("Click a chapter in the contents to go to its page."),
        BLANK,
        h3("1.2.2 Exit window"),
        text("Click \"[y]es\" or \"[n]o\" (same as y / n)."),
        BLANK,
        h3("1.2.3 Start menu"),
        text("Click \"ENTER\" to start, \"F1\" to open help."),
    ],
    &[
        h1("2 Command line"),
        text("sokoterm [PACK.lvl]..."),
        BLANK,
        text("Extra level pack files are listed after the built-in packs,"),
        text("followed by the *.lvl files of the configured packs directory."),
        text("Progress of a pack file is kept in <pack file>.sav."),
    ],
    &[
        h1("3 Game screen"),
        legend("-", "Empty"),
        legend("< ^ > v", "One-way doors"),
        legend("#", "Wall"),
        legend("P", "Player"),
        legend("@ +", "Box / box in goal"),
        legend("x", "Goal"),
        legend("* ~", "Key / key in goal"),
        legend("=", "Locked door"),
    ],
    &[
        h1("4 Gameplay"),
        h2("4.1 Play"),
        text("Push every box onto a goal. Boxes and keys can only be pushed."),
        text("Pushing a key into a locked door opens it; both are used up."),
        text("A key left in a goal keeps that goal from counting."),
        text("One-way doors can only be entered from the open side."),
        BLANK,
        h2("4.2 Progress"),
        text("Levels unlock in order. Best time and best moves are kept"),
        text("separately and saved after every completed level."),
        BLANK,
        h2("4.3 Game over"),
        text("After the last level of a pack, press ENTER to return to"),
        text("the level selection."),
    ],
];

pub const PAGE_COUNT: usize = CONTENT.len() + 1;

/// Rows of the overlay used by the title, the page body and the footer.
pub const BODY_ROW: usize = 2;
pub const FOOTER_ROW: usize = PLAYFIELD_HEIGHT - 1;
const FOOTER_CLICK_COLS: usize = 8;

pub fn next_page(page: usize) -> usize {
    (page + 1) % PAGE_COUNT
}

pub fn previous_page(page: usize) -> usize {
    (page + PAGE_COUNT - 1) % PAGE_COUNT
}

/// Lines of a content page; empty for the contents page.
pub fn page_lines(page: usize) -> &'static [HelpLine] {
    page.checked_sub(1).and_then(|i| CONTENT.get(i)).copied().unwrap_or(&[])
}

/// Table of contents: every heading with the page it is on.
pub fn contents() -> Vec<(HelpLine, usize)> {
    CONTENT
        .iter()
        .enumerate()
        .flat_map(|(i, lines)| {
            lines
                .iter()
                .filter(|l| matches!(l.kind, LineKind::Heading1 | LineKind::Heading2 | LineKind::Heading3))
                .map(move |&l| (l, i + 1))
        })
        .collect()
}

/// Page to show after a click at (`column`, `row`), if the click hit
/// the footer or a contents entry.
pub fn page_at_click(page: usize, column: usize, row: usize) -> Option<usize> {
    if row == FOOTER_ROW && column < FOOTER_CLICK_COLS {
        return Some(next_page(page));
    }
    if page == 0 && row >= BODY_ROW && row < FOOTER_ROW - 1 {
        return contents().get(row - BODY_ROW).map(|&(_, target)| target);
    }
    None
}
