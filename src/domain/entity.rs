/// Positions, directions and the input vocabulary shared by the
/// state machine and the terminal front end.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Neighbour one step in `dir`, or None when it would leave the
    /// non-negative quadrant.
    pub fn step(self, dir: Direction) -> Option<Position> {
        let (dx, dy) = dir.offset();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Position { x, y })
    }
}

/// Movement direction
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    #[cfg(test)]
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Up, Direction::Right, Direction::Down];

    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
        }
    }
}

/// Key events understood by the session state machine.
///
/// The front end maps terminal events onto this fixed vocabulary;
/// letters arrive lowercased.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Key {
    Left,
    Up,
    Right,
    Down,
    Esc,
    Delete,
    Enter,
    Tab,
    F(u8),
    Char(char),
}

impl Key {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::Left => Some(Direction::Left),
            Key::Up => Some(Direction::Up),
            Key::Right => Some(Direction::Right),
            Key::Down => Some(Direction::Down),
            _ => None,
        }
    }
}
