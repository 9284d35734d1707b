/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// ## Character legend (pack files)
///   '<' '^' '>' 'v' = One-way tile, enterable only when moving that way
///   '#' = Wall              'P' = Player
///   '@' = Box               '+' = Box in goal
///   '*' = Key               '~' = Key in goal
///   '=' = Locked door       'x' = Goal
///   anything else = Empty

use super::entity::Direction;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    OneWayLeft,
    OneWayUp,
    OneWayRight,
    OneWayDown,
    Wall,
    Player,
    Box,
    Goal,
    BoxInGoal,
    Key,
    KeyInGoal,
    LockedDoor,
}

impl Tile {
    pub fn from_char(c: char) -> Tile {
        match c {
            '<' => Tile::OneWayLeft,
            '^' => Tile::OneWayUp,
            '>' => Tile::OneWayRight,
            'v' => Tile::OneWayDown,
            '#' => Tile::Wall,
            'P' => Tile::Player,
            '@' => Tile::Box,
            'x' => Tile::Goal,
            '+' => Tile::BoxInGoal,
            '*' => Tile::Key,
            '~' => Tile::KeyInGoal,
            '=' => Tile::LockedDoor,
            _ => Tile::Empty,
        }
    }

    /// Inverse of `from_char`. Empty is written as `-` like the built-in packs.
    #[cfg(test)]
    pub fn to_char(self) -> char {
        match self {
            Tile::Empty => '-',
            Tile::OneWayLeft => '<',
            Tile::OneWayUp => '^',
            Tile::OneWayRight => '>',
            Tile::OneWayDown => 'v',
            Tile::Wall => '#',
            Tile::Player => 'P',
            Tile::Box => '@',
            Tile::Goal => 'x',
            Tile::BoxInGoal => '+',
            Tile::Key => '*',
            Tile::KeyInGoal => '~',
            Tile::LockedDoor => '=',
        }
    }

    /// Goal, BoxInGoal or KeyInGoal.
    pub fn is_goal_family(self) -> bool {
        matches!(self, Tile::Goal | Tile::BoxInGoal | Tile::KeyInGoal)
    }

    pub fn is_box(self) -> bool {
        matches!(self, Tile::Box | Tile::BoxInGoal)
    }

    /// Can the player push this tile one cell further?
    pub fn is_pushable(self) -> bool {
        matches!(self, Tile::Box | Tile::BoxInGoal | Tile::Key | Tile::KeyInGoal)
    }

    /// Can the player walk onto this tile moving in `dir`, without pushing?
    pub fn is_walkable(self, dir: Direction) -> bool {
        match self {
            Tile::Empty | Tile::Goal => true,
            Tile::OneWayLeft => dir == Direction::Left,
            Tile::OneWayUp => dir == Direction::Up,
            Tile::OneWayRight => dir == Direction::Right,
            Tile::OneWayDown => dir == Direction::Down,
            _ => false,
        }
    }

    /// What remains on a template cell once the player (or a pushed item)
    /// has left it: movable content vanishes, goals and fixed tiles stay.
    pub fn underlying(self) -> Tile {
        match self {
            Tile::Player | Tile::Box | Tile::Key | Tile::LockedDoor => Tile::Empty,
            Tile::BoxInGoal | Tile::KeyInGoal => Tile::Goal,
            other => other,
        }
    }
}
