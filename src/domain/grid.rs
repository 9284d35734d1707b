/// Rectangular tile grid.
///
/// Shape is fixed at construction, cell contents are mutable.
/// Cells are stored row-major in one flat vector.
///
/// Reads outside the grid return `Tile::Wall`, so movement code never
/// needs a separate bounds check: the border behaves like a wall.
/// Writes outside the grid are ignored.

use super::entity::Position;
use super::tile::Tile;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Tile>,
}

impl Grid {
    /// New grid with every cell Empty.
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            cells: vec![Tile::Empty; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Tile {
        if self.in_bounds(pos) {
            self.cells[pos.y * self.width + pos.x]
        } else {
            Tile::Wall
        }
    }

    #[inline]
    pub fn set(&mut self, pos: Position, tile: Tile) {
        if self.in_bounds(pos) {
            self.cells[pos.y * self.width + pos.x] = tile;
        }
    }

    /// One row of tiles, left to right.
    pub fn row(&self, y: usize) -> &[Tile] {
        if y < self.height {
            &self.cells[y * self.width..(y + 1) * self.width]
        } else {
            &[]
        }
    }

    /// Every cell with its position, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &t)| (Position::new(i % self.width, i / self.width), t))
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.cells.iter().filter(|&&t| t == tile).count()
    }

    /// First Player cell in row-major order.
    pub fn find_player(&self) -> Option<Position> {
        self.cells().find(|&(_, t)| t == Tile::Player).map(|(p, _)| p)
    }
}
