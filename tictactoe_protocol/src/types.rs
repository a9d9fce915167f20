// Core board types for the tic-tac-toe protocol.
//
// These are the value types carried inside `message.rs` and owned by the
// server's `GameSession`. Their serde representations are the wire shapes:
// a `Role` is `"X"`/`"O"`, a `Cell` is `""`/`"X"`/`"O"`, a `Board` is a 3x3
// array of cells, a `Coord` is `[row, col]`, and a `WinLine` is an array of
// three coords.
//
// `Coord` can only hold in-range coordinates. Decoding `[7, 0]` fails, and the
// const constructor `Coord::at` rejects bad literals at compile time, so board
// indexing never needs a bounds check.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Side length of the board.
pub const BOARD_SIZE: usize = 3;

/// One of the two player identities. X always moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    X,
    O,
}

impl Role {
    /// Fixed assignment order for incoming connections.
    pub const ALL: [Role; 2] = [Role::X, Role::O];

    pub fn other(self) -> Role {
        match self {
            Role::X => Role::O,
            Role::O => Role::X,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Role::X => "X",
            Role::O => "O",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single square of the board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "")]
    Empty,
    X,
    O,
}

impl Cell {
    /// The role occupying this cell, if any.
    pub fn role(self) -> Option<Role> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Role::X),
            Cell::O => Some(Role::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Role> for Cell {
    fn from(role: Role) -> Self {
        match role {
            Role::X => Cell::X,
            Role::O => Cell::O,
        }
    }
}

/// An in-range board coordinate. Serialized as `[row, col]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[u8; 2]", into = "[u8; 2]")]
pub struct Coord {
    row: u8,
    col: u8,
}

impl Coord {
    /// Build a coordinate from literals, such as the entries of a line table.
    /// Input from the network or a user goes through [`Coord::new`] instead.
    ///
    /// # Panics
    ///
    /// If `row` or `col` is off the board. In a const context that is a
    /// compile error.
    #[track_caller]
    pub const fn at(row: u8, col: u8) -> Self {
        assert!((row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE);
        Self { row, col }
    }

    /// Build a coordinate from untrusted input.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if usize::from(row) < BOARD_SIZE && usize::from(col) < BOARD_SIZE {
            Some(Self { row, col })
        } else {
            None
        }
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    /// All nine coordinates in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE as u8).flat_map(|row| (0..BOARD_SIZE as u8).map(move |col| Coord { row, col }))
    }
}

impl TryFrom<[u8; 2]> for Coord {
    type Error = String;

    fn try_from([row, col]: [u8; 2]) -> Result<Self, Self::Error> {
        Coord::new(row, col).ok_or_else(|| format!("coordinate ({row}, {col}) is off the board"))
    }
}

impl From<Coord> for [u8; 2] {
    fn from(coord: Coord) -> Self {
        [coord.row, coord.col]
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Three coordinates forming one of the eight winning lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinLine(pub [Coord; 3]);

impl WinLine {
    pub fn contains(&self, coord: Coord) -> bool {
        self.0.contains(&coord)
    }
}

/// The 3x3 grid, indexed `[row][col]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, coord: Coord) -> Cell {
        self.cells[usize::from(coord.row)][usize::from(coord.col)]
    }

    pub fn set(&mut self, coord: Coord, cell: Cell) {
        self.cells[usize::from(coord.row)][usize::from(coord.col)] = cell;
    }

    /// True once all nine cells are occupied.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|cell| !cell.is_empty())
    }

    /// True when no cell is occupied.
    pub fn is_clear(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_empty())
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| !cell.is_empty()).count()
    }

    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }
}

impl From<[[Cell; BOARD_SIZE]; BOARD_SIZE]> for Board {
    fn from(cells: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }
}
