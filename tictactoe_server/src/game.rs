// Authoritative game state for one tic-tac-toe session.
//
// `GameSession` owns the board, whose turn it is, and the game status. It is
// a plain value with no I/O and no locking: `server.rs` keeps the only
// instance on its coordinator thread, so every call here is already
// serialized.
//
// State machine:
//   InProgress --valid move, no line, board not full--> InProgress (turn flips)
//   InProgress --valid move completing a line--------> Won(role, line)
//   InProgress --valid move filling the board--------> Draw
//   any        --reset-------------------------------> InProgress (X, empty)
//
// Rejected moves (`MoveError`) never touch the board. Win detection scans the
// eight lines in a fixed order (rows, columns, main diagonal, anti-diagonal)
// after every move and before the draw check, so a move that fills the board
// and completes a line is a win.

use tictactoe_protocol::{Board, Cell, Coord, Role, WinLine};
use tracing::debug;

/// The eight winning lines, in detection order.
pub const LINES: [WinLine; 8] = [
    // Rows
    WinLine([Coord::at(0, 0), Coord::at(0, 1), Coord::at(0, 2)]),
    WinLine([Coord::at(1, 0), Coord::at(1, 1), Coord::at(1, 2)]),
    WinLine([Coord::at(2, 0), Coord::at(2, 1), Coord::at(2, 2)]),
    // Columns
    WinLine([Coord::at(0, 0), Coord::at(1, 0), Coord::at(2, 0)]),
    WinLine([Coord::at(0, 1), Coord::at(1, 1), Coord::at(2, 1)]),
    WinLine([Coord::at(0, 2), Coord::at(1, 2), Coord::at(2, 2)]),
    // Diagonals
    WinLine([Coord::at(0, 0), Coord::at(1, 1), Coord::at(2, 2)]),
    WinLine([Coord::at(0, 2), Coord::at(1, 1), Coord::at(2, 0)]),
];

/// Where the current game stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Won { role: Role, line: WinLine },
    Draw,
}

/// Result of a successful state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Continued { turn: Role },
    Won { role: Role, line: WinLine },
    Draw,
    Reset { turn: Role },
}

/// Why a move was refused. None of these change any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("game is already over")]
    GameAlreadyOver,
    #[error("({row}, {col}) is off the board")]
    OutOfBounds { row: u8, col: u8 },
    #[error("it is {turn}'s turn")]
    NotYourTurn { turn: Role },
    #[error("cell {0} is already occupied")]
    CellOccupied(Coord),
}

/// Immutable copy of the game at one instant, taken right after a
/// transition to build the message that announces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub board: Board,
    pub turn: Role,
    pub status: Status,
}

/// The single authoritative game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    board: Board,
    turn: Role,
    status: Status,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    /// Empty board, X to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn: Role::X,
            status: Status::InProgress,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Role {
        self.turn
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board,
            turn: self.turn,
            status: self.status,
        }
    }

    /// Validate and apply a move by `role` at `(row, col)`.
    pub fn apply_move(&mut self, role: Role, row: u8, col: u8) -> Result<Outcome, MoveError> {
        if self.status != Status::InProgress {
            return Err(MoveError::GameAlreadyOver);
        }
        let coord = Coord::new(row, col).ok_or(MoveError::OutOfBounds { row, col })?;
        if role != self.turn {
            return Err(MoveError::NotYourTurn { turn: self.turn });
        }
        if !self.board.get(coord).is_empty() {
            return Err(MoveError::CellOccupied(coord));
        }

        self.board.set(coord, Cell::from(role));
        debug!(%role, %coord, "move applied");

        if let Some((winner, line)) = find_winning_line(&self.board) {
            self.status = Status::Won { role: winner, line };
            return Ok(Outcome::Won { role: winner, line });
        }
        if self.board.is_full() {
            self.status = Status::Draw;
            return Ok(Outcome::Draw);
        }
        self.turn = role.other();
        Ok(Outcome::Continued { turn: self.turn })
    }

    /// Clear the board and start over with X to move. Always succeeds.
    pub fn reset(&mut self) -> Outcome {
        *self = Self::new();
        Outcome::Reset { turn: self.turn }
    }
}

/// First line, in `LINES` order, whose three cells hold the same role.
pub fn find_winning_line(board: &Board) -> Option<(Role, WinLine)> {
    LINES.iter().find_map(|line| {
        let [a, b, c] = line.0;
        let role = board.get(a).role()?;
        (board.get(b) == board.get(a) && board.get(c) == board.get(a)).then_some((role, *line))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Play `moves` alternately starting with X, panicking on any rejection.
    fn play(moves: &[(u8, u8)]) -> (GameSession, Outcome) {
        let mut game = GameSession::new();
        let mut last = None;
        for &(row, col) in moves {
            let role = game.turn();
            last = Some(game.apply_move(role, row, col).unwrap());
        }
        (game, last.expect("at least one move"))
    }

    #[test]
    fn snapshot_is_detached_from_later_moves() {
        let mut game = GameSession::new();
        game.apply_move(Role::X, 1, 1).unwrap();
        let snapshot = game.snapshot();
        assert_eq!(snapshot.turn, Role::O);
        assert_eq!(snapshot.status, Status::InProgress);
        assert_eq!(snapshot.board.get(Coord::at(1, 1)), Cell::X);

        game.apply_move(Role::O, 0, 0).unwrap();
        assert_eq!(snapshot.board.occupied(), 1);
        assert_eq!(game.snapshot().board.occupied(), 2);
    }

    #[test]
    fn starts_empty_with_x_to_move() {
        let game = GameSession::new();
        assert!(game.board().is_clear());
        assert_eq!(game.turn(), Role::X);
        assert_eq!(game.status(), Status::InProgress);
    }

    #[test]
    fn turn_alternates_after_each_valid_move() {
        let mut game = GameSession::new();
        let moves = [(0, 0), (1, 1), (2, 2), (0, 1)];
        for (i, &(row, col)) in moves.iter().enumerate() {
            let mover = game.turn();
            let outcome = game.apply_move(mover, row, col).unwrap();
            assert_eq!(outcome, Outcome::Continued { turn: mover.other() }, "move {i}");
            assert_eq!(game.turn(), mover.other());
        }
    }

    #[test]
    fn scenario_top_row_win() {
        let (game, outcome) = play(&[(0, 0), (1, 1), (0, 1), (2, 2), (0, 2)]);
        let expected = WinLine([Coord::at(0, 0), Coord::at(0, 1), Coord::at(0, 2)]);
        assert_eq!(
            outcome,
            Outcome::Won {
                role: Role::X,
                line: expected
            }
        );
        assert_eq!(
            game.status(),
            Status::Won {
                role: Role::X,
                line: expected
            }
        );
        // Turn stays with the winner.
        assert_eq!(game.turn(), Role::X);
    }

    #[test]
    fn scenario_full_board_draw() {
        let (game, outcome) = play(&[
            (0, 0),
            (0, 1),
            (0, 2),
            (1, 1),
            (1, 0),
            (1, 2),
            (2, 1),
            (2, 0),
            (2, 2),
        ]);
        assert_eq!(outcome, Outcome::Draw);
        assert_eq!(game.status(), Status::Draw);
        assert!(game.board().is_full());
    }

    #[test]
    fn win_on_last_cell_beats_draw() {
        // X completes the left column with the ninth move.
        let (game, outcome) = play(&[
            (0, 0),
            (0, 1),
            (0, 2),
            (1, 1),
            (1, 0),
            (1, 2),
            (2, 1),
            (2, 2),
            (2, 0),
        ]);
        assert!(game.board().is_full());
        assert!(matches!(outcome, Outcome::Won { role: Role::X, .. }));
    }

    #[test]
    fn out_of_turn_move_is_rejected_without_mutation() {
        let mut game = GameSession::new();
        let before = game.clone();
        assert_eq!(
            game.apply_move(Role::O, 1, 1),
            Err(MoveError::NotYourTurn { turn: Role::X })
        );
        assert_eq!(game, before);
    }

    #[test]
    fn occupied_cell_is_rejected_for_either_role() {
        let mut game = GameSession::new();
        game.apply_move(Role::X, 1, 1).unwrap();
        let before = game.clone();

        assert_eq!(
            game.apply_move(Role::O, 1, 1),
            Err(MoveError::CellOccupied(Coord::at(1, 1)))
        );
        assert_eq!(game, before);

        // The wrong role hitting an occupied cell reports the turn problem
        // first, and still changes nothing.
        assert!(game.apply_move(Role::X, 1, 1).is_err());
        assert_eq!(game, before);
    }

    #[test]
    fn off_board_move_is_rejected() {
        let mut game = GameSession::new();
        assert_eq!(
            game.apply_move(Role::X, 3, 0),
            Err(MoveError::OutOfBounds { row: 3, col: 0 })
        );
        assert!(game.board().is_clear());
    }

    #[test]
    fn no_move_after_game_over() {
        let (mut game, _) = play(&[(0, 0), (1, 1), (0, 1), (2, 2), (0, 2)]);
        let before = game.clone();
        for role in Role::ALL {
            for coord in Coord::all() {
                assert_eq!(
                    game.apply_move(role, coord.row(), coord.col()),
                    Err(MoveError::GameAlreadyOver)
                );
            }
        }
        assert_eq!(game, before);

        let (mut drawn, _) = play(&[
            (0, 0),
            (0, 1),
            (0, 2),
            (1, 1),
            (1, 0),
            (1, 2),
            (2, 1),
            (2, 0),
            (2, 2),
        ]);
        assert_eq!(drawn.apply_move(Role::O, 0, 0), Err(MoveError::GameAlreadyOver));
    }

    #[test]
    fn reset_always_returns_to_initial_state() {
        let mut fresh = GameSession::new();
        assert_eq!(fresh.reset(), Outcome::Reset { turn: Role::X });
        assert_eq!(fresh, GameSession::new());

        let (mut mid, _) = play(&[(0, 0), (1, 1), (2, 2)]);
        assert_eq!(mid.turn(), Role::O);
        mid.reset();
        assert_eq!(mid, GameSession::new());

        let (mut won, _) = play(&[(0, 0), (1, 1), (0, 1), (2, 2), (0, 2)]);
        won.reset();
        assert_eq!(won, GameSession::new());
        won.reset();
        assert_eq!(won, GameSession::new());

        // Play resumes normally after a reset.
        assert!(won.apply_move(Role::X, 0, 0).is_ok());
    }

    #[test]
    fn every_line_is_detected() {
        for (index, line) in LINES.iter().enumerate() {
            for role in Role::ALL {
                let mut board = Board::new();
                for coord in line.0 {
                    board.set(coord, Cell::from(role));
                }
                assert_eq!(
                    find_winning_line(&board),
                    Some((role, *line)),
                    "line {index} for {role}"
                );
            }
        }
    }

    #[test]
    fn lines_are_distinct_and_cover_the_canonical_set() {
        let mut seen = std::collections::HashSet::new();
        for line in LINES {
            let mut coords = line.0;
            coords.sort();
            assert!(seen.insert(coords), "duplicate line {line:?}");
        }
        assert_eq!(seen.len(), 8);
    }

    /// Enumerate every assignment of {Empty, X, O} to the nine cells (3^9
    /// boards) and check detection against a brute-force definition.
    #[test]
    fn exhaustive_detection_matches_definition() {
        let coords: Vec<Coord> = Coord::all().collect();
        for mut code in 0..3u32.pow(9) {
            let mut board = Board::new();
            for &coord in &coords {
                let cell = match code % 3 {
                    0 => Cell::Empty,
                    1 => Cell::X,
                    _ => Cell::O,
                };
                board.set(coord, cell);
                code /= 3;
            }

            let complete: Vec<&WinLine> = LINES
                .iter()
                .filter(|line| {
                    let cells = line.0.map(|c| board.get(c));
                    !cells[0].is_empty() && cells[0] == cells[1] && cells[1] == cells[2]
                })
                .collect();

            match find_winning_line(&board) {
                Some((role, line)) => {
                    assert_eq!(Some(&&line), complete.first());
                    assert_eq!(board.get(line.0[0]).role(), Some(role));
                }
                None => assert!(complete.is_empty()),
            }
        }
    }

    /// Walk every reachable game from the empty board and check the
    /// transition invariants at each step.
    #[test]
    fn every_reachable_game_respects_invariants() {
        #[derive(Default)]
        struct Tally {
            x_wins: u32,
            o_wins: u32,
            draws: u32,
        }

        fn explore(game: &GameSession, tally: &mut Tally) {
            for coord in Coord::all() {
                let mut next = game.clone();
                let mover = game.turn();
                match next.apply_move(mover, coord.row(), coord.col()) {
                    Ok(outcome) => {
                        assert!(game.board().get(coord).is_empty());
                        assert_eq!(next.board().occupied(), game.board().occupied() + 1);
                        assert_eq!(next.board().get(coord), Cell::from(mover));
                        match outcome {
                            Outcome::Continued { turn } => {
                                assert_eq!(turn, mover.other());
                                assert_eq!(next.status(), Status::InProgress);
                                explore(&next, tally);
                            }
                            Outcome::Won { role, line } => {
                                assert_eq!(role, mover);
                                assert!(line.contains(coord));
                                match role {
                                    Role::X => tally.x_wins += 1,
                                    Role::O => tally.o_wins += 1,
                                }
                            }
                            Outcome::Draw => {
                                assert!(next.board().is_full());
                                assert!(find_winning_line(next.board()).is_none());
                                tally.draws += 1;
                            }
                            Outcome::Reset { .. } => panic!("a move never resets"),
                        }
                    }
                    Err(err) => {
                        assert_eq!(err, MoveError::CellOccupied(coord));
                        assert_eq!(&next, game);
                    }
                }
                let mut wrong = game.clone();
                assert!(wrong.apply_move(mover.other(), coord.row(), coord.col()).is_err());
                assert_eq!(&wrong, game);
            }
        }

        let mut tally = Tally::default();
        explore(&GameSession::new(), &mut tally);
        // The classic counts for complete tic-tac-toe games.
        assert_eq!(tally.x_wins, 131_184);
        assert_eq!(tally.o_wins, 77_904);
        assert_eq!(tally.draws, 46_080);
    }
}
