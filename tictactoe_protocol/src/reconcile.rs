// Client-side reconciliation of server-pushed state.
//
// `ViewState` is the state a view layer renders from. It is a pure follower:
// every field changes only in `apply`, in response to a `ServerMessage`, and
// always to the value the server declared. Nothing here computes moves, wins
// or turn order. Local input is gated by `can_submit_move` and then sent as an
// intent; the board only changes when the server's `update` comes back.
//
// Message handling:
// - `role`:    stored once; later role messages are ignored.
// - `update`:  board and turn replaced wholesale.
// - `winner`:  board replaced, game over, winning line recorded.
// - `draw`:    board replaced, game over, no line.
// - `reset`:   board, turn, game-over flag and line all cleared to the
//              server's fresh values.
// - `chat`:    appended to the transcript, tagged `own` when the sender is
//              this client's role. A chat without a sender is never own.
// - `rejected`: recorded so the view can report it; nothing else changes.

use tracing::{debug, warn};

use crate::message::ServerMessage;
use crate::types::{Board, Coord, Role, WinLine};

/// One line of the chat transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub text: String,
    pub sender: Option<Role>,
    pub own: bool,
}

/// Local view of the session, driven only by server messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
    role: Option<Role>,
    board: Board,
    turn: Role,
    game_over: bool,
    winner: Option<Role>,
    winning_line: Option<WinLine>,
    transcript: Vec<ChatLine>,
    rejected: Option<String>,
    seen_state: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            role: None,
            board: Board::new(),
            turn: Role::X,
            game_over: false,
            winner: None,
            winning_line: None,
            transcript: Vec::new(),
            rejected: None,
            seen_state: false,
        }
    }

    /// Apply one server message to the local state.
    pub fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Role { symbol } => match self.role {
                None => self.role = Some(*symbol),
                Some(existing) if existing == *symbol => {}
                Some(existing) => {
                    warn!(%existing, offered = %symbol, "ignoring second role assignment");
                }
            },
            ServerMessage::Update {
                board,
                current_player,
            } => {
                self.board = *board;
                self.turn = *current_player;
                self.seen_state = true;
            }
            ServerMessage::Winner {
                player,
                winning_line,
                board,
            } => {
                self.board = *board;
                self.turn = *player;
                self.game_over = true;
                self.winner = Some(*player);
                self.winning_line = Some(*winning_line);
                self.seen_state = true;
            }
            ServerMessage::Draw { board } => {
                self.board = *board;
                self.game_over = true;
                self.winner = None;
                self.winning_line = None;
                self.seen_state = true;
            }
            ServerMessage::Reset {
                board,
                current_player,
            } => {
                self.board = *board;
                self.turn = *current_player;
                self.game_over = false;
                self.winner = None;
                self.winning_line = None;
                self.seen_state = true;
            }
            ServerMessage::Chat { message, sender } => {
                self.transcript.push(ChatLine {
                    text: message.clone(),
                    sender: *sender,
                    own: sender.is_some() && self.role == *sender,
                });
            }
            ServerMessage::Rejected { reason } => {
                debug!(%reason, "server rejected this connection");
                self.rejected = Some(reason.clone());
            }
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Role {
        self.turn
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Role> {
        self.winner
    }

    pub fn winning_line(&self) -> Option<WinLine> {
        self.winning_line
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    pub fn rejected(&self) -> Option<&str> {
        self.rejected.as_deref()
    }

    pub fn is_my_turn(&self) -> bool {
        !self.game_over && self.role == Some(self.turn)
    }

    /// Whether a click on `(row, col)` should be sent as a move intent.
    /// Filters obviously futile intents; the server still decides.
    pub fn can_submit_move(&self, row: u8, col: u8) -> bool {
        let Some(coord) = Coord::new(row, col) else {
            return false;
        };
        self.is_my_turn() && self.board.get(coord).is_empty()
    }

    /// Human-readable status for the view's status bar.
    pub fn status_line(&self) -> String {
        if let Some(reason) = &self.rejected {
            return format!("Rejected by server: {reason}");
        }
        let Some(role) = self.role else {
            return "Waiting for role assignment...".into();
        };
        if self.game_over {
            return match self.winner {
                Some(winner) => format!("Player {winner} wins!"),
                None => "It's a draw!".into(),
            };
        }
        if !self.seen_state {
            return format!("You are Player {role}");
        }
        format!("Player {}'s turn", self.turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn board_with(cells: &[(u8, u8, Cell)]) -> Board {
        let mut board = Board::new();
        for &(row, col, cell) in cells {
            board.set(Coord::at(row, col), cell);
        }
        board
    }

    fn assigned(role: Role) -> ViewState {
        let mut view = ViewState::new();
        view.apply(&ServerMessage::Role { symbol: role });
        view
    }

    #[test]
    fn role_is_stored_exactly_once() {
        let mut view = assigned(Role::O);
        view.apply(&ServerMessage::Role { symbol: Role::X });
        assert_eq!(view.role(), Some(Role::O));
        assert_eq!(view.status_line(), "You are Player O");
    }

    #[test]
    fn update_replaces_board_and_turn() {
        let mut view = assigned(Role::X);
        let board = board_with(&[(0, 0, Cell::X)]);
        view.apply(&ServerMessage::Update {
            board,
            current_player: Role::O,
        });
        assert_eq!(view.board(), &board);
        assert_eq!(view.turn(), Role::O);
        assert!(!view.is_my_turn());
        assert_eq!(view.status_line(), "Player O's turn");
    }

    #[test]
    fn winner_marks_game_over_with_line() {
        let mut view = assigned(Role::O);
        let line = WinLine([Coord::at(0, 0), Coord::at(0, 1), Coord::at(0, 2)]);
        let board = board_with(&[(0, 0, Cell::X), (0, 1, Cell::X), (0, 2, Cell::X)]);
        view.apply(&ServerMessage::Winner {
            player: Role::X,
            winning_line: line,
            board,
        });
        assert!(view.is_game_over());
        assert_eq!(view.winner(), Some(Role::X));
        assert_eq!(view.winning_line(), Some(line));
        assert_eq!(view.board(), &board);
        assert_eq!(view.status_line(), "Player X wins!");
        assert!(!view.can_submit_move(2, 2));
    }

    #[test]
    fn draw_marks_game_over_without_line() {
        let mut view = assigned(Role::X);
        view.apply(&ServerMessage::Draw {
            board: Board::new(),
        });
        assert!(view.is_game_over());
        assert_eq!(view.winning_line(), None);
        assert_eq!(view.status_line(), "It's a draw!");
    }

    #[test]
    fn reset_clears_everything_but_role_and_transcript() {
        let mut view = assigned(Role::X);
        view.apply(&ServerMessage::Chat {
            message: "[X] hello".into(),
            sender: Some(Role::X),
        });
        view.apply(&ServerMessage::Winner {
            player: Role::O,
            winning_line: WinLine([Coord::at(0, 0), Coord::at(1, 1), Coord::at(2, 2)]),
            board: board_with(&[(0, 0, Cell::O), (1, 1, Cell::O), (2, 2, Cell::O)]),
        });
        view.apply(&ServerMessage::Reset {
            board: Board::new(),
            current_player: Role::X,
        });
        assert!(!view.is_game_over());
        assert!(view.board().is_clear());
        assert_eq!(view.turn(), Role::X);
        assert_eq!(view.winning_line(), None);
        assert_eq!(view.winner(), None);
        assert_eq!(view.role(), Some(Role::X));
        assert_eq!(view.transcript().len(), 1);
        assert!(view.is_my_turn());
    }

    #[test]
    fn chat_lines_tagged_by_sender() {
        let mut view = assigned(Role::O);
        view.apply(&ServerMessage::Chat {
            message: "[X] hi".into(),
            sender: Some(Role::X),
        });
        view.apply(&ServerMessage::Chat {
            message: "[O] hey".into(),
            sender: Some(Role::O),
        });
        let lines = view.transcript();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].own);
        assert!(lines[1].own);
        assert_eq!(lines[1].text, "[O] hey");
    }

    #[test]
    fn chat_without_sender_is_never_own() {
        let mut view = assigned(Role::X);
        view.apply(&ServerMessage::Chat {
            message: "[X] hi".into(),
            sender: None,
        });
        let line = &view.transcript()[0];
        assert_eq!(line.sender, None);
        assert!(!line.own);
    }

    #[test]
    fn chat_before_role_is_never_own() {
        let mut view = ViewState::new();
        view.apply(&ServerMessage::Chat {
            message: "[X] early".into(),
            sender: Some(Role::X),
        });
        assert!(!view.transcript()[0].own);
    }

    #[test]
    fn move_gating_follows_server_state() {
        let mut view = ViewState::new();
        assert!(!view.can_submit_move(0, 0), "no role yet");

        view.apply(&ServerMessage::Role { symbol: Role::X });
        assert!(view.can_submit_move(0, 0));
        assert!(!view.can_submit_move(3, 0), "off the board");

        view.apply(&ServerMessage::Update {
            board: board_with(&[(0, 0, Cell::X)]),
            current_player: Role::O,
        });
        assert!(!view.can_submit_move(1, 1), "not our turn");

        view.apply(&ServerMessage::Update {
            board: board_with(&[(0, 0, Cell::X), (1, 1, Cell::O)]),
            current_player: Role::X,
        });
        assert!(!view.can_submit_move(1, 1), "occupied");
        assert!(view.can_submit_move(2, 2));
    }

    #[test]
    fn rejected_is_reported() {
        let mut view = ViewState::new();
        view.apply(&ServerMessage::Rejected {
            reason: "session is full".into(),
        });
        assert_eq!(view.rejected(), Some("session is full"));
        assert_eq!(view.role(), None);
        assert_eq!(view.status_line(), "Rejected by server: session is full");
    }

    #[test]
    fn waiting_status_before_role() {
        assert_eq!(ViewState::new().status_line(), "Waiting for role assignment...");
    }
}
