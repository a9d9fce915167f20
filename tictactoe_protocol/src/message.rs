// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: intents sent by a player (move, chat, reset). The server
//   may accept or silently ignore them.
// - `ServerMessage`: authoritative state declarations sent by the server,
//   plus the one-off `Role` assignment and `Rejected` refusal.
//
// Both are internally tagged on a `type` field with snake_case tags, so the
// JSON shape of `ClientMessage::Move { row: 1, col: 2 }` is
// `{"type":"move","row":1,"col":2}`. An unknown tag or a missing field fails to
// decode, which the server treats as a protocol error rather than a rule
// violation.

use serde::{Deserialize, Serialize};

use crate::types::{Board, Role, WinLine};

/// Longest chat text, in bytes, the server will relay. Keeps the tagged
/// outbound `chat` frame well inside `MAX_MESSAGE_SIZE`.
pub const MAX_CHAT_LEN: usize = 4096;

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Place the sender's mark. Coordinates are range-checked by the game,
    /// not by the decoder.
    Move { row: u8, col: u8 },
    /// Chat text, untagged. The server prefixes the sender.
    Chat { message: String },
    /// Start a fresh game. Any player may send this.
    Reset,
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Unicast on accept: the role this connection plays for its lifetime.
    Role { symbol: Role },
    /// A move was applied and the game continues.
    Update { board: Board, current_player: Role },
    /// A move completed a line.
    Winner {
        player: Role,
        winning_line: WinLine,
        board: Board,
    },
    /// A move filled the board without completing a line.
    Draw { board: Board },
    /// The game was reset.
    Reset { board: Board, current_player: Role },
    /// Chat line, pre-formatted as `[X] text`. `sender` is absent from
    /// servers that only send the formatted text.
    Chat {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<Role>,
    },
    /// Unicast to a connection the server refuses (session full).
    Rejected { reason: String },
}

impl ServerMessage {
    /// The board carried by a state message, if this is one.
    pub fn board(&self) -> Option<&Board> {
        match self {
            ServerMessage::Update { board, .. }
            | ServerMessage::Winner { board, .. }
            | ServerMessage::Draw { board }
            | ServerMessage::Reset { board, .. } => Some(board),
            ServerMessage::Role { .. }
            | ServerMessage::Chat { .. }
            | ServerMessage::Rejected { .. } => None,
        }
    }
}
