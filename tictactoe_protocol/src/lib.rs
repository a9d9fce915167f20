// tictactoe_protocol: wire protocol for networked tic-tac-toe.
//
// This crate defines the board types, message types, framing, and client-side
// reconciliation shared by the authoritative server (`tictactoe_server`) and
// any view layer. It has no networking of its own beyond `Read`/`Write`.
//
// Module overview:
// - `types.rs`:     Board value types (`Role`, `Cell`, `Coord`, `WinLine`,
//                   `Board`) with their JSON wire shapes.
// - `message.rs`:   `ClientMessage` (intents) and `ServerMessage` (state
//                   declarations), internally tagged on `type`.
// - `framing.rs`:   Length-delimited framing over any `Read`/`Write` stream:
//                   4-byte big-endian length prefix, then JSON payload.
// - `error.rs`:     `ProtocolError`, separating transport failures from
//                   undecodable payloads.
// - `reconcile.rs`: `ViewState`, which applies server messages to local view
//                   state and never computes game results itself.
//
// Design decisions:
// - **JSON payloads with explicit framing.** The JSON shapes match the
//   historical protocol; the length prefix fixes message boundaries on a
//   stream socket, so coalesced or split reads cannot corrupt a message.
// - **Sum types for messages.** Dispatch is an exhaustive `match`; unknown
//   tags fail to decode.
// - **No async runtime.** Blocking `std::io` only, like the server.

pub mod error;
pub mod framing;
pub mod message;
pub mod reconcile;
pub mod types;

pub use error::ProtocolError;
pub use framing::{MAX_MESSAGE_SIZE, encode, read_message, recv, send, write_message};
pub use message::{ClientMessage, MAX_CHAT_LEN, ServerMessage};
pub use reconcile::{ChatLine, ViewState};
pub use types::{BOARD_SIZE, Board, Cell, Coord, Role, WinLine};
