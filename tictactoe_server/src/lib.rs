// tictactoe_server: authoritative session server for networked tic-tac-toe.
//
// The server owns the only copy of the game that matters. Clients send
// intents (`move`, `chat`, `reset`); the server validates them against the
// rules, applies the legal ones, and broadcasts the resulting state to every
// connected peer. Clients render what they are told.
//
// Module overview:
// - `game.rs`:        `GameSession`: board, turn, status, and the move rules
//                     (turn order, occupancy, win/draw detection, reset).
// - `connections.rs`: `ConnectionManager`: the live peers, role assignment
//                     under a capacity of two, unicast and broadcast delivery
//                     with failed peers pruned.
// - `server.rs`:      TCP listener, reader threads (one per client), and the
//                     coordinator loop. Uses `std::net` with a
//                     thread-per-reader architecture and an `mpsc` channel to
//                     funnel events into a single owner of all session state.
// - `client.rs`:      `NetClient`, a blocking-socket client with a background
//                     reader, used by tests and by any frontend.
//
// Dependencies: `tictactoe_protocol` (shared message types and framing).
//
// The server can run as a standalone binary (`main.rs`) or be embedded in
// another process via the library API (`start_server`).

pub mod client;
pub mod connections;
pub mod game;
pub mod server;

pub use client::{ClientError, NetClient};
pub use game::{GameSession, MoveError, Outcome, Snapshot, Status};
pub use server::{ServerConfig, ServerHandle, start_server};
