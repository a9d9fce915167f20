// Test-only player for multiplayer integration tests.
//
// Wraps the real `NetClient` (from `tictactoe_server::client`) and a real
// `ViewState` (from `tictactoe_protocol::reconcile`) to provide a synchronous,
// test-friendly API for exercising the full pipeline:
// click -> intent -> server rules -> broadcast -> both views reconcile.
//
// The only test-specific code here is the synchronous polling wrappers
// (blocking loops around `NetClient::poll()`). All networking and
// reconciliation uses the same code paths as a real frontend.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use tictactoe_protocol::message::ServerMessage;
use tictactoe_protocol::reconcile::ViewState;
use tictactoe_protocol::types::Role;
use tictactoe_server::client::{ClientError, NetClient};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test player wrapping a real NetClient and ViewState.
pub struct TestPlayer {
    client: NetClient,
    pub view: ViewState,
}

impl TestPlayer {
    /// Connect to a server and seed the view with the assigned role.
    pub fn connect(addr: SocketAddr) -> Self {
        Self::try_connect(addr).expect("TestPlayer::connect failed")
    }

    pub fn try_connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let client = NetClient::connect(addr)?;
        let mut view = ViewState::new();
        view.apply(&client.role_message());
        Ok(Self { client, view })
    }

    /// Connect, retrying while the session is still full. A freed role is
    /// reclaimed asynchronously after the previous holder disconnects.
    pub fn connect_when_free(addr: SocketAddr) -> Self {
        let start = Instant::now();
        loop {
            match Self::try_connect(addr) {
                Ok(player) => return player,
                Err(ClientError::Rejected(_)) if start.elapsed() < POLL_TIMEOUT => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => panic!("TestPlayer::connect_when_free failed: {e}"),
            }
        }
    }

    pub fn role(&self) -> Role {
        self.client.role()
    }

    /// Click a cell the way a view would: only sends when the local view
    /// says the move is worth submitting. Returns whether it was sent.
    pub fn click(&mut self, row: u8, col: u8) -> bool {
        if !self.view.can_submit_move(row, col) {
            return false;
        }
        self.client.send_move(row, col).expect("send_move failed");
        true
    }

    /// Send a move without consulting the view, like a misbehaving client.
    pub fn force_move(&mut self, row: u8, col: u8) {
        self.client.send_move(row, col).expect("send_move failed");
    }

    pub fn chat(&mut self, text: &str) {
        self.client.send_chat(text).expect("send_chat failed");
    }

    pub fn reset(&mut self) {
        self.client.send_reset().expect("send_reset failed");
    }

    /// Blocking poll until a message matching `pred` arrives. Every message
    /// received on the way, including the match, is applied to the view.
    pub fn poll_until(&mut self, mut pred: impl FnMut(&ServerMessage) -> bool) -> ServerMessage {
        let start = Instant::now();
        loop {
            let remaining = POLL_TIMEOUT.saturating_sub(start.elapsed());
            assert!(!remaining.is_zero(), "timed out waiting for server message");
            if let Some(msg) = self.client.recv_timeout(remaining.min(POLL_INTERVAL)) {
                self.view.apply(&msg);
                if pred(&msg) {
                    return msg;
                }
            }
        }
    }

    /// Blocking poll for the next message, whatever it is.
    pub fn next_message(&mut self) -> ServerMessage {
        self.poll_until(|_| true)
    }

    /// Blocking poll until the next board-carrying state message.
    pub fn poll_until_state(&mut self) -> ServerMessage {
        self.poll_until(|msg| msg.board().is_some())
    }

    /// Non-blocking: apply and return everything queued after a short
    /// settling delay.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        thread::sleep(Duration::from_millis(100));
        let messages = self.client.poll();
        for msg in &messages {
            self.view.apply(msg);
        }
        messages
    }

    /// Close the connection.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }
}
