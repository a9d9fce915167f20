// TCP client for connecting to the game server.
//
// Provides a non-blocking interface for a view layer to talk to the server.
// Architecture:
// - `connect()` performs the TCP connect and waits for the server's first
//   message on the calling thread: a `role` assignment, or a `rejected`
//   refusal when the session is full. It then spawns a background reader.
// - The reader thread calls `recv()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel. Undecodable frames are skipped.
// - The caller holds a `BufWriter<TcpStream>` for sending intents.
// - `poll()` drains the inbox non-blocking; `recv_timeout()` waits for one.
//
// The client never applies its own intents. Feed everything from `poll()`
// into a `ViewState` and render from that.

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tictactoe_protocol::{ClientMessage, ProtocolError, Role, ServerMessage, recv, send};
use tracing::{debug, warn};

/// How long `connect` waits for the role assignment.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("rejected by server: {0}")]
    Rejected(String),
    #[error("expected a role assignment, got {0:?}")]
    UnexpectedHandshake(Box<ServerMessage>),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// TCP client for server communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    role: Role,
}

impl NetClient {
    /// Connect, wait for the role assignment, and spawn a reader thread.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream
            .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
            .map_err(ClientError::Connect)?;

        let reader_stream = stream.try_clone().map_err(ClientError::Connect)?;
        let writer = BufWriter::new(stream);
        let mut reader = BufReader::new(reader_stream);

        let role = match recv::<_, ServerMessage>(&mut reader)? {
            ServerMessage::Role { symbol } => symbol,
            ServerMessage::Rejected { reason } => return Err(ClientError::Rejected(reason)),
            other => return Err(ClientError::UnexpectedHandshake(Box::new(other))),
        };
        debug!(%role, "assigned role");

        // Clear read timeout for the long-lived reader loop.
        reader
            .get_ref()
            .set_read_timeout(None)
            .map_err(ClientError::Connect)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
            role,
        })
    }

    /// The role the server assigned to this connection.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The message this client was greeted with, for seeding a `ViewState`.
    pub fn role_message(&self) -> ServerMessage {
        ServerMessage::Role { symbol: self.role }
    }

    pub fn send_move(&mut self, row: u8, col: u8) -> Result<(), ClientError> {
        self.send(&ClientMessage::Move { row, col })
    }

    /// Send chat text. Blank text is not sent.
    pub fn send_chat(&mut self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.send(&ClientMessage::Chat {
            message: text.into(),
        })
    }

    pub fn send_reset(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Reset)
    }

    /// Send any intent, including ones a well-behaved view would filter.
    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        send(&mut self.writer, msg)?;
        Ok(())
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Wait up to `timeout` for the next server message. `None` on timeout or
    /// once the connection is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ServerMessage> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Close the connection. The server frees this client's role.
    pub fn disconnect(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    loop {
        match recv::<_, ServerMessage>(&mut reader) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Owner dropped the receiver
                }
            }
            Err(err @ ProtocolError::Decode(_)) => {
                warn!(%err, "invalid message from server");
            }
            Err(err) => {
                debug!(%err, "disconnected from server");
                break;
            }
        }
    }
}
