// TCP server and main event loop for the game session.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the coordinator.
// - **Reader threads** (one per accepted client): call `framing::recv()` in a
//   loop and send `InternalEvent::MessageFrom` to the coordinator. Undecodable
//   frames are logged and skipped. On EOF, I/O error or idle timeout they send
//   `InternalEvent::Disconnected` and exit.
// - **Coordinator thread**: owns the `SessionServer` (the `GameSession` plus
//   the `ConnectionManager`), receives events from the channel, and handles
//   them one at a time.
//
// Because only the coordinator touches game state and writes to sockets,
// every state transition and the broadcast of its result happen in one step,
// in channel order. Two players moving at the same instant are simply two
// events in the queue: the first is applied, the second is judged against
// the new state. No peer can observe states out of order.
//
// Shutdown: the coordinator checks a `keep_running` flag (cleared by
// `ServerHandle::stop`) between events and closes every connection on exit.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tictactoe_protocol::{
    ClientMessage, MAX_CHAT_LEN, ProtocolError, ServerMessage, recv, send,
};
use tracing::{debug, info, warn};

use crate::connections::{CAPACITY, CapacityError, ConnectionId, ConnectionManager};
use crate::game::{GameSession, Outcome, Snapshot};

/// How long the coordinator waits for an event before re-checking
/// `keep_running`.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on a single blocking write to a peer, so one stalled client
/// cannot freeze the coordinator.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from listener/reader threads to the coordinator.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        conn: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        conn: ConnectionId,
    },
}

/// Configuration for starting a game server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Drop a peer that sends nothing for this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 12345,
            idle_timeout: None,
        }
    }
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join_inner();
    }

    /// Block until the server exits (it only exits after `stop`, so for a
    /// standalone process this blocks until the process is killed).
    pub fn join(mut self) {
        self.join_inner();
    }

    fn join_inner(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, capacity = CAPACITY, "game server listening");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let thread = thread::spawn(move || {
        run_server(listener, config, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Coordinator loop. Runs until `keep_running` is set to false.
fn run_server(listener: TcpListener, config: ServerConfig, keep_running: Arc<AtomicBool>) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();
    let mut server = SessionServer::new(config.idle_timeout, tx.clone(), keep_running.clone());

    // Non-blocking accept so the listener thread can notice shutdown.
    if let Err(err) = listener.set_nonblocking(true) {
        warn!(%err, "could not make listener non-blocking");
    }
    let keep_running_listener = keep_running.clone();
    thread::spawn(move || accept_loop(listener, tx, keep_running_listener));

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => server.handle_event(event),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("game server stopping");
    server.connections.close_all();
}

/// Listener thread: forward every accepted socket to the coordinator.
fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "incoming connection");
                stream.set_nonblocking(false).ok();
                if tx.send(InternalEvent::NewConnection { stream }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(20));
            }
            Err(err) => {
                // Per-connection accept failures (e.g. the peer reset before
                // we got to it) must not end the listener.
                warn!(%err, "accept failed");
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
}

/// Per-connection reader. Runs in its own thread until the peer goes away.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    conn: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match recv::<_, ClientMessage>(&mut reader) {
            Ok(message) => {
                if tx.send(InternalEvent::MessageFrom { conn, message }).is_err() {
                    return;
                }
            }
            Err(err @ ProtocolError::Decode(_)) => {
                warn!(%conn, %err, "dropping malformed message");
            }
            Err(err) => {
                debug!(%conn, %err, "read loop ending");
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { conn });
}

/// The authoritative session: game state, live connections, and the
/// dispatch from intents to state messages.
struct SessionServer {
    game: GameSession,
    connections: ConnectionManager,
    next_connection: u64,
    idle_timeout: Option<Duration>,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
}

impl SessionServer {
    fn new(
        idle_timeout: Option<Duration>,
        tx: Sender<InternalEvent>,
        keep_running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            game: GameSession::new(),
            connections: ConnectionManager::new(),
            next_connection: 0,
            idle_timeout,
            tx,
            keep_running,
        }
    }

    fn handle_event(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::NewConnection { stream } => self.handle_new_connection(stream),
            InternalEvent::MessageFrom { conn, message } => self.handle_message(conn, message),
            InternalEvent::Disconnected { conn } => {
                // No broadcast: the remaining peer is not told.
                self.connections.remove(conn);
            }
        }
    }

    /// Register the socket and spawn its reader, or refuse it when both
    /// roles are taken.
    fn handle_new_connection(&mut self, stream: TcpStream) {
        let conn = ConnectionId(self.next_connection);
        self.next_connection += 1;

        stream.set_write_timeout(Some(WRITE_TIMEOUT)).ok();
        if let Err(err) = stream.set_read_timeout(self.idle_timeout) {
            warn!(%conn, %err, "could not set idle timeout");
        }

        let write_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(err) => {
                warn!(%conn, %err, "could not clone stream");
                return;
            }
        };

        match self.connections.accept(conn, BufWriter::new(write_stream)) {
            Ok(_role) => {
                let reader = BufReader::new(stream);
                let tx = self.tx.clone();
                let keep_running = self.keep_running.clone();
                thread::spawn(move || reader_loop(reader, conn, tx, keep_running));
            }
            Err(err) => reject(conn, stream, err),
        }
    }

    fn handle_message(&mut self, conn: ConnectionId, message: ClientMessage) {
        let Some(role) = self.connections.role_of(conn) else {
            debug!(%conn, "message from a connection that is no longer live");
            return;
        };
        match message {
            ClientMessage::Move { row, col } => match self.game.apply_move(role, row, col) {
                Ok(outcome) => {
                    let msg = state_message(&outcome, &self.game.snapshot());
                    self.connections.broadcast(&msg);
                }
                Err(err) => {
                    debug!(%role, row, col, %err, "ignoring move");
                }
            },
            ClientMessage::Chat { message } => {
                if message.trim().is_empty() {
                    debug!(%role, "ignoring empty chat");
                    return;
                }
                if message.len() > MAX_CHAT_LEN {
                    warn!(%role, len = message.len(), "dropping oversized chat");
                    return;
                }
                let msg = ServerMessage::Chat {
                    message: format!("[{role}] {message}"),
                    sender: Some(role),
                };
                self.connections.broadcast(&msg);
            }
            ClientMessage::Reset => {
                info!(%role, "game reset");
                let outcome = self.game.reset();
                let msg = state_message(&outcome, &self.game.snapshot());
                self.connections.broadcast(&msg);
            }
        }
    }
}

/// Build the state message announcing `outcome` from the snapshot taken
/// right after the transition, before any other event is handled.
fn state_message(outcome: &Outcome, snapshot: &Snapshot) -> ServerMessage {
    let board = snapshot.board;
    match *outcome {
        Outcome::Continued { turn } => ServerMessage::Update {
            board,
            current_player: turn,
        },
        Outcome::Won { role, line } => {
            info!(winner = %role, "game won");
            ServerMessage::Winner {
                player: role,
                winning_line: line,
                board,
            }
        }
        Outcome::Draw => {
            info!("game drawn");
            ServerMessage::Draw { board }
        }
        Outcome::Reset { turn } => ServerMessage::Reset {
            board,
            current_player: turn,
        },
    }
}

/// Tell a refused connection why, then close it.
fn reject(conn: ConnectionId, stream: TcpStream, err: CapacityError) {
    warn!(%conn, %err, "refusing connection");
    let mut writer = BufWriter::new(stream);
    let rejected = ServerMessage::Rejected {
        reason: err.to_string(),
    };
    if let Err(err) = send(&mut writer, &rejected) {
        debug!(%conn, %err, "could not deliver rejection");
    }
    let _ = writer.get_ref().shutdown(Shutdown::Both);
}
