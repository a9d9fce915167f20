// Live connection set and role assignment.
//
// `ConnectionManager` is the roster half of the session: it maps each live
// `ConnectionId` to its `Role` and the write half of its socket. Like the
// `GameSession`, it is owned by the coordinator thread in `server.rs`, so
// `accept`, `broadcast` and `remove` never run concurrently with one another.
//
// Key responsibilities:
// - Capacity: at most two live connections. A third `accept` fails with
//   `CapacityError::SessionFull` and nothing is sent on its stream.
// - Role assignment: the first role in `[X, O]` not held by a live
//   connection. A role freed by a disconnect is handed to the next newcomer.
// - Delivery: `send_to` and `broadcast` frame a `ServerMessage` and write it
//   out. A write failure removes and closes that one peer; delivery to the
//   others continues. A message too large to frame is logged and sent to no
//   one, and every peer stays connected.
//
// Writers are generic over `PeerWriter` so unit tests can inject failing
// peers. Production uses `BufWriter<TcpStream>`, whose `close` shuts the
// socket down so the peer's reader thread wakes up and exits.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufWriter, Write};
use std::net::{Shutdown, TcpStream};

use tictactoe_protocol::{Role, ServerMessage, encode, write_message};
use tracing::{debug, info, warn};

/// Maximum simultaneous players.
pub const CAPACITY: usize = Role::ALL.len();

/// Server-assigned identity of one accepted socket. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Refusal to register a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    #[error("session is full")]
    SessionFull,
}

/// Write half of a peer connection.
pub trait PeerWriter: Write {
    /// Tear the connection down. Called once, when the peer is removed.
    fn close(&mut self) {}
}

impl PeerWriter for BufWriter<TcpStream> {
    fn close(&mut self) {
        let _ = self.flush();
        let _ = self.get_ref().shutdown(Shutdown::Both);
    }
}

struct Connection<W> {
    role: Role,
    writer: W,
}

/// The live set of connected peers.
pub struct ConnectionManager<W = BufWriter<TcpStream>> {
    live: BTreeMap<ConnectionId, Connection<W>>,
}

impl<W: PeerWriter> Default for ConnectionManager<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: PeerWriter> ConnectionManager<W> {
    pub fn new() -> Self {
        Self {
            live: BTreeMap::new(),
        }
    }

    /// Register a new connection and tell it its role.
    ///
    /// If the role message cannot be written, the connection is dropped
    /// straight away but the assignment is still reported; its reader will
    /// observe the dead socket and report a disconnect that is then a no-op.
    pub fn accept(&mut self, id: ConnectionId, writer: W) -> Result<Role, CapacityError> {
        let role = self.free_role().ok_or(CapacityError::SessionFull)?;
        self.live.insert(id, Connection { role, writer });
        info!(%id, %role, "player connected");
        self.send_to(id, &ServerMessage::Role { symbol: role });
        Ok(role)
    }

    /// Drop a connection from the live set. Unknown ids are ignored.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Role> {
        let mut conn = self.live.remove(&id)?;
        conn.writer.close();
        info!(%id, role = %conn.role, "player disconnected");
        Some(conn.role)
    }

    /// Send a message to one live connection.
    pub fn send_to(&mut self, id: ConnectionId, msg: &ServerMessage) -> bool {
        if !self.live.contains_key(&id) {
            return false;
        }
        let Some(payload) = encode_or_log(msg) else {
            return false;
        };
        let Some(conn) = self.live.get_mut(&id) else {
            return false;
        };
        match write_message(&mut conn.writer, &payload) {
            Ok(()) => true,
            Err(err) => {
                self.drop_failed(id, &err);
                false
            }
        }
    }

    /// Send a message to every live connection. Returns how many received it.
    ///
    /// The message is encoded once. A message that cannot be framed reaches
    /// nobody and costs nobody their connection; only peers whose own write
    /// fails are dropped.
    pub fn broadcast(&mut self, msg: &ServerMessage) -> usize {
        let Some(payload) = encode_or_log(msg) else {
            return 0;
        };
        let mut failed = Vec::new();
        let mut delivered = 0;
        for (id, conn) in &mut self.live {
            match write_message(&mut conn.writer, &payload) {
                Ok(()) => delivered += 1,
                Err(err) => failed.push((*id, err)),
            }
        }
        for (id, err) in failed {
            self.drop_failed(id, &err);
        }
        debug!(delivered, "broadcast");
        delivered
    }

    /// Close every connection, e.g. on shutdown.
    pub fn close_all(&mut self) {
        let ids: Vec<ConnectionId> = self.live.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
    }

    pub fn role_of(&self, id: ConnectionId) -> Option<Role> {
        self.live.get(&id).map(|conn| conn.role)
    }

    /// Roles currently held, in connection order.
    pub fn roles(&self) -> Vec<Role> {
        self.live.values().map(|conn| conn.role).collect()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.free_role().is_none()
    }

    fn free_role(&self) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.live.values().all(|conn| conn.role != *role))
    }

    fn drop_failed(&mut self, id: ConnectionId, err: &io::Error) {
        warn!(%id, %err, "send failed, dropping peer");
        self.remove(id);
    }
}

/// Encode `msg` for the wire, or log why it cannot be sent.
fn encode_or_log(msg: &ServerMessage) -> Option<Vec<u8>> {
    match encode(msg) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(%err, "not sending unencodable message");
            None
        }
    }
}
