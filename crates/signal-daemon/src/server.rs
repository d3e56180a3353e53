//! WebSocket server for accepting tracker sessions.
//!
//! Manages connection lifecycle and turns per-connection task output into
//! `ServerEvent`s. Upgrades run in their own tasks so a slow client cannot
//! stall message handling.

use crate::connection::{ConnectionEvent, MAX_MESSAGE_SIZE, SessionConnection, WsSession};
use anyhow::Result;
use signal_core::SessionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{WebSocketStream, accept_async_with_config};
use tracing::{debug, error, info};

/// How long a client gets to finish the WebSocket upgrade.
const UPGRADE_TIMEOUT: Duration = Duration::from_secs(10);

/// Event emitted by the server, one per connection-level happening.
#[derive(Debug)]
pub enum ServerEvent {
    /// An upgraded connection is ready to receive messages.
    Connected {
        session: SessionId,
        address: SocketAddr,
    },
    /// A text message, with a handle for replying.
    Message { session: WsSession, text: String },
    /// The session closed cleanly.
    Closed { session: SessionId },
    /// The session failed while reading or writing.
    Failed { session: SessionId, error: String },
}

/// Frames and messages past the size limit fail the session while the
/// header is read, before the payload is buffered.
fn ws_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(MAX_MESSAGE_SIZE);
    config.max_frame_size = Some(MAX_MESSAGE_SIZE);
    config
}

type Upgraded = (WebSocketStream<TcpStream>, SocketAddr);

/// WebSocket server managing session connections.
pub struct WebSocketServer {
    /// Live connections indexed by session ID
    connections: HashMap<SessionId, SessionConnection>,
    /// Counter for generating session IDs
    next_session_id: u64,
    /// Channel sender for connection events (messages, closes, errors)
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    /// Channel receiver for connection events
    event_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    /// Finished upgrades waiting to be registered
    upgraded_tx: mpsc::UnboundedSender<Upgraded>,
    upgraded_rx: mpsc::UnboundedReceiver<Upgraded>,
}

impl Default for WebSocketServer {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketServer {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (upgraded_tx, upgraded_rx) = mpsc::unbounded_channel();

        Self {
            connections: HashMap::new(),
            next_session_id: 1,
            event_tx,
            event_rx,
            upgraded_tx,
            upgraded_rx,
        }
    }

    /// Bind to an address and return the TCP listener.
    pub async fn bind(listen_addr: &str) -> Result<TcpListener> {
        let listener = TcpListener::bind(listen_addr).await?;
        info!("WebSocket server listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Start upgrading a new TCP connection in the background.
    ///
    /// The session shows up as `ServerEvent::Connected` from `poll_event`
    /// once the upgrade completes.
    pub fn accept_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let upgraded_tx = self.upgraded_tx.clone();
        tokio::spawn(async move {
            let upgrade = accept_async_with_config(stream, Some(ws_config()));
            match timeout(UPGRADE_TIMEOUT, upgrade).await {
                Ok(Ok(ws)) => {
                    let _ = upgraded_tx.send((ws, addr));
                }
                Ok(Err(e)) => {
                    // Health checks (like `nc -z`) connect and close without upgrading.
                    let err_str = e.to_string();
                    if err_str.contains("Handshake not finished")
                        || err_str.contains("Connection reset")
                        || err_str.contains("unexpected EOF")
                    {
                        debug!("Connection closed before upgrade from {}", addr);
                    } else {
                        error!("WebSocket upgrade failed for {}: {}", addr, e);
                    }
                }
                Err(_) => {
                    debug!("WebSocket upgrade from {} timed out", addr);
                }
            }
        });
    }

    fn register(&mut self, ws: WebSocketStream<TcpStream>, addr: SocketAddr) -> SessionId {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        info!("New connection from {} ({})", addr, id);
        let conn = SessionConnection::new(id, ws, self.event_tx.clone());
        self.connections.insert(id, conn);
        id
    }

    /// Wait for the next server event.
    ///
    /// Each session produces at most one `Closed`/`Failed`; later events
    /// from its tasks are dropped.
    pub async fn poll_event(&mut self) -> Option<ServerEvent> {
        loop {
            tokio::select! {
                Some((ws, address)) = self.upgraded_rx.recv() => {
                    let session = self.register(ws, address);
                    return Some(ServerEvent::Connected { session, address });
                }
                Some(event) = self.event_rx.recv() => match event {
                    ConnectionEvent::Message(msg) => {
                        let Some(conn) = self.connections.get(&msg.session) else {
                            debug!("Dropping message from closed session {}", msg.session);
                            continue;
                        };
                        return Some(ServerEvent::Message {
                            session: conn.handle(),
                            text: msg.text,
                        });
                    }
                    ConnectionEvent::Closed { session } => {
                        if self.connections.remove(&session).is_some() {
                            return Some(ServerEvent::Closed { session });
                        }
                    }
                    ConnectionEvent::Error { session, error } => {
                        if self.connections.remove(&session).is_some() {
                            return Some(ServerEvent::Failed { session, error });
                        }
                    }
                },
                else => return None,
            }
        }
    }

    /// Get the number of live sessions.
    pub fn session_count(&self) -> usize {
        self.connections.len()
    }
}
