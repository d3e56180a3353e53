//! Individual session connection management.
//!
//! Each connection wraps a WebSocket stream split into a read task and a
//! write task. The tracker never touches the socket directly: it holds a
//! [`WsSession`] that queues text for the write task.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use signal_core::{SendError, SessionHandle, SessionId};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, error, warn};

/// Maximum inbound message size (1MB). Signaling payloads are small SDP blobs.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Text frame received on a session.
#[derive(Debug)]
pub struct IncomingMessage {
    pub session: SessionId,
    pub text: String,
}

/// Event emitted by a connection's tasks.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Received a text message
    Message(IncomingMessage),
    /// The peer closed the connection or the stream ended
    Closed { session: SessionId },
    /// Reading or writing failed
    Error { session: SessionId, error: String },
}

/// Cloneable send handle for one connection.
#[derive(Debug, Clone)]
pub struct WsSession {
    id: SessionId,
    outbox: mpsc::UnboundedSender<String>,
}

impl SessionHandle for WsSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn send(&self, text: String) -> Result<(), SendError> {
        self.outbox.send(text).map_err(|_| SendError::Closed(self.id))
    }
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// A single WebSocket session.
pub struct SessionConnection {
    handle: WsSession,
    read_task: Option<JoinHandle<()>>,
    write_task: Option<JoinHandle<()>>,
}

impl SessionConnection {
    /// Wrap an upgraded stream, spawning its read and write tasks.
    pub fn new(
        id: SessionId,
        ws_stream: WebSocketStream<TcpStream>,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        let (write, read) = ws_stream.split();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

        let read_events = event_tx.clone();
        let read_task = tokio::spawn(async move {
            Self::read_loop(id, read, read_events).await;
        });
        let write_task = tokio::spawn(async move {
            Self::write_loop(id, write, outbox_rx, event_tx).await;
        });

        Self {
            handle: WsSession {
                id,
                outbox: outbox_tx,
            },
            read_task: Some(read_task),
            write_task: Some(write_task),
        }
    }

    /// Handle for queueing outbound messages.
    pub fn handle(&self) -> WsSession {
        self.handle.clone()
    }

    /// Read loop that forwards text frames to the event channel.
    async fn read_loop(
        id: SessionId,
        mut read: WsSource,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) {
        loop {
            let text = match read.next().await {
                Some(Ok(Message::Text(text))) => text.to_string(),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("Dropping non-UTF-8 binary frame from {}", id);
                        continue;
                    }
                },
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame from {}", id);
                    break;
                }
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    debug!("Connection {} closed", id);
                    break;
                }
                Some(Err(e)) => {
                    error!("WebSocket error on {}: {}", id, e);
                    let _ = event_tx.send(ConnectionEvent::Error {
                        session: id,
                        error: e.to_string(),
                    });
                    return;
                }
                None => {
                    debug!("Connection {} stream ended", id);
                    break;
                }
            };

            let _ = event_tx.send(ConnectionEvent::Message(IncomingMessage { session: id, text }));
        }

        let _ = event_tx.send(ConnectionEvent::Closed { session: id });
    }

    /// Write loop draining the outbox. A failed send ends the session.
    async fn write_loop(
        id: SessionId,
        mut write: WsSink,
        mut outbox: mpsc::UnboundedReceiver<String>,
        event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) {
        while let Some(text) = outbox.recv().await {
            if let Err(e) = write.send(Message::text(text)).await {
                warn!("Failed to send to {}: {}", id, e);
                let _ = event_tx.send(ConnectionEvent::Error {
                    session: id,
                    error: e.to_string(),
                });
                return;
            }
        }
        let _ = write.send(Message::Close(None)).await;
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(task) = self.write_task.take() {
            task.abort();
        }
    }
}
