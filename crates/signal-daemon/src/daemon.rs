//! The serving loop: one task owns the tracker and handles every event in
//! arrival order, each to completion.

use crate::connection::WsSession;
use crate::server::{ServerEvent, WebSocketServer};
use anyhow::Result;
use signal_core::{EventBus, Outcome, Tracker, TrackerConfig, TrackerEvent};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Daemon state holding all components.
pub struct Daemon {
    tracker: Tracker<WsSession>,
    server: WebSocketServer,
}

impl Daemon {
    pub fn new(config: TrackerConfig, events: Arc<EventBus>) -> Self {
        Self {
            tracker: Tracker::with_events(config, events),
            server: WebSocketServer::new(),
        }
    }

    pub fn tracker(&self) -> &Tracker<WsSession> {
        &self.tracker
    }

    /// Number of sessions the server still considers live.
    pub fn session_count(&self) -> usize {
        self.server.session_count()
    }

    /// Serve `listener` until `shutdown` resolves.
    pub async fn run(mut self, listener: TcpListener, shutdown: impl Future<Output = ()>) -> Result<Self> {
        let address = listener.local_addr()?.to_string();
        self.tracker
            .events()
            .emit(TrackerEvent::Listening { address });

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.server.accept_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }

                Some(event) = self.server.poll_event() => {
                    self.on_server_event(event);
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(self)
    }

    fn on_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { session, address } => {
                debug!("Session {} ready ({})", session, address);
            }
            ServerEvent::Message { session, text } => {
                if let Outcome::Rejected(e) = self.tracker.handle(&session, &text) {
                    debug!("Message rejected: {}", e);
                }
            }
            ServerEvent::Closed { session } => {
                info!("Session disconnected: {}", session);
                self.tracker.on_session_ended(session);
            }
            ServerEvent::Failed { session, error } => {
                self.tracker.on_transport_error(session, &error);
            }
        }
    }
}
