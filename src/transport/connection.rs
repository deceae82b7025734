//! WebSocket connection to the relay.
//!
//! This module owns the socket, its lifecycle and the one-time preamble,
//! and turns inbound text into decoded [`Inbound`] items.
//!
//! # Event Loop
//!
//! [`Connection::open`] spawns a tokio task that:
//!
//! - Connects to the relay (bounded by a timeout)
//! - Sends the unframed preamble, then reports [`ConnectionEvent::Opened`]
//! - Decodes inbound text, preamble exception included
//! - Writes outbound frames queued by [`Connection::send`]
//!
//! Events are delivered strictly in transport order through one channel.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Inbound, InboundDecoder};

use super::endpoint::Endpoint;

// ============================================================================
// Types
// ============================================================================

/// Receiving end of a connection's event stream.
pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;

type EventSender = mpsc::UnboundedSender<ConnectionEvent>;

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Lifecycle and data events of one connection.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Connected; the preamble has been sent.
    Opened,
    /// One decoded inbound item.
    Inbound(Inbound),
    /// The connection closed.
    Closed,
    /// Connecting failed, or the connection broke mid-stream.
    Failed(String),
}

// ============================================================================
// LinkState
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Open,
    Closed,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write one text message.
    Send(String),
    /// Close the socket and stop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one relay connection.
///
/// Cloning the handle does not open a second connection.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Link state (shared with event loop).
    link: Arc<Mutex<LinkState>>,
}

impl Connection {
    /// Starts connecting to the relay behind `endpoint`.
    ///
    /// Returns immediately. Progress arrives on the returned event stream:
    /// [`ConnectionEvent::Opened`] once connected and the preamble
    /// `host:game_port:display_name` is sent, or
    /// [`ConnectionEvent::Failed`].
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] or [`Error::Url`] if the endpoint or display name is
    /// invalid. Nothing is spawned in that case.
    pub fn open(
        endpoint: &Endpoint,
        display_name: &str,
        connect_timeout: Duration,
    ) -> Result<(Self, ConnectionEvents)> {
        let url = endpoint.relay_url()?;
        let preamble = endpoint.preamble(display_name)?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let link = Arc::new(Mutex::new(LinkState::Connecting));

        debug!(%url, "Opening relay connection");

        tokio::spawn(Self::run_event_loop(
            url,
            preamble,
            connect_timeout,
            command_rx,
            event_tx,
            Arc::clone(&link),
        ));

        Ok((Self { command_tx, link }, event_rx))
    }

    /// Returns `true` while the connection is open.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.link.lock() == LinkState::Open
    }

    /// Queues one text message.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] unless the connection is open
    /// - [`Error::ConnectionClosed`] if the I/O task is gone
    pub fn send(&self, text: String) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        self.command_tx
            .send(ConnectionCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes the connection gracefully.
    ///
    /// A no-op if the connection is already closed. Sends still queued are
    /// dropped.
    pub fn close(&self) {
        let mut link = self.link.lock();
        if *link == LinkState::Closed {
            return;
        }
        *link = LinkState::Closed;
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        url: Url,
        preamble: String,
        connect_timeout: Duration,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        event_tx: EventSender,
        link: Arc<Mutex<LinkState>>,
    ) {
        let connect = timeout(connect_timeout, connect_async(url.as_str()));

        let ws_stream = tokio::select! {
            result = connect => match result {
                Ok(Ok((ws_stream, _response))) => ws_stream,
                Ok(Err(e)) => {
                    warn!(%url, error = %e, "Relay connection failed");
                    Self::fail(&event_tx, &link, Error::connection(e.to_string()));
                    return;
                }
                Err(_) => {
                    warn!(%url, "Relay connection timed out");
                    let timeout_ms = u64::try_from(connect_timeout.as_millis()).unwrap_or(u64::MAX);
                    Self::fail(&event_tx, &link, Error::connection_timeout(timeout_ms));
                    return;
                }
            },

            // Closed (or every handle dropped) before the socket came up
            _ = command_rx.recv() => {
                debug!(%url, "Connect cancelled");
                *link.lock() = LinkState::Closed;
                return;
            }
        };

        let (mut ws_write, mut ws_read) = ws_stream.split();

        if let Err(e) = ws_write.send(Message::Text(preamble.into())).await {
            error!(error = %e, "Failed to send preamble");
            Self::fail(&event_tx, &link, Error::WebSocket(e));
            return;
        }

        // close() may have raced the handshake
        let cancelled = {
            let mut state = link.lock();
            let cancelled = *state == LinkState::Closed;
            if !cancelled {
                *state = LinkState::Open;
            }
            cancelled
        };
        if cancelled {
            let _ = ws_write.close().await;
            return;
        }

        info!(%url, "Relay connection established");
        Self::emit(&event_tx, ConnectionEvent::Opened);

        let mut decoder = InboundDecoder::new();

        loop {
            tokio::select! {
                // Incoming messages from the relay
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Inbound text");
                            for item in decoder.decode(&text) {
                                Self::emit(&event_tx, ConnectionEvent::Inbound(item));
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by relay");
                            Self::emit(&event_tx, ConnectionEvent::Closed);
                            break;
                        }

                        Some(Ok(Message::Binary(data))) => {
                            warn!(len = data.len(), "Ignoring binary message");
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            Self::emit(&event_tx, ConnectionEvent::Failed(e.to_string()));
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            Self::emit(&event_tx, ConnectionEvent::Closed);
                            break;
                        }

                        // Ignore Ping, Pong, Frame
                        _ => {}
                    }
                }

                // Commands from the client
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            // Queued before close(); dropped unsent
                            if *link.lock() == LinkState::Closed {
                                trace!(len = text.len(), "Dropping outbound text after close");
                                continue;
                            }
                            trace!(len = text.len(), "Outbound text");
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                error!(error = %e, "Failed to send message");
                                Self::emit(&event_tx, ConnectionEvent::Failed(e.to_string()));
                                break;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            Self::emit(&event_tx, ConnectionEvent::Closed);
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        *link.lock() = LinkState::Closed;
        debug!("Event loop terminated");
    }

    fn fail(event_tx: &EventSender, link: &Mutex<LinkState>, error: Error) {
        *link.lock() = LinkState::Closed;
        Self::emit(event_tx, ConnectionEvent::Failed(error.to_string()));
    }

    fn emit(event_tx: &EventSender, event: ConnectionEvent) {
        if event_tx.send(event).is_err() {
            trace!("Event receiver dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    async fn bind_relay() -> (TcpListener, u16) {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        (listener, port)
    }

    async fn next_event(events: &mut ConnectionEvents) -> ConnectionEvent {
        timeout(TEST_TIMEOUT, events.recv())
            .await
            .expect("event should arrive")
            .expect("event stream should be open")
    }

    #[tokio::test]
    async fn test_preamble_then_framed_messages() {
        let (listener, port) = bind_relay().await;

        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");

            let preamble = ws.next().await.expect("preamble").expect("preamble ok");
            ws.send(Message::Text("Welcome to the relay".into())).await.expect("notice");
            ws.send(Message::Text("7:{\"a\":1}".into())).await.expect("frame");

            let frame = ws.next().await.expect("frame").expect("frame ok");
            (preamble.into_text().expect("text").to_string(), frame.into_text().expect("text").to_string())
        });

        let endpoint = Endpoint::localhost(9001).with_relay_port(port);
        let (connection, mut events) = Connection::open(&endpoint, "alice", TEST_TIMEOUT).unwrap();

        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Opened));
        assert!(connection.is_open());
        assert!(matches!(
            next_event(&mut events).await,
            ConnectionEvent::Inbound(Inbound::Notice(text)) if text == "Welcome to the relay"
        ));
        assert!(matches!(
            next_event(&mut events).await,
            ConnectionEvent::Inbound(Inbound::Message(_))
        ));

        connection.send("2:{}".to_string()).unwrap();

        let (preamble, frame) = relay.await.unwrap();
        assert_eq!(preamble, "127.0.0.1:9001:alice");
        assert_eq!(frame, "2:{}");

        connection.close();
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let (_listener, port) = bind_relay().await;
        let endpoint = Endpoint::localhost(9001).with_relay_port(port);

        let (connection, _events) = Connection::open(&endpoint, "alice", TEST_TIMEOUT).unwrap();

        assert!(matches!(
            connection.send("2:{}".to_string()),
            Err(Error::NotConnected)
        ));
        connection.close();
    }

    #[tokio::test]
    async fn test_refused_connection_reports_failure() {
        let (listener, port) = bind_relay().await;
        drop(listener);

        let endpoint = Endpoint::localhost(9001).with_relay_port(port);
        let (connection, mut events) = Connection::open(&endpoint, "alice", TEST_TIMEOUT).unwrap();

        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Failed(_)));
        assert!(!connection.is_open());

        // Closing a connection that never opened is a no-op.
        connection.close();
        connection.close();
    }

    #[tokio::test]
    async fn test_close_then_send_fails() {
        let (listener, port) = bind_relay().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            while let Some(Ok(_)) = ws.next().await {}
        });

        let endpoint = Endpoint::localhost(9001).with_relay_port(port);
        let (connection, mut events) = Connection::open(&endpoint, "alice", TEST_TIMEOUT).unwrap();
        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Opened));

        connection.close();
        assert!(!connection.is_open());
        assert!(matches!(
            connection.send("2:{}".to_string()),
            Err(Error::NotConnected)
        ));
        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Closed));
    }

    #[tokio::test]
    async fn test_close_drops_queued_sends() {
        let (listener, port) = bind_relay().await;

        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");

            let mut texts = Vec::new();
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
                if let Message::Text(text) = message {
                    texts.push(text.to_string());
                }
            }
            texts
        });

        let endpoint = Endpoint::localhost(9001).with_relay_port(port);
        let (connection, mut events) = Connection::open(&endpoint, "alice", TEST_TIMEOUT).unwrap();
        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Opened));

        // Both calls run before the I/O task is polled again.
        connection.send("2:{}".to_string()).unwrap();
        connection.close();

        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Closed));

        let texts = timeout(TEST_TIMEOUT, relay).await.expect("relay should finish").unwrap();
        assert_eq!(texts, vec!["127.0.0.1:9001:alice".to_string()]);
    }

    #[test]
    fn test_send_after_io_task_gone() {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        drop(command_rx);

        let connection = Connection {
            command_tx,
            link: Arc::new(Mutex::new(LinkState::Open)),
        };

        assert!(matches!(
            connection.send("2:{}".to_string()),
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_relay_close_reported() {
        let (listener, port) = bind_relay().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            let _ = ws.next().await;
            ws.close(None).await.expect("close");
        });

        let endpoint = Endpoint::localhost(9001).with_relay_port(port);
        let (_connection, mut events) = Connection::open(&endpoint, "alice", TEST_TIMEOUT).unwrap();

        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Opened));
        assert!(matches!(next_event(&mut events).await, ConnectionEvent::Closed));
    }

    #[test]
    fn test_invalid_display_name_rejected_before_spawn() {
        let endpoint = Endpoint::localhost(9001);
        let result = Connection::open(&endpoint, "bad:name", TEST_TIMEOUT);
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
