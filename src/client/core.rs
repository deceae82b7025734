//! Client event loop and control handle.
//!
//! A [`Client`] owns one [`Session`] and at most one relay [`Connection`].
//! [`Client::run`] is a single loop that serialises user requests from
//! [`ClientHandle`]s with events from the connection, feeds them to the
//! session, and carries out the resulting [`Update`]s.
//!
//! # Example
//!
//! ```no_run
//! use punter_client::{Client, Endpoint, SiteId, TracingRenderer};
//!
//! # async fn example() -> punter_client::Result<()> {
//! let (client, handle) = Client::builder().build()?;
//!
//! handle.request_connect(Endpoint::localhost(9001), "alice")?;
//! let game = tokio::spawn(async move {
//!     let mut renderer = TracingRenderer;
//!     client.run(&mut renderer).await
//! });
//!
//! // Later, when it is our turn:
//! handle.request_claim(SiteId::new(1), SiteId::new(2))?;
//!
//! drop(handle);
//! let session = game.await.expect("client task");
//! println!("final scores: {:?}", session.scores());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SiteId;
use crate::protocol::Move;
use crate::render::{LogCategory, Renderer};
use crate::session::{Session, Update};
use crate::transport::{Connection, ConnectionEvent, ConnectionEvents, Endpoint, validate_display_name};

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// ClientRequest
// ============================================================================

/// A user request posted by a [`ClientHandle`].
#[derive(Debug)]
enum ClientRequest {
    Connect {
        endpoint: Endpoint,
        display_name: String,
    },
    Disconnect,
    Claim {
        source: SiteId,
        target: SiteId,
    },
    Pass,
}

// ============================================================================
// ClientHandle
// ============================================================================

/// Cloneable handle for driving a running [`Client`].
///
/// Requests are queued and processed by [`Client::run`] in order. Rejections
/// (wrong turn, owned river, ...) are reported through the renderer as
/// error log lines, not returned here.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    request_tx: mpsc::UnboundedSender<ClientRequest>,
}

impl ClientHandle {
    /// Asks the client to connect to `endpoint` as `display_name`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the display name cannot be sent in the preamble
    /// - [`Error::ClientClosed`] if the client loop has stopped
    pub fn request_connect(&self, endpoint: Endpoint, display_name: impl Into<String>) -> Result<()> {
        let display_name = display_name.into();
        validate_display_name(&display_name)?;
        self.post(ClientRequest::Connect {
            endpoint,
            display_name,
        })
    }

    /// Asks the client to drop the connection.
    ///
    /// # Errors
    ///
    /// [`Error::ClientClosed`] if the client loop has stopped.
    pub fn request_disconnect(&self) -> Result<()> {
        self.post(ClientRequest::Disconnect)
    }

    /// Asks the client to claim the river between `source` and `target`.
    ///
    /// # Errors
    ///
    /// [`Error::ClientClosed`] if the client loop has stopped.
    pub fn request_claim(&self, source: SiteId, target: SiteId) -> Result<()> {
        self.post(ClientRequest::Claim { source, target })
    }

    /// Asks the client to pass this turn.
    ///
    /// # Errors
    ///
    /// [`Error::ClientClosed`] if the client loop has stopped.
    pub fn request_pass(&self) -> Result<()> {
        self.post(ClientRequest::Pass)
    }

    /// Returns `true` once the client loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.request_tx.is_closed()
    }

    fn post(&self, request: ClientRequest) -> Result<()> {
        self.request_tx
            .send(request)
            .map_err(|_| Error::ClientClosed)
    }
}

// ============================================================================
// Link
// ============================================================================

/// The live connection and its event stream.
struct Link {
    connection: Connection,
    events: ConnectionEvents,
}

impl Link {
    fn close(self) {
        self.connection.close();
    }
}

// ============================================================================
// Client
// ============================================================================

/// Punter client: one session, one relay connection at a time.
///
/// Create with [`Client::builder()`], then drive with [`Client::run`].
pub struct Client {
    options: ClientOptions,
    request_rx: mpsc::UnboundedReceiver<ClientRequest>,
    session: Session,
    link: Option<Link>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("session", &self.session.id())
            .field("state", &self.session.connection_state())
            .field("linked", &self.link.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn new(options: ClientOptions) -> (Self, ClientHandle) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();

        let client = Self {
            options,
            request_rx,
            session: Session::new(),
            link: None,
        };

        (client, ClientHandle { request_tx })
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the session.
    #[inline]
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

// ============================================================================
// Client - Event Loop
// ============================================================================

impl Client {
    /// Runs until every [`ClientHandle`] is dropped.
    ///
    /// Any open connection is closed on exit. Returns the final session so
    /// callers can inspect scores and the ledger.
    pub async fn run<R: Renderer + ?Sized>(mut self, renderer: &mut R) -> Session {
        info!(session = %self.session.id(), "Client started");

        loop {
            tokio::select! {
                request = self.request_rx.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    self.handle_request(request, renderer);
                }

                event = next_event(&mut self.link) => {
                    self.handle_event(event, renderer);
                }
            }
        }

        if let Some(link) = self.link.take() {
            link.close();
        }

        info!(session = %self.session.id(), "Client stopped");
        self.session
    }

    fn handle_request<R: Renderer + ?Sized>(&mut self, request: ClientRequest, renderer: &mut R) {
        debug!(?request, "Client request");

        let result = match request {
            ClientRequest::Connect {
                endpoint,
                display_name,
            } => self.connect(&endpoint, &display_name),
            ClientRequest::Disconnect => Ok(self.disconnect()),
            ClientRequest::Claim { source, target } => self.session.request_claim(source, target),
            ClientRequest::Pass => self.session.request_pass(),
        };

        match result {
            Ok(updates) => self.apply(updates, renderer),
            Err(e) => {
                debug!(error = %e, "Request rejected");
                renderer.on_log_line(LogCategory::Error, &e.to_string());
            }
        }
    }

    fn connect(&mut self, endpoint: &Endpoint, display_name: &str) -> Result<Vec<Update>> {
        if self.link.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let relay = endpoint.relay_url()?;
        let mut updates = self.session.connect_requested(relay.as_str())?;

        match Connection::open(endpoint, display_name, self.options.connect_timeout) {
            Ok((connection, events)) => {
                self.link = Some(Link { connection, events });
            }
            Err(e) => {
                warn!(error = %e, "Connection could not be started");
                updates.extend(self.session.transport_failed(&e.to_string()));
            }
        }

        Ok(updates)
    }

    fn disconnect(&mut self) -> Vec<Update> {
        let Some(link) = self.link.take() else {
            debug!("Disconnect requested while not connected");
            return Vec::new();
        };

        link.close();
        self.session.disconnect_requested()
    }

    fn handle_event<R: Renderer + ?Sized>(&mut self, event: Option<ConnectionEvent>, renderer: &mut R) {
        let updates = match event {
            Some(ConnectionEvent::Opened) => self.session.transport_opened(),
            Some(ConnectionEvent::Inbound(inbound)) => self.session.handle_inbound(inbound),
            Some(ConnectionEvent::Failed(reason)) => {
                self.link = None;
                self.session.transport_failed(&reason)
            }
            Some(ConnectionEvent::Closed) | None => {
                self.link = None;
                if self.session.is_game_over() {
                    debug!("Connection closed after game over");
                    Vec::new()
                } else {
                    self.session.transport_closed()
                }
            }
        };

        self.apply(updates, renderer);
    }

    /// Carries out transport actions and renders the rest.
    fn apply<R: Renderer + ?Sized>(&mut self, updates: Vec<Update>, renderer: &mut R) {
        for update in updates {
            match update {
                Update::Send(mv) => {
                    if let Err(e) = self.send_move(&mv) {
                        warn!(error = %e, "Move not sent");
                        renderer.on_log_line(LogCategory::Error, &format!("move not sent: {e}"));
                    }
                }
                Update::Close => {
                    if self.options.close_on_game_over
                        && let Some(link) = self.link.take()
                    {
                        debug!("Closing connection after game over");
                        link.close();
                    }
                }
                other => other.render(renderer),
            }
        }
    }

    fn send_move(&self, mv: &Move) -> Result<()> {
        let link = self.link.as_ref().ok_or(Error::NotConnected)?;
        let frame = mv.to_frame()?;
        debug!(%mv, "Sending move");
        link.connection.send(frame)
    }
}

/// Waits for the next link event, or forever with no link.
async fn next_event(link: &mut Option<Link>) -> Option<ConnectionEvent> {
    match link {
        Some(link) => link.events.recv().await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::identifiers::PunterId;
    use crate::protocol::{Map, Score, decode, encode};
    use crate::session::ConnectionState;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// What the client showed, in order.
    #[derive(Debug, Clone, PartialEq)]
    enum Shown {
        Init(usize),
        Edge(u64, u64, u64),
        Turn(bool),
        GameOver(Vec<(u64, i64)>),
        Log(LogCategory, String),
        Status(String),
    }

    struct ChannelRenderer {
        tx: mpsc::UnboundedSender<Shown>,
    }

    impl Renderer for ChannelRenderer {
        fn on_init(&mut self, map: &Map) {
            let _ = self.tx.send(Shown::Init(map.rivers.len()));
        }

        fn on_edge_owned(&mut self, punter: PunterId, source: SiteId, target: SiteId) {
            let _ = self
                .tx
                .send(Shown::Edge(punter.as_u64(), source.as_u64(), target.as_u64()));
        }

        fn on_turn_changed(&mut self, is_ours: bool) {
            let _ = self.tx.send(Shown::Turn(is_ours));
        }

        fn on_game_over(&mut self, scores: &[Score]) {
            let scores = scores.iter().map(|s| (s.punter.as_u64(), s.score)).collect();
            let _ = self.tx.send(Shown::GameOver(scores));
        }

        fn on_log_line(&mut self, category: LogCategory, text: &str) {
            let _ = self.tx.send(Shown::Log(category, text.to_string()));
        }

        fn on_status(&mut self, status: &str) {
            let _ = self.tx.send(Shown::Status(status.to_string()));
        }
    }

    fn start() -> (
        ClientHandle,
        mpsc::UnboundedReceiver<Shown>,
        tokio::task::JoinHandle<Session>,
    ) {
        let (client, handle) = Client::builder()
            .connect_timeout(TEST_TIMEOUT)
            .build()
            .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let mut renderer = ChannelRenderer { tx };
            client.run(&mut renderer).await
        });
        (handle, rx, task)
    }

    /// Collects shown items up to and including the first one matching `pred`.
    async fn wait_for(
        rx: &mut mpsc::UnboundedReceiver<Shown>,
        pred: impl Fn(&Shown) -> bool,
    ) -> Vec<Shown> {
        let mut seen = Vec::new();
        loop {
            let item = timeout(TEST_TIMEOUT, rx.recv())
                .await
                .expect("renderer output should arrive")
                .expect("renderer channel should be open");
            let done = pred(&item);
            seen.push(item);
            if done {
                return seen;
            }
        }
    }

    fn frame(value: &Value) -> Message {
        Message::Text(encode(value).unwrap().into())
    }

    async fn bind_relay() -> (TcpListener, u16) {
        let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("bind should succeed");
        let port = listener.local_addr().expect("local addr").port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_full_game_through_relay() {
        let (listener, port) = bind_relay().await;

        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");

            let preamble = ws.next().await.expect("preamble").expect("preamble ok");

            ws.send(Message::Text("Connected to game server".into())).await.expect("notice");
            ws.send(frame(&json!({
                "move": {"moves": [{"claim": {"punter": 0, "source": 3, "target": 2}}]}
            })))
            .await
            .expect("early move");
            ws.send(frame(&json!({
                "punter": 1,
                "punters": 2,
                "map": {
                    "sites": [{"id": 1}, {"id": 2}, {"id": 3}],
                    "rivers": [{"source": 1, "target": 2}, {"source": 2, "target": 3}],
                    "mines": [1]
                }
            })))
            .await
            .expect("setup");

            let claim = ws.next().await.expect("claim").expect("claim ok");

            ws.send(frame(&json!({
                "stop": {
                    "moves": [{"pass": {"punter": 0}}],
                    "scores": [{"punter": 0, "score": 1}, {"punter": 1, "score": 4}]
                }
            })))
            .await
            .expect("stop");

            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
            }

            (
                preamble.into_text().expect("text").to_string(),
                claim.into_text().expect("text").to_string(),
            )
        });

        let (handle, mut shown, task) = start();
        handle
            .request_connect(Endpoint::localhost(9001).with_relay_port(port), "alice")
            .unwrap();

        let before_turn = wait_for(&mut shown, |s| *s == Shown::Turn(true)).await;
        assert!(before_turn.contains(&Shown::Log(
            LogCategory::Relay,
            "Connected to game server".to_string()
        )));
        assert!(before_turn.contains(&Shown::Init(2)));
        assert!(before_turn.contains(&Shown::Edge(0, 2, 3)));

        handle.request_claim(SiteId::new(1), SiteId::new(2)).unwrap();

        let after_claim = wait_for(&mut shown, |s| matches!(s, Shown::GameOver(_))).await;
        assert!(after_claim.contains(&Shown::Edge(1, 1, 2)));
        assert!(after_claim.contains(&Shown::Turn(false)));
        assert_eq!(
            after_claim.last(),
            Some(&Shown::GameOver(vec![(0, 1), (1, 4)]))
        );

        let (preamble, claim) = timeout(TEST_TIMEOUT, relay)
            .await
            .expect("relay should finish")
            .unwrap();
        assert_eq!(preamble, "127.0.0.1:9001:alice");
        assert_eq!(
            decode(&claim).unwrap(),
            json!({"claim": {"punter": 1, "source": 1, "target": 2}})
        );

        drop(handle);
        let session = timeout(TEST_TIMEOUT, task)
            .await
            .expect("client should stop")
            .unwrap();

        assert!(session.is_game_over());
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert_eq!(session.scores().map(<[Score]>::len), Some(2));
        let ledger = session.ledger().expect("ledger kept after game over");
        assert_eq!(
            ledger.owner_of(SiteId::new(2), SiteId::new(1)),
            Some(PunterId::new(1))
        );
    }

    #[tokio::test]
    async fn test_disconnect_mid_game_resets_and_ignores_later_frames() {
        let (listener, port) = bind_relay().await;
        let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();

        let relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");

            let _preamble = ws.next().await.expect("preamble").expect("preamble ok");
            ws.send(frame(&json!({
                "punter": 0,
                "punters": 2,
                "map": {
                    "sites": [{"id": 1}, {"id": 2}],
                    "rivers": [{"source": 1, "target": 2}],
                    "mines": [1]
                }
            })))
            .await
            .expect("setup");

            go_rx.await.expect("go signal");

            // The client has already disconnected; this may or may not reach the socket.
            let _ = ws
                .send(frame(&json!({
                    "move": {"moves": [{"claim": {"punter": 1, "source": 1, "target": 2}}]}
                })))
                .await;

            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    break;
                }
            }
        });

        let (handle, mut shown, task) = start();
        handle
            .request_connect(Endpoint::localhost(9001).with_relay_port(port), "alice")
            .unwrap();

        let before = wait_for(&mut shown, |s| *s == Shown::Turn(false)).await;
        assert!(before.contains(&Shown::Init(1)));

        handle.request_disconnect().unwrap();
        let after = wait_for(&mut shown, |s| *s == Shown::Status("Disconnected".to_string())).await;
        assert!(after.contains(&Shown::Log(LogCategory::Info, "disconnected.".to_string())));

        go_tx.send(()).expect("relay waiting");
        timeout(TEST_TIMEOUT, relay)
            .await
            .expect("relay should finish")
            .unwrap();

        drop(handle);
        let session = timeout(TEST_TIMEOUT, task)
            .await
            .expect("client should stop")
            .unwrap();

        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(session.ledger().is_none());
        assert!(!session.is_initialized());

        // Nothing from the relay after the disconnect was shown.
        let mut rest = Vec::new();
        while let Some(item) = shown.recv().await {
            rest.push(item);
        }
        assert!(rest.is_empty(), "unexpected output after disconnect: {rest:?}");
    }

    #[tokio::test]
    async fn test_claim_before_connect_is_reported() {
        let (handle, mut shown, task) = start();

        handle.request_claim(SiteId::new(1), SiteId::new(2)).unwrap();

        let seen = wait_for(&mut shown, |s| matches!(s, Shown::Log(LogCategory::Error, _))).await;
        assert_eq!(
            seen.last(),
            Some(&Shown::Log(LogCategory::Error, Error::NotReady.to_string()))
        );

        drop(handle);
        let session = timeout(TEST_TIMEOUT, task).await.expect("client should stop").unwrap();
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_refused_connection_returns_to_disconnected() {
        let (listener, port) = bind_relay().await;
        drop(listener);

        let (handle, mut shown, task) = start();
        handle
            .request_connect(Endpoint::localhost(9001).with_relay_port(port), "alice")
            .unwrap();

        let seen = wait_for(&mut shown, |s| matches!(s, Shown::Log(LogCategory::Error, _))).await;
        assert!(matches!(
            seen.last(),
            Some(Shown::Log(LogCategory::Error, text)) if text.starts_with("connection failure")
        ));

        drop(handle);
        let session = timeout(TEST_TIMEOUT, task).await.expect("client should stop").unwrap();
        assert_eq!(session.connection_state(), ConnectionState::Disconnected);
        assert!(session.ledger().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_is_noop() {
        let (handle, mut shown, task) = start();

        handle.request_disconnect().unwrap();
        handle.request_pass().unwrap();

        // The pass is rejected; the disconnect showed nothing before it.
        let seen = wait_for(&mut shown, |_| true).await;
        assert_eq!(
            seen,
            vec![Shown::Log(LogCategory::Error, Error::NotReady.to_string())]
        );

        drop(handle);
        timeout(TEST_TIMEOUT, task).await.expect("client should stop").unwrap();
    }

    #[test]
    fn test_invalid_display_name_rejected_by_handle() {
        let (_client, handle) = Client::builder().build().unwrap();
        let result = handle.request_connect(Endpoint::localhost(9001), "a:b");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_requests_fail_once_client_dropped() {
        let (client, handle) = Client::builder().build().unwrap();
        drop(client);

        assert!(handle.is_closed());
        assert!(matches!(handle.request_pass(), Err(Error::ClientClosed)));
        assert!(matches!(
            handle.request_connect(Endpoint::localhost(9001), "alice"),
            Err(Error::ClientClosed)
        ));
    }
}
