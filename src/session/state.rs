//! Session state machine.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect  ┌────────────┐  opened  ┌──────────────┐  setup  ┌───────┐
//! │ Disconnected │─────────>│ Connecting │─────────>│ AwaitingInit │────────>│ Ready │
//! └──────────────┘          └────────────┘          └──────────────┘         └───────┘
//!        ^                        │                        │                     │
//!        └────────────────────────┴────────────────────────┴─────────────────────┘
//!                         closed / failed / disconnect / stop
//! ```
//!
//! While `Ready` the session is additionally in `OurTurn` or `TheirTurn`.
//! An accepted incoming move frame hands the turn to us; a sent claim or
//! pass hands it back.
//!
//! # Early Moves
//!
//! The relay may deliver moves before the setup message. Those are
//! buffered in [`PendingMoves`] and replayed, in arrival order, in the same
//! handler that processes the setup. If anything was buffered the opponent
//! has already moved, so the replay ends on our turn.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::game::{Edge, Ledger};
use crate::identifiers::{PunterId, SessionId, SiteId};
use crate::protocol::{
    Claim, Inbound, Move, Score, ServerMessage, Settings, Setup, Stop, build_claim, build_pass,
};
use crate::render::{LogCategory, punter_colour};

use super::pending::PendingMoves;
use super::update::Update;

// ============================================================================
// Status Lines
// ============================================================================

const STATUS_CONNECTING: &str = "Connecting...";
const STATUS_WAITING_PUNTERS: &str = "Connected; waiting for other punters...";
const STATUS_OUR_TURN: &str = "Your move!";
const STATUS_THEIR_TURN: &str = "Waiting for others to make a move...";
const STATUS_GAME_OVER: &str = "Game over";
const STATUS_DISCONNECTED: &str = "Disconnected";

// ============================================================================
// ConnectionState
// ============================================================================

/// Connection phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Connect requested, transport not open yet.
    Connecting,
    /// Transport open and preamble sent; waiting for the setup message.
    AwaitingInit,
    /// Setup received; the game is running.
    Ready,
}

impl ConnectionState {
    /// Lowercase label for logs and errors.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingInit => "awaiting init",
            Self::Ready => "ready",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TurnState
// ============================================================================

/// Whose turn it is. Only meaningful while [`ConnectionState::Ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// We may claim or pass.
    OurTurn,
    /// Waiting for the other punters.
    #[default]
    TheirTurn,
}

// ============================================================================
// Session
// ============================================================================

/// Client view of one game over one connection.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    connection_state: ConnectionState,
    turn_state: TurnState,
    punter: Option<PunterId>,
    punters: Option<u64>,
    settings: Option<Settings>,
    initialized: bool,
    pending: PendingMoves,
    ledger: Option<Ledger>,
    scores: Option<Vec<Score>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Session {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: SessionId::generate(),
            connection_state: ConnectionState::Disconnected,
            turn_state: TurnState::TheirTurn,
            punter: None,
            punters: None,
            settings: None,
            initialized: false,
            pending: PendingMoves::default(),
            ledger: None,
            scores: None,
        }
    }

    /// Session identifier used in logs.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current connection phase.
    #[inline]
    #[must_use]
    pub const fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    /// Current turn, or `None` unless the session is ready.
    #[inline]
    #[must_use]
    pub fn turn_state(&self) -> Option<TurnState> {
        (self.connection_state == ConnectionState::Ready).then_some(self.turn_state)
    }

    /// Our punter ID, once the setup message arrived.
    #[inline]
    #[must_use]
    pub const fn punter(&self) -> Option<PunterId> {
        self.punter
    }

    /// Number of punters, once the setup message arrived.
    #[inline]
    #[must_use]
    pub const fn punters(&self) -> Option<u64> {
        self.punters
    }

    /// Rule extensions announced by the server, if any.
    #[inline]
    #[must_use]
    pub const fn settings(&self) -> Option<Settings> {
        self.settings
    }

    /// Returns `true` once the setup message has been processed.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Moves buffered before the setup message.
    #[inline]
    #[must_use]
    pub const fn pending(&self) -> &PendingMoves {
        &self.pending
    }

    /// River ownership, once the map arrived.
    #[inline]
    #[must_use]
    pub const fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    /// Final scores, once the game is over.
    #[inline]
    #[must_use]
    pub fn scores(&self) -> Option<&[Score]> {
        self.scores.as_deref()
    }

    /// Returns `true` once a stop message has been processed.
    #[inline]
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.scores.is_some()
    }

    /// Returns `true` if a local claim or pass may be sent now.
    #[inline]
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.check_can_act().is_ok()
    }
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

impl Session {
    /// Disconnected → Connecting.
    ///
    /// Starts a fresh game; anything left from a previous one is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyConnected`] unless the session is disconnected.
    pub fn connect_requested(&mut self, relay: &str) -> Result<Vec<Update>> {
        if self.connection_state != ConnectionState::Disconnected {
            return Err(Error::AlreadyConnected);
        }

        *self = Self::new();
        self.connection_state = ConnectionState::Connecting;
        debug!(session = %self.id, relay, "Connecting");

        Ok(vec![
            Update::log(LogCategory::Info, format!("connecting to relay [{relay}]...")),
            Update::status(STATUS_CONNECTING),
        ])
    }

    /// Connecting → AwaitingInit, once the transport is open and the
    /// preamble has been sent.
    pub fn transport_opened(&mut self) -> Vec<Update> {
        if self.connection_state != ConnectionState::Connecting {
            warn!(session = %self.id, state = %self.connection_state, "Transport opened in unexpected state");
            return Vec::new();
        }

        self.connection_state = ConnectionState::AwaitingInit;
        info!(session = %self.id, "Connection established");

        vec![
            Update::log(LogCategory::Info, "connection established."),
            Update::status(STATUS_WAITING_PUNTERS),
        ]
    }

    /// The relay closed the connection.
    pub fn transport_closed(&mut self) -> Vec<Update> {
        self.reset(Update::log(LogCategory::Info, "connection closed by relay."))
    }

    /// The transport failed to open or broke mid-stream.
    pub fn transport_failed(&mut self, reason: &str) -> Vec<Update> {
        self.reset(Update::log(
            LogCategory::Error,
            format!("connection failure: {reason}"),
        ))
    }

    /// The user asked to disconnect.
    pub fn disconnect_requested(&mut self) -> Vec<Update> {
        self.reset(Update::log(LogCategory::Info, "disconnected."))
    }

    /// Drops all game state and returns to Disconnected.
    fn reset(&mut self, reason: Update) -> Vec<Update> {
        debug!(session = %self.id, state = %self.connection_state, "Session reset");

        let id = self.id;
        *self = Self::new();
        self.id = id;

        vec![reason, Update::status(STATUS_DISCONNECTED)]
    }
}

// ============================================================================
// Inbound Events
// ============================================================================

impl Session {
    /// Handles one decoded inbound item.
    pub fn handle_inbound(&mut self, inbound: Inbound) -> Vec<Update> {
        match inbound {
            Inbound::Message(value) => match ServerMessage::from_value(value) {
                Ok(message) => self.handle_message(message),
                Err(e) => self.reject(&e),
            },
            Inbound::Notice(text) => vec![Update::log(LogCategory::Relay, text)],
            Inbound::Invalid(e) => self.reject(&e),
        }
    }

    /// Handles one classified server message.
    pub fn handle_message(&mut self, message: ServerMessage) -> Vec<Update> {
        use ConnectionState::{AwaitingInit, Connecting, Disconnected, Ready};

        match (self.connection_state, message) {
            (_, ServerMessage::Timeout(seconds)) => vec![Update::log(
                LogCategory::Error,
                format!("move timed out after {seconds}s; counted as a pass."),
            )],
            (_, ServerMessage::Handshake(name)) => vec![Update::log(
                LogCategory::Info,
                format!("relay acknowledged punter name {name:?}."),
            )],

            (AwaitingInit, ServerMessage::Setup(setup)) => self.initialize(setup),
            (Ready, ServerMessage::Setup(_)) => self.reject(&Error::DuplicateInit),

            (AwaitingInit, ServerMessage::Move(moves)) => {
                let mut updates = Vec::with_capacity(moves.moves.len());
                for mv in moves.moves {
                    updates.push(log_move(&mv));
                    self.pending.push(mv);
                }
                debug!(session = %self.id, queued = self.pending.claims().len(), "Moves buffered before setup");
                updates
            }
            (Ready, ServerMessage::Move(moves)) => self.play_moves(&moves.moves),

            (AwaitingInit | Ready, ServerMessage::Stop(stop)) => self.finish(stop),

            (state @ (Disconnected | Connecting), message) => {
                self.reject(&Error::unexpected_message(message.kind(), state.as_str()))
            }
        }
    }

    /// AwaitingInit → Ready, replaying anything that arrived early.
    fn initialize(&mut self, setup: Setup) -> Vec<Update> {
        let Setup {
            punter,
            punters,
            map,
            settings,
        } = setup;

        let mut ledger = Ledger::from_map(&map);
        let mut updates = vec![
            Update::log(
                LogCategory::Info,
                format!("our punter ID: {punter} colour: {}", punter_colour(punter)),
            ),
            Update::log(LogCategory::Info, format!("number of punters: {punters}")),
            Update::Init(map),
        ];

        let pending = std::mem::take(&mut self.pending);
        let had_activity = !pending.is_empty();
        let (claims, pass) = pending.into_parts();

        for claim in &claims {
            apply_claim(&mut ledger, claim, &mut updates);
        }
        // A buffered pass counts as happening after every buffered claim.
        if let Some(passer) = pass {
            ledger.apply_pass(passer);
        }

        self.punter = Some(punter);
        self.punters = Some(punters);
        self.settings = settings;
        self.ledger = Some(ledger);
        self.initialized = true;
        self.connection_state = ConnectionState::Ready;

        info!(
            session = %self.id,
            %punter,
            punters,
            replayed = claims.len(),
            "Session ready"
        );

        let turn = if had_activity {
            TurnState::OurTurn
        } else {
            TurnState::TheirTurn
        };
        self.turn_state = turn;
        updates.extend(turn_updates(turn));
        updates
    }

    /// Applies a move frame while ready. Any accepted move hands us the turn.
    fn play_moves(&mut self, moves: &[Move]) -> Vec<Update> {
        let Some(ledger) = self.ledger.as_mut() else {
            return self.reject(&Error::NotReady);
        };

        let mut updates = Vec::new();
        let mut accepted = 0usize;

        for mv in moves {
            updates.push(log_move(mv));
            let ok = match mv {
                Move::Claim(claim) => apply_claim(ledger, claim, &mut updates),
                Move::Pass(pass) => {
                    ledger.apply_pass(pass.punter);
                    true
                }
            };
            accepted += usize::from(ok);
        }

        if accepted > 0 {
            updates.extend(self.set_turn(TurnState::OurTurn));
        } else {
            debug!(session = %self.id, "Move frame had no accepted moves");
        }
        updates
    }

    /// Ready → Disconnected on the stop message.
    fn finish(&mut self, stop: Stop) -> Vec<Update> {
        let Stop { moves, scores } = stop;

        let mut updates = Vec::new();
        if let Some(ledger) = self.ledger.as_mut() {
            for mv in &moves {
                updates.push(log_move(mv));
                match mv {
                    Move::Claim(claim) => {
                        apply_claim(ledger, claim, &mut updates);
                    }
                    Move::Pass(pass) => ledger.apply_pass(pass.punter),
                }
            }
        } else if !moves.is_empty() || !self.pending.is_empty() {
            warn!(session = %self.id, "Game stopped before setup; dropping buffered moves");
            self.pending = PendingMoves::default();
        }

        updates.push(Update::log(LogCategory::Info, "Game finished!"));
        for score in &scores {
            updates.push(Update::log(
                LogCategory::Score,
                format!("punter #{} scored {}", score.punter, score.score),
            ));
        }

        info!(session = %self.id, scores = scores.len(), "Game over");

        updates.push(Update::GameOver(scores.clone()));
        updates.push(Update::status(STATUS_GAME_OVER));
        updates.push(Update::Close);

        self.scores = Some(scores);
        self.connection_state = ConnectionState::Disconnected;
        updates
    }

    /// Logs a rejected frame or event; state is left untouched.
    fn reject(&self, error: &Error) -> Vec<Update> {
        warn!(session = %self.id, state = %self.connection_state, error = %error, "Inbound event rejected");
        vec![Update::log(LogCategory::Error, error.to_string())]
    }
}

// ============================================================================
// Local Actions
// ============================================================================

impl Session {
    /// Claims the river between `source` and `target`.
    ///
    /// The claim is recorded locally and the turn passes to the others.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] before setup or after the game ended
    /// - [`Error::NotOurTurn`] while waiting for the others
    /// - [`Error::UnknownEdge`] / [`Error::EdgeOwned`] for unclaimable rivers
    pub fn request_claim(&mut self, source: SiteId, target: SiteId) -> Result<Vec<Update>> {
        let punter = self.check_can_act()?;
        let ledger = self.ledger.as_mut().ok_or(Error::NotReady)?;

        ledger.apply_claim(punter, source, target)?;

        let mv = build_claim(punter, source, target);
        let edge = Edge::canonical(source, target);
        debug!(session = %self.id, %punter, %edge, "Claim requested");

        let mut updates = vec![
            Update::Send(mv),
            log_move(&mv),
            Update::EdgeOwned {
                punter,
                source: edge.lower(),
                target: edge.upper(),
            },
        ];
        updates.extend(self.set_turn(TurnState::TheirTurn));
        Ok(updates)
    }

    /// Passes this turn.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] before setup or after the game ended
    /// - [`Error::NotOurTurn`] while waiting for the others
    pub fn request_pass(&mut self) -> Result<Vec<Update>> {
        let punter = self.check_can_act()?;
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.apply_pass(punter);
        }

        debug!(session = %self.id, %punter, "Pass requested");

        let mut updates = vec![
            Update::Send(build_pass(punter)),
            Update::log(LogCategory::Pass, "Passed!"),
        ];
        updates.extend(self.set_turn(TurnState::TheirTurn));
        Ok(updates)
    }

    fn check_can_act(&self) -> Result<PunterId> {
        if self.connection_state != ConnectionState::Ready || self.is_game_over() {
            return Err(Error::NotReady);
        }
        if self.turn_state != TurnState::OurTurn {
            return Err(Error::NotOurTurn);
        }
        self.punter.ok_or(Error::NotReady)
    }

    /// Switches the turn, reporting only actual changes.
    fn set_turn(&mut self, turn: TurnState) -> Vec<Update> {
        if self.turn_state == turn {
            return Vec::new();
        }
        self.turn_state = turn;
        turn_updates(turn)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Applies a server claim. Returns `true` if it was accepted.
///
/// The relay echoes our own claims back; a claim on a river its punter
/// already owns is accepted without a second ownership update.
fn apply_claim(ledger: &mut Ledger, claim: &Claim, updates: &mut Vec<Update>) -> bool {
    match ledger.apply_claim(claim.punter, claim.source, claim.target) {
        Ok(_) => {
            let edge = Edge::canonical(claim.source, claim.target);
            updates.push(Update::EdgeOwned {
                punter: claim.punter,
                source: edge.lower(),
                target: edge.upper(),
            });
            true
        }
        Err(Error::EdgeOwned { owner, .. }) if owner == claim.punter => {
            debug!(punter = %owner, "Claim echo for owned river");
            true
        }
        Err(e) => {
            warn!(punter = %claim.punter, error = %e, "Protocol error: claim rejected");
            updates.push(Update::log(
                LogCategory::Error,
                Error::protocol(e.to_string()).to_string(),
            ));
            false
        }
    }
}

fn log_move(mv: &Move) -> Update {
    let category = match mv {
        Move::Claim(_) => LogCategory::Move,
        Move::Pass(_) => LogCategory::Pass,
    };
    Update::log(category, format!("{mv}."))
}

fn turn_updates(turn: TurnState) -> Vec<Update> {
    match turn {
        TurnState::OurTurn => vec![Update::TurnChanged(true), Update::status(STATUS_OUR_TURN)],
        TurnState::TheirTurn => vec![
            Update::TurnChanged(false),
            Update::status(STATUS_THEIR_TURN),
        ],
    }
}

// ============================================================================
// Tests
// ============================================================================
