//! Relay endpoint addressing.
//!
//! A game is reached through the relay: the WebSocket goes to
//! `ws://<host>:<relay_port>`, and the preamble tells the relay which game
//! server port (`game_port`) on the same host to forward to.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Port the relay listens on unless configured otherwise.
pub const DEFAULT_RELAY_PORT: u16 = 5000;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "127.0.0.1";

// ============================================================================
// Endpoint
// ============================================================================

/// Where to connect and which game to join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    relay_port: u16,
    game_port: u16,
}

impl Endpoint {
    /// Creates an endpoint for `game_port` behind the relay on `host`.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, game_port: u16) -> Self {
        Self {
            host: host.into(),
            relay_port: DEFAULT_RELAY_PORT,
            game_port,
        }
    }

    /// Creates an endpoint on the local relay.
    #[inline]
    #[must_use]
    pub fn localhost(game_port: u16) -> Self {
        Self::new(DEFAULT_HOST, game_port)
    }

    /// Overrides the relay port.
    #[inline]
    #[must_use]
    pub fn with_relay_port(mut self, relay_port: u16) -> Self {
        self.relay_port = relay_port;
        self
    }

    /// Relay host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Relay WebSocket port.
    #[inline]
    #[must_use]
    pub const fn relay_port(&self) -> u16 {
        self.relay_port
    }

    /// Game server port the relay forwards to.
    #[inline]
    #[must_use]
    pub const fn game_port(&self) -> u16 {
        self.game_port
    }

    /// Returns the relay WebSocket URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host is empty
    /// - [`Error::Url`] if the host does not form a valid URL
    pub fn relay_url(&self) -> Result<Url> {
        if self.host.trim().is_empty() {
            return Err(Error::config("relay host is empty"));
        }
        Ok(Url::parse(&format!("ws://{}:{}", self.host, self.relay_port))?)
    }

    /// Returns the one-time unframed preamble `host:game_port:name`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `display_name` is invalid.
    pub fn preamble(&self, display_name: &str) -> Result<String> {
        validate_display_name(display_name)?;
        Ok(format!("{}:{}:{}", self.host, self.game_port, display_name))
    }
}

/// Checks that a display name fits in the `:`-separated preamble.
///
/// # Errors
///
/// [`Error::Config`] if the name is blank or contains `:` or a line break.
pub fn validate_display_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::config("display name is empty"));
    }
    if name.contains([':', '\n', '\r']) {
        return Err(Error::config(format!(
            "display name {name:?} contains ':' or a line break"
        )));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let endpoint = Endpoint::localhost(9001);
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.relay_port(), 5000);
        assert_eq!(endpoint.game_port(), 9001);
    }

    #[test]
    fn test_relay_url() {
        let url = Endpoint::new("relay.example", 9001)
            .with_relay_port(6000)
            .relay_url()
            .unwrap();
        assert_eq!(url.as_str(), "ws://relay.example:6000/");
    }

    #[test]
    fn test_empty_host_rejected() {
        let err = Endpoint::new("  ", 9001).relay_url().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_preamble() {
        let preamble = Endpoint::localhost(9001).preamble("alice").unwrap();
        assert_eq!(preamble, "127.0.0.1:9001:alice");
    }

    #[test]
    fn test_display_name_validation() {
        assert!(validate_display_name("bob the punter").is_ok());
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("a:b").is_err());
        assert!(validate_display_name("line\nbreak").is_err());
    }
}
