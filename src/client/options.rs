//! Client runtime options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use punter_client::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_close_on_game_over(false);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the relay to accept the connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ClientOptions
// ============================================================================

/// Client behaviour options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Maximum time to wait for the relay to accept the connection.
    pub connect_timeout: Duration,

    /// Close the connection as soon as the stop message is processed,
    /// instead of waiting for the relay to close it.
    pub close_on_game_over: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_on_game_over: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to close the connection after the game ends.
    #[inline]
    #[must_use]
    pub const fn with_close_on_game_over(mut self, close: bool) -> Self {
        self.close_on_game_over = close;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
