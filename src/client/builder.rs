//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use punter_client::Client;
//!
//! # fn example() -> punter_client::Result<()> {
//! let (client, handle) = Client::builder()
//!     .connect_timeout(Duration::from_secs(10))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

use super::core::{Client, ClientHandle};
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Options being built.
    options: ClientOptions,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum time to wait for the relay to accept a connection.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Sets whether the connection is closed once the game is over.
    #[inline]
    #[must_use]
    pub fn close_on_game_over(mut self, close: bool) -> Self {
        self.options.close_on_game_over = close;
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the client and the handle used to drive it.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the connect timeout is zero.
    pub fn build(self) -> Result<(Client, ClientHandle)> {
        if self.options.connect_timeout.is_zero() {
            return Err(Error::config("connect timeout must be non-zero"));
        }

        Ok(Client::new(self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================
