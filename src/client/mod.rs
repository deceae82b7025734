//! Punter client driver.
//!
//! This module ties the session to a relay connection and a renderer.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Owns the session and runs the event loop |
//! | [`ClientHandle`] | Posts user requests to a running client |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Connect timeout and game-over behaviour |
//!
//! # Example
//!
//! ```no_run
//! use punter_client::{Client, Endpoint, Result, TracingRenderer};
//!
//! # async fn example() -> Result<()> {
//! let (client, handle) = Client::builder().build()?;
//! handle.request_connect(Endpoint::localhost(9001), "alice")?;
//!
//! let mut renderer = TracingRenderer;
//! let session = client.run(&mut renderer).await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Client event loop and control handle.
pub mod core;

/// Client runtime options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::{Client, ClientHandle};
pub use options::{ClientOptions, DEFAULT_CONNECT_TIMEOUT};
