//! caido-mcp: device-flow authentication for the Caido GraphQL API.
//!
//! Obtains a bearer token through Caido's device flow (the token is delivered
//! over a `graphql-transport-ws` subscription), stores it with owner-only
//! permissions, and refreshes it before it expires.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use caido_mcp::auth::{Authenticator, WebSocketTokenChannel};
//! use caido_mcp::client::CaidoClient;
//! use caido_mcp::config::CaidoConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> caido_mcp::error::Result<()> {
//! let config = CaidoConfig::from_env();
//! let client = CaidoClient::from_config(&config)?;
//! let channel = WebSocketTokenChannel::new(client.websocket_endpoint());
//! let auth = Authenticator::new(
//!     Arc::new(config.credential_store()),
//!     Arc::new(client),
//!     Arc::new(channel),
//! );
//! let bearer = auth.ensure_authenticated(&CancellationToken::new()).await?;
//! println!("Authorization: Bearer {bearer}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
