//! # Farside Client Library
//!
//! Request/response correlation and the authentication handshake that sit on
//! top of a remote duplex envelope transport.
//!
//! ## Overview
//!
//! - **Request Client**: issues requests, matches out-of-order responses by
//!   correlation id and delivers each outcome exactly once
//! - **Pending-Call Registry**: the calls still waiting for a response
//! - **Authentication**: reacts to the peer's handshake messages, prompting
//!   the user through overridable hooks
//! - **Transport seam**: the outbound send primitive the client drives
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   Client                     │
//! │  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │ Pending-Call     │  │ Auth Session     │  │
//! │  │ Registry         │  │ (hooks+dispatch) │  │
//! │  └──────────────────┘  └──────────────────┘  │
//! ├──────────────────────────────────────────────┤
//! │       Transport (framing, encryption)        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use client::{ChannelTransport, Client, ClientConfig};
//! use protocol::RequestType;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load_default()?;
//!     client::logging::init_from_config(&config);
//!
//!     let client = Arc::new(Client::new(config));
//!     let (transport, _outbound) = ChannelTransport::pair();
//!     client.connect(transport);
//!
//!     let written = client
//!         .request(
//!             RequestType::WriteFileText,
//!             json!({ "path": "some/path", "text": "some text" }),
//!         )
//!         .await?;
//!     assert_eq!(written, json!(true));
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod transport;

pub use auth::{
    AuthFlow, AuthHandler, AuthSession, Prompter, ScriptedPrompter, StandardAuthHandler,
    TerminalPrompter,
};
pub use client::{Client, Delivery};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use registry::{Completion, PendingCall, PendingCalls};
pub use transport::{ChannelTransport, Transport, TransportError};
