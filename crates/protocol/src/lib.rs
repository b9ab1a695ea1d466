//! # Farside Protocol Library
//!
//! Logical message shapes exchanged between a Farside client and a remote
//! peer. The byte-level framing and encryption belong to the transport; this
//! crate only defines what travels inside it.
//!
//! ## Overview
//!
//! - **Envelopes**: correlation id + type tag + structured payload
//! - **Type tags**: a closed set of request, response and authentication
//!   tags, with a fallback for tags this build does not know
//! - **Authentication payloads**: typed schemas for the handshake
//! - **Response classification**: maps a response to a result or a
//!   [`ResponseError`]
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{classify, Envelope, RequestType};
//! use serde_json::json;
//!
//! let request = Envelope::request(
//!     1,
//!     RequestType::ReadFileText,
//!     json!({ "path": "notes.txt" }),
//! );
//! let wire = request.to_json().unwrap();
//!
//! let response = Envelope::ok(1, json!("hello"));
//! assert_eq!(classify(Some(&response)).unwrap(), json!("hello"));
//! # let _ = wire;
//! ```
//!
//! ## Modules
//!
//! - [`messages`]: Envelope and type tags
//! - [`auth`]: Authentication payloads
//! - [`response`]: Response classification
//! - [`error`]: Error types

pub mod auth;
pub mod error;
pub mod messages;
pub mod response;

pub use error::{ProtocolError, Result};
pub use messages::{AuthType, CorrelationId, Envelope, MessageType, RequestType};
pub use response::{classify, ResponseError};
