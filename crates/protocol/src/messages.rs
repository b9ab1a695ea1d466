//! Protocol message definitions for Farside.
//!
//! Every unit exchanged with the remote peer is an [`Envelope`]: an optional
//! correlation id, a type tag and an optional structured payload. The type tag
//! is a closed set ([`MessageType`]) with an explicit fallback arm for tags
//! this build does not know about.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{ProtocolError, Result};

/// Correlation identifier linking a request to its response.
pub type CorrelationId = u64;

/// Envelope wrapper for all protocol messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id. Requests always carry one, responses echo it and
    /// authentication traffic never has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
    /// Type tag selecting the payload schema.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Type-dependent payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Create an envelope from its raw parts.
    pub fn new(id: Option<CorrelationId>, kind: MessageType, data: Option<Value>) -> Self {
        Self { id, kind, data }
    }

    /// Create a request envelope for a remote operation.
    pub fn request(id: CorrelationId, kind: RequestType, data: Value) -> Self {
        Self::new(Some(id), MessageType::Request(kind), Some(data))
    }

    /// Create an authentication envelope. These are session scoped and carry
    /// no correlation id.
    pub fn auth<T: Serialize>(kind: AuthType, payload: &T) -> Result<Self> {
        let data = serde_json::to_value(payload)?;
        Ok(Self::new(None, MessageType::Auth(kind), Some(data)))
    }

    /// Create a successful response to the request `id`.
    pub fn ok(id: CorrelationId, data: Value) -> Self {
        Self::new(Some(id), MessageType::Ok, Some(data))
    }

    /// Create an error response to the request `id`.
    pub fn error(id: CorrelationId, description: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            MessageType::Error,
            Some(serde_json::json!({ "description": description.into() })),
        )
    }

    /// Returns true if this envelope belongs to the authentication exchange.
    pub fn is_auth(&self) -> bool {
        self.kind.is_auth()
    }

    /// Decode the payload into a typed schema.
    ///
    /// A missing payload decodes as an empty object so schemas with only
    /// defaulted fields accept it.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
            kind: self.kind.to_string(),
            reason: e.to_string(),
        })
    }
}

// ============================================================================
// Type tags
// ============================================================================

/// Type tag of an envelope.
///
/// Serialized as its plain string tag, e.g. `"ok"` or `"write_file_text"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A request for a remote operation.
    Request(RequestType),
    /// Successful response.
    Ok,
    /// Failed response.
    Error,
    /// Authentication exchange message.
    Auth(AuthType),
    /// A tag this build does not recognise.
    Other(String),
}

impl MessageType {
    /// Returns the wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Request(kind) => kind.as_str(),
            MessageType::Ok => "ok",
            MessageType::Error => "error",
            MessageType::Auth(kind) => kind.as_str(),
            MessageType::Other(tag) => tag,
        }
    }

    /// Parse a wire tag. Unknown tags map to [`MessageType::Other`].
    pub fn parse(tag: &str) -> Self {
        match tag {
            "ok" => MessageType::Ok,
            "error" => MessageType::Error,
            _ => {
                if let Some(kind) = RequestType::parse(tag) {
                    MessageType::Request(kind)
                } else if let Some(kind) = AuthType::parse(tag) {
                    MessageType::Auth(kind)
                } else {
                    MessageType::Other(tag.to_string())
                }
            }
        }
    }

    /// Returns true for any authentication-phase tag.
    pub fn is_auth(&self) -> bool {
        matches!(self, MessageType::Auth(_))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        MessageType::parse(tag)
    }
}

impl From<RequestType> for MessageType {
    fn from(kind: RequestType) -> Self {
        MessageType::Request(kind)
    }
}

impl From<AuthType> for MessageType {
    fn from(kind: AuthType) -> Self {
        MessageType::Auth(kind)
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(MessageType::parse(&tag))
    }
}

/// Remote operations that can be requested.
///
/// The payload of each request is opaque to this crate; only the tag and
/// the success-value mapping are defined here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    AppendFile,
    AppendFileText,
    Copy,
    CreateDir,
    Exists,
    Metadata,
    ReadDir,
    ReadFile,
    ReadFileText,
    Remove,
    Rename,
    Spawn,
    SpawnWait,
    SystemInfo,
    Watch,
    Unwatch,
    WriteFile,
    WriteFileText,
}

impl RequestType {
    /// Every request type, in tag order.
    pub const ALL: [RequestType; 18] = [
        RequestType::AppendFile,
        RequestType::AppendFileText,
        RequestType::Copy,
        RequestType::CreateDir,
        RequestType::Exists,
        RequestType::Metadata,
        RequestType::ReadDir,
        RequestType::ReadFile,
        RequestType::ReadFileText,
        RequestType::Remove,
        RequestType::Rename,
        RequestType::Spawn,
        RequestType::SpawnWait,
        RequestType::SystemInfo,
        RequestType::Watch,
        RequestType::Unwatch,
        RequestType::WriteFile,
        RequestType::WriteFileText,
    ];

    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::AppendFile => "append_file",
            RequestType::AppendFileText => "append_file_text",
            RequestType::Copy => "copy",
            RequestType::CreateDir => "create_dir",
            RequestType::Exists => "exists",
            RequestType::Metadata => "metadata",
            RequestType::ReadDir => "read_dir",
            RequestType::ReadFile => "read_file",
            RequestType::ReadFileText => "read_file_text",
            RequestType::Remove => "remove",
            RequestType::Rename => "rename",
            RequestType::Spawn => "spawn",
            RequestType::SpawnWait => "spawn_wait",
            RequestType::SystemInfo => "system_info",
            RequestType::Watch => "watch",
            RequestType::Unwatch => "unwatch",
            RequestType::WriteFile => "write_file",
            RequestType::WriteFileText => "write_file_text",
        }
    }

    /// Parse a wire tag.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }

    /// Returns true if the operation reports nothing but completion.
    pub fn is_completion_only(&self) -> bool {
        matches!(
            self,
            RequestType::AppendFile
                | RequestType::AppendFileText
                | RequestType::Copy
                | RequestType::CreateDir
                | RequestType::Remove
                | RequestType::Rename
                | RequestType::Watch
                | RequestType::Unwatch
                | RequestType::WriteFile
                | RequestType::WriteFileText
        )
    }

    /// Map the data of an `ok` response to the value handed to the caller.
    ///
    /// Completion-only operations yield `true`; everything else passes the
    /// payload through unchanged.
    pub fn success_value(&self, data: Value) -> Value {
        if self.is_completion_only() {
            Value::Bool(true)
        } else {
            data
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication exchange message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthType {
    Initialization,
    InitializationResponse,
    StartMethod,
    Challenge,
    ChallengeResponse,
    Verification,
    VerificationResponse,
    Info,
    Error,
    Finished,
}

impl AuthType {
    /// Every authentication type.
    pub const ALL: [AuthType; 10] = [
        AuthType::Initialization,
        AuthType::InitializationResponse,
        AuthType::StartMethod,
        AuthType::Challenge,
        AuthType::ChallengeResponse,
        AuthType::Verification,
        AuthType::VerificationResponse,
        AuthType::Info,
        AuthType::Error,
        AuthType::Finished,
    ];

    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Initialization => "auth_initialization",
            AuthType::InitializationResponse => "auth_initialization_response",
            AuthType::StartMethod => "auth_start_method",
            AuthType::Challenge => "auth_challenge",
            AuthType::ChallengeResponse => "auth_challenge_response",
            AuthType::Verification => "auth_verification",
            AuthType::VerificationResponse => "auth_verification_response",
            AuthType::Info => "auth_info",
            AuthType::Error => "auth_error",
            AuthType::Finished => "auth_finished",
        }
    }

    /// Parse a wire tag.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }

    /// Returns true for the messages a remote peer sends to us during the
    /// handshake, as opposed to our replies.
    pub fn is_inbound(&self) -> bool {
        !matches!(
            self,
            AuthType::InitializationResponse
                | AuthType::ChallengeResponse
                | AuthType::VerificationResponse
        )
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

impl Envelope {
    /// Serialize the envelope to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize an envelope from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the envelope to MessagePack bytes.
    ///
    /// Struct fields are written by name because `id` and `data` are
    /// skipped when absent.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let envelope = Envelope::request(
            7,
            RequestType::WriteFileText,
            json!({ "path": "some/path", "text": "some text" }),
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "type": "write_file_text",
                "data": { "path": "some/path", "text": "some text" }
            })
        );
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let envelope = Envelope::new(None, MessageType::Auth(AuthType::Finished), None);
        assert_eq!(envelope.to_json().unwrap(), r#"{"type":"auth_finished"}"#);
    }

    #[test]
    fn test_parse_known_tags() {
        assert_eq!(MessageType::parse("ok"), MessageType::Ok);
        assert_eq!(MessageType::parse("error"), MessageType::Error);
        assert_eq!(
            MessageType::parse("spawn_wait"),
            MessageType::Request(RequestType::SpawnWait)
        );
        assert_eq!(
            MessageType::parse("auth_challenge"),
            MessageType::Auth(AuthType::Challenge)
        );
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let envelope = Envelope::from_json(r#"{"id":3,"type":"teleport","data":{}}"#).unwrap();
        assert_eq!(envelope.kind, MessageType::Other("teleport".to_string()));
        assert_eq!(envelope.to_json().unwrap(), r#"{"id":3,"type":"teleport","data":{}}"#);
    }

    #[test]
    fn test_every_tag_parses_back() {
        for kind in RequestType::ALL {
            assert_eq!(RequestType::parse(kind.as_str()), Some(kind));
        }
        for kind in AuthType::ALL {
            assert_eq!(AuthType::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_auth_tags_are_not_request_tags() {
        for kind in AuthType::ALL {
            assert!(MessageType::parse(kind.as_str()).is_auth());
        }
        for kind in RequestType::ALL {
            assert!(!MessageType::parse(kind.as_str()).is_auth());
        }
    }

    #[test]
    fn test_inbound_auth_types() {
        let inbound: Vec<_> = AuthType::ALL.iter().filter(|k| k.is_inbound()).collect();
        assert_eq!(inbound.len(), 7);
        assert!(!AuthType::ChallengeResponse.is_inbound());
    }

    #[test]
    fn test_success_value_mapping() {
        assert_eq!(
            RequestType::WriteFileText.success_value(json!({})),
            Value::Bool(true)
        );
        assert_eq!(RequestType::Rename.success_value(Value::Null), Value::Bool(true));
        assert_eq!(
            RequestType::ReadFileText.success_value(json!("contents")),
            json!("contents")
        );
        assert_eq!(RequestType::Exists.success_value(json!(false)), json!(false));
    }

    #[test]
    fn test_error_constructor() {
        let envelope = Envelope::error(9, "no such file");
        assert_eq!(envelope.id, Some(9));
        assert_eq!(envelope.kind, MessageType::Error);
        assert_eq!(envelope.data, Some(json!({ "description": "no such file" })));
    }

    #[test]
    fn test_payload_defaults_for_missing_data() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Methods {
            #[serde(default)]
            methods: Vec<String>,
        }
        let envelope = Envelope::new(None, AuthType::Initialization.into(), None);
        let payload: Methods = envelope.payload().unwrap();
        assert!(payload.methods.is_empty());
    }

    #[test]
    fn test_payload_rejects_wrong_shape() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Methods {
            methods: Vec<String>,
        }
        let envelope = Envelope::new(
            None,
            AuthType::Initialization.into(),
            Some(json!({ "methods": 5 })),
        );
        let err = envelope.payload::<Methods>().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload { ref kind, .. } if kind == "auth_initialization"));
    }

    #[test]
    fn test_msgpack_keeps_optional_fields() {
        let envelope = Envelope::ok(42, json!({ "entries": [1, 2, 3] }));
        let bytes = envelope.to_msgpack().unwrap();
        assert_eq!(Envelope::from_msgpack(&bytes).unwrap(), envelope);

        let bare = Envelope::new(None, MessageType::Ok, None);
        let bytes = bare.to_msgpack().unwrap();
        assert_eq!(Envelope::from_msgpack(&bytes).unwrap(), bare);
    }

    #[test]
    fn test_from_json_rejects_missing_type() {
        let err = Envelope::from_json(r#"{"id":1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
    }
}
