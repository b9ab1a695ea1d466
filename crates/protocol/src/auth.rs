//! Authentication exchange payloads.
//!
//! The handshake runs before normal operation traffic and carries no
//! correlation ids. Each struct here is the `data` of the envelope tagged
//! with the matching [`AuthType`](crate::messages::AuthType).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Remote peer announces the authentication methods it supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInitialization {
    /// Supported methods, in the peer's order of preference.
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Our choice of methods, sent in reply to [`AuthInitialization`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInitializationResponse {
    pub methods: Vec<String>,
}

/// Remote peer reports which method it is starting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStartMethod {
    #[serde(default)]
    pub method: String,
}

/// A set of questions the user must answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    #[serde(default)]
    pub questions: Vec<AuthQuestion>,
    /// Shared context such as `username` or `instructions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<HashMap<String, String>>,
}

impl AuthChallenge {
    /// Look up a key of the shared context.
    pub fn extra_value(&self, key: &str) -> Option<&str> {
        self.extra.as_ref()?.get(key).map(String::as_str)
    }
}

/// A single challenge question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthQuestion {
    /// Prompt text shown to the user.
    #[serde(default)]
    pub text: String,
    /// Per-question hints; `echo = "true"` disables input masking.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl AuthQuestion {
    /// Create a masked question.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: HashMap::new(),
        }
    }

    /// Create a question whose answer is echoed while typed.
    pub fn echoed(text: impl Into<String>) -> Self {
        let mut question = Self::new(text);
        question
            .extra
            .insert("echo".to_string(), "true".to_string());
        question
    }

    /// Returns true only when the question explicitly asks for echo.
    pub fn echo(&self) -> bool {
        self.extra.get("echo").map(String::as_str) == Some("true")
    }
}

/// Answers to an [`AuthChallenge`], in question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallengeResponse {
    pub answers: Vec<String>,
}

/// What a verification request is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthVerificationKind {
    /// Confirm the identity of the remote host.
    Host,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Remote peer asks the user to confirm something.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthVerification {
    #[serde(default)]
    pub kind: AuthVerificationKind,
    #[serde(default)]
    pub text: String,
}

/// The user's verdict on an [`AuthVerification`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthVerificationResponse {
    pub valid: bool,
}

/// Informational text to show to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default)]
    pub text: String,
}

/// Severity of an authentication error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthErrorKind {
    /// Terminates the handshake.
    Fatal,
    /// Recoverable; anything other than `fatal` decodes here.
    #[default]
    #[serde(other)]
    Error,
}

/// Remote peer reports an authentication error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
    #[serde(default)]
    pub kind: AuthErrorKind,
    #[serde(default)]
    pub text: String,
}

impl AuthError {
    pub fn is_fatal(&self) -> bool {
        self.kind == AuthErrorKind::Fatal
    }
}

/// Remote peer reports the handshake succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFinished {}
