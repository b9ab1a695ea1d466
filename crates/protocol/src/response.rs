//! Classification of response envelopes.
//!
//! A response matched to a pending call is either `ok` (carrying the
//! operation's result) or one of several error shapes. The error texts are
//! relied on by dependents and must not change.

use serde_json::Value;
use thiserror::Error;

use crate::messages::{Envelope, MessageType};

/// Why a response did not yield a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// No response envelope was available.
    #[error("Nil response received")]
    Nil,

    /// An `error` response without any payload.
    #[error("Error response received without data payload")]
    MissingData,

    /// An `error` response whose payload lacks a description.
    #[error("Error response received without description")]
    MissingDescription,

    /// The remote peer reported a failure.
    #[error("{0}")]
    Remote(String),

    /// The response carried a type tag that is neither `ok` nor `error`.
    #[error("Received invalid response of type {0}")]
    InvalidType(String),
}

/// Classify a response envelope.
///
/// `ok` yields its data, or `null` when the payload is absent. The data is not
/// interpreted further.
pub fn classify(response: Option<&Envelope>) -> Result<Value, ResponseError> {
    let envelope = response.ok_or(ResponseError::Nil)?;

    match &envelope.kind {
        MessageType::Ok => Ok(envelope.data.clone().unwrap_or(Value::Null)),
        MessageType::Error => {
            let data = envelope.data.as_ref().ok_or(ResponseError::MissingData)?;
            match data.get("description") {
                Some(Value::String(description)) => Err(ResponseError::Remote(description.clone())),
                Some(Value::Null) | None => Err(ResponseError::MissingDescription),
                Some(other) => Err(ResponseError::Remote(other.to_string())),
            }
        }
        other => Err(ResponseError::InvalidType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::RequestType;
    use serde_json::json;

    fn envelope(kind: &str, data: Option<Value>) -> Envelope {
        Envelope::new(Some(1), MessageType::parse(kind), data)
    }

    #[test]
    fn test_nil_response() {
        let err = classify(None).unwrap_err();
        assert_eq!(err.to_string(), "Nil response received");
    }

    #[test]
    fn test_ok_passes_data_through() {
        let response = envelope("ok", Some(json!({ "size": 12 })));
        assert_eq!(classify(Some(&response)).unwrap(), json!({ "size": 12 }));
    }

    #[test]
    fn test_ok_without_data_is_null() {
        let response = envelope("ok", None);
        assert_eq!(classify(Some(&response)).unwrap(), Value::Null);
    }

    #[test]
    fn test_ok_true_is_not_interpreted() {
        let response = envelope("ok", Some(json!(true)));
        assert_eq!(classify(Some(&response)).unwrap(), json!(true));
    }

    #[test]
    fn test_error_without_data() {
        let err = classify(Some(&envelope("error", None))).unwrap_err();
        assert_eq!(err.to_string(), "Error response received without data payload");
    }

    #[test]
    fn test_error_without_description() {
        let err = classify(Some(&envelope("error", Some(json!({}))))).unwrap_err();
        assert_eq!(err.to_string(), "Error response received without description");
    }

    #[test]
    fn test_error_with_null_description() {
        let err = classify(Some(&envelope("error", Some(json!({ "description": null })))))
            .unwrap_err();
        assert_eq!(err, ResponseError::MissingDescription);
    }

    #[test]
    fn test_error_with_description() {
        let err = classify(Some(&envelope("error", Some(json!({ "description": "X" })))))
            .unwrap_err();
        assert_eq!(err.to_string(), "X");
        assert_eq!(err, ResponseError::Remote("X".to_string()));
    }

    #[test]
    fn test_error_from_constructor() {
        let err = classify(Some(&Envelope::error(3, "permission denied"))).unwrap_err();
        assert_eq!(err.to_string(), "permission denied");
    }

    #[test]
    fn test_other_type_is_invalid() {
        let err = classify(Some(&envelope("other", Some(json!({}))))).unwrap_err();
        assert_eq!(err.to_string(), "Received invalid response of type other");
    }

    #[test]
    fn test_request_type_as_response_is_invalid() {
        let response = Envelope::request(1, RequestType::Exists, json!({}));
        let err = classify(Some(&response)).unwrap_err();
        assert_eq!(err.to_string(), "Received invalid response of type exists");
    }
}
