use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::serializer::Slot;
use crate::transport::ConnectionError;

/// Main error type for sidecar actor operations
#[derive(Error, Debug)]
pub enum ActorError {
    /// The sidecar answered, but with a failure status
    #[error("Sidecar responded with status {status}{}", describe_body(.body))]
    Transport {
        status: u16,
        body: Option<SidecarErrorBody>,
    },

    /// Local failure resolving or serializing a remoted call
    #[error("Remoting error: {0}")]
    Remoting(#[from] RemotingError),

    /// The response bytes do not have the expected envelope shape
    #[error("Malformed message: {0}")]
    MalformedMessage(#[from] MalformedMessageError),

    #[error("Invalid registration '{name}': {reason}")]
    InvalidRegistration { name: String, reason: String },

    #[error("Invalid actor address: {reason}")]
    InvalidAddress { reason: String },

    /// A key or method name that cannot be expressed as a path segment
    #[error("'{segment}' cannot be used as a path segment in {path}")]
    InvalidPathSegment { segment: String, path: String },

    #[error("Value for state key '{key}' is not valid JSON")]
    InvalidPayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Could not reach the sidecar: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("The actor interactor was dropped before this state entry was used")]
    InteractorDropped,
}

impl ActorError {
    /// Classify a non-success response from the sidecar
    pub fn transport(status: u16, body: &[u8]) -> Self {
        Self::Transport {
            status,
            body: SidecarErrorBody::from_bytes(body),
        }
    }

    /// Create an invalid registration error
    pub fn invalid_registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Status code reported by the sidecar, if this error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Remoting(_) => "remoting",
            Self::MalformedMessage(_) => "protocol",
            Self::InvalidRegistration { .. }
            | Self::InvalidAddress { .. }
            | Self::InvalidPathSegment { .. } => "validation",
            Self::InvalidPayload { .. } | Self::Serialization(_) => "serialization",
            Self::Connection(_) | Self::Timeout { .. } => "connection",
            Self::Cancelled => "cancelled",
            Self::InteractorDropped => "lifecycle",
        }
    }
}

/// Structured error body attached to failed sidecar responses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SidecarErrorBody {
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SidecarErrorBody {
    /// Parse a failure body. Bodies that are not the sidecar's JSON shape are
    /// kept verbatim as the message; blank bodies yield `None`.
    pub fn from_bytes(body: &[u8]) -> Option<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        match serde_json::from_slice::<Self>(body) {
            Ok(parsed) if parsed.error_code.is_some() || parsed.message.is_some() => Some(parsed),
            _ => Some(Self {
                error_code: None,
                message: Some(String::from_utf8_lossy(body).trim().to_string()),
            }),
        }
    }
}

impl fmt::Display for SidecarErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(message)) => write!(f, "{}", message),
            (None, None) => Ok(()),
        }
    }
}

fn describe_body(body: &Option<SidecarErrorBody>) -> String {
    match body {
        Some(body) => format!(" ({})", body),
        None => String::new(),
    }
}

/// Errors raised while resolving a remoted call against the serializer registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemotingError {
    #[error("No interface registered with id {interface_id}")]
    InterfaceNotFound { interface_id: i32 },

    #[error("Interface {interface_id} has no method with id {method_id}")]
    MethodNotFound { interface_id: i32, method_id: i32 },

    #[error("No serializer registered for the {slot} of method {method_id} on interface {interface_id}")]
    MissingSerializer {
        interface_id: i32,
        method_id: i32,
        slot: Slot,
    },

    #[error("Method '{method}' takes {expected} arguments, {actual} were supplied")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Serializer '{type_tag}' failed: {reason}")]
    Serializer { type_tag: String, reason: String },
}

/// Envelope bytes that cannot be decoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedMessageError {
    #[error("{what} needs {needed} bytes but only {available} remain")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("invalid value flag {0:#04x}")]
    InvalidFlag(u8),

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("method '{method}' returns nothing but the response carried a value")]
    UnexpectedValue { method: String },
}

/// Result type alias for actor operations
pub type ActorResult<T> = Result<T, ActorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_structured_error_body() {
        let error = ActorError::transport(
            500,
            br#"{"errorCode":"ERR_ACTOR_INSTANCE_MISSING","message":"actor instance is missing"}"#,
        );

        assert_eq!(error.status(), Some(500));
        assert_eq!(
            error.to_string(),
            "Sidecar responded with status 500 (ERR_ACTOR_INSTANCE_MISSING: actor instance is missing)"
        );
    }

    #[test]
    fn test_plain_text_and_empty_bodies() {
        let body = SidecarErrorBody::from_bytes(b"upstream reset\n").unwrap();
        assert_eq!(body.error_code, None);
        assert_eq!(body.message.as_deref(), Some("upstream reset"));

        assert!(SidecarErrorBody::from_bytes(b"").is_none());
        assert!(SidecarErrorBody::from_bytes(b"  ").is_none());
        assert_eq!(
            ActorError::transport(406, b"").to_string(),
            "Sidecar responded with status 406"
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(ActorError::transport(404, b"").category(), "transport");
        assert!(ActorError::transport(404, b"").is_not_found());
        assert_eq!(ActorError::Cancelled.category(), "cancelled");
        assert_eq!(
            ActorError::invalid_registration("r", "bad").category(),
            "validation"
        );
        assert_eq!(
            ActorError::from(MalformedMessageError::InvalidFlag(7)).category(),
            "protocol"
        );
    }
}
