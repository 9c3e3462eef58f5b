use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ActorError;
use crate::transport::is_dot_segment;

/// Version prefix of the sidecar's HTTP API
pub const API_VERSION: &str = "v1.0";

/// Identifies a single actor instance hosted by the sidecar.
///
/// The id is opaque: any characters are allowed and the transport takes care
/// of escaping it when it becomes part of a request path. The only ids
/// refused are empty ones and the path segments `.` and `..`, which cannot
/// be routed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawAddress")]
pub struct ActorAddress {
    actor_type: String,
    actor_id: String,
}

impl ActorAddress {
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>) -> Result<Self, ActorError> {
        let actor_type = actor_type.into();
        let actor_id = actor_id.into();

        if actor_type.is_empty() {
            return Err(ActorError::InvalidAddress {
                reason: "actor type must not be empty".to_string(),
            });
        }
        if actor_id.is_empty() {
            return Err(ActorError::InvalidAddress {
                reason: format!("actor id for type '{}' must not be empty", actor_type),
            });
        }
        if let Some(part) = [&actor_type, &actor_id]
            .into_iter()
            .find(|part| is_dot_segment(part))
        {
            return Err(ActorError::InvalidAddress {
                reason: format!("'{}' cannot be used as an actor type or id", part),
            });
        }

        Ok(Self {
            actor_type,
            actor_id,
        })
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Path segments for a resource below this actor
    pub(crate) fn path(&self, tail: &[&str]) -> Vec<String> {
        let mut segments = vec![
            API_VERSION.to_string(),
            "actors".to_string(),
            self.actor_type.clone(),
            self.actor_id.clone(),
        ];
        segments.extend(tail.iter().map(|segment| segment.to_string()));
        segments
    }

    pub(crate) fn method_path(&self, method_name: &str) -> Vec<String> {
        self.path(&["method", method_name])
    }

    pub(crate) fn state_path(&self) -> Vec<String> {
        self.path(&["state"])
    }

    pub(crate) fn state_key_path(&self, key: &str) -> Vec<String> {
        self.path(&["state", key])
    }

    pub(crate) fn reminder_path(&self, name: &str) -> Vec<String> {
        self.path(&["reminders", name])
    }

    pub(crate) fn timer_path(&self, name: &str) -> Vec<String> {
        self.path(&["timers", name])
    }
}

#[derive(Deserialize)]
struct RawAddress {
    actor_type: String,
    actor_id: String,
}

impl TryFrom<RawAddress> for ActorAddress {
    type Error = ActorError;

    fn try_from(raw: RawAddress) -> Result<Self, Self::Error> {
        Self::new(raw.actor_type, raw.actor_id)
    }
}

impl fmt::Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}
