//! # Reminders and Timers
//!
//! Both are recurring invocations scheduled by the sidecar. Reminders are
//! persisted and survive deactivation; timers live only as long as the actor
//! activation. On the wire they share one JSON body:
//!
//! ```json
//! {"dueTime": "0h0m5s0ms", "period": "0h0m10s0ms", "data": {...}}
//! ```
//!
//! The duration text and the meaning of a zero period depend on the deployed
//! sidecar, so both are taken from `ReminderConfig`.

use bytes::Bytes;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::ActorError;
use crate::state::raw_json;
use crate::transport::is_dot_segment;

/// Text representation used for `dueTime` and `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationFormat {
    /// `1h2m3s4ms`
    #[default]
    DaprHms,
    /// `PT1H2M3.004S`
    Iso8601,
}

impl DurationFormat {
    /// Render a non-negative duration
    pub fn format(&self, duration: Duration) -> String {
        let total_ms = duration.num_milliseconds().max(0);
        let hours = total_ms / 3_600_000;
        let minutes = total_ms / 60_000 % 60;
        let seconds = total_ms / 1_000 % 60;
        let millis = total_ms % 1_000;

        match self {
            DurationFormat::DaprHms => {
                format!("{}h{}m{}s{}ms", hours, minutes, seconds, millis)
            }
            DurationFormat::Iso8601 => {
                format!("PT{}H{}M{}.{:03}S", hours, minutes, seconds, millis)
            }
        }
    }
}

/// What a period of exactly zero means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroPeriodPolicy {
    /// Refuse the registration locally
    #[default]
    Reject,
    /// Omit `period` so the sidecar fires the schedule once
    FireOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub duration_format: DurationFormat,
    pub zero_period: ZeroPeriodPolicy,
}

/// A durable recurring invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRegistration {
    pub name: String,
    pub due_time: Duration,
    pub period: Duration,
    pub data: Option<Bytes>,
}

impl ReminderRegistration {
    pub fn new(name: impl Into<String>, due_time: Duration, period: Duration) -> Self {
        Self {
            name: name.into(),
            due_time,
            period,
            data: None,
        }
    }

    /// Attach JSON-encoded data delivered with every firing
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Validate and encode the registration body
    pub fn to_json(&self, config: &ReminderConfig) -> Result<Bytes, ActorError> {
        encode_schedule(
            &self.name,
            self.due_time,
            self.period,
            None,
            self.data.as_ref(),
            config,
        )
    }
}

/// A non-durable recurring invocation, dropped when the actor deactivates
#[derive(Debug, Clone, PartialEq)]
pub struct TimerRegistration {
    pub name: String,
    pub due_time: Duration,
    pub period: Duration,
    pub data: Option<Bytes>,
    /// Actor method to call; the sidecar's default timer callback if unset
    pub callback: Option<String>,
}

impl TimerRegistration {
    pub fn new(name: impl Into<String>, due_time: Duration, period: Duration) -> Self {
        Self {
            name: name.into(),
            due_time,
            period,
            data: None,
            callback: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }

    pub fn to_json(&self, config: &ReminderConfig) -> Result<Bytes, ActorError> {
        if matches!(&self.callback, Some(callback) if callback.is_empty()) {
            return Err(ActorError::invalid_registration(
                &self.name,
                "callback must not be empty",
            ));
        }

        encode_schedule(
            &self.name,
            self.due_time,
            self.period,
            self.callback.as_deref(),
            self.data.as_ref(),
            config,
        )
    }
}

/// Names are path segments, so they must be present
pub(crate) fn validate_name(name: &str) -> Result<(), ActorError> {
    if name.trim().is_empty() {
        return Err(ActorError::invalid_registration(
            name,
            "name must not be empty",
        ));
    }
    if is_dot_segment(name) {
        return Err(ActorError::invalid_registration(
            name,
            "'.' and '..' cannot be used as names",
        ));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleBody<'a> {
    due_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback: Option<&'a str>,
    data: Option<Box<RawValue>>,
}

fn encode_schedule(
    name: &str,
    due_time: Duration,
    period: Duration,
    callback: Option<&str>,
    data: Option<&Bytes>,
    config: &ReminderConfig,
) -> Result<Bytes, ActorError> {
    validate_name(name)?;

    if due_time < Duration::zero() {
        return Err(ActorError::invalid_registration(
            name,
            format!("due time must not be negative, got {}", due_time),
        ));
    }
    if period < Duration::zero() {
        return Err(ActorError::invalid_registration(
            name,
            format!("period must not be negative, got {}", period),
        ));
    }

    for (field, value) in [("due time", due_time), ("period", period)] {
        if value != Duration::milliseconds(value.num_milliseconds()) {
            return Err(ActorError::invalid_registration(
                name,
                format!("{} must be whole milliseconds, got {}", field, value),
            ));
        }
    }

    let period = if period == Duration::zero() {
        match config.zero_period {
            ZeroPeriodPolicy::FireOnce => None,
            ZeroPeriodPolicy::Reject => {
                return Err(ActorError::invalid_registration(
                    name,
                    "a zero period is ambiguous for this sidecar; configure zero_period = \"fire-once\" to allow one-shot schedules",
                ))
            }
        }
    } else {
        Some(config.duration_format.format(period))
    };

    let data = match data {
        Some(bytes) => Some(raw_json(bytes).map_err(|e| {
            ActorError::invalid_registration(name, format!("data is not valid JSON: {}", e))
        })?),
        None => None,
    };

    let body = ScheduleBody {
        due_time: config.duration_format.format(due_time),
        period,
        callback,
        data,
    };

    Ok(Bytes::from(serde_json::to_vec(&body)?))
}
