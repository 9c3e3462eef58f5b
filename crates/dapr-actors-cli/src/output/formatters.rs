use serde::Serialize;
use serde_json::Value;

use crate::error::CliResult;
use crate::output::{OutputFormat, OutputManager};

/// Interpret a response body for display. JSON bodies are kept structured,
/// anything else is shown as text.
pub fn decode_payload(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
    )
}

fn render(value: &Value, output: &OutputManager) -> String {
    let text = if output.config().pretty_json {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.unwrap_or_else(|_| value.to_string())
}

/// Result of a method invocation
#[derive(Debug, Serialize)]
pub struct InvocationResult {
    pub actor_type: String,
    pub actor_id: String,
    pub method: String,
    pub response: Option<Value>,
}

impl OutputFormat for InvocationResult {
    fn format_pretty(&self, output: &OutputManager) -> CliResult<()> {
        output.success(&format!(
            "Invoked {} on {}/{}",
            output.theme().accent().apply_to(&self.method),
            self.actor_type,
            self.actor_id
        ))?;

        match &self.response {
            Some(response) => println!("{}", render(response, output)),
            None => println!("{}", output.theme().muted().apply_to("(no response body)")),
        }
        Ok(())
    }
}

/// A state value read from an actor
#[derive(Debug, Serialize)]
pub struct StateValue {
    pub actor_type: String,
    pub actor_id: String,
    pub key: String,
    pub value: Option<Value>,
}

impl OutputFormat for StateValue {
    fn format_pretty(&self, output: &OutputManager) -> CliResult<()> {
        match &self.value {
            Some(value) => println!("{}", render(value, output)),
            None => output.info(&format!(
                "No value stored under '{}' for {}/{}",
                self.key, self.actor_type, self.actor_id
            ))?,
        }
        Ok(())
    }
}

/// Outcome of a write: state set/remove, schedule register/unregister
#[derive(Debug, Serialize)]
pub struct ChangeResult {
    pub action: &'static str,
    pub actor_type: String,
    pub actor_id: String,
    pub target: String,
}

impl OutputFormat for ChangeResult {
    fn format_pretty(&self, output: &OutputManager) -> CliResult<()> {
        output.success(&format!(
            "{} {} on {}/{}",
            self.action,
            output.theme().accent().apply_to(&self.target),
            self.actor_type,
            self.actor_id
        ))
    }
}
