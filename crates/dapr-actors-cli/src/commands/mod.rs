pub mod invoke;
pub mod reminder;
pub mod state;
pub mod timer;

use bytes::Bytes;

use crate::error::{CliError, CliResult};
use dapr_actors::ActorAddress;

/// Build an actor address from command arguments
pub fn parse_address(actor_type: &str, actor_id: &str) -> CliResult<ActorAddress> {
    Ok(ActorAddress::new(actor_type, actor_id)?)
}

/// Check that a command-line value is JSON and return its bytes
pub fn parse_json(field: &str, value: &str) -> CliResult<Bytes> {
    serde_json::from_str::<serde_json::Value>(value)
        .map_err(|_| CliError::invalid_json(field, value))?;
    Ok(Bytes::copy_from_slice(value.trim().as_bytes()))
}

/// Convert a parsed command-line duration to the schedule duration type
pub fn schedule_duration(field: &str, value: &humantime::Duration) -> CliResult<chrono::Duration> {
    chrono::Duration::from_std(**value).map_err(|_| {
        CliError::invalid_input(field, value.to_string(), "The duration is too large")
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::Config;
    use crate::output::OutputManager;
    use crate::CommandContext;
    use tokio_util::sync::CancellationToken;

    /// A context whose operations are cancelled before anything is sent
    pub fn cancelled_context() -> CommandContext {
        let config = Config::default();
        let output = OutputManager::new(config.output.clone());
        let shutdown_token = CancellationToken::new();
        shutdown_token.cancel();

        CommandContext {
            config,
            output,
            verbose: false,
            json: true,
            shutdown_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_json() {
        assert_eq!(
            parse_json("data", " {\"a\": 1} ").unwrap(),
            Bytes::from_static(b"{\"a\": 1}")
        );
        assert!(matches!(
            parse_json("data", "not json"),
            Err(CliError::InvalidInput { field, .. }) if field == "data"
        ));
    }

    #[test]
    fn test_schedule_duration() {
        let parsed = humantime::Duration::from_str("1m 30s").unwrap();
        assert_eq!(
            schedule_duration("period", &parsed).unwrap(),
            chrono::Duration::seconds(90)
        );
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("DemoActor", "abc").is_ok());
        assert!(matches!(
            parse_address("DemoActor", ""),
            Err(CliError::Actor(dapr_actors::ActorError::InvalidAddress { .. }))
        ));
    }
}
