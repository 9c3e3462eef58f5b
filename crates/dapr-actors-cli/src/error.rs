use dapr_actors::ActorError;
use thiserror::Error;

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    /// Failures reported by the actor client
    #[error(transparent)]
    Actor(#[from] ActorError),

    /// Validation errors
    #[error("Invalid input: {field} = '{value}'. {suggestion}")]
    InvalidInput {
        field: String,
        value: String,
        suggestion: String,
    },

    /// Generic wrapper for other errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Create an invalid input error with helpful suggestions
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            field: field.into(),
            value: value.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid JSON argument error
    pub fn invalid_json(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::invalid_input(
            field,
            value,
            "The value must be a JSON document, e.g. '{\"key\": \"value\"}' or '\"text\"'",
        )
    }

    /// Get a user-friendly error message with potential solutions
    pub fn user_message(&self) -> String {
        match self {
            Self::Actor(ActorError::Connection(source)) => {
                format!(
                    "Could not reach the Dapr sidecar: {}.\n\n\
                    Possible solutions:\n\
                    • Start the application with: dapr run --app-id <id> -- <command>\n\
                    • Check the endpoint with --endpoint or DAPR_HTTP_ENDPOINT\n\
                    • Verify DAPR_HTTP_PORT matches the sidecar",
                    source
                )
            }
            Self::Actor(ActorError::Transport { status: 404, .. }) => {
                format!(
                    "{}\n\n\
                    Possible solutions:\n\
                    • Check the actor type is registered by the hosting application\n\
                    • Check the method, key or schedule name is spelled correctly",
                    self
                )
            }
            Self::Actor(ActorError::Transport {
                status: 401 | 403, ..
            }) => {
                format!(
                    "{}\n\n\
                    The sidecar rejected the request. Set DAPR_API_TOKEN if the sidecar requires an API token.",
                    self
                )
            }
            Self::Actor(ActorError::Timeout { timeout }) => {
                format!(
                    "The sidecar did not answer within {:?}.\n\n\
                    Increase `timeout` under [sidecar] in the config file if the actor is slow.",
                    timeout
                )
            }
            Self::InvalidInput {
                field,
                value,
                suggestion,
            } => {
                format!("Invalid {}: '{}'\n\n{}", field, value, suggestion)
            }
            _ => self.to_string(),
        }
    }

    /// Check if this error suggests the user should retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Actor(ActorError::Connection(_)) | Self::Actor(ActorError::Timeout { .. }) => {
                true
            }
            Self::Actor(error) => matches!(error.status(), Some(status) if status >= 500),
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Actor(error) => error.category(),
            Self::InvalidInput { .. } => "validation",
            Self::Internal(_) | Self::Serialization(_) => "internal",
        }
    }
}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;
