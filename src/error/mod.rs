//! Error types for registry browsing and Livy job tailing

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolkitError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolkitError {
    /// A `Link` header was present but carried no usable continuation token
    #[error("Malformed continuation token: {0}")]
    MalformedContinuationToken(String),
    /// Network failure or non-success HTTP status, tagged with the operation that was attempted
    #[error("Transport error during {context}: {message}")]
    Transport { context: String, message: String },
    /// Livy accepted the request but the batch is unusable (no id, job failed)
    #[error("Livy error: {0}")]
    Livy(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl ToolkitError {
    pub fn transport(context: impl Into<String>, message: impl Into<String>) -> Self {
        ToolkitError::Transport {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Prefix the error message with the operation it came from.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            ToolkitError::Transport { context: inner, message } => ToolkitError::Transport {
                context: format!("{} ({})", context, inner),
                message,
            },
            ToolkitError::MalformedContinuationToken(msg) => {
                ToolkitError::MalformedContinuationToken(format!("{}: {}", context, msg))
            }
            ToolkitError::Livy(msg) => ToolkitError::Livy(format!("{}: {}", context, msg)),
            ToolkitError::Parse(msg) => ToolkitError::Parse(format!("{}: {}", context, msg)),
            ToolkitError::Config(msg) => ToolkitError::Config(format!("{}: {}", context, msg)),
            ToolkitError::Validation(msg) => {
                ToolkitError::Validation(format!("{}: {}", context, msg))
            }
            ToolkitError::Io(msg) => ToolkitError::Io(format!("{}: {}", context, msg)),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ToolkitError::Transport { .. })
    }
}

impl From<std::io::Error> for ToolkitError {
    fn from(err: std::io::Error) -> Self {
        ToolkitError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ToolkitError {
    fn from(err: serde_json::Error) -> Self {
        ToolkitError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for ToolkitError {
    fn from(err: reqwest::Error) -> Self {
        handlers::NetworkErrorHandler::handle_network_error(&err, "request")
    }
}

impl From<url::ParseError> for ToolkitError {
    fn from(err: url::ParseError) -> Self {
        ToolkitError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prepended() {
        let err = ToolkitError::transport("GET /v2/_catalog", "connection reset")
            .with_context("repositories page (forward)");
        assert_eq!(
            err.to_string(),
            "Transport error during repositories page (forward) (GET /v2/_catalog): connection reset"
        );
        assert!(err.is_transport());
    }
}
