use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Query returned no result for selector `{selector}`")]
    EmptyQuery { selector: String },

    #[error("Unsupported transform type: {0}")]
    UnsupportedTransform(String),

    #[error("Invalid options for transform `{kind}`: {message}")]
    InvalidTransform { kind: String, message: String },

    #[error("Unsupported action type: {0}")]
    UnsupportedAction(String),

    #[error("Invalid parameters for action `{kind}`: {message}")]
    InvalidAction { kind: String, message: String },

    #[error("Wait `{what}` timed out after {timeout_ms}ms")]
    WaitTimeout { what: String, timeout_ms: u64 },

    #[error("Wait `{what}` aborted by breaker")]
    WaitBroken { what: String },

    #[error("Page reported an error: {0}")]
    PageError(String),

    #[error("All {chains} cases failed, last failure: {source}")]
    RaceFailed {
        chains: usize,
        #[source]
        source: Box<ParserError>,
    },

    #[error("Pagination progress probe failed: {0}")]
    PaginationProbe(String),

    #[error("Registration rejected: {0}")]
    Registration(String),

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// Convert anyhow::Error to ParserError
impl From<anyhow::Error> for ParserError {
    fn from(err: anyhow::Error) -> Self {
        ParserError::AnyhowError(err.to_string())
    }
}

impl ParserError {
    /// Errors caused by a malformed description rather than by the page.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ParserError::InvalidRule(_)
                | ParserError::UnsupportedAction(_)
                | ParserError::UnsupportedTransform(_)
                | ParserError::InvalidTransform { .. }
                | ParserError::InvalidAction { .. }
        )
    }

    pub(crate) fn invalid_transform(kind: &str, message: impl Into<String>) -> Self {
        ParserError::InvalidTransform {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_action(kind: &str, message: impl Into<String>) -> Self {
        ParserError::InvalidAction {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}
