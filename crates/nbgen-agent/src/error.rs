//! Error types for nbgen-agent

use thiserror::Error;

/// Result type alias using nbgen-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by tool handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can abort a loop invocation
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the completion client layer
    #[error(transparent)]
    Ai(#[from] nbgen_ai::Error),

    /// The seed conversation does not satisfy the loop's precondition
    #[error("Invalid seed conversation: {0}")]
    InvalidSeed(String),

    /// The model sent tool arguments that are not a JSON object
    #[error("Failed to parse arguments for tool '{tool}': {source}")]
    MalformedArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// The model requested a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments do not match the registered parameter schema
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// A tool handler failed
    #[error("Tool '{tool}' failed: {source}")]
    Capability {
        tool: String,
        #[source]
        source: BoxError,
    },

    /// A tool could not be registered
    #[error("Cannot register tool '{tool}': {message}")]
    Registration { tool: String, message: String },

    /// The caller-supplied iteration guard was exceeded
    #[error("Model did not finish within {0} completion requests")]
    IterationLimit(u32),

    /// Reading or writing the interaction log failed
    #[error("Interaction log error: {0}")]
    Log(String),
}

impl Error {
    /// Check if this error came from the completion endpoint
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Ai(_))
    }

    /// Name of the tool involved, if any
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Error::MalformedArguments { tool, .. }
            | Error::InvalidArguments { tool, .. }
            | Error::Capability { tool, .. }
            | Error::Registration { tool, .. } => Some(tool),
            Error::UnknownTool(tool) => Some(tool),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Log(e.to_string())
    }
}
