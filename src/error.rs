//! Error types for page recording

use thiserror::Error;

/// Result type alias for recording operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while recording a page
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the browser
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to capture a screenshot
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to execute JavaScript
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// No element matched any of the given selectors
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A login page was reached but no credentials were supplied
    #[error("Authentication required: {0} looks like a login page but no credentials were supplied")]
    AuthenticationRequired(String),

    /// Credentials were submitted but the login did not complete
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The external encoder failed
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
