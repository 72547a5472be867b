/// Error handling module for db-server-rules.
///
/// This module defines the error types used throughout the library. The
/// variants follow the lifecycle of a rule: configuration problems surface
/// while building, start problems abort before the test body runs, and stop
/// problems are only ever logged by the rule.
///
/// # Example
///
/// ```
/// use db_server_rules::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Server is up"),
///         Err(Error::InvalidArgument(msg)) => println!("Bad builder input: {}", msg),
///         Err(Error::Start(msg)) => println!("Server did not start: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Boxed cause carried by [`Error::Configuration`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the db-server-rules library.
#[derive(Error, Debug)]
pub enum Error {
    /// A builder received a value it cannot accept.
    ///
    /// This error occurs when:
    /// - A port lies outside `0..=65000`
    /// - A variable name or directory path is empty or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server could not be assembled from the resolved configuration.
    ///
    /// This error occurs when:
    /// - No launcher classpath is configured for the variant
    /// - A server property is rejected
    #[error("Configuration error: {message}")]
    Configuration {
        /// What was being configured
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// Failed to parse a launcher configuration file.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The server process failed to start or never became reachable.
    #[error("Server start error: {0}")]
    Start(String),

    /// The server process could not be stopped cleanly.
    #[error("Server stop error: {0}")]
    Stop(String),

    /// Error while spawning or signalling a server process.
    #[error("Server process error: {0}")]
    Process(String),

    /// Operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The server is already running.
    #[error("Already running")]
    AlreadyRunning,

    /// The server is not running.
    #[error("Not running")]
    NotRunning,
}

impl Error {
    /// Build a [`Error::Configuration`] without an underlying cause.
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`Error::Configuration`] wrapping `source`.
    pub fn configuration_caused_by(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Configuration {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Result type for db-server-rules operations.
pub type Result<T> = std::result::Result<T, Error>;
