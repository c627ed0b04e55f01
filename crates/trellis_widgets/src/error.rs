//! Error types for trellis_widgets

use thiserror::Error;

/// Recoverable problems with a single client request
///
/// These never abort the session; they are logged and the request is
/// answered with an empty patch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No widget is registered under the requested id
    #[error("no widget found with id '{0}'")]
    UnknownWidget(String),

    /// The widget exists but does not respond to events
    #[error("widget '{0}' has no listener")]
    NoListener(String),

    /// The widget is disabled
    #[error("widget '{0}' is disabled")]
    Disabled(String),

    /// The submitted value could not be interpreted
    #[error("malformed value for widget '{id}': {value:?}")]
    MalformedValue { id: String, value: String },

    /// The request itself was incomplete or inconsistent
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// Result type for request handling
pub type Result<T> = std::result::Result<T, RequestError>;
