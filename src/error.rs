//! Top-level error types for supersede.

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error enum wrapping domain-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transit(#[from] TransitError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration and invocation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("a session cookie is required to talk to the query API")]
    MissingCredential,

    #[error("missing required environment variable: {0}")]
    MissingKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Wire format errors raised while decoding Transit JSON.
#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("malformed transit envelope: {0}")]
    MalformedEnvelope(String),
}

impl TransitError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedEnvelope(detail.into())
    }
}

/// Errors raised while reading fields out of decoded maps.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("field not found: {name}")]
    FieldNotFound { name: String },

    #[error("unknown workflow status: {0}")]
    UnknownStatus(String),

    #[error("field {name} has unexpected type, expected {expected}")]
    UnexpectedType { name: String, expected: &'static str },
}

/// Selection precondition failures.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("no workflow runs found for branch {branch}")]
    NoMatchingBuild { branch: String },
}

/// Outbound request failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("query request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("query API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid query endpoint: {0}")]
    Endpoint(String),
}

/// A single cancellation that did not go through.
#[derive(Debug, thiserror::Error)]
#[error("failed to cancel workflow run {id}: {cause}")]
pub struct CancelError {
    /// Id of the workflow run that is still active.
    pub id: String,
    pub cause: Error,
}
