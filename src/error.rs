use thiserror::Error;

/// Object store failures.
///
/// `NotFound` is deliberately its own variant: the poll loop treats it as the
/// normal not-yet-available condition and keeps waiting, while every other
/// variant aborts the wait immediately.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("access denied: {bucket}/{key}: {message}")]
    AccessDenied {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for the "object not yet present" condition the poll loop retries on.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Pipeline failures, classified for outcome reporting.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Malformed trigger event, invalid file type, empty submission.
    #[error("client error: {0}")]
    Client(String),

    /// A collaborator was unreachable, rejected the call, or errored.
    #[error("{collaborator} service error: {message}")]
    UpstreamService {
        collaborator: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// A collaborator succeeded but returned nothing usable.
    #[error("{collaborator} returned an empty result: {message}")]
    UpstreamEmpty {
        collaborator: &'static str,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn upstream(
        collaborator: &'static str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        PipelineError::UpstreamService {
            collaborator,
            status,
            message: message.into(),
        }
    }

    pub fn empty(collaborator: &'static str, message: impl Into<String>) -> Self {
        PipelineError::UpstreamEmpty {
            collaborator,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Client(format!("malformed event: {}", err))
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Internal(err.to_string())
    }
}
