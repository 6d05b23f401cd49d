use thiserror::Error;

/// Typed failure surface of the transport client. Callers branch on
/// `status()`; raw reqwest errors never escape this module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Rejected locally before any network call.
    #[error("{0}")]
    InvalidArgument(String),

    /// The bounded request timeout elapsed. Cancels the HTTP call only,
    /// never the polling timer.
    #[error("request timed out")]
    RequestTimeout,

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> u16 {
        match self {
            ClientError::InvalidArgument(_) => 400,
            ClientError::RequestTimeout => 408,
            ClientError::Api { status, .. } => *status,
        }
    }

    /// Short human-readable form for the transient notice line.
    pub fn notice(&self) -> String {
        match self {
            ClientError::InvalidArgument(message) => message.clone(),
            ClientError::RequestTimeout => "request timed out".to_string(),
            ClientError::Api { message, .. } => message.clone(),
        }
    }
}
