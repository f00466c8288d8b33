/// Error types for registration authority operations
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RaError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation authority error: {0}")]
    Validation(String),

    #[error("Certificate authority error: {0}")]
    Issuance(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`RaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRequest,
    NotSupported,
    Unauthorized,
    NotFound,
    Conflict,
    Collaborator,
    Internal,
}

impl RaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RaError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            RaError::NotSupported(_) => ErrorKind::NotSupported,
            RaError::Unauthorized(_) => ErrorKind::Unauthorized,
            RaError::NotFound(_) => ErrorKind::NotFound,
            RaError::Conflict(_) => ErrorKind::Conflict,
            RaError::Storage(_)
            | RaError::Validation(_)
            | RaError::Issuance(_)
            | RaError::Transport(_) => ErrorKind::Collaborator,
            RaError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the message may be returned to the requesting client as is.
    pub fn is_client_safe(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MalformedRequest | ErrorKind::NotSupported | ErrorKind::Unauthorized
        )
    }
}

pub type Result<T> = std::result::Result<T, RaError>;
