//! Application services orchestrating domain logic and side effects.
pub mod upload;

use crate::signing::{CredentialsError, SigningError};

/// Convenience alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid form input: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(&'static str),
    #[error("failed to obtain signing credentials")]
    Upstream(#[source] CredentialsError),
    #[error("failed to sign upload policy")]
    Signing(#[from] SigningError),
}

impl ServiceError {
    /// Whether the caller sent a bad request, as opposed to a server fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }
}
