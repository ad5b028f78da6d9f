//! Upload client: chooses or records a video, asks the authorization
//! service for a signed form, then posts the file straight to storage.
pub mod authorization;
pub mod file;
pub mod form;
pub mod recorder;
pub mod session;
pub mod transport;

pub use authorization::{AuthorizationSource, HttpAuthorizationClient};
pub use file::VideoFile;
pub use form::UploadForm;
pub use session::{Action, Status, UploadSession};
pub use transport::{HttpTransport, TransferEvent, Transport};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("camera access failed: {0}")]
    CaptureAccess(String),
    #[error("failed to get upload URL: {0}")]
    AuthorizationFetch(String),
    #[error("upload failed: {0}")]
    Transfer(String),
}

/// How a submission ended.
#[derive(Debug)]
pub enum UploadOutcome {
    /// Nothing to submit, or a submission was already in flight.
    Skipped,
    Succeeded,
    Failed(ClientError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Succeeded)
    }
}
