//! Upload session state and its transition function.
//!
//! The session is plain data: a UI shell dispatches [`Action`]s and renders
//! whatever the session reports, so every rule here is testable without a
//! view.
use crate::client::file::VideoFile;
use crate::client::transport::SUCCESS_STATUS;

pub const SUCCESS_MESSAGE: &str = "Video uploaded successfully!";
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload video";
pub const TRANSFER_ERROR_MESSAGE: &str = "Upload failed";
pub const AUTHORIZATION_ERROR_MESSAGE: &str = "Failed to get upload URL";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Status {
    #[default]
    Idle,
    Recording,
    FileChosen,
    AuthorizationRequested,
    Uploading,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// A transient message for the user (a toast, a log line).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    fn success(message: &str) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.to_string(),
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            kind: NotificationKind::Failure,
            message: message.to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    SelectFile(VideoFile),
    StartRecording,
    RecordingFinished(VideoFile),
    CaptureFailed(String),
    Submit,
    AuthorizationReceived,
    AuthorizationFailed(String),
    Progress { sent: u64, total: u64 },
    TransferCompleted { status: u16 },
    TransferFailed(String),
    Reset,
}

/// Whether an action changed the session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    Applied,
    Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct UploadSession {
    file: Option<VideoFile>,
    progress: u8,
    status: Status,
    error: Option<String>,
    notifications: Vec<Notification>,
}

/// `round(sent * 100 / total)`, capped at 100.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let sent = u128::from(sent.min(total));
    let total = u128::from(total);
    ((sent * 100 + total / 2) / total) as u8
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&VideoFile> {
        self.file.as_ref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True between submission and the terminal transfer event.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.status,
            Status::AuthorizationRequested | Status::Uploading
        )
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_in_flight()
            && self.status != Status::Recording
            && self.file.as_ref().is_some_and(|file| !file.is_empty())
    }

    /// Progress is only displayed once at least one percent was sent.
    pub fn progress_visible(&self) -> bool {
        self.status == Status::Uploading && self.progress > 0
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn clear(&mut self) {
        self.file = None;
        self.progress = 0;
        self.status = Status::Idle;
        self.error = None;
    }

    fn fail(&mut self, error: &str, notification: &str) {
        self.status = Status::Failed;
        self.error = Some(error.to_string());
        self.notifications.push(Notification::failure(notification));
    }

    pub fn apply(&mut self, action: Action) -> Transition {
        use Transition::{Applied, Ignored};

        match action {
            Action::SelectFile(file) => {
                if self.is_in_flight() || self.status == Status::Recording {
                    return Ignored;
                }
                self.file = Some(file);
                self.status = Status::FileChosen;
                self.progress = 0;
                self.error = None;
            }
            Action::StartRecording => {
                if self.is_in_flight() || self.status == Status::Recording {
                    return Ignored;
                }
                self.status = Status::Recording;
                self.error = None;
            }
            Action::RecordingFinished(file) => {
                if self.status != Status::Recording {
                    return Ignored;
                }
                self.file = Some(file);
                self.status = Status::FileChosen;
            }
            Action::CaptureFailed(reason) => {
                if self.is_in_flight() {
                    return Ignored;
                }
                self.status = if self.file.is_some() {
                    Status::FileChosen
                } else {
                    Status::Idle
                };
                self.error = Some(format!("Failed to access camera: {reason}"));
            }
            Action::Submit => {
                if !self.can_submit() {
                    return Ignored;
                }
                self.status = Status::AuthorizationRequested;
                self.progress = 0;
                self.error = None;
            }
            Action::AuthorizationReceived => {
                if self.status != Status::AuthorizationRequested {
                    return Ignored;
                }
                self.status = Status::Uploading;
            }
            Action::AuthorizationFailed(reason) => {
                if self.status != Status::AuthorizationRequested {
                    return Ignored;
                }
                log::warn!("Upload authorization failed: {reason}");
                self.fail(AUTHORIZATION_ERROR_MESSAGE, UPLOAD_FAILED_MESSAGE);
            }
            Action::Progress { sent, total } => {
                if self.status != Status::Uploading || total == 0 {
                    return Ignored;
                }
                self.progress = self.progress.max(percent(sent, total));
            }
            Action::TransferCompleted { status } => {
                if self.status != Status::Uploading {
                    return Ignored;
                }
                if status == SUCCESS_STATUS {
                    self.notifications.push(Notification::success(SUCCESS_MESSAGE));
                    self.clear();
                } else {
                    log::warn!("Storage rejected upload with status {status}");
                    self.fail(UPLOAD_FAILED_MESSAGE, UPLOAD_FAILED_MESSAGE);
                }
            }
            Action::TransferFailed(reason) => {
                if self.status != Status::Uploading {
                    return Ignored;
                }
                log::warn!("Upload transfer failed: {reason}");
                self.fail(TRANSFER_ERROR_MESSAGE, TRANSFER_ERROR_MESSAGE);
            }
            Action::Reset => {
                if self.is_in_flight() {
                    return Ignored;
                }
                self.clear();
            }
        }

        log::debug!("Upload session is now {:?}", self.status);
        Applied
    }
}
