//! Drives an [`UploadSession`] through authorization and transfer.
use std::time::Duration;

use futures::StreamExt;

use crate::client::authorization::AuthorizationSource;
use crate::client::file::VideoFile;
use crate::client::recorder::{CaptureDevice, MediaStream, Recorder};
use crate::client::session::{Action, Notification, Transition, UploadSession};
use crate::client::transport::{DirectUpload, SUCCESS_STATUS, TransferEvent, Transport};
use crate::client::{ClientError, UploadOutcome};

pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(120);

const STALLED_MESSAGE: &str = "upload stalled";
const TRUNCATED_MESSAGE: &str = "transfer ended without a response";

type Observer = Box<dyn FnMut(&UploadSession) + Send>;

pub struct UploadForm<A, T> {
    session: UploadSession,
    authorizer: A,
    transport: T,
    stall_timeout: Option<Duration>,
    observer: Option<Observer>,
}

impl<A, T> UploadForm<A, T>
where
    A: AuthorizationSource,
    T: Transport,
{
    pub fn new(authorizer: A, transport: T) -> Self {
        Self {
            session: UploadSession::new(),
            authorizer,
            transport,
            stall_timeout: Some(DEFAULT_STALL_TIMEOUT),
            observer: None,
        }
    }

    /// `None` waits on the transport indefinitely.
    pub fn with_stall_timeout(mut self, stall_timeout: Option<Duration>) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    /// Called after every applied transition.
    pub fn with_observer(mut self, observer: impl FnMut(&UploadSession) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    fn dispatch(&mut self, action: Action) -> Transition {
        let transition = self.session.apply(action);
        if transition == Transition::Applied {
            if let Some(observer) = self.observer.as_mut() {
                observer(&self.session);
            }
        }
        transition
    }

    pub fn select_file(&mut self, file: VideoFile) -> Transition {
        self.dispatch(Action::SelectFile(file))
    }

    /// Open the camera. On failure the session also carries the capture
    /// error for inline display.
    pub fn start_recording<D>(&mut self, device: &mut D) -> Result<Recorder<D::Stream>, ClientError>
    where
        D: CaptureDevice,
    {
        if self.dispatch(Action::StartRecording) == Transition::Ignored {
            return Err(ClientError::CaptureAccess(
                "a recording or upload is already in progress".to_string(),
            ));
        }
        Recorder::start(device).map_err(|err| {
            log::warn!("Camera access failed: {err}");
            self.dispatch(Action::CaptureFailed(err.to_string()));
            ClientError::CaptureAccess(err.to_string())
        })
    }

    pub fn finish_recording<S: MediaStream>(&mut self, recorder: Recorder<S>) -> Transition {
        let file = recorder.stop();
        self.dispatch(Action::RecordingFinished(file))
    }

    pub fn reset(&mut self) -> Transition {
        self.dispatch(Action::Reset)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.session.take_notifications()
    }

    /// Authorize and upload the chosen file.
    ///
    /// Returns [`UploadOutcome::Skipped`] without contacting anything when
    /// the session cannot submit.
    pub async fn submit(&mut self) -> UploadOutcome {
        if self.dispatch(Action::Submit) == Transition::Ignored {
            return UploadOutcome::Skipped;
        }
        let Some(file) = self.session.file().cloned() else {
            return UploadOutcome::Skipped;
        };

        let authorization = match self.authorizer.authorize(&file.to_request()).await {
            Ok(authorization) => authorization,
            Err(err) => {
                self.dispatch(Action::AuthorizationFailed(err.to_string()));
                return UploadOutcome::Failed(err);
            }
        };
        self.dispatch(Action::AuthorizationReceived);

        let mut events = self.transport.send(DirectUpload::new(authorization, file));
        loop {
            let event = match self.stall_timeout {
                Some(limit) => tokio::time::timeout(limit, events.next())
                    .await
                    .unwrap_or_else(|_| Some(TransferEvent::Failed(STALLED_MESSAGE.to_string()))),
                None => events.next().await,
            };

            match event {
                Some(TransferEvent::Progress { sent, total }) => {
                    self.dispatch(Action::Progress { sent, total });
                }
                Some(TransferEvent::Completed { status }) => {
                    self.dispatch(Action::TransferCompleted { status });
                    if status == SUCCESS_STATUS {
                        return UploadOutcome::Succeeded;
                    }
                    return UploadOutcome::Failed(ClientError::Transfer(format!(
                        "storage responded with status {status}"
                    )));
                }
                Some(TransferEvent::Failed(reason)) => {
                    self.dispatch(Action::TransferFailed(reason.clone()));
                    return UploadOutcome::Failed(ClientError::Transfer(reason));
                }
                None => {
                    self.dispatch(Action::TransferFailed(TRUNCATED_MESSAGE.to_string()));
                    return UploadOutcome::Failed(ClientError::Transfer(
                        TRUNCATED_MESSAGE.to_string(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};

    use super::*;
    use crate::client::recorder::tests::FakeCamera;
    use crate::client::session::{
        AUTHORIZATION_ERROR_MESSAGE, NotificationKind, SUCCESS_MESSAGE, Status,
    };
    use crate::domain::UploadAuthorization;
    use crate::forms::main::UploadRequestForm;

    #[derive(Clone, Default)]
    struct FakeAuthorizer {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl AuthorizationSource for FakeAuthorizer {
        async fn authorize(
            &self,
            request: &UploadRequestForm,
        ) -> Result<UploadAuthorization, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClientError::AuthorizationFetch("status 500".to_string()));
            }
            let mut fields = BTreeMap::new();
            fields.insert("key".to_string(), format!("{}1", request.filename));
            Ok(UploadAuthorization {
                url: "https://videos.example/".to_string(),
                fields,
            })
        }
    }

    /// Replays a fixed script of events; `None` never answers.
    #[derive(Clone)]
    struct ScriptedTransport {
        script: Option<Vec<TransferEvent>>,
        sent: Arc<Mutex<Vec<DirectUpload>>>,
    }

    impl ScriptedTransport {
        fn replaying(events: Vec<TransferEvent>) -> Self {
            Self {
                script: Some(events),
                sent: Arc::default(),
            }
        }

        fn silent() -> Self {
            Self {
                script: None,
                sent: Arc::default(),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, upload: DirectUpload) -> BoxStream<'static, TransferEvent> {
            self.sent.lock().unwrap().push(upload);
            match &self.script {
                Some(events) => stream::iter(events.clone()).boxed(),
                None => stream::pending().boxed(),
            }
        }
    }

    fn clip() -> VideoFile {
        VideoFile::new("clip.mov", "video/quicktime", &b"0123456789"[..])
    }

    #[tokio::test]
    async fn submit_without_file_contacts_nothing() {
        let authorizer = FakeAuthorizer::default();
        let transport = ScriptedTransport::replaying(Vec::new());
        let mut form = UploadForm::new(authorizer.clone(), transport.clone());

        assert!(matches!(form.submit().await, UploadOutcome::Skipped));
        assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_upload_resets_form() {
        let authorizer = FakeAuthorizer::default();
        let transport = ScriptedTransport::replaying(vec![
            TransferEvent::Progress { sent: 5, total: 10 },
            TransferEvent::Progress { sent: 10, total: 10 },
            TransferEvent::Completed { status: 204 },
        ]);
        let mut form = UploadForm::new(authorizer.clone(), transport.clone());
        form.select_file(clip());

        assert!(matches!(form.submit().await, UploadOutcome::Succeeded));
        assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(form.session().status(), Status::Idle);
        assert!(form.session().file().is_none());
        assert_eq!(form.take_notifications()[0].message, SUCCESS_MESSAGE);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].authorization.fields["key"], "clip.mov1");
        assert_eq!(sent[0].file, clip());
    }

    #[tokio::test]
    async fn rejected_upload_keeps_file() {
        let transport = ScriptedTransport::replaying(vec![TransferEvent::Completed { status: 403 }]);
        let mut form = UploadForm::new(FakeAuthorizer::default(), transport);
        form.select_file(clip());

        let outcome = form.submit().await;

        assert!(matches!(outcome, UploadOutcome::Failed(ClientError::Transfer(_))));
        assert_eq!(form.session().status(), Status::Failed);
        assert_eq!(form.session().file(), Some(&clip()));
        assert_eq!(
            form.take_notifications()[0].kind,
            NotificationKind::Failure
        );
    }

    #[tokio::test]
    async fn authorization_failure_skips_transfer() {
        let authorizer = FakeAuthorizer {
            fail: true,
            ..FakeAuthorizer::default()
        };
        let transport = ScriptedTransport::replaying(Vec::new());
        let mut form = UploadForm::new(authorizer, transport.clone());
        form.select_file(clip());

        let outcome = form.submit().await;

        assert!(matches!(
            outcome,
            UploadOutcome::Failed(ClientError::AuthorizationFetch(_))
        ));
        assert_eq!(form.session().error(), Some(AUTHORIZATION_ERROR_MESSAGE));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn observer_sees_monotonic_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let transport = ScriptedTransport::replaying(vec![
            TransferEvent::Progress { sent: 3, total: 10 },
            TransferEvent::Progress { sent: 2, total: 10 },
            TransferEvent::Progress { sent: 7, total: 10 },
            TransferEvent::Completed { status: 500 },
        ]);
        let mut form = UploadForm::new(FakeAuthorizer::default(), transport).with_observer(
            move |session: &UploadSession| {
                if session.status() == Status::Uploading {
                    log.lock().unwrap().push(session.progress());
                }
            },
        );
        form.select_file(clip());
        form.submit().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[0, 30, 30, 70]);
    }

    #[tokio::test]
    async fn silent_transport_stalls_out() {
        let mut form = UploadForm::new(FakeAuthorizer::default(), ScriptedTransport::silent())
            .with_stall_timeout(Some(Duration::from_millis(20)));
        form.select_file(clip());

        let outcome = form.submit().await;

        match outcome {
            UploadOutcome::Failed(ClientError::Transfer(reason)) => {
                assert_eq!(reason, STALLED_MESSAGE)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(form.session().status(), Status::Failed);
        assert!(form.session().can_submit());
    }

    #[tokio::test]
    async fn truncated_event_stream_fails_transfer() {
        let transport = ScriptedTransport::replaying(vec![TransferEvent::Progress {
            sent: 1,
            total: 10,
        }]);
        let mut form = UploadForm::new(FakeAuthorizer::default(), transport);
        form.select_file(clip());

        assert!(matches!(
            form.submit().await,
            UploadOutcome::Failed(ClientError::Transfer(_))
        ));
    }

    #[test]
    fn denied_camera_reports_inline_error() {
        let mut form = UploadForm::new(
            FakeAuthorizer::default(),
            ScriptedTransport::replaying(Vec::new()),
        );
        let mut camera = FakeCamera::denied();

        let err = form.start_recording(&mut camera).err().unwrap();
        assert!(matches!(err, ClientError::CaptureAccess(_)));
        assert_eq!(form.session().status(), Status::Idle);
        assert_eq!(
            form.session().error(),
            Some("Failed to access camera: permission denied")
        );
    }

    #[test]
    fn finished_recording_becomes_the_chosen_file() {
        let mut form = UploadForm::new(
            FakeAuthorizer::default(),
            ScriptedTransport::replaying(Vec::new()),
        );
        let mut camera = FakeCamera::with_tracks(1);

        let mut recorder = form.start_recording(&mut camera).unwrap();
        assert_eq!(form.session().status(), Status::Recording);
        assert!(form.start_recording(&mut FakeCamera::with_tracks(1)).is_err());
        recorder.push_chunk(&b"frames"[..]);
        form.finish_recording(recorder);

        assert_eq!(camera.stop_counts(), vec![1]);
        assert_eq!(form.session().status(), Status::FileChosen);
        assert_eq!(
            form.session().file().map(VideoFile::name),
            Some("recorded-video.webm")
        );
        assert!(form.session().can_submit());
    }
}
